// src/handlers/workspaces.rs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::{error::AppError, extract::ValidatedJson},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::workspace::{
        ConnectWhatsappPayload, ConsumeCreditsPayload, UpdateSubscriptionPayload, Workspace,
    },
};

#[utoipa::path(
    get,
    path = "/api/v1/workspaces/{id}",
    tag = "Workspaces",
    responses(
        (status = 200, description = "Dados do workspace", body = Workspace),
        (status = 404, description = "Workspace não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do Workspace")),
    security(("api_jwt" = []))
)]
pub async fn get_workspace(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Workspace>, AppError> {
    let workspace = app_state.workspace_service.get_workspace(&auth.user, id).await?;
    Ok(Json(workspace))
}

#[utoipa::path(
    patch,
    path = "/api/v1/workspaces/{id}/whatsapp/connect",
    tag = "Workspaces",
    request_body = ConnectWhatsappPayload,
    responses(
        (status = 200, description = "WhatsApp conectado", body = Workspace),
        (status = 403, description = "Apenas dono ou admin")
    ),
    params(("id" = Uuid, Path, description = "ID do Workspace")),
    security(("api_jwt" = []))
)]
pub async fn connect_whatsapp(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ConnectWhatsappPayload>,
) -> Result<Json<Workspace>, AppError> {
    let workspace = app_state.workspace_service
        .connect_whatsapp(&auth.user, id, &payload.phone_number, payload.session_data)
        .await?;
    Ok(Json(workspace))
}

#[utoipa::path(
    patch,
    path = "/api/v1/workspaces/{id}/whatsapp/disconnect",
    tag = "Workspaces",
    responses(
        (status = 200, description = "WhatsApp desconectado", body = Workspace),
        (status = 403, description = "Apenas dono ou admin")
    ),
    params(("id" = Uuid, Path, description = "ID do Workspace")),
    security(("api_jwt" = []))
)]
pub async fn disconnect_whatsapp(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Workspace>, AppError> {
    let workspace = app_state.workspace_service.disconnect_whatsapp(&auth.user, id).await?;
    Ok(Json(workspace))
}

#[utoipa::path(
    post,
    path = "/api/v1/workspaces/{id}/ai-credits",
    tag = "Workspaces",
    request_body = ConsumeCreditsPayload,
    responses(
        (status = 200, description = "Créditos consumidos", body = Workspace),
        (status = 400, description = "Limite mensal de créditos excedido")
    ),
    params(("id" = Uuid, Path, description = "ID do Workspace")),
    security(("api_jwt" = []))
)]
pub async fn consume_ai_credits(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ConsumeCreditsPayload>,
) -> Result<Json<Workspace>, AppError> {
    let workspace = app_state.workspace_service
        .consume_ai_credits(&auth.user, id, payload.credits)
        .await?;
    Ok(Json(workspace))
}

#[utoipa::path(
    post,
    path = "/api/v1/workspaces/{id}/ai-credits/reset",
    tag = "Workspaces",
    responses(
        (status = 200, description = "Consumo do mês zerado", body = Workspace),
        (status = 403, description = "Apenas o dono")
    ),
    params(("id" = Uuid, Path, description = "ID do Workspace")),
    security(("api_jwt" = []))
)]
pub async fn reset_ai_credits(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Workspace>, AppError> {
    let workspace = app_state.workspace_service.reset_monthly_credits(&auth.user, id).await?;
    Ok(Json(workspace))
}

#[utoipa::path(
    patch,
    path = "/api/v1/workspaces/{id}/subscription",
    tag = "Workspaces",
    request_body = UpdateSubscriptionPayload,
    responses(
        (status = 200, description = "Assinatura atualizada", body = Workspace),
        (status = 403, description = "Apenas o dono")
    ),
    params(("id" = Uuid, Path, description = "ID do Workspace")),
    security(("api_jwt" = []))
)]
pub async fn update_subscription(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateSubscriptionPayload>,
) -> Result<Json<Workspace>, AppError> {
    let workspace = app_state.workspace_service
        .update_subscription(&auth.user, id, payload.tier, payload.status)
        .await?;
    Ok(Json(workspace))
}
