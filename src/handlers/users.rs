// src/handlers/users.rs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::{error::AppError, extract::ValidatedJson},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::user::{UpdateProfilePayload, UserView},
};

#[utoipa::path(
    get,
    path = "/api/v1/users/profile",
    tag = "Users",
    responses(
        (status = 200, description = "Perfil do usuário autenticado", body = UserView)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_profile(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<UserView>, AppError> {
    let profile = app_state.user_service.get_profile(auth.user.id).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/profile",
    tag = "Users",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Perfil atualizado", body = UserView),
        (status = 400, description = "Nenhum campo válido")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<UpdateProfilePayload>,
) -> Result<Json<UserView>, AppError> {
    let updated = app_state.user_service
        .update_profile(auth.user.id, payload.into())
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/workspace/{workspace_id}",
    tag = "Users",
    responses(
        (status = 200, description = "Usuários do workspace", body = Vec<UserView>),
        (status = 404, description = "Workspace não encontrado")
    ),
    params(
        ("workspace_id" = Uuid, Path, description = "ID do Workspace")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_workspace_users(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<Vec<UserView>>, AppError> {
    let users = app_state.user_service
        .list_workspace_users(&auth.user, workspace_id)
        .await?;
    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/profile/deletion",
    tag = "Users",
    responses(
        (status = 200, description = "Exclusão agendada para daqui a 30 dias", body = UserView)
    ),
    security(("api_jwt" = []))
)]
pub async fn request_deletion(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<UserView>, AppError> {
    let user = app_state.user_service.request_deletion(auth.user.id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/profile/deletion",
    tag = "Users",
    responses(
        (status = 200, description = "Exclusão cancelada", body = UserView)
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_deletion(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<UserView>, AppError> {
    let user = app_state.user_service.cancel_deletion(auth.user.id).await?;
    Ok(Json(user))
}
