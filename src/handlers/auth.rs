// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::{error::AppError, extract::ValidatedJson},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{
        AuthResponse, LoginUserPayload, MessageResponse, ProfileResponse, RefreshTokenPayload,
        RegisterUserPayload, TokenPair,
    },
};

// Handler de registro
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Workspace e usuário dono criados", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail ou workspace já existe")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    let response = app_state.auth_service
        .register(&payload.email, &payload.password, &payload.full_name, &payload.workspace_name)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

// Handler de login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login efetuado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = app_state.auth_service.login(&payload.email, &payload.password).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token",
    tag = "Auth",
    request_body = RefreshTokenPayload,
    responses(
        (status = 200, description = "Novo par de tokens", body = TokenPair),
        (status = 401, description = "Refresh token inválido")
    )
)]
pub async fn refresh_token(
    State(app_state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshTokenPayload>,
) -> Result<Json<TokenPair>, AppError> {
    let tokens = app_state.auth_service.refresh_token(&payload.refresh_token).await?;
    Ok(Json(tokens))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Tokens do usuário revogados", body = MessageResponse),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<MessageResponse>, AppError> {
    app_state.auth_service.logout(auth.user.id).await?;

    Ok(Json(MessageResponse {
        message: "Logout realizado com sucesso.".into(),
    }))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Usuário autenticado e seu workspace", body = ProfileResponse),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = app_state.auth_service.get_profile(auth.user.id).await?;
    Ok(Json(profile))
}
