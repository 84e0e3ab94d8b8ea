// src/common/error.rs

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

// Motivo interno de uma falha de autenticação.
// Vai para o log, nunca para o cliente (resistência a enumeração).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    UnknownEmail,
    WrongPassword,
    AccountSuspended,
    AccountDeleted,
    WorkspaceUnavailable,
    MissingBearer,
    MalformedToken,
    ExpiredToken,
    BadSignature,
    WrongTokenKind,
    RevokedToken,
    UnknownSubject,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailure::UnknownEmail => "unknown_email",
            AuthFailure::WrongPassword => "wrong_password",
            AuthFailure::AccountSuspended => "account_suspended",
            AuthFailure::AccountDeleted => "account_deleted",
            AuthFailure::WorkspaceUnavailable => "workspace_unavailable",
            AuthFailure::MissingBearer => "missing_bearer",
            AuthFailure::MalformedToken => "malformed_token",
            AuthFailure::ExpiredToken => "expired_token",
            AuthFailure::BadSignature => "bad_signature",
            AuthFailure::WrongTokenKind => "wrong_token_kind",
            AuthFailure::RevokedToken => "revoked_token",
            AuthFailure::UnknownSubject => "unknown_subject",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    // JSON malformado, campo faltando ou valor fora do enum
    #[error("Corpo da requisição inválido: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Slug de workspace já existe: {0}")]
    WorkspaceSlugTaken(String),

    #[error("Limite de usuários do workspace atingido ({max_users})")]
    SeatLimitReached { max_users: i32 },

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Credenciais inválidas ({})", .0.as_str())]
    InvalidCredentials(AuthFailure),

    #[error("Token inválido ({})", .0.as_str())]
    InvalidToken(AuthFailure),

    #[error("Refresh token inválido ({})", .0.as_str())]
    InvalidRefreshToken(AuthFailure),

    #[error("Permissão insuficiente")]
    Forbidden,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Workspace não encontrado: {0}")]
    WorkspaceNotFound(Uuid),

    #[error("Limite de créditos de IA excedido (solicitado {requested}, restante {remaining})")]
    AiCreditsExceeded { requested: i32, remaining: i32 },

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidInput(_)
            | AppError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists
            | AppError::WorkspaceSlugTaken(_)
            | AppError::SeatLimitReached { .. }
            | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials(_)
            | AppError::InvalidToken(_)
            | AppError::InvalidRefreshToken(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::WorkspaceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::AiCreditsExceeded { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (status, body).into_response();
            }
            AppError::InvalidBody(rejection) => {
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": { "body": [rejection.body_text()] },
                }));
                return (status, body).into_response();
            }
            AppError::InvalidInput(message) => message,
            AppError::EmailAlreadyExists => "Este e-mail já está em uso.".to_string(),
            AppError::WorkspaceSlugTaken(_) => "Este nome de workspace já está em uso.".to_string(),
            AppError::SeatLimitReached { max_users } => {
                format!("O workspace atingiu o limite de {} usuários.", max_users)
            }
            AppError::UniqueConstraintViolation(_) => "Registro duplicado.".to_string(),

            // O motivo real só vai para o log.
            AppError::InvalidCredentials(reason) => {
                tracing::warn!(reason = reason.as_str(), "Falha de login");
                "E-mail ou senha inválidos.".to_string()
            }
            AppError::InvalidToken(reason) => {
                tracing::warn!(reason = reason.as_str(), "Token rejeitado");
                "Token de autenticação inválido ou ausente.".to_string()
            }
            AppError::InvalidRefreshToken(reason) => {
                tracing::warn!(reason = reason.as_str(), "Refresh token rejeitado");
                "Refresh token inválido.".to_string()
            }

            AppError::Forbidden => "Você não tem permissão para realizar esta ação.".to_string(),
            AppError::UserNotFound => "Usuário não encontrado.".to_string(),
            AppError::WorkspaceNotFound(_) => "Workspace não encontrado.".to_string(),
            AppError::AiCreditsExceeded { .. } => "Limite de créditos de IA excedido.".to_string(),

            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                "Ocorreu um erro inesperado.".to_string()
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
