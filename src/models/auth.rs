// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{
    user::{UserRole, UserView},
    workspace::{WorkspaceProfile, WorkspaceSummary},
};

// Símbolos aceitos pela política de senha
pub const PASSWORD_SYMBOLS: &str = "@$!%*?&";

// ---
// Validação Customizada
// ---
// Pelo menos 1 minúscula, 1 maiúscula, 1 dígito e 1 símbolo de PASSWORD_SYMBOLS.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if has_lower && has_upper && has_digit && has_symbol {
        return Ok(());
    }

    let mut err = ValidationError::new("password_strength");
    err.message = Some(
        "A senha deve conter ao menos 1 letra maiúscula, 1 minúscula, 1 número e 1 caractere especial (@$!%*?&)."
            .into(),
    );
    Err(err)
}

// Dados para registro de um novo usuário + workspace
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "a@x.com")]
    pub email: String,

    #[validate(
        length(min = 8, max = 100, message = "A senha deve ter entre 8 e 100 caracteres."),
        custom(function = "validate_password_strength")
    )]
    #[schema(example = "Abc12345!")]
    pub password: String,

    #[validate(length(min = 2, max = 255, message = "O nome deve ter entre 2 e 255 caracteres."))]
    #[schema(example = "A B")]
    pub full_name: String,

    #[validate(length(min = 3, max = 255, message = "O nome do workspace deve ter entre 3 e 255 caracteres."))]
    #[schema(example = "My Co")]
    pub workspace_name: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenPayload {
    #[validate(length(min = 1, message = "O refresh token é obrigatório."))]
    pub refresh_token: String,
}

// ---
// Tokens
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid, // Subject (ID do usuário)
    pub email: String,
    pub workspace_id: Uuid,
    pub role: UserRole,
    pub typ: TokenKind,
    pub ver: i32, // Versão de token do usuário (logout incrementa)
    pub jti: Uuid,
    pub iat: i64, // Issued At
    pub exp: i64, // Expiration time
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Validade do access token, em segundos.
    pub expires_in: i64,
}

// ---
// Respostas
// ---
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserView,
    pub workspace: WorkspaceSummary,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserView,
    pub workspace: WorkspaceProfile,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
