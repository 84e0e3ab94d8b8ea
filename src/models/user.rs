// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::workspace::JsonMap;

// Dias entre o pedido de exclusão e a exclusão efetiva
pub const DELETION_GRACE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Suspended,
    PendingDeletion,
}

// Representa um usuário vindo do banco de dados.
// Não é serializado direto: a API sempre devolve `UserView`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub password_hash: String,
    pub identity_verified_at: Option<DateTime<Utc>>,
    pub identity_verification_id: Option<String>,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub token_version: i32,
    pub settings: Json<JsonMap>,
    pub deletion_requested_at: Option<DateTime<Utc>>,
    pub deletion_scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Usuário sanitizado: nunca inclui material de credencial.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub identity_verified_at: Option<DateTime<Utc>>,
    pub deletion_scheduled_for: Option<DateTime<Utc>>,
    #[schema(value_type = Object)]
    pub settings: JsonMap,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            workspace_id: user.workspace_id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            avatar_url: user.avatar_url.clone(),
            status: user.status,
            last_login_at: user.last_login_at,
            identity_verified_at: user.identity_verified_at,
            deletion_scheduled_for: user.deletion_scheduled_for,
            settings: user.settings.0.clone(),
            created_at: user.created_at,
        }
    }
}

// Dados para inserir um usuário
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub password_hash: String,
}

/// Campos que o próprio usuário pode alterar.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    // Mesclado (shallow) sobre o mapa existente
    pub settings: Option<JsonMap>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.avatar_url.is_none() && self.settings.is_none()
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(length(min = 2, max = 255, message = "O nome deve ter entre 2 e 255 caracteres."))]
    pub full_name: Option<String>,

    #[validate(url(message = "A URL do avatar é inválida."))]
    pub avatar_url: Option<String>,

    #[schema(value_type = Option<Object>)]
    pub settings: Option<JsonMap>,
}

impl From<UpdateProfilePayload> for ProfileChanges {
    fn from(payload: UpdateProfilePayload) -> Self {
        Self {
            full_name: payload.full_name,
            avatar_url: payload.avatar_url,
            settings: payload.settings,
        }
    }
}
