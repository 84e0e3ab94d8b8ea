// src/models/workspace.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub type JsonMap = serde_json::Map<String, serde_json::Value>;

// Padrões de um workspace recém-criado no registro
pub const TRIAL_DAYS: i64 = 14;
pub const DEFAULT_MAX_USERS: i32 = 5;
pub const DEFAULT_MAX_AI_CREDITS: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_tier", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Starter,
    Professional,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    PastDue,
    Cancelled,
}

// ---
// Workspace (o Tenant)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_tier: SubscriptionTier,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub max_users: i32,
    pub max_ai_credits_per_month: i32,
    pub ai_credits_used_this_month: i32,

    pub whatsapp_phone_number: Option<String>,
    // Sessão opaca do WhatsApp: nunca sai da API
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub whatsapp_session_data: Option<Json<serde_json::Value>>,
    pub whatsapp_connected: bool,
    pub whatsapp_last_connected_at: Option<DateTime<Utc>>,

    #[schema(value_type = Object)]
    pub settings: Json<JsonMap>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Workspace {
    pub fn ai_credits_remaining(&self) -> i32 {
        self.max_ai_credits_per_month - self.ai_credits_used_this_month
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Resumo devolvido junto com os tokens no registro/login.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_tier: SubscriptionTier,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

impl From<&Workspace> for WorkspaceSummary {
    fn from(ws: &Workspace) -> Self {
        Self {
            id: ws.id,
            name: ws.name.clone(),
            slug: ws.slug.clone(),
            subscription_tier: ws.subscription_tier,
            subscription_status: ws.subscription_status,
            trial_ends_at: ws.trial_ends_at,
        }
    }
}

/// Visão do workspace no `/auth/me`, com o saldo de créditos calculado.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceProfile {
    #[serde(flatten)]
    pub summary: WorkspaceSummary,
    pub whatsapp_connected: bool,
    pub ai_credits_remaining: i32,
}

impl From<&Workspace> for WorkspaceProfile {
    fn from(ws: &Workspace) -> Self {
        Self {
            summary: WorkspaceSummary::from(ws),
            whatsapp_connected: ws.whatsapp_connected,
            ai_credits_remaining: ws.ai_credits_remaining(),
        }
    }
}

// Dados para inserir um workspace
#[derive(Debug, Clone)]
pub struct NewWorkspace {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_tier: SubscriptionTier,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub max_users: i32,
    pub max_ai_credits_per_month: i32,
}

impl NewWorkspace {
    /// Workspace de um novo cadastro: starter/trial, 14 dias de avaliação.
    pub fn for_registration(name: &str, slug: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug,
            subscription_tier: SubscriptionTier::Starter,
            subscription_status: SubscriptionStatus::Trial,
            trial_ends_at: Some(now + Duration::days(TRIAL_DAYS)),
            max_users: DEFAULT_MAX_USERS,
            max_ai_credits_per_month: DEFAULT_MAX_AI_CREDITS,
        }
    }
}

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWhatsappPayload {
    #[validate(length(min = 1, max = 20, message = "O telefone deve ter entre 1 e 20 caracteres."))]
    #[schema(example = "+5511999998888")]
    pub phone_number: String,
    #[schema(value_type = Object)]
    pub session_data: serde_json::Value,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeCreditsPayload {
    #[validate(range(min = 1, message = "A quantidade de créditos deve ser positiva."))]
    #[schema(example = 10)]
    pub credits: i32,
}

// Sem regras além do enum: valor desconhecido já falha na desserialização
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionPayload {
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
}
