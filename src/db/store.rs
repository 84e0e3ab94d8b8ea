// src/db/store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        user::{NewUser, ProfileChanges, User},
        workspace::{JsonMap, NewWorkspace, SubscriptionStatus, SubscriptionTier, Workspace},
    },
};

/// Fronteira de armazenamento de workspaces e usuários.
///
/// As invariantes vivem aqui e não nos serviços: e-mail e slug únicos
/// (globais), limite de assentos por workspace, créditos de IA nunca acima do
/// teto e settings sempre mesclados. As buscas devolvem também registros
/// com soft-delete; quem decide o que fazer com eles é o chamador.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_workspace_by_id(&self, id: Uuid) -> Result<Option<Workspace>, AppError>;

    async fn find_workspace_by_slug(&self, slug: &str) -> Result<Option<Workspace>, AppError>;

    /// Cria workspace + dono como uma unidade atômica.
    /// Qualquer falha na segunda escrita desfaz a primeira.
    async fn create_workspace_with_owner(
        &self,
        workspace: NewWorkspace,
        owner: NewUser,
    ) -> Result<(Workspace, User), AppError>;

    /// Usuários não excluídos do workspace, em ordem de criação.
    async fn list_workspace_users(&self, workspace_id: Uuid) -> Result<Vec<User>, AppError>;

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Incrementa `token_version`, invalidando todos os tokens já emitidos.
    async fn bump_token_version(&self, user_id: Uuid) -> Result<(), AppError>;

    async fn update_user_profile(&self, user_id: Uuid, changes: ProfileChanges) -> Result<User, AppError>;

    /// `Some((pedido, agendado))` marca `pending_deletion`; `None` cancela e volta a `active`.
    async fn set_deletion_schedule(
        &self,
        user_id: Uuid,
        schedule: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<User, AppError>;

    /// Soft-delete de quem está `pending_deletion` com agendamento vencido.
    async fn purge_due_deletions(&self, now: DateTime<Utc>) -> Result<u64, AppError>;

    /// Leitura-modificação-escrita atômica: falha com `AiCreditsExceeded`
    /// se `usado + credits > teto`, sem alterar nada.
    async fn increment_ai_credits(&self, workspace_id: Uuid, credits: i32) -> Result<Workspace, AppError>;

    async fn reset_ai_credits(&self, workspace_id: Uuid) -> Result<Workspace, AppError>;

    async fn update_subscription(
        &self,
        workspace_id: Uuid,
        tier: SubscriptionTier,
        status: SubscriptionStatus,
    ) -> Result<Workspace, AppError>;

    async fn connect_whatsapp(
        &self,
        workspace_id: Uuid,
        phone_number: &str,
        session_data: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<Workspace, AppError>;

    async fn disconnect_whatsapp(&self, workspace_id: Uuid) -> Result<Workspace, AppError>;

    /// Verificação de saúde da conexão.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Mesclagem rasa: chaves novas sobrescrevem, as demais ficam.
pub fn merge_settings(current: &mut JsonMap, patch: JsonMap) {
    for (key, value) in patch {
        current.insert(key, value);
    }
}
