// src/services/workspace_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TenantStore,
    models::{
        user::{User, UserRole},
        workspace::{SubscriptionStatus, SubscriptionTier, Workspace},
    },
};

#[derive(Clone)]
pub struct WorkspaceService {
    store: Arc<dyn TenantStore>,
}

// Isolamento: workspace alheio responde como inexistente
fn ensure_member(caller: &User, workspace_id: Uuid) -> Result<(), AppError> {
    if caller.workspace_id != workspace_id {
        return Err(AppError::WorkspaceNotFound(workspace_id));
    }
    Ok(())
}

fn ensure_role(caller: &User, allowed: &[UserRole]) -> Result<(), AppError> {
    if !allowed.contains(&caller.role) {
        tracing::warn!(user_id = %caller.id, role = ?caller.role, "Permissão negada");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

const MANAGERS: &[UserRole] = &[UserRole::Owner, UserRole::Admin];
const OWNER_ONLY: &[UserRole] = &[UserRole::Owner];

impl WorkspaceService {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store }
    }

    pub async fn get_workspace(&self, caller: &User, workspace_id: Uuid) -> Result<Workspace, AppError> {
        ensure_member(caller, workspace_id)?;
        self.store
            .find_workspace_by_id(workspace_id)
            .await?
            .filter(|ws| !ws.is_deleted())
            .ok_or(AppError::WorkspaceNotFound(workspace_id))
    }

    pub async fn connect_whatsapp(
        &self,
        caller: &User,
        workspace_id: Uuid,
        phone_number: &str,
        session_data: serde_json::Value,
    ) -> Result<Workspace, AppError> {
        ensure_member(caller, workspace_id)?;
        ensure_role(caller, MANAGERS)?;

        let ws = self.store
            .connect_whatsapp(workspace_id, phone_number, session_data, Utc::now())
            .await?;
        tracing::info!(workspace_id = %ws.id, "📱 WhatsApp conectado");
        Ok(ws)
    }

    pub async fn disconnect_whatsapp(&self, caller: &User, workspace_id: Uuid) -> Result<Workspace, AppError> {
        ensure_member(caller, workspace_id)?;
        ensure_role(caller, MANAGERS)?;

        let ws = self.store.disconnect_whatsapp(workspace_id).await?;
        tracing::info!(workspace_id = %ws.id, "WhatsApp desconectado");
        Ok(ws)
    }

    /// Consome créditos de IA do mês. Atômico no store: ou cabe tudo, ou nada muda.
    pub async fn consume_ai_credits(&self, caller: &User, workspace_id: Uuid, credits: i32) -> Result<Workspace, AppError> {
        ensure_member(caller, workspace_id)?;
        if credits < 1 {
            return Err(AppError::InvalidInput("A quantidade de créditos deve ser positiva.".into()));
        }
        self.store.increment_ai_credits(workspace_id, credits).await
    }

    pub async fn reset_monthly_credits(&self, caller: &User, workspace_id: Uuid) -> Result<Workspace, AppError> {
        ensure_member(caller, workspace_id)?;
        ensure_role(caller, OWNER_ONLY)?;

        let ws = self.store.reset_ai_credits(workspace_id).await?;
        tracing::info!(workspace_id = %ws.id, "Créditos de IA do mês zerados");
        Ok(ws)
    }

    pub async fn update_subscription(
        &self,
        caller: &User,
        workspace_id: Uuid,
        tier: SubscriptionTier,
        status: SubscriptionStatus,
    ) -> Result<Workspace, AppError> {
        ensure_member(caller, workspace_id)?;
        ensure_role(caller, OWNER_ONLY)?;

        let ws = self.store.update_subscription(workspace_id, tier, status).await?;
        tracing::info!(workspace_id = %ws.id, tier = ?tier, status = ?status, "💳 Assinatura atualizada");
        Ok(ws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryTenantStore,
        models::{user::NewUser, workspace::NewWorkspace},
    };
    use serde_json::json;

    async fn setup() -> (WorkspaceService, User) {
        let store = Arc::new(MemoryTenantStore::new());
        let ws = NewWorkspace::for_registration("Acme", "acme".into(), Utc::now());
        let owner = NewUser {
            id: Uuid::new_v4(),
            workspace_id: ws.id,
            email: "dono@acme.com".into(),
            full_name: "Dono".into(),
            role: UserRole::Owner,
            password_hash: "hash".into(),
        };
        let (_, owner) = store.create_workspace_with_owner(ws, owner).await.unwrap();
        (WorkspaceService::new(store), owner)
    }

    fn with_role(user: &User, role: UserRole) -> User {
        User { role, ..user.clone() }
    }

    #[tokio::test]
    async fn foreign_workspace_is_not_found() {
        let (service, owner) = setup().await;
        let other = Uuid::new_v4();

        assert!(matches!(
            service.get_workspace(&owner, other).await.unwrap_err(),
            AppError::WorkspaceNotFound(_)
        ));
        assert!(matches!(
            service.consume_ai_credits(&owner, other, 1).await.unwrap_err(),
            AppError::WorkspaceNotFound(_)
        ));
    }

    #[tokio::test]
    async fn whatsapp_requires_owner_or_admin() {
        let (service, owner) = setup().await;
        let ws_id = owner.workspace_id;

        let member = with_role(&owner, UserRole::Member);
        let err = service
            .connect_whatsapp(&member, ws_id, "+5511999998888", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let admin = with_role(&owner, UserRole::Admin);
        let ws = service
            .connect_whatsapp(&admin, ws_id, "+5511999998888", json!({ "session": "x" }))
            .await
            .unwrap();
        assert!(ws.whatsapp_connected);
        assert_eq!(ws.whatsapp_phone_number.as_deref(), Some("+5511999998888"));

        let ws = service.disconnect_whatsapp(&owner, ws_id).await.unwrap();
        assert!(!ws.whatsapp_connected);
    }

    #[tokio::test]
    async fn session_data_never_serialized() {
        let (service, owner) = setup().await;
        let ws = service
            .connect_whatsapp(&owner, owner.workspace_id, "+5511999998888", json!({ "secret": "s" }))
            .await
            .unwrap();

        let body = serde_json::to_value(&ws).unwrap();
        assert!(body.get("whatsappSessionData").is_none());
        assert_eq!(body["whatsappConnected"], true);
    }

    #[tokio::test]
    async fn credits_consume_and_reset() {
        let (service, owner) = setup().await;
        let ws_id = owner.workspace_id;

        assert!(matches!(
            service.consume_ai_credits(&owner, ws_id, 0).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));

        let ws = service.consume_ai_credits(&owner, ws_id, 400).await.unwrap();
        assert_eq!(ws.ai_credits_remaining(), 600);

        let err = service.consume_ai_credits(&owner, ws_id, 601).await.unwrap_err();
        assert!(matches!(err, AppError::AiCreditsExceeded { requested: 601, remaining: 600 }));

        let admin = with_role(&owner, UserRole::Admin);
        assert!(matches!(
            service.reset_monthly_credits(&admin, ws_id).await.unwrap_err(),
            AppError::Forbidden
        ));
        let ws = service.reset_monthly_credits(&owner, ws_id).await.unwrap();
        assert_eq!(ws.ai_credits_used_this_month, 0);
    }

    #[tokio::test]
    async fn subscription_is_owner_only() {
        let (service, owner) = setup().await;
        let ws_id = owner.workspace_id;

        let viewer = with_role(&owner, UserRole::Viewer);
        assert!(matches!(
            service
                .update_subscription(&viewer, ws_id, SubscriptionTier::Enterprise, SubscriptionStatus::Active)
                .await
                .unwrap_err(),
            AppError::Forbidden
        ));

        let ws = service
            .update_subscription(&owner, ws_id, SubscriptionTier::Professional, SubscriptionStatus::Active)
            .await
            .unwrap();
        assert_eq!(ws.subscription_tier, SubscriptionTier::Professional);
        assert_eq!(ws.subscription_status, SubscriptionStatus::Active);
    }
}
