// src/db/pg_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{store::TenantStore, UserRepository, WorkspaceRepository},
    models::{
        user::{NewUser, ProfileChanges, User, UserStatus},
        workspace::{NewWorkspace, SubscriptionStatus, SubscriptionTier, Workspace},
    },
};

/// `TenantStore` sobre Postgres. As invariantes ficam nas constraints do
/// banco (índices únicos, FK com CASCADE) e em UPDATEs condicionais.
#[derive(Clone)]
pub struct PgTenantStore {
    pool: PgPool,
    workspace_repo: WorkspaceRepository,
    user_repo: UserRepository,
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            workspace_repo: WorkspaceRepository::new(pool.clone()),
            user_repo: UserRepository::new(pool.clone()),
            pool,
        }
    }

    // `None` de um UPDATE ... RETURNING vira 404
    fn found(ws: Option<Workspace>, id: Uuid) -> Result<Workspace, AppError> {
        ws.ok_or(AppError::WorkspaceNotFound(id))
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.user_repo.find_by_email(email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.user_repo.find_by_id(id).await
    }

    async fn find_workspace_by_id(&self, id: Uuid) -> Result<Option<Workspace>, AppError> {
        self.workspace_repo.find_by_id(id).await
    }

    async fn find_workspace_by_slug(&self, slug: &str) -> Result<Option<Workspace>, AppError> {
        self.workspace_repo.find_by_slug(slug).await
    }

    async fn create_workspace_with_owner(
        &self,
        workspace: NewWorkspace,
        owner: NewUser,
    ) -> Result<(Workspace, User), AppError> {
        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        let new_workspace = self.workspace_repo.insert(&mut *tx, &workspace).await?;

        // Limite de assentos checado com a linha do workspace travada
        let max_users = self.workspace_repo
            .lock_seat_cap(&mut *tx, new_workspace.id)
            .await?
            .ok_or(AppError::WorkspaceNotFound(new_workspace.id))?;
        let seats_taken = self.user_repo.count_in_workspace(&mut *tx, new_workspace.id).await?;
        if seats_taken >= i64::from(max_users) {
            return Err(AppError::SeatLimitReached { max_users });
        }

        // Se falhar aqui, o tx sofre rollback automático ao sair do escopo (drop)
        let new_user = self.user_repo.insert(&mut *tx, &owner).await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        Ok((new_workspace, new_user))
    }

    async fn list_workspace_users(&self, workspace_id: Uuid) -> Result<Vec<User>, AppError> {
        self.user_repo.list_by_workspace(workspace_id).await
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        self.user_repo.record_login(user_id, at).await
    }

    async fn bump_token_version(&self, user_id: Uuid) -> Result<(), AppError> {
        if !self.user_repo.bump_token_version(user_id).await? {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    async fn update_user_profile(&self, user_id: Uuid, changes: ProfileChanges) -> Result<User, AppError> {
        self.user_repo
            .update_profile(user_id, changes)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn set_deletion_schedule(
        &self,
        user_id: Uuid,
        schedule: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<User, AppError> {
        let (requested_at, scheduled_for, status) = match schedule {
            Some((requested, scheduled)) => (Some(requested), Some(scheduled), UserStatus::PendingDeletion),
            None => (None, None, UserStatus::Active),
        };
        self.user_repo
            .set_deletion_schedule(user_id, requested_at, scheduled_for, status)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn purge_due_deletions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        self.user_repo.soft_delete_due(now).await
    }

    async fn increment_ai_credits(&self, workspace_id: Uuid, credits: i32) -> Result<Workspace, AppError> {
        if let Some(updated) = self.workspace_repo.try_increment_ai_credits(workspace_id, credits).await? {
            return Ok(updated);
        }

        // O UPDATE não casou: descobre se foi inexistência ou teto
        match self.workspace_repo.find_by_id(workspace_id).await? {
            Some(ws) if !ws.is_deleted() => Err(AppError::AiCreditsExceeded {
                requested: credits,
                remaining: ws.ai_credits_remaining(),
            }),
            _ => Err(AppError::WorkspaceNotFound(workspace_id)),
        }
    }

    async fn reset_ai_credits(&self, workspace_id: Uuid) -> Result<Workspace, AppError> {
        let ws = self.workspace_repo.reset_ai_credits(workspace_id).await?;
        Self::found(ws, workspace_id)
    }

    async fn update_subscription(
        &self,
        workspace_id: Uuid,
        tier: SubscriptionTier,
        status: SubscriptionStatus,
    ) -> Result<Workspace, AppError> {
        let ws = self.workspace_repo.update_subscription(workspace_id, tier, status).await?;
        Self::found(ws, workspace_id)
    }

    async fn connect_whatsapp(
        &self,
        workspace_id: Uuid,
        phone_number: &str,
        session_data: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<Workspace, AppError> {
        let ws = self.workspace_repo
            .connect_whatsapp(workspace_id, phone_number, session_data, at)
            .await?;
        Self::found(ws, workspace_id)
    }

    async fn disconnect_whatsapp(&self, workspace_id: Uuid) -> Result<Workspace, AppError> {
        let ws = self.workspace_repo.disconnect_whatsapp(workspace_id).await?;
        Self::found(ws, workspace_id)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
