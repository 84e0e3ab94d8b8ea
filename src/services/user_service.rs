// src/services/user_service.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TenantStore,
    models::user::{ProfileChanges, User, UserView, DELETION_GRACE_DAYS},
};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn TenantStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserView, AppError> {
        let user = self.store
            .find_user_by_id(user_id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or(AppError::UserNotFound)?;
        Ok(UserView::from(&user))
    }

    /// Atualiza só nome, avatar e settings (estes mesclados sobre os atuais).
    pub async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges) -> Result<UserView, AppError> {
        if changes.is_empty() {
            return Err(AppError::InvalidInput("Nenhum campo válido para atualizar.".into()));
        }
        let user = self.store.update_user_profile(user_id, changes).await?;
        Ok(UserView::from(&user))
    }

    /// Lista os usuários de um workspace. Só o do próprio chamador:
    /// qualquer outro id responde como inexistente.
    pub async fn list_workspace_users(&self, caller: &User, workspace_id: Uuid) -> Result<Vec<UserView>, AppError> {
        if caller.workspace_id != workspace_id {
            return Err(AppError::WorkspaceNotFound(workspace_id));
        }
        let users = self.store.list_workspace_users(workspace_id).await?;
        Ok(users.iter().map(UserView::from).collect())
    }

    pub async fn request_deletion(&self, user_id: Uuid) -> Result<UserView, AppError> {
        let now = Utc::now();
        let scheduled_for = now + Duration::days(DELETION_GRACE_DAYS);
        let user = self.store
            .set_deletion_schedule(user_id, Some((now, scheduled_for)))
            .await?;

        tracing::info!(user_id = %user.id, scheduled_for = %scheduled_for, "🗑️ Exclusão de conta agendada");
        Ok(UserView::from(&user))
    }

    pub async fn cancel_deletion(&self, user_id: Uuid) -> Result<UserView, AppError> {
        let user = self.store.set_deletion_schedule(user_id, None).await?;
        tracing::info!(user_id = %user.id, "Exclusão de conta cancelada");
        Ok(UserView::from(&user))
    }

    /// Executa as exclusões vencidas (soft delete). Chamado pela task periódica.
    pub async fn purge_due_deletions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let purged = self.store.purge_due_deletions(now).await?;
        if purged > 0 {
            tracing::info!(purged, "🧹 Contas excluídas após o prazo de carência");
        }
        Ok(purged)
    }
}
