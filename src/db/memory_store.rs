// src/db/memory_store.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{merge_settings, TenantStore},
    models::{
        user::{NewUser, ProfileChanges, User, UserStatus},
        workspace::{JsonMap, NewWorkspace, SubscriptionStatus, SubscriptionTier, Workspace},
    },
};

#[derive(Default)]
struct Tables {
    workspaces: HashMap<Uuid, Workspace>,
    users: HashMap<Uuid, User>,
    // Índices únicos
    slug_index: HashMap<String, Uuid>,
    email_index: HashMap<String, Uuid>,
}

impl Tables {
    fn workspace_mut(&mut self, id: Uuid) -> Result<&mut Workspace, AppError> {
        self.workspaces
            .get_mut(&id)
            .filter(|ws| !ws.is_deleted())
            .ok_or(AppError::WorkspaceNotFound(id))
    }

    fn user_mut(&mut self, id: Uuid) -> Result<&mut User, AppError> {
        self.users
            .get_mut(&id)
            .filter(|u| !u.is_deleted())
            .ok_or(AppError::UserNotFound)
    }
}

/// `TenantStore` em memória, sem banco. Cada operação roda inteira sob um
/// único lock, que faz o papel dos índices únicos e do lock de linha.
#[derive(Default)]
pub struct MemoryTenantStore {
    tables: Mutex<Tables>,
}

impl MemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Suspensão é feita fora da API; nos testes, direto na tabela
    #[cfg(test)]
    pub(crate) async fn force_status(&self, user_id: Uuid, status: UserStatus) {
        if let Some(user) = self.tables.lock().await.users.get_mut(&user_id) {
            user.status = status;
        }
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .email_index
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_workspace_by_id(&self, id: Uuid) -> Result<Option<Workspace>, AppError> {
        Ok(self.tables.lock().await.workspaces.get(&id).cloned())
    }

    async fn find_workspace_by_slug(&self, slug: &str) -> Result<Option<Workspace>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .slug_index
            .get(slug)
            .and_then(|id| tables.workspaces.get(id))
            .cloned())
    }

    async fn create_workspace_with_owner(
        &self,
        workspace: NewWorkspace,
        owner: NewUser,
    ) -> Result<(Workspace, User), AppError> {
        let mut tables = self.tables.lock().await;

        // Todas as checagens antes de qualquer escrita: ou entra tudo, ou nada
        if tables.slug_index.contains_key(&workspace.slug) {
            return Err(AppError::WorkspaceSlugTaken(workspace.slug));
        }
        if tables.email_index.contains_key(&owner.email) {
            return Err(AppError::EmailAlreadyExists);
        }
        if workspace.max_users < 1 {
            return Err(AppError::SeatLimitReached { max_users: workspace.max_users });
        }

        let now = Utc::now();
        let new_workspace = Workspace {
            id: workspace.id,
            name: workspace.name,
            slug: workspace.slug,
            subscription_tier: workspace.subscription_tier,
            subscription_status: workspace.subscription_status,
            trial_ends_at: workspace.trial_ends_at,
            max_users: workspace.max_users,
            max_ai_credits_per_month: workspace.max_ai_credits_per_month,
            ai_credits_used_this_month: 0,
            whatsapp_phone_number: None,
            whatsapp_session_data: None,
            whatsapp_connected: false,
            whatsapp_last_connected_at: None,
            settings: Json(JsonMap::new()),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let new_user = User {
            id: owner.id,
            workspace_id: new_workspace.id,
            email: owner.email,
            full_name: owner.full_name,
            role: owner.role,
            avatar_url: None,
            password_hash: owner.password_hash,
            identity_verified_at: None,
            identity_verification_id: None,
            status: UserStatus::Active,
            last_login_at: None,
            token_version: 0,
            settings: Json(JsonMap::new()),
            deletion_requested_at: None,
            deletion_scheduled_for: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        tables.slug_index.insert(new_workspace.slug.clone(), new_workspace.id);
        tables.email_index.insert(new_user.email.clone(), new_user.id);
        tables.workspaces.insert(new_workspace.id, new_workspace.clone());
        tables.users.insert(new_user.id, new_user.clone());

        Ok((new_workspace, new_user))
    }

    async fn list_workspace_users(&self, workspace_id: Uuid) -> Result<Vec<User>, AppError> {
        let tables = self.tables.lock().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.workspace_id == workspace_id && !u.is_deleted())
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn bump_token_version(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        let user = tables.users.get_mut(&user_id).ok_or(AppError::UserNotFound)?;
        user.token_version += 1;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_user_profile(&self, user_id: Uuid, changes: ProfileChanges) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;
        let user = tables.user_mut(user_id)?;

        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(avatar_url) = changes.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        if let Some(patch) = changes.settings {
            merge_settings(&mut user.settings.0, patch);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_deletion_schedule(
        &self,
        user_id: Uuid,
        schedule: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;
        let user = tables.user_mut(user_id)?;

        match schedule {
            Some((requested, scheduled)) => {
                user.deletion_requested_at = Some(requested);
                user.deletion_scheduled_for = Some(scheduled);
                user.status = UserStatus::PendingDeletion;
            }
            None => {
                user.deletion_requested_at = None;
                user.deletion_scheduled_for = None;
                user.status = UserStatus::Active;
            }
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn purge_due_deletions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tables = self.tables.lock().await;
        let mut purged = 0;
        for user in tables.users.values_mut() {
            let due = user.deletion_scheduled_for.is_some_and(|at| at <= now);
            if user.status == UserStatus::PendingDeletion && due && !user.is_deleted() {
                user.deleted_at = Some(now);
                user.updated_at = now;
                purged += 1;
            }
        }
        Ok(purged)
    }

    async fn increment_ai_credits(&self, workspace_id: Uuid, credits: i32) -> Result<Workspace, AppError> {
        let mut tables = self.tables.lock().await;
        let ws = tables.workspace_mut(workspace_id)?;

        let remaining = ws.ai_credits_remaining();
        if credits > remaining {
            return Err(AppError::AiCreditsExceeded { requested: credits, remaining });
        }
        ws.ai_credits_used_this_month += credits;
        ws.updated_at = Utc::now();
        Ok(ws.clone())
    }

    async fn reset_ai_credits(&self, workspace_id: Uuid) -> Result<Workspace, AppError> {
        let mut tables = self.tables.lock().await;
        let ws = tables.workspace_mut(workspace_id)?;
        ws.ai_credits_used_this_month = 0;
        ws.updated_at = Utc::now();
        Ok(ws.clone())
    }

    async fn update_subscription(
        &self,
        workspace_id: Uuid,
        tier: SubscriptionTier,
        status: SubscriptionStatus,
    ) -> Result<Workspace, AppError> {
        let mut tables = self.tables.lock().await;
        let ws = tables.workspace_mut(workspace_id)?;
        ws.subscription_tier = tier;
        ws.subscription_status = status;
        ws.updated_at = Utc::now();
        Ok(ws.clone())
    }

    async fn connect_whatsapp(
        &self,
        workspace_id: Uuid,
        phone_number: &str,
        session_data: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<Workspace, AppError> {
        let mut tables = self.tables.lock().await;
        let ws = tables.workspace_mut(workspace_id)?;
        ws.whatsapp_phone_number = Some(phone_number.to_string());
        ws.whatsapp_session_data = Some(Json(session_data));
        ws.whatsapp_connected = true;
        ws.whatsapp_last_connected_at = Some(at);
        ws.updated_at = Utc::now();
        Ok(ws.clone())
    }

    async fn disconnect_whatsapp(&self, workspace_id: Uuid) -> Result<Workspace, AppError> {
        let mut tables = self.tables.lock().await;
        let ws = tables.workspace_mut(workspace_id)?;
        ws.whatsapp_connected = false;
        ws.whatsapp_session_data = None;
        ws.updated_at = Utc::now();
        Ok(ws.clone())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{user::UserRole, workspace::DEFAULT_MAX_AI_CREDITS};

    fn new_pair(name: &str, slug: &str, email: &str) -> (NewWorkspace, NewUser) {
        let ws = NewWorkspace::for_registration(name, slug.to_string(), Utc::now());
        let user = NewUser {
            id: Uuid::new_v4(),
            workspace_id: ws.id,
            email: email.to_string(),
            full_name: "Dono".into(),
            role: UserRole::Owner,
            password_hash: "hash".into(),
        };
        (ws, user)
    }

    async fn seeded() -> (Arc<MemoryTenantStore>, Workspace, User) {
        let store = Arc::new(MemoryTenantStore::new());
        let (ws, user) = new_pair("Acme", "acme", "dono@acme.com");
        let (ws, user) = store.create_workspace_with_owner(ws, user).await.unwrap();
        (store, ws, user)
    }

    #[tokio::test]
    async fn duplicate_slug_conflicts_and_writes_nothing() {
        let (store, _, _) = seeded().await;
        let (ws, user) = new_pair("Acme", "acme", "outro@acme.com");

        let err = store.create_workspace_with_owner(ws, user).await.unwrap_err();
        assert!(matches!(err, AppError::WorkspaceSlugTaken(ref s) if s == "acme"));
        assert!(store.find_user_by_email("outro@acme.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_and_leaves_no_orphan_workspace() {
        let (store, _, _) = seeded().await;
        let (ws, user) = new_pair("Other", "other", "dono@acme.com");

        let err = store.create_workspace_with_owner(ws, user).await.unwrap_err();
        assert!(matches!(err, AppError::EmailAlreadyExists));
        assert!(store.find_workspace_by_slug("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let (store, _, _) = seeded().await;
        assert!(store.find_user_by_email("DONO@acme.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn increment_over_budget_fails_without_partial_update() {
        let (store, ws, _) = seeded().await;
        store.increment_ai_credits(ws.id, 990).await.unwrap();

        let err = store.increment_ai_credits(ws.id, 11).await.unwrap_err();
        assert!(matches!(err, AppError::AiCreditsExceeded { requested: 11, remaining: 10 }));

        let after = store.find_workspace_by_id(ws.id).await.unwrap().unwrap();
        assert_eq!(after.ai_credits_used_this_month, 990);
    }

    #[tokio::test]
    async fn huge_increment_is_quota_exceeded() {
        let (store, ws, _) = seeded().await;
        store.increment_ai_credits(ws.id, 1).await.unwrap();

        let err = store.increment_ai_credits(ws.id, i32::MAX).await.unwrap_err();
        assert!(matches!(err, AppError::AiCreditsExceeded { requested: i32::MAX, remaining: 999 }));
    }

    #[tokio::test]
    async fn concurrent_increments_fill_budget_exactly() {
        let (store, ws, _) = seeded().await;

        // 100 x 10 = 1000 = teto
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_ai_credits(ws.id, 10).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let extra = store.increment_ai_credits(ws.id, 1).await;
        assert!(matches!(extra, Err(AppError::AiCreditsExceeded { .. })));

        let after = store.find_workspace_by_id(ws.id).await.unwrap().unwrap();
        assert_eq!(after.ai_credits_used_this_month, DEFAULT_MAX_AI_CREDITS);
    }

    #[tokio::test]
    async fn concurrent_overshoot_admits_exactly_the_budget() {
        let (store, ws, _) = seeded().await;

        // 101 chamadas de 10 disputando 1000 créditos: exatamente uma falha
        let handles: Vec<_> = (0..101)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_ai_credits(ws.id, 10).await })
            })
            .collect();

        let mut failures = 0;
        for handle in handles {
            if handle.await.unwrap().is_err() {
                failures += 1;
            }
        }
        assert_eq!(failures, 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_with_same_email_admit_one() {
        let store = Arc::new(MemoryTenantStore::new());

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let (ws, user) = new_pair("Co", &format!("co-{i}"), "same@x.com");
                    store.create_workspace_with_owner(ws, user).await
                })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, AppError::EmailAlreadyExists)),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn profile_update_merges_settings() {
        let (store, _, user) = seeded().await;
        let first = serde_json::json!({ "theme": "dark" }).as_object().cloned().unwrap();
        let second = serde_json::json!({ "lang": "pt" }).as_object().cloned().unwrap();

        store
            .update_user_profile(user.id, ProfileChanges { settings: Some(first), ..Default::default() })
            .await
            .unwrap();
        let updated = store
            .update_user_profile(user.id, ProfileChanges { settings: Some(second), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(updated.settings.0["theme"], "dark");
        assert_eq!(updated.settings.0["lang"], "pt");
    }

    #[tokio::test]
    async fn purge_soft_deletes_only_due_pending_users() {
        let (store, _, user) = seeded().await;
        let now = Utc::now();

        store
            .set_deletion_schedule(user.id, Some((now, now + chrono::Duration::days(30))))
            .await
            .unwrap();
        assert_eq!(store.purge_due_deletions(now).await.unwrap(), 0);

        assert_eq!(store.purge_due_deletions(now + chrono::Duration::days(31)).await.unwrap(), 1);
        let tombstone = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(tombstone.is_deleted());
        // Lápide continua ocupando o e-mail
        assert!(store.find_user_by_email("dono@acme.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn disconnect_clears_session_data() {
        let (store, ws, _) = seeded().await;
        let at = Utc::now();
        let connected = store
            .connect_whatsapp(ws.id, "+5511999998888", serde_json::json!({ "k": "v" }), at)
            .await
            .unwrap();
        assert!(connected.whatsapp_connected);
        assert_eq!(connected.whatsapp_last_connected_at, Some(at));

        let disconnected = store.disconnect_whatsapp(ws.id).await.unwrap();
        assert!(!disconnected.whatsapp_connected);
        assert!(disconnected.whatsapp_session_data.is_none());
    }

    #[tokio::test]
    async fn zero_seat_workspace_rejects_owner() {
        let store = MemoryTenantStore::new();
        let (mut ws, user) = new_pair("Tiny", "tiny", "t@x.com");
        ws.max_users = 0;
        let err = store.create_workspace_with_owner(ws, user).await.unwrap_err();
        assert!(matches!(err, AppError::SeatLimitReached { max_users: 0 }));
    }
}
