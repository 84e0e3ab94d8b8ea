// src/db/workspace_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::workspace::{NewWorkspace, SubscriptionStatus, SubscriptionTier, Workspace},
};

// Compara contra o saldo (teto - usado), nunca `usado + $2`: a soma estoura int4
// com créditos grandes e viraria erro de banco em vez de "limite excedido".
const INCREMENT_AI_CREDITS_SQL: &str = r#"
    UPDATE workspaces
    SET ai_credits_used_this_month = ai_credits_used_this_month + $2,
        updated_at = NOW()
    WHERE id = $1
      AND deleted_at IS NULL
      AND $2 <= max_ai_credits_per_month - ai_credits_used_this_month
    RETURNING *
"#;

// O repositório de workspaces, responsável pela tabela 'workspaces'
#[derive(Clone)]
pub struct WorkspaceRepository {
    pool: PgPool,
}

impl WorkspaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cria o workspace. Aceita um executor (pool ou transação).
    pub async fn insert<'e, E>(&self, executor: E, input: &NewWorkspace) -> Result<Workspace, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (
                id, name, slug,
                subscription_tier, subscription_status, trial_ends_at,
                max_users, max_ai_credits_per_month
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
            .bind(input.id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(input.subscription_tier)
            .bind(input.subscription_status)
            .bind(input.trial_ends_at)
            .bind(input.max_users)
            .bind(input.max_ai_credits_per_month)
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, &input.slug))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Workspace>, AppError> {
        let maybe_ws = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_ws)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Workspace>, AppError> {
        let maybe_ws = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_ws)
    }

    /// Trava a linha do workspace (FOR UPDATE) e devolve o limite de assentos.
    /// Serializa inserções concorrentes de usuários no mesmo workspace.
    pub async fn lock_seat_cap<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let max_users = sqlx::query_scalar::<_, i32>(
            "SELECT max_users FROM workspaces WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(max_users)
    }

    /// UPDATE condicional: só aplica se couber no teto.
    /// `None` = workspace inexistente OU teto estourado (o chamador distingue).
    pub async fn try_increment_ai_credits(&self, id: Uuid, credits: i32) -> Result<Option<Workspace>, AppError> {
        let updated = sqlx::query_as::<_, Workspace>(INCREMENT_AI_CREDITS_SQL)
            .bind(id)
            .bind(credits)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    pub async fn reset_ai_credits(&self, id: Uuid) -> Result<Option<Workspace>, AppError> {
        let updated = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces
            SET ai_credits_used_this_month = 0, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    pub async fn update_subscription(
        &self,
        id: Uuid,
        tier: SubscriptionTier,
        status: SubscriptionStatus,
    ) -> Result<Option<Workspace>, AppError> {
        let updated = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces
            SET subscription_tier = $2, subscription_status = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
            .bind(id)
            .bind(tier)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    pub async fn connect_whatsapp(
        &self,
        id: Uuid,
        phone_number: &str,
        session_data: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<Option<Workspace>, AppError> {
        let updated = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces
            SET whatsapp_phone_number = $2,
                whatsapp_session_data = $3,
                whatsapp_connected = TRUE,
                whatsapp_last_connected_at = $4,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
            .bind(id)
            .bind(phone_number)
            .bind(Json(session_data))
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    pub async fn disconnect_whatsapp(&self, id: Uuid) -> Result<Option<Workspace>, AppError> {
        let updated = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces
            SET whatsapp_connected = FALSE,
                whatsapp_session_data = NULL,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }
}
