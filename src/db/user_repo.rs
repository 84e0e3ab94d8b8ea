// src/db/user_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::user::{NewUser, ProfileChanges, User, UserStatus},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail (comparação exata, sensível a maiúsculas)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    pub async fn list_by_workspace(&self, workspace_id: Uuid) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE workspace_id = $1 AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Quantos assentos estão ocupados no workspace.
    pub async fn count_in_workspace<'e, E>(&self, executor: E, workspace_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE workspace_id = $1 AND deleted_at IS NULL",
        )
            .bind(workspace_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    // Cria um novo usuário no banco de dados
    // Com tratamento de erro específico para e-mails duplicados.
    pub async fn insert<'e, E>(&self, executor: E, input: &NewUser) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, workspace_id, email, full_name, role, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
            .bind(input.id)
            .bind(input.workspace_id)
            .bind(&input.email)
            .bind(&input.full_name)
            .bind(input.role)
            .bind(&input.password_hash)
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, ""))
    }

    pub async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn bump_token_version(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET token_version = token_version + 1, updated_at = NOW() WHERE id = $1",
        )
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// COALESCE mantém o valor atual dos campos não enviados;
    /// `settings || $4` é a mesclagem rasa do jsonb.
    pub async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<Option<User>, AppError> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                avatar_url = COALESCE($3, avatar_url),
                settings = settings || COALESCE($4::jsonb, '{}'::jsonb),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
            .bind(id)
            .bind(changes.full_name)
            .bind(changes.avatar_url)
            .bind(changes.settings.map(Json))
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    pub async fn set_deletion_schedule(
        &self,
        id: Uuid,
        requested_at: Option<DateTime<Utc>>,
        scheduled_for: Option<DateTime<Utc>>,
        status: UserStatus,
    ) -> Result<Option<User>, AppError> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET deletion_requested_at = $2,
                deletion_scheduled_for = $3,
                status = $4,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
            .bind(id)
            .bind(requested_at)
            .bind(scheduled_for)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    pub async fn soft_delete_due(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = $1, updated_at = $1
            WHERE status = $2
              AND deletion_scheduled_for <= $1
              AND deleted_at IS NULL
            "#,
        )
            .bind(now)
            .bind(UserStatus::PendingDeletion)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
