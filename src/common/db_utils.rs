// src/common/db_utils.rs

use crate::common::error::AppError;

// Nomes das constraints únicas criadas na migration
pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const WORKSPACES_SLUG_KEY: &str = "workspaces_slug_key";

// ---
// Helper: traduz violação de unicidade do Postgres para o erro de conflito certo.
// ---
// O índice único é quem garante a invariante; a checagem prévia no serviço é só
// para um erro rápido. Em corrida, o erro chega por aqui.
pub(crate) fn map_unique_violation(e: sqlx::Error, slug: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            if let Some(constraint) = db_err.constraint() {
                return match constraint {
                    USERS_EMAIL_KEY => AppError::EmailAlreadyExists,
                    WORKSPACES_SLUG_KEY => AppError::WorkspaceSlugTaken(slug.to_string()),
                    _ => AppError::UniqueConstraintViolation(constraint.to_string()),
                };
            }
        }
    }
    e.into()
}
