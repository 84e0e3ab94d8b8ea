// src/handlers/health.rs

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Aplicação no ar", body = HealthResponse)
    )
)]
pub async fn health(State(app_state): State<AppState>) -> Json<HealthResponse> {
    let database = match app_state.store.ping().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::error!("🔥 Health check: banco indisponível: {:?}", e);
            "down"
        }
    };

    Json(HealthResponse {
        status: "ok",
        database,
        timestamp: Utc::now(),
    })
}
