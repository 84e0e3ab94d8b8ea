// src/main.rs

use anyhow::Context;
use chrono::Utc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

use crate::config::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Inicializa o logger (RUST_LOG, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar
    let config = AppConfig::from_env().context("Configuração inválida")?;
    let port = config.port;
    let purge_interval = config.deletion_purge_interval;

    let app_state = AppState::new(config)
        .await
        .context("Falha ao inicializar o estado da aplicação")?;

    spawn_deletion_purge(app_state.clone(), purge_interval);

    let app = routes::build_router(app_state);

    // Inicia o servidor
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {addr}"))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Erro no servidor Axum")?;

    tracing::info!("Servidor encerrado");
    Ok(())
}

// Rotina periódica: efetiva as exclusões de conta vencidas
fn spawn_deletion_purge(app_state: AppState, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = app_state.user_service.purge_due_deletions(Utc::now()).await {
                tracing::error!("🔥 Falha na rotina de exclusão de contas: {:?}", e);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Sem sinal, o servidor roda até ser morto
        tracing::error!("🔥 Falha ao escutar o sinal de desligamento: {:?}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Sinal de desligamento recebido");
}
