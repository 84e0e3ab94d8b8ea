// src/config.rs

use std::{env, sync::Arc, time::Duration as StdDuration};

use anyhow::{anyhow, bail, Context};
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;

use crate::{
    common::duration::parse_expiry,
    db::{MemoryTenantStore, PgTenantStore, TenantStore},
    services::{
        auth::AuthService,
        credentials::BcryptVerifier,
        token::TokenIssuer,
        user_service::UserService,
        workspace_service::WorkspaceService,
    },
};

// Segredos curtos demais são recusados na inicialização
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub api_version: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiration: Duration,
    pub jwt_refresh_expiration: Duration,
    pub bcrypt_cost: u32,
    pub deletion_purge_interval: StdDuration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave → valor.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            bail!("JWT_SECRET deve ter pelo menos {} caracteres", MIN_SECRET_LEN);
        }

        let expiry = |key: &str, default: &str| {
            let raw = var(key, default);
            parse_expiry(&raw).ok_or_else(|| anyhow!("{} inválido: '{}'", key, raw))
        };

        let purge_secs: u64 = var("DELETION_PURGE_INTERVAL_SECS", "3600")
            .parse()
            .context("DELETION_PURGE_INTERVAL_SECS deve ser um número")?;

        Ok(Self {
            port: var("PORT", "3000").parse().context("PORT inválida")?,
            api_version: var("API_VERSION", "v1"),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: var("DATABASE_MAX_CONNECTIONS", "20")
                .parse()
                .context("DATABASE_MAX_CONNECTIONS inválido")?,
            jwt_secret,
            jwt_expiration: expiry("JWT_EXPIRATION", "24h")?,
            jwt_refresh_expiration: expiry("JWT_REFRESH_EXPIRATION", "30d")?,
            bcrypt_cost: var("BCRYPT_COST", "10").parse().context("BCRYPT_COST inválido")?,
            deletion_purge_interval: StdDuration::from_secs(purge_secs.max(1)),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn TenantStore>,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub workspace_service: WorkspaceService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn TenantStore> = match &config.database_url {
            Some(database_url) => {
                // Conecta ao banco de dados, usando '?' para propagar erros
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.database_max_connections)
                    .acquire_timeout(StdDuration::from_secs(3))
                    .connect(database_url)
                    .await
                    .context("Falha ao conectar ao banco de dados")?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!()
                    .run(&db_pool)
                    .await
                    .context("Falha ao rodar as migrações do banco de dados")?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                Arc::new(PgTenantStore::new(db_pool))
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL não definida: usando store em memória (dados não persistem)");
                Arc::new(MemoryTenantStore::new())
            }
        };

        Ok(Self::with_store(config, store))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_store(config: AppConfig, store: Arc<dyn TenantStore>) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_expiration, config.jwt_refresh_expiration);
        let credentials = Arc::new(BcryptVerifier::new(config.bcrypt_cost));

        Self {
            auth_service: AuthService::new(store.clone(), credentials, tokens),
            user_service: UserService::new(store.clone()),
            workspace_service: WorkspaceService::new(store.clone()),
            store,
            config: Arc::new(config),
        }
    }
}
