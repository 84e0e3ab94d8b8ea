// src/services/credentials.rs

use async_trait::async_trait;
use bcrypt::{hash, verify};

use crate::common::error::AppError;

/// Provedor de identidade plugável: gera e confere a representação
/// armazenada de uma credencial. O texto puro nunca é persistido.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn hash(&self, secret: &str) -> Result<String, AppError>;

    async fn verify(&self, secret: &str, credential: &str) -> Result<bool, AppError>;
}

/// Implementação padrão com bcrypt, fora do executor assíncrono.
#[derive(Clone)]
pub struct BcryptVerifier {
    cost: u32,
}

impl BcryptVerifier {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

#[async_trait]
impl CredentialVerifier for BcryptVerifier {
    async fn hash(&self, secret: &str) -> Result<String, AppError> {
        let secret = secret.to_owned();
        let cost = self.cost;

        // Hashing é CPU-bound: vai para um thread separado
        let hashed = tokio::task::spawn_blocking(move || hash(&secret, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    async fn verify(&self, secret: &str, credential: &str) -> Result<bool, AppError> {
        let secret = secret.to_owned();
        let credential = credential.to_owned();

        let is_valid = tokio::task::spawn_blocking(move || verify(&secret, &credential))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
        Ok(is_valid)
    }
}
