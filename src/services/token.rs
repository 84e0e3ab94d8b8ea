// src/services/token.rs

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

use crate::{
    common::error::{AppError, AuthFailure},
    models::{
        auth::{Claims, TokenKind, TokenPair},
        user::User,
    },
};

/// Emite e valida os JWTs (HS256) de acesso e de refresh.
///
/// Nada é guardado no servidor: a validade é assinatura + expiração. A
/// revogação vem do claim `ver`, conferido contra o usuário pelo gate.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Par de tokens a partir do estado *atual* do usuário.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue(user, TokenKind::Access)?,
            refresh_token: self.issue(user, TokenKind::Refresh)?,
            expires_in: self.access_ttl_secs(),
        })
    }

    pub fn issue(&self, user: &User, kind: TokenKind) -> Result<String, AppError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let now = Utc::now();

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            workspace_id: user.workspace_id,
            role: user.role,
            typ: kind,
            ver: user.token_version,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }

    /// Valida assinatura, expiração e tipo. Pura, sem I/O.
    ///
    /// O motivo da falha é só para log; para o cliente todas são iguais.
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthFailure> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthFailure::ExpiredToken,
                ErrorKind::InvalidSignature => AuthFailure::BadSignature,
                _ => AuthFailure::MalformedToken,
            })?;

        if claims.typ != expected {
            return Err(AuthFailure::WrongTokenKind);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{UserRole, UserStatus};
    use crate::models::workspace::JsonMap;
    use sqlx::types::Json;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            "test-secret-with-at-least-32-characters!",
            Duration::hours(24),
            Duration::days(30),
        )
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            email: "a@x.com".into(),
            full_name: "A B".into(),
            role: UserRole::Owner,
            avatar_url: None,
            password_hash: "hash".into(),
            identity_verified_at: None,
            identity_verification_id: None,
            status: UserStatus::Active,
            last_login_at: None,
            token_version: 3,
            settings: Json(JsonMap::new()),
            deletion_requested_at: None,
            deletion_scheduled_for: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn claims_bind_user_to_workspace() {
        let issuer = issuer();
        let user = user();
        let pair = issuer.issue_pair(&user).unwrap();

        let claims = issuer.validate(&pair.access_token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.workspace_id, user.workspace_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, UserRole::Owner);
        assert_eq!(claims.ver, 3);
        assert_eq!(pair.expires_in, 24 * 3600);
    }

    #[test]
    fn lifetimes_are_independent() {
        let issuer = issuer();
        let pair = issuer.issue_pair(&user()).unwrap();

        let access = issuer.validate(&pair.access_token, TokenKind::Access).unwrap();
        let refresh = issuer.validate(&pair.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(access.exp - access.iat, 24 * 3600);
        assert_eq!(refresh.exp - refresh.iat, 30 * 24 * 3600);
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let issuer = issuer();
        let pair = issuer.issue_pair(&user()).unwrap();

        assert_eq!(
            issuer.validate(&pair.refresh_token, TokenKind::Access).unwrap_err(),
            AuthFailure::WrongTokenKind
        );
        assert_eq!(
            issuer.validate(&pair.access_token, TokenKind::Refresh).unwrap_err(),
            AuthFailure::WrongTokenKind
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer();
        let user = user();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            workspace_id: user.workspace_id,
            role: user.role,
            typ: TokenKind::Access,
            ver: 0,
            jti: Uuid::new_v4(),
            iat: now - 120,
            exp: now - 60,
        };
        let token = issuer.sign(&claims).unwrap();

        assert_eq!(issuer.validate(&token, TokenKind::Access).unwrap_err(), AuthFailure::ExpiredToken);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenIssuer::new("another-secret-with-32-characters-long", Duration::hours(1), Duration::hours(1));
        let token = other.issue(&user(), TokenKind::Access).unwrap();

        assert_eq!(issuer().validate(&token, TokenKind::Access).unwrap_err(), AuthFailure::BadSignature);
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(
            issuer().validate("not.a.jwt", TokenKind::Access).unwrap_err(),
            AuthFailure::MalformedToken
        );
    }
}
