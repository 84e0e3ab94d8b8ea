// src/services/auth.rs

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    common::{
        error::{AppError, AuthFailure},
        slug::slugify,
    },
    db::TenantStore,
    models::{
        auth::{AuthResponse, Claims, ProfileResponse, TokenKind, TokenPair},
        user::{NewUser, User, UserRole, UserStatus, UserView},
        workspace::{NewWorkspace, Workspace, WorkspaceProfile, WorkspaceSummary},
    },
    services::{credentials::CredentialVerifier, token::TokenIssuer},
};

// O que o gate devolve para os handlers
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub claims: Claims,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn TenantStore>,
    credentials: Arc<dyn CredentialVerifier>,
    tokens: TokenIssuer,
    // Hash descartável, gerado no primeiro login com e-mail desconhecido
    dummy_hash: Arc<OnceCell<String>>,
}

const DUMMY_PASSWORD: &str = "senha-ficticia-para-tempo-constante";

// Regra de acesso: suspenso e excluído nunca autenticam.
// `pending_deletion` autentica, para poder cancelar a exclusão.
fn status_gate(user: &User) -> Result<(), AuthFailure> {
    if user.is_deleted() {
        return Err(AuthFailure::AccountDeleted);
    }
    if user.status == UserStatus::Suspended {
        return Err(AuthFailure::AccountSuspended);
    }
    Ok(())
}

impl AuthService {
    pub fn new(
        store: Arc<dyn TenantStore>,
        credentials: Arc<dyn CredentialVerifier>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            store,
            credentials,
            tokens,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Registro: cria o workspace e o usuário dono numa única unidade atômica.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        workspace_name: &str,
    ) -> Result<AuthResponse, AppError> {
        let slug = slugify(workspace_name);
        if slug.is_empty() {
            return Err(AppError::InvalidInput(
                "O nome do workspace precisa conter letras ou números.".into(),
            ));
        }

        // 1. Checagem otimista para um erro rápido.
        // Quem garante de verdade é o índice único do store.
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }
        if self.store.find_workspace_by_slug(&slug).await?.is_some() {
            return Err(AppError::WorkspaceSlugTaken(slug));
        }

        // 2. Hash da senha (só o hash é persistido)
        let password_hash = self.credentials.hash(password).await?;

        // 3. Workspace + dono, na mesma transação
        let now = Utc::now();
        let new_workspace = NewWorkspace::for_registration(workspace_name, slug, now);
        let owner = NewUser {
            id: Uuid::new_v4(),
            workspace_id: new_workspace.id,
            email: email.to_string(),
            full_name: full_name.to_string(),
            role: UserRole::Owner,
            password_hash,
        };
        let (workspace, mut user) = self.store
            .create_workspace_with_owner(new_workspace, owner)
            .await?;

        // 4. Tokens + último login
        let tokens = self.tokens.issue_pair(&user)?;
        self.store.record_login(user.id, now).await?;
        user.last_login_at = Some(now);

        tracing::info!(user_id = %user.id, workspace_id = %workspace.id, slug = %workspace.slug, "✅ Novo workspace registrado");

        Ok(AuthResponse {
            user: UserView::from(&user),
            workspace: WorkspaceSummary::from(&workspace),
            tokens,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let Some(mut user) = self.store.find_user_by_email(email).await? else {
            // Paga o mesmo custo de bcrypt de um e-mail existente
            let dummy = self.dummy_hash
                .get_or_try_init(|| self.credentials.hash(DUMMY_PASSWORD))
                .await?;
            let _ = self.credentials.verify(password, dummy).await?;
            return Err(AppError::InvalidCredentials(AuthFailure::UnknownEmail));
        };

        // Status antes da senha: conta bloqueada nunca chega a emitir token
        status_gate(&user).map_err(AppError::InvalidCredentials)?;

        let is_password_valid = self.credentials.verify(password, &user.password_hash).await?;
        if !is_password_valid {
            return Err(AppError::InvalidCredentials(AuthFailure::WrongPassword));
        }

        let workspace = self
            .active_workspace(user.workspace_id)
            .await?
            .ok_or(AppError::InvalidCredentials(AuthFailure::WorkspaceUnavailable))?;

        let tokens = self.tokens.issue_pair(&user)?;
        let now = Utc::now();
        self.store.record_login(user.id, now).await?;
        user.last_login_at = Some(now);

        tracing::info!(user_id = %user.id, workspace_id = %workspace.id, "🔑 Login efetuado");

        Ok(AuthResponse {
            user: UserView::from(&user),
            workspace: WorkspaceSummary::from(&workspace),
            tokens,
        })
    }

    /// Troca um refresh token válido por um par novo, a partir do estado atual do usuário.
    /// Qualquer falha vira o mesmo `InvalidRefreshToken`.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let principal = self
            .resolve(refresh_token, TokenKind::Refresh)
            .await
            .map_err(|e| match e {
                AppError::InvalidToken(reason) => AppError::InvalidRefreshToken(reason),
                other => other,
            })?;

        tracing::debug!(user_id = %principal.user.id, "Refresh de token");
        self.tokens.issue_pair(&principal.user)
    }

    /// Logout revoga: todos os tokens emitidos antes deste ponto deixam de valer.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        self.store.bump_token_version(user_id).await?;
        tracing::info!(user_id = %user_id, "👋 Logout (tokens revogados)");
        Ok(())
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<ProfileResponse, AppError> {
        let user = self.store
            .find_user_by_id(user_id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or(AppError::UserNotFound)?;

        let workspace = self
            .active_workspace(user.workspace_id)
            .await?
            .ok_or(AppError::WorkspaceNotFound(user.workspace_id))?;

        Ok(ProfileResponse {
            user: UserView::from(&user),
            workspace: WorkspaceProfile::from(&workspace),
        })
    }

    /// Gate de autenticação de toda rota não pública.
    ///
    /// Revalida o usuário a cada requisição: suspensão, exclusão ou logout
    /// valem na hora, sem esperar o token expirar.
    pub async fn authenticate(&self, access_token: &str) -> Result<Principal, AppError> {
        self.resolve(access_token, TokenKind::Access).await
    }

    async fn resolve(&self, token: &str, kind: TokenKind) -> Result<Principal, AppError> {
        let claims = self.tokens
            .validate(token, kind)
            .map_err(AppError::InvalidToken)?;

        let user = self.store
            .find_user_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken(AuthFailure::UnknownSubject))?;

        status_gate(&user).map_err(AppError::InvalidToken)?;

        if claims.ver != user.token_version {
            return Err(AppError::InvalidToken(AuthFailure::RevokedToken));
        }

        if self.active_workspace(user.workspace_id).await?.is_none() {
            return Err(AppError::InvalidToken(AuthFailure::WorkspaceUnavailable));
        }

        Ok(Principal { user, claims })
    }

    async fn active_workspace(&self, id: Uuid) -> Result<Option<Workspace>, AppError> {
        Ok(self.store
            .find_workspace_by_id(id)
            .await?
            .filter(|ws| !ws.is_deleted()))
    }
}
