// src/middleware/auth.rs

use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::{AppError, AuthFailure},
    config::AppState,
    models::{auth::Claims, user::User},
};

/// Lista explícita dos templates de rota que dispensam token.
/// Todo o resto passa pelo gate de autenticação. O método não entra na chave:
/// método errado numa rota pública cai no 405 do próprio router.
#[derive(Debug, Default)]
pub struct PublicRoutes {
    routes: HashSet<String>,
}

impl PublicRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, path: impl Into<String>) -> Self {
        self.routes.insert(path.into());
        self
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.routes.contains(path)
    }
}

// Estado do guard: os serviços + a allow-list
#[derive(Clone)]
pub struct AuthGuard {
    pub app_state: AppState,
    pub public_routes: Arc<PublicRoutes>,
}

/// Middleware global. Aplicado com `Router::layer` sobre a API inteira.
pub async fn auth_guard(
    State(guard): State<AuthGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Sem rota casada: deixa o fallback responder 404
    let Some(matched) = request.extensions().get::<MatchedPath>().cloned() else {
        return Ok(next.run(request).await);
    };

    if guard.public_routes.is_public(matched.as_str()) {
        return Ok(next.run(request).await);
    }

    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::InvalidToken(AuthFailure::MissingBearer))?;

    let principal = guard.app_state.auth_service.authenticate(bearer.token()).await?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser {
        user: principal.user,
        claims: principal.claims,
    });
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken(AuthFailure::MissingBearer))
    }
}
