// src/routes.rs

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::auth::{auth_guard, AuthGuard, PublicRoutes},
};

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn build_router(app_state: AppState) -> Router {
    let prefix = format!("/api/{}", app_state.config.api_version);

    // Define as rotas de autenticação
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh-token", post(handlers::auth::refresh_token))
        .route("/logout", post(handlers::auth::logout))
        .route("/me", get(handlers::auth::get_me));

    let user_routes = Router::new()
        .route("/profile"
               ,get(handlers::users::get_profile)
               .patch(handlers::users::update_profile)
        )
        .route("/profile/deletion"
               ,post(handlers::users::request_deletion)
               .delete(handlers::users::cancel_deletion)
        )
        .route("/workspace/{workspace_id}", get(handlers::users::list_workspace_users));

    let workspace_routes = Router::new()
        .route("/{id}", get(handlers::workspaces::get_workspace))
        .route("/{id}/whatsapp/connect", patch(handlers::workspaces::connect_whatsapp))
        .route("/{id}/whatsapp/disconnect", patch(handlers::workspaces::disconnect_whatsapp))
        .route("/{id}/ai-credits", post(handlers::workspaces::consume_ai_credits))
        .route("/{id}/ai-credits/reset", post(handlers::workspaces::reset_ai_credits))
        .route("/{id}/subscription", patch(handlers::workspaces::update_subscription));

    let api = Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/workspaces", workspace_routes);

    // Únicas rotas sem token. Todo o resto passa pelo auth_guard.
    let public_routes = PublicRoutes::new()
        .allow(format!("{prefix}/auth/register"))
        .allow(format!("{prefix}/auth/login"))
        .allow(format!("{prefix}/auth/refresh-token"))
        .allow(format!("{prefix}/health"));

    let guard = AuthGuard {
        app_state: app_state.clone(),
        public_routes: Arc::new(public_routes),
    };

    // Combina tudo no router principal.
    // A documentação entra depois do layer, então fica fora do guard.
    Router::new()
        .nest(&prefix, api)
        .layer(axum_middleware::from_fn_with_state(guard, auth_guard))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{config::AppConfig, db::MemoryTenantStore};

    fn test_app() -> Router {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("JWT_SECRET", "test-secret-with-at-least-32-characters!"),
            ("BCRYPT_COST", "4"),
        ]);
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        build_router(AppState::with_store(config, Arc::new(MemoryTenantStore::new())))
    }

    async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn registration() -> Value {
        json!({
            "email": "a@x.com",
            "password": "Abc12345!",
            "fullName": "A B",
            "workspaceName": "My Co"
        })
    }

    async fn register(app: &Router) -> Value {
        let (status, body) = call(app, Method::POST, "/api/v1/auth/register", None, Some(registration())).await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn register_returns_created_with_tokens() {
        let app = test_app();
        let body = register(&app).await;

        assert_eq!(body["workspace"]["slug"], "my-co");
        assert_eq!(body["user"]["role"], "owner");
        assert_eq!(body["user"]["status"], "active");
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["accessToken"].is_string());
        assert!(body["refreshToken"].is_string());
        assert_eq!(body["expiresIn"], 86400);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = test_app();
        register(&app).await;
        let (status, _) = call(&app, Method::POST, "/api/v1/auth/register", None, Some(registration())).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn weak_password_is_rejected_with_details() {
        let app = test_app();
        let mut payload = registration();
        payload["password"] = json!("abcdefgh");

        let (status, body) = call(&app, Method::POST, "/api/v1/auth/register", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["password"].is_array());
    }

    #[tokio::test]
    async fn protected_routes_require_bearer() {
        let app = test_app();
        let (status, body) = call(&app, Method::GET, "/api/v1/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        let (status, _) = call(&app, Method::GET, "/api/v1/users/profile", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_failures_look_identical() {
        let app = test_app();
        register(&app).await;

        let wrong_password = json!({ "email": "a@x.com", "password": "Wrong999!" });
        let unknown_email = json!({ "email": "b@x.com", "password": "Abc12345!" });
        let (s1, b1) = call(&app, Method::POST, "/api/v1/auth/login", None, Some(wrong_password)).await;
        let (s2, b2) = call(&app, Method::POST, "/api/v1/auth/login", None, Some(unknown_email)).await;

        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s2, StatusCode::UNAUTHORIZED);
        assert_eq!(b1, b2);
    }

    #[tokio::test]
    async fn me_login_refresh_logout_flow() {
        let app = test_app();
        let registered = register(&app).await;
        let access = registered["accessToken"].as_str().unwrap().to_string();
        let refresh = registered["refreshToken"].as_str().unwrap().to_string();

        let (status, me) = call(&app, Method::GET, "/api/v1/auth/me", Some(&access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["user"]["email"], "a@x.com");
        assert_eq!(me["workspace"]["aiCreditsRemaining"], 1000);

        // Refresh token não serve como bearer
        let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some(&refresh), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, pair) = call(
            &app, Method::POST, "/api/v1/auth/refresh-token", None,
            Some(json!({ "refreshToken": refresh })),
        ).await;
        assert_eq!(status, StatusCode::OK);
        assert!(pair["accessToken"].is_string());

        let (status, body) = call(&app, Method::POST, "/api/v1/auth/logout", Some(&access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());

        let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some(&access), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let login = json!({ "email": "a@x.com", "password": "Abc12345!" });
        let (status, body) = call(&app, Method::POST, "/api/v1/auth/login", None, Some(login)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["workspace"]["slug"], "my-co");
    }

    #[tokio::test]
    async fn workspace_credits_over_http() {
        let app = test_app();
        let registered = register(&app).await;
        let access = registered["accessToken"].as_str().unwrap();
        let ws_id = registered["workspace"]["id"].as_str().unwrap();

        let uri = format!("/api/v1/workspaces/{ws_id}/ai-credits");
        let (status, ws) = call(&app, Method::POST, &uri, Some(access), Some(json!({ "credits": 999 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ws["aiCreditsUsedThisMonth"], 999);
        assert!(ws.get("whatsappSessionData").is_none());

        let (status, _) = call(&app, Method::POST, &uri, Some(access), Some(json!({ "credits": 2 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let foreign = format!("/api/v1/workspaces/{}", uuid::Uuid::new_v4());
        let (status, _) = call(&app, Method::GET, &foreign, Some(access), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn public_allow_list() {
        let app = test_app();

        let (status, body) = call(&app, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "up");

        let (status, body) = call(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/v1/auth/register"].is_object());

        // Rota inexistente: 404, não 401
        let (status, _) = call(&app, Method::GET, "/api/v1/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_on_public_route_is_405() {
        let app = test_app();

        let (status, _) = call(&app, Method::GET, "/api/v1/auth/register", None, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(&app, Method::GET, "/api/v1/auth/login", None, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        // Rota protegida continua pedindo token antes de qualquer coisa
        let (status, _) = call(&app, Method::DELETE, "/api/v1/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_field_is_bad_request_with_envelope() {
        let app = test_app();
        let mut payload = registration();
        payload.as_object_mut().unwrap().remove("password");

        let (status, body) = call(&app, Method::POST, "/api/v1/auth/register", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert!(body["details"]["body"].is_array());
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = test_app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"email\": "))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["details"]["body"].is_array());
    }

    #[tokio::test]
    async fn unknown_tier_is_bad_request() {
        let app = test_app();
        let registered = register(&app).await;
        let access = registered["accessToken"].as_str().unwrap();
        let ws_id = registered["workspace"]["id"].as_str().unwrap();

        let uri = format!("/api/v1/workspaces/{ws_id}/subscription");
        let (status, body) = call(
            &app, Method::PATCH, &uri, Some(access),
            Some(json!({ "tier": "gold", "status": "active" })),
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["body"].is_array());

        let (status, ws) = call(
            &app, Method::PATCH, &uri, Some(access),
            Some(json!({ "tier": "professional", "status": "active" })),
        ).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ws["subscriptionTier"], "professional");
    }

    #[tokio::test]
    async fn huge_credit_request_is_quota_error() {
        let app = test_app();
        let registered = register(&app).await;
        let access = registered["accessToken"].as_str().unwrap();
        let ws_id = registered["workspace"]["id"].as_str().unwrap();

        let uri = format!("/api/v1/workspaces/{ws_id}/ai-credits");
        let (status, _) = call(&app, Method::POST, &uri, Some(access), Some(json!({ "credits": 1 }))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app, Method::POST, &uri, Some(access),
            Some(json!({ "credits": i32::MAX })),
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
