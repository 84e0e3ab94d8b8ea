// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh_token,
        handlers::auth::logout,
        handlers::auth::get_me,

        // --- Users ---
        handlers::users::get_profile,
        handlers::users::update_profile,
        handlers::users::list_workspace_users,
        handlers::users::request_deletion,
        handlers::users::cancel_deletion,

        // --- Workspaces ---
        handlers::workspaces::get_workspace,
        handlers::workspaces::connect_whatsapp,
        handlers::workspaces::disconnect_whatsapp,
        handlers::workspaces::consume_ai_credits,
        handlers::workspaces::reset_ai_credits,
        handlers::workspaces::update_subscription,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::RefreshTokenPayload,
            models::auth::TokenPair,
            models::auth::AuthResponse,
            models::auth::ProfileResponse,
            models::auth::MessageResponse,

            // --- Users ---
            models::user::UserRole,
            models::user::UserStatus,
            models::user::UserView,
            models::user::UpdateProfilePayload,

            // --- Workspaces ---
            models::workspace::SubscriptionTier,
            models::workspace::SubscriptionStatus,
            models::workspace::Workspace,
            models::workspace::WorkspaceSummary,
            models::workspace::WorkspaceProfile,
            models::workspace::ConnectWhatsappPayload,
            models::workspace::ConsumeCreditsPayload,
            models::workspace::UpdateSubscriptionPayload,

            handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "Health", description = "Estado da aplicação"),
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Workspaces", description = "Workspace, WhatsApp, Créditos de IA e Assinatura")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
