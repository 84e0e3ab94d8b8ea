pub mod auth;
pub mod credentials;
pub mod token;
pub mod user_service;
pub mod workspace_service;
