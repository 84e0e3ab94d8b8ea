pub mod store;
pub use store::TenantStore;
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod workspace_repo;
pub use workspace_repo::WorkspaceRepository;
pub mod pg_store;
pub use pg_store::PgTenantStore;
pub mod memory_store;
pub use memory_store::MemoryTenantStore;
