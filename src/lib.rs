//! Identity Store
//!
//! The data-integrity and lookup kernel beneath an authentication service:
//! - Users with unique usernames and emails
//! - A fixed role catalog looked up by name
//! - A many-to-many user/role assignment index
//! - Credential verification through an opaque password hasher

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::AppConfig;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use domain::IdentityStore;
use infrastructure::identity::{
    Argon2Hasher, IdentityService, InMemoryIdentityStore, PostgresIdentityStore,
};
use tracing::info;

/// Open the configured storage backend and build the identity service
pub async fn create_identity_service(config: &AppConfig) -> anyhow::Result<IdentityService> {
    info!("Storage backend: {:?}", config.storage.backend);

    let store: Arc<dyn IdentityStore> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(InMemoryIdentityStore::new()),
        StorageBackend::Postgres => Arc::new(connect_postgres(&config.storage).await?),
    };

    let service = IdentityService::new(store, Arc::new(Argon2Hasher::new()));

    if config.catalog.seed_on_startup {
        service.seed_roles().await?;
    }

    Ok(service)
}

/// Connect to PostgreSQL using the storage section of the config
pub async fn connect_postgres(storage: &StorageConfig) -> anyhow::Result<PostgresIdentityStore> {
    let database_url = storage.resolve_database_url().ok_or_else(|| {
        anyhow::anyhow!("storage.database_url or DATABASE_URL is required for the postgres backend")
    })?;

    info!("Connecting to PostgreSQL...");
    let store = PostgresIdentityStore::connect(&database_url, storage.max_connections).await?;
    info!("PostgreSQL connection established");

    Ok(store)
}
