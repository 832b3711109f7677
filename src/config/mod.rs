mod app_config;

pub use app_config::{
    AppConfig, CatalogConfig, LogFormat, LoggingConfig, StorageBackend, StorageConfig,
};
