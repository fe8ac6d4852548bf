/// Database configuration and connection management
pub mod database;

/// Secrets read from the environment (`.env`)
pub mod secrets;

/// Application settings loaded from config.toml
pub mod settings;

pub use settings::{AppConfig, OrderPolicy, PaymentsConfig, ProductSeed, ServerConfig};
