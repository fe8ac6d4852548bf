//! Application settings loaded from config.toml
//!
//! The file holds the server bind options, the ordering rules (cancellation window,
//! preparation wait, low-stock threshold), payment URLs and the menu seeded on first
//! run. Every section has defaults, so a missing key never blocks startup.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_VAR: &str = "BARFLOW_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server options
    pub server: ServerConfig,
    /// Ordering rules
    pub ordering: OrderPolicy,
    /// Payment URLs
    pub payments: PaymentsConfig,
    /// Menu items to seed
    pub products: Vec<ProductSeed>,
}

/// HTTP server options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Maximum accepted request body
    pub body_limit_kb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout_secs: 30,
            body_limit_kb: 256,
        }
    }
}

/// Time and stock rules applied by the order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrderPolicy {
    /// Seconds after creation during which an order may still be cancelled
    pub cancellation_window_secs: i64,
    /// Seconds a `pending` order may wait before it is shown as expired
    pub preparation_wait_secs: i64,
    /// Remaining stock below which a low-stock notification is raised
    pub low_stock_threshold: i32,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            cancellation_window_secs: 120,
            preparation_wait_secs: 600,
            low_stock_threshold: 5,
        }
    }
}

/// Payment link and gateway URLs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Public base URL of the web client, used to build payment-link URLs
    pub web_url: String,
    /// Base URL of the payment gateway REST API
    pub gateway_base_url: String,
    /// Upper bound on a single gateway request
    pub gateway_timeout_secs: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            web_url: "http://localhost:3000".to_string(),
            gateway_base_url: "https://api.mercadopago.com".to_string(),
            gateway_timeout_secs: 10,
        }
    }
}

/// Configuration for a single menu item
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sale_price: f64,
    #[serde(default)]
    pub stock: i32,
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    debug!("Loading configuration from {:?}", path.as_ref());
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses the contents of a config.toml file.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `$BARFLOW_CONFIG`, falling back to ./config.toml
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}
