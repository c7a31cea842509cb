//! API configuration

use serde::Deserialize;
use std::str::FromStr;

use core_kernel::{CoreError, Currency};
use domain_billing::{BillingConfig, CreditShortfallPolicy};

/// Where bills, customers and products are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// Process-local store, lost on restart; loaded from `memory_seed_path`
    Memory,
}

impl FromStr for StoreBackend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(CoreError::configuration(format!("unknown store backend '{other}'"))),
        }
    }
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    pub store_backend: StoreBackend,
    /// ISO 4217 code all amounts are carried in
    pub currency: String,
    /// `clamp` or `reject`
    pub credit_shortfall: String,
    /// JSON customers and products loaded into the memory backend at startup
    pub memory_seed_path: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/billing".to_string(),
            log_level: "info".to_string(),
            store_backend: StoreBackend::Postgres,
            currency: "USD".to_string(),
            credit_shortfall: "clamp".to_string(),
            memory_seed_path: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Engine settings derived from the currency and shortfall policy
    pub fn billing_config(&self) -> Result<BillingConfig, CoreError> {
        Ok(BillingConfig {
            currency: Currency::from_str(&self.currency)?,
            credit_shortfall: CreditShortfallPolicy::from_str(&self.credit_shortfall)?,
        })
    }
}
