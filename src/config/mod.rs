//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `VIEWESTA` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use viewesta_payments::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod database;
mod error;
mod payment;
mod reaper;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use reaper::ReaperConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bind address, environment, logging, CORS, frontend URL
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Bearer token verification
    pub auth: AuthConfig,

    /// Gateway credentials and timeouts
    pub payment: PaymentConfig,

    #[serde(default)]
    pub reaper: ReaperConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `VIEWESTA` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `VIEWESTA__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `VIEWESTA__PAYMENT__STRIPE_API_KEY=sk_...` -> `payment.stripe_api_key`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VIEWESTA")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.payment.validate()?;
        self.reaper.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
