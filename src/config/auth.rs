//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::auth::JwtConfig;

use super::error::ValidationError;
use super::server::Environment;

/// Bearer token verification (HS256, shared with the identity service)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,

    /// Expected `iss`, checked when set
    pub issuer: Option<String>,

    /// Expected `aud`, checked when set
    pub audience: Option<String>,
}

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

impl AuthConfig {
    pub fn jwt_config(&self) -> JwtConfig {
        let mut config = JwtConfig::new(self.jwt_secret.expose_secret().clone());
        if let Some(issuer) = &self.issuer {
            config = config.with_issuer(issuer.clone());
        }
        if let Some(audience) = &self.audience {
            config = config.with_audience(audience.clone());
        }
        config
    }

    /// Validate authentication configuration
    ///
    /// Production requires a secret of at least 32 bytes.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret = self.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production && secret.len() < MIN_PRODUCTION_SECRET_LEN {
            return Err(ValidationError::WeakJwtSecret);
        }
        Ok(())
    }
}
