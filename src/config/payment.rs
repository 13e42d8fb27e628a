//! Payment configuration
//!
//! Each provider is enabled by setting both of its secrets. At least one
//! provider must be enabled, and the default provider must be one of them.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::{FlutterwaveConfig, StripeConfig};
use crate::domain::payment::PaymentProvider;

use super::error::ValidationError;

/// Payment configuration (Stripe and Flutterwave)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Upper bound on every outbound gateway call, in seconds
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Stripe secret API key (`sk_...`)
    pub stripe_api_key: Option<SecretString>,

    /// Stripe webhook signing secret (`whsec_...`)
    pub stripe_webhook_secret: Option<SecretString>,

    /// Flutterwave secret key (`FLWSECK...`)
    pub flutterwave_secret_key: Option<SecretString>,

    /// Value Flutterwave sends in `verif-hash`
    pub flutterwave_webhook_hash: Option<SecretString>,

    /// Provider used when a request names none
    pub default_provider: Option<PaymentProvider>,
}

fn default_gateway_timeout() -> u64 {
    15
}

fn both<'a>(
    a: &'a Option<SecretString>,
    b: &'a Option<SecretString>,
) -> Option<(&'a String, &'a String)> {
    match (a, b) {
        (Some(a), Some(b)) => Some((a.expose_secret(), b.expose_secret())),
        _ => None,
    }
}

impl PaymentConfig {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Stripe settings, when both secrets are present.
    pub fn stripe(&self) -> Option<StripeConfig> {
        both(&self.stripe_api_key, &self.stripe_webhook_secret).map(|(key, secret)| {
            StripeConfig::new(key.clone(), secret.clone()).with_timeout(self.gateway_timeout())
        })
    }

    /// Flutterwave settings, when both secrets are present.
    pub fn flutterwave(&self) -> Option<FlutterwaveConfig> {
        both(&self.flutterwave_secret_key, &self.flutterwave_webhook_hash).map(|(key, hash)| {
            FlutterwaveConfig::new(key.clone(), hash.clone()).with_timeout(self.gateway_timeout())
        })
    }

    pub fn configured_providers(&self) -> Vec<PaymentProvider> {
        let mut providers = Vec::new();
        if self.stripe_api_key.is_some() && self.stripe_webhook_secret.is_some() {
            providers.push(PaymentProvider::Stripe);
        }
        if self.flutterwave_secret_key.is_some() && self.flutterwave_webhook_hash.is_some() {
            providers.push(PaymentProvider::Flutterwave);
        }
        providers
    }

    /// The explicit default, else the first configured provider.
    pub fn resolved_default_provider(&self) -> Option<PaymentProvider> {
        self.default_provider
            .or_else(|| self.configured_providers().first().copied())
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=60).contains(&self.gateway_timeout_secs) {
            return Err(ValidationError::InvalidGatewayTimeout);
        }

        match (&self.stripe_api_key, &self.stripe_webhook_secret) {
            (Some(key), Some(secret)) => {
                if !key.expose_secret().starts_with("sk_") {
                    return Err(ValidationError::InvalidStripeKey);
                }
                if !secret.expose_secret().starts_with("whsec_") {
                    return Err(ValidationError::InvalidStripeWebhookSecret);
                }
            }
            (Some(_), None) => {
                return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"))
            }
            (None, Some(_)) => {
                return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"))
            }
            (None, None) => {}
        }

        match (&self.flutterwave_secret_key, &self.flutterwave_webhook_hash) {
            (Some(key), Some(_)) => {
                if !key.expose_secret().starts_with("FLWSECK") {
                    return Err(ValidationError::InvalidFlutterwaveKey);
                }
            }
            (Some(_), None) => {
                return Err(ValidationError::MissingRequired(
                    "PAYMENT__FLUTTERWAVE_WEBHOOK_HASH",
                ))
            }
            (None, Some(_)) => {
                return Err(ValidationError::MissingRequired(
                    "PAYMENT__FLUTTERWAVE_SECRET_KEY",
                ))
            }
            (None, None) => {}
        }

        let configured = self.configured_providers();
        if configured.is_empty() {
            return Err(ValidationError::NoPaymentProviderConfigured);
        }
        if let Some(default) = self.default_provider {
            if !configured.contains(&default) {
                return Err(ValidationError::DefaultProviderNotConfigured(
                    default.to_string(),
                ));
            }
        }

        Ok(())
    }
}
