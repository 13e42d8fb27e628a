//! Flutterwave payment gateway adapter.
//!
//! `initialize` returns a hosted checkout link; the engine reference is the
//! `tx_ref`, which Flutterwave echoes on webhooks and accepts for lookup.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::adapters::provider_http::{build_client, status_error, transport_error};
use crate::domain::foundation::Currency;
use crate::domain::payment::{PaymentMethod, PaymentProvider, WebhookError};
use crate::domain::transaction::TransactionLookup;
use crate::ports::{
    GatewayError, GatewayEvent, GatewayEventKind, InitializeRequest, PaymentGateway,
    PaymentInstrument, Verification, VerificationStatus,
};

use super::types::{
    FlutterwaveCharge, FlutterwaveEnvelope, FlutterwaveWebhook, HostedLink, PaymentCustomer,
    PaymentCustomizations, PaymentRequest,
};

const PROVIDER: &str = "Flutterwave";

/// Flutterwave API configuration.
#[derive(Clone)]
pub struct FlutterwaveConfig {
    /// Secret key (FLWSECK...).
    secret_key: SecretString,

    /// Value Flutterwave sends in `verif-hash`.
    webhook_hash: SecretString,

    api_base_url: String,

    /// Title shown on the hosted checkout page.
    checkout_title: String,

    timeout: Duration,
}

impl FlutterwaveConfig {
    pub fn new(secret_key: impl Into<String>, webhook_hash: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            webhook_hash: SecretString::new(webhook_hash.into()),
            api_base_url: "https://api.flutterwave.com".to_string(),
            checkout_title: "Viewesta Platform".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for FlutterwaveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlutterwaveConfig")
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Flutterwave implementation of [`PaymentGateway`].
pub struct FlutterwaveGateway {
    config: FlutterwaveConfig,
    http_client: reqwest::Client,
}

impl FlutterwaveGateway {
    pub fn new(config: FlutterwaveConfig) -> Result<Self, GatewayError> {
        let http_client = build_client(config.timeout)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn verify_hash(&self, provided: &str) -> Result<(), WebhookError> {
        let expected = self.config.webhook_hash.expose_secret().as_bytes();
        if expected.ct_eq(provided.as_bytes()).unwrap_u8() != 1 {
            tracing::warn!("Invalid Flutterwave verif-hash");
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    fn parse_event(&self, payload: &[u8]) -> Result<GatewayEvent, WebhookError> {
        let raw: Value = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            WebhookError::ParseError(format!("Invalid JSON: {}", e))
        })?;
        let webhook: FlutterwaveWebhook = serde_json::from_value(raw.clone())
            .map_err(|e| WebhookError::ParseError(format!("Invalid Flutterwave event: {}", e)))?;

        let kind = match (webhook.event.as_str(), webhook.data.status.as_str()) {
            ("charge.completed", "successful") => GatewayEventKind::PaymentSucceeded,
            ("charge.completed", "failed") => GatewayEventKind::PaymentFailed,
            _ => GatewayEventKind::Other,
        };

        let lookup = match kind {
            GatewayEventKind::Other => None,
            _ => {
                let tx_ref = webhook
                    .data
                    .tx_ref
                    .ok_or(WebhookError::MissingField("data.tx_ref"))?;
                Some(TransactionLookup::Reference(tx_ref))
            }
        };

        tracing::info!(
            event_type = %webhook.event,
            charge_status = %webhook.data.status,
            "Flutterwave webhook hash verified"
        );

        Ok(GatewayEvent {
            kind,
            event_type: webhook.event,
            lookup,
            raw,
        })
    }
}

/// Checkout options for a method. Mobile money is narrowed to the payer's
/// market when the currency identifies one.
fn payment_options(method: PaymentMethod, currency: Currency) -> Result<&'static str, GatewayError> {
    match method {
        PaymentMethod::Card => Ok("card"),
        PaymentMethod::MobileMoney => Ok(match currency {
            Currency::Ugx => "mobilemoneyuganda",
            Currency::Kes => "mpesa",
            Currency::Ghs => "mobilemoneyghana",
            _ => "mobilemoneyuganda,mpesa,mobilemoneyghana,mobilemoneyrwanda,mobilemoneyzambia",
        }),
        PaymentMethod::Wallet => Err(GatewayError::rejected(
            "Wallet payments are settled internally, not through Flutterwave",
        )),
    }
}

fn payment_request<'a>(
    request: &'a InitializeRequest,
    title: &'a str,
) -> Result<PaymentRequest<'a>, GatewayError> {
    Ok(PaymentRequest {
        tx_ref: &request.reference,
        amount: request.amount.to_string(),
        currency: request.currency.code(),
        redirect_url: &request.redirect_url,
        payment_options: payment_options(request.method, request.currency)?,
        customer: PaymentCustomer {
            email: &request.customer.email,
            name: &request.customer.name,
        },
        customizations: PaymentCustomizations {
            title,
            description: &request.description,
        },
        meta: &request.metadata,
    })
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Flutterwave
    }

    async fn initialize(
        &self,
        request: &InitializeRequest,
    ) -> Result<PaymentInstrument, GatewayError> {
        let url = format!("{}/v3/payments", self.config.api_base_url);
        let body = payment_request(request, &self.config.checkout_title)?;

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let envelope: FlutterwaveEnvelope<HostedLink> = response
            .json()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        if !envelope.is_success() {
            return Err(GatewayError::rejected(format!(
                "Flutterwave refused payment: {}",
                envelope.message
            )));
        }

        let link = envelope
            .data
            .map(|d| d.link)
            .ok_or_else(|| GatewayError::invalid_response("Flutterwave response has no link"))?;

        tracing::info!(reference = %request.reference, "Flutterwave checkout link created");

        Ok(PaymentInstrument::RedirectLink { link })
    }

    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError> {
        let url = format!(
            "{}/v3/transactions/verify_by_reference",
            self.config.api_base_url
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .query(&[("tx_ref", reference)])
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        // Flutterwave has no charge for this reference until the payer submits one.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Verification {
                status: VerificationStatus::Pending,
                raw: Value::Null,
            });
        }

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let envelope: FlutterwaveEnvelope<FlutterwaveCharge> = serde_json::from_value(raw.clone())
            .map_err(|e| {
                GatewayError::invalid_response(format!("Unexpected Flutterwave response: {}", e))
            })?;

        let status = match envelope.data {
            Some(charge) if envelope.status == "success" => {
                VerificationStatus::from_provider_status(&charge.status)
            }
            _ => VerificationStatus::Pending,
        };

        Ok(Verification { status, raw })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<GatewayEvent, WebhookError> {
        let signature = signature
            .filter(|s| !s.is_empty())
            .ok_or(WebhookError::MissingSignature)?;
        self.verify_hash(signature)?;
        self.parse_event(payload)
    }
}
