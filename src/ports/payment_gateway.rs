//! Payment gateway port for external payment providers.
//!
//! Each provider (Stripe, Flutterwave) is one implementation, constructed
//! once at startup with explicit configuration and registered in a
//! [`GatewayRegistry`]. Handlers never reach for a global client.
//!
//! # Contract
//!
//! - Every outbound call carries a bounded timeout. Transport failures and
//!   timeouts surface as `GatewayErrorCode::Unavailable` and are not retried
//!   inline.
//! - `initialize` is keyed by the engine-generated reference, which the
//!   provider echoes back on webhooks and verification.
//! - `verify_webhook` authenticates the payload before any field is read.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{Currency, UserId};
use crate::domain::payment::{BillingError, PaymentMethod, PaymentProvider, WebhookError};
use crate::domain::transaction::TransactionLookup;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    /// Starts a payment and returns what the client needs to complete it.
    async fn initialize(
        &self,
        request: &InitializeRequest,
    ) -> Result<PaymentInstrument, GatewayError>;

    /// Asks the provider for the current state of the payment with `reference`.
    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError>;

    /// Authenticates a raw webhook payload and extracts the event.
    ///
    /// `signature` is the provider's signature header, if present.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<GatewayEvent, WebhookError>;
}

/// Who is paying, as sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
}

/// Request to start a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Engine-generated reference. Doubles as the idempotency key.
    pub reference: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub customer: Customer,
    pub redirect_url: String,
    pub description: String,
    /// Intent payload echoed back on webhooks.
    pub metadata: Value,
}

/// What the client uses to complete a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentInstrument {
    /// Confirmed client-side (Stripe Elements).
    ClientSecret {
        client_secret: String,
        payment_intent_id: String,
    },
    /// Hosted checkout page (Flutterwave).
    RedirectLink { link: String },
}

/// Provider-reported state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Success,
    Failed,
    Pending,
}

impl VerificationStatus {
    /// Maps a provider status string. Anything unrecognized is still pending.
    pub fn from_provider_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "successful" | "succeeded" => VerificationStatus::Success,
            "failed" | "cancelled" | "canceled" => VerificationStatus::Failed,
            _ => VerificationStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Success => "success",
            VerificationStatus::Failed => "failed",
            VerificationStatus::Pending => "pending",
        }
    }
}

/// Result of `verify`.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub status: VerificationStatus,
    /// Provider response, kept as evidence on the transaction.
    pub raw: Value,
}

/// What an authenticated webhook says happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    PaymentSucceeded,
    PaymentFailed,
    /// Authentic but not an event the engine acts on.
    Other,
}

/// An authenticated webhook event.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub kind: GatewayEventKind,
    /// Provider event type, e.g. `payment_intent.succeeded`.
    pub event_type: String,
    /// Transaction the event concerns, when the event identifies one.
    pub lookup: Option<TransactionLookup>,
    pub raw: Value,
}

/// Categories of gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network failure or timeout.
    Unavailable,
    /// Provider refused the request.
    Rejected,
    /// Provider answered with something we could not interpret.
    InvalidResponse,
    InvalidSignature,
    /// No credentials configured for the requested provider.
    NotConfigured,
}

/// Error from a gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Unavailable, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Rejected, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }

    pub fn not_configured(provider: PaymentProvider) -> Self {
        Self::new(
            GatewayErrorCode::NotConfigured,
            format!("Payment provider '{}' is not configured", provider),
        )
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for BillingError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            GatewayErrorCode::Unavailable | GatewayErrorCode::InvalidResponse => {
                BillingError::gateway_unavailable(err.message)
            }
            GatewayErrorCode::Rejected => BillingError::payment_failed(err.message),
            GatewayErrorCode::InvalidSignature => BillingError::signature(err.message),
            GatewayErrorCode::NotConfigured => {
                BillingError::validation("payment_provider", err.message)
            }
        }
    }
}

/// Configured gateways, keyed by provider.
#[derive(Clone)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentProvider, Arc<dyn PaymentGateway>>,
    default_provider: PaymentProvider,
}

impl GatewayRegistry {
    pub fn new(default_provider: PaymentProvider) -> Self {
        Self {
            gateways: HashMap::new(),
            default_provider,
        }
    }

    /// Registers a gateway under its own provider.
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.provider(), gateway);
        self
    }

    pub fn default_provider(&self) -> PaymentProvider {
        self.default_provider
    }

    /// The requested provider's gateway, or the default one.
    pub fn resolve(
        &self,
        requested: Option<PaymentProvider>,
    ) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
        self.get(requested.unwrap_or(self.default_provider))
    }

    pub fn get(&self, provider: PaymentProvider) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
        self.gateways
            .get(&provider)
            .cloned()
            .ok_or_else(|| GatewayError::not_configured(provider))
    }

    pub fn providers(&self) -> Vec<PaymentProvider> {
        self.gateways.keys().copied().collect()
    }
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("providers", &self.providers())
            .field("default_provider", &self.default_provider)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubGateway(PaymentProvider);

    #[async_trait]
    impl PaymentGateway for StubGateway {
        fn provider(&self) -> PaymentProvider {
            self.0
        }

        async fn initialize(
            &self,
            _request: &InitializeRequest,
        ) -> Result<PaymentInstrument, GatewayError> {
            Err(GatewayError::unavailable("stub"))
        }

        async fn verify(&self, _reference: &str) -> Result<Verification, GatewayError> {
            Err(GatewayError::unavailable("stub"))
        }

        async fn verify_webhook(
            &self,
            _payload: &[u8],
            _signature: Option<&str>,
        ) -> Result<GatewayEvent, WebhookError> {
            Err(WebhookError::InvalidSignature)
        }
    }

    #[test]
    fn payment_gateway_is_object_safe_and_send_sync() {
        fn _assert_trait_object(_: &dyn PaymentGateway) {}
        fn _assert_arc_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_arc_send_sync::<Arc<dyn PaymentGateway>>();
    }

    #[test]
    fn provider_statuses_map_to_three_outcomes() {
        use VerificationStatus::*;
        assert_eq!(VerificationStatus::from_provider_status("successful"), Success);
        assert_eq!(VerificationStatus::from_provider_status("succeeded"), Success);
        assert_eq!(VerificationStatus::from_provider_status("failed"), Failed);
        assert_eq!(VerificationStatus::from_provider_status("cancelled"), Failed);
        assert_eq!(VerificationStatus::from_provider_status("canceled"), Failed);
        assert_eq!(VerificationStatus::from_provider_status("requires_action"), Pending);
        assert_eq!(VerificationStatus::from_provider_status(""), Pending);
    }

    #[test]
    fn registry_resolves_requested_or_default() {
        let registry = GatewayRegistry::new(PaymentProvider::Flutterwave)
            .with_gateway(Arc::new(StubGateway(PaymentProvider::Stripe)))
            .with_gateway(Arc::new(StubGateway(PaymentProvider::Flutterwave)));

        assert_eq!(
            registry.resolve(None).unwrap().provider(),
            PaymentProvider::Flutterwave
        );
        assert_eq!(
            registry.resolve(Some(PaymentProvider::Stripe)).unwrap().provider(),
            PaymentProvider::Stripe
        );
    }

    #[test]
    fn registry_reports_missing_provider() {
        let registry = GatewayRegistry::new(PaymentProvider::Stripe);
        let err = registry.resolve(None).err().unwrap();
        assert_eq!(err.code, GatewayErrorCode::NotConfigured);
    }

    #[test]
    fn gateway_errors_map_to_billing_taxonomy() {
        assert!(matches!(
            BillingError::from(GatewayError::unavailable("timeout")),
            BillingError::GatewayUnavailable(_)
        ));
        assert!(matches!(
            BillingError::from(GatewayError::rejected("card declined")),
            BillingError::PaymentFailed { .. }
        ));
        assert!(matches!(
            BillingError::from(GatewayError::not_configured(PaymentProvider::Stripe)),
            BillingError::ValidationFailed { .. }
        ));
    }
}
