//! Stripe payment gateway adapter.
//!
//! Card payments go through PaymentIntents confirmed client-side; the engine
//! reference rides along as `metadata[reference]` and is the idempotency key.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::adapters::provider_http::{build_client, status_error, transport_error};
use crate::domain::payment::{PaymentMethod, PaymentProvider, WebhookError};
use crate::domain::transaction::TransactionLookup;
use crate::ports::{
    GatewayError, GatewayEvent, GatewayEventKind, InitializeRequest, PaymentGateway,
    PaymentInstrument, Verification, VerificationStatus,
};

use super::webhook_types::{
    SignatureHeader, SignatureParseError, StripePaymentIntent, StripeSearchResult,
    StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

const PROVIDER: &str = "Stripe";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for the Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Upper bound on every outbound call.
    timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
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

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Stripe implementation of [`PaymentGateway`].
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let http_client = build_client(config.timeout)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Verify the webhook signature against `now` (unix seconds).
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
        now: i64,
    ) -> Result<(), WebhookError> {
        let age = now - header.timestamp;

        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(WebhookError::TimestampOutOfRange);
        }

        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                event_timestamp = header.timestamp,
                current_time = now,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(WebhookError::InvalidTimestamp);
        }

        let mut mac = HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
            .map_err(|e| WebhookError::Processing(format!("Invalid webhook secret: {}", e)))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();
        let expected_bytes: &[u8] = expected.as_slice();

        let matched = header
            .v1_signatures
            .iter()
            .any(|provided| expected_bytes.ct_eq(provided.as_slice()).unwrap_u8() == 1);

        if !matched {
            tracing::warn!("Invalid Stripe webhook signature");
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Turn a verified payload into a gateway event.
    fn parse_event(&self, payload: &[u8]) -> Result<GatewayEvent, WebhookError> {
        let raw: Value = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            WebhookError::ParseError(format!("Invalid JSON: {}", e))
        })?;
        let event: StripeWebhookEvent = serde_json::from_value(raw.clone())
            .map_err(|e| WebhookError::ParseError(format!("Invalid Stripe event: {}", e)))?;

        let kind = match event.event_type.as_str() {
            "payment_intent.succeeded" => GatewayEventKind::PaymentSucceeded,
            "payment_intent.payment_failed" | "payment_intent.canceled" => {
                GatewayEventKind::PaymentFailed
            }
            _ => GatewayEventKind::Other,
        };

        let lookup = if kind == GatewayEventKind::Other {
            None
        } else {
            let intent: StripePaymentIntent = serde_json::from_value(event.data.object.clone())
                .map_err(|e| WebhookError::ParseError(format!("Invalid PaymentIntent: {}", e)))?;
            lookup_for(&intent)
        };

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            livemode = event.livemode,
            "Stripe webhook signature verified"
        );

        Ok(GatewayEvent {
            kind,
            event_type: event.event_type,
            lookup,
            raw,
        })
    }
}

/// Which transaction an intent belongs to. The engine reference wins over a
/// bare transaction id.
fn lookup_for(intent: &StripePaymentIntent) -> Option<TransactionLookup> {
    if let Some(reference) = intent.reference() {
        return Some(TransactionLookup::Reference(reference.to_string()));
    }
    intent
        .transaction_id()
        .and_then(|id| id.parse().ok())
        .map(TransactionLookup::Id)
}

/// Form body for `POST /v1/payment_intents`.
fn payment_intent_params(request: &InitializeRequest) -> Result<Vec<(String, String)>, GatewayError> {
    let minor = request
        .currency
        .to_minor_units(request.amount)
        .ok_or_else(|| GatewayError::rejected(format!("Amount {} is out of range", request.amount)))?;

    let mut params = vec![
        ("amount".to_string(), minor.to_string()),
        (
            "currency".to_string(),
            request.currency.code().to_ascii_lowercase(),
        ),
        ("description".to_string(), request.description.clone()),
        ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ("metadata[reference]".to_string(), request.reference.clone()),
        (
            "metadata[user_id]".to_string(),
            request.customer.user_id.to_string(),
        ),
    ];

    if let Some(fields) = request.metadata.as_object() {
        for (key, value) in fields {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            params.push((format!("metadata[{}]", key), value));
        }
    }

    if !request.customer.email.is_empty() {
        params.push(("receipt_email".to_string(), request.customer.email.clone()));
    }

    Ok(params)
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Stripe
    }

    async fn initialize(
        &self,
        request: &InitializeRequest,
    ) -> Result<PaymentInstrument, GatewayError> {
        if request.method != PaymentMethod::Card {
            return Err(GatewayError::rejected(format!(
                "Stripe does not accept payment method '{}'",
                request.method
            )));
        }

        let url = format!("{}/v1/payment_intents", self.config.api_base_url);
        let params = payment_intent_params(request)?;

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", &request.reference)
            .form(&params)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let intent: StripePaymentIntent = response
            .json()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            GatewayError::invalid_response("Stripe PaymentIntent has no client_secret")
        })?;

        tracing::info!(
            reference = %request.reference,
            payment_intent_id = %intent.id,
            "Stripe PaymentIntent created"
        );

        Ok(PaymentInstrument::ClientSecret {
            client_secret,
            payment_intent_id: intent.id,
        })
    }

    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError> {
        let url = format!("{}/v1/payment_intents/search", self.config.api_base_url);
        let query = format!("metadata['reference']:'{}'", reference.replace('\'', "\\'"));

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .query(&[("query", query.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let result: StripeSearchResult<StripePaymentIntent> = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::invalid_response(format!("Unexpected Stripe search result: {}", e)))?;

        // No intent yet means the client never got as far as paying.
        let status = result
            .data
            .first()
            .map(|intent| VerificationStatus::from_provider_status(&intent.status))
            .unwrap_or(VerificationStatus::Pending);

        Ok(Verification { status, raw })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<GatewayEvent, WebhookError> {
        let signature = signature.ok_or(WebhookError::MissingSignature)?;

        let header = SignatureHeader::parse(signature).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe-Signature header");
            match e {
                SignatureParseError::MissingHeader => WebhookError::MissingSignature,
                _ => WebhookError::InvalidSignature,
            }
        })?;

        self.verify_signature(payload, &header, chrono::Utc::now().timestamp())?;
        self.parse_event(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, TransactionId, UserId};
    use crate::ports::Customer;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const SECRET: &str = "whsec_test_secret";

    fn gateway() -> StripeGateway {
        StripeGateway::new(StripeConfig::new("sk_test_key", SECRET)).unwrap()
    }

    fn create_test_signature(secret: &str, timestamp: i64, payload: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        let result = mac.finalize().into_bytes();

        format!("t={},v1={}", timestamp, hex::encode(result))
    }

    fn intent_event(event_type: &str, metadata: Value) -> String {
        json!({
            "id": "evt_test",
            "type": event_type,
            "created": 1704067200,
            "livemode": false,
            "data": {
                "object": {
                    "id": "pi_test",
                    "status": "succeeded",
                    "amount": 499,
                    "currency": "usd",
                    "metadata": metadata
                }
            }
        })
        .to_string()
    }

    fn request(method: PaymentMethod) -> InitializeRequest {
        InitializeRequest {
            reference: "viewesta_1704067200000_abc".to_string(),
            amount: dec!(4.99),
            currency: Currency::Usd,
            method,
            customer: Customer {
                user_id: UserId::new("user-1").unwrap(),
                email: "viewer@example.com".to_string(),
                name: "Viewer".to_string(),
            },
            redirect_url: "http://localhost:3000/payment/callback".to_string(),
            description: "Movie purchase".to_string(),
            metadata: json!({ "movie_id": "m-1", "quality": "720p" }),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_new_sets_defaults() {
        let config = StripeConfig::new("api_key", "webhook_secret");
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn config_with_base_url_and_timeout() {
        let config = StripeConfig::new("key", "secret")
            .with_base_url("http://localhost:8080")
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn config_debug_hides_secrets() {
        let rendered = format!("{:?}", StripeConfig::new("sk_live_zzz", "whsec_zzz"));
        assert!(!rendered.contains("sk_live_zzz"));
        assert!(!rendered.contains("whsec_zzz"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn verify_signature_valid() {
        let payload = r#"{"id":"evt_test"}"#;
        let now = 1_704_067_200;
        let header = SignatureHeader::parse(&create_test_signature(SECRET, now, payload)).unwrap();

        assert!(gateway()
            .verify_signature(payload.as_bytes(), &header, now)
            .is_ok());
    }

    #[test]
    fn verify_signature_wrong_secret() {
        let payload = r#"{"id":"evt_test"}"#;
        let now = 1_704_067_200;
        let header =
            SignatureHeader::parse(&create_test_signature("wrong_secret", now, payload)).unwrap();

        assert!(matches!(
            gateway().verify_signature(payload.as_bytes(), &header, now),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_signature_tampered_payload() {
        let now = 1_704_067_200;
        let header =
            SignatureHeader::parse(&create_test_signature(SECRET, now, r#"{"amount":1}"#)).unwrap();

        assert!(matches!(
            gateway().verify_signature(br#"{"amount":1000}"#, &header, now),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_signature_expired_timestamp() {
        let payload = r#"{"id":"evt_test"}"#;
        let now = 1_704_067_200;
        let header =
            SignatureHeader::parse(&create_test_signature(SECRET, now - 600, payload)).unwrap();

        assert!(matches!(
            gateway().verify_signature(payload.as_bytes(), &header, now),
            Err(WebhookError::TimestampOutOfRange)
        ));
    }

    #[test]
    fn verify_signature_future_timestamp() {
        let payload = r#"{"id":"evt_test"}"#;
        let now = 1_704_067_200;
        let header =
            SignatureHeader::parse(&create_test_signature(SECRET, now + 120, payload)).unwrap();

        assert!(matches!(
            gateway().verify_signature(payload.as_bytes(), &header, now),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn verify_signature_small_future_tolerance() {
        let payload = r#"{"id":"evt_test"}"#;
        let now = 1_704_067_200;
        let header =
            SignatureHeader::parse(&create_test_signature(SECRET, now + 30, payload)).unwrap();

        assert!(gateway()
            .verify_signature(payload.as_bytes(), &header, now)
            .is_ok());
    }

    #[test]
    fn verify_signature_accepts_any_matching_v1() {
        let payload = r#"{"id":"evt_test"}"#;
        let now = 1_704_067_200;
        let good = create_test_signature(SECRET, now, payload);
        let good_sig = good.split_once(",v1=").unwrap().1;
        let header =
            SignatureHeader::parse(&format!("t={},v1={},v1={}", now, "00".repeat(32), good_sig))
                .unwrap();

        assert!(gateway()
            .verify_signature(payload.as_bytes(), &header, now)
            .is_ok());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Webhook Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn verify_webhook_requires_signature() {
        let result = gateway().verify_webhook(b"{}", None).await;
        assert!(matches!(result, Err(WebhookError::MissingSignature)));
    }

    #[tokio::test]
    async fn verify_webhook_rejects_malformed_header() {
        let result = gateway().verify_webhook(b"{}", Some("garbage")).await;
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[tokio::test]
    async fn verify_webhook_succeeded_event_carries_reference() {
        let payload = intent_event(
            "payment_intent.succeeded",
            json!({ "reference": "viewesta_1_abc" }),
        );
        let sig = create_test_signature(SECRET, chrono::Utc::now().timestamp(), &payload);

        let event = gateway()
            .verify_webhook(payload.as_bytes(), Some(&sig))
            .await
            .unwrap();

        assert_eq!(event.kind, GatewayEventKind::PaymentSucceeded);
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(
            event.lookup,
            Some(TransactionLookup::Reference("viewesta_1_abc".to_string()))
        );
    }

    #[tokio::test]
    async fn verify_webhook_falls_back_to_transaction_id() {
        let tx_id = TransactionId::new();
        let payload = intent_event(
            "payment_intent.succeeded",
            json!({ "transaction_id": tx_id.to_string() }),
        );
        let sig = create_test_signature(SECRET, chrono::Utc::now().timestamp(), &payload);

        let event = gateway()
            .verify_webhook(payload.as_bytes(), Some(&sig))
            .await
            .unwrap();

        assert_eq!(event.lookup, Some(TransactionLookup::Id(tx_id)));
    }

    #[tokio::test]
    async fn verify_webhook_payment_failed_event() {
        let payload = intent_event(
            "payment_intent.payment_failed",
            json!({ "reference": "sub_1_abc" }),
        );
        let sig = create_test_signature(SECRET, chrono::Utc::now().timestamp(), &payload);

        let event = gateway()
            .verify_webhook(payload.as_bytes(), Some(&sig))
            .await
            .unwrap();

        assert_eq!(event.kind, GatewayEventKind::PaymentFailed);
    }

    #[tokio::test]
    async fn verify_webhook_other_event_has_no_lookup() {
        let payload = json!({
            "id": "evt_test",
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        })
        .to_string();
        let sig = create_test_signature(SECRET, chrono::Utc::now().timestamp(), &payload);

        let event = gateway()
            .verify_webhook(payload.as_bytes(), Some(&sig))
            .await
            .unwrap();

        assert_eq!(event.kind, GatewayEventKind::Other);
        assert!(event.lookup.is_none());
    }

    #[tokio::test]
    async fn verify_webhook_rejects_invalid_json() {
        let payload = "not json";
        let sig = create_test_signature(SECRET, chrono::Utc::now().timestamp(), payload);

        let result = gateway().verify_webhook(payload.as_bytes(), Some(&sig)).await;
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Request Building Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn payment_intent_params_use_minor_units_and_reference() {
        let params = payment_intent_params(&request(PaymentMethod::Card)).unwrap();
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("amount"), Some("499"));
        assert_eq!(get("currency"), Some("usd"));
        assert_eq!(get("metadata[reference]"), Some("viewesta_1704067200000_abc"));
        assert_eq!(get("metadata[user_id]"), Some("user-1"));
        assert_eq!(get("metadata[quality]"), Some("720p"));
        assert_eq!(get("receipt_email"), Some("viewer@example.com"));
    }

    #[tokio::test]
    async fn initialize_rejects_mobile_money() {
        let err = gateway()
            .initialize(&request(PaymentMethod::MobileMoney))
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::ports::GatewayErrorCode::Rejected);
    }
}
