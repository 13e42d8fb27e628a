//! Mock payment gateway for testing.
//!
//! Supports:
//! - Scripted verification results per reference
//! - Error injection, once or per method
//! - Call tracking
//! - Webhook simulation with a fixed signature
//!
//! Webhook payloads are JSON of the form
//! `{"type": "payment.succeeded" | "payment.failed" | ..., "reference": "..."}`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::payment::{PaymentProvider, WebhookError};
use crate::domain::transaction::TransactionLookup;
use crate::ports::{
    GatewayError, GatewayEvent, GatewayEventKind, InitializeRequest, PaymentGateway,
    PaymentInstrument, Verification, VerificationStatus,
};

/// Recorded call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub method: &'static str,
    /// Reference the call concerned, when it had one.
    pub reference: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    verifications: HashMap<String, VerificationStatus>,
    next_error: Option<GatewayError>,
    method_errors: HashMap<&'static str, GatewayError>,
    call_log: Vec<GatewayCall>,
    initialized: Vec<InitializeRequest>,
}

/// Configurable [`PaymentGateway`] that never touches the network.
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
    provider: PaymentProvider,
    inner: Arc<Mutex<MockState>>,
}

impl MockPaymentGateway {
    /// Signature `verify_webhook` accepts.
    pub const SIGNATURE: &'static str = "mock-signature";

    pub fn new(provider: PaymentProvider) -> Self {
        Self {
            provider,
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Sets what `verify` reports for `reference`. Unset references are pending.
    pub fn set_verification(&self, reference: impl Into<String>, status: VerificationStatus) {
        self.state().verifications.insert(reference.into(), status);
    }

    /// Fails the next call, whichever method it is.
    pub fn fail_next(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    /// Fails every call to `method` (`initialize` or `verify`).
    pub fn fail_method(&self, method: &'static str, error: GatewayError) {
        self.state().method_errors.insert(method, error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Requests passed to `initialize`, in call order.
    pub fn initialized(&self) -> Vec<InitializeRequest> {
        self.state().initialized.clone()
    }

    /// Builds a webhook body the mock will accept.
    pub fn webhook_payload(event_type: &str, reference: &str) -> Vec<u8> {
        serde_json::json!({ "type": event_type, "reference": reference })
            .to_string()
            .into_bytes()
    }

    fn record(&self, method: &'static str, reference: Option<&str>) -> Result<(), GatewayError> {
        let mut state = self.state();
        state.call_log.push(GatewayCall {
            method,
            reference: reference.map(str::to_string),
        });
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn initialize(
        &self,
        request: &InitializeRequest,
    ) -> Result<PaymentInstrument, GatewayError> {
        self.record("initialize", Some(&request.reference))?;
        self.state().initialized.push(request.clone());

        Ok(match self.provider {
            PaymentProvider::Flutterwave => PaymentInstrument::RedirectLink {
                link: format!("https://checkout.mock/pay/{}", request.reference),
            },
            _ => PaymentInstrument::ClientSecret {
                client_secret: format!("pi_mock_{}_secret", request.reference),
                payment_intent_id: format!("pi_mock_{}", request.reference),
            },
        })
    }

    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError> {
        self.record("verify", Some(reference))?;
        let status = self
            .state()
            .verifications
            .get(reference)
            .copied()
            .unwrap_or(VerificationStatus::Pending);

        Ok(Verification {
            status,
            raw: serde_json::json!({ "reference": reference, "status": status.as_str() }),
        })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<GatewayEvent, WebhookError> {
        self.state().call_log.push(GatewayCall {
            method: "verify_webhook",
            reference: None,
        });
        match signature {
            None => return Err(WebhookError::MissingSignature),
            Some(s) if s != Self::SIGNATURE => return Err(WebhookError::InvalidSignature),
            Some(_) => {}
        }

        let raw: Value = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let event_type = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or(WebhookError::MissingField("type"))?
            .to_string();
        let kind = match event_type.as_str() {
            "payment.succeeded" => GatewayEventKind::PaymentSucceeded,
            "payment.failed" => GatewayEventKind::PaymentFailed,
            _ => GatewayEventKind::Other,
        };
        let lookup = raw
            .get("reference")
            .and_then(Value::as_str)
            .map(|r| TransactionLookup::Reference(r.to_string()));

        Ok(GatewayEvent {
            kind,
            event_type,
            lookup,
            raw,
        })
    }
}
