//! Flutterwave v3 wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard `{status, message, data}` response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct FlutterwaveEnvelope<T> {
    /// `success` or `error`.
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> FlutterwaveEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// `data` of a `POST /v3/payments` response.
#[derive(Debug, Clone, Deserialize)]
pub struct HostedLink {
    pub link: String,
}

/// A charge as returned by verification and carried by webhooks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlutterwaveCharge {
    #[serde(default)]
    pub id: Option<i64>,
    pub tx_ref: Option<String>,
    /// `successful`, `failed`, `pending`, ...
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Webhook body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlutterwaveWebhook {
    /// e.g. `charge.completed`.
    pub event: String,
    pub data: FlutterwaveCharge,
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct PaymentCustomer<'a> {
    pub email: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct PaymentCustomizations<'a> {
    pub title: &'a str,
    pub description: &'a str,
}

/// Body of `POST /v3/payments`.
#[derive(Debug, Clone, Serialize)]
pub(super) struct PaymentRequest<'a> {
    pub tx_ref: &'a str,
    /// Major units; Flutterwave does not use minor units.
    pub amount: String,
    pub currency: &'a str,
    pub redirect_url: &'a str,
    pub payment_options: &'static str,
    pub customer: PaymentCustomer<'a>,
    pub customizations: PaymentCustomizations<'a>,
    pub meta: &'a Value,
}
