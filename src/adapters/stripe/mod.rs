//! Stripe payment gateway adapter.
//!
//! Card payments via PaymentIntents, status lookup by engine reference, and
//! webhook signature verification.
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod stripe_adapter;
mod webhook_types;

pub use stripe_adapter::{StripeConfig, StripeGateway};
pub use webhook_types::{
    SignatureHeader, SignatureParseError, StripePaymentIntent, StripeWebhookEvent,
};
