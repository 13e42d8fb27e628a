//! Flutterwave payment gateway adapter.
//!
//! Hosted checkout for cards and African mobile money. Webhooks are
//! authenticated by the shared `verif-hash` header.

mod flutterwave_adapter;
mod types;

pub use flutterwave_adapter::{FlutterwaveConfig, FlutterwaveGateway};
pub use types::{FlutterwaveCharge, FlutterwaveEnvelope, FlutterwaveWebhook};
