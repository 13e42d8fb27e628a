//! Webhook handlers.
//!
//! One handler serves every provider; the gateway adapter owns signature
//! checks and payload shape.

mod handle_webhook;

pub use handle_webhook::{HandleWebhookCommand, HandleWebhookHandler, HandleWebhookResult};
