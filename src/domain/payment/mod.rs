//! Payment module - provider rails and the billing error taxonomy.

mod errors;
mod provider;
mod webhook_errors;

pub use errors::BillingError;
pub use provider::{PaymentMethod, PaymentProvider};
pub use webhook_errors::WebhookError;
