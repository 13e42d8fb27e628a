//! Provider-agnostic gateway adapters.

mod mock;

pub use mock::{GatewayCall, MockPaymentGateway};
