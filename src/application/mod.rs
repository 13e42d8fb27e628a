//! Application layer - services and handlers.
//!
//! Services hold the cross-cutting flows (confirmation, checkout, access,
//! expiry). Handlers are the per-operation entry points the HTTP layer calls.

mod access_resolver;
mod checkout;
mod confirmation;
mod expiry_reaper;
pub mod handlers;

pub use access_resolver::AccessResolver;
pub use checkout::{CheckoutOutcome, CheckoutRequest, CheckoutService};
pub use confirmation::{Confirmation, ConfirmationProcessor, SettlementEffect};
pub use expiry_reaper::ExpiryReaper;
