//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types
//! that form the vocabulary of the billing domain.

mod auth;
mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser, Role};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{MovieId, PurchaseId, SubscriptionId, TransactionId, UserId};
pub use money::{Amount, Currency, MAX_CHARGE};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
