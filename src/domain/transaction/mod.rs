//! Transaction module - the log of monetary movements.
//!
//! Every transaction is `pending`, `completed` or `failed`. Only
//! `pending -> terminal` edges exist, and storage guards that edge with a
//! conditional update so concurrent confirmations settle it exactly once.

mod intent;
mod status;
#[allow(clippy::module_inception)]
mod transaction;

pub use intent::{TransactionIntent, TransactionKind};
pub use status::TransactionStatus;
pub use transaction::{generate_reference, Transaction, TransactionLookup};
