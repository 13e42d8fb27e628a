//! PostgreSQL adapters - Database implementations of the storage ports.
//!
//! - `PostgresWalletLedger` - Wallet balances with conditional debit
//! - `PostgresTransactionLog` - Transactions with guarded status transitions
//! - `PostgresEntitlementStore` - Movie purchases and subscriptions
//! - `PostgresPricingCatalog` - Read-only catalog prices

mod entitlement_store;
mod pricing_catalog;
mod transaction_log;
mod wallet_ledger;

pub use entitlement_store::PostgresEntitlementStore;
pub use pricing_catalog::PostgresPricingCatalog;
pub use transaction_log::PostgresTransactionLog;
pub use wallet_ledger::PostgresWalletLedger;

use std::fmt;

use crate::domain::foundation::{DomainError, ErrorCode};

/// A stored value that no longer parses into its domain type.
fn corrupt(column: &str, cause: impl fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::CorruptRecord,
        format!("Unreadable value in {}: {}", column, cause),
    )
    .with_detail("column", column)
}
