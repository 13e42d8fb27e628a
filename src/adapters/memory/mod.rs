//! In-memory adapters.
//!
//! Used by tests and local development. Each adapter holds its state behind
//! one `tokio::sync::RwLock`, so conditional updates are atomic within a
//! single process.

mod entitlement_store;
mod pricing_catalog;
mod transaction_log;
mod wallet_ledger;

pub use entitlement_store::InMemoryEntitlementStore;
pub use pricing_catalog::InMemoryPricingCatalog;
pub use transaction_log::InMemoryTransactionLog;
pub use wallet_ledger::InMemoryWalletLedger;
