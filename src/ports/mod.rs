//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `WalletLedger` - Wallet balances with atomic conditional debit
//! - `TransactionLog` - Transaction records with guarded terminal transitions
//! - `EntitlementStore` - Movie purchases and subscriptions
//! - `PricingCatalog` - Read-only per-quality movie prices
//!
//! ## External Service Ports
//!
//! - `PaymentGateway` - Stripe/Flutterwave initialize, verify and webhook auth
//! - `Authenticator` - Bearer token to caller identity

mod authenticator;
mod entitlement_store;
mod payment_gateway;
mod pricing_catalog;
mod transaction_log;
mod wallet_ledger;

pub use authenticator::Authenticator;
pub use entitlement_store::{EntitlementStore, PurchaseInsert, ReapReport};
pub use payment_gateway::{
    Customer, GatewayError, GatewayErrorCode, GatewayEvent, GatewayEventKind, GatewayRegistry,
    InitializeRequest, PaymentGateway, PaymentInstrument, Verification, VerificationStatus,
};
pub use pricing_catalog::PricingCatalog;
pub use transaction_log::{Pagination, TransactionLog, TransitionOutcome};
pub use wallet_ledger::{DebitOutcome, WalletLedger};
