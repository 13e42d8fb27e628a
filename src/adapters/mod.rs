//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-memory storage, used by tests and local runs
//! - `postgres` - PostgreSQL storage with atomic conditional updates
//! - `stripe` / `flutterwave` - Payment gateways
//! - `gateway` - Mock gateway for tests
//! - `auth` - Bearer token authenticators
//! - `http` - Axum routes, DTOs and middleware

pub mod auth;
pub mod flutterwave;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

mod provider_http;

pub use auth::{JwtAuthenticator, JwtConfig, MockAuthenticator};
pub use flutterwave::{FlutterwaveConfig, FlutterwaveGateway};
pub use gateway::MockPaymentGateway;
pub use memory::{
    InMemoryEntitlementStore, InMemoryPricingCatalog, InMemoryTransactionLog, InMemoryWalletLedger,
};
pub use postgres::{
    PostgresEntitlementStore, PostgresPricingCatalog, PostgresTransactionLog, PostgresWalletLedger,
};
pub use stripe::{StripeConfig, StripeGateway};
