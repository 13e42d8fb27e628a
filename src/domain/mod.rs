//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, money, timestamps, errors, auth)
//! - `ledger` - Wallet balances
//! - `transaction` - Transaction log records and their state machine
//! - `entitlement` - Purchases, subscriptions, pricing and access decisions
//! - `payment` - Provider rails and billing errors

pub mod entitlement;
pub mod foundation;
pub mod ledger;
pub mod payment;
pub mod transaction;
