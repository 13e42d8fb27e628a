//! Ledger module - wallet balances.

mod wallet;

pub use wallet::Wallet;
