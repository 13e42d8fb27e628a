//! Wallet handlers.
//!
//! ## Commands
//! - Topping up through a payment provider
//! - Changing the display currency
//!
//! ## Queries
//! - Wallet balance (created lazily)
//! - Transaction history

mod get_wallet;
mod set_currency;
mod top_up_wallet;
mod transaction_history;

// Commands
pub use set_currency::{SetCurrencyCommand, SetCurrencyHandler};
pub use top_up_wallet::{TopUpWalletCommand, TopUpWalletHandler};

// Queries
pub use get_wallet::{GetWalletHandler, GetWalletQuery};
pub use transaction_history::{TransactionHistoryHandler, TransactionHistoryQuery};
