//! Wallet ledger port.
//!
//! # Atomicity
//!
//! `debit` MUST be one conditional decrement at the storage layer
//! (`balance = balance - x WHERE balance >= x`). A read, a check in code and
//! a write is a race and is not an acceptable implementation.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::foundation::{Amount, Currency, DomainError, UserId};
use crate::domain::ledger::Wallet;

/// Result of a conditional debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Balance covered the amount; carries the wallet after the debit.
    Debited(Wallet),
    /// Balance did not cover the amount. Nothing changed.
    InsufficientFunds { available: Decimal },
}

/// One balance per user, mutated only through credit and debit.
#[async_trait]
pub trait WalletLedger: Send + Sync {
    /// Returns the user's wallet, creating it at zero on first access.
    async fn get_or_create(&self, user_id: &UserId) -> Result<Wallet, DomainError>;

    /// Adds `amount`, creating the wallet first if needed.
    async fn credit(&self, user_id: &UserId, amount: Amount) -> Result<Wallet, DomainError>;

    /// Removes `amount` if and only if the balance covers it.
    async fn debit(&self, user_id: &UserId, amount: Amount) -> Result<DebitOutcome, DomainError>;

    /// Changes the display currency. Does not touch the balance.
    async fn set_currency(
        &self,
        user_id: &UserId,
        currency: Currency,
    ) -> Result<Wallet, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_ledger_is_object_safe() {
        fn _accepts_dyn(_ledger: &dyn WalletLedger) {}
    }
}
