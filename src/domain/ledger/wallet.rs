//! Wallet: one non-negative balance per user.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Amount, Currency, Timestamp, UserId};

/// Stored-value account, keyed 1:1 by user.
///
/// Balances only change through `credited`/`debited`; storage adapters apply
/// those as one atomic step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    balance: Decimal,
    pub currency: Currency,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Wallet {
    /// A fresh wallet with a zero balance in the default currency.
    pub fn open(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
            currency: Currency::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a wallet from persisted fields.
    ///
    /// Storage enforces `balance >= 0`; a negative value here means corrupt data.
    pub fn reconstitute(
        user_id: UserId,
        balance: Decimal,
        currency: Currency,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            user_id,
            balance,
            currency,
            created_at,
            updated_at,
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn can_cover(&self, amount: Amount) -> bool {
        self.balance >= amount.value()
    }

    /// Returns the wallet after adding `amount`.
    pub fn credited(&self, amount: Amount, now: Timestamp) -> Wallet {
        Wallet {
            balance: self.balance + amount.value(),
            updated_at: now,
            ..self.clone()
        }
    }

    /// Returns the wallet after removing `amount`, or `None` if it would go negative.
    pub fn debited(&self, amount: Amount, now: Timestamp) -> Option<Wallet> {
        if !self.can_cover(amount) {
            return None;
        }
        Some(Wallet {
            balance: self.balance - amount.value(),
            updated_at: now,
            ..self.clone()
        })
    }

    pub fn with_currency(&self, currency: Currency, now: Timestamp) -> Wallet {
        Wallet {
            currency,
            updated_at: now,
            ..self.clone()
        }
    }
}
