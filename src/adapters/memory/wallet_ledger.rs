//! In-memory wallet ledger.
//!
//! Each operation runs under one write lock, which makes the
//! check-and-decrement in `debit` atomic the same way the conditional
//! `UPDATE` is in Postgres.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::foundation::{Amount, Currency, DomainError, Timestamp, UserId};
use crate::domain::ledger::Wallet;
use crate::ports::{DebitOutcome, WalletLedger};

#[derive(Debug, Default, Clone)]
pub struct InMemoryWalletLedger {
    wallets: Arc<RwLock<HashMap<UserId, Wallet>>>,
}

impl InMemoryWalletLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a wallet with a balance (test setup).
    pub async fn seed(&self, user_id: &UserId, balance: Decimal) {
        let now = Timestamp::now();
        let wallet = Wallet::reconstitute(user_id.clone(), balance, Currency::Usd, now, now);
        self.wallets.write().await.insert(user_id.clone(), wallet);
    }

    /// Current balance without creating a wallet.
    pub async fn balance_of(&self, user_id: &UserId) -> Option<Decimal> {
        self.wallets.read().await.get(user_id).map(Wallet::balance)
    }
}

#[async_trait]
impl WalletLedger for InMemoryWalletLedger {
    async fn get_or_create(&self, user_id: &UserId) -> Result<Wallet, DomainError> {
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .entry(user_id.clone())
            .or_insert_with(|| Wallet::open(user_id.clone(), Timestamp::now()));
        Ok(wallet.clone())
    }

    async fn credit(&self, user_id: &UserId, amount: Amount) -> Result<Wallet, DomainError> {
        let now = Timestamp::now();
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .entry(user_id.clone())
            .or_insert_with(|| Wallet::open(user_id.clone(), now));
        *wallet = wallet.credited(amount, now);
        Ok(wallet.clone())
    }

    async fn debit(&self, user_id: &UserId, amount: Amount) -> Result<DebitOutcome, DomainError> {
        let now = Timestamp::now();
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .entry(user_id.clone())
            .or_insert_with(|| Wallet::open(user_id.clone(), now));

        match wallet.debited(amount, now) {
            Some(next) => {
                *wallet = next;
                Ok(DebitOutcome::Debited(wallet.clone()))
            }
            None => Ok(DebitOutcome::InsufficientFunds {
                available: wallet.balance(),
            }),
        }
    }

    async fn set_currency(
        &self,
        user_id: &UserId,
        currency: Currency,
    ) -> Result<Wallet, DomainError> {
        let now = Timestamp::now();
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .entry(user_id.clone())
            .or_insert_with(|| Wallet::open(user_id.clone(), now));
        *wallet = wallet.with_currency(currency, now);
        Ok(wallet.clone())
    }
}
