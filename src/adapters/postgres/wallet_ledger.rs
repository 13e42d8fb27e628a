//! PostgreSQL implementation of WalletLedger.
//!
//! Every mutation is a single statement. Debit is the conditional
//! decrement `WHERE balance >= $2`, so concurrent debits serialize on the
//! row lock and the `balance >= 0` check constraint is never the thing that
//! catches an overdraw.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::foundation::{Amount, Currency, DomainError, Timestamp, UserId};
use crate::domain::ledger::Wallet;
use crate::ports::{DebitOutcome, WalletLedger};

use super::corrupt;

pub struct PostgresWalletLedger {
    pool: PgPool,
}

impl PostgresWalletLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WalletRow {
    user_id: String,
    balance: Decimal,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WalletRow> for Wallet {
    type Error = DomainError;

    fn try_from(row: WalletRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id).map_err(|e| corrupt("wallets.user_id", e))?;
        let currency: Currency = row
            .currency
            .parse()
            .map_err(|e| corrupt("wallets.currency", e))?;
        Ok(Wallet::reconstitute(
            user_id,
            row.balance,
            currency,
            Timestamp::from_datetime(row.created_at),
            Timestamp::from_datetime(row.updated_at),
        ))
    }
}

const WALLET_COLUMNS: &str = "user_id, balance, currency, created_at, updated_at";

#[async_trait]
impl WalletLedger for PostgresWalletLedger {
    async fn get_or_create(&self, user_id: &UserId) -> Result<Wallet, DomainError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row: WalletRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO wallets (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {}
            "#,
            WALLET_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.try_into()
    }

    async fn credit(&self, user_id: &UserId, amount: Amount) -> Result<Wallet, DomainError> {
        let row: WalletRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO wallets (user_id, balance) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
                SET balance = wallets.balance + EXCLUDED.balance,
                    updated_at = NOW()
            RETURNING {}
            "#,
            WALLET_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(amount.value())
        .fetch_one(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.try_into()
    }

    async fn debit(&self, user_id: &UserId, amount: Amount) -> Result<DebitOutcome, DomainError> {
        let row: Option<WalletRow> = sqlx::query_as(&format!(
            r#"
            UPDATE wallets
            SET balance = balance - $2, updated_at = NOW()
            WHERE user_id = $1 AND balance >= $2
            RETURNING {}
            "#,
            WALLET_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(amount.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        match row {
            Some(row) => Ok(DebitOutcome::Debited(row.try_into()?)),
            None => {
                let wallet = self.get_or_create(user_id).await?;
                Ok(DebitOutcome::InsufficientFunds {
                    available: wallet.balance(),
                })
            }
        }
    }

    async fn set_currency(
        &self,
        user_id: &UserId,
        currency: Currency,
    ) -> Result<Wallet, DomainError> {
        let row: WalletRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO wallets (user_id, currency) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
                SET currency = EXCLUDED.currency,
                    updated_at = NOW()
            RETURNING {}
            "#,
            WALLET_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(currency.code())
        .fetch_one(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.try_into()
    }
}
