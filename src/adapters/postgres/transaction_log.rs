//! PostgreSQL implementation of TransactionLog.
//!
//! `transition` is `UPDATE ... WHERE status = 'pending' RETURNING ...`.
//! Only the statement that flips the row gets a row back; every other
//! concurrent caller falls through to the read and sees a terminal status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, TransactionId, UserId};
use crate::domain::transaction::{Transaction, TransactionLookup, TransactionStatus};
use crate::ports::{Pagination, TransactionLog, TransitionOutcome};

use super::corrupt;

pub struct PostgresTransactionLog {
    pool: PgPool,
}

impl PostgresTransactionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: String,
    transaction_type: String,
    amount: Decimal,
    currency: String,
    payment_method: String,
    payment_provider: String,
    provider_reference: Option<String>,
    status: String,
    description: String,
    metadata: Value,
    evidence: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| corrupt("transactions.user_id", e))?,
            kind: row
                .transaction_type
                .parse()
                .map_err(|e| corrupt("transactions.transaction_type", e))?,
            amount: row.amount,
            currency: row
                .currency
                .parse()
                .map_err(|e| corrupt("transactions.currency", e))?,
            payment_method: row
                .payment_method
                .parse()
                .map_err(|e| corrupt("transactions.payment_method", e))?,
            payment_provider: row
                .payment_provider
                .parse()
                .map_err(|e| corrupt("transactions.payment_provider", e))?,
            provider_reference: row.provider_reference,
            status: row
                .status
                .parse()
                .map_err(|e| corrupt("transactions.status", e))?,
            description: row.description,
            metadata: row.metadata,
            evidence: row.evidence,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const TRANSACTION_COLUMNS: &str = "id, user_id, transaction_type, amount, currency, \
     payment_method, payment_provider, provider_reference, status, description, \
     metadata, evidence, created_at, updated_at";

fn lookup_column(lookup: &TransactionLookup) -> &'static str {
    match lookup {
        TransactionLookup::Id(_) => "id",
        TransactionLookup::Reference(_) => "provider_reference",
    }
}

fn bind_lookup<'q>(
    query: QueryAs<'q, Postgres, TransactionRow, PgArguments>,
    lookup: &TransactionLookup,
) -> QueryAs<'q, Postgres, TransactionRow, PgArguments> {
    match lookup {
        TransactionLookup::Id(id) => query.bind(*id.as_uuid()),
        TransactionLookup::Reference(reference) => query.bind(reference.clone()),
    }
}

#[async_trait]
impl TransactionLog for PostgresTransactionLog {
    async fn create(&self, tx: &Transaction) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, transaction_type, amount, currency, payment_method,
                payment_provider, provider_reference, status, description, metadata,
                evidence, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(tx.id.as_uuid())
        .bind(tx.user_id.as_str())
        .bind(tx.kind.as_str())
        .bind(tx.amount)
        .bind(tx.currency.code())
        .bind(tx.payment_method.as_str())
        .bind(tx.payment_provider.as_str())
        .bind(&tx.provider_reference)
        .bind(tx.status.as_str())
        .bind(&tx.description)
        .bind(&tx.metadata)
        .bind(&tx.evidence)
        .bind(tx.created_at.as_datetime())
        .bind(tx.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return DomainError::new(
                        ErrorCode::DuplicateReference,
                        "Provider reference already exists",
                    );
                }
            }
            DomainError::database(e)
        })?;

        Ok(())
    }

    async fn find(&self, lookup: &TransactionLookup) -> Result<Option<Transaction>, DomainError> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE {} = $1",
            TRANSACTION_COLUMNS,
            lookup_column(lookup)
        );
        let row: Option<TransactionRow> = bind_lookup(sqlx::query_as(&sql), lookup)
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::database)?;

        row.map(Transaction::try_from).transpose()
    }

    async fn transition(
        &self,
        lookup: &TransactionLookup,
        target: TransactionStatus,
        evidence: Option<Value>,
    ) -> Result<TransitionOutcome, DomainError> {
        if target == TransactionStatus::Pending {
            return Err(DomainError::validation(
                "status",
                "Transition target must be terminal",
            ));
        }

        let sql = format!(
            r#"
            UPDATE transactions
            SET status = $2, evidence = COALESCE($3, evidence), updated_at = NOW()
            WHERE {} = $1 AND status = 'pending'
            RETURNING {}
            "#,
            lookup_column(lookup),
            TRANSACTION_COLUMNS
        );
        let applied: Option<TransactionRow> = bind_lookup(sqlx::query_as(&sql), lookup)
            .bind(target.as_str())
            .bind(evidence)
            .fetch_optional(&self.pool)
            .await
            .map_err(DomainError::database)?;

        if let Some(row) = applied {
            return Ok(TransitionOutcome::Applied(row.try_into()?));
        }

        match self.find(lookup).await? {
            Some(current) => Ok(TransitionOutcome::AlreadyTerminal(current)),
            None => Err(DomainError::new(
                ErrorCode::TransactionNotFound,
                format!("Transaction not found by {}", lookup),
            )
            .with_detail("id", lookup.to_string())),
        }
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
        page: Pagination,
    ) -> Result<Vec<Transaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        rows.into_iter().map(Transaction::try_from).collect()
    }
}
