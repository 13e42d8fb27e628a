//! In-memory transaction log.
//!
//! `transition` checks and sets the status under one write lock, mirroring
//! the `WHERE status = 'pending'` guard of the Postgres adapter.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::transaction::{Transaction, TransactionLookup, TransactionStatus};
use crate::ports::{Pagination, TransactionLog, TransitionOutcome};

#[derive(Debug, Default, Clone)]
pub struct InMemoryTransactionLog {
    transactions: Arc<RwLock<Vec<Transaction>>>,
}

impl InMemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored transaction, in insertion order (test helper).
    pub async fn all(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.transactions.read().await.len()
    }
}

fn matches_lookup(tx: &Transaction, lookup: &TransactionLookup) -> bool {
    match lookup {
        TransactionLookup::Id(id) => &tx.id == id,
        TransactionLookup::Reference(reference) => {
            tx.provider_reference.as_deref() == Some(reference.as_str())
        }
    }
}

#[async_trait]
impl TransactionLog for InMemoryTransactionLog {
    async fn create(&self, tx: &Transaction) -> Result<(), DomainError> {
        let mut transactions = self.transactions.write().await;
        if let Some(reference) = &tx.provider_reference {
            if transactions
                .iter()
                .any(|t| t.provider_reference.as_ref() == Some(reference))
            {
                return Err(DomainError::new(
                    ErrorCode::DuplicateReference,
                    format!("Provider reference already exists: {}", reference),
                ));
            }
        }
        transactions.push(tx.clone());
        Ok(())
    }

    async fn find(&self, lookup: &TransactionLookup) -> Result<Option<Transaction>, DomainError> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .find(|t| matches_lookup(t, lookup))
            .cloned())
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

        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .iter_mut()
            .find(|t| matches_lookup(t, lookup))
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::TransactionNotFound,
                    format!("Transaction not found by {}", lookup),
                )
                .with_detail("id", lookup.to_string())
            })?;

        if tx.is_terminal() {
            return Ok(TransitionOutcome::AlreadyTerminal(tx.clone()));
        }

        *tx = tx.settle(target, evidence, Timestamp::now())?;
        Ok(TransitionOutcome::Applied(tx.clone()))
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
        page: Pagination,
    ) -> Result<Vec<Transaction>, DomainError> {
        let transactions = self.transactions.read().await;
        let mut owned: Vec<Transaction> = transactions
            .iter()
            .rev()
            .filter(|t| t.is_owned_by(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Currency;
    use crate::domain::payment::{PaymentMethod, PaymentProvider};
    use crate::domain::transaction::TransactionIntent;
    use rust_decimal_macros::dec;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn pending(reference: &str) -> Transaction {
        Transaction::pending_external(
            user(),
            TransactionIntent::WalletTopup,
            dec!(10),
            Currency::Usd,
            PaymentMethod::Card,
            PaymentProvider::Stripe,
            reference.to_string(),
            "Wallet top-up of 10 USD",
            Timestamp::now(),
        )
    }

    #[tokio::test]
    async fn duplicate_reference_is_rejected() {
        let log = InMemoryTransactionLog::new();
        log.create(&pending("topup_1_a")).await.unwrap();

        let err = log.create(&pending("topup_1_a")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateReference);
        assert_eq!(log.count().await, 1);
    }

    #[tokio::test]
    async fn transition_applies_once_then_reports_terminal() {
        let log = InMemoryTransactionLog::new();
        log.create(&pending("topup_1_a")).await.unwrap();
        let lookup = TransactionLookup::Reference("topup_1_a".to_string());

        let first = log
            .transition(&lookup, TransactionStatus::Completed, None)
            .await
            .unwrap();
        let second = log
            .transition(&lookup, TransactionStatus::Failed, None)
            .await
            .unwrap();

        assert!(first.was_applied());
        assert!(!second.was_applied());
        assert_eq!(second.transaction().status, TransactionStatus::Completed);
    }

    #[tokio::test]
    async fn transition_of_unknown_transaction_is_not_found() {
        let log = InMemoryTransactionLog::new();
        let err = log
            .transition(
                &TransactionLookup::Reference("nope".to_string()),
                TransactionStatus::Completed,
                None,
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn transition_to_pending_is_rejected() {
        let log = InMemoryTransactionLog::new();
        let tx = pending("topup_1_a");
        log.create(&tx).await.unwrap();

        let err = log
            .transition(&TransactionLookup::Id(tx.id), TransactionStatus::Pending, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn find_by_user_is_newest_first_and_paginated() {
        let log = InMemoryTransactionLog::new();
        for i in 0..5 {
            log.create(&pending(&format!("topup_{}_a", i))).await.unwrap();
        }

        let page = log
            .find_by_user(&user(), Pagination::new(Some(2), Some(1)))
            .await
            .unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page[0].provider_reference.as_deref(), Some("topup_3_a"));
        assert_eq!(page[1].provider_reference.as_deref(), Some("topup_2_a"));
    }
}
