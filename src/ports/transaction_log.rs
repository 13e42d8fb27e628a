//! Transaction log port.
//!
//! # Atomicity
//!
//! `transition` is the concurrency primitive for confirmations. It MUST be a
//! conditional update that only succeeds while the stored status is
//! `pending`. Exactly one of any number of racing callers observes
//! `TransitionOutcome::Applied`; the rest observe `AlreadyTerminal`.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::transaction::{Transaction, TransactionLookup, TransactionStatus};

/// Result of a guarded `pending -> terminal` transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// This call moved the transaction out of `pending`.
    Applied(Transaction),
    /// The transaction was already terminal. Carries its current state.
    AlreadyTerminal(Transaction),
}

impl TransitionOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            TransitionOutcome::Applied(tx) | TransitionOutcome::AlreadyTerminal(tx) => tx,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// Page window for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 100;

    /// Applies defaults and caps the limit.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Append-mostly record of monetary movements.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Inserts a new transaction.
    ///
    /// # Errors
    ///
    /// - `DuplicateReference` if the provider reference already exists
    /// - `DatabaseError` on persistence failure
    async fn create(&self, tx: &Transaction) -> Result<(), DomainError>;

    async fn find(&self, lookup: &TransactionLookup) -> Result<Option<Transaction>, DomainError>;

    /// Moves a pending transaction to `target`, recording `evidence`.
    ///
    /// No-op returning `AlreadyTerminal` if the transaction already left
    /// `pending`.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if nothing matches `lookup`
    /// - `ValidationFailed` if `target` is not terminal
    async fn transition(
        &self,
        lookup: &TransactionLookup,
        target: TransactionStatus,
        evidence: Option<Value>,
    ) -> Result<TransitionOutcome, DomainError>;

    /// The user's transactions, newest first.
    async fn find_by_user(
        &self,
        user_id: &UserId,
        page: Pagination,
    ) -> Result<Vec<Transaction>, DomainError>;
}
