//! Transaction record: one monetary movement and its settlement state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{
    Currency, StateMachine, Timestamp, TransactionId, UserId, ValidationError,
};
use crate::domain::payment::{PaymentMethod, PaymentProvider};

use super::{TransactionIntent, TransactionKind, TransactionStatus};

/// A monetary movement. Immutable once it leaves `pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub payment_provider: PaymentProvider,
    /// Engine-generated idempotency key for external confirmations.
    pub provider_reference: Option<String>,
    pub status: TransactionStatus,
    pub description: String,
    pub metadata: Value,
    /// Provider payload recorded when the transaction settled.
    pub evidence: Option<Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Transaction {
    /// A wallet-funded transaction. The debit already happened, so it starts completed.
    pub fn settled_from_wallet(
        user_id: UserId,
        intent: TransactionIntent,
        amount: Decimal,
        currency: Currency,
        description: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            kind: intent.kind(),
            amount,
            currency,
            payment_method: PaymentMethod::Wallet,
            payment_provider: PaymentProvider::Manual,
            provider_reference: None,
            status: TransactionStatus::Completed,
            description: description.into(),
            metadata: intent.to_metadata(),
            evidence: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A provider-funded transaction awaiting confirmation.
    #[allow(clippy::too_many_arguments)]
    pub fn pending_external(
        user_id: UserId,
        intent: TransactionIntent,
        amount: Decimal,
        currency: Currency,
        payment_method: PaymentMethod,
        payment_provider: PaymentProvider,
        provider_reference: String,
        description: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            kind: intent.kind(),
            amount,
            currency,
            payment_method,
            payment_provider,
            provider_reference: Some(provider_reference),
            status: TransactionStatus::Pending,
            description: description.into(),
            metadata: intent.to_metadata(),
            evidence: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Typed view of what this transaction pays for.
    pub fn intent(&self) -> Result<TransactionIntent, ValidationError> {
        TransactionIntent::from_metadata(self.kind, &self.metadata)
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Applies a terminal status in memory. Storage adapters guard the same
    /// edge with a conditional update.
    pub fn settle(
        &self,
        target: TransactionStatus,
        evidence: Option<Value>,
        now: Timestamp,
    ) -> Result<Transaction, ValidationError> {
        let status = self.status.transition_to(target)?;
        Ok(Transaction {
            status,
            evidence: evidence.or_else(|| self.evidence.clone()),
            updated_at: now,
            ..self.clone()
        })
    }
}

/// Generates a provider reference: `{prefix}_{unix_millis}_{uuid}`.
pub fn generate_reference(kind: TransactionKind, now: Timestamp) -> String {
    format!(
        "{}_{}_{}",
        kind.reference_prefix(),
        now.as_unix_millis(),
        uuid::Uuid::new_v4()
    )
}

/// How a caller identifies a transaction to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionLookup {
    Id(TransactionId),
    Reference(String),
}

impl std::fmt::Display for TransactionLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionLookup::Id(id) => write!(f, "id {}", id),
            TransactionLookup::Reference(r) => write!(f, "reference {}", r),
        }
    }
}
