//! What a transaction pays for.
//!
//! The kind is stored as a column and the details as a JSON metadata payload.
//! `TransactionIntent` is the typed view over both and the only thing the
//! confirmation path dispatches on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::entitlement::{PlanType, Quality};
use crate::domain::foundation::{MovieId, ValidationError};

/// Stored transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Subscription,
    WalletTopup,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Subscription => "subscription",
            TransactionKind::WalletTopup => "wallet_topup",
        }
    }

    /// Prefix of engine-generated provider references.
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "viewesta",
            TransactionKind::Subscription => "sub",
            TransactionKind::WalletTopup => "topup",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(TransactionKind::Purchase),
            "subscription" => Ok(TransactionKind::Subscription),
            "wallet_topup" => Ok(TransactionKind::WalletTopup),
            other => Err(ValidationError::invalid_format(
                "transaction_type",
                format!("unknown transaction type '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PurchaseMetadata {
    movie_id: MovieId,
    quality: Quality,
}

#[derive(Debug, Deserialize)]
struct SubscriptionMetadata {
    plan_type: PlanType,
}

/// Typed purpose of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionIntent {
    Purchase { movie_id: MovieId, quality: Quality },
    Subscription { plan_type: PlanType },
    WalletTopup,
}

impl TransactionIntent {
    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionIntent::Purchase { .. } => TransactionKind::Purchase,
            TransactionIntent::Subscription { .. } => TransactionKind::Subscription,
            TransactionIntent::WalletTopup => TransactionKind::WalletTopup,
        }
    }

    /// Metadata payload persisted alongside the transaction.
    pub fn to_metadata(&self) -> Value {
        match self {
            TransactionIntent::Purchase { movie_id, quality } => json!({
                "movie_id": movie_id,
                "quality": quality,
            }),
            TransactionIntent::Subscription { plan_type } => json!({ "plan_type": plan_type }),
            TransactionIntent::WalletTopup => json!({}),
        }
    }

    /// Reads the intent back out of a stored kind and metadata payload.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` on field `metadata` when the payload does not carry the
    /// fields the kind requires.
    pub fn from_metadata(kind: TransactionKind, metadata: &Value) -> Result<Self, ValidationError> {
        let invalid =
            |e: serde_json::Error| ValidationError::invalid_format("metadata", e.to_string());
        match kind {
            TransactionKind::Purchase => {
                let m: PurchaseMetadata =
                    serde_json::from_value(metadata.clone()).map_err(invalid)?;
                Ok(TransactionIntent::Purchase {
                    movie_id: m.movie_id,
                    quality: m.quality,
                })
            }
            TransactionKind::Subscription => {
                let m: SubscriptionMetadata =
                    serde_json::from_value(metadata.clone()).map_err(invalid)?;
                Ok(TransactionIntent::Subscription {
                    plan_type: m.plan_type,
                })
            }
            TransactionKind::WalletTopup => Ok(TransactionIntent::WalletTopup),
        }
    }
}
