//! Outcome of an access decision for one (user, movie, quality).

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MovieId, PurchaseId, SubscriptionId};

use super::Quality;

/// Result of resolving access to a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted(AccessBasis),
    Denied(AccessDeniedReason),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted(_))
    }

    /// Converts the decision to a Result, with denial becoming the error.
    pub fn into_result(self) -> Result<AccessBasis, AccessDeniedReason> {
        match self {
            AccessDecision::Granted(basis) => Ok(basis),
            AccessDecision::Denied(reason) => Err(reason),
        }
    }
}

/// Which entitlement source produced the grant. Listed in precedence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessBasis {
    Subscription { subscription_id: SubscriptionId },
    FreeContent,
    Purchase { purchase_id: PurchaseId },
    /// A purchase of the same movie at a different quality.
    OtherQualityPurchase {
        purchase_id: PurchaseId,
        purchased_quality: Quality,
    },
}

impl AccessBasis {
    pub fn label(&self) -> &'static str {
        match self {
            AccessBasis::Subscription { .. } => "subscription",
            AccessBasis::FreeContent => "free",
            AccessBasis::Purchase { .. } => "purchase",
            AccessBasis::OtherQualityPurchase { .. } => "other_quality_purchase",
        }
    }
}

/// Reason why access was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessDeniedReason {
    PurchaseRequired { movie_id: MovieId, quality: Quality },
}

impl AccessDeniedReason {
    pub fn user_message(&self) -> &'static str {
        match self {
            AccessDeniedReason::PurchaseRequired { .. } => {
                "Access denied. Please purchase this movie or subscribe to access it."
            }
        }
    }
}
