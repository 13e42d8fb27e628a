//! ListPurchasesHandler - Query handler for the caller's purchase history.

use std::sync::Arc;

use crate::domain::entitlement::MoviePurchase;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::payment::BillingError;
use crate::ports::EntitlementStore;

#[derive(Debug, Clone)]
pub struct ListPurchasesQuery {
    pub user_id: UserId,
}

/// A purchase with its effective state at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedPurchase {
    pub purchase: MoviePurchase,
    /// `is_active` and unexpired, regardless of whether the reaper has run.
    pub is_active: bool,
}

pub struct ListPurchasesHandler {
    entitlements: Arc<dyn EntitlementStore>,
}

impl ListPurchasesHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(&self, query: ListPurchasesQuery) -> Result<Vec<OwnedPurchase>, BillingError> {
        let now = Timestamp::now();
        let purchases = self.entitlements.list_purchases(&query.user_id).await?;

        Ok(purchases
            .into_iter()
            .map(|purchase| OwnedPurchase {
                is_active: purchase.is_entitled_at(now),
                purchase,
            })
            .collect())
    }
}
