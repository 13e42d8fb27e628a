//! GetMySubscriptionHandler - Query handler for the caller's subscriptions.

use std::sync::Arc;

use crate::domain::entitlement::Subscription;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::payment::BillingError;
use crate::ports::EntitlementStore;

#[derive(Debug, Clone)]
pub struct GetMySubscriptionQuery {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MySubscription {
    /// Entitled subscription at query time, if any.
    pub active: Option<Subscription>,
    /// Every subscription the user has held, newest first.
    pub history: Vec<Subscription>,
    pub days_remaining: Option<i64>,
}

pub struct GetMySubscriptionHandler {
    entitlements: Arc<dyn EntitlementStore>,
}

impl GetMySubscriptionHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(&self, query: GetMySubscriptionQuery) -> Result<MySubscription, BillingError> {
        let now = Timestamp::now();
        let active = self
            .entitlements
            .find_entitled_subscription(&query.user_id, now)
            .await?;
        let history = self.entitlements.list_subscriptions(&query.user_id).await?;

        Ok(MySubscription {
            days_remaining: active.as_ref().map(|s| s.days_remaining(now)),
            active,
            history,
        })
    }
}
