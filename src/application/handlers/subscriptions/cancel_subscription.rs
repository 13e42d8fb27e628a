//! CancelSubscriptionHandler - Command handler for cancelling a subscription.
//!
//! Cancellation is immediate: `is_active` and `auto_renew` both go false.

use std::sync::Arc;

use crate::domain::entitlement::Subscription;
use crate::domain::foundation::{SubscriptionId, UserId};
use crate::domain::payment::BillingError;
use crate::ports::EntitlementStore;

use super::owned_subscription;

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
}

pub struct CancelSubscriptionHandler {
    entitlements: Arc<dyn EntitlementStore>,
}

impl CancelSubscriptionHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(&self, cmd: CancelSubscriptionCommand) -> Result<Subscription, BillingError> {
        owned_subscription(self.entitlements.as_ref(), &cmd.subscription_id, &cmd.user_id).await?;

        let cancelled = self
            .entitlements
            .cancel_subscription(&cmd.subscription_id)
            .await?;

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %cancelled.id,
            "Subscription cancelled"
        );
        Ok(cancelled)
    }
}
