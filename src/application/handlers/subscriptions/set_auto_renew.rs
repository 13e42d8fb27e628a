//! SetAutoRenewHandler - Command handler for toggling subscription auto-renew.

use std::sync::Arc;

use crate::domain::entitlement::Subscription;
use crate::domain::foundation::{SubscriptionId, UserId};
use crate::domain::payment::BillingError;
use crate::ports::EntitlementStore;

use super::owned_subscription;

#[derive(Debug, Clone)]
pub struct SetAutoRenewCommand {
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
    pub auto_renew: bool,
}

pub struct SetAutoRenewHandler {
    entitlements: Arc<dyn EntitlementStore>,
}

impl SetAutoRenewHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>) -> Self {
        Self { entitlements }
    }

    pub async fn handle(&self, cmd: SetAutoRenewCommand) -> Result<Subscription, BillingError> {
        owned_subscription(self.entitlements.as_ref(), &cmd.subscription_id, &cmd.user_id).await?;

        Ok(self
            .entitlements
            .set_auto_renew(&cmd.subscription_id, cmd.auto_renew)
            .await?)
    }
}
