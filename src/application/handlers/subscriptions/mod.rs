//! Subscription handlers.
//!
//! ## Commands
//! - Subscribing to a plan
//! - Cancelling a subscription
//! - Toggling auto-renew
//!
//! ## Queries
//! - The caller's active subscription and history

mod cancel_subscription;
mod get_my_subscription;
mod set_auto_renew;
mod subscribe;

// Commands
pub use cancel_subscription::{CancelSubscriptionCommand, CancelSubscriptionHandler};
pub use set_auto_renew::{SetAutoRenewCommand, SetAutoRenewHandler};
pub use subscribe::{SubscribeCommand, SubscribeHandler};

// Queries
pub use get_my_subscription::{GetMySubscriptionHandler, GetMySubscriptionQuery, MySubscription};

use crate::domain::entitlement::Subscription;
use crate::domain::foundation::{SubscriptionId, UserId};
use crate::domain::payment::BillingError;
use crate::ports::EntitlementStore;

/// Loads a subscription and checks that `user_id` owns it.
async fn owned_subscription(
    store: &dyn EntitlementStore,
    id: &SubscriptionId,
    user_id: &UserId,
) -> Result<Subscription, BillingError> {
    let subscription = store
        .find_subscription(id)
        .await?
        .ok_or_else(|| BillingError::not_found("Subscription", id))?;

    if !subscription.is_owned_by(user_id) {
        return Err(BillingError::forbidden(
            "You do not have access to this subscription",
        ));
    }
    Ok(subscription)
}
