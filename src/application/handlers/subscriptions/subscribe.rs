//! SubscribeHandler - Command handler for starting a subscription.

use std::sync::Arc;

use crate::application::{CheckoutOutcome, CheckoutRequest, CheckoutService};
use crate::domain::entitlement::PlanType;
use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::domain::payment::{BillingError, PaymentMethod, PaymentProvider};
use crate::domain::transaction::TransactionIntent;
use crate::ports::EntitlementStore;

/// Command to subscribe to a plan.
#[derive(Debug, Clone)]
pub struct SubscribeCommand {
    pub user: AuthenticatedUser,
    pub plan_type: PlanType,
    pub payment_method: Option<PaymentMethod>,
    pub payment_provider: Option<PaymentProvider>,
    pub redirect_url: String,
}

/// Handler for subscribing.
///
/// Refuses callers who already hold an entitled subscription. The wallet rail
/// activates immediately; the provider rail activates on confirmation.
pub struct SubscribeHandler {
    entitlements: Arc<dyn EntitlementStore>,
    checkout: Arc<CheckoutService>,
}

impl SubscribeHandler {
    pub fn new(entitlements: Arc<dyn EntitlementStore>, checkout: Arc<CheckoutService>) -> Self {
        Self {
            entitlements,
            checkout,
        }
    }

    pub async fn handle(&self, cmd: SubscribeCommand) -> Result<CheckoutOutcome, BillingError> {
        if let Some(active) = self
            .entitlements
            .find_entitled_subscription(&cmd.user.id, Timestamp::now())
            .await?
        {
            return Err(BillingError::already_active(active.id));
        }

        let plan = cmd.plan_type;
        self.checkout
            .checkout(CheckoutRequest {
                user: cmd.user,
                intent: TransactionIntent::Subscription { plan_type: plan },
                amount: plan.price(),
                currency: plan.currency(),
                description: format!("Subscription: {}", plan.display_name()),
                method: PaymentMethod::resolve(cmd.payment_method, cmd.payment_provider),
                provider: cmd.payment_provider,
                redirect_url: cmd.redirect_url,
            })
            .await
    }
}
