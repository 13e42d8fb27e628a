//! TopUpWalletHandler - Command handler for funding a wallet through a provider.
//!
//! The credit happens only when the pending `wallet_topup` transaction is
//! confirmed.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::{CheckoutOutcome, CheckoutRequest, CheckoutService};
use crate::domain::foundation::AuthenticatedUser;
use crate::domain::payment::{BillingError, PaymentMethod, PaymentProvider};
use crate::domain::transaction::TransactionIntent;
use crate::ports::WalletLedger;

#[derive(Debug, Clone)]
pub struct TopUpWalletCommand {
    pub user: AuthenticatedUser,
    pub amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub payment_provider: Option<PaymentProvider>,
    pub redirect_url: String,
}

pub struct TopUpWalletHandler {
    ledger: Arc<dyn WalletLedger>,
    checkout: Arc<CheckoutService>,
}

impl TopUpWalletHandler {
    pub fn new(ledger: Arc<dyn WalletLedger>, checkout: Arc<CheckoutService>) -> Self {
        Self { ledger, checkout }
    }

    pub async fn handle(&self, cmd: TopUpWalletCommand) -> Result<CheckoutOutcome, BillingError> {
        let method = cmd.payment_method.unwrap_or(PaymentMethod::Card);
        if method == PaymentMethod::Wallet {
            return Err(BillingError::validation(
                "payment_method",
                "Top-ups must use card or mobile_money",
            ));
        }

        let wallet = self.ledger.get_or_create(&cmd.user.id).await?;
        wallet.currency.check_charge("amount", cmd.amount)?;

        self.checkout
            .checkout(CheckoutRequest {
                user: cmd.user,
                intent: TransactionIntent::WalletTopup,
                amount: cmd.amount,
                currency: wallet.currency,
                description: format!("Wallet top-up of {} {}", cmd.amount, wallet.currency),
                method,
                provider: cmd.payment_provider,
                redirect_url: cmd.redirect_url,
            })
            .await
    }
}
