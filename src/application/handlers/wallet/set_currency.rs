//! SetCurrencyHandler - Command handler for changing a wallet's display currency.

use std::sync::Arc;

use crate::domain::foundation::{Currency, UserId};
use crate::domain::ledger::Wallet;
use crate::domain::payment::BillingError;
use crate::ports::WalletLedger;

#[derive(Debug, Clone)]
pub struct SetCurrencyCommand {
    pub user_id: UserId,
    /// ISO code, any case.
    pub currency: String,
}

pub struct SetCurrencyHandler {
    ledger: Arc<dyn WalletLedger>,
}

impl SetCurrencyHandler {
    pub fn new(ledger: Arc<dyn WalletLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, cmd: SetCurrencyCommand) -> Result<Wallet, BillingError> {
        let currency: Currency = cmd.currency.parse()?;
        Ok(self.ledger.set_currency(&cmd.user_id, currency).await?)
    }
}
