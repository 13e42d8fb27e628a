//! GetWalletHandler - Query handler for the caller's wallet.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::ledger::Wallet;
use crate::domain::payment::BillingError;
use crate::ports::WalletLedger;

#[derive(Debug, Clone)]
pub struct GetWalletQuery {
    pub user_id: UserId,
}

/// Returns the wallet, opening it at zero on first access.
pub struct GetWalletHandler {
    ledger: Arc<dyn WalletLedger>,
}

impl GetWalletHandler {
    pub fn new(ledger: Arc<dyn WalletLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, query: GetWalletQuery) -> Result<Wallet, BillingError> {
        Ok(self.ledger.get_or_create(&query.user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryWalletLedger;
    use crate::domain::foundation::Currency;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn first_access_opens_empty_usd_wallet() {
        let ledger = InMemoryWalletLedger::new();
        let handler = GetWalletHandler::new(Arc::new(ledger.clone()));
        let user_id = UserId::new("fresh").unwrap();

        let wallet = handler
            .handle(GetWalletQuery {
                user_id: user_id.clone(),
            })
            .await
            .unwrap();

        assert_eq!(wallet.balance(), Decimal::ZERO);
        assert_eq!(wallet.currency, Currency::Usd);
        assert_eq!(ledger.balance_of(&user_id).await, Some(Decimal::ZERO));
    }
}
