//! TransactionHistoryHandler - Query handler for the caller's transactions.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::payment::BillingError;
use crate::domain::transaction::Transaction;
use crate::ports::{Pagination, TransactionLog};

#[derive(Debug, Clone)]
pub struct TransactionHistoryQuery {
    pub user_id: UserId,
    pub page: Pagination,
}

pub struct TransactionHistoryHandler {
    transactions: Arc<dyn TransactionLog>,
}

impl TransactionHistoryHandler {
    pub fn new(transactions: Arc<dyn TransactionLog>) -> Self {
        Self { transactions }
    }

    pub async fn handle(&self, query: TransactionHistoryQuery) -> Result<Vec<Transaction>, BillingError> {
        Ok(self
            .transactions
            .find_by_user(&query.user_id, query.page)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryTransactionLog;
    use crate::domain::foundation::{Currency, Timestamp};
    use crate::domain::transaction::TransactionIntent;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn pages_newest_first_and_scopes_to_user() {
        let log = InMemoryTransactionLog::new();
        let user_id = UserId::new("u").unwrap();
        let start = Timestamp::now();
        for i in 0..3 {
            let tx = Transaction::settled_from_wallet(
                user_id.clone(),
                TransactionIntent::Subscription {
                    plan_type: crate::domain::entitlement::PlanType::Monthly,
                },
                dec!(9.99),
                Currency::Usd,
                format!("tx {}", i),
                start.plus_secs(i),
            );
            log.create(&tx).await.unwrap();
        }
        let other = Transaction::settled_from_wallet(
            UserId::new("other").unwrap(),
            TransactionIntent::Subscription {
                plan_type: crate::domain::entitlement::PlanType::Monthly,
            },
            dec!(9.99),
            Currency::Usd,
            "other",
            start,
        );
        log.create(&other).await.unwrap();
        let handler = TransactionHistoryHandler::new(Arc::new(log));

        let page = handler
            .handle(TransactionHistoryQuery {
                user_id,
                page: Pagination::new(Some(2), Some(0)),
            })
            .await
            .unwrap();

        let descriptions: Vec<_> = page.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, vec!["tx 2", "tx 1"]);
    }
}
