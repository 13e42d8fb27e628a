//! VerifyPaymentHandler - Command handler for polling a provider about a payment.
//!
//! Shares the confirmation path with webhooks, so a verify racing a webhook
//! still applies the side effect once.

use std::sync::Arc;

use crate::application::ConfirmationProcessor;
use crate::domain::foundation::UserId;
use crate::domain::payment::BillingError;
use crate::domain::transaction::{Transaction, TransactionLookup, TransactionStatus};
use crate::ports::{GatewayRegistry, TransactionLog, VerificationStatus};

/// Command to verify a payment the caller owns.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub user_id: UserId,
    pub lookup: TransactionLookup,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyPaymentResult {
    pub transaction: Transaction,
    pub status: VerificationStatus,
}

impl VerifyPaymentResult {
    fn from_transaction(transaction: Transaction) -> Self {
        let status = match transaction.status {
            TransactionStatus::Completed => VerificationStatus::Success,
            TransactionStatus::Failed => VerificationStatus::Failed,
            TransactionStatus::Pending => VerificationStatus::Pending,
        };
        Self {
            transaction,
            status,
        }
    }
}

pub struct VerifyPaymentHandler {
    transactions: Arc<dyn TransactionLog>,
    gateways: GatewayRegistry,
    processor: Arc<ConfirmationProcessor>,
}

impl VerifyPaymentHandler {
    pub fn new(
        transactions: Arc<dyn TransactionLog>,
        gateways: GatewayRegistry,
        processor: Arc<ConfirmationProcessor>,
    ) -> Self {
        Self {
            transactions,
            gateways,
            processor,
        }
    }

    pub async fn handle(&self, cmd: VerifyPaymentCommand) -> Result<VerifyPaymentResult, BillingError> {
        let transaction = self
            .transactions
            .find(&cmd.lookup)
            .await?
            .ok_or_else(|| BillingError::not_found("Transaction", &cmd.lookup))?;

        if !transaction.is_owned_by(&cmd.user_id) {
            tracing::warn!(
                user_id = %cmd.user_id,
                transaction_id = %transaction.id,
                "Verify attempted on another user's transaction"
            );
            return Err(BillingError::forbidden(
                "You do not have access to this transaction",
            ));
        }

        if transaction.is_terminal() {
            return Ok(VerifyPaymentResult::from_transaction(transaction));
        }

        let reference = transaction
            .provider_reference
            .clone()
            .ok_or_else(|| BillingError::invalid_state("pending", "verify an unreferenced"))?;
        let gateway = self.gateways.get(transaction.payment_provider)?;
        let verification = gateway.verify(&reference).await?;

        let lookup = TransactionLookup::Id(transaction.id);
        let settled = match verification.status {
            VerificationStatus::Success => {
                self.processor
                    .confirm(&lookup, Some(verification.raw))
                    .await?
                    .transaction
            }
            VerificationStatus::Failed => {
                self.processor
                    .fail(&lookup, Some(verification.raw))
                    .await?
                    .transaction
            }
            VerificationStatus::Pending => transaction,
        };

        Ok(VerifyPaymentResult::from_transaction(settled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{
        InMemoryEntitlementStore, InMemoryTransactionLog, InMemoryWalletLedger,
    };
    use crate::domain::foundation::{Currency, Timestamp};
    use crate::domain::payment::{PaymentMethod, PaymentProvider};
    use crate::domain::transaction::{generate_reference, TransactionIntent};
    use crate::ports::GatewayError;
    use rust_decimal_macros::dec;

    struct Fixture {
        handler: VerifyPaymentHandler,
        transactions: InMemoryTransactionLog,
        ledger: InMemoryWalletLedger,
        stripe: MockPaymentGateway,
    }

    fn fixture() -> Fixture {
        let transactions = InMemoryTransactionLog::new();
        let ledger = InMemoryWalletLedger::new();
        let stripe = MockPaymentGateway::new(PaymentProvider::Stripe);
        let processor = Arc::new(ConfirmationProcessor::new(
            Arc::new(transactions.clone()),
            Arc::new(ledger.clone()),
            Arc::new(InMemoryEntitlementStore::new()),
        ));
        Fixture {
            handler: VerifyPaymentHandler::new(
                Arc::new(transactions.clone()),
                GatewayRegistry::new(PaymentProvider::Stripe).with_gateway(Arc::new(stripe.clone())),
                processor,
            ),
            transactions,
            ledger,
            stripe,
        }
    }

    fn owner() -> UserId {
        UserId::new("owner").unwrap()
    }

    async fn pending_topup(fx: &Fixture) -> Transaction {
        let now = Timestamp::now();
        let tx = Transaction::pending_external(
            owner(),
            TransactionIntent::WalletTopup,
            dec!(15),
            Currency::Usd,
            PaymentMethod::Card,
            PaymentProvider::Stripe,
            generate_reference(TransactionIntent::WalletTopup.kind(), now),
            "Wallet top-up of 15 USD",
            now,
        );
        fx.transactions.create(&tx).await.unwrap();
        tx
    }

    fn command(tx: &Transaction) -> VerifyPaymentCommand {
        VerifyPaymentCommand {
            user_id: owner(),
            lookup: TransactionLookup::Reference(tx.provider_reference.clone().unwrap()),
        }
    }

    #[tokio::test]
    async fn success_confirms_and_credits() {
        let fx = fixture();
        let tx = pending_topup(&fx).await;
        fx.stripe.set_verification(
            tx.provider_reference.clone().unwrap(),
            VerificationStatus::Success,
        );

        let result = fx.handler.handle(command(&tx)).await.unwrap();

        assert_eq!(result.status, VerificationStatus::Success);
        assert_eq!(result.transaction.status, TransactionStatus::Completed);
        assert_eq!(fx.ledger.balance_of(&owner()).await, Some(dec!(15)));
    }

    #[tokio::test]
    async fn completed_transaction_skips_provider() {
        let fx = fixture();
        let tx = pending_topup(&fx).await;
        fx.stripe.set_verification(
            tx.provider_reference.clone().unwrap(),
            VerificationStatus::Success,
        );
        fx.handler.handle(command(&tx)).await.unwrap();

        let again = fx.handler.handle(command(&tx)).await.unwrap();

        assert_eq!(again.status, VerificationStatus::Success);
        assert_eq!(fx.stripe.call_count("verify"), 1);
        assert_eq!(fx.ledger.balance_of(&owner()).await, Some(dec!(15)));
    }

    #[tokio::test]
    async fn pending_result_leaves_transaction_pending() {
        let fx = fixture();
        let tx = pending_topup(&fx).await;

        let result = fx.handler.handle(command(&tx)).await.unwrap();

        assert_eq!(result.status, VerificationStatus::Pending);
        assert!(result.transaction.is_pending());
    }

    #[tokio::test]
    async fn failed_result_fails_transaction() {
        let fx = fixture();
        let tx = pending_topup(&fx).await;
        fx.stripe.set_verification(
            tx.provider_reference.clone().unwrap(),
            VerificationStatus::Failed,
        );

        let result = fx.handler.handle(command(&tx)).await.unwrap();

        assert_eq!(result.status, VerificationStatus::Failed);
        assert_eq!(fx.ledger.balance_of(&owner()).await, None);
    }

    #[tokio::test]
    async fn other_users_transaction_is_forbidden() {
        let fx = fixture();
        let tx = pending_topup(&fx).await;
        let cmd = VerifyPaymentCommand {
            user_id: UserId::new("intruder").unwrap(),
            lookup: TransactionLookup::Id(tx.id),
        };

        let err = fx.handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, BillingError::Forbidden(_)));
        assert_eq!(fx.stripe.call_count("verify"), 0);
    }

    #[tokio::test]
    async fn gateway_outage_is_retryable_and_changes_nothing() {
        let fx = fixture();
        let tx = pending_topup(&fx).await;
        fx.stripe.fail_next(GatewayError::unavailable("connect timeout"));

        let err = fx.handler.handle(command(&tx)).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(fx.transactions.all().await[0].is_pending());
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let fx = fixture();
        let cmd = VerifyPaymentCommand {
            user_id: owner(),
            lookup: TransactionLookup::Reference("topup_0_missing".to_string()),
        };

        let err = fx.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound { resource: "Transaction", .. }));
    }
}
