//! ConfirmationProcessor - settles transactions and applies their side effect.
//!
//! Both the webhook and the synchronous verify path funnel through here.
//! The guarded `pending -> completed` transition is the only idempotency
//! primitive: the caller whose transition applied performs the side effect,
//! every other caller sees `AlreadyTerminal` and does nothing.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::entitlement::{MoviePurchase, Subscription};
use crate::domain::foundation::{Amount, Timestamp};
use crate::domain::ledger::Wallet;
use crate::domain::payment::BillingError;
use crate::domain::transaction::{
    Transaction, TransactionIntent, TransactionLookup, TransactionStatus,
};
use crate::ports::{EntitlementStore, PurchaseInsert, TransactionLog, TransitionOutcome, WalletLedger};

/// Side effect applied for a completed transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementEffect {
    Credited(Wallet),
    Purchased(MoviePurchase),
    Subscribed(Subscription),
    /// A purchase row for this transaction already existed.
    AlreadyGranted,
    /// Intent unreadable. Money moved with no grant; flagged for reconciliation.
    Skipped,
    /// The grant failed after completion; flagged for reconciliation.
    Unapplied { error: String },
}

/// Result of a confirm or fail call.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub transaction: Transaction,
    /// True only for the call whose transition applied.
    pub applied: bool,
    /// Present only when this call applied a completion.
    pub effect: Option<SettlementEffect>,
}

impl Confirmation {
    pub fn is_completed(&self) -> bool {
        self.transaction.status == TransactionStatus::Completed
    }
}

pub struct ConfirmationProcessor {
    transactions: Arc<dyn TransactionLog>,
    ledger: Arc<dyn WalletLedger>,
    entitlements: Arc<dyn EntitlementStore>,
}

impl ConfirmationProcessor {
    pub fn new(
        transactions: Arc<dyn TransactionLog>,
        ledger: Arc<dyn WalletLedger>,
        entitlements: Arc<dyn EntitlementStore>,
    ) -> Self {
        Self {
            transactions,
            ledger,
            entitlements,
        }
    }

    /// Completes a pending transaction and applies its side effect exactly once.
    ///
    /// An already terminal transaction is returned unchanged with
    /// `applied = false`; that includes one that already failed.
    ///
    /// Once the transition applied the call succeeds. A failed side effect
    /// comes back as [`SettlementEffect::Unapplied`], since a retry would
    /// only see `AlreadyTerminal`.
    pub async fn confirm(
        &self,
        lookup: &TransactionLookup,
        evidence: Option<Value>,
    ) -> Result<Confirmation, BillingError> {
        let outcome = self
            .transactions
            .transition(lookup, TransactionStatus::Completed, evidence)
            .await?;

        let transaction = match outcome {
            TransitionOutcome::Applied(tx) => tx,
            TransitionOutcome::AlreadyTerminal(tx) => {
                tracing::debug!(
                    transaction_id = %tx.id,
                    status = %tx.status,
                    "Confirmation for terminal transaction ignored"
                );
                return Ok(Confirmation {
                    transaction: tx,
                    applied: false,
                    effect: None,
                });
            }
        };

        tracing::info!(
            transaction_id = %transaction.id,
            user_id = %transaction.user_id,
            kind = %transaction.kind,
            amount = %transaction.amount,
            "Transaction confirmed"
        );

        let effect = match self.apply_settled(&transaction).await {
            Ok(effect) => effect,
            Err(e) => SettlementEffect::Unapplied {
                error: e.to_string(),
            },
        };

        Ok(Confirmation {
            transaction,
            applied: true,
            effect: Some(effect),
        })
    }

    /// Fails a pending transaction. No side effect, ever.
    pub async fn fail(
        &self,
        lookup: &TransactionLookup,
        evidence: Option<Value>,
    ) -> Result<Confirmation, BillingError> {
        let outcome = self
            .transactions
            .transition(lookup, TransactionStatus::Failed, evidence)
            .await?;

        let applied = outcome.was_applied();
        let transaction = outcome.transaction().clone();
        if applied {
            tracing::info!(
                transaction_id = %transaction.id,
                user_id = %transaction.user_id,
                "Transaction failed"
            );
        }

        Ok(Confirmation {
            transaction,
            applied,
            effect: None,
        })
    }

    /// Applies the side effect of a transaction that is already completed.
    ///
    /// Callers must hold the completed transition (the webhook/verify path
    /// via `confirm`, or the wallet path right after its own debit).
    pub async fn apply_settled(
        &self,
        transaction: &Transaction,
    ) -> Result<SettlementEffect, BillingError> {
        let intent = match transaction.intent() {
            Ok(intent) => intent,
            Err(e) => {
                tracing::error!(
                    transaction_id = %transaction.id,
                    user_id = %transaction.user_id,
                    metadata = %transaction.metadata,
                    error = %e,
                    "Completed transaction has unreadable intent; reconciliation required"
                );
                return Ok(SettlementEffect::Skipped);
            }
        };

        let result = self.dispatch(transaction, intent).await;
        if let Err(e) = &result {
            tracing::error!(
                transaction_id = %transaction.id,
                user_id = %transaction.user_id,
                kind = %transaction.kind,
                error = %e,
                "Side effect failed for completed transaction; reconciliation required"
            );
        }
        result
    }

    async fn dispatch(
        &self,
        transaction: &Transaction,
        intent: TransactionIntent,
    ) -> Result<SettlementEffect, BillingError> {
        let now = Timestamp::now();
        match intent {
            TransactionIntent::WalletTopup => {
                let amount = Amount::new(transaction.amount)?;
                let wallet = self.ledger.credit(&transaction.user_id, amount).await?;
                tracing::info!(
                    user_id = %transaction.user_id,
                    amount = %transaction.amount,
                    balance = %wallet.balance(),
                    "Wallet credited"
                );
                Ok(SettlementEffect::Credited(wallet))
            }
            TransactionIntent::Purchase { movie_id, quality } => {
                let purchase = MoviePurchase::paid(
                    transaction.user_id.clone(),
                    movie_id,
                    transaction.id,
                    quality,
                    transaction.amount,
                    now,
                );
                match self.entitlements.insert_purchase(&purchase).await? {
                    PurchaseInsert::Inserted(purchase) => {
                        tracing::info!(
                            user_id = %purchase.user_id,
                            movie_id = %purchase.movie_id,
                            quality = %purchase.quality,
                            expires_at = %purchase.access_expires_at,
                            "Movie purchase granted"
                        );
                        Ok(SettlementEffect::Purchased(purchase))
                    }
                    PurchaseInsert::DuplicateTransaction => {
                        tracing::warn!(
                            transaction_id = %transaction.id,
                            "Purchase already granted for transaction"
                        );
                        Ok(SettlementEffect::AlreadyGranted)
                    }
                }
            }
            TransactionIntent::Subscription { plan_type } => {
                let subscription = Subscription::start(
                    transaction.user_id.clone(),
                    plan_type,
                    transaction.amount,
                    now,
                );
                self.entitlements
                    .activate_subscription(&subscription)
                    .await?;
                tracing::info!(
                    user_id = %subscription.user_id,
                    subscription_id = %subscription.id,
                    plan_type = %subscription.plan_type,
                    end_date = %subscription.end_date,
                    "Subscription activated"
                );
                Ok(SettlementEffect::Subscribed(subscription))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryEntitlementStore, InMemoryTransactionLog, InMemoryWalletLedger,
    };
    use crate::domain::entitlement::{PlanType, Quality};
    use crate::domain::foundation::{Currency, MovieId, UserId};
    use crate::domain::payment::{PaymentMethod, PaymentProvider};
    use crate::domain::transaction::generate_reference;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct Fixture {
        processor: ConfirmationProcessor,
        transactions: InMemoryTransactionLog,
        ledger: InMemoryWalletLedger,
        entitlements: InMemoryEntitlementStore,
    }

    fn fixture() -> Fixture {
        let transactions = InMemoryTransactionLog::new();
        let ledger = InMemoryWalletLedger::new();
        let entitlements = InMemoryEntitlementStore::new();
        Fixture {
            processor: ConfirmationProcessor::new(
                Arc::new(transactions.clone()),
                Arc::new(ledger.clone()),
                Arc::new(entitlements.clone()),
            ),
            transactions,
            ledger,
            entitlements,
        }
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    async fn pending(fx: &Fixture, intent: TransactionIntent, amount: Decimal) -> Transaction {
        let now = Timestamp::now();
        let tx = Transaction::pending_external(
            user(),
            intent,
            amount,
            Currency::Usd,
            PaymentMethod::Card,
            PaymentProvider::Stripe,
            generate_reference(intent.kind(), now),
            "test",
            now,
        );
        fx.transactions.create(&tx).await.unwrap();
        tx
    }

    fn by_reference(tx: &Transaction) -> TransactionLookup {
        TransactionLookup::Reference(tx.provider_reference.clone().unwrap())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Confirm
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn confirm_topup_credits_wallet_once() {
        let fx = fixture();
        let tx = pending(&fx, TransactionIntent::WalletTopup, dec!(25.00)).await;

        let first = fx.processor.confirm(&by_reference(&tx), None).await.unwrap();
        let second = fx.processor.confirm(&by_reference(&tx), None).await.unwrap();

        assert!(first.applied);
        assert!(matches!(first.effect, Some(SettlementEffect::Credited(_))));
        assert!(!second.applied);
        assert!(second.effect.is_none());
        assert!(second.is_completed());
        assert_eq!(fx.ledger.balance_of(&user()).await, Some(dec!(25.00)));
    }

    #[tokio::test]
    async fn confirm_purchase_grants_seven_day_rental() {
        let fx = fixture();
        let movie = MovieId::new();
        let intent = TransactionIntent::Purchase {
            movie_id: movie,
            quality: Quality::Hd1080,
        };
        let tx = pending(&fx, intent, dec!(4.99)).await;

        let confirmation = fx
            .processor
            .confirm(&TransactionLookup::Id(tx.id), None)
            .await
            .unwrap();

        let Some(SettlementEffect::Purchased(purchase)) = confirmation.effect else {
            panic!("expected a purchase");
        };
        assert_eq!(purchase.transaction_id, Some(tx.id));
        assert_eq!(purchase.movie_id, movie);
        assert_eq!(purchase.price_paid, dec!(4.99));
        let days = purchase
            .access_expires_at
            .duration_since(&purchase.created_at)
            .num_days();
        assert_eq!(days, 7);
    }

    #[tokio::test]
    async fn confirm_subscription_activates_with_auto_renew() {
        let fx = fixture();
        let tx = pending(
            &fx,
            TransactionIntent::Subscription {
                plan_type: PlanType::Monthly,
            },
            dec!(9.99),
        )
        .await;

        fx.processor.confirm(&by_reference(&tx), None).await.unwrap();

        let subs = fx.entitlements.all_subscriptions().await;
        assert_eq!(subs.len(), 1);
        assert!(subs[0].is_active);
        assert!(subs[0].auto_renew);
        assert_eq!(subs[0].plan_type, PlanType::Monthly);
    }

    #[tokio::test]
    async fn confirm_after_fail_is_noop() {
        let fx = fixture();
        let tx = pending(&fx, TransactionIntent::WalletTopup, dec!(10)).await;

        let failed = fx.processor.fail(&by_reference(&tx), None).await.unwrap();
        let confirmed = fx.processor.confirm(&by_reference(&tx), None).await.unwrap();

        assert!(failed.applied);
        assert!(!confirmed.applied);
        assert_eq!(confirmed.transaction.status, TransactionStatus::Failed);
        assert_eq!(fx.ledger.balance_of(&user()).await, None);
    }

    #[tokio::test]
    async fn confirm_unknown_reference_is_not_found() {
        let fx = fixture();
        let err = fx
            .processor
            .confirm(&TransactionLookup::Reference("nope".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn confirm_records_evidence() {
        let fx = fixture();
        let tx = pending(&fx, TransactionIntent::WalletTopup, dec!(10)).await;
        let evidence = serde_json::json!({ "provider": "stripe", "id": "pi_1" });

        let confirmation = fx
            .processor
            .confirm(&by_reference(&tx), Some(evidence.clone()))
            .await
            .unwrap();

        assert_eq!(confirmation.transaction.evidence, Some(evidence));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Side effects
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unreadable_intent_is_skipped_not_partially_applied() {
        let fx = fixture();
        let mut tx = pending(
            &fx,
            TransactionIntent::Subscription {
                plan_type: PlanType::Yearly,
            },
            dec!(99.99),
        )
        .await;
        tx.metadata = serde_json::json!({ "plan_type": "weekly" });
        tx.status = TransactionStatus::Completed;

        let effect = fx.processor.apply_settled(&tx).await.unwrap();

        assert_eq!(effect, SettlementEffect::Skipped);
        assert!(fx.entitlements.all_subscriptions().await.is_empty());
    }

    #[tokio::test]
    async fn second_purchase_apply_is_already_granted() {
        let fx = fixture();
        let tx = pending(
            &fx,
            TransactionIntent::Purchase {
                movie_id: MovieId::new(),
                quality: Quality::Hd720,
            },
            dec!(2.99),
        )
        .await;

        let first = fx.processor.apply_settled(&tx).await.unwrap();
        let second = fx.processor.apply_settled(&tx).await.unwrap();

        assert!(matches!(first, SettlementEffect::Purchased(_)));
        assert_eq!(second, SettlementEffect::AlreadyGranted);
        assert_eq!(fx.entitlements.all_purchases().await.len(), 1);
    }
}
