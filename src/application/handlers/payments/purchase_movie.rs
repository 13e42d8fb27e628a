//! PurchaseMovieHandler - Command handler for buying access to a movie.

use std::sync::Arc;

use crate::application::{CheckoutOutcome, CheckoutRequest, CheckoutService};
use crate::domain::entitlement::{MoviePurchase, Quality};
use crate::domain::foundation::{AuthenticatedUser, MovieId, Timestamp};
use crate::domain::payment::{BillingError, PaymentMethod, PaymentProvider};
use crate::domain::transaction::TransactionIntent;
use crate::ports::{EntitlementStore, PricingCatalog, PurchaseInsert};

/// Command to purchase a movie at one quality.
#[derive(Debug, Clone)]
pub struct PurchaseMovieCommand {
    pub user: AuthenticatedUser,
    pub movie_id: MovieId,
    pub quality: Quality,
    pub payment_method: Option<PaymentMethod>,
    pub payment_provider: Option<PaymentProvider>,
    pub redirect_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseMovieResult {
    /// Quality is free; granted directly with no transaction.
    FreeGrant(MoviePurchase),
    Checkout(CheckoutOutcome),
}

/// Handler for movie purchases.
///
/// Free qualities skip the money path entirely. Priced qualities are refused
/// when the caller already holds an entitled purchase of the same quality.
pub struct PurchaseMovieHandler {
    pricing: Arc<dyn PricingCatalog>,
    entitlements: Arc<dyn EntitlementStore>,
    checkout: Arc<CheckoutService>,
}

impl PurchaseMovieHandler {
    pub fn new(
        pricing: Arc<dyn PricingCatalog>,
        entitlements: Arc<dyn EntitlementStore>,
        checkout: Arc<CheckoutService>,
    ) -> Self {
        Self {
            pricing,
            entitlements,
            checkout,
        }
    }

    pub async fn handle(&self, cmd: PurchaseMovieCommand) -> Result<PurchaseMovieResult, BillingError> {
        // 1. Price lookup
        let pricing = self
            .pricing
            .find_pricing(&cmd.movie_id, cmd.quality)
            .await?
            .ok_or_else(|| {
                BillingError::not_found("Pricing", format!("{}/{}", cmd.movie_id, cmd.quality))
            })?;

        let now = Timestamp::now();

        // 2. Free content is granted without a transaction
        if pricing.is_free() {
            let grant = MoviePurchase::free_grant(cmd.user.id.clone(), cmd.movie_id, cmd.quality, now);
            let stored = match self.entitlements.insert_purchase(&grant).await? {
                PurchaseInsert::Inserted(purchase) => purchase,
                PurchaseInsert::DuplicateTransaction => grant,
            };
            tracing::info!(
                user_id = %cmd.user.id,
                movie_id = %cmd.movie_id,
                quality = %cmd.quality,
                "Free access granted"
            );
            return Ok(PurchaseMovieResult::FreeGrant(stored));
        }

        // 3. Refuse a second purchase of something already owned
        if self
            .entitlements
            .find_entitled_purchase(&cmd.user.id, &cmd.movie_id, cmd.quality, now)
            .await?
            .is_some()
        {
            return Err(BillingError::already_entitled(cmd.movie_id, cmd.quality));
        }

        // 4. Collect payment
        let method = PaymentMethod::resolve(cmd.payment_method, cmd.payment_provider);
        let outcome = self
            .checkout
            .checkout(CheckoutRequest {
                user: cmd.user,
                intent: TransactionIntent::Purchase {
                    movie_id: cmd.movie_id,
                    quality: cmd.quality,
                },
                amount: pricing.price,
                currency: pricing.currency,
                description: pricing.purchase_description(),
                method,
                provider: cmd.payment_provider,
                redirect_url: cmd.redirect_url,
            })
            .await?;

        Ok(PurchaseMovieResult::Checkout(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{
        InMemoryEntitlementStore, InMemoryPricingCatalog, InMemoryTransactionLog,
        InMemoryWalletLedger,
    };
    use crate::application::{ConfirmationProcessor, SettlementEffect};
    use crate::domain::entitlement::MoviePricing;
    use crate::domain::foundation::{Currency, Role, UserId};
    use crate::domain::transaction::TransactionStatus;
    use crate::ports::GatewayRegistry;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct Fixture {
        handler: PurchaseMovieHandler,
        ledger: InMemoryWalletLedger,
        transactions: InMemoryTransactionLog,
        entitlements: InMemoryEntitlementStore,
        catalog: InMemoryPricingCatalog,
        flutterwave: MockPaymentGateway,
    }

    fn fixture() -> Fixture {
        let ledger = InMemoryWalletLedger::new();
        let transactions = InMemoryTransactionLog::new();
        let entitlements = InMemoryEntitlementStore::new();
        let catalog = InMemoryPricingCatalog::new();
        let flutterwave = MockPaymentGateway::new(PaymentProvider::Flutterwave);
        let processor = Arc::new(ConfirmationProcessor::new(
            Arc::new(transactions.clone()),
            Arc::new(ledger.clone()),
            Arc::new(entitlements.clone()),
        ));
        let checkout = Arc::new(CheckoutService::new(
            Arc::new(ledger.clone()),
            Arc::new(transactions.clone()),
            GatewayRegistry::new(PaymentProvider::Flutterwave)
                .with_gateway(Arc::new(flutterwave.clone())),
            processor,
        ));
        Fixture {
            handler: PurchaseMovieHandler::new(
                Arc::new(catalog.clone()),
                Arc::new(entitlements.clone()),
                checkout,
            ),
            ledger,
            transactions,
            entitlements,
            catalog,
            flutterwave,
        }
    }

    fn viewer() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("viewer-7").unwrap(), "v@example.com", None, Role::User)
    }

    async fn priced(fx: &Fixture, quality: Quality, price: Decimal, is_free: bool) -> MovieId {
        let movie_id = MovieId::new();
        fx.catalog
            .insert(MoviePricing {
                movie_id,
                title: "The Nile Run".to_string(),
                quality,
                price,
                currency: Currency::Usd,
                is_free,
            })
            .await;
        movie_id
    }

    fn command(movie_id: MovieId, quality: Quality) -> PurchaseMovieCommand {
        PurchaseMovieCommand {
            user: viewer(),
            movie_id,
            quality,
            payment_method: None,
            payment_provider: None,
            redirect_url: "http://localhost:3000/payment/callback".to_string(),
        }
    }

    #[tokio::test]
    async fn free_quality_grants_without_transaction() {
        let fx = fixture();
        let movie = priced(&fx, Quality::Sd480, Decimal::ZERO, true).await;

        let result = fx.handler.handle(command(movie, Quality::Sd480)).await.unwrap();

        let PurchaseMovieResult::FreeGrant(grant) = result else {
            panic!("expected free grant");
        };
        assert_eq!(grant.transaction_id, None);
        assert_eq!(grant.price_paid, Decimal::ZERO);
        assert_eq!(
            grant.access_expires_at.duration_since(&grant.created_at).num_days(),
            365
        );
        assert_eq!(fx.transactions.count().await, 0);
    }

    #[tokio::test]
    async fn wallet_purchase_leaves_one_cent() {
        let fx = fixture();
        let movie = priced(&fx, Quality::Hd1080, dec!(9.99), false).await;
        fx.ledger.seed(&viewer().id, dec!(10.00)).await;

        let result = fx.handler.handle(command(movie, Quality::Hd1080)).await.unwrap();

        let PurchaseMovieResult::Checkout(CheckoutOutcome::Settled { transaction, effect }) = result
        else {
            panic!("expected wallet settlement");
        };
        assert_eq!(transaction.status, TransactionStatus::Completed);
        assert_eq!(transaction.description, "Movie purchase: The Nile Run (1080p)");
        assert!(matches!(effect, SettlementEffect::Purchased(_)));
        assert_eq!(fx.ledger.balance_of(&viewer().id).await, Some(dec!(0.01)));
    }

    #[tokio::test]
    async fn owned_quality_is_already_entitled() {
        let fx = fixture();
        let movie = priced(&fx, Quality::Hd720, dec!(2.99), false).await;
        fx.ledger.seed(&viewer().id, dec!(10)).await;
        fx.handler.handle(command(movie, Quality::Hd720)).await.unwrap();

        let err = fx
            .handler
            .handle(command(movie, Quality::Hd720))
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::already_entitled(movie, Quality::Hd720));
        assert_eq!(fx.ledger.balance_of(&viewer().id).await, Some(dec!(7.01)));
        assert_eq!(fx.entitlements.all_purchases().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_pricing_is_not_found() {
        let fx = fixture();
        let err = fx
            .handler
            .handle(command(MovieId::new(), Quality::Uhd4k))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::NotFound { resource: "Pricing", .. }));
    }

    #[tokio::test]
    async fn provider_given_defaults_method_to_card() {
        let fx = fixture();
        let movie = priced(&fx, Quality::Hd1080, dec!(4.99), false).await;
        let cmd = PurchaseMovieCommand {
            payment_provider: Some(PaymentProvider::Flutterwave),
            ..command(movie, Quality::Hd1080)
        };

        let result = fx.handler.handle(cmd).await.unwrap();

        assert!(matches!(
            result,
            PurchaseMovieResult::Checkout(CheckoutOutcome::AwaitingPayment { .. })
        ));
        let sent = fx.flutterwave.initialized();
        assert_eq!(sent[0].method, PaymentMethod::Card);
        assert_eq!(sent[0].amount, dec!(4.99));
    }
}
