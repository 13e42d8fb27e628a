//! AccessResolver - decides whether a user may watch a movie at a quality.
//!
//! Precedence, first match wins:
//! 1. entitled subscription
//! 2. quality priced as free
//! 3. entitled purchase of this exact quality
//! 4. entitled purchase of any other quality of the same movie
//! 5. deny with `PurchaseRequired`
//!
//! Every rule re-checks expiry against `now`; stale `is_active` flags left
//! for the reaper never grant access.

use std::sync::Arc;

use crate::domain::entitlement::{AccessBasis, AccessDecision, AccessDeniedReason, Quality};
use crate::domain::foundation::{MovieId, Timestamp, UserId};
use crate::domain::payment::BillingError;
use crate::ports::{EntitlementStore, PricingCatalog};

pub struct AccessResolver {
    entitlements: Arc<dyn EntitlementStore>,
    pricing: Arc<dyn PricingCatalog>,
}

impl AccessResolver {
    pub fn new(entitlements: Arc<dyn EntitlementStore>, pricing: Arc<dyn PricingCatalog>) -> Self {
        Self {
            entitlements,
            pricing,
        }
    }

    pub async fn resolve(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        quality: Quality,
    ) -> Result<AccessDecision, BillingError> {
        self.resolve_at(user_id, movie_id, quality, Timestamp::now())
            .await
    }

    pub async fn resolve_at(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        quality: Quality,
        now: Timestamp,
    ) -> Result<AccessDecision, BillingError> {
        if let Some(subscription) = self
            .entitlements
            .find_entitled_subscription(user_id, now)
            .await?
        {
            return Ok(AccessDecision::Granted(AccessBasis::Subscription {
                subscription_id: subscription.id,
            }));
        }

        let pricing = self.pricing.find_pricing(movie_id, quality).await?;
        if pricing.as_ref().is_some_and(|p| p.is_free()) {
            return Ok(AccessDecision::Granted(AccessBasis::FreeContent));
        }

        if let Some(purchase) = self
            .entitlements
            .find_entitled_purchase(user_id, movie_id, quality, now)
            .await?
        {
            return Ok(AccessDecision::Granted(AccessBasis::Purchase {
                purchase_id: purchase.id,
            }));
        }

        // Any quality unlocks every quality of the same title.
        if let Some(purchase) = self
            .entitlements
            .find_entitled_purchase_any_quality(user_id, movie_id, now)
            .await?
        {
            return Ok(AccessDecision::Granted(AccessBasis::OtherQualityPurchase {
                purchase_id: purchase.id,
                purchased_quality: purchase.quality,
            }));
        }

        Ok(AccessDecision::Denied(AccessDeniedReason::PurchaseRequired {
            movie_id: *movie_id,
            quality,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryEntitlementStore, InMemoryPricingCatalog};
    use crate::domain::entitlement::{MoviePricing, MoviePurchase, PlanType, Subscription};
    use crate::domain::foundation::{Currency, TransactionId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn user() -> UserId {
        UserId::new("viewer-1").unwrap()
    }

    async fn setup() -> (AccessResolver, InMemoryEntitlementStore, InMemoryPricingCatalog) {
        let store = InMemoryEntitlementStore::new();
        let catalog = InMemoryPricingCatalog::new();
        let resolver = AccessResolver::new(Arc::new(store.clone()), Arc::new(catalog.clone()));
        (resolver, store, catalog)
    }

    fn pricing(movie_id: MovieId, quality: Quality, price: Decimal, is_free: bool) -> MoviePricing {
        MoviePricing {
            movie_id,
            title: "Kampala Nights".to_string(),
            quality,
            price,
            currency: Currency::Usd,
            is_free,
        }
    }

    fn paid(movie_id: MovieId, quality: Quality, issued: Timestamp) -> MoviePurchase {
        MoviePurchase::paid(user(), movie_id, TransactionId::new(), quality, dec!(4.99), issued)
    }

    #[tokio::test]
    async fn denies_without_any_entitlement() {
        let (resolver, _, _) = setup().await;
        let movie = MovieId::new();

        let decision = resolver.resolve(&user(), &movie, Quality::Hd720).await.unwrap();

        assert_eq!(
            decision,
            AccessDecision::Denied(AccessDeniedReason::PurchaseRequired {
                movie_id: movie,
                quality: Quality::Hd720,
            })
        );
    }

    #[tokio::test]
    async fn subscription_wins_over_everything() {
        let (resolver, store, catalog) = setup().await;
        let movie = MovieId::new();
        catalog
            .insert(pricing(movie, Quality::Uhd4k, dec!(7.99), false))
            .await;
        let sub = Subscription::start(user(), PlanType::Monthly, dec!(9.99), Timestamp::now());
        store.seed_subscription(sub.clone()).await;

        let decision = resolver.resolve(&user(), &movie, Quality::Uhd4k).await.unwrap();

        assert_eq!(
            decision,
            AccessDecision::Granted(AccessBasis::Subscription {
                subscription_id: sub.id
            })
        );
    }

    #[tokio::test]
    async fn free_quality_is_granted_with_no_history() {
        let (resolver, _, catalog) = setup().await;
        let movie = MovieId::new();
        catalog
            .insert(pricing(movie, Quality::Sd480, Decimal::ZERO, true))
            .await;

        let decision = resolver.resolve(&user(), &movie, Quality::Sd480).await.unwrap();

        assert_eq!(decision, AccessDecision::Granted(AccessBasis::FreeContent));
    }

    #[tokio::test]
    async fn exact_purchase_grants() {
        let (resolver, store, _) = setup().await;
        let movie = MovieId::new();
        let purchase = paid(movie, Quality::Hd1080, Timestamp::now());
        store.seed_purchase(purchase.clone()).await;

        let decision = resolver.resolve(&user(), &movie, Quality::Hd1080).await.unwrap();

        assert_eq!(
            decision,
            AccessDecision::Granted(AccessBasis::Purchase {
                purchase_id: purchase.id
            })
        );
    }

    #[tokio::test]
    async fn other_quality_purchase_grants() {
        let (resolver, store, _) = setup().await;
        let movie = MovieId::new();
        store
            .seed_purchase(paid(movie, Quality::Sd480, Timestamp::now()))
            .await;

        let decision = resolver.resolve(&user(), &movie, Quality::Uhd4k).await.unwrap();

        assert!(matches!(
            decision,
            AccessDecision::Granted(AccessBasis::OtherQualityPurchase {
                purchased_quality: Quality::Sd480,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn lapsed_purchase_denies_before_reaper_runs() {
        let (resolver, store, _) = setup().await;
        let movie = MovieId::new();
        let issued = Timestamp::now();
        let purchase = paid(movie, Quality::Hd720, issued);
        let expiry = purchase.access_expires_at;
        store.seed_purchase(purchase).await;

        let before = resolver
            .resolve_at(&user(), &movie, Quality::Hd720, expiry.plus_secs(-1))
            .await
            .unwrap();
        let after = resolver
            .resolve_at(&user(), &movie, Quality::Hd720, expiry.plus_secs(1))
            .await
            .unwrap();

        assert!(before.is_granted());
        assert!(!after.is_granted());
        assert!(store.all_purchases().await[0].is_active);
    }

    #[tokio::test]
    async fn expired_subscription_falls_through_to_pricing() {
        let (resolver, store, _) = setup().await;
        let movie = MovieId::new();
        store
            .seed_subscription(Subscription::start(
                user(),
                PlanType::Monthly,
                dec!(9.99),
                Timestamp::now().add_days(-40),
            ))
            .await;

        let decision = resolver.resolve(&user(), &movie, Quality::Hd720).await.unwrap();

        assert!(!decision.is_granted());
    }

    #[tokio::test]
    async fn priced_quality_without_purchase_is_denied() {
        let (resolver, _, catalog) = setup().await;
        let movie = MovieId::new();
        catalog
            .insert(pricing(movie, Quality::Hd720, dec!(2.99), false))
            .await;

        let decision = resolver.resolve(&user(), &movie, Quality::Hd720).await.unwrap();

        assert!(!decision.is_granted());
    }
}
