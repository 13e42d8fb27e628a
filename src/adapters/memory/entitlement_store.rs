//! In-memory entitlement store.
//!
//! Purchases and subscriptions share one lock so that
//! `activate_subscription` deactivates and inserts as one step.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entitlement::{MoviePurchase, Quality, Subscription};
use crate::domain::foundation::{
    DomainError, ErrorCode, MovieId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{EntitlementStore, PurchaseInsert, ReapReport};

#[derive(Debug, Default)]
struct State {
    purchases: Vec<MoviePurchase>,
    subscriptions: Vec<Subscription>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryEntitlementStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a purchase as-is, bypassing the duplicate check (test setup).
    pub async fn seed_purchase(&self, purchase: MoviePurchase) {
        self.state.write().await.purchases.push(purchase);
    }

    /// Stores a subscription as-is (test setup).
    pub async fn seed_subscription(&self, subscription: Subscription) {
        self.state.write().await.subscriptions.push(subscription);
    }

    pub async fn all_purchases(&self) -> Vec<MoviePurchase> {
        self.state.read().await.purchases.clone()
    }

    pub async fn all_subscriptions(&self) -> Vec<Subscription> {
        self.state.read().await.subscriptions.clone()
    }
}

fn newest_first<T>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> Timestamp) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.reverse();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

fn subscription_not_found(id: &SubscriptionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("Subscription not found: {}", id),
    )
    .with_detail("id", id.to_string())
}

#[async_trait]
impl EntitlementStore for InMemoryEntitlementStore {
    async fn insert_purchase(
        &self,
        purchase: &MoviePurchase,
    ) -> Result<PurchaseInsert, DomainError> {
        let mut state = self.state.write().await;
        if let Some(tx_id) = purchase.transaction_id {
            if state
                .purchases
                .iter()
                .any(|p| p.transaction_id == Some(tx_id))
            {
                return Ok(PurchaseInsert::DuplicateTransaction);
            }
        }
        state.purchases.push(purchase.clone());
        Ok(PurchaseInsert::Inserted(purchase.clone()))
    }

    async fn find_entitled_purchase(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        quality: Quality,
        now: Timestamp,
    ) -> Result<Option<MoviePurchase>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .purchases
            .iter()
            .filter(|p| &p.user_id == user_id && &p.movie_id == movie_id && p.quality == quality)
            .filter(|p| p.is_entitled_at(now))
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn find_entitled_purchase_any_quality(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        now: Timestamp,
    ) -> Result<Option<MoviePurchase>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .purchases
            .iter()
            .filter(|p| &p.user_id == user_id && &p.movie_id == movie_id)
            .filter(|p| p.is_entitled_at(now))
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn list_purchases(&self, user_id: &UserId) -> Result<Vec<MoviePurchase>, DomainError> {
        let state = self.state.read().await;
        Ok(newest_first(
            state
                .purchases
                .iter()
                .filter(|p| &p.user_id == user_id)
                .cloned(),
            |p| p.created_at,
        ))
    }

    async fn activate_subscription(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        for existing in state
            .subscriptions
            .iter_mut()
            .filter(|s| s.user_id == subscription.user_id && s.is_active)
        {
            existing.is_active = false;
        }
        state.subscriptions.push(subscription.clone());
        Ok(())
    }

    async fn find_entitled_subscription(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .subscriptions
            .iter()
            .filter(|s| &s.user_id == user_id && s.is_entitled_at(now))
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn find_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let state = self.state.read().await;
        Ok(state.subscriptions.iter().find(|s| &s.id == id).cloned())
    }

    async fn list_subscriptions(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError> {
        let state = self.state.read().await;
        Ok(newest_first(
            state
                .subscriptions
                .iter()
                .filter(|s| &s.user_id == user_id)
                .cloned(),
            |s| s.created_at,
        ))
    }

    async fn cancel_subscription(&self, id: &SubscriptionId) -> Result<Subscription, DomainError> {
        let mut state = self.state.write().await;
        let subscription = state
            .subscriptions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| subscription_not_found(id))?;
        subscription.cancel();
        Ok(subscription.clone())
    }

    async fn set_auto_renew(
        &self,
        id: &SubscriptionId,
        auto_renew: bool,
    ) -> Result<Subscription, DomainError> {
        let mut state = self.state.write().await;
        let subscription = state
            .subscriptions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| subscription_not_found(id))?;
        subscription.auto_renew = auto_renew;
        Ok(subscription.clone())
    }

    async fn deactivate_lapsed(&self, now: Timestamp) -> Result<ReapReport, DomainError> {
        let mut state = self.state.write().await;
        let mut report = ReapReport::default();

        for purchase in state.purchases.iter_mut().filter(|p| p.is_lapsed_at(now)) {
            purchase.is_active = false;
            report.purchases_deactivated += 1;
        }
        for subscription in state
            .subscriptions
            .iter_mut()
            .filter(|s| s.is_lapsed_at(now))
        {
            subscription.is_active = false;
            report.subscriptions_deactivated += 1;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::PlanType;
    use crate::domain::foundation::TransactionId;
    use rust_decimal_macros::dec;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn paid(movie: MovieId, quality: Quality, issued: Timestamp) -> MoviePurchase {
        MoviePurchase::paid(user(), movie, TransactionId::new(), quality, dec!(4.99), issued)
    }

    #[tokio::test]
    async fn second_insert_for_same_transaction_is_a_duplicate() {
        let store = InMemoryEntitlementStore::new();
        let purchase = paid(MovieId::new(), Quality::Hd720, Timestamp::now());
        let again = MoviePurchase {
            id: crate::domain::foundation::PurchaseId::new(),
            ..purchase.clone()
        };

        assert!(matches!(
            store.insert_purchase(&purchase).await.unwrap(),
            PurchaseInsert::Inserted(_)
        ));
        assert_eq!(
            store.insert_purchase(&again).await.unwrap(),
            PurchaseInsert::DuplicateTransaction
        );
        assert_eq!(store.all_purchases().await.len(), 1);
    }

    #[tokio::test]
    async fn free_grants_are_never_duplicates() {
        let store = InMemoryEntitlementStore::new();
        let movie = MovieId::new();
        for _ in 0..2 {
            let grant = MoviePurchase::free_grant(user(), movie, Quality::Sd480, Timestamp::now());
            store.insert_purchase(&grant).await.unwrap();
        }
        assert_eq!(store.all_purchases().await.len(), 2);
    }

    #[tokio::test]
    async fn lapsed_purchase_with_active_flag_is_not_entitled() {
        let store = InMemoryEntitlementStore::new();
        let movie = MovieId::new();
        store
            .seed_purchase(paid(movie, Quality::Hd720, Timestamp::now().add_days(-8)))
            .await;

        let found = store
            .find_entitled_purchase(&user(), &movie, Quality::Hd720, Timestamp::now())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn activation_leaves_exactly_one_active_subscription() {
        let store = InMemoryEntitlementStore::new();
        let now = Timestamp::now();
        let first = Subscription::start(user(), PlanType::Monthly, dec!(9.99), now);
        let second = Subscription::start(user(), PlanType::Yearly, dec!(99.99), now);

        store.activate_subscription(&first).await.unwrap();
        store.activate_subscription(&second).await.unwrap();

        let active: Vec<_> = store
            .all_subscriptions()
            .await
            .into_iter()
            .filter(|s| s.is_active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
    }

    #[tokio::test]
    async fn cancel_clears_active_and_auto_renew() {
        let store = InMemoryEntitlementStore::new();
        let sub = Subscription::start(user(), PlanType::Monthly, dec!(9.99), Timestamp::now());
        store.activate_subscription(&sub).await.unwrap();

        let cancelled = store.cancel_subscription(&sub.id).await.unwrap();
        assert!(!cancelled.is_active);
        assert!(!cancelled.auto_renew);
    }

    #[tokio::test]
    async fn cancel_unknown_subscription_is_not_found() {
        let store = InMemoryEntitlementStore::new();
        let err = store
            .cancel_subscription(&SubscriptionId::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);
    }

    #[tokio::test]
    async fn deactivate_lapsed_counts_both_tables() {
        let store = InMemoryEntitlementStore::new();
        let long_ago = Timestamp::now().add_days(-400);
        store
            .seed_purchase(paid(MovieId::new(), Quality::Hd720, long_ago))
            .await;
        store
            .seed_purchase(paid(MovieId::new(), Quality::Hd720, Timestamp::now()))
            .await;
        store
            .seed_subscription(Subscription::start(
                user(),
                PlanType::Yearly,
                dec!(99.99),
                long_ago,
            ))
            .await;

        let report = store.deactivate_lapsed(Timestamp::now()).await.unwrap();

        assert_eq!(report.purchases_deactivated, 1);
        assert_eq!(report.subscriptions_deactivated, 1);
        let again = store.deactivate_lapsed(Timestamp::now()).await.unwrap();
        assert_eq!(again.total(), 0);
    }
}
