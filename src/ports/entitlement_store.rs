//! Entitlement store port: movie purchases and subscriptions.
//!
//! # Invariants
//!
//! - At most one purchase row per non-null `transaction_id`.
//! - At most one `is_active` subscription per user. `activate_subscription`
//!   deactivates the previous one and inserts the new one as a single unit.
//!
//! Lookups that answer "is the user entitled" take `now` and check
//! `is_active AND expiry > now`; the flag alone is never trusted.

use async_trait::async_trait;

use crate::domain::entitlement::{MoviePurchase, Quality, Subscription};
use crate::domain::foundation::{DomainError, MovieId, SubscriptionId, Timestamp, UserId};

/// Result of inserting a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseInsert {
    Inserted(MoviePurchase),
    /// A purchase for this transaction already exists. Nothing was written.
    DuplicateTransaction,
}

/// Counts from one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub purchases_deactivated: u64,
    pub subscriptions_deactivated: u64,
}

impl ReapReport {
    pub fn total(&self) -> u64 {
        self.purchases_deactivated + self.subscriptions_deactivated
    }
}

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    // ─── Purchases ───────────────────────────────────────────────

    async fn insert_purchase(&self, purchase: &MoviePurchase)
        -> Result<PurchaseInsert, DomainError>;

    /// Latest entitled purchase for exactly this movie and quality.
    async fn find_entitled_purchase(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        quality: Quality,
        now: Timestamp,
    ) -> Result<Option<MoviePurchase>, DomainError>;

    /// Latest entitled purchase for this movie at any quality.
    async fn find_entitled_purchase_any_quality(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        now: Timestamp,
    ) -> Result<Option<MoviePurchase>, DomainError>;

    /// All of the user's purchases, newest first.
    async fn list_purchases(&self, user_id: &UserId) -> Result<Vec<MoviePurchase>, DomainError>;

    // ─── Subscriptions ───────────────────────────────────────────

    /// Deactivates any active subscription of the same user and stores
    /// `subscription` as the active one, atomically.
    async fn activate_subscription(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// The user's active, unexpired subscription.
    async fn find_entitled_subscription(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError>;

    async fn find_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// All of the user's subscriptions, newest first.
    async fn list_subscriptions(&self, user_id: &UserId)
        -> Result<Vec<Subscription>, DomainError>;

    /// Sets `is_active = false` and `auto_renew = false`.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the id is unknown
    async fn cancel_subscription(&self, id: &SubscriptionId) -> Result<Subscription, DomainError>;

    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the id is unknown
    async fn set_auto_renew(
        &self,
        id: &SubscriptionId,
        auto_renew: bool,
    ) -> Result<Subscription, DomainError>;

    // ─── Expiry ──────────────────────────────────────────────────

    /// Clears `is_active` on every purchase and subscription lapsed at `now`.
    async fn deactivate_lapsed(&self, now: Timestamp) -> Result<ReapReport, DomainError>;
}
