//! PostgreSQL implementation of EntitlementStore.
//!
//! Two constraints back the invariants:
//! - `uq_movie_purchases_transaction` (partial unique on `transaction_id`)
//! - `uq_subscriptions_one_active` (partial unique on `user_id WHERE is_active`)
//!
//! Subscription activation additionally takes a per-user advisory lock so
//! concurrent activations queue instead of failing on the unique index; the
//! later one wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entitlement::{MoviePurchase, Quality, Subscription};
use crate::domain::foundation::{
    DomainError, ErrorCode, MovieId, PurchaseId, SubscriptionId, Timestamp, TransactionId, UserId,
};
use crate::ports::{EntitlementStore, PurchaseInsert, ReapReport};

use super::corrupt;

pub struct PostgresEntitlementStore {
    pool: PgPool,
}

impl PostgresEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    user_id: String,
    movie_id: Uuid,
    transaction_id: Option<Uuid>,
    quality: String,
    price_paid: Decimal,
    access_expires_at: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for MoviePurchase {
    type Error = DomainError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        Ok(MoviePurchase {
            id: PurchaseId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)
                .map_err(|e| corrupt("movie_purchases.user_id", e))?,
            movie_id: MovieId::from_uuid(row.movie_id),
            transaction_id: row.transaction_id.map(TransactionId::from_uuid),
            quality: row
                .quality
                .parse()
                .map_err(|e| corrupt("movie_purchases.quality", e))?,
            price_paid: row.price_paid,
            access_expires_at: Timestamp::from_datetime(row.access_expires_at),
            is_active: row.is_active,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    plan_type: String,
    price: Decimal,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    auto_renew: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| corrupt("subscriptions.user_id", e))?,
            plan_type: row
                .plan_type
                .parse()
                .map_err(|e| corrupt("subscriptions.plan_type", e))?,
            price: row.price,
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: Timestamp::from_datetime(row.end_date),
            auto_renew: row.auto_renew,
            is_active: row.is_active,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const PURCHASE_COLUMNS: &str = "id, user_id, movie_id, transaction_id, quality, price_paid, \
     access_expires_at, is_active, created_at";

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_type, price, start_date, end_date, \
     auto_renew, is_active, created_at";

fn subscription_not_found(id: &SubscriptionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("Subscription not found: {}", id),
    )
    .with_detail("id", id.to_string())
}

#[async_trait]
impl EntitlementStore for PostgresEntitlementStore {
    async fn insert_purchase(
        &self,
        purchase: &MoviePurchase,
    ) -> Result<PurchaseInsert, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO movie_purchases (
                id, user_id, movie_id, transaction_id, quality, price_paid,
                access_expires_at, is_active, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (transaction_id) WHERE transaction_id IS NOT NULL DO NOTHING
            "#,
        )
        .bind(purchase.id.as_uuid())
        .bind(purchase.user_id.as_str())
        .bind(purchase.movie_id.as_uuid())
        .bind(purchase.transaction_id.map(|t| *t.as_uuid()))
        .bind(purchase.quality.as_str())
        .bind(purchase.price_paid)
        .bind(purchase.access_expires_at.as_datetime())
        .bind(purchase.is_active)
        .bind(purchase.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;

        if result.rows_affected() == 0 {
            return Ok(PurchaseInsert::DuplicateTransaction);
        }
        Ok(PurchaseInsert::Inserted(purchase.clone()))
    }

    async fn find_entitled_purchase(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        quality: Quality,
        now: Timestamp,
    ) -> Result<Option<MoviePurchase>, DomainError> {
        let row: Option<PurchaseRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM movie_purchases
            WHERE user_id = $1 AND movie_id = $2 AND quality = $3
              AND is_active AND access_expires_at > $4
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(movie_id.as_uuid())
        .bind(quality.as_str())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.map(MoviePurchase::try_from).transpose()
    }

    async fn find_entitled_purchase_any_quality(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
        now: Timestamp,
    ) -> Result<Option<MoviePurchase>, DomainError> {
        let row: Option<PurchaseRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM movie_purchases
            WHERE user_id = $1 AND movie_id = $2
              AND is_active AND access_expires_at > $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(movie_id.as_uuid())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.map(MoviePurchase::try_from).transpose()
    }

    async fn list_purchases(&self, user_id: &UserId) -> Result<Vec<MoviePurchase>, DomainError> {
        let rows: Vec<PurchaseRow> = sqlx::query_as(&format!(
            "SELECT {} FROM movie_purchases WHERE user_id = $1 ORDER BY created_at DESC",
            PURCHASE_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        rows.into_iter().map(MoviePurchase::try_from).collect()
    }

    async fn activate_subscription(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(DomainError::database)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(subscription.user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(DomainError::database)?;

        sqlx::query("UPDATE subscriptions SET is_active = FALSE WHERE user_id = $1 AND is_active")
            .bind(subscription.user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(DomainError::database)?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan_type, price, start_date, end_date,
                auto_renew, is_active, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(subscription.plan_type.as_str())
        .bind(subscription.price)
        .bind(subscription.start_date.as_datetime())
        .bind(subscription.end_date.as_datetime())
        .bind(subscription.auto_renew)
        .bind(subscription.is_active)
        .bind(subscription.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(DomainError::database)?;

        tx.commit().await.map_err(DomainError::database)?;
        Ok(())
    }

    async fn find_entitled_subscription(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM subscriptions
            WHERE user_id = $1 AND is_active AND end_date > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.map(Subscription::try_from).transpose()
    }

    async fn list_subscriptions(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn cancel_subscription(&self, id: &SubscriptionId) -> Result<Subscription, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE subscriptions SET is_active = FALSE, auto_renew = FALSE
            WHERE id = $1
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.ok_or_else(|| subscription_not_found(id))?.try_into()
    }

    async fn set_auto_renew(
        &self,
        id: &SubscriptionId,
        auto_renew: bool,
    ) -> Result<Subscription, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "UPDATE subscriptions SET auto_renew = $2 WHERE id = $1 RETURNING {}",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(auto_renew)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.ok_or_else(|| subscription_not_found(id))?.try_into()
    }

    async fn deactivate_lapsed(&self, now: Timestamp) -> Result<ReapReport, DomainError> {
        let mut tx = self.pool.begin().await.map_err(DomainError::database)?;

        let purchases = sqlx::query(
            "UPDATE movie_purchases SET is_active = FALSE \
             WHERE is_active AND access_expires_at <= $1",
        )
        .bind(now.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(DomainError::database)?;

        let subscriptions = sqlx::query(
            "UPDATE subscriptions SET is_active = FALSE WHERE is_active AND end_date <= $1",
        )
        .bind(now.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(DomainError::database)?;

        tx.commit().await.map_err(DomainError::database)?;

        Ok(ReapReport {
            purchases_deactivated: purchases.rows_affected(),
            subscriptions_deactivated: subscriptions.rows_affected(),
        })
    }
}
