//! PostgreSQL implementation of PricingCatalog.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entitlement::{MoviePricing, Quality};
use crate::domain::foundation::{DomainError, MovieId};
use crate::ports::PricingCatalog;

use super::corrupt;

pub struct PostgresPricingCatalog {
    pool: PgPool,
}

impl PostgresPricingCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PricingRow {
    movie_id: Uuid,
    title: String,
    quality: String,
    price: Decimal,
    currency: String,
    is_free: bool,
}

impl TryFrom<PricingRow> for MoviePricing {
    type Error = DomainError;

    fn try_from(row: PricingRow) -> Result<Self, Self::Error> {
        Ok(MoviePricing {
            movie_id: MovieId::from_uuid(row.movie_id),
            title: row.title,
            quality: row
                .quality
                .parse()
                .map_err(|e| corrupt("movie_pricing.quality", e))?,
            price: row.price,
            currency: row
                .currency
                .parse()
                .map_err(|e| corrupt("movie_pricing.currency", e))?,
            is_free: row.is_free,
        })
    }
}

#[async_trait]
impl PricingCatalog for PostgresPricingCatalog {
    async fn find_pricing(
        &self,
        movie_id: &MovieId,
        quality: Quality,
    ) -> Result<Option<MoviePricing>, DomainError> {
        let row: Option<PricingRow> = sqlx::query_as(
            r#"
            SELECT movie_id, title, quality, price, currency, is_free
            FROM movie_pricing
            WHERE movie_id = $1 AND quality = $2
            "#,
        )
        .bind(movie_id.as_uuid())
        .bind(quality.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.map(MoviePricing::try_from).transpose()
    }
}
