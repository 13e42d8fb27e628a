//! Pricing catalog port (read-only).
//!
//! The catalog is owned by another service; the billing engine only reads
//! per-quality prices and free flags.

use async_trait::async_trait;

use crate::domain::entitlement::{MoviePricing, Quality};
use crate::domain::foundation::{DomainError, MovieId};

#[async_trait]
pub trait PricingCatalog: Send + Sync {
    /// Price of `movie_id` at `quality`, or `None` if the catalog has no row.
    async fn find_pricing(
        &self,
        movie_id: &MovieId,
        quality: Quality,
    ) -> Result<Option<MoviePricing>, DomainError>;
}
