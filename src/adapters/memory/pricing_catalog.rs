//! In-memory pricing catalog.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entitlement::{MoviePricing, Quality};
use crate::domain::foundation::{DomainError, MovieId};
use crate::ports::PricingCatalog;

#[derive(Debug, Default, Clone)]
pub struct InMemoryPricingCatalog {
    prices: Arc<RwLock<HashMap<(MovieId, Quality), MoviePricing>>>,
}

impl InMemoryPricingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, pricing: MoviePricing) {
        self.prices
            .write()
            .await
            .insert((pricing.movie_id, pricing.quality), pricing);
    }
}

#[async_trait]
impl PricingCatalog for InMemoryPricingCatalog {
    async fn find_pricing(
        &self,
        movie_id: &MovieId,
        quality: Quality,
    ) -> Result<Option<MoviePricing>, DomainError> {
        Ok(self.prices.read().await.get(&(*movie_id, quality)).cloned())
    }
}
