//! Catalog pricing as seen by the billing engine (read-only).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Currency, MovieId};

use super::Quality;

/// Price of one movie at one quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoviePricing {
    pub movie_id: MovieId,
    /// Title, used only to describe transactions.
    pub title: String,
    pub quality: Quality,
    pub price: Decimal,
    pub currency: Currency,
    pub is_free: bool,
}

impl MoviePricing {
    /// A zero price is treated as free even if the flag was not set.
    pub fn is_free(&self) -> bool {
        self.is_free || self.price <= Decimal::ZERO
    }

    /// Transaction description for a purchase of this title.
    pub fn purchase_description(&self) -> String {
        format!("Movie purchase: {} ({})", self.title, self.quality)
    }
}
