//! Subscription plans and subscription rows.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Currency, SubscriptionId, Timestamp, UserId, ValidationError};

/// Billing plan. Subscriptions bypass per-title pricing while active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Monthly,
    Yearly,
}

impl PlanType {
    pub const ALL: [PlanType; 2] = [PlanType::Monthly, PlanType::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::Yearly => "yearly",
        }
    }

    /// List price, always in USD.
    pub fn price(&self) -> Decimal {
        match self {
            PlanType::Monthly => Decimal::new(999, 2),
            PlanType::Yearly => Decimal::new(9999, 2),
        }
    }

    pub fn currency(&self) -> Currency {
        Currency::Usd
    }

    /// Advertised duration. Actual end dates use calendar arithmetic.
    pub fn nominal_duration_days(&self) -> u32 {
        match self {
            PlanType::Monthly => 30,
            PlanType::Yearly => 365,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlanType::Monthly => "Monthly Plan",
            PlanType::Yearly => "Yearly Plan",
        }
    }

    pub fn features(&self) -> &'static [&'static str] {
        match self {
            PlanType::Monthly => &[
                "Unlimited access to all movies",
                "HD and 4K quality",
                "Watch on multiple devices",
                "Cancel anytime",
            ],
            PlanType::Yearly => &[
                "Unlimited access to all movies",
                "HD and 4K quality",
                "Watch on multiple devices",
                "Two months free compared to monthly",
            ],
        }
    }

    /// End of a period starting at `start`: +1 calendar month or +1 calendar year.
    pub fn end_date_from(&self, start: Timestamp) -> Timestamp {
        match self {
            PlanType::Monthly => start.add_calendar_months(1),
            PlanType::Yearly => start.add_calendar_months(12),
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(PlanType::Monthly),
            "yearly" => Ok(PlanType::Yearly),
            other => Err(ValidationError::invalid_format(
                "plan_type",
                format!("expected monthly or yearly, got '{}'", other),
            )),
        }
    }
}

/// One subscription period. At most one row per user is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub price: Decimal,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub auto_renew: bool,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl Subscription {
    /// Starts a new active period at `now`, renewing automatically by default.
    pub fn start(user_id: UserId, plan_type: PlanType, price: Decimal, now: Timestamp) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            plan_type,
            price,
            start_date: now,
            end_date: plan_type.end_date_from(now),
            auto_renew: true,
            is_active: true,
            created_at: now,
        }
    }

    /// Active flag AND unexpired.
    pub fn is_entitled_at(&self, now: Timestamp) -> bool {
        self.is_active && self.end_date.is_after(&now)
    }

    pub fn is_lapsed_at(&self, now: Timestamp) -> bool {
        self.is_active && !self.end_date.is_after(&now)
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Stops access immediately and disables renewal.
    pub fn cancel(&mut self) {
        self.is_active = false;
        self.auto_renew = false;
    }

    /// Days of access left, rounded down. Zero once lapsed.
    pub fn days_remaining(&self, now: Timestamp) -> i64 {
        if !self.is_entitled_at(now) {
            return 0;
        }
        self.end_date.duration_since(&now).num_days()
    }
}
