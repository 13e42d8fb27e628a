//! Access windows for movie purchases.
//!
//! Paid rentals and free grants run on separate clocks. They are kept as two
//! named policies rather than one parameterized rule.

use crate::domain::foundation::Timestamp;

/// Days of access bought by a paid purchase.
pub const PAID_ACCESS_DAYS: i64 = 7;

/// Days of access issued for free-priced content.
pub const FREE_GRANT_ACCESS_DAYS: i64 = 365;

/// Which access window a purchase row was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    PaidRental,
    FreeGrant,
}

impl AccessPolicy {
    pub fn days(&self) -> i64 {
        match self {
            AccessPolicy::PaidRental => PAID_ACCESS_DAYS,
            AccessPolicy::FreeGrant => FREE_GRANT_ACCESS_DAYS,
        }
    }

    /// Expiry instant for a grant issued at `issued_at`.
    pub fn expires_at(&self, issued_at: Timestamp) -> Timestamp {
        issued_at.add_days(self.days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies_use_distinct_windows() {
        let now = Timestamp::now();
        assert_eq!(AccessPolicy::PaidRental.expires_at(now), now.add_days(7));
        assert_eq!(AccessPolicy::FreeGrant.expires_at(now), now.add_days(365));
    }
}
