//! Movie purchase: a time-bounded grant to watch one title at one quality.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MovieId, PurchaseId, Timestamp, TransactionId, UserId};

use super::expiry::AccessPolicy;
use super::Quality;

/// One issued grant. Several historical rows may exist per (user, movie, quality);
/// only unexpired active ones entitle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoviePurchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// `None` for free grants, which have no backing transaction.
    pub transaction_id: Option<TransactionId>,
    pub quality: Quality,
    pub price_paid: Decimal,
    pub access_expires_at: Timestamp,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl MoviePurchase {
    /// Grant backed by a completed transaction.
    pub fn paid(
        user_id: UserId,
        movie_id: MovieId,
        transaction_id: TransactionId,
        quality: Quality,
        price_paid: Decimal,
        now: Timestamp,
    ) -> Self {
        Self::issue(
            user_id,
            movie_id,
            Some(transaction_id),
            quality,
            price_paid,
            AccessPolicy::PaidRental,
            now,
        )
    }

    /// Grant for content priced as free. No transaction, zero price.
    pub fn free_grant(user_id: UserId, movie_id: MovieId, quality: Quality, now: Timestamp) -> Self {
        Self::issue(
            user_id,
            movie_id,
            None,
            quality,
            Decimal::ZERO,
            AccessPolicy::FreeGrant,
            now,
        )
    }

    fn issue(
        user_id: UserId,
        movie_id: MovieId,
        transaction_id: Option<TransactionId>,
        quality: Quality,
        price_paid: Decimal,
        policy: AccessPolicy,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PurchaseId::new(),
            user_id,
            movie_id,
            transaction_id,
            quality,
            price_paid,
            access_expires_at: policy.expires_at(now),
            is_active: true,
            created_at: now,
        }
    }

    /// Active flag AND unexpired. The flag alone is not trusted.
    pub fn is_entitled_at(&self, now: Timestamp) -> bool {
        self.is_active && self.access_expires_at.is_after(&now)
    }

    /// Returns true if the reaper should clear this row's active flag.
    pub fn is_lapsed_at(&self, now: Timestamp) -> bool {
        self.is_active && !self.access_expires_at.is_after(&now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[test]
    fn paid_purchase_expires_after_seven_days() {
        let now = Timestamp::now();
        let tx = TransactionId::new();
        let p = MoviePurchase::paid(user(), MovieId::new(), tx, Quality::Hd720, dec!(4.99), now);

        assert_eq!(p.transaction_id, Some(tx));
        assert_eq!(p.access_expires_at, now.add_days(7));
        assert!(p.is_active);
    }

    #[test]
    fn free_grant_has_no_transaction_and_zero_price() {
        let now = Timestamp::now();
        let p = MoviePurchase::free_grant(user(), MovieId::new(), Quality::Sd480, now);

        assert_eq!(p.transaction_id, None);
        assert_eq!(p.price_paid, Decimal::ZERO);
        assert_eq!(p.access_expires_at, now.add_days(365));
    }

    #[test]
    fn entitlement_rechecks_expiry_even_when_flag_is_set() {
        let issued = Timestamp::now().add_days(-8);
        let p = MoviePurchase::paid(
            user(),
            MovieId::new(),
            TransactionId::new(),
            Quality::Hd1080,
            dec!(9.99),
            issued,
        );

        assert!(p.is_active);
        assert!(!p.is_entitled_at(Timestamp::now()));
        assert!(p.is_lapsed_at(Timestamp::now()));
    }

    #[test]
    fn expiry_instant_itself_is_not_entitled() {
        let now = Timestamp::now();
        let p = MoviePurchase::free_grant(user(), MovieId::new(), Quality::Sd480, now);
        let at_expiry = p.access_expires_at;

        assert!(p.is_entitled_at(at_expiry.plus_secs(-1)));
        assert!(!p.is_entitled_at(at_expiry));
    }

    #[test]
    fn deactivated_purchase_is_not_entitled() {
        let now = Timestamp::now();
        let mut p = MoviePurchase::free_grant(user(), MovieId::new(), Quality::Sd480, now);
        p.is_active = false;

        assert!(!p.is_entitled_at(now));
        assert!(!p.is_lapsed_at(now.add_days(400)));
    }
}
