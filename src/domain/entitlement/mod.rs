//! Entitlement module - time-bounded grants of access.
//!
//! A user is entitled to a title through one of three sources, checked in
//! this order: an active subscription, free pricing, or a movie purchase.
//! "Active" always means the flag is set AND the expiry is in the future.

mod access;
mod expiry;
mod pricing;
mod purchase;
mod quality;
mod subscription;

pub use access::{AccessBasis, AccessDecision, AccessDeniedReason};
pub use expiry::{AccessPolicy, FREE_GRANT_ACCESS_DAYS, PAID_ACCESS_DAYS};
pub use pricing::MoviePricing;
pub use purchase::MoviePurchase;
pub use quality::Quality;
pub use subscription::{PlanType, Subscription};
