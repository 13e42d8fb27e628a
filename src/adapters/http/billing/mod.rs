//! HTTP adapter for billing endpoints.
//!
//! - `GET /api/wallet`, `POST /api/wallet/topup`, `PUT /api/wallet/currency`,
//!   `GET /api/wallet/transactions`
//! - `POST /api/payments/purchase`, `POST /api/payments/verify`,
//!   `GET /api/payments/purchases`
//! - `GET /api/subscriptions/plans`, `POST /api/subscriptions/subscribe`,
//!   `GET /api/subscriptions/me`, `PUT /api/subscriptions/:id/cancel`,
//!   `PUT /api/subscriptions/:id/auto-renew`
//! - `GET /api/movies/:movie_id/access`
//! - `POST /api/webhooks/stripe`, `POST /api/webhooks/flutterwave`
//! - `POST /api/admin/reaper/run`

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingApiError, BillingAppState};
pub use routes::billing_router;
