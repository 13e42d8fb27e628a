//! HTTP adapters - REST API implementations.
//!
//! `api_router` assembles the billing routes under `/api` behind the bearer
//! auth middleware. Transport layers (tracing, CORS, timeouts, request ids)
//! are added by the binary.

pub mod billing;
pub mod middleware;

use axum::{middleware::from_fn_with_state, routing::get, Router};

pub use billing::{billing_router, BillingApiError, BillingAppState};
pub use middleware::{auth_middleware, AuthState};

/// The full API with auth applied and state bound.
pub fn api_router(state: BillingAppState, authenticator: AuthState) -> Router {
    Router::new()
        .nest("/api", billing_router())
        .layer(from_fn_with_state(authenticator, auth_middleware))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
