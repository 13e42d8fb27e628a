//! Axum router configuration for billing endpoints.
//!
//! Every route expects `auth_middleware` upstream. Handlers enforce auth
//! through their extractors, so public routes and webhooks live in the same tree.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    cancel_subscription, check_movie_access, flutterwave_webhook, get_wallet, list_plans,
    list_purchases, list_transactions, my_subscription, purchase_movie, run_reaper,
    set_auto_renew, set_wallet_currency, stripe_webhook, subscribe, top_up_wallet,
    verify_payment, BillingAppState,
};

/// Wallet routes, mounted at `/wallet`.
pub fn wallet_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/", get(get_wallet))
        .route("/topup", post(top_up_wallet))
        .route("/currency", put(set_wallet_currency))
        .route("/transactions", get(list_transactions))
}

/// Payment routes, mounted at `/payments`.
pub fn payment_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/purchase", post(purchase_movie))
        .route("/verify", post(verify_payment))
        .route("/purchases", get(list_purchases))
}

/// Subscription routes, mounted at `/subscriptions`.
///
/// `/plans` is public.
pub fn subscription_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/subscribe", post(subscribe))
        .route("/me", get(my_subscription))
        .route("/:id/cancel", put(cancel_subscription))
        .route("/:id/auto-renew", put(set_auto_renew))
}

/// Movie access routes, mounted at `/movies`.
pub fn access_routes() -> Router<BillingAppState> {
    Router::new().route("/:movie_id/access", get(check_movie_access))
}

/// Provider callbacks, mounted at `/webhooks`.
///
/// No bearer auth; each gateway authenticates its own deliveries.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/stripe", post(stripe_webhook))
        .route("/flutterwave", post(flutterwave_webhook))
}

/// Operator routes, mounted at `/admin`.
pub fn admin_routes() -> Router<BillingAppState> {
    Router::new().route("/reaper/run", post(run_reaper))
}

/// Create the complete billing router, suitable for mounting at `/api`.
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", billing_router())
///     .layer(middleware::from_fn_with_state(authenticator, auth_middleware))
///     .with_state(state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/wallet", wallet_routes())
        .nest("/payments", payment_routes())
        .nest("/subscriptions", subscription_routes())
        .nest("/movies", access_routes())
        .nest("/webhooks", webhook_routes())
        .nest("/admin", admin_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::adapters::memory::{
        InMemoryEntitlementStore, InMemoryPricingCatalog, InMemoryTransactionLog,
        InMemoryWalletLedger,
    };
    use crate::adapters::MockPaymentGateway;
    use crate::domain::payment::PaymentProvider;
    use crate::ports::GatewayRegistry;

    fn test_state() -> BillingAppState {
        BillingAppState {
            ledger: Arc::new(InMemoryWalletLedger::new()),
            transactions: Arc::new(InMemoryTransactionLog::new()),
            entitlements: Arc::new(InMemoryEntitlementStore::new()),
            pricing: Arc::new(InMemoryPricingCatalog::new()),
            gateways: GatewayRegistry::new(PaymentProvider::Stripe)
                .with_gateway(Arc::new(MockPaymentGateway::new(PaymentProvider::Stripe))),
            frontend_url: "https://app.example.com/".to_string(),
            reaper_interval: Duration::from_secs(300),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Router Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn billing_router_creates_combined_router() {
        let _: Router<()> = billing_router().with_state(test_state());
    }

    #[test]
    fn callback_url_trims_trailing_slash() {
        assert_eq!(
            test_state().callback_url("payment"),
            "https://app.example.com/payment/callback"
        );
    }
}
