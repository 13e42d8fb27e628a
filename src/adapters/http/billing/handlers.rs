//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::{RequireAdmin, RequireAuth};
use crate::application::handlers::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, GetMySubscriptionHandler,
    GetMySubscriptionQuery, GetWalletHandler, GetWalletQuery, HandleWebhookCommand,
    HandleWebhookHandler, ListPurchasesHandler, ListPurchasesQuery, PurchaseMovieCommand,
    PurchaseMovieHandler, PurchaseMovieResult, SetAutoRenewCommand, SetAutoRenewHandler,
    SetCurrencyCommand, SetCurrencyHandler, SubscribeCommand, SubscribeHandler,
    TopUpWalletCommand, TopUpWalletHandler, TransactionHistoryHandler, TransactionHistoryQuery,
    VerifyPaymentCommand, VerifyPaymentHandler,
};
use crate::application::{AccessResolver, CheckoutService, ConfirmationProcessor, ExpiryReaper};
use crate::domain::entitlement::{AccessDecision, PlanType};
use crate::domain::foundation::{MovieId, SubscriptionId};
use crate::domain::payment::{BillingError, PaymentProvider, WebhookError};
use crate::ports::{
    EntitlementStore, GatewayRegistry, Pagination, PricingCatalog, TransactionLog, WalletLedger,
};

use super::dto::{
    AccessDeniedResponse, AccessGrantedResponse, AccessParams, AutoRenewRequest,
    CheckoutResponse, ErrorResponse, MySubscriptionResponse, PageParams, PlanResponse,
    PlansResponse, PurchaseListResponse, PurchaseRequest, PurchaseResponse, ReapResponse,
    SetCurrencyRequest, SubscribeRequest, SubscriptionResponse, TopUpRequest,
    TransactionListResponse, TransactionResponse, VerifyRequest, VerifyResponse, WalletResponse,
    WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; every dependency is Arc-wrapped. Services and
/// handlers are built on demand from it.
#[derive(Clone)]
pub struct BillingAppState {
    pub ledger: Arc<dyn WalletLedger>,
    pub transactions: Arc<dyn TransactionLog>,
    pub entitlements: Arc<dyn EntitlementStore>,
    pub pricing: Arc<dyn PricingCatalog>,
    pub gateways: GatewayRegistry,
    /// Base URL of the web client, used for provider redirect targets.
    pub frontend_url: String,
    pub reaper_interval: Duration,
}

impl BillingAppState {
    pub fn processor(&self) -> Arc<ConfirmationProcessor> {
        Arc::new(ConfirmationProcessor::new(
            self.transactions.clone(),
            self.ledger.clone(),
            self.entitlements.clone(),
        ))
    }

    pub fn checkout(&self) -> Arc<CheckoutService> {
        Arc::new(CheckoutService::new(
            self.ledger.clone(),
            self.transactions.clone(),
            self.gateways.clone(),
            self.processor(),
        ))
    }

    pub fn access_resolver(&self) -> AccessResolver {
        AccessResolver::new(self.entitlements.clone(), self.pricing.clone())
    }

    pub fn reaper(&self) -> ExpiryReaper {
        ExpiryReaper::new(self.entitlements.clone(), self.reaper_interval)
    }

    /// `{frontend}/{flow}/callback`
    pub fn callback_url(&self, flow: &str) -> String {
        format!("{}/{}/callback", self.frontend_url.trim_end_matches('/'), flow)
    }

    pub fn get_wallet_handler(&self) -> GetWalletHandler {
        GetWalletHandler::new(self.ledger.clone())
    }

    pub fn top_up_handler(&self) -> TopUpWalletHandler {
        TopUpWalletHandler::new(self.ledger.clone(), self.checkout())
    }

    pub fn set_currency_handler(&self) -> SetCurrencyHandler {
        SetCurrencyHandler::new(self.ledger.clone())
    }

    pub fn transaction_history_handler(&self) -> TransactionHistoryHandler {
        TransactionHistoryHandler::new(self.transactions.clone())
    }

    pub fn purchase_movie_handler(&self) -> PurchaseMovieHandler {
        PurchaseMovieHandler::new(
            self.pricing.clone(),
            self.entitlements.clone(),
            self.checkout(),
        )
    }

    pub fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(
            self.transactions.clone(),
            self.gateways.clone(),
            self.processor(),
        )
    }

    pub fn list_purchases_handler(&self) -> ListPurchasesHandler {
        ListPurchasesHandler::new(self.entitlements.clone())
    }

    pub fn subscribe_handler(&self) -> SubscribeHandler {
        SubscribeHandler::new(self.entitlements.clone(), self.checkout())
    }

    pub fn my_subscription_handler(&self) -> GetMySubscriptionHandler {
        GetMySubscriptionHandler::new(self.entitlements.clone())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.entitlements.clone())
    }

    pub fn set_auto_renew_handler(&self) -> SetAutoRenewHandler {
        SetAutoRenewHandler::new(self.entitlements.clone())
    }

    pub fn webhook_handler(&self) -> HandleWebhookHandler {
        HandleWebhookHandler::new(self.gateways.clone(), self.processor())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Wallet
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/wallet - Balance and currency, created on first read
pub async fn get_wallet(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let wallet = state
        .get_wallet_handler()
        .handle(GetWalletQuery { user_id: user.id })
        .await?;

    Ok(Json(WalletResponse::from(wallet)))
}

/// POST /api/wallet/topup - Start an external top-up
pub async fn top_up_wallet(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<TopUpRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = TopUpWalletCommand {
        user,
        amount: request.amount,
        payment_method: request.payment_method,
        payment_provider: request.payment_provider,
        redirect_url: state.callback_url("wallet"),
    };

    let outcome = state.top_up_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(outcome))))
}

/// PUT /api/wallet/currency - Change the display currency
pub async fn set_wallet_currency(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<SetCurrencyRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = SetCurrencyCommand {
        user_id: user.id,
        currency: request.currency,
    };

    let wallet = state.set_currency_handler().handle(cmd).await?;

    Ok(Json(WalletResponse::from(wallet)))
}

/// GET /api/wallet/transactions - Newest first, paged
pub async fn list_transactions(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, BillingApiError> {
    let page = Pagination::new(params.limit, params.offset);
    let transactions = state
        .transaction_history_handler()
        .handle(TransactionHistoryQuery {
            user_id: user.id,
            page,
        })
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: transactions
            .into_iter()
            .map(TransactionResponse::from)
            .collect(),
        limit: page.limit,
        offset: page.offset,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Payments
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments/purchase - Buy access to a movie at one quality
pub async fn purchase_movie(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = PurchaseMovieCommand {
        user,
        movie_id: request.movie_id,
        quality: request.quality,
        payment_method: request.payment_method,
        payment_provider: request.payment_provider,
        redirect_url: state.callback_url("payment"),
    };

    let response = match state.purchase_movie_handler().handle(cmd).await? {
        PurchaseMovieResult::FreeGrant(purchase) => CheckoutResponse::free_grant(purchase),
        PurchaseMovieResult::Checkout(outcome) => CheckoutResponse::from(outcome),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/payments/verify - Ask the provider and settle if it is done
pub async fn verify_payment(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<VerifyRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = VerifyPaymentCommand {
        user_id: user.id,
        lookup: request.into_lookup()?,
    };

    let result = state.verify_payment_handler().handle(cmd).await?;

    Ok(Json(VerifyResponse::from(result)))
}

/// GET /api/payments/purchases - The caller's purchases with effective activity
pub async fn list_purchases(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let purchases = state
        .list_purchases_handler()
        .handle(ListPurchasesQuery { user_id: user.id })
        .await?;

    Ok(Json(PurchaseListResponse {
        purchases: purchases.into_iter().map(PurchaseResponse::from).collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/subscriptions/plans - Public plan catalog
pub async fn list_plans() -> impl IntoResponse {
    Json(PlansResponse {
        plans: [PlanType::Monthly, PlanType::Yearly]
            .into_iter()
            .map(PlanResponse::from)
            .collect(),
    })
}

/// POST /api/subscriptions/subscribe - Start a subscription
pub async fn subscribe(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = SubscribeCommand {
        user,
        plan_type: request.plan_type,
        payment_method: request.payment_method,
        payment_provider: request.payment_provider,
        redirect_url: state.callback_url("subscription"),
    };

    let outcome = state.subscribe_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(outcome))))
}

/// GET /api/subscriptions/me - Active subscription plus history
pub async fn my_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let mine = state
        .my_subscription_handler()
        .handle(GetMySubscriptionQuery { user_id: user.id })
        .await?;

    Ok(Json(MySubscriptionResponse::from(mine)))
}

/// PUT /api/subscriptions/{id}/cancel - Owner-only cancel
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Path(subscription_id): Path<SubscriptionId>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = CancelSubscriptionCommand {
        user_id: user.id,
        subscription_id,
    };

    let subscription = state.cancel_subscription_handler().handle(cmd).await?;

    Ok(Json(SubscriptionResponse::from(subscription)))
}

/// PUT /api/subscriptions/{id}/auto-renew - Owner-only toggle
pub async fn set_auto_renew(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Path(subscription_id): Path<SubscriptionId>,
    Json(request): Json<AutoRenewRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = SetAutoRenewCommand {
        user_id: user.id,
        subscription_id,
        auto_renew: request.auto_renew,
    };

    let subscription = state.set_auto_renew_handler().handle(cmd).await?;

    Ok(Json(SubscriptionResponse::from(subscription)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Access
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/movies/{movie_id}/access - 200 with the basis, or 403 requires_purchase
pub async fn check_movie_access(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Path(movie_id): Path<MovieId>,
    Query(params): Query<AccessParams>,
) -> Result<Response, BillingApiError> {
    let quality = params.quality.unwrap_or_default();
    let decision = state
        .access_resolver()
        .resolve(&user.id, &movie_id, quality)
        .await?;

    let response = match decision {
        AccessDecision::Granted(basis) => Json(AccessGrantedResponse {
            has_access: true,
            movie_id: movie_id.to_string(),
            quality,
            basis,
        })
        .into_response(),
        AccessDecision::Denied(reason) => (
            StatusCode::FORBIDDEN,
            Json(AccessDeniedResponse {
                error: reason.user_message(),
                requires_purchase: true,
                movie_id: movie_id.to_string(),
                quality,
            }),
        )
            .into_response(),
    };

    Ok(response)
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhooks (no auth, signature verified)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    receive_webhook(&state, PaymentProvider::Stripe, "Stripe-Signature", &headers, body).await
}

/// POST /api/webhooks/flutterwave
pub async fn flutterwave_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    receive_webhook(&state, PaymentProvider::Flutterwave, "verif-hash", &headers, body).await
}

async fn receive_webhook(
    state: &BillingAppState,
    provider: PaymentProvider,
    signature_header: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(signature_header)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandleWebhookCommand {
        provider,
        payload: body.to_vec(),
        signature,
    };

    match state.webhook_handler().handle(cmd).await {
        Ok(_) => (StatusCode::OK, Json(WebhookAck::received())).into_response(),
        Err(e) => webhook_error_response(provider, e),
    }
}

fn webhook_error_response(provider: PaymentProvider, err: WebhookError) -> Response {
    if err.is_acknowledged() {
        tracing::info!(provider = %provider, reason = %err, "Webhook acknowledged without action");
        return (StatusCode::OK, Json(WebhookAck::received())).into_response();
    }

    let status = err.status_code();
    let code = if err.is_security_event() {
        "INVALID_SIGNATURE"
    } else if err.is_retryable() {
        "WEBHOOK_RETRY"
    } else {
        "WEBHOOK_REJECTED"
    };
    (status, Json(ErrorResponse::new(code, err.to_string()))).into_response()
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admin/reaper/run - One expiry sweep, admin only
pub async fn run_reaper(
    State(state): State<BillingAppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse, BillingApiError> {
    tracing::info!(user_id = %admin.id, "Manual expiry sweep requested");
    let report = state.reaper().run_once().await?;
    Ok(Json(ReapResponse::from(report)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl BillingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            BillingError::AlreadyEntitled { .. }
            | BillingError::AlreadyActive { .. }
            | BillingError::InvalidState { .. } => StatusCode::CONFLICT,
            BillingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BillingError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BillingError::SignatureError(_) => StatusCode::UNAUTHORIZED,
            BillingError::PaymentFailed { .. } | BillingError::ValidationFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            BillingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BillingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "Request failed");
        }

        let body = match &self.0 {
            BillingError::InsufficientFunds {
                available,
                required,
            } => ErrorResponse::with_details(
                self.0.code(),
                self.0.message(),
                serde_json::json!({
                    "available": available,
                    "required": required,
                }),
            ),
            // Internal details stay in the log.
            BillingError::Infrastructure(_) => {
                ErrorResponse::new(self.0.code(), "Internal server error")
            }
            other => ErrorResponse::new(other.code(), other.message()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::Quality;
    use rust_decimal_macros::dec;

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn billing_errors_map_to_expected_statuses() {
        let cases = [
            (
                BillingError::insufficient_funds(dec!(1), dec!(2)),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                BillingError::already_entitled(MovieId::new(), Quality::Hd720),
                StatusCode::CONFLICT,
            ),
            (
                BillingError::already_active(SubscriptionId::new()),
                StatusCode::CONFLICT,
            ),
            (BillingError::not_found("Pricing", "x"), StatusCode::NOT_FOUND),
            (
                BillingError::gateway_unavailable("timeout"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (BillingError::signature("bad"), StatusCode::UNAUTHORIZED),
            (BillingError::payment_failed("declined"), StatusCode::BAD_REQUEST),
            (BillingError::validation("amount", "bad"), StatusCode::BAD_REQUEST),
            (BillingError::forbidden("no"), StatusCode::FORBIDDEN),
            (
                BillingError::infrastructure("db down"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(BillingApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn webhook_acknowledged_errors_answer_200() {
        let ignored = webhook_error_response(
            PaymentProvider::Stripe,
            WebhookError::Ignored("customer.created".to_string()),
        );
        let unknown = webhook_error_response(
            PaymentProvider::Flutterwave,
            WebhookError::UnknownReference("viewesta_1_x".to_string()),
        );

        assert_eq!(ignored.status(), StatusCode::OK);
        assert_eq!(unknown.status(), StatusCode::OK);
    }

    #[test]
    fn webhook_signature_failure_answers_401() {
        let response =
            webhook_error_response(PaymentProvider::Stripe, WebhookError::InvalidSignature);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn webhook_processing_failure_asks_for_redelivery() {
        let response = webhook_error_response(
            PaymentProvider::Stripe,
            WebhookError::Processing("store down".to_string()),
        );
        assert!(response.status().is_server_error());
    }
}
