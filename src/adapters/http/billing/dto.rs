//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the wallet,
//! payments, subscriptions, access and webhook APIs. Money is serialized as
//! decimal strings; timestamps as RFC 3339.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::handlers::{MySubscription, OwnedPurchase, VerifyPaymentResult};
use crate::application::{CheckoutOutcome, SettlementEffect};
use crate::domain::entitlement::{AccessBasis, MoviePurchase, PlanType, Quality, Subscription};
use crate::domain::foundation::{Currency, MovieId, TransactionId};
use crate::domain::ledger::Wallet;
use crate::domain::payment::{BillingError, PaymentMethod, PaymentProvider};
use crate::domain::transaction::{Transaction, TransactionKind, TransactionLookup, TransactionStatus};
use crate::ports::{PaymentInstrument, ReapReport, VerificationStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to top up the wallet through an external provider.
#[derive(Debug, Clone, Deserialize)]
pub struct TopUpRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_provider: Option<PaymentProvider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetCurrencyRequest {
    pub currency: String,
}

/// `?limit=&offset=` for listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Request to buy access to a movie at one quality.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    pub movie_id: MovieId,
    pub quality: Quality,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_provider: Option<PaymentProvider>,
}

/// Request to verify a payment. Exactly one key must be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
    #[serde(default)]
    pub provider_reference: Option<String>,
}

impl VerifyRequest {
    pub fn into_lookup(self) -> Result<TransactionLookup, BillingError> {
        let reference = self
            .provider_reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        match (self.transaction_id, reference) {
            (Some(id), None) => Ok(TransactionLookup::Id(id)),
            (None, Some(reference)) => Ok(TransactionLookup::Reference(reference)),
            _ => Err(BillingError::validation(
                "transaction_id",
                "Provide exactly one of transaction_id or provider_reference",
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub plan_type: PlanType,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_provider: Option<PaymentProvider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoRenewRequest {
    pub auto_renew: bool,
}

/// `?quality=` on the access check; 1080p when absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessParams {
    #[serde(default)]
    pub quality: Option<Quality>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct WalletResponse {
    pub user_id: String,
    pub balance: Decimal,
    pub currency: Currency,
    pub updated_at: String,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            user_id: wallet.user_id.to_string(),
            balance: wallet.balance(),
            currency: wallet.currency,
            updated_at: wallet.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub transaction_type: TransactionKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub payment_method: PaymentMethod,
    pub payment_provider: PaymentProvider,
    pub provider_reference: Option<String>,
    pub status: TransactionStatus,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            transaction_type: tx.kind,
            amount: tx.amount,
            currency: tx.currency,
            payment_method: tx.payment_method,
            payment_provider: tx.payment_provider,
            provider_reference: tx.provider_reference,
            status: tx.status,
            description: tx.description,
            created_at: tx.created_at.as_datetime().to_rfc3339(),
            updated_at: tx.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseResponse {
    pub id: String,
    pub movie_id: String,
    pub quality: Quality,
    pub price_paid: Decimal,
    pub transaction_id: Option<String>,
    pub access_expires_at: String,
    /// Stored flag AND unexpired.
    pub is_active: bool,
    pub created_at: String,
}

impl PurchaseResponse {
    fn build(purchase: MoviePurchase, is_active: bool) -> Self {
        Self {
            id: purchase.id.to_string(),
            movie_id: purchase.movie_id.to_string(),
            quality: purchase.quality,
            price_paid: purchase.price_paid,
            transaction_id: purchase.transaction_id.map(|id| id.to_string()),
            access_expires_at: purchase.access_expires_at.as_datetime().to_rfc3339(),
            is_active,
            created_at: purchase.created_at.as_datetime().to_rfc3339(),
        }
    }
}

impl From<MoviePurchase> for PurchaseResponse {
    fn from(purchase: MoviePurchase) -> Self {
        let is_active = purchase.is_active;
        Self::build(purchase, is_active)
    }
}

impl From<OwnedPurchase> for PurchaseResponse {
    fn from(owned: OwnedPurchase) -> Self {
        Self::build(owned.purchase, owned.is_active)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseListResponse {
    pub purchases: Vec<PurchaseResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub plan_type: PlanType,
    pub price: Decimal,
    pub start_date: String,
    pub end_date: String,
    pub auto_renew: bool,
    pub is_active: bool,
    pub created_at: String,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id.to_string(),
            plan_type: sub.plan_type,
            price: sub.price,
            start_date: sub.start_date.as_datetime().to_rfc3339(),
            end_date: sub.end_date.as_datetime().to_rfc3339(),
            auto_renew: sub.auto_renew,
            is_active: sub.is_active,
            created_at: sub.created_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MySubscriptionResponse {
    /// The entitled subscription, or null.
    pub subscription: Option<SubscriptionResponse>,
    pub days_remaining: Option<i64>,
    pub history: Vec<SubscriptionResponse>,
}

impl From<MySubscription> for MySubscriptionResponse {
    fn from(mine: MySubscription) -> Self {
        Self {
            subscription: mine.active.map(SubscriptionResponse::from),
            days_remaining: mine.days_remaining,
            history: mine
                .history
                .into_iter()
                .map(SubscriptionResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub name: &'static str,
    pub price: Decimal,
    pub currency: Currency,
    pub duration_days: u32,
    pub features: &'static [&'static str],
}

impl From<PlanType> for PlanResponse {
    fn from(plan: PlanType) -> Self {
        Self {
            plan_type: plan,
            name: plan.display_name(),
            price: plan.price(),
            currency: plan.currency(),
            duration_days: plan.nominal_duration_days(),
            features: plan.features(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<PlanResponse>,
}

/// Result of a checkout: settled now, or waiting on the provider.
///
/// For a free grant there is no transaction and only `purchase` is set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckoutResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionResponse>,
    /// What the client needs to complete an external payment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInstrument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase: Option<PurchaseResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<WalletResponse>,
}

impl CheckoutResponse {
    pub fn free_grant(purchase: MoviePurchase) -> Self {
        Self {
            purchase: Some(purchase.into()),
            ..Self::default()
        }
    }
}

impl From<CheckoutOutcome> for CheckoutResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        match outcome {
            CheckoutOutcome::AwaitingPayment {
                transaction,
                instrument,
            } => Self {
                transaction: Some(transaction.into()),
                payment: Some(instrument),
                ..Self::default()
            },
            CheckoutOutcome::Settled {
                transaction,
                effect,
            } => {
                let mut response = Self {
                    transaction: Some(transaction.into()),
                    ..Self::default()
                };
                match effect {
                    SettlementEffect::Credited(wallet) => response.wallet = Some(wallet.into()),
                    SettlementEffect::Purchased(purchase) => {
                        response.purchase = Some(purchase.into())
                    }
                    SettlementEffect::Subscribed(sub) => response.subscription = Some(sub.into()),
                    SettlementEffect::AlreadyGranted
                    | SettlementEffect::Skipped
                    | SettlementEffect::Unapplied { .. } => {}
                }
                response
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub status: VerificationStatus,
    pub transaction: TransactionResponse,
}

impl From<VerifyPaymentResult> for VerifyResponse {
    fn from(result: VerifyPaymentResult) -> Self {
        Self {
            status: result.status,
            transaction: result.transaction.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessGrantedResponse {
    pub has_access: bool,
    pub movie_id: String,
    pub quality: Quality,
    pub basis: AccessBasis,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessDeniedResponse {
    pub error: &'static str,
    pub requires_purchase: bool,
    pub movie_id: String,
    pub quality: Quality,
}

/// Acknowledgement body for webhook deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReapResponse {
    pub purchases_deactivated: u64,
    pub subscriptions_deactivated: u64,
}

impl From<ReapReport> for ReapResponse {
    fn from(report: ReapReport) -> Self {
        Self {
            purchases_deactivated: report.purchases_deactivated,
            subscriptions_deactivated: report.subscriptions_deactivated,
        }
    }
}

/// Standard error response format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}
