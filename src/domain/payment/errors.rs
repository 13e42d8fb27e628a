//! Billing error taxonomy surfaced by the orchestration layer.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | InsufficientFunds | 402 |
//! | AlreadyEntitled | 409 |
//! | AlreadyActive | 409 |
//! | InvalidState | 409 |
//! | NotFound | 404 |
//! | GatewayUnavailable | 503 |
//! | SignatureError | 401 |
//! | PaymentFailed | 400 |
//! | ValidationFailed | 400 |
//! | Forbidden | 403 |
//! | Infrastructure | 500 |

use rust_decimal::Decimal;

use crate::domain::entitlement::Quality;
use crate::domain::foundation::{
    DomainError, ErrorCode, MovieId, SubscriptionId, ValidationError,
};

/// Errors reported to callers of billing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Wallet balance does not cover the debit. Never retried automatically.
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
    },

    /// An active purchase already covers this movie at this quality.
    AlreadyEntitled { movie_id: MovieId, quality: Quality },

    /// The user already holds an active subscription.
    AlreadyActive { subscription_id: SubscriptionId },

    /// Unknown transaction, movie, pricing or subscription.
    NotFound { resource: &'static str, id: String },

    /// Provider unreachable or timed out. Safe to retry with backoff.
    GatewayUnavailable(String),

    /// Webhook authenticity check failed.
    SignatureError(String),

    /// Transition attempted from a terminal state.
    InvalidState { current: String, attempted: String },

    /// Provider reported the payment as failed, or rejected it outright.
    PaymentFailed { reason: String },

    /// Caller does not own the resource.
    Forbidden(String),

    ValidationFailed { field: String, message: String },

    Infrastructure(String),
}

impl BillingError {
    pub fn insufficient_funds(available: Decimal, required: Decimal) -> Self {
        BillingError::InsufficientFunds {
            available,
            required,
        }
    }

    pub fn already_entitled(movie_id: MovieId, quality: Quality) -> Self {
        BillingError::AlreadyEntitled { movie_id, quality }
    }

    pub fn already_active(subscription_id: SubscriptionId) -> Self {
        BillingError::AlreadyActive { subscription_id }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        BillingError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn gateway_unavailable(message: impl Into<String>) -> Self {
        BillingError::GatewayUnavailable(message.into())
    }

    pub fn signature(message: impl Into<String>) -> Self {
        BillingError::SignatureError(message.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn payment_failed(reason: impl Into<String>) -> Self {
        BillingError::PaymentFailed {
            reason: reason.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        BillingError::Forbidden(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            BillingError::AlreadyEntitled { .. } => "ALREADY_ENTITLED",
            BillingError::AlreadyActive { .. } => "ALREADY_ACTIVE",
            BillingError::NotFound { .. } => "NOT_FOUND",
            BillingError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            BillingError::SignatureError(_) => "INVALID_SIGNATURE",
            BillingError::InvalidState { .. } => "INVALID_STATE",
            BillingError::PaymentFailed { .. } => "PAYMENT_FAILED",
            BillingError::Forbidden(_) => "FORBIDDEN",
            BillingError::ValidationFailed { .. } => "VALIDATION_FAILED",
            BillingError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// User-facing message.
    pub fn message(&self) -> String {
        match self {
            BillingError::InsufficientFunds {
                available,
                required,
            } => format!(
                "Insufficient wallet balance: {} available, {} required",
                available, required
            ),
            BillingError::AlreadyEntitled { quality, .. } => {
                format!("You already have access to this movie in {}", quality)
            }
            BillingError::AlreadyActive { .. } => {
                "You already have an active subscription".to_string()
            }
            BillingError::NotFound { resource, id } => format!("{} not found: {}", resource, id),
            BillingError::GatewayUnavailable(msg) => {
                format!("Payment provider unavailable: {}", msg)
            }
            BillingError::SignatureError(msg) => format!("Invalid webhook signature: {}", msg),
            BillingError::InvalidState { current, attempted } => {
                format!("Cannot {} a {} transaction", attempted, current)
            }
            BillingError::PaymentFailed { reason } => format!("Payment failed: {}", reason),
            BillingError::Forbidden(msg) => msg.clone(),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// True for transient failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::GatewayUnavailable(_) | BillingError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::TransactionNotFound => not_found_from("Transaction", &err),
            ErrorCode::PurchaseNotFound => not_found_from("Purchase", &err),
            ErrorCode::SubscriptionNotFound => not_found_from("Subscription", &err),
            ErrorCode::PricingNotFound => not_found_from("Pricing", &err),
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => BillingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "request".to_string()),
                message: err.message,
            },
            ErrorCode::InvalidStateTransition => BillingError::InvalidState {
                current: err
                    .details
                    .get("current")
                    .cloned()
                    .unwrap_or_else(|| "terminal".to_string()),
                attempted: err.message,
            },
            ErrorCode::Unauthorized | ErrorCode::Forbidden => BillingError::Forbidden(err.message),
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

fn not_found_from(resource: &'static str, err: &DomainError) -> BillingError {
    BillingError::NotFound {
        resource,
        id: err
            .details
            .get("id")
            .cloned()
            .unwrap_or_else(|| err.message.clone()),
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}
