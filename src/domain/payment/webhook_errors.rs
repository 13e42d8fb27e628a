//! Webhook error types for provider callbacks.
//!
//! Status codes drive provider retry behavior:
//! - 2xx: acknowledged, no retry
//! - 4xx: rejected, no retry
//! - 5xx: provider will redeliver

use http::StatusCode;
use thiserror::Error;

/// Errors that occur while handling an inbound webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature header absent.
    #[error("Missing signature")]
    MissingSignature,

    /// Signature or shared hash did not match.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp older than the accepted window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Reference does not match any transaction this engine created.
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// Event type the engine does not act on.
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Webhook arrived for a provider with no credentials configured.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(&'static str),

    /// State transition or side effect failed after verification.
    #[error("Processing error: {0}")]
    Processing(String),
}

impl WebhookError {
    /// True if the provider should redeliver this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Processing(_) | WebhookError::ProviderNotConfigured(_)
        )
    }

    /// True for conditions acknowledged to the provider as success.
    pub fn is_acknowledged(&self) -> bool {
        self.status_code().is_success()
    }

    /// True for authenticity failures, which are logged as security events.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange => StatusCode::UNAUTHORIZED,

            WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            WebhookError::UnknownReference(_) | WebhookError::Ignored(_) => StatusCode::OK,

            WebhookError::ProviderNotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,

            WebhookError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticity_failures_are_unauthorized_and_final() {
        for err in [
            WebhookError::MissingSignature,
            WebhookError::InvalidSignature,
            WebhookError::TimestampOutOfRange,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert!(!err.is_retryable());
            assert!(err.is_security_event());
        }
    }

    #[test]
    fn malformed_payloads_are_bad_requests() {
        assert_eq!(
            WebhookError::ParseError("eof".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::MissingField("tx_ref").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn benign_conditions_are_acknowledged() {
        assert!(WebhookError::Ignored("customer.created".into()).is_acknowledged());
        assert!(WebhookError::UnknownReference("ref".into()).is_acknowledged());
        assert!(!WebhookError::InvalidSignature.is_acknowledged());
    }

    #[test]
    fn processing_failures_ask_for_redelivery() {
        let err = WebhookError::Processing("db down".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
        assert!(!err.is_security_event());
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(WebhookError::InvalidSignature.to_string(), "Invalid signature");
        assert_eq!(
            WebhookError::MissingField("tx_ref").to_string(),
            "Missing field: tx_ref"
        );
    }
}
