//! Authenticator port: caller identity and role.
//!
//! Registration and profiles live elsewhere. The billing engine only needs to
//! turn a bearer token into an [`AuthenticatedUser`].
//!
//! # Contract
//!
//! Implementations must:
//! - Validate the token signature and expiry
//! - Return `AuthError::InvalidToken` for malformed or badly signed tokens
//! - Return `AuthError::TokenExpired` for expired tokens
//! - Return `AuthError::ServiceUnavailable` for transient errors

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Validates a bearer token (without the `Bearer ` prefix).
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
