//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `auth_middleware` - Layer that validates Bearer tokens and injects the caller into extensions
//! - `RequireAuth` - Extractor that requires authentication
//! - `RequireAdmin` - Extractor that requires the admin role
//!
//! # Architecture
//!
//! The middleware depends only on the `Authenticator` port. Whether tokens are
//! HS256 JWTs or a mock table in tests, the middleware doesn't change.
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedUser into extensions
//!                                      ↓
//!                              Handler → RequireAuth extractor reads from extensions
//! ```
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get, middleware};
//! use std::sync::Arc;
//!
//! let authenticator: Arc<dyn Authenticator> = Arc::new(MockAuthenticator::new());
//!
//! let app = Router::new()
//!     .route("/api/wallet", get(get_wallet))
//!     .layer(middleware::from_fn_with_state(authenticator.clone(), auth_middleware));
//!
//! async fn get_wallet(RequireAuth(user): RequireAuth) -> String {
//!     format!("Wallet of {}", user.email)
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::Authenticator;

/// Auth middleware state - wraps the authenticator.
pub type AuthState = Arc<dyn Authenticator>;

/// Authentication middleware that validates Bearer tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the `Authenticator` port
/// 3. On success, injects `AuthenticatedUser` into request extensions
/// 4. On missing token, continues without injecting (public routes and webhooks)
/// 5. On invalid token, returns 401 Unauthorized
pub async fn auth_middleware(
    State(authenticator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return next.run(request).await;
    };

    match authenticator.authenticate(token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            let (status, message) = match &e {
                AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
                AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
                AuthError::ServiceUnavailable(msg) => {
                    tracing::error!("Auth service unavailable: {}", msg);
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Authentication service unavailable",
                    )
                }
                AuthError::InsufficientPermissions => {
                    (StatusCode::FORBIDDEN, "Insufficient permissions")
                }
            };

            (
                status,
                Json(serde_json::json!({
                    "error": message,
                    "code": "AUTH_ERROR"
                })),
            )
                .into_response()
        }
    }
}

/// Extractor that requires authentication.
///
/// Returns 401 when the auth middleware did not inject a caller.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .map(RequireAuth)
                .ok_or(AuthRejection::Unauthenticated)
        })
    }
}

/// Extractor that requires an authenticated admin.
///
/// 401 without a caller, 403 for a caller without the admin role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user = parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or(AuthRejection::Unauthenticated)?;
            if !user.is_admin() {
                return Err(AuthRejection::Forbidden);
            }
            Ok(RequireAdmin(user))
        })
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No valid authentication token was provided.
    Unauthenticated,
    /// Authenticated, but the role does not allow the operation.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            AuthRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Authentication required",
                "UNAUTHENTICATED",
            ),
            AuthRejection::Forbidden => (
                StatusCode::FORBIDDEN,
                "Admin role required",
                "FORBIDDEN",
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "code": code
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockAuthenticator;
    use crate::domain::foundation::{Role, UserId};
    use axum::extract::FromRequestParts;
    use axum::http::Request as HttpRequest;

    fn test_user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser::new(
            UserId::new("user-123").unwrap(),
            "test@example.com",
            Some("Test User".to_string()),
            role,
        )
    }

    fn parts_with(user: Option<AuthenticatedUser>) -> axum::http::request::Parts {
        let mut request: HttpRequest<()> = HttpRequest::builder().uri("/test").body(()).unwrap();
        if let Some(user) = user {
            request.extensions_mut().insert(user);
        }
        request.into_parts().0
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Authenticator Tests (indirect via MockAuthenticator)
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn authenticator_returns_user_for_valid_token() {
        let authenticator: AuthState =
            Arc::new(MockAuthenticator::new().with_user("valid-token", test_user(Role::User)));

        let user = authenticator.authenticate("valid-token").await.unwrap();
        assert_eq!(user.email, "test@example.com");
    }

    #[tokio::test]
    async fn authenticator_returns_error_for_unknown_token() {
        let authenticator: AuthState = Arc::new(MockAuthenticator::new());

        let result = authenticator.authenticate("invalid-token").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Extractor Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn require_auth_extracts_user_from_extensions() {
        let mut parts = parts_with(Some(test_user(Role::User)));

        let RequireAuth(user) = RequireAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user.email, "test@example.com");
    }

    #[tokio::test]
    async fn require_auth_fails_without_user() {
        let mut parts = parts_with(None);

        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthenticated)));
    }

    #[tokio::test]
    async fn require_admin_accepts_admin() {
        let mut parts = parts_with(Some(test_user(Role::Admin)));

        let result = RequireAdmin::from_request_parts(&mut parts, &()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn require_admin_rejects_plain_user_with_forbidden() {
        let mut parts = parts_with(Some(test_user(Role::User)));

        let result = RequireAdmin::from_request_parts(&mut parts, &()).await;
        assert_eq!(result.unwrap_err(), AuthRejection::Forbidden);
    }

    #[tokio::test]
    async fn require_admin_without_user_is_unauthenticated() {
        let mut parts = parts_with(None);

        let result = RequireAdmin::from_request_parts(&mut parts, &()).await;
        assert_eq!(result.unwrap_err(), AuthRejection::Unauthenticated);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // AuthRejection Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn rejections_map_to_401_and_403() {
        assert_eq!(
            AuthRejection::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn auth_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthState>();
        assert_send_sync::<RequireAuth>();
        assert_send_sync::<RequireAdmin>();
    }
}
