//! Mock authenticator for tests.
//!
//! ```ignore
//! let auth = MockAuthenticator::new()
//!     .with_test_user("alice-token", "alice")
//!     .with_admin("ops-token", "ops");
//! let user = auth.authenticate("alice-token").await?;
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, Role, UserId};
use crate::ports::Authenticator;

/// Maps fixed tokens to users. Tokens not in the map return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockAuthenticator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every call when set.
    force_error: RwLock<Option<AuthError>>,
}

fn test_user(user_id: &str, role: Role) -> Option<AuthenticatedUser> {
    let id = UserId::new(user_id).ok()?;
    Some(AuthenticatedUser::new(
        id,
        format!("{}@test.example.com", user_id),
        Some(format!("Test User {}", user_id)),
        role,
    ))
}

impl MockAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Adds a regular user with a derived email and name. Empty ids are skipped.
    pub fn with_test_user(self, token: impl Into<String>, user_id: &str) -> Self {
        match test_user(user_id, Role::User) {
            Some(user) => self.with_user(token, user),
            None => self,
        }
    }

    pub fn with_admin(self, token: impl Into<String>, user_id: &str) -> Self {
        match test_user(user_id, Role::Admin) {
            Some(user) => self.with_user(token, user),
            None => self,
        }
    }

    pub fn with_error(self, error: AuthError) -> Self {
        *self
            .force_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), user);
    }

    pub fn remove_token(&self, token: &str) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
