//! HS256 bearer token adapter.
//!
//! Validates tokens minted by the platform's identity service with a shared
//! secret and maps their claims onto [`AuthenticatedUser`].
//!
//! # Security
//!
//! - Signature and expiry are always validated
//! - Issuer and audience are validated when configured
//! - `sub` is required; the legacy `id` claim is accepted in its place

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, Role, UserId};
use crate::ports::Authenticator;

/// Configuration for the JWT adapter.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            issuer: None,
            audience: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// Claims read from the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(alias = "id")]
    pub sub: String,

    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `admin` grants the admin role; any other value is a regular user.
    #[serde(default, alias = "userType", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// [`Authenticator`] backed by HS256-signed JWTs.
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

fn role_from_claim(role: Option<&str>) -> Role {
    match role {
        Some(r) if r.eq_ignore_ascii_case("admin") => Role::Admin,
        _ => Role::User,
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    tracing::warn!(error = %e, "Token issued for another party");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!(error = %e, "Token validation failed");
                    AuthError::InvalidToken
                }
            }
        })?;
        let claims = data.claims;

        let user_id = UserId::new(claims.sub).map_err(|_| {
            tracing::warn!("Token has empty subject");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(
            user_id,
            claims.email.unwrap_or_default(),
            claims.name,
            role_from_claim(claims.role.as_deref()),
        ))
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-jwt-secret";

    fn claims(sub: &str, exp_offset: i64) -> Claims {
        Claims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
            email: Some("viewer@example.com".to_string()),
            name: Some("Viewer".to_string()),
            role: None,
            iss: None,
            aud: None,
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_maps_claims() {
        let auth = JwtAuthenticator::new(JwtConfig::new(SECRET));
        let token = sign(&claims("user-1", 3600), SECRET);

        let user = auth.authenticate(&token).await.unwrap();

        assert_eq!(user.id.as_str(), "user-1");
        assert_eq!(user.email, "viewer@example.com");
        assert_eq!(user.display_name.as_deref(), Some("Viewer"));
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn admin_role_claim_is_honoured() {
        let auth = JwtAuthenticator::new(JwtConfig::new(SECRET));
        let token = sign(
            &Claims {
                role: Some("admin".to_string()),
                ..claims("ops-1", 3600)
            },
            SECRET,
        );

        assert!(auth.authenticate(&token).await.unwrap().is_admin());
    }

    #[tokio::test]
    async fn legacy_id_and_user_type_claims_are_accepted() {
        let auth = JwtAuthenticator::new(JwtConfig::new(SECRET));
        let legacy = serde_json::json!({
            "id": "legacy-7",
            "userType": "viewer",
            "exp": chrono::Utc::now().timestamp() + 3600,
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &legacy,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let user = auth.authenticate(&token).await.unwrap();
        assert_eq!(user.id.as_str(), "legacy-7");
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn expired_token_is_token_expired() {
        let auth = JwtAuthenticator::new(JwtConfig::new(SECRET));
        let token = sign(&claims("user-1", -3600), SECRET);

        assert_eq!(
            auth.authenticate(&token).await.unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_token() {
        let auth = JwtAuthenticator::new(JwtConfig::new(SECRET));
        let token = sign(&claims("user-1", 3600), "other-secret");

        assert_eq!(
            auth.authenticate(&token).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn garbage_is_invalid_token() {
        let auth = JwtAuthenticator::new(JwtConfig::new(SECRET));
        assert_eq!(
            auth.authenticate("not.a.jwt").await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn configured_issuer_is_enforced() {
        let auth = JwtAuthenticator::new(JwtConfig::new(SECRET).with_issuer("https://id.viewesta.com"));
        let foreign = sign(
            &Claims {
                iss: Some("https://elsewhere.example".to_string()),
                ..claims("user-1", 3600)
            },
            SECRET,
        );
        let ours = sign(
            &Claims {
                iss: Some("https://id.viewesta.com".to_string()),
                ..claims("user-1", 3600)
            },
            SECRET,
        );

        assert_eq!(
            auth.authenticate(&foreign).await.unwrap_err(),
            AuthError::InvalidToken
        );
        assert!(auth.authenticate(&ours).await.is_ok());
    }

    #[test]
    fn jwt_authenticator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JwtAuthenticator>();
    }
}
