//! Identity verification for JWTs issued by the managed auth provider.
//!
//! DESIGN
//! ======
//! The provider signs session tokens; this service only verifies them.
//! HS256 (`AUTH_JWT_SECRET`) and RS256 (`AUTH_JWT_PUBLIC_KEY`, PEM) are
//! supported. The verified `sub` claim becomes the [`Identity`] that every
//! session-scoped operation receives explicitly.
//!
//! A development bypass (`AUTH_DEV_BYPASS=true`) trusts a caller-supplied
//! user id instead. It must never be enabled in production.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::routes::auth::env_bool;

// =============================================================================
// TYPES
// =============================================================================

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("invalid authorization header")]
    InvalidAuthHeader,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token expired")]
    TokenExpired,
    #[error("no token verification key configured")]
    NotConfigured,
    #[error("invalid verification key: {0}")]
    KeyParse(String),
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Clone)]
pub struct AuthConfig {
    key: Option<(DecodingKey, Algorithm)>,
    issuer: Option<String>,
    audience: Option<String>,
    dev_bypass: bool,
}

impl AuthConfig {
    /// Build verification settings from environment variables.
    ///
    /// - `AUTH_JWT_SECRET`: HS256 shared secret
    /// - `AUTH_JWT_PUBLIC_KEY`: RS256 public key (PEM); takes precedence
    /// - `AUTH_JWT_ISSUER`, `AUTH_JWT_AUDIENCE`: optional claim checks
    /// - `AUTH_DEV_BYPASS`: accept `X-Dev-User` instead of a token
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyParse`] if the public key is not valid PEM.
    pub fn from_env() -> Result<Self, AuthError> {
        let mut config: Self = if let Some(pem) = non_empty_env("AUTH_JWT_PUBLIC_KEY") {
            Self::rs256_pem(pem.as_bytes())?
        } else if let Some(secret) = non_empty_env("AUTH_JWT_SECRET") {
            Self::hs256(secret.as_bytes())
        } else {
            Self::unconfigured()
        };

        if let Some(issuer) = non_empty_env("AUTH_JWT_ISSUER") {
            config = config.with_issuer(issuer);
        }
        if let Some(audience) = non_empty_env("AUTH_JWT_AUDIENCE") {
            config = config.with_audience(audience);
        }
        Ok(config.with_dev_bypass(env_bool("AUTH_DEV_BYPASS").unwrap_or(false)))
    }

    #[must_use]
    pub fn hs256(secret: &[u8]) -> Self {
        Self {
            key: Some((DecodingKey::from_secret(secret), Algorithm::HS256)),
            ..Self::unconfigured()
        }
    }

    /// # Errors
    ///
    /// Returns [`AuthError::KeyParse`] if `pem` is not an RSA public key.
    pub fn rs256_pem(pem: &[u8]) -> Result<Self, AuthError> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| AuthError::KeyParse(e.to_string()))?;
        Ok(Self { key: Some((key, Algorithm::RS256)), ..Self::unconfigured() })
    }

    /// No key at all: every token is rejected.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { key: None, issuer: None, audience: None, dev_bypass: false }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    #[must_use]
    pub fn with_dev_bypass(mut self, enabled: bool) -> Self {
        self.dev_bypass = enabled;
        self
    }

    #[must_use]
    pub fn dev_bypass(&self) -> bool {
        self.dev_bypass
    }

    #[must_use]
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Verify a token and return the identity in its `sub` claim.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExpired`] for expired tokens,
    /// [`AuthError::InvalidToken`] for bad signatures or claims, and
    /// [`AuthError::NotConfigured`] when no key is set.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let (key, algorithm) = self.key.as_ref().ok_or(AuthError::NotConfigured)?;

        let mut validation = Validation::new(*algorithm);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Claims>(token, key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "jwt validation failed");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".into()));
        }
        Ok(Identity { user_id: data.claims.sub })
    }

    /// Accept a development user id when the bypass is enabled.
    #[must_use]
    pub fn dev_identity(&self, user_id: &str) -> Option<Identity> {
        let user_id = user_id.trim();
        (self.dev_bypass && !user_id.is_empty()).then(|| Identity::new(user_id))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Extract a bearer token from an `Authorization` header value.
///
/// # Errors
///
/// Returns [`AuthError::InvalidAuthHeader`] unless the value is exactly
/// `Bearer <token>` (scheme case-insensitive).
pub fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }
    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
