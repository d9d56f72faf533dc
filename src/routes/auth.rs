//! Auth extractor — resolves the caller's [`Identity`] for every protected route.

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::services::auth::{self as auth_svc, AuthError, Identity};
use crate::state::AppState;

/// Cookie the auth provider sets on browser sessions.
pub const SESSION_COOKIE_NAME: &str = "__session";
/// Header trusted as the user id when the dev bypass is enabled.
pub const DEV_USER_HEADER: &str = "x-dev-user";

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn auth_error_to_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::KeyParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AuthError::MissingCredentials
        | AuthError::InvalidAuthHeader
        | AuthError::InvalidToken(_)
        | AuthError::TokenExpired
        | AuthError::NotConfigured => StatusCode::UNAUTHORIZED,
    }
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated caller. Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub identity: Identity,
}

impl AuthUser {
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }
}

/// Resolve an identity from request headers: dev header (when enabled), then
/// bearer token, then the session cookie.
pub(crate) fn identity_from_parts(parts: &Parts, config: &auth_svc::AuthConfig) -> Result<Identity, AuthError> {
    if config.dev_bypass() {
        if let Some(identity) = parts
            .headers
            .get(DEV_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|user| config.dev_identity(user))
        {
            return Ok(identity);
        }
    }

    if let Some(value) = parts.headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
        return config.verify(auth_svc::bearer_token(value)?);
    }

    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(SESSION_COOKIE_NAME).map(Cookie::value).unwrap_or_default();
    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    config.verify(token)
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let identity = identity_from_parts(parts, &app_state.auth).map_err(|e| {
            tracing::debug!(error = %e, "request rejected by auth");
            auth_error_to_status(&e)
        })?;
        Ok(Self { identity })
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
