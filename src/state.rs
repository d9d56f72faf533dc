//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the database pool, the optional completion upstream, token
//! verification settings, relay prompt settings and the relay rate limiter.
//! Nothing else is shared between requests.

use std::sync::Arc;

use sqlx::PgPool;

use crate::llm::CompletionUpstream;
use crate::rate_limit::RateLimiter;
use crate::services::auth::AuthConfig;
use crate::services::relay::RelayConfig;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or cheap.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Optional completion upstream. `None` if LLM env vars are not configured.
    pub upstream: Option<Arc<dyn CompletionUpstream>>,
    pub auth: Arc<AuthConfig>,
    pub relay: Arc<RelayConfig>,
    /// In-memory rate limiter for relay requests.
    pub rate_limiter: RateLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(
        pool: PgPool,
        upstream: Option<Arc<dyn CompletionUpstream>>,
        auth: AuthConfig,
        relay: RelayConfig,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self { pool, upstream, auth: Arc::new(auth), relay: Arc::new(relay), rate_limiter }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
