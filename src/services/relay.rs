//! Relay service — turns a session's history into a streamed completion.
//!
//! DESIGN
//! ======
//! `open_relay` runs every check before the upstream sees a request:
//! upstream configured → rate limit → ownership → history. The upstream's
//! SSE body is then wrapped in a [`RelayStream`] and handed to the route
//! untouched, so the client receives exactly the bytes the upstream sent.
//!
//! CANCELLATION
//! ============
//! The response body owns the [`RelayStream`], which owns the upstream
//! response. A client disconnect drops the body, which drops the upstream
//! connection. `Drop` logs which of the three endings happened.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use client::api::{Message, Role};
use futures::{Stream, StreamExt};
use uuid::Uuid;

use crate::llm::{ChatCompletionRequest, ChatMessage, CompletionStream, LlmError, UpstreamRole};
use crate::rate_limit::{RateLimitError, env_parse};
use crate::services::auth::Identity;
use crate::services::chat::{self, ChatError};
use crate::state::AppState;

pub const DEFAULT_MAX_TOKENS: u32 = 1024;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a clone of ChatGPT, a large language model trained to be a helpful \
assistant. Answer as concisely as possible. If the answer involves code or terminal commands, always use markdown \
and/or markdown code blocks with the language named on the opening fence.";

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub system_prompt: String,
    pub max_tokens: u32,
}

impl RelayConfig {
    /// Read `RELAY_SYSTEM_PROMPT` and `RELAY_MAX_TOKENS`, falling back to the
    /// built-in persona and 1024 tokens.
    #[must_use]
    pub fn from_env() -> Self {
        let system_prompt = std::env::var("RELAY_SYSTEM_PROMPT")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_owned());
        Self { system_prompt, max_tokens: env_parse("RELAY_MAX_TOKENS", DEFAULT_MAX_TOKENS) }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(), max_tokens: DEFAULT_MAX_TOKENS }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("completion upstream is not configured")]
    NotConfigured,
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("upstream failed: {0}")]
    Upstream(#[from] LlmError),
}

// =============================================================================
// PROMPT
// =============================================================================

/// Map a stored role onto the upstream vocabulary.
#[must_use]
pub fn upstream_role(role: Role) -> UpstreamRole {
    match role {
        Role::User => UpstreamRole::User,
        Role::Bot => UpstreamRole::Assistant,
    }
}

/// One system message followed by the history in its original order.
#[must_use]
pub fn build_completion_request(model: &str, config: &RelayConfig, history: &[Message]) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::new(UpstreamRole::System, config.system_prompt.clone()));
    messages.extend(
        history
            .iter()
            .map(|m| ChatMessage::new(upstream_role(m.role), m.content.clone())),
    );

    ChatCompletionRequest { model: model.to_owned(), max_tokens: config.max_tokens, stream: true, messages }
}

// =============================================================================
// RELAY
// =============================================================================

/// Validate the caller and open the upstream completion stream.
///
/// # Errors
///
/// Returns [`RelayError::NotConfigured`] without an upstream,
/// [`RelayError::RateLimited`] over the limit, [`RelayError::Chat`] for a
/// missing or foreign session, and [`RelayError::Upstream`] if the upstream
/// cannot be reached or answers with an error status.
pub async fn open_relay(state: &AppState, identity: &Identity, session_id: i64) -> Result<RelayStream, RelayError> {
    let upstream = state.upstream.clone().ok_or(RelayError::NotConfigured)?;
    state.rate_limiter.check_and_record(&identity.user_id)?;

    chat::require_owner(&state.pool, identity, session_id).await?;
    let history = chat::list_messages(&state.pool, session_id).await?;
    let request = build_completion_request(upstream.model(), &state.relay, &history);

    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        %session_id,
        user_id = %identity.user_id,
        history = history.len(),
        model = %request.model,
        "relay opening upstream stream"
    );

    let stream = upstream.stream_chat(&request).await.map_err(|e| {
        tracing::warn!(%request_id, %session_id, error = %e, "upstream rejected completion request");
        e
    })?;
    Ok(RelayStream::new(stream, request_id, session_id))
}

// =============================================================================
// RELAY STREAM
// =============================================================================

/// How a relay stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    Completed,
    UpstreamError,
    ClientDisconnected,
}

/// Pass-through wrapper over the upstream body that records how it ended.
pub struct RelayStream {
    inner: CompletionStream,
    request_id: Uuid,
    session_id: i64,
    chunks: usize,
    bytes: usize,
    /// `None` while the upstream is still streaming.
    end: Option<RelayEnd>,
}

impl RelayStream {
    #[must_use]
    pub fn new(inner: CompletionStream, request_id: Uuid, session_id: i64) -> Self {
        Self { inner, request_id, session_id, chunks: 0, bytes: 0, end: None }
    }
}

impl Stream for RelayStream {
    type Item = Result<Bytes, LlmError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.end.is_some() {
            return Poll::Ready(None);
        }

        let polled = self.inner.poll_next_unpin(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                self.chunks += 1;
                self.bytes += chunk.len();
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::warn!(request_id = %self.request_id, session_id = self.session_id, error = %e, "upstream stream failed");
                self.end = Some(RelayEnd::UpstreamError);
            }
            Poll::Ready(None) => self.end = Some(RelayEnd::Completed),
            Poll::Pending => {}
        }
        polled
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        let end = *self.end.get_or_insert(RelayEnd::ClientDisconnected);
        tracing::info!(
            request_id = %self.request_id,
            session_id = self.session_id,
            chunks = self.chunks,
            bytes = self.bytes,
            ?end,
            "relay stream closed"
        );
    }
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
