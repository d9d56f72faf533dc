//! LLM types — chat-completion wire types, the upstream trait, and errors.
//!
//! The relay only needs the request side of the completion contract. The
//! response is treated as an opaque SSE byte stream and never parsed here.

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the LLM provider failed before a response arrived.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The response body failed while it was being streamed.
    #[error("API stream interrupted: {0}")]
    Stream(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// REQUEST TYPES
// =============================================================================

/// Role vocabulary of the upstream completion API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamRole {
    System,
    User,
    Assistant,
}

/// One role/content pair in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: UpstreamRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: UpstreamRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub stream: bool,
    pub messages: Vec<ChatMessage>,
}

// =============================================================================
// UPSTREAM TRAIT
// =============================================================================

/// Raw SSE bytes from the upstream, chunked as they arrive.
pub type CompletionStream = BoxStream<'static, Result<Bytes, LlmError>>;

/// Streaming chat-completion provider. Enables mocking in tests.
#[async_trait::async_trait]
pub trait CompletionUpstream: Send + Sync {
    /// Model identifier sent with every request.
    fn model(&self) -> &str;

    /// Submit a streamed completion request.
    ///
    /// Resolves once the upstream has answered with a success status; the
    /// returned stream then yields the body chunk by chunk.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request cannot be sent or the upstream
    /// answers with a non-success status.
    async fn stream_chat(&self, request: &ChatCompletionRequest) -> Result<CompletionStream, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
