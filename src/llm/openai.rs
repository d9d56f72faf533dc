//! OpenAI-compatible streaming chat-completions client.
//!
//! Sends `POST {base_url}/chat/completions` with `stream: true` and hands the
//! response body back as a byte stream. Dropping the stream drops the
//! underlying `reqwest::Response`, which closes the outbound connection.

use std::time::Duration;

use futures::TryStreamExt;

use super::config::LlmConfig;
use super::types::{ChatCompletionRequest, CompletionStream, CompletionUpstream, LlmError};

/// Upper bound on the error body kept for logging.
const MAX_ERROR_BODY_BYTES: usize = 2048;

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Build a client from a parsed config.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key: config.api_key, base_url: config.base_url, model: config.model })
    }

    /// Build a client from environment variables. See [`LlmConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(LlmConfig::from_env()?)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait::async_trait]
impl CompletionUpstream for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_chat(&self, request: &ChatCompletionRequest) -> Result<CompletionStream, LlmError> {
        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_at_char_boundary(&mut body, MAX_ERROR_BODY_BYTES);
            return Err(LlmError::ApiResponse { status: status.as_u16(), body });
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| LlmError::Stream(e.to_string()));
        Ok(Box::pin(stream))
    }
}

fn truncate_at_char_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
