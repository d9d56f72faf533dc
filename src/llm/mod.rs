//! LLM — streaming chat-completion upstream for the relay.
//!
//! DESIGN
//! ======
//! Configuration comes from environment variables ([`config::LlmConfig`]).
//! The relay depends only on the [`CompletionUpstream`] trait; production
//! wires in [`OpenAiClient`], tests substitute a mock.

pub mod config;
pub mod openai;
pub mod types;

pub use openai::OpenAiClient;
pub use types::{ChatCompletionRequest, ChatMessage, CompletionStream, CompletionUpstream, LlmError, UpstreamRole};
