//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation to an LLM and get the
//! assistant's text back. The model is an opaque generator from the
//! agent's point of view: one request in, one plain-text reply out, no
//! streaming and no provider-side tool protocol — tool calls travel as
//! fenced JSON inside ordinary message content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// One chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g. "llama3.1", "qwen2.5")
    pub model: String,

    /// The conversation messages, oldest first
    pub messages: Vec<Message>,

    /// Temperature (low by default — this agent analyzes, it does not riff)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

pub fn default_temperature() -> f32 {
    0.1
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The agent loop calls `chat()`
/// without knowing which backend is in play.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g. "ollama").
    fn name(&self) -> &str;

    /// Send a conversation and get the assistant's reply text.
    async fn chat(&self, request: ChatRequest) -> std::result::Result<String, ProviderError>;

    /// List available models for this provider.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
