//! Ollama provider implementation.
//!
//! Talks to a local Ollama daemon over its native HTTP API:
//! - `POST /api/chat` for completions (non-streaming)
//! - `GET /api/tags` for installed models
//! - `GET /` for liveness
//!
//! Even with `stream: false`, some Ollama builds answer with
//! newline-delimited JSON chunks, so the response parser accepts both a
//! single document and an NDJSON body.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use vigil_core::error::ProviderError;
use vigil_core::message::Role;
use vigil_core::provider::ChatRequest;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Timeout for the liveness probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
/// Timeout for listing installed models.
const LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// A provider backed by a local Ollama daemon.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider against the given base URL.
    ///
    /// No global client timeout: chat completions on CPU-bound local
    /// models can legitimately take minutes. Probe endpoints set their
    /// own short per-request timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Parse a `/api/chat` body that may be a single JSON document or an
    /// NDJSON chunk stream. Chunk contents are concatenated in order;
    /// unparseable lines are skipped.
    fn parse_chat_body(body: &str) -> Result<String, ProviderError> {
        let mut parts: Vec<String> = Vec::new();
        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Ok(chunk) = serde_json::from_str::<ChatResponse>(line) {
                if let Some(message) = chunk.message {
                    parts.push(message.content);
                }
            }
        }
        if !parts.is_empty() {
            return Ok(parts.concat());
        }

        // A pretty-printed single document spans multiple lines and falls
        // through the per-line pass.
        let parsed: ChatResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::InvalidResponse(format!("unparseable chat body: {e}")))?;
        parsed
            .message
            .map(|m| m.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no message in chat response".into()))
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl vigil_core::Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let payload = ChatPayload {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
            },
        };

        debug!(
            model = %request.model,
            messages = payload.messages.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited { retry_after_secs: 5 });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Ollama rejected the request".into(),
            ));
        }
        if status == 404 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ModelNotFound(format!(
                "{}: {}",
                request.model, error_body
            )));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let body = response.text().await.map_err(map_reqwest_err)?;
        Self::parse_chat_body(&body)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(LIST_TIMEOUT)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("bad tags response: {e}")))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/", self.base_url);
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

fn map_reqwest_err(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}
