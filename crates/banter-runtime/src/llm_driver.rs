//! [`LlmDriver`] – OpenAI-compatible inference client.
//!
//! Talks to a model server exposing `/v1/chat/completions` (LM Studio,
//! Ollama, vLLM, ...).  The persona preamble is sent as the system message and
//! the assembled prompt as the user message.
//!
//! The engine never talks to [`LlmDriver`] directly; it goes through the
//! [`InferenceService`] trait so tests can substitute a scripted double.
//!
//! # Example
//!
//! ```rust,no_run
//! use banter_runtime::llm_driver::{InferenceRequest, InferenceService, LlmDriver};
//!
//! # async fn demo() {
//! let driver = LlmDriver::new("http://localhost:1234", "local-model");
//! let request = InferenceRequest::new("Ты бот.", "Скажи привет", 256);
//! // Requires a running model server – skipped in unit tests.
//! // let reply = driver.generate(&request).await;
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Fragments the model sometimes echoes from its instructions.
pub const LEAKAGE_MARKERS: &[&str] = &["###", "Assistant:", "System:", "I am a", "Димон:"];

/// Replies shorter than this (in characters) are replaced.
pub const MIN_REPLY_CHARS: usize = 3;

/// Replies longer than this (in characters) are cut and suffixed with `...`.
pub const MAX_REPLY_CHARS: usize = 300;

/// Substitute for replies that are too short after cleanup.
pub const SHORT_REPLY: &str = "Чё?";

/// Timeout applied to the health probe.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from inference calls.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The HTTP request to the model server failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The model server answered with a non-success status.
    #[error("Model server returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The response from the model server could not be parsed or was empty.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
    /// The call exceeded its deadline.
    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),
}

impl LlmError {
    /// Canned reply used in place of a generated one.
    pub fn fallback_reply(&self) -> &'static str {
        match self {
            LlmError::Status { .. } => "Сервер барахлит, попробуй ещё раз.",
            LlmError::BadResponse(_) => "Модель затупила.",
            LlmError::Timeout(_) => "Модель тупит, долго думает.",
            LlmError::Http(e) if e.is_timeout() => "Модель тупит, долго думает.",
            LlmError::Http(_) => "Что-то пошло не так.",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service abstraction
// ─────────────────────────────────────────────────────────────────────────────

/// One generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl InferenceRequest {
    /// A request with the default conversational sampling parameters.
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens,
            temperature: 0.85,
            top_p: 0.9,
            frequency_penalty: 0.3,
            presence_penalty: 0.6,
        }
    }
}

/// Anything that turns a prompt into generated text.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Generate a reply.  Implementations return the raw model text; cleanup
    /// is applied by the caller through [`sanitize_reply`].
    async fn generate(&self, request: &InferenceRequest) -> Result<String, LlmError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes (OpenAI-compatible)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: Role,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

// ─────────────────────────────────────────────────────────────────────────────
// LlmDriver
// ─────────────────────────────────────────────────────────────────────────────

/// An async client for an OpenAI-compatible chat-completions endpoint.
///
/// Construct once and share behind an `Arc`.
pub struct LlmDriver {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmDriver {
    /// Create a driver pointing at `base_url` (e.g. `"http://localhost:1234"`)
    /// using `model`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
    }

    fn build_body<'a>(&'a self, request: &InferenceRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: Role::User,
                    content: request.prompt.clone(),
                },
            ],
            stream: false,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Probe the model server: `/health` first, then `/v1/models`.
    ///
    /// Never fails; an unreachable server reports `false`.
    pub async fn health_check(&self) -> bool {
        for path in ["/health", "/v1/models"] {
            let url = format!("{}{}", self.base_url, path);
            let probe = self.authorize(self.client.get(&url)).timeout(HEALTH_TIMEOUT).send().await;
            match probe {
                Ok(resp) if resp.status().is_success() => return true,
                Ok(resp) => debug!(url = %url, status = resp.status().as_u16(), "health probe rejected"),
                Err(e) => debug!(url = %url, error = %e, "health probe failed"),
            }
        }
        false
    }
}

#[async_trait]
impl InferenceService for LlmDriver {
    async fn generate(&self, request: &InferenceRequest) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_body(request);

        let response = self.authorize(self.client.post(&url)).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "model server error");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::BadResponse("empty choices array".into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Post-processing
// ─────────────────────────────────────────────────────────────────────────────

/// Strip leakage markers, collapse whitespace, and enforce length bounds.
pub fn sanitize_reply(raw: &str) -> String {
    let mut reply = raw.trim().to_string();
    for marker in LEAKAGE_MARKERS {
        reply = reply.replace(marker, "");
    }
    let reply = reply.split_whitespace().collect::<Vec<_>>().join(" ");

    let len = reply.chars().count();
    if len < MIN_REPLY_CHARS {
        return SHORT_REPLY.to_string();
    }
    if len > MAX_REPLY_CHARS {
        let cut: String = reply.chars().take(MAX_REPLY_CHARS).collect();
        return format!("{cut}...");
    }
    reply
}
