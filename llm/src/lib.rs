//! Minimal provider-agnostic chat completion client.
//!
//! This crate provides one focused client for two wire formats:
//! - OpenAI-compatible `chat/completions`
//! - Anthropic `messages`
//!
//! Model-specific quirks (temperature support, system-message support,
//! token-limit field naming) live in the capability table ([`ModelCaps`]),
//! so callers build requests the same way regardless of vendor or model
//! generation.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

pub mod model;

pub use model::{ModelCaps, ModelFamily, TemperatureSupport, TokenParam};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// How much of an error body to keep in error messages.
const ERROR_BODY_LIMIT: usize = 300;

/// Errors that can occur when using the chat client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Whether a request is a creative or a structured task.
///
/// Creative tasks default to a high temperature, structured (conversion,
/// extraction) tasks to a low one. The capability table may still override
/// or drop the temperature entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Creative,
    Structured,
}

impl TaskKind {
    /// Default temperature for this kind of task.
    pub fn default_temperature(self) -> f32 {
        match self {
            TaskKind::Creative => 0.9,
            TaskKind::Structured => 0.2,
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message in the conversation.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message (for conversation history).
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub task: TaskKind,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Create a new request for the given model and task kind.
    pub fn new(model: impl Into<String>, task: TaskKind) -> Self {
        Self {
            model: model.into(),
            task,
            system: None,
            messages: Vec::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the system instruction. Dropped at build time if the model
    /// family does not accept system messages.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Append a user message.
    pub fn with_user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    /// Append an assistant message.
    pub fn with_assistant(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::assistant(content));
        self
    }

    /// Override the token limit (defaults to the family's value).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Override the temperature. Ignored if the family fixes or forbids it.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// The temperature to send, if any, after applying capability rules.
    fn effective_temperature(&self, caps: &ModelCaps) -> Option<f32> {
        match caps.temperature {
            TemperatureSupport::Full => {
                Some(self.temperature.unwrap_or(self.task.default_temperature()))
            }
            TemperatureSupport::Fixed(constant) => Some(constant),
            TemperatureSupport::Unsupported => None,
        }
    }

    fn effective_max_tokens(&self, caps: &ModelCaps) -> u32 {
        self.max_tokens.unwrap_or(caps.default_max_tokens)
    }

    /// Build an OpenAI-compatible `chat/completions` body.
    fn openai_body(&self, caps: &ModelCaps) -> Value {
        let mut messages: Vec<Value> = Vec::new();
        if caps.system_messages {
            if let Some(ref system) = self.system {
                messages.push(json!({ "role": "system", "content": system }));
            }
        }
        for message in &self.messages {
            messages.push(json!({
                "role": message.role.as_str(),
                "content": message.content,
            }));
        }

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(temperature) = self.effective_temperature(caps) {
            body["temperature"] = json!(temperature);
        }
        body[caps.token_param.as_str()] = json!(self.effective_max_tokens(caps));
        body
    }

    /// Build an Anthropic `messages` body.
    fn anthropic_body(&self, caps: &ModelCaps) -> Value {
        let messages: Vec<Value> = self
            .messages
            .iter()
            .map(|message| {
                json!({
                    "role": message.role.as_str(),
                    "content": message.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.effective_max_tokens(caps),
            "messages": messages,
        });
        if caps.system_messages {
            if let Some(ref system) = self.system {
                body["system"] = json!(system);
            }
        }
        if let Some(temperature) = self.effective_temperature(caps) {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

/// Which wire format a client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    OpenAi,
    Anthropic,
}

/// Chat completion client for a single endpoint.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    wire: WireFormat,
    base_url: String,
    api_key: String,
}

impl ChatClient {
    /// Create a client speaking the OpenAI-compatible wire format.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new(WireFormat::OpenAi, OPENAI_API_BASE, api_key)
    }

    /// Create a client speaking the Anthropic wire format.
    pub fn anthropic(api_key: impl Into<String>) -> Self {
        Self::new(WireFormat::Anthropic, ANTHROPIC_API_BASE, api_key)
    }

    fn new(wire: WireFormat, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            wire,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send a completion request and return the assistant text.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, Error> {
        if self.api_key.is_empty() {
            return Err(Error::NoApiKey);
        }

        let caps = ModelCaps::for_model(&request.model);
        let (url, body) = match self.wire {
            WireFormat::OpenAi => (
                format!("{}/chat/completions", self.base_url),
                request.openai_body(&caps),
            ),
            WireFormat::Anthropic => (
                format!("{}/messages", self.base_url),
                request.anthropic_body(&caps),
            ),
        };

        debug!(model = %request.model, family = ?caps.family, "sending chat request");

        let response = self
            .client
            .post(url)
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: extract_error_message(&text)
                    .unwrap_or_else(|| truncate(&text, ERROR_BODY_LIMIT)),
            });
        }

        match self.wire {
            WireFormat::OpenAi => parse_openai_response(&text),
            WireFormat::Anthropic => parse_anthropic_response(&text),
        }
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match self.wire {
            WireFormat::OpenAi => {
                headers.insert(
                    "Authorization",
                    HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                        .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
                );
            }
            WireFormat::Anthropic => {
                headers.insert(
                    "x-api-key",
                    HeaderValue::from_str(&self.api_key)
                        .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
                );
                headers.insert(
                    "anthropic-version",
                    HeaderValue::from_static(ANTHROPIC_VERSION),
                );
            }
        }
        Ok(headers)
    }
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: String,
}

fn parse_openai_response(body: &str) -> Result<String, Error> {
    let response: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| Error::Parse("response has no choices".to_string()))
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

fn parse_anthropic_response(body: &str) -> Result<String, Error> {
    let response: AnthropicResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;
    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContent::Text { text } => Some(text),
            AnthropicContent::Other => None,
        })
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() {
        return Err(Error::Parse("response has no text content".to_string()));
    }
    Ok(text)
}

/// Pull the human-readable message out of a provider error envelope.
///
/// Both wire formats use `{"error": {"message": "..."}}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(limit).collect();
        format!("{truncated}...")
    }
}
