//! AI provider clients implementing the two-stage generation protocol.
//!
//! Stage one asks for a free-form narrative at creative temperature; stage
//! two converts that narrative into the structured encounter schema at low
//! temperature. A provider makes no retries of its own; retry by
//! substitution belongs to the orchestrator's fallback chain.

use crate::config::ProviderSettings;
use crate::encounter::{EncounterError, EncounterSpec};
use crate::prompt::{PromptBuilder, CONVERSION_SYSTEM, NARRATIVE_SYSTEM};
use crate::story::thread::{StoryThread, ThreadUpdate};
use async_trait::async_trait;
use llm::{ChatClient, ChatRequest, TaskKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

/// Token budget for each pipeline stage.
const STAGE_MAX_TOKENS: u32 = 2000;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_OPENAI_CONVERSION_MODEL: &str = "o1-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Ways a single provider attempt can fail. Each is logged by the
/// orchestrator and answered by trying the next provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider is not configured")]
    NotConfigured,

    #[error(transparent)]
    Chat(#[from] llm::Error),

    #[error("response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("response is missing the encounter payload")]
    MissingEncounter,

    #[error("invalid encounter: {0}")]
    InvalidEncounter(#[from] EncounterError),
}

/// Story-level updates riding along with a generated encounter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryUpdates {
    #[serde(default)]
    pub encounter_summary: Option<String>,

    /// Updates to existing threads; unknown ids are dropped downstream.
    #[serde(default)]
    pub thread_updates: Vec<ThreadUpdate>,

    /// Freshly proposed threads, inserted verbatim keyed by id.
    #[serde(default)]
    pub new_threads: Vec<StoryThread>,

    #[serde(default)]
    pub key_choices: Vec<String>,
}

/// A fully parsed and validated generation result.
#[derive(Debug, Clone)]
pub struct StoryResponse {
    pub encounter: EncounterSpec,
    pub updates: StoryUpdates,
}

/// An external AI service able to run the two-stage protocol.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable service name, for logs.
    fn name(&self) -> String;

    /// Lower tries first.
    fn priority(&self) -> u32;

    /// True only if enabled by configuration and credentialed.
    fn is_available(&self) -> bool;

    /// Run the full two-stage generation for one prompt.
    async fn generate(&self, prompt: &str) -> Result<StoryResponse, ProviderError>;
}

/// Chat-backed provider; the wire format is fixed by the client inside.
pub struct ChatProvider {
    client: ChatClient,
    settings: ProviderSettings,
    service: &'static str,
    priority: u32,
    default_model: &'static str,
    default_conversion_model: &'static str,
    log_exchanges: bool,
}

impl ChatProvider {
    /// OpenAI-backed provider; tried first.
    pub fn openai(settings: ProviderSettings, log_exchanges: bool) -> Self {
        Self {
            client: ChatClient::openai(settings.api_key.clone()),
            settings,
            service: "OpenAI",
            priority: 1,
            default_model: DEFAULT_OPENAI_MODEL,
            default_conversion_model: DEFAULT_OPENAI_CONVERSION_MODEL,
            log_exchanges,
        }
    }

    /// Anthropic-backed provider; the fallback.
    pub fn anthropic(settings: ProviderSettings, log_exchanges: bool) -> Self {
        Self {
            client: ChatClient::anthropic(settings.api_key.clone()),
            settings,
            service: "Anthropic",
            priority: 2,
            default_model: DEFAULT_ANTHROPIC_MODEL,
            default_conversion_model: DEFAULT_ANTHROPIC_MODEL,
            log_exchanges,
        }
    }

    fn model(&self) -> &str {
        if self.settings.model.is_empty() {
            self.default_model
        } else {
            &self.settings.model
        }
    }

    fn conversion_model(&self) -> &str {
        if self.settings.conversion_model.is_empty() {
            self.default_conversion_model
        } else {
            &self.settings.conversion_model
        }
    }
}

#[async_trait]
impl Provider for ChatProvider {
    fn name(&self) -> String {
        format!("{} {}", self.service, self.model())
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_available(&self) -> bool {
        self.settings.enabled && !self.settings.api_key.is_empty()
    }

    async fn generate(&self, prompt: &str) -> Result<StoryResponse, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::NotConfigured);
        }

        // Stage one: free-form narrative at creative temperature.
        info!(
            service = self.service,
            model = self.model(),
            prompt_chars = prompt.len(),
            "generating narrative"
        );
        if self.log_exchanges {
            info!(service = self.service, "narrative prompt:\n{prompt}");
        }

        let narrative = self
            .client
            .complete(
                &ChatRequest::new(self.model(), TaskKind::Creative)
                    .with_system(NARRATIVE_SYSTEM)
                    .with_user(prompt)
                    .with_max_tokens(STAGE_MAX_TOKENS),
            )
            .await?;

        debug!(
            service = self.service,
            narrative_chars = narrative.len(),
            "narrative stage complete"
        );

        // Stage two: convert to the structured schema at low temperature.
        let conversion_prompt = PromptBuilder::build_conversion_prompt(&narrative);
        info!(
            service = self.service,
            model = self.conversion_model(),
            "converting narrative to structured payload"
        );

        let converted = self
            .client
            .complete(
                &ChatRequest::new(self.conversion_model(), TaskKind::Structured)
                    .with_system(CONVERSION_SYSTEM)
                    .with_user(conversion_prompt)
                    .with_max_tokens(STAGE_MAX_TOKENS),
            )
            .await?;

        if self.log_exchanges {
            info!(service = self.service, "conversion response:\n{converted}");
        }

        parse_story_response(&converted)
    }
}

/// Strip markdown code fences the model sometimes wraps JSON in.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest.trim_start();
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest.trim_start();
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim_end();
    }
    cleaned
}

/// Wire shape of the conversion stage output.
#[derive(Debug, Deserialize)]
struct RawStoryResponse {
    #[serde(default)]
    encounter_json: Option<Value>,
    #[serde(default)]
    story_updates: StoryUpdates,
}

/// Parse the conversion-stage text into a validated [`StoryResponse`].
pub(crate) fn parse_story_response(text: &str) -> Result<StoryResponse, ProviderError> {
    let cleaned = strip_code_fences(text);
    let raw: RawStoryResponse =
        serde_json::from_str(cleaned).map_err(|e| ProviderError::MalformedJson(e.to_string()))?;

    // The schema asks for an escaped string, but models sometimes inline
    // the object; accept both.
    let encounter = match raw.encounter_json {
        Some(Value::String(inner)) if !inner.is_empty() => {
            EncounterSpec::from_json(strip_code_fences(&inner))?
        }
        Some(value @ Value::Object(_)) => {
            let spec: EncounterSpec = serde_json::from_value(value)
                .map_err(|e| ProviderError::MalformedJson(e.to_string()))?;
            spec.validate()?;
            spec
        }
        _ => return Err(ProviderError::MissingEncounter),
    };

    Ok(StoryResponse {
        encounter,
        updates: raw.story_updates,
    })
}
