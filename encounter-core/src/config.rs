//! Engine configuration.
//!
//! Loaded once from TOML at startup; every section has serde defaults so a
//! partial (or missing) file still yields a working configuration. API keys
//! arrive through this config and are never logged.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings for a single AI provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub api_key: String,
    /// Creative (narrative) model id. Empty selects the provider default.
    pub model: String,
    /// Structured (conversion) model id. Empty selects the provider default.
    pub conversion_model: String,
}

/// Per-provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Providers {
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
}

fn default_max_active_threads() -> u32 {
    10
}

fn default_dormancy_days() -> u32 {
    7
}

fn default_cleanup_resolved_days() -> u32 {
    30
}

fn default_cleanup_failed_days() -> u32 {
    14
}

/// Story thread thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorySettings {
    pub max_active_threads: u32,
    /// Days of inactivity before a low-progress thread goes dormant.
    pub dormancy_days: u32,
    /// Days a resolved thread is retained before cleanup.
    pub cleanup_resolved_days: u32,
    /// Days a failed thread is retained before cleanup.
    pub cleanup_failed_days: u32,
}

impl Default for StorySettings {
    fn default() -> Self {
        Self {
            max_active_threads: default_max_active_threads(),
            dormancy_days: default_dormancy_days(),
            cleanup_resolved_days: default_cleanup_resolved_days(),
            cleanup_failed_days: default_cleanup_failed_days(),
        }
    }
}

/// Active-encounter thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterSettings {
    /// Minutes before an encounter that never reached a terminal event is
    /// swept.
    pub stale_minutes: u64,
}

impl Default for EncounterSettings {
    fn default() -> Self {
        Self { stale_minutes: 30 }
    }
}

/// World lore and tone decoration for prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoreSettings {
    pub enable_world_lore: bool,
    /// "grim_hope", "pure_survival", "mysterious", or "rebuilding".
    pub tone: String,
    pub emphasize_corruption: bool,
}

impl Default for LoreSettings {
    fn default() -> Self {
        Self {
            enable_world_lore: true,
            tone: "grim_hope".to_string(),
            emphasize_corruption: true,
        }
    }
}

/// Verbose logging toggles for AI traffic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log full prompts at info level (keys are never logged).
    pub log_requests: bool,
    /// Log full response bodies at info level.
    pub log_responses: bool,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub providers: Providers,
    pub story: StorySettings,
    pub encounters: EncounterSettings,
    pub lore: LoreSettings,
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml(&content)?)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
