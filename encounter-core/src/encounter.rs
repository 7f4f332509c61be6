//! Structured encounter payloads produced by the conversion stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The category of a generated encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncounterKind {
    Combat,
    Exploration,
    Social,
    Trade,
    Mystery,
}

impl EncounterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EncounterKind::Combat => "combat",
            EncounterKind::Exploration => "exploration",
            EncounterKind::Social => "social",
            EncounterKind::Trade => "trade",
            EncounterKind::Mystery => "mystery",
        }
    }
}

impl fmt::Display for EncounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of an executed encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncounterOutcome {
    Victory,
    Defeat,
    Fled,
    Abandoned,
}

impl EncounterOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            EncounterOutcome::Victory => "victory",
            EncounterOutcome::Defeat => "defeat",
            EncounterOutcome::Fled => "fled",
            EncounterOutcome::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for EncounterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_count() -> u32 {
    1
}

fn default_hostile() -> bool {
    true
}

fn default_modifier() -> f32 {
    1.0
}

/// One entity (or group of identical entities) to spawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterEntity {
    pub entity_type: String,

    #[serde(default)]
    pub name: String,

    #[serde(default = "default_count")]
    pub count: u32,

    #[serde(default = "default_hostile")]
    pub hostile: bool,

    #[serde(default = "default_modifier")]
    pub health_modifier: f32,

    #[serde(default = "default_modifier")]
    pub damage_modifier: f32,

    #[serde(default)]
    pub equipment: Vec<String>,
}

/// A line of spoken dialogue in the encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueLine {
    #[serde(default)]
    pub speaker: Option<String>,
    pub text: String,
}

/// Outcome flavor text shown when the encounter ends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeTexts {
    #[serde(default)]
    pub victory_text: Option<String>,
    #[serde(default)]
    pub defeat_text: Option<String>,
    #[serde(default)]
    pub flee_text: Option<String>,
    #[serde(default)]
    pub negotiate_text: Option<String>,
}

impl OutcomeTexts {
    /// The flavor text matching a terminal outcome, if present.
    pub fn text_for(&self, outcome: EncounterOutcome) -> Option<&str> {
        let text = match outcome {
            EncounterOutcome::Victory => &self.victory_text,
            EncounterOutcome::Defeat => &self.defeat_text,
            EncounterOutcome::Fled | EncounterOutcome::Abandoned => &self.flee_text,
        };
        text.as_deref()
    }
}

/// Ways an encounter payload can be invalid.
#[derive(Debug, Error)]
pub enum EncounterError {
    #[error("encounter payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("encounter has no entities")]
    NoEntities,

    #[error("entity '{0}' has a zero count")]
    ZeroCount(String),
}

/// The structured encounter payload handed to the spawner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterSpec {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "type")]
    pub kind: EncounterKind,

    #[serde(default)]
    pub narrative_text: String,

    #[serde(default)]
    pub entities: Vec<EncounterEntity>,

    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,

    #[serde(default)]
    pub outcomes: OutcomeTexts,
}

impl EncounterSpec {
    /// Parse and validate an encounter from raw JSON text.
    pub fn from_json(raw: &str) -> Result<Self, EncounterError> {
        let spec: Self = serde_json::from_str(raw)?;
        spec.validate()?;
        Ok(spec)
    }

    /// A payload with no entities is invalid; "narrative-only" encounters
    /// are not a thing the spawner can execute.
    pub fn validate(&self) -> Result<(), EncounterError> {
        if self.entities.is_empty() {
            return Err(EncounterError::NoEntities);
        }
        for entity in &self.entities {
            if entity.count == 0 {
                return Err(EncounterError::ZeroCount(entity.entity_type.clone()));
            }
        }
        Ok(())
    }

    /// Names of the entities involved, for history summaries.
    pub fn entity_names(&self) -> Vec<String> {
        self.entities
            .iter()
            .filter(|entity| !entity.name.is_empty())
            .map(|entity| entity.name.clone())
            .collect()
    }
}
