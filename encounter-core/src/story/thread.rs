//! Story threads: persistent narrative arcs spanning multiple encounters.

use crate::clock::now_millis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum progress a thread can reach before it resolves.
pub const MAX_PROGRESS: i32 = 10;

/// Lifecycle status of a story thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    /// Actively progressing; eligible for selection.
    Active,
    /// Shelved after prolonged inactivity; revivable.
    Dormant,
    /// Reached completion.
    Resolved,
    /// Failed or abandoned.
    Failed,
}

/// Priority of a thread, driving how likely it is to be featured next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl ThreadPriority {
    /// Ordinal value, Low = 0 through Urgent = 3.
    pub fn ordinal(self) -> u32 {
        match self {
            ThreadPriority::Low => 0,
            ThreadPriority::Medium => 1,
            ThreadPriority::High => 2,
            ThreadPriority::Urgent => 3,
        }
    }

    /// Weight used for weighted random selection (+1 so Low isn't zero).
    pub fn selection_weight(self) -> u32 {
        self.ordinal() + 1
    }
}

fn default_status() -> ThreadStatus {
    ThreadStatus::Active
}

fn default_priority() -> ThreadPriority {
    ThreadPriority::Medium
}

/// An ongoing narrative arc for a single actor.
///
/// Threads are created from AI output and mutated only through
/// [`ThreadUpdate`]s or scheduler aging. Serialized field names are the
/// wire/persistence contract, so AI-proposed threads deserialize directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryThread {
    #[serde(rename = "thread_id")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_status")]
    pub status: ThreadStatus,

    #[serde(rename = "progress_level", default)]
    progress: i32,

    #[serde(rename = "created_timestamp", default = "now_millis")]
    pub created_at_ms: u64,

    #[serde(rename = "last_update_timestamp", default = "now_millis")]
    pub last_updated_ms: u64,

    #[serde(default)]
    pub key_npcs: Vec<String>,

    #[serde(default)]
    pub key_locations: Vec<String>,

    #[serde(default)]
    pub current_objective: Option<String>,

    /// Arbitrary key-value state the narrative can lean on.
    #[serde(default)]
    pub thread_state: BTreeMap<String, String>,

    #[serde(default = "default_priority")]
    pub priority: ThreadPriority,

    /// Minimum encounters before this thread may be featured again.
    #[serde(default)]
    pub min_encounters_until_next: Option<u32>,

    /// Trigger hint, e.g. "near_village" or "night".
    #[serde(default)]
    pub trigger_condition: Option<String>,

    /// Append-only narrative log feeding future prompts.
    #[serde(default)]
    pub narrative_context: String,
}

impl StoryThread {
    /// Create a new active thread at zero progress.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            status: ThreadStatus::Active,
            progress: 0,
            created_at_ms: now,
            last_updated_ms: now,
            key_npcs: Vec::new(),
            key_locations: Vec::new(),
            current_objective: None,
            thread_state: BTreeMap::new(),
            priority: ThreadPriority::Medium,
            min_encounters_until_next: None,
            trigger_condition: None,
            narrative_context: String::new(),
        }
    }

    /// Current progress in [0, 10].
    pub fn progress(&self) -> i32 {
        self.progress
    }

    /// Set progress, clamped to [0, 10].
    pub fn set_progress(&mut self, progress: i32) {
        self.progress = progress.clamp(0, MAX_PROGRESS);
    }

    /// Add a progress delta, clamped to [0, 10].
    pub fn advance(&mut self, delta: i32) {
        self.set_progress(self.progress + delta);
    }

    /// Append to the narrative context log.
    pub fn append_context(&mut self, addition: &str) {
        if self.narrative_context.is_empty() {
            self.narrative_context = addition.to_string();
        } else {
            self.narrative_context.push(' ');
            self.narrative_context.push_str(addition);
        }
    }

    /// Refresh the last-updated timestamp.
    pub fn touch(&mut self) {
        self.last_updated_ms = now_millis();
    }

    pub fn is_active(&self) -> bool {
        self.status == ThreadStatus::Active
    }
}

/// An update to an existing thread, produced by AI output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadUpdate {
    pub thread_id: String,

    /// Progress delta, typically in [-10, 10].
    #[serde(default)]
    pub progress_change: i32,

    /// What happened to advance or affect this thread.
    #[serde(default)]
    pub narrative_update: Option<String>,

    #[serde(default)]
    pub status_change: Option<ThreadStatus>,

    #[serde(default)]
    pub priority_change: Option<ThreadPriority>,
}

impl ThreadUpdate {
    pub fn new(thread_id: impl Into<String>, progress_change: i32) -> Self {
        Self {
            thread_id: thread_id.into(),
            progress_change,
            narrative_update: None,
            status_change: None,
            priority_change: None,
        }
    }

    pub fn with_narrative(mut self, narrative: impl Into<String>) -> Self {
        self.narrative_update = Some(narrative.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_clamped() {
        let mut thread = StoryThread::new("t1", "The Broken Signal", "A tower still transmits");
        thread.advance(25);
        assert_eq!(thread.progress(), 10);
        thread.advance(-100);
        assert_eq!(thread.progress(), 0);
    }

    #[test]
    fn test_append_context() {
        let mut thread = StoryThread::new("t1", "Title", "Desc");
        thread.append_context("The scouts went north.");
        thread.append_context("They never returned.");
        assert_eq!(
            thread.narrative_context,
            "The scouts went north. They never returned."
        );
    }

    #[test]
    fn test_priority_weights() {
        assert_eq!(ThreadPriority::Low.selection_weight(), 1);
        assert_eq!(ThreadPriority::Medium.selection_weight(), 2);
        assert_eq!(ThreadPriority::High.selection_weight(), 3);
        assert_eq!(ThreadPriority::Urgent.selection_weight(), 4);
    }

    #[test]
    fn test_deserialize_partial_thread() {
        // The shape AI output proposes for a new thread.
        let json = r#"{
            "thread_id": "missing-caravan",
            "title": "The Missing Caravan",
            "description": "A supply caravan vanished on the salt road",
            "priority": "high",
            "current_objective": "Find the caravan's trail"
        }"#;
        let thread: StoryThread = serde_json::from_str(json).unwrap();
        assert_eq!(thread.id, "missing-caravan");
        assert_eq!(thread.status, ThreadStatus::Active);
        assert_eq!(thread.priority, ThreadPriority::High);
        assert_eq!(thread.progress(), 0);
        assert!(thread.created_at_ms > 0);
    }
}
