//! Per-actor persistent story state.

use crate::clock::now_millis;
use crate::story::thread::{StoryThread, ThreadPriority, ThreadStatus, ThreadUpdate, MAX_PROGRESS};
use crate::world::ActorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Encounter history is capped; the oldest entry is evicted past this.
pub const MAX_ENCOUNTER_HISTORY: usize = 100;

/// Faction reputation bounds.
pub const REPUTATION_MIN: i32 = -100;
pub const REPUTATION_MAX: i32 = 100;

/// Outcome sentinel for encounters that have not yet been reconciled.
pub const PENDING_OUTCOME: &str = "pending";

/// Compressed record of a past encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterSummary {
    #[serde(rename = "encounter_id")]
    pub id: String,

    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,

    #[serde(rename = "encounter_type")]
    pub kind: String,

    #[serde(rename = "brief_description")]
    pub description: String,

    pub outcome: String,

    /// Notable NPCs or entities involved.
    #[serde(default)]
    pub key_entities: Vec<String>,

    /// Important decisions the actor made.
    #[serde(default)]
    pub key_choices: Vec<String>,

    /// Thread id -> impact description.
    #[serde(default)]
    pub story_impact: BTreeMap<String, String>,
}

impl EncounterSummary {
    /// Create a summary with a fresh id and the current timestamp.
    pub fn new(
        kind: impl Into<String>,
        description: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp_ms: now_millis(),
            kind: kind.into(),
            description: description.into(),
            outcome: outcome.into(),
            key_entities: Vec::new(),
            key_choices: Vec::new(),
            story_impact: BTreeMap::new(),
        }
    }
}

/// Complete persistent story state for a single actor.
///
/// Owned exclusively by the [`StoryStore`](crate::story::store::StoryStore);
/// everything else gets at it through the store's per-actor lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStoryState {
    pub actor_id: ActorId,
    pub actor_name: String,

    #[serde(rename = "first_seen_timestamp")]
    pub first_seen_ms: u64,

    #[serde(rename = "last_seen_timestamp")]
    pub last_seen_ms: u64,

    /// Most-recent-first, capped at [`MAX_ENCOUNTER_HISTORY`].
    encounter_history: Vec<EncounterSummary>,

    /// AI-generated summary of the actor's journey so far.
    #[serde(default)]
    pub narrative_summary: Option<String>,

    /// Thread id -> thread. At most one entry per id.
    active_threads: BTreeMap<String, StoryThread>,

    /// Faction -> score, each clamped to [-100, 100].
    faction_reputation: BTreeMap<String, i32>,

    /// AI-inferred characteristics ("playstyle" -> "aggressive", ...).
    /// Advisory only.
    #[serde(rename = "player_traits", default)]
    pub traits: BTreeMap<String, String>,

    /// Learned encounter-type preferences ("combat" -> 0.8, ...).
    #[serde(default)]
    pub encounter_type_preferences: BTreeMap<String, f32>,
}

impl PlayerStoryState {
    /// Create fresh state for an actor, seeded with default faction standings.
    pub fn new(actor_id: ActorId, actor_name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            actor_id,
            actor_name: actor_name.into(),
            first_seen_ms: now,
            last_seen_ms: now,
            encounter_history: Vec::new(),
            narrative_summary: None,
            active_threads: BTreeMap::new(),
            faction_reputation: default_faction_reputation(),
            traits: BTreeMap::new(),
            encounter_type_preferences: BTreeMap::new(),
        }
    }

    /// Refresh the last-seen timestamp.
    pub fn touch_seen(&mut self) {
        self.last_seen_ms = now_millis();
    }

    // =========================================================================
    // Encounter history
    // =========================================================================

    /// Push a summary onto the front of history, evicting the oldest entry
    /// once the cap is exceeded.
    pub fn record_encounter(&mut self, summary: EncounterSummary) {
        self.encounter_history.insert(0, summary);
        self.encounter_history.truncate(MAX_ENCOUNTER_HISTORY);
    }

    /// Full history, most recent first.
    pub fn history(&self) -> &[EncounterSummary] {
        &self.encounter_history
    }

    /// The most recent `count` encounters.
    pub fn recent_encounters(&self, count: usize) -> &[EncounterSummary] {
        &self.encounter_history[..count.min(self.encounter_history.len())]
    }

    // =========================================================================
    // Threads
    // =========================================================================

    /// Insert or replace a thread keyed by its id (last write wins).
    pub fn upsert_thread(&mut self, thread: StoryThread) {
        self.active_threads.insert(thread.id.clone(), thread);
    }

    pub fn thread(&self, id: &str) -> Option<&StoryThread> {
        self.active_threads.get(id)
    }

    pub fn thread_mut(&mut self, id: &str) -> Option<&mut StoryThread> {
        self.active_threads.get_mut(id)
    }

    pub fn threads(&self) -> impl Iterator<Item = &StoryThread> {
        self.active_threads.values()
    }

    pub fn threads_mut(&mut self) -> impl Iterator<Item = &mut StoryThread> {
        self.active_threads.values_mut()
    }

    pub fn thread_count(&self) -> usize {
        self.active_threads.len()
    }

    /// Keep only threads satisfying the predicate; returns how many were
    /// removed.
    pub fn retain_threads(&mut self, mut keep: impl FnMut(&StoryThread) -> bool) -> usize {
        let before = self.active_threads.len();
        self.active_threads.retain(|_, thread| keep(thread));
        before - self.active_threads.len()
    }

    /// Threads currently in the Active status.
    pub fn active_threads(&self) -> Vec<&StoryThread> {
        self.active_threads
            .values()
            .filter(|thread| thread.is_active())
            .collect()
    }

    /// An active Urgent thread, if one exists.
    pub fn urgent_thread(&self) -> Option<&StoryThread> {
        self.active_threads
            .values()
            .find(|thread| thread.is_active() && thread.priority == ThreadPriority::Urgent)
    }

    /// Apply an AI-produced update to an existing thread.
    ///
    /// Returns false if the thread id is unknown; updates never create
    /// threads as a side effect.
    pub fn apply_update(&mut self, update: &ThreadUpdate) -> bool {
        let Some(thread) = self.active_threads.get_mut(&update.thread_id) else {
            return false;
        };

        thread.advance(update.progress_change);

        if let Some(ref narrative) = update.narrative_update {
            if !narrative.is_empty() {
                thread.append_context(narrative);
            }
        }

        if let Some(status) = update.status_change {
            thread.status = status;
        }
        if let Some(priority) = update.priority_change {
            thread.priority = priority;
        }

        // Full progress resolves the thread.
        if thread.progress() >= MAX_PROGRESS && thread.status == ThreadStatus::Active {
            thread.status = ThreadStatus::Resolved;
        }

        thread.touch();
        true
    }

    // =========================================================================
    // Reputation
    // =========================================================================

    /// Apply a relative reputation change, clamped to [-100, 100].
    pub fn adjust_reputation(&mut self, faction: &str, change: i32) {
        let current = self.faction_reputation.get(faction).copied().unwrap_or(0);
        self.faction_reputation.insert(
            faction.to_string(),
            (current + change).clamp(REPUTATION_MIN, REPUTATION_MAX),
        );
    }

    pub fn reputation(&self) -> &BTreeMap<String, i32> {
        &self.faction_reputation
    }
}

/// Default standings toward the factions of the Emberfall wastes.
fn default_faction_reputation() -> BTreeMap<String, i32> {
    let mut reputation = BTreeMap::new();
    reputation.insert("Haven Colonists".to_string(), 50);
    reputation.insert("Roaming Clans".to_string(), 0);
    reputation.insert("Salvage Guilds".to_string(), 0);
    reputation.insert("Caravan League".to_string(), 25);
    reputation.insert("Verdant Wardens".to_string(), 10);
    reputation.insert("Deepway Enclaves".to_string(), -10);
    reputation.insert("Hollow Cults".to_string(), -25);
    reputation.insert("The Withered".to_string(), -75);
    reputation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> PlayerStoryState {
        PlayerStoryState::new(ActorId::new(), "Wren")
    }

    #[test]
    fn test_default_factions_seeded() {
        let state = sample_state();
        assert_eq!(state.reputation().get("Haven Colonists"), Some(&50));
        assert_eq!(state.reputation().get("The Withered"), Some(&-75));
    }

    #[test]
    fn test_history_bounded() {
        let mut state = sample_state();
        for i in 0..=MAX_ENCOUNTER_HISTORY {
            state.record_encounter(EncounterSummary::new(
                "combat",
                format!("Encounter {i}"),
                "victory",
            ));
        }
        assert_eq!(state.history().len(), MAX_ENCOUNTER_HISTORY);
        // Newest stays at the front; the oldest was evicted.
        assert_eq!(
            state.history()[0].description,
            format!("Encounter {MAX_ENCOUNTER_HISTORY}")
        );
        assert!(state
            .history()
            .iter()
            .all(|summary| summary.description != "Encounter 0"));
    }

    #[test]
    fn test_reputation_clamped() {
        let mut state = sample_state();
        state.adjust_reputation("Salvage Guilds", 90);
        state.adjust_reputation("Salvage Guilds", 1000);
        assert_eq!(state.reputation().get("Salvage Guilds"), Some(&100));

        state.adjust_reputation("Hollow Cults", -1000);
        assert_eq!(state.reputation().get("Hollow Cults"), Some(&-100));
    }

    #[test]
    fn test_update_unknown_thread_dropped() {
        let mut state = sample_state();
        let applied = state.apply_update(&ThreadUpdate::new("nope", 2));
        assert!(!applied);
        assert_eq!(state.thread_count(), 0);
    }

    #[test]
    fn test_update_resolves_at_full_progress() {
        let mut state = sample_state();
        let mut thread = StoryThread::new("t1", "Title", "Desc");
        thread.set_progress(9);
        state.upsert_thread(thread);

        assert!(state.apply_update(&ThreadUpdate::new("t1", 3)));
        let thread = state.thread("t1").unwrap();
        assert_eq!(thread.progress(), 10);
        assert_eq!(thread.status, ThreadStatus::Resolved);
    }

    #[test]
    fn test_colliding_thread_id_overwrites() {
        let mut state = sample_state();
        state.upsert_thread(StoryThread::new("t1", "First", "Desc"));
        state.upsert_thread(StoryThread::new("t1", "Second", "Desc"));
        assert_eq!(state.thread_count(), 1);
        assert_eq!(state.thread("t1").unwrap().title, "Second");
    }

    #[test]
    fn test_roundtrip_serialization() {
        let mut state = sample_state();
        state.upsert_thread(StoryThread::new("t1", "Title", "Desc"));
        state.record_encounter(EncounterSummary::new("social", "Met a trader", "negotiated"));

        let json = serde_json::to_string(&state).unwrap();
        let back: PlayerStoryState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.actor_id, state.actor_id);
        assert_eq!(back.thread_count(), 1);
        assert_eq!(back.history().len(), 1);
    }
}
