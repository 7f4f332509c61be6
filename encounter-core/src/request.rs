//! Generation context assembly.
//!
//! A [`StoryRequest`] bundles the world snapshot with everything the story
//! state knows about the actor, ready for prompt assembly.

use crate::encounter::EncounterKind;
use crate::story::state::{EncounterSummary, PlayerStoryState};
use crate::story::thread::StoryThread;
use crate::world::WorldSnapshot;
use std::collections::BTreeMap;

/// How many recent encounters to carry into the prompt.
const RECENT_ENCOUNTER_COUNT: usize = 10;

/// All context for one generation cycle.
#[derive(Debug, Clone)]
pub struct StoryRequest {
    pub snapshot: WorldSnapshot,

    /// Compressed journey summary.
    pub narrative_summary: Option<String>,

    /// Most recent encounters, newest first.
    pub recent_encounters: Vec<EncounterSummary>,

    /// Currently active story arcs.
    pub active_threads: Vec<StoryThread>,

    pub faction_reputation: BTreeMap<String, i32>,

    pub traits: BTreeMap<String, String>,

    /// The thread this cycle should advance; None makes the encounter
    /// emergent.
    pub focus_thread: Option<StoryThread>,

    /// Narrative tone override ("grim_hope", "mysterious", ...).
    pub tone: Option<String>,

    /// Desired challenge in [0,1]; None falls back to the snapshot's local
    /// difficulty.
    pub desired_difficulty: Option<f32>,

    /// Preferred encounter kind; None means surprise.
    pub preferred_kind: Option<EncounterKind>,
}

impl StoryRequest {
    /// Build a request from a world snapshot and the actor's story state.
    pub fn from_state(snapshot: WorldSnapshot, state: &PlayerStoryState) -> Self {
        let narrative_summary = state
            .narrative_summary
            .clone()
            .or_else(|| Some(generate_narrative_summary(state)));

        Self {
            snapshot,
            narrative_summary,
            recent_encounters: state.recent_encounters(RECENT_ENCOUNTER_COUNT).to_vec(),
            active_threads: state.active_threads().into_iter().cloned().collect(),
            faction_reputation: state.reputation().clone(),
            traits: state.traits.clone(),
            focus_thread: None,
            tone: None,
            desired_difficulty: None,
            preferred_kind: None,
        }
    }

    pub fn with_focus(mut self, thread: Option<StoryThread>) -> Self {
        self.focus_thread = thread;
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    pub fn with_preferred_kind(mut self, kind: EncounterKind) -> Self {
        self.preferred_kind = Some(kind);
        self
    }

    /// The difficulty to aim for: the explicit wish, else the local rating.
    pub fn difficulty(&self) -> f32 {
        self.desired_difficulty
            .unwrap_or(self.snapshot.local_difficulty)
    }
}

/// Fallback journey summary when none has been generated yet.
fn generate_narrative_summary(state: &PlayerStoryState) -> String {
    if state.history().is_empty() {
        return "A newcomer to the wastes, their story yet to be written.".to_string();
    }
    format!(
        "Survivor with {} recorded encounters. Currently pursuing {} story threads.",
        state.history().len(),
        state.active_threads().len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::state::EncounterSummary;
    use crate::world::ActorId;

    #[test]
    fn test_newcomer_summary() {
        let actor = ActorId::new();
        let state = PlayerStoryState::new(actor, "Wren");
        let request = StoryRequest::from_state(WorldSnapshot::new(actor, "Wren"), &state);
        assert!(request
            .narrative_summary
            .as_deref()
            .unwrap()
            .contains("newcomer"));
        assert!(request.recent_encounters.is_empty());
    }

    #[test]
    fn test_summary_counts_history_and_threads() {
        let actor = ActorId::new();
        let mut state = PlayerStoryState::new(actor, "Wren");
        for i in 0..3 {
            state.record_encounter(EncounterSummary::new("combat", format!("E{i}"), "victory"));
        }
        state.upsert_thread(StoryThread::new("t1", "Arc", "desc"));

        let request = StoryRequest::from_state(WorldSnapshot::new(actor, "Wren"), &state);
        let summary = request.narrative_summary.unwrap();
        assert!(summary.contains('3'));
        assert!(summary.contains('1'));
        assert_eq!(request.active_threads.len(), 1);
    }

    #[test]
    fn test_recent_encounters_capped() {
        let actor = ActorId::new();
        let mut state = PlayerStoryState::new(actor, "Wren");
        for i in 0..25 {
            state.record_encounter(EncounterSummary::new("combat", format!("E{i}"), "victory"));
        }
        let request = StoryRequest::from_state(WorldSnapshot::new(actor, "Wren"), &state);
        assert_eq!(request.recent_encounters.len(), RECENT_ENCOUNTER_COUNT);
        // Newest first.
        assert_eq!(request.recent_encounters[0].description, "E24");
    }
}
