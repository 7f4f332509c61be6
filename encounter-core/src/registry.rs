//! Active-encounter registry and outcome reconciliation.
//!
//! The registry holds at most one in-progress encounter per actor. The
//! reconciler turns world events (entity removed, actor defeated, session
//! ended, explicit cancellation) into terminal outcomes, synthesizes an
//! [`EncounterSummary`] for each, and feeds it back into the story store -
//! closing the loop from generation into persistent narrative memory.

use crate::clock::now_millis;
use crate::encounter::{EncounterOutcome, EncounterSpec};
use crate::story::state::EncounterSummary;
use crate::story::store::StoryStore;
use crate::world::{ActorId, EntityHandle, WorldSink};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("actor {0} already has an active encounter")]
    AlreadyActive(ActorId),
}

/// An in-progress encounter. In-memory only; only its derived summary is
/// ever persisted.
#[derive(Debug, Clone)]
pub struct ActiveEncounter {
    pub actor_id: ActorId,
    pub actor_name: String,
    pub spec: EncounterSpec,
    /// Spawned world objects still alive.
    pub live_handles: HashSet<EntityHandle>,
    pub started_at_ms: u64,
    pub outcome: Option<EncounterOutcome>,
}

/// Tracks at most one active encounter per actor.
#[derive(Default)]
pub struct EncounterRegistry {
    inner: Mutex<HashMap<ActorId, ActiveEncounter>>,
}

impl EncounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new active encounter. A second registration for the same
    /// actor is rejected outright; the original is untouched.
    pub fn register(
        &self,
        actor_id: ActorId,
        actor_name: impl Into<String>,
        spec: EncounterSpec,
        handles: Vec<EntityHandle>,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.contains_key(&actor_id) {
            return Err(RegistryError::AlreadyActive(actor_id));
        }
        info!(%actor_id, title = %spec.title, entities = handles.len(), "encounter registered");
        inner.insert(
            actor_id,
            ActiveEncounter {
                actor_id,
                actor_name: actor_name.into(),
                spec,
                live_handles: handles.into_iter().collect(),
                started_at_ms: now_millis(),
                outcome: None,
            },
        );
        Ok(())
    }

    /// Whether an actor has an active encounter.
    pub fn contains(&self, actor_id: ActorId) -> bool {
        self.inner.lock().unwrap().contains_key(&actor_id)
    }

    /// Snapshot of an actor's active encounter.
    pub fn get(&self, actor_id: ActorId) -> Option<ActiveEncounter> {
        self.inner.lock().unwrap().get(&actor_id).cloned()
    }

    /// Remove and return an actor's encounter with its terminal outcome set.
    pub fn resolve(&self, actor_id: ActorId, outcome: EncounterOutcome) -> Option<ActiveEncounter> {
        let mut encounter = self.inner.lock().unwrap().remove(&actor_id)?;
        encounter.outcome = Some(outcome);
        info!(%actor_id, %outcome, "encounter resolved");
        Some(encounter)
    }

    /// Remove an actor's encounter without assigning an outcome.
    pub fn remove(&self, actor_id: ActorId) -> Option<ActiveEncounter> {
        self.inner.lock().unwrap().remove(&actor_id)
    }

    /// Record that a spawned handle is gone. Returns the number of handles
    /// still alive, or None if the handle belongs to no tracked encounter.
    pub fn mark_handle_removed(&self, actor_id: ActorId, handle: EntityHandle) -> Option<usize> {
        let mut inner = self.inner.lock().unwrap();
        let encounter = inner.get_mut(&actor_id)?;
        if !encounter.live_handles.remove(&handle) {
            return None;
        }
        Some(encounter.live_handles.len())
    }

    /// Actors with active encounters.
    pub fn actors(&self) -> Vec<ActorId> {
        self.inner.lock().unwrap().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Remove and return all encounters older than `max_age`.
    pub fn sweep_stale(&self, max_age: Duration) -> Vec<ActiveEncounter> {
        let cutoff = now_millis().saturating_sub(max_age.as_millis() as u64);
        let mut inner = self.inner.lock().unwrap();
        let stale_ids: Vec<ActorId> = inner
            .values()
            .filter(|encounter| encounter.started_at_ms < cutoff)
            .map(|encounter| encounter.actor_id)
            .collect();
        stale_ids
            .into_iter()
            .filter_map(|actor_id| inner.remove(&actor_id))
            .collect()
    }
}

/// Synthesize a history summary from a closed encounter.
pub fn summarize_encounter(
    encounter: &ActiveEncounter,
    outcome: EncounterOutcome,
) -> EncounterSummary {
    let description = if encounter.spec.description.is_empty() {
        encounter.spec.title.clone()
    } else {
        encounter.spec.description.clone()
    };
    let mut summary =
        EncounterSummary::new(encounter.spec.kind.as_str(), description, outcome.as_str());
    summary.key_entities = encounter.spec.entity_names();
    summary
}

/// Reconciles world events into encounter outcomes and story history.
pub struct OutcomeReconciler {
    registry: Arc<EncounterRegistry>,
    store: Arc<StoryStore>,
    sink: Arc<dyn WorldSink>,
}

impl OutcomeReconciler {
    pub fn new(
        registry: Arc<EncounterRegistry>,
        store: Arc<StoryStore>,
        sink: Arc<dyn WorldSink>,
    ) -> Self {
        Self {
            registry,
            store,
            sink,
        }
    }

    /// A spawned entity was removed or defeated. When the last handle of an
    /// actor's encounter falls, the encounter closes as a victory.
    pub async fn on_entity_removed(
        &self,
        actor_id: ActorId,
        handle: EntityHandle,
    ) -> Option<EncounterOutcome> {
        match self.registry.mark_handle_removed(actor_id, handle) {
            Some(0) => {
                let encounter = self.registry.resolve(actor_id, EncounterOutcome::Victory)?;
                self.record(encounter, EncounterOutcome::Victory).await;
                Some(EncounterOutcome::Victory)
            }
            Some(remaining) => {
                debug!(%actor_id, remaining, "encounter entity down");
                None
            }
            None => None,
        }
    }

    /// The actor was defeated mid-encounter. Takes precedence over any
    /// partial entity defeats.
    pub async fn on_actor_defeated(&self, actor_id: ActorId) -> Option<EncounterOutcome> {
        let encounter = self.registry.resolve(actor_id, EncounterOutcome::Defeat)?;
        self.record(encounter, EncounterOutcome::Defeat).await;
        Some(EncounterOutcome::Defeat)
    }

    /// The actor's session ended while an encounter was active.
    pub async fn on_session_ended(&self, actor_id: ActorId) -> Option<EncounterOutcome> {
        let encounter = self.registry.resolve(actor_id, EncounterOutcome::Fled)?;
        info!(%actor_id, "session ended with active encounter; closing as fled");
        self.record(encounter, EncounterOutcome::Fled).await;
        Some(EncounterOutcome::Fled)
    }

    /// Explicit external cancellation; despawns whatever is still alive.
    pub async fn cancel(&self, actor_id: ActorId) -> Option<EncounterOutcome> {
        let encounter = self.registry.resolve(actor_id, EncounterOutcome::Abandoned)?;
        for handle in &encounter.live_handles {
            self.sink.despawn(*handle);
        }
        self.record(encounter, EncounterOutcome::Abandoned).await;
        Some(EncounterOutcome::Abandoned)
    }

    /// Safety net: drop encounters that never reached a terminal event.
    /// Swept encounters despawn their leftovers but write no history.
    pub async fn sweep_stale(&self, max_age: Duration) -> usize {
        let stale = self.registry.sweep_stale(max_age);
        for encounter in &stale {
            warn!(actor_id = %encounter.actor_id, title = %encounter.spec.title,
                  "removing stale encounter");
            for handle in &encounter.live_handles {
                self.sink.despawn(*handle);
            }
        }
        stale.len()
    }

    /// Append the summary to the actor's history and persist, best effort.
    async fn record(&self, encounter: ActiveEncounter, outcome: EncounterOutcome) {
        let summary = summarize_encounter(&encounter, outcome);
        let entry = self
            .store
            .get_or_create(encounter.actor_id, &encounter.actor_name)
            .await;
        // Hold the actor lock across mutation and save so writes for the
        // same actor never interleave.
        let mut state = entry.lock().await;
        state.record_encounter(summary);
        if let Err(e) = self.store.save(&state).await {
            error!(actor_id = %encounter.actor_id, error = %e,
                   "failed to persist encounter outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::{EncounterEntity, EncounterKind, OutcomeTexts};

    fn sample_spec(title: &str) -> EncounterSpec {
        EncounterSpec {
            title: title.to_string(),
            description: format!("{title} description"),
            kind: EncounterKind::Combat,
            narrative_text: String::new(),
            entities: vec![EncounterEntity {
                entity_type: "raider".to_string(),
                name: "Dune Raider".to_string(),
                count: 2,
                hostile: true,
                health_modifier: 1.0,
                damage_modifier: 1.0,
                equipment: vec![],
            }],
            dialogue: vec![],
            outcomes: OutcomeTexts::default(),
        }
    }

    #[test]
    fn test_at_most_one_encounter() {
        let registry = EncounterRegistry::new();
        let actor = ActorId::new();
        let handles = vec![EntityHandle(1)];

        registry
            .register(actor, "Wren", sample_spec("First"), handles.clone())
            .unwrap();
        let second = registry.register(actor, "Wren", sample_spec("Second"), handles);
        assert!(matches!(second, Err(RegistryError::AlreadyActive(_))));

        // The original registration is untouched.
        assert_eq!(registry.get(actor).unwrap().spec.title, "First");
    }

    #[test]
    fn test_mark_handle_removed_counts_down() {
        let registry = EncounterRegistry::new();
        let actor = ActorId::new();
        registry
            .register(
                actor,
                "Wren",
                sample_spec("Ambush"),
                vec![EntityHandle(1), EntityHandle(2)],
            )
            .unwrap();

        assert_eq!(registry.mark_handle_removed(actor, EntityHandle(1)), Some(1));
        // Unknown handle is ignored.
        assert_eq!(registry.mark_handle_removed(actor, EntityHandle(99)), None);
        assert_eq!(registry.mark_handle_removed(actor, EntityHandle(2)), Some(0));
    }

    #[test]
    fn test_sweep_stale_only_removes_old() {
        let registry = EncounterRegistry::new();
        let fresh = ActorId::new();
        let old = ActorId::new();

        registry
            .register(fresh, "Wren", sample_spec("Fresh"), vec![])
            .unwrap();
        registry
            .register(old, "Moss", sample_spec("Old"), vec![EntityHandle(5)])
            .unwrap();
        {
            let mut inner = registry.inner.lock().unwrap();
            inner.get_mut(&old).unwrap().started_at_ms = now_millis() - 31 * 60 * 1000;
        }

        let swept = registry.sweep_stale(Duration::from_secs(30 * 60));
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].actor_id, old);
        assert!(registry.contains(fresh));
        assert!(!registry.contains(old));
    }

    #[test]
    fn test_summarize_uses_entity_names() {
        let actor = ActorId::new();
        let encounter = ActiveEncounter {
            actor_id: actor,
            actor_name: "Wren".to_string(),
            spec: sample_spec("Ambush"),
            live_handles: HashSet::new(),
            started_at_ms: now_millis(),
            outcome: None,
        };
        let summary = summarize_encounter(&encounter, EncounterOutcome::Victory);
        assert_eq!(summary.outcome, "victory");
        assert_eq!(summary.kind, "combat");
        assert_eq!(summary.key_entities, vec!["Dune Raider"]);
    }
}
