//! Top-level storytelling orchestrator.
//!
//! One generation cycle: resolve the actor's story state, ask the scheduler
//! for a focus thread, assemble the prompt, walk the provider chain in
//! priority order, apply the returned story updates, and persist. Provider
//! failures are logged and answered by substitution; exhausting the chain
//! yields "no result", which is a normal outcome rather than an error.

use crate::config::EngineConfig;
use crate::encounter::EncounterSpec;
use crate::prompt::PromptBuilder;
use crate::provider::{ChatProvider, Provider, StoryUpdates};
use crate::registry::EncounterRegistry;
use crate::request::StoryRequest;
use crate::story::scheduler::ThreadScheduler;
use crate::story::state::{EncounterSummary, PlayerStoryState, PENDING_OUTCOME};
use crate::story::store::StoryStore;
use crate::world::WorldSnapshot;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A successful generation: the encounter to execute plus the already
/// applied story updates.
#[derive(Debug, Clone)]
pub struct StorytellingResult {
    pub encounter: EncounterSpec,
    pub updates: StoryUpdates,
    /// Title of the thread this cycle advanced, if any.
    pub focus_thread: Option<String>,
}

/// Coordinates the full generation pipeline for all actors.
pub struct Storyteller {
    store: Arc<StoryStore>,
    registry: Arc<EncounterRegistry>,
    scheduler: ThreadScheduler,
    prompts: PromptBuilder,
    providers: Vec<Arc<dyn Provider>>,
    tone: String,
}

impl Storyteller {
    /// Build a storyteller wired to the configured providers.
    pub fn new(
        config: &EngineConfig,
        store: Arc<StoryStore>,
        registry: Arc<EncounterRegistry>,
    ) -> Self {
        let log_exchanges = config.logging.log_requests || config.logging.log_responses;
        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(ChatProvider::openai(
                config.providers.openai.clone(),
                log_exchanges,
            )),
            Arc::new(ChatProvider::anthropic(
                config.providers.anthropic.clone(),
                log_exchanges,
            )),
        ];

        Self {
            store,
            registry,
            scheduler: ThreadScheduler::new(&config.story),
            prompts: PromptBuilder::new(&config.lore),
            providers,
            tone: config.lore.tone.clone(),
        }
        .with_providers_sorted()
    }

    /// Replace the provider set (mock providers in tests, extra vendors).
    pub fn with_providers(mut self, providers: Vec<Arc<dyn Provider>>) -> Self {
        self.providers = providers;
        self.with_providers_sorted()
    }

    fn with_providers_sorted(mut self) -> Self {
        self.providers.sort_by_key(|provider| provider.priority());
        self
    }

    /// Names of providers currently available.
    pub fn available_providers(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|provider| provider.is_available())
            .map(|provider| provider.name())
            .collect()
    }

    pub fn has_available_provider(&self) -> bool {
        self.providers.iter().any(|provider| provider.is_available())
    }

    /// Run one generation cycle for an actor.
    ///
    /// Returns None for every non-success: no providers configured, all
    /// attempts failed, or the actor already has an active encounter.
    pub async fn generate(&self, snapshot: &WorldSnapshot) -> Option<StorytellingResult> {
        let actor_id = snapshot.actor_id;

        // Within one actor, generation is serialized by the registry
        // invariant: fail fast instead of queueing behind an open encounter.
        if self.registry.contains(actor_id) {
            warn!(%actor_id, "generation rejected: actor already has an active encounter");
            return None;
        }

        let entry = self.store.get_or_create(actor_id, &snapshot.actor_name).await;
        let mut state = entry.lock().await;

        // Housekeeping before selection.
        self.scheduler.age_all(&mut state);
        self.scheduler.cleanup(&mut state);

        let focus = self.scheduler.select_focus(&state);
        match &focus {
            Some(thread) => info!(%actor_id, thread = %thread.title, "focusing encounter on thread"),
            None => info!(%actor_id, "generating emergent encounter"),
        }

        let request = StoryRequest::from_state(snapshot.clone(), &state)
            .with_tone(self.tone.clone())
            .with_focus(focus.clone());
        let prompt = self.prompts.build_story_prompt(&request);

        let mut response = None;
        let mut any_available = false;
        for provider in &self.providers {
            if !provider.is_available() {
                debug!(provider = %provider.name(), "skipping unavailable provider");
                continue;
            }
            any_available = true;

            info!(provider = %provider.name(), "attempting generation");
            match provider.generate(&prompt).await {
                Ok(result) => {
                    info!(provider = %provider.name(), "generation succeeded");
                    response = Some(result);
                    break;
                }
                Err(e) => {
                    error!(provider = %provider.name(), error = %e,
                           "generation failed; trying next provider");
                }
            }
        }

        let response = match response {
            Some(response) => response,
            None => {
                if any_available {
                    error!(%actor_id, "all providers failed");
                } else {
                    info!(%actor_id, "no providers available");
                }
                return None;
            }
        };

        self.apply_updates(&mut state, &response.updates);

        // Best-effort durability: a failed save never rolls back the
        // in-memory state.
        if let Err(e) = self.store.save(&state).await {
            error!(%actor_id, error = %e, "failed to persist story state");
        }

        Some(StorytellingResult {
            encounter: response.encounter,
            updates: response.updates,
            focus_thread: focus.map(|thread| thread.title),
        })
    }

    /// Apply a response's story updates to the actor's state. Each item is
    /// independently fault-tolerant; one bad entry never blocks the rest.
    fn apply_updates(&self, state: &mut PlayerStoryState, updates: &StoryUpdates) {
        for update in &updates.thread_updates {
            if self.scheduler.apply_update(state, update) {
                info!(thread = %update.thread_id, "updated thread");
            } else {
                // Updates never create threads as a side effect.
                debug!(thread = %update.thread_id, "dropping update for unknown thread");
            }
        }

        for thread in &updates.new_threads {
            info!(thread = %thread.id, title = %thread.title, "created new thread");
            state.upsert_thread(thread.clone());
        }

        if let Some(ref summary_text) = updates.encounter_summary {
            let mut summary =
                EncounterSummary::new("ai_generated", summary_text.clone(), PENDING_OUTCOME);
            summary.key_choices = updates.key_choices.clone();
            state.record_encounter(summary);
        }
    }
}
