//! Testing utilities for the encounter engine.
//!
//! Provides a scripted [`MockProvider`] for deterministic tests without API
//! calls, a [`RecordingSink`] that captures despawn requests, and sample
//! payload builders.

use crate::encounter::{EncounterEntity, EncounterKind, EncounterSpec, OutcomeTexts};
use crate::provider::{Provider, ProviderError, StoryResponse, StoryUpdates};
use crate::world::{ActorId, EntityHandle, WorldSink, WorldSnapshot};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A scripted outcome for one mock generation attempt.
enum MockOutcome {
    Success(StoryResponse),
    Failure(String),
}

/// A mock provider that returns scripted responses in order.
pub struct MockProvider {
    name: String,
    priority: u32,
    available: bool,
    script: Mutex<VecDeque<MockOutcome>>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create an available mock provider.
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
            available: true,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a provider that reports itself unavailable.
    pub fn unavailable(name: impl Into<String>, priority: u32) -> Self {
        Self {
            available: false,
            ..Self::new(name, priority)
        }
    }

    /// Queue a successful response.
    pub fn queue_success(self, response: StoryResponse) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(MockOutcome::Success(response));
        self
    }

    /// Queue a failure with the given message.
    pub fn queue_failure(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(MockOutcome::Failure(message.into()));
        self
    }

    /// How many times generate() was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(&self, _prompt: &str) -> Result<StoryResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(MockOutcome::Success(response)) => Ok(response),
            Some(MockOutcome::Failure(message)) => Err(ProviderError::MalformedJson(message)),
            None => Err(ProviderError::MalformedJson(
                "mock provider has no more scripted responses".to_string(),
            )),
        }
    }
}

/// A world sink that records every despawn request.
#[derive(Default)]
pub struct RecordingSink {
    despawned: Mutex<Vec<EntityHandle>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn despawned(&self) -> Vec<EntityHandle> {
        self.despawned.lock().unwrap().clone()
    }
}

impl WorldSink for RecordingSink {
    fn despawn(&self, handle: EntityHandle) {
        self.despawned.lock().unwrap().push(handle);
    }
}

/// A minimal valid encounter spec.
pub fn sample_spec(title: impl Into<String>) -> EncounterSpec {
    EncounterSpec {
        title: title.into(),
        description: "Raiders on the salt road".to_string(),
        kind: EncounterKind::Combat,
        narrative_text: "Dust rises along the ridge.".to_string(),
        entities: vec![EncounterEntity {
            entity_type: "raider".to_string(),
            name: "Dune Raider".to_string(),
            count: 2,
            hostile: true,
            health_modifier: 1.0,
            damage_modifier: 1.0,
            equipment: vec!["rusted blade".to_string()],
        }],
        dialogue: vec![],
        outcomes: OutcomeTexts {
            victory_text: Some("The raiders scatter.".to_string()),
            defeat_text: Some("Everything goes dark.".to_string()),
            flee_text: Some("You outrun them.".to_string()),
            negotiate_text: None,
        },
    }
}

/// A successful response around [`sample_spec`], with empty updates.
pub fn sample_response(title: impl Into<String>) -> StoryResponse {
    StoryResponse {
        encounter: sample_spec(title),
        updates: StoryUpdates::default(),
    }
}

/// A snapshot for a fresh test actor.
pub fn sample_snapshot(actor_name: impl Into<String>) -> WorldSnapshot {
    WorldSnapshot::new(ActorId::new(), actor_name)
}
