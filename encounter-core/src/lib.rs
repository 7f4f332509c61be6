//! AI-driven narrative encounter engine with persistent story arcs.
//!
//! This crate provides:
//! - A two-stage AI generation pipeline (narrative, then structured
//!   conversion) with provider fallback
//! - Per-actor story state: threads, reputation, bounded encounter history
//! - A thread scheduler deciding which arc the next encounter advances
//! - An active-encounter registry reconciling world events into outcomes
//!
//! # Quick Start
//!
//! ```ignore
//! use encounter_core::{
//!     generation_channel, EncounterRegistry, EngineConfig, Storyteller, StoryStore,
//!     WorldSnapshot,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::load("encounters.toml")?;
//!     let store = Arc::new(StoryStore::open("data/story/actors").await?);
//!     let registry = Arc::new(EncounterRegistry::new());
//!
//!     let storyteller = Arc::new(Storyteller::new(&config, store, registry));
//!     let (worker, mut pump) = generation_channel(storyteller);
//!
//!     worker.submit(WorldSnapshot::new(actor_id, "Wren"));
//!
//!     // On the authoritative thread:
//!     while let Some(event) = pump.next().await {
//!         if let Some(result) = event.result {
//!             // spawn result.encounter into the world
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod encounter;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod request;
pub mod story;
pub mod testing;
pub mod worker;
pub mod world;

mod clock;

// Primary public API
pub use config::{EngineConfig, LoreSettings, ProviderSettings, StorySettings};
pub use encounter::{EncounterKind, EncounterOutcome, EncounterSpec};
pub use orchestrator::{Storyteller, StorytellingResult};
pub use provider::{Provider, ProviderError, StoryResponse, StoryUpdates};
pub use registry::{ActiveEncounter, EncounterRegistry, OutcomeReconciler, RegistryError};
pub use request::StoryRequest;
pub use story::{
    EncounterSummary, PlayerStoryState, StoryStore, StoryThread, ThreadPriority, ThreadScheduler,
    ThreadStatus, ThreadUpdate,
};
pub use worker::{generation_channel, GenerationEvent, GenerationPump, GenerationWorker};
pub use world::{ActorId, EntityHandle, WorldSink, WorldSnapshot};
