//! Collaborator seams to the simulated world.
//!
//! The engine never talks to the world directly. It reads a
//! [`WorldSnapshot`] captured by the host at generation time, and pushes
//! mutations through the narrow [`WorldSink`] trait. Spawning itself is the
//! host's job; this crate only ever asks for despawns when cleaning up.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Stable identity of an actor in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    /// Generate a fresh random actor id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque handle to a world object spawned for an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle(pub u64);

/// Read-only context snapshot for one actor, captured by the host on the
/// authoritative thread before generation starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub actor_id: ActorId,
    pub actor_name: String,
    pub level: u32,
    pub health: f32,
    pub max_health: f32,
    pub biome: String,
    pub position: (i32, i32, i32),
    pub dimension: String,
    pub time_of_day: String,
    pub weather: String,
    /// Named location if the actor is near a known structure.
    pub named_location: Option<String>,
    /// Equipped items by slot ("mainhand", "head", ...).
    pub equipment: BTreeMap<String, String>,
    /// Rare or otherwise interesting carried items.
    pub notable_items: Vec<String>,
    pub nearby_actors: Vec<String>,
    /// Local challenge rating in [0,1].
    pub local_difficulty: f32,
}

impl WorldSnapshot {
    /// Create a minimal snapshot with sensible placeholder context.
    pub fn new(actor_id: ActorId, actor_name: impl Into<String>) -> Self {
        Self {
            actor_id,
            actor_name: actor_name.into(),
            level: 1,
            health: 20.0,
            max_health: 20.0,
            biome: "Ashen Flats".to_string(),
            position: (0, 64, 0),
            dimension: "overworld".to_string(),
            time_of_day: "day".to_string(),
            weather: "clear".to_string(),
            named_location: None,
            equipment: BTreeMap::new(),
            notable_items: Vec::new(),
            nearby_actors: Vec::new(),
            local_difficulty: 0.5,
        }
    }
}

/// Mutation sink back into the world, implemented by the host on the
/// authoritative thread.
pub trait WorldSink: Send + Sync {
    /// Remove a previously spawned world object.
    fn despawn(&self, handle: EntityHandle);
}
