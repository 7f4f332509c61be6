//! Background generation worker and authoritative-thread pump.
//!
//! AI calls take seconds and must never block the world's authoritative
//! thread. Generation runs as a spawned task; the finished result is
//! delivered over a channel the authoritative thread drains on its own
//! schedule, so spawning stays a single-writer operation.

use crate::orchestrator::{Storyteller, StorytellingResult};
use crate::world::{ActorId, WorldSnapshot};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// A finished generation attempt. `result` is None when generation yielded
/// no encounter (no provider, all failed, or the actor was busy).
#[derive(Debug)]
pub struct GenerationEvent {
    pub actor_id: ActorId,
    pub result: Option<StorytellingResult>,
}

/// Submits generation work onto background tasks.
#[derive(Clone)]
pub struct GenerationWorker {
    storyteller: Arc<Storyteller>,
    tx: mpsc::UnboundedSender<GenerationEvent>,
}

/// Receives finished generations on the authoritative thread.
pub struct GenerationPump {
    rx: mpsc::UnboundedReceiver<GenerationEvent>,
}

/// Create a connected worker/pump pair around a storyteller.
pub fn generation_channel(storyteller: Arc<Storyteller>) -> (GenerationWorker, GenerationPump) {
    let (tx, rx) = mpsc::unbounded_channel();
    (GenerationWorker { storyteller, tx }, GenerationPump { rx })
}

impl GenerationWorker {
    /// Start a generation cycle for an actor in the background. Returns
    /// immediately; the result arrives through the pump.
    pub fn submit(&self, snapshot: WorldSnapshot) {
        let storyteller = Arc::clone(&self.storyteller);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let actor_id = snapshot.actor_id;
            let result = storyteller.generate(&snapshot).await;
            if tx.send(GenerationEvent { actor_id, result }).is_err() {
                warn!(%actor_id, "generation pump dropped before result delivery");
            }
        });
    }
}

impl GenerationPump {
    /// Non-blocking drain step for the authoritative thread's tick.
    pub fn try_next(&mut self) -> Option<GenerationEvent> {
        self.rx.try_recv().ok()
    }

    /// Await the next finished generation. None once every worker handle
    /// has been dropped.
    pub async fn next(&mut self) -> Option<GenerationEvent> {
        self.rx.recv().await
    }
}
