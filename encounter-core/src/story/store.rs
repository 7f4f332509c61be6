//! Persistent story state store.
//!
//! One JSON document per actor, overwritten whole on every save. States are
//! cached in memory behind a per-actor lock so concurrent generation cycles
//! for different actors never contend; within one actor, holding the lock
//! across a mutation-plus-save keeps writes from interleaving.

use crate::story::state::PlayerStoryState;
use crate::world::ActorId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shared, per-actor-locked story state.
pub type SharedState = Arc<Mutex<PlayerStoryState>>;

/// The story state store.
pub struct StoryStore {
    dir: PathBuf,
    cache: RwLock<HashMap<ActorId, SharedState>>,
}

impl StoryStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "story state store opened");
        Ok(Self {
            dir,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn state_path(&self, actor_id: ActorId) -> PathBuf {
        self.dir.join(format!("{actor_id}.json"))
    }

    /// Get the cached state for an actor, loading from disk or creating
    /// fresh state on first contact.
    pub async fn get_or_create(&self, actor_id: ActorId, actor_name: &str) -> SharedState {
        // Fast path: already cached.
        if let Some(entry) = self.cache.read().await.get(&actor_id) {
            entry.lock().await.touch_seen();
            return Arc::clone(entry);
        }

        let mut cache = self.cache.write().await;
        // Someone else may have loaded it while we waited for the write lock.
        if let Some(entry) = cache.get(&actor_id) {
            entry.lock().await.touch_seen();
            return Arc::clone(entry);
        }

        let mut state = match self.load_state(actor_id).await {
            Some(state) => {
                debug!(%actor_id, "loaded story state from disk");
                state
            }
            None => {
                info!(%actor_id, actor_name, "created new story state");
                PlayerStoryState::new(actor_id, actor_name)
            }
        };
        state.touch_seen();

        let entry = Arc::new(Mutex::new(state));
        cache.insert(actor_id, Arc::clone(&entry));
        entry
    }

    async fn load_state(&self, actor_id: ActorId) -> Option<PlayerStoryState> {
        let path = self.state_path(actor_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(%actor_id, error = %e, "failed to read story state; starting fresh");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(%actor_id, error = %e, "failed to parse story state; starting fresh");
                None
            }
        }
    }

    /// Write one actor's state to disk, overwriting the whole document.
    ///
    /// Callers should hold the actor's lock while saving so concurrent
    /// saves for the same actor cannot interleave.
    pub async fn save(&self, state: &PlayerStoryState) -> Result<(), StoreError> {
        let path = self.state_path(state.actor_id);
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;
        debug!(actor_id = %state.actor_id, "saved story state");
        Ok(())
    }

    /// Save a cached actor's state. Returns false if the actor is not cached.
    pub async fn save_actor(&self, actor_id: ActorId) -> Result<bool, StoreError> {
        let entry = {
            let cache = self.cache.read().await;
            cache.get(&actor_id).cloned()
        };
        match entry {
            Some(entry) => {
                let state = entry.lock().await;
                self.save(&state).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Save every cached state; errors are logged per actor, not propagated.
    /// Returns how many states were written.
    pub async fn save_all(&self) -> usize {
        let entries: Vec<SharedState> = {
            let cache = self.cache.read().await;
            cache.values().cloned().collect()
        };

        let mut saved = 0;
        for entry in entries {
            let state = entry.lock().await;
            match self.save(&state).await {
                Ok(()) => saved += 1,
                Err(e) => error!(actor_id = %state.actor_id, error = %e, "failed to save story state"),
            }
        }
        info!(saved, "saved story states");
        saved
    }

    /// Save and evict an actor's state (session end).
    pub async fn unload(&self, actor_id: ActorId) {
        let entry = self.cache.write().await.remove(&actor_id);
        if let Some(entry) = entry {
            let state = entry.lock().await;
            if let Err(e) = self.save(&state).await {
                error!(%actor_id, error = %e, "failed to save story state on unload");
            }
        }
    }

    /// Number of cached actor states.
    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::state::EncounterSummary;

    #[tokio::test]
    async fn test_create_save_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let actor = ActorId::new();

        {
            let store = StoryStore::open(dir.path()).await.unwrap();
            let entry = store.get_or_create(actor, "Wren").await;
            {
                let mut state = entry.lock().await;
                state.record_encounter(EncounterSummary::new("combat", "Ambushed", "victory"));
                store.save(&state).await.unwrap();
            }
        }

        // A fresh store instance must read the same document back.
        let store = StoryStore::open(dir.path()).await.unwrap();
        let entry = store.get_or_create(actor, "Wren").await;
        let state = entry.lock().await;
        assert_eq!(state.actor_name, "Wren");
        assert_eq!(state.history().len(), 1);
    }

    #[tokio::test]
    async fn test_unload_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let actor = ActorId::new();

        let store = StoryStore::open(dir.path()).await.unwrap();
        {
            let entry = store.get_or_create(actor, "Moss").await;
            let mut state = entry.lock().await;
            state.adjust_reputation("Caravan League", 10);
        }
        store.unload(actor).await;
        assert_eq!(store.cached_count().await, 0);

        let entry = store.get_or_create(actor, "Moss").await;
        let state = entry.lock().await;
        assert_eq!(state.reputation().get("Caravan League"), Some(&35));
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back_to_fresh() {
        let dir = tempfile::TempDir::new().unwrap();
        let actor = ActorId::new();
        std::fs::write(dir.path().join(format!("{actor}.json")), "{not json").unwrap();

        let store = StoryStore::open(dir.path()).await.unwrap();
        let entry = store.get_or_create(actor, "Ash").await;
        let state = entry.lock().await;
        assert_eq!(state.actor_name, "Ash");
        assert!(state.history().is_empty());
    }
}
