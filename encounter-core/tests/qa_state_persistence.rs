//! QA tests for story state persistence across store lifetimes.

use encounter_core::testing::{sample_response, sample_snapshot, MockProvider};
use encounter_core::{
    EncounterRegistry, EncounterSummary, EngineConfig, Provider, StoryStore, StoryThread,
    Storyteller, ThreadPriority,
};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_generation_cycle_persists_state() {
    let dir = TempDir::new().unwrap();
    let snapshot = sample_snapshot("Wren");

    {
        let store = Arc::new(StoryStore::open(dir.path()).await.unwrap());
        let mut response = sample_response("Ambush");
        response.updates.encounter_summary = Some("Raiders on the road".to_string());
        let storyteller = Storyteller::new(
            &EngineConfig::default(),
            Arc::clone(&store),
            Arc::new(EncounterRegistry::new()),
        )
        .with_providers(vec![
            Arc::new(MockProvider::new("mock", 1).queue_success(response)) as Arc<dyn Provider>,
        ]);

        storyteller.generate(&snapshot).await.unwrap();
    }

    // A brand-new store over the same directory reads the state back.
    let store = StoryStore::open(dir.path()).await.unwrap();
    let entry = store.get_or_create(snapshot.actor_id, "Wren").await;
    let state = entry.lock().await;
    assert_eq!(state.history().len(), 1);
    assert_eq!(state.history()[0].description, "Raiders on the road");
}

#[tokio::test]
async fn test_save_all_covers_every_cached_actor() {
    let dir = TempDir::new().unwrap();
    let store = StoryStore::open(dir.path()).await.unwrap();

    let actors: Vec<_> = (0..3).map(|i| (sample_snapshot(format!("Actor{i}")), i)).collect();
    for (snapshot, i) in &actors {
        let entry = store.get_or_create(snapshot.actor_id, &snapshot.actor_name).await;
        let mut state = entry.lock().await;
        state.record_encounter(EncounterSummary::new("social", format!("E{i}"), "negotiated"));
    }

    assert_eq!(store.save_all().await, 3);

    let reopened = StoryStore::open(dir.path()).await.unwrap();
    for (snapshot, _) in &actors {
        let entry = reopened
            .get_or_create(snapshot.actor_id, &snapshot.actor_name)
            .await;
        let state = entry.lock().await;
        assert_eq!(state.history().len(), 1);
    }
}

#[tokio::test]
async fn test_thread_state_survives_reload() {
    let dir = TempDir::new().unwrap();
    let snapshot = sample_snapshot("Wren");

    {
        let store = StoryStore::open(dir.path()).await.unwrap();
        let entry = store.get_or_create(snapshot.actor_id, "Wren").await;
        {
            let mut state = entry.lock().await;
            let mut thread = StoryThread::new("arc", "The Long Arc", "desc");
            thread.set_progress(6);
            thread.priority = ThreadPriority::High;
            thread.append_context("It began at the crossing.");
            state.upsert_thread(thread);
            state.adjust_reputation("Caravan League", -40);
        }
        store.save_actor(snapshot.actor_id).await.unwrap();
    }

    let store = StoryStore::open(dir.path()).await.unwrap();
    let entry = store.get_or_create(snapshot.actor_id, "Wren").await;
    let state = entry.lock().await;

    let thread = state.thread("arc").unwrap();
    assert_eq!(thread.progress(), 6);
    assert_eq!(thread.priority, ThreadPriority::High);
    assert_eq!(thread.narrative_context, "It began at the crossing.");
    assert_eq!(state.reputation().get("Caravan League"), Some(&-15));
}
