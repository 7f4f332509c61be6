//! QA tests for outcome reconciliation: world events closing encounters and
//! feeding summaries back into story history.

use encounter_core::testing::{sample_spec, RecordingSink};
use encounter_core::{
    ActorId, EncounterOutcome, EncounterRegistry, EntityHandle, OutcomeReconciler, StoryStore,
    WorldSink,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    store: Arc<StoryStore>,
    registry: Arc<EncounterRegistry>,
    sink: Arc<RecordingSink>,
    reconciler: OutcomeReconciler,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(StoryStore::open(dir.path()).await.unwrap());
    let registry = Arc::new(EncounterRegistry::new());
    let sink = Arc::new(RecordingSink::new());
    let reconciler = OutcomeReconciler::new(
        Arc::clone(&registry),
        Arc::clone(&store),
        Arc::clone(&sink) as Arc<dyn WorldSink>,
    );
    Fixture {
        _dir: dir,
        store,
        registry,
        sink,
        reconciler,
    }
}

async fn history_outcomes(store: &StoryStore, actor_id: ActorId) -> Vec<String> {
    let entry = store.get_or_create(actor_id, "Wren").await;
    let state = entry.lock().await;
    state
        .history()
        .iter()
        .map(|summary| summary.outcome.clone())
        .collect()
}

#[tokio::test]
async fn test_all_entities_down_is_victory() {
    let f = fixture().await;
    let actor = ActorId::new();
    f.registry
        .register(
            actor,
            "Wren",
            sample_spec("Ambush"),
            vec![EntityHandle(1), EntityHandle(2)],
        )
        .unwrap();

    // First entity down: encounter still open.
    assert!(f
        .reconciler
        .on_entity_removed(actor, EntityHandle(1))
        .await
        .is_none());
    assert!(f.registry.contains(actor));

    // Last entity down: victory, summary appended.
    let outcome = f.reconciler.on_entity_removed(actor, EntityHandle(2)).await;
    assert_eq!(outcome, Some(EncounterOutcome::Victory));
    assert!(!f.registry.contains(actor));
    assert_eq!(history_outcomes(&f.store, actor).await, vec!["victory"]);
}

#[tokio::test]
async fn test_actor_defeat_takes_precedence() {
    let f = fixture().await;
    let actor = ActorId::new();
    f.registry
        .register(
            actor,
            "Wren",
            sample_spec("Overrun"),
            vec![EntityHandle(1), EntityHandle(2)],
        )
        .unwrap();

    // One entity already down, then the actor falls.
    let _ = f.reconciler.on_entity_removed(actor, EntityHandle(1)).await;
    let outcome = f.reconciler.on_actor_defeated(actor).await;
    assert_eq!(outcome, Some(EncounterOutcome::Defeat));
    assert_eq!(history_outcomes(&f.store, actor).await, vec!["defeat"]);

    // Late entity event after the close is a no-op.
    assert!(f
        .reconciler
        .on_entity_removed(actor, EntityHandle(2))
        .await
        .is_none());
}

#[tokio::test]
async fn test_session_end_records_fled_exactly_once() {
    let f = fixture().await;
    let actor = ActorId::new();
    f.registry
        .register(actor, "Wren", sample_spec("Standoff"), vec![EntityHandle(9)])
        .unwrap();

    let outcome = f.reconciler.on_session_ended(actor).await;
    assert_eq!(outcome, Some(EncounterOutcome::Fled));

    // A duplicate logout event must not produce a second summary.
    assert!(f.reconciler.on_session_ended(actor).await.is_none());
    assert_eq!(history_outcomes(&f.store, actor).await, vec!["fled"]);
}

#[tokio::test]
async fn test_session_end_without_encounter_is_noop() {
    let f = fixture().await;
    let actor = ActorId::new();
    assert!(f.reconciler.on_session_ended(actor).await.is_none());
    assert_eq!(history_outcomes(&f.store, actor).await, Vec::<String>::new());
}

#[tokio::test]
async fn test_cancel_despawns_and_records_abandoned() {
    let f = fixture().await;
    let actor = ActorId::new();
    f.registry
        .register(
            actor,
            "Wren",
            sample_spec("Interrupted"),
            vec![EntityHandle(3), EntityHandle(4)],
        )
        .unwrap();

    let outcome = f.reconciler.cancel(actor).await;
    assert_eq!(outcome, Some(EncounterOutcome::Abandoned));

    let mut despawned = f.sink.despawned();
    despawned.sort_by_key(|handle| handle.0);
    assert_eq!(despawned, vec![EntityHandle(3), EntityHandle(4)]);
    assert_eq!(history_outcomes(&f.store, actor).await, vec!["abandoned"]);
}

#[tokio::test]
async fn test_stale_sweep_despawns_without_history() {
    let f = fixture().await;
    let actor = ActorId::new();
    f.registry
        .register(actor, "Wren", sample_spec("Forgotten"), vec![EntityHandle(7)])
        .unwrap();

    // Zero max-age makes everything stale once any time has passed.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let swept = f.reconciler.sweep_stale(Duration::ZERO).await;
    assert_eq!(swept, 1);
    assert!(!f.registry.contains(actor));
    assert_eq!(f.sink.despawned(), vec![EntityHandle(7)]);
    // Staleness is not a narrative outcome; no summary is written.
    assert_eq!(history_outcomes(&f.store, actor).await, Vec::<String>::new());
}

#[tokio::test]
async fn test_victory_summary_carries_entity_names() {
    let f = fixture().await;
    let actor = ActorId::new();
    f.registry
        .register(actor, "Wren", sample_spec("Ambush"), vec![EntityHandle(1)])
        .unwrap();

    let _ = f.reconciler.on_entity_removed(actor, EntityHandle(1)).await;

    let entry = f.store.get_or_create(actor, "Wren").await;
    let state = entry.lock().await;
    let summary = &state.history()[0];
    assert_eq!(summary.kind, "combat");
    assert_eq!(summary.key_entities, vec!["Dune Raider"]);
    assert_eq!(summary.description, "Raiders on the salt road");
}
