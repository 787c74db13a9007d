//! Restart-resume behavior across a simulated process boundary: a second
//! orchestrator warmed from the same store must pick up exactly where the
//! first left off.

use std::sync::Arc;

use serde_json::json;

use research_conductor::mission::MissionParams;
use research_conductor::notification::RecordingNotifier;
use research_conductor::phase::{Phase, PhaseCheckpoint};
use research_conductor::store::{MemoryDocumentStore, MemoryStore};
use research_conductor::{ConductorConfig, MissionOrchestrator};

fn orchestrator_on(store: Arc<MemoryStore>) -> MissionOrchestrator {
    MissionOrchestrator::new(
        ConductorConfig::default(),
        store,
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(RecordingNotifier::new()),
    )
}

#[tokio::test]
async fn interrupted_phase_resumes_after_restart() {
    let store = Arc::new(MemoryStore::new());
    let first = orchestrator_on(store.clone());

    let mission = first
        .create_mission(MissionParams::new("Survey solid-state batteries"))
        .await
        .unwrap();

    first
        .mark_phase_completed(&mission.id, Phase::InitialAnalysis)
        .unwrap();
    first
        .mark_phase_completed(&mission.id, Phase::InitialResearch)
        .unwrap();
    first
        .save_phase_checkpoint(
            &mission.id,
            Phase::OutlineGeneration,
            PhaseCheckpoint::with_entry("draft_outline", json!(["1", "2"])),
        )
        .unwrap();
    first.flush().await;
    drop(first);

    let second = orchestrator_on(store);
    assert_eq!(second.warm_from_store().await.unwrap(), 1);

    // The half-finished outline wins over structured research, and completed
    // phases are never revisited.
    assert_eq!(
        second.next_phase(&mission.id).unwrap(),
        Phase::OutlineGeneration
    );

    let summary = second.checkpoint_summary(&mission.id).unwrap();
    assert_eq!(
        summary.completed_phases,
        vec![Phase::InitialAnalysis, Phase::InitialResearch]
    );
    assert_eq!(
        summary.checkpoints[&Phase::OutlineGeneration].extra["draft_outline"],
        json!(["1", "2"])
    );
}

#[tokio::test]
async fn checkpoint_merges_survive_restart() {
    let store = Arc::new(MemoryStore::new());
    let first = orchestrator_on(store.clone());
    let mission = first
        .create_mission(MissionParams::new("request"))
        .await
        .unwrap();

    first
        .save_phase_checkpoint(
            &mission.id,
            Phase::StructuredResearch,
            PhaseCheckpoint::with_entry("a", json!(1)),
        )
        .unwrap();
    first
        .save_phase_checkpoint(
            &mission.id,
            Phase::StructuredResearch,
            PhaseCheckpoint::with_entry("b", json!(2)),
        )
        .unwrap();
    first.flush().await;

    let second = orchestrator_on(store);
    second.warm_from_store().await.unwrap();

    let summary = second.checkpoint_summary(&mission.id).unwrap();
    let checkpoint = &summary.checkpoints[&Phase::StructuredResearch];
    assert_eq!(checkpoint.extra["a"], json!(1));
    assert_eq!(checkpoint.extra["b"], json!(2));
}

#[tokio::test]
async fn corrupt_snapshot_degrades_to_failed_record() {
    let store = Arc::new(MemoryStore::new());
    store.seed("m-broken", json!({"id": "m-broken", "status": 42}));

    let orchestrator = orchestrator_on(store);
    assert_eq!(orchestrator.warm_from_store().await.unwrap(), 1);

    let mission = orchestrator.get_mission("m-broken").unwrap();
    assert_eq!(
        mission.status,
        research_conductor::MissionStatus::Failed
    );
    assert!(mission.error_info.is_some());
}

#[tokio::test]
async fn legacy_snapshot_fields_are_backfilled_on_warm() {
    let store = Arc::new(MemoryStore::new());
    store.seed(
        "m-legacy",
        json!({
            "id": "m-legacy",
            "user_request": "old mission",
            "status": "paused",
            "notes": [{
                "note_id": "n1",
                "content": "text",
                "source_type": "web",
                "source_id": "https://example.com",
            }],
            "settings": {"document_group_id": "g1"},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
        }),
    );

    let orchestrator = orchestrator_on(store);
    orchestrator.warm_from_store().await.unwrap();

    let mission = orchestrator.get_mission("m-legacy").unwrap();
    assert!(mission.settings.use_web_search);
    assert!(mission.settings.use_local_rag);
    assert_eq!(mission.notes.len(), 1);
}
