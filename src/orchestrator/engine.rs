use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Value, json};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::outbound::OutboundQueue;
use super::signal::{ControlSignal, SignalHandle, SignalRegistry};
use crate::artifact::ArtifactProcessor;
use crate::config::{CollectionConfig, ConductorConfig};
use crate::error::{ConductorError, Result};
use crate::governor::ConcurrencyGovernor;
use crate::mission::{
    ChatMessage, ExecutionLogEntry, GoalEntry, GoalStatus, MissionContext, MissionParams,
    MissionSettings, MissionStatus, Note, ResearchPlan, ThoughtEntry, build_draft,
};
use crate::notification::{EventKind, MissionEvent, Notifier};
use crate::phase::{self, CheckpointSummary, Phase, PhaseCheckpoint};
use crate::stats::{StatsAggregator, StatsSnapshot, UsageReport};
use crate::store::{CollectionGroup, DocumentStore, MissionStore, migrate_snapshot, scrub};

/// Owns the canonical in-memory mission per id and composes the governor,
/// aggregator, allocator and artifact processor behind one lifecycle API.
///
/// Every mutating operation bumps `updated_at` and enqueues a fire-and-forget
/// snapshot write plus a change notification; neither is rolled back into
/// memory on failure. Mission creation is the one exception: its store write
/// is awaited so a mission never exists in memory without a durable row.
pub struct MissionOrchestrator {
    config: ConductorConfig,
    missions: DashMap<String, MissionContext>,
    store: Arc<dyn MissionStore>,
    governor: ConcurrencyGovernor,
    stats: StatsAggregator,
    artifacts: ArtifactProcessor,
    signals: SignalRegistry,
    outbound: OutboundQueue,
}

impl MissionOrchestrator {
    /// Spawns the outbound supervisor on the current runtime.
    pub fn new(
        config: ConductorConfig,
        store: Arc<dyn MissionStore>,
        documents: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let governor = ConcurrencyGovernor::new(config.concurrency.max_concurrent_requests);
        let outbound = OutboundQueue::spawn(store.clone(), notifier);
        Self {
            config,
            missions: DashMap::new(),
            store,
            governor,
            stats: StatsAggregator::new(),
            artifacts: ArtifactProcessor::new(documents),
            signals: SignalRegistry::new(),
            outbound,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Creates a mission and awaits its store row. On store failure nothing
    /// is kept in memory and the error propagates.
    pub async fn create_mission(&self, params: MissionParams) -> Result<MissionContext> {
        let mission = MissionContext::new(params);
        let snapshot = scrub(serde_json::to_value(&mission)?);
        self.store.create(&mission.id, snapshot).await?;

        info!(mission_id = %mission.id, "Mission created");
        self.missions.insert(mission.id.clone(), mission.clone());
        self.emit(
            MissionEvent::new(EventKind::Status, &mission.id)
                .with_payload(json!({"status": mission.status.as_str()})),
        );
        Ok(mission)
    }

    pub fn get_mission(&self, mission_id: &str) -> Option<MissionContext> {
        let mission = self.missions.get(mission_id).map(|m| m.clone());
        if mission.is_none() {
            debug!(mission_id, "Mission not found");
        }
        mission
    }

    pub fn mission_ids(&self) -> Vec<String> {
        self.missions.iter().map(|m| m.key().clone()).collect()
    }

    /// Changes status along the allowed transition graph. `error` populates
    /// `error_info` only when failing; any other target clears it.
    pub fn update_status(
        &self,
        mission_id: &str,
        status: MissionStatus,
        error: Option<String>,
    ) -> Result<()> {
        let payload = self.mutate(mission_id, |mission| {
            if mission.status != status && !mission.status.can_transition_to(status) {
                return Err(ConductorError::InvalidStatusTransition {
                    from: mission.status.as_str().to_string(),
                    to: status.as_str().to_string(),
                });
            }
            mission.status = status;
            mission.error_info = if status == MissionStatus::Failed {
                error
            } else {
                None
            };
            Ok(json!({"status": status.as_str(), "error_info": mission.error_info}))
        })?;

        match status {
            MissionStatus::Paused => self.signals.raise(mission_id, ControlSignal::Pause),
            MissionStatus::Running => self.signals.clear(mission_id),
            MissionStatus::Stopped => self.signals.raise(mission_id, ControlSignal::Cancel),
            _ => {}
        }

        if status.is_terminal() {
            self.retire(mission_id);
        }

        info!(mission_id, status = %status, "Mission status updated");
        self.emit(MissionEvent::new(EventKind::Status, mission_id).with_payload(payload));
        Ok(())
    }

    /// Forces the mission to stopped regardless of transition legality,
    /// signals outstanding workers to cancel, and removes it from memory.
    /// Returns false for an unknown id. The checkpoints survive in the final
    /// snapshot for forensic inspection.
    pub fn evict(&self, mission_id: &str) -> bool {
        let Some((_, mut mission)) = self.missions.remove(mission_id) else {
            debug!(mission_id, "Evict requested for unknown mission");
            return false;
        };

        // Workers holding a handle clone keep seeing the cancel after the
        // registry entry is retired below.
        self.signals.raise(mission_id, ControlSignal::Cancel);
        mission.status = MissionStatus::Stopped;
        mission.update_timestamp();
        self.retire(mission_id);

        info!(mission_id, "Mission evicted");
        self.enqueue_persist(&mission);
        self.emit(
            MissionEvent::new(EventKind::Status, mission_id)
                .with_payload(json!({"status": "stopped", "evicted": true})),
        );
        true
    }

    fn retire(&self, mission_id: &str) {
        self.governor.remove(mission_id);
        self.artifacts.clear_mission(mission_id);
        self.stats.remove(mission_id);
        self.signals.remove(mission_id);
    }

    /// Captures run settings ahead of the first phase: tool selection,
    /// optional auto-created document collection, and an audit log entry.
    pub async fn prepare_start(
        &self,
        mission_id: &str,
        mut settings: MissionSettings,
    ) -> Result<MissionContext> {
        let user_request = self
            .read(mission_id, |mission| mission.user_request.clone())?;

        // A selected document group implies local retrieval even when the
        // caller forgot the flag.
        settings.use_local_rag = settings.use_local_rag || settings.document_group_id.is_some();

        if settings.auto_create_collection && settings.generated_collection_id.is_none() {
            let name = collection_name(&self.config.collection, &user_request);
            let group = CollectionGroup {
                id: Uuid::new_v4().to_string(),
                name: name.clone(),
                description: format!("Auto-created for mission {}", mission_id),
            };
            let group_id = group.id.clone();
            match self.artifacts.create_collection(group).await {
                Ok(()) => {
                    info!(mission_id, group_id = %group_id, group_name = %name, "Created mission collection");
                    settings.generated_collection_id = Some(group_id);
                    settings.generated_collection_name = Some(name);
                }
                Err(err) => {
                    warn!(mission_id, error = %err, "Collection creation failed, continuing without auto collection");
                    settings.auto_create_collection = false;
                }
            }
        }

        let mission = self.mutate(mission_id, |mission| {
            mission.settings = settings.clone();
            mission.metadata.insert(
                "tool_selection".to_string(),
                json!({
                    "use_web_search": settings.use_web_search,
                    "use_local_rag": settings.use_local_rag,
                    "document_group_id": settings.document_group_id,
                }),
            );
            mission.execution_log.push(
                ExecutionLogEntry::new("MissionControl", "Mission Start Preparation")
                    .with_input_summary(format!(
                        "web_search={}, local_rag={}, auto_collection={}",
                        settings.use_web_search,
                        settings.use_local_rag,
                        settings.auto_create_collection
                    ))
                    .with_output_summary("Settings captured"),
            );
            Ok(mission.clone())
        })?;

        self.emit(
            MissionEvent::new(EventKind::Log, mission_id)
                .with_payload(json!({"action": "Mission Start Preparation"})),
        );
        Ok(mission)
    }

    /// Rebuilds the in-memory mission map from persisted snapshots, applying
    /// the forward-compatible migration. A snapshot that no longer
    /// deserializes degrades to a minimal failed record instead of aborting
    /// the warm-up.
    pub async fn warm_from_store(&self) -> Result<usize> {
        let persisted = self.store.load_all().await?;
        let mut loaded = 0;
        for record in persisted {
            let migrated = migrate_snapshot(record.snapshot);
            let mission = match serde_json::from_value::<MissionContext>(migrated) {
                Ok(mission) => mission,
                Err(err) => {
                    warn!(mission_id = %record.id, error = %err, "Snapshot failed validation, degrading to failed record");
                    let mut fallback =
                        MissionContext::new(MissionParams::new("<unrecoverable snapshot>"));
                    fallback.id = record.id.clone();
                    fallback.status = MissionStatus::Failed;
                    fallback.error_info = Some(format!("Snapshot validation failed: {}", err));
                    fallback
                }
            };
            self.missions.insert(mission.id.clone(), mission);
            loaded += 1;
        }
        info!(count = loaded, "Warmed missions from store");
        Ok(loaded)
    }

    /// Waits for every persistence write and notification enqueued so far.
    pub async fn flush(&self) {
        self.outbound.flush().await;
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    pub fn update_phase(&self, mission_id: &str, phase: Phase) -> Result<()> {
        self.mutate(mission_id, |mission| {
            mission.current_phase = Some(phase);
            Ok(())
        })?;
        self.emit(
            MissionEvent::new(EventKind::Phase, mission_id)
                .with_payload(json!({"current_phase": phase.as_str()})),
        );
        Ok(())
    }

    pub fn mark_phase_completed(&self, mission_id: &str, phase: Phase) -> Result<()> {
        self.mutate(mission_id, |mission| {
            phase::mark_completed(mission, phase);
            Ok(())
        })?;
        self.emit(
            MissionEvent::new(EventKind::Phase, mission_id)
                .with_payload(json!({"completed_phase": phase.as_str()})),
        );
        Ok(())
    }

    pub fn save_phase_checkpoint(
        &self,
        mission_id: &str,
        phase: Phase,
        partial: PhaseCheckpoint,
    ) -> Result<()> {
        self.mutate(mission_id, |mission| {
            phase::save_checkpoint(mission, phase, partial);
            Ok(())
        })
    }

    pub fn next_phase(&self, mission_id: &str) -> Result<Phase> {
        self.read(mission_id, phase::next_phase)
    }

    pub fn checkpoint_summary(&self, mission_id: &str) -> Result<CheckpointSummary> {
        self.read(mission_id, phase::checkpoint_summary)
    }

    // ------------------------------------------------------------------
    // Plan, sections, report
    // ------------------------------------------------------------------

    /// Stores the research plan; a planning mission becomes running.
    pub fn store_plan(&self, mission_id: &str, plan: ResearchPlan) -> Result<()> {
        let payload = self.mutate(mission_id, |mission| {
            if mission.status == MissionStatus::Planning {
                mission.status = MissionStatus::Running;
            }
            let payload = json!({
                "mission_goal": plan.mission_goal,
                "section_count": plan.section_count(),
            });
            mission.plan = Some(plan);
            Ok(payload)
        })?;
        self.emit(MissionEvent::new(EventKind::Plan, mission_id).with_payload(payload));
        Ok(())
    }

    pub fn store_step_result(&self, mission_id: &str, step_id: &str, result: Value) -> Result<()> {
        self.mutate(mission_id, |mission| {
            mission.step_results.insert(step_id.to_string(), result);
            Ok(())
        })
    }

    /// Writes one section's content and streams the rebuilt draft.
    pub fn store_report_section(
        &self,
        mission_id: &str,
        section_id: &str,
        content: impl Into<String>,
    ) -> Result<()> {
        let draft = self.mutate(mission_id, |mission| {
            mission
                .report_content
                .insert(section_id.to_string(), content.into());
            Ok(build_draft(mission))
        })?;
        if let Some(draft) = draft {
            self.emit(
                MissionEvent::new(EventKind::Draft, mission_id)
                    .with_payload(json!({"draft": draft})),
            );
        }
        Ok(())
    }

    pub fn store_final_report(&self, mission_id: &str, report: impl Into<String>) -> Result<()> {
        let report = report.into();
        self.mutate(mission_id, |mission| {
            mission.final_report = Some(report.clone());
            Ok(())
        })?;
        self.emit(
            MissionEvent::new(EventKind::Draft, mission_id)
                .with_payload(json!({"final_report": report})),
        );
        Ok(())
    }

    pub fn draft(&self, mission_id: &str) -> Result<Option<String>> {
        self.read(mission_id, build_draft)
    }

    // ------------------------------------------------------------------
    // Notes and artifacts
    // ------------------------------------------------------------------

    pub async fn add_note(&self, mission_id: &str, note: Note) -> Result<()> {
        self.add_notes(mission_id, vec![note]).await.map(|_| ())
    }

    /// Appends notes and routes each through the artifact processor. Artifact
    /// failures are logged per note and never fail the append.
    pub async fn add_notes(&self, mission_id: &str, notes: Vec<Note>) -> Result<usize> {
        let added = notes.len();
        let mission = self.mutate(mission_id, |mission| {
            mission.notes.extend(notes.iter().cloned());
            Ok(mission.clone())
        })?;

        self.artifacts.process_batch(&mission, &notes).await;

        self.emit(
            MissionEvent::new(EventKind::Note, mission_id)
                .with_payload(json!({"added": added, "total": mission.notes.len()})),
        );
        Ok(added)
    }

    pub fn remove_notes(&self, mission_id: &str, note_ids: &[String]) -> Result<usize> {
        let (removed, total) = self.mutate(mission_id, |mission| {
            let before = mission.notes.len();
            mission.notes.retain(|n| !note_ids.contains(&n.note_id));
            Ok((before - mission.notes.len(), mission.notes.len()))
        })?;
        if removed > 0 {
            self.emit(
                MissionEvent::new(EventKind::Note, mission_id)
                    .with_payload(json!({"removed": removed, "total": total})),
            );
        }
        Ok(removed)
    }

    pub fn notes(&self, mission_id: &str) -> Result<Vec<Note>> {
        self.read(mission_id, |mission| mission.notes.clone())
    }

    // ------------------------------------------------------------------
    // Scratchpad, goals, thoughts
    // ------------------------------------------------------------------

    /// No-op (and no persistence traffic) when the content is unchanged.
    pub fn update_scratchpad(&self, mission_id: &str, content: Option<String>) -> Result<bool> {
        let unchanged = self.read(mission_id, |mission| mission.scratchpad == content)?;
        if unchanged {
            return Ok(false);
        }
        self.mutate(mission_id, |mission| {
            mission.scratchpad = content.clone();
            Ok(())
        })?;
        self.emit(
            MissionEvent::new(EventKind::Scratchpad, mission_id)
                .with_payload(json!({"scratchpad": content})),
        );
        Ok(true)
    }

    pub fn scratchpad(&self, mission_id: &str) -> Result<Option<String>> {
        self.read(mission_id, |mission| mission.scratchpad.clone())
    }

    pub fn add_goal(
        &self,
        mission_id: &str,
        text: impl Into<String>,
        source_agent: Option<String>,
    ) -> Result<GoalEntry> {
        let goal = GoalEntry::new(text, source_agent);
        self.mutate(mission_id, |mission| {
            mission.goal_pad.push(goal.clone());
            Ok(())
        })?;
        self.emit(
            MissionEvent::new(EventKind::Goal, mission_id)
                .with_payload(json!({"goal_id": goal.goal_id, "text": goal.text})),
        );
        Ok(goal)
    }

    /// Returns false when the goal id is unknown.
    pub fn update_goal_status(
        &self,
        mission_id: &str,
        goal_id: &str,
        status: GoalStatus,
    ) -> Result<bool> {
        let updated = self.mutate(mission_id, |mission| {
            match mission.goal_pad.iter_mut().find(|g| g.goal_id == goal_id) {
                Some(goal) => {
                    goal.status = status;
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;
        if updated {
            self.emit(
                MissionEvent::new(EventKind::Goal, mission_id)
                    .with_payload(json!({"goal_id": goal_id, "status": status})),
            );
        }
        Ok(updated)
    }

    pub fn edit_goal_text(
        &self,
        mission_id: &str,
        goal_id: &str,
        text: impl Into<String>,
    ) -> Result<bool> {
        let text = text.into();
        let updated = self.mutate(mission_id, |mission| {
            match mission.goal_pad.iter_mut().find(|g| g.goal_id == goal_id) {
                Some(goal) => {
                    goal.text = text.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;
        if updated {
            self.emit(
                MissionEvent::new(EventKind::Goal, mission_id)
                    .with_payload(json!({"goal_id": goal_id, "text": text})),
            );
        }
        Ok(updated)
    }

    pub fn active_goals(&self, mission_id: &str) -> Result<Vec<GoalEntry>> {
        self.read(mission_id, |mission| {
            mission.active_goals().into_iter().cloned().collect()
        })
    }

    pub fn add_thought(
        &self,
        mission_id: &str,
        agent_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<ThoughtEntry> {
        let thought = ThoughtEntry::new(agent_name, content);
        self.mutate(mission_id, |mission| {
            mission.thought_pad.push(thought.clone());
            Ok(())
        })?;
        self.emit(
            MissionEvent::new(EventKind::Thought, mission_id)
                .with_payload(json!({"thought_id": thought.thought_id})),
        );
        Ok(thought)
    }

    pub fn recent_thoughts(&self, mission_id: &str, limit: usize) -> Result<Vec<ThoughtEntry>> {
        self.read(mission_id, |mission| {
            mission.recent_thoughts(limit).to_vec()
        })
    }

    // ------------------------------------------------------------------
    // Metadata, history, log
    // ------------------------------------------------------------------

    pub fn update_metadata(
        &self,
        mission_id: &str,
        updates: serde_json::Map<String, Value>,
    ) -> Result<()> {
        self.mutate(mission_id, |mission| {
            for (key, value) in updates {
                mission.metadata.insert(key, value);
            }
            Ok(())
        })
    }

    pub fn update_writing_suggestions(
        &self,
        mission_id: &str,
        suggestions: Vec<Value>,
    ) -> Result<()> {
        self.mutate(mission_id, |mission| {
            mission.writing_suggestions = Some(suggestions);
            Ok(())
        })
    }

    pub fn add_message_to_history(
        &self,
        mission_id: &str,
        role: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<()> {
        self.mutate(mission_id, |mission| {
            mission.message_history.push(ChatMessage {
                role: role.into(),
                content: content.into(),
            });
            Ok(())
        })
    }

    /// Appends one execution-log entry. While the mission is paused or
    /// stopped only lifecycle control entries get through, so a worker
    /// winding down cannot flood the log.
    pub fn log_execution_step(&self, mission_id: &str, entry: ExecutionLogEntry) -> Result<bool> {
        let logged = self.mutate(mission_id, |mission| {
            let quiesced = matches!(
                mission.status,
                MissionStatus::Paused | MissionStatus::Stopped
            );
            if quiesced && !is_control_action(&entry.action) {
                debug!(mission_id = %mission.id, action = %entry.action, "Suppressed log entry while quiesced");
                return Ok(false);
            }
            mission.execution_log.push(entry.clone());
            Ok(true)
        })?;
        if logged {
            self.emit(
                MissionEvent::new(EventKind::Log, mission_id).with_payload(json!({
                    "agent_name": entry.agent_name,
                    "action": entry.action,
                    "status": entry.status,
                })),
            );
        }
        Ok(logged)
    }

    // ------------------------------------------------------------------
    // Stats and capacity
    // ------------------------------------------------------------------

    /// Applies a usage report through the dedup aggregator and writes the
    /// resulting snapshot into the mission. Returns None when the report was
    /// vacuous or suppressed as a duplicate.
    pub fn apply_usage(
        &self,
        mission_id: &str,
        usage: UsageReport,
        force: bool,
    ) -> Result<Option<StatsSnapshot>> {
        let Some(applied) = self.stats.apply(mission_id, usage, force) else {
            return Ok(None);
        };

        self.mutate(mission_id, |mission| {
            mission.stats = applied.snapshot;
            if let Some(audit) = applied.audit.clone() {
                mission.execution_log.push(audit);
            }
            Ok(())
        })?;

        self.emit(
            MissionEvent::new(EventKind::Stats, mission_id)
                .with_payload(json!(applied.snapshot)),
        );
        Ok(Some(applied.snapshot))
    }

    /// Counts one web search with the configured flat cost. Always forced:
    /// each call is a distinct billable event.
    pub fn increment_web_search(&self, mission_id: &str) -> Result<StatsSnapshot> {
        let usage = UsageReport {
            cost: Some(self.config.stats.web_search_cost_per_call),
            web_search_count: 1,
            call_id: Some(format!(
                "web_search_{}_{}",
                mission_id,
                Utc::now().timestamp_micros()
            )),
            ..UsageReport::default()
        };
        self.apply_usage(mission_id, usage, true)?
            .ok_or_else(|| ConductorError::Validation("web search increment was vacuous".into()))
    }

    /// Blocks until the mission's permit pool has a free slot. All
    /// backend-bound work goes through here.
    pub async fn acquire_capacity(
        &self,
        mission_id: &str,
        limit: Option<usize>,
    ) -> Result<OwnedSemaphorePermit> {
        self.governor.acquire_capacity(mission_id, limit).await
    }

    // ------------------------------------------------------------------
    // References and signals
    // ------------------------------------------------------------------

    pub fn simple_reference(&self, mission_id: &str, original_id: &str) -> Result<String> {
        self.mutate(mission_id, |mission| {
            Ok(mission.references.simple_id(original_id))
        })
    }

    pub fn original_reference(
        &self,
        mission_id: &str,
        simple_id: &str,
    ) -> Result<Option<String>> {
        self.read(mission_id, |mission| {
            mission.references.original_id(simple_id).map(String::from)
        })
    }

    /// Handle phase drivers poll for cooperative pause/cancel.
    pub fn signal_handle(&self, mission_id: &str) -> SignalHandle {
        self.signals.handle(mission_id)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn read<T>(&self, mission_id: &str, f: impl FnOnce(&MissionContext) -> T) -> Result<T> {
        let mission = self
            .missions
            .get(mission_id)
            .ok_or_else(|| ConductorError::MissionNotFound(mission_id.to_string()))?;
        Ok(f(mission.value()))
    }

    /// Runs `f` against the mission, bumps `updated_at`, and enqueues a
    /// snapshot write. The closure must not block or await.
    fn mutate<T>(
        &self,
        mission_id: &str,
        f: impl FnOnce(&mut MissionContext) -> Result<T>,
    ) -> Result<T> {
        let mut entry = self
            .missions
            .get_mut(mission_id)
            .ok_or_else(|| ConductorError::MissionNotFound(mission_id.to_string()))?;
        let result = f(entry.value_mut())?;
        entry.update_timestamp();
        self.enqueue_persist(entry.value());
        Ok(result)
    }

    fn enqueue_persist(&self, mission: &MissionContext) {
        match serde_json::to_value(mission) {
            Ok(snapshot) => self.outbound.persist(&mission.id, scrub(snapshot)),
            Err(err) => {
                warn!(mission_id = %mission.id, error = %err, "Snapshot serialization failed")
            }
        }
    }

    fn emit(&self, event: MissionEvent) {
        if self.config.notification.enabled {
            self.outbound.notify(event);
        }
    }
}

fn is_control_action(action: &str) -> bool {
    let action = action.to_ascii_lowercase();
    ["pause", "resume", "stop"]
        .iter()
        .any(|marker| action.contains(marker))
}

/// Collection name from the request's first line: prefixed, truncated to the
/// configured length with a trailing ellipsis.
fn collection_name(config: &CollectionConfig, user_request: &str) -> String {
    let first_line = user_request.lines().next().unwrap_or("").trim();
    let full = format!("{}{}", config.group_name_prefix, first_line);
    if full.chars().count() <= config.group_name_max_len {
        return full;
    }
    let keep = config.group_name_max_len.saturating_sub(3);
    let truncated: String = full.chars().take(keep).collect();
    format!("{}...", truncated)
}
