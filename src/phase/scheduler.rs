use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Phase, PhaseCheckpoint};
use crate::mission::{LogStatus, MissionContext};

/// Walks the fixed order and returns the phase to execute next.
///
/// An incomplete phase with non-empty checkpoint data wins: it was started
/// and interrupted, so it resumes before the first never-started phase. A
/// phase already marked completed is never returned regardless of leftover
/// checkpoint content.
pub fn next_phase(mission: &MissionContext) -> Phase {
    for phase in Phase::ORDER {
        if mission.completed_phases.contains(&phase) {
            continue;
        }
        if let Some(checkpoint) = mission.checkpoints.get(&phase)
            && !checkpoint.is_empty()
        {
            info!(
                mission_id = %mission.id,
                phase = %phase,
                "Resuming in-progress phase"
            );
            return phase;
        }
    }

    for phase in Phase::ORDER {
        if !mission.completed_phases.contains(&phase) {
            return phase;
        }
    }

    Phase::Completed
}

/// Idempotent: recording an already-completed phase is a no-op. Insertion
/// order is preserved.
pub fn mark_completed(mission: &mut MissionContext, phase: Phase) {
    if !mission.completed_phases.contains(&phase) {
        mission.completed_phases.push(phase);
        debug!(mission_id = %mission.id, phase = %phase, "Phase completed");
    }
}

/// Shallow-merges `partial` into the phase's checkpoint, regardless of
/// completion state.
///
/// Caller precondition: only checkpoint phases intended to be completed. The
/// scheduler treats any non-empty checkpoint on an incomplete phase as an
/// interrupted phase and will resume it.
pub fn save_checkpoint(mission: &mut MissionContext, phase: Phase, partial: PhaseCheckpoint) {
    mission
        .checkpoints
        .entry(phase)
        .or_default()
        .merge(partial);
}

/// Everything an external caller needs to decide how to resume after a crash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub current_phase: Option<Phase>,
    pub completed_phases: Vec<Phase>,
    pub checkpoints: BTreeMap<Phase, PhaseCheckpoint>,
    pub has_plan: bool,
    pub notes_count: usize,
    pub sections_written: Vec<String>,
    pub last_activity: Option<LastActivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_research: Option<StructuredResearchProgress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastActivity {
    pub agent: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub status: LogStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredResearchProgress {
    pub completed_sections: Vec<String>,
    pub sections_in_progress: Vec<String>,
    pub total_sections: usize,
}

pub fn checkpoint_summary(mission: &MissionContext) -> CheckpointSummary {
    let last_activity = mission.last_log_entry().map(|entry| LastActivity {
        agent: entry.agent_name.clone(),
        action: entry.action.clone(),
        timestamp: entry.timestamp,
        status: entry.status,
    });

    let structured_research = match (mission.current_phase, &mission.plan) {
        (Some(Phase::StructuredResearch), Some(plan)) => {
            let checkpoint = mission
                .checkpoints
                .get(&Phase::StructuredResearch)
                .cloned()
                .unwrap_or_default();
            Some(StructuredResearchProgress {
                completed_sections: checkpoint.completed_sections,
                sections_in_progress: checkpoint.sections_in_progress.keys().cloned().collect(),
                total_sections: plan.section_count(),
            })
        }
        _ => None,
    };

    CheckpointSummary {
        current_phase: mission.current_phase,
        completed_phases: mission.completed_phases.clone(),
        checkpoints: mission.checkpoints.clone(),
        has_plan: mission.plan.is_some(),
        notes_count: mission.notes.len(),
        sections_written: mission.report_content.keys().cloned().collect(),
        last_activity,
        structured_research,
    }
}
