use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ExecutionLogEntry, GoalEntry, MissionStatus, Note, ResearchPlan, ThoughtEntry};
use crate::phase::{Phase, PhaseCheckpoint};
use crate::reference::ReferenceMap;
use crate::stats::StatsSnapshot;

/// Holds the full state of a single research mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionContext {
    pub id: String,
    pub user_request: String,
    pub status: MissionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ResearchPlan>,

    #[serde(default)]
    pub step_results: HashMap<String, Value>,

    #[serde(default)]
    pub notes: Vec<Note>,

    /// section_id -> written content.
    #[serde(default)]
    pub report_content: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_report: Option<String>,

    #[serde(default)]
    pub message_history: Vec<ChatMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratchpad: Option<String>,

    #[serde(default)]
    pub execution_log: Vec<ExecutionLogEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writing_suggestions: Option<Vec<Value>>,

    #[serde(default)]
    pub goal_pad: Vec<GoalEntry>,

    #[serde(default)]
    pub thought_pad: Vec<ThoughtEntry>,

    /// Open escape hatch for fields no schema anticipates.
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,

    #[serde(default)]
    pub settings: MissionSettings,

    #[serde(default)]
    pub stats: StatsSnapshot,

    #[serde(default)]
    pub references: ReferenceMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<Phase>,

    /// Insertion-ordered, each phase at most once.
    #[serde(default)]
    pub completed_phases: Vec<Phase>,

    #[serde(default)]
    pub checkpoints: BTreeMap<Phase, PhaseCheckpoint>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MissionContext {
    pub fn new(params: MissionParams) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_request: params.user_request,
            status: MissionStatus::Planning,
            plan: None,
            step_results: HashMap::new(),
            notes: Vec::new(),
            report_content: HashMap::new(),
            final_report: None,
            message_history: Vec::new(),
            error_info: None,
            scratchpad: None,
            execution_log: Vec::new(),
            writing_suggestions: None,
            goal_pad: Vec::new(),
            thought_pad: Vec::new(),
            metadata: serde_json::Map::new(),
            settings: params.settings,
            stats: StatsSnapshot::default(),
            references: ReferenceMap::default(),
            current_phase: None,
            completed_phases: Vec::new(),
            checkpoints: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn update_timestamp(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn active_goals(&self) -> Vec<&GoalEntry> {
        self.goal_pad
            .iter()
            .filter(|g| g.status == super::GoalStatus::Active)
            .collect()
    }

    pub fn recent_thoughts(&self, limit: usize) -> &[ThoughtEntry] {
        let start = self.thought_pad.len().saturating_sub(limit);
        &self.thought_pad[start..]
    }

    pub fn last_log_entry(&self) -> Option<&ExecutionLogEntry> {
        self.execution_log.last()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Settings captured when a mission starts. Typed for the fields whose shape
/// is known; everything else goes through `MissionContext::metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionSettings {
    pub use_web_search: bool,
    pub use_local_rag: bool,
    /// Collection the mission searches from, if the owner selected one.
    pub document_group_id: Option<String>,
    pub document_group_name: Option<String>,
    /// When set, discovered artifacts are externalized into an auto-created
    /// collection identified by `generated_collection_id`.
    pub auto_create_collection: bool,
    pub generated_collection_id: Option<String>,
    pub generated_collection_name: Option<String>,
    pub research_params: Option<Value>,
    pub llm_config: Option<Value>,
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            use_web_search: true,
            use_local_rag: false,
            document_group_id: None,
            document_group_name: None,
            auto_create_collection: false,
            generated_collection_id: None,
            generated_collection_name: None,
            research_params: None,
            llm_config: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MissionParams {
    pub user_request: String,
    pub settings: MissionSettings,
}

impl MissionParams {
    pub fn new(user_request: impl Into<String>) -> Self {
        Self {
            user_request: user_request.into(),
            settings: MissionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: MissionSettings) -> Self {
        self.settings = settings;
        self
    }
}
