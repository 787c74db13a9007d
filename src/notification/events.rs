use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Status,
    Phase,
    Plan,
    Draft,
    Note,
    Goal,
    Thought,
    Scratchpad,
    Log,
    Stats,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "mission.status",
            Self::Phase => "mission.phase",
            Self::Plan => "mission.plan",
            Self::Draft => "mission.draft",
            Self::Note => "mission.note",
            Self::Goal => "mission.goal",
            Self::Thought => "mission.thought",
            Self::Scratchpad => "mission.scratchpad",
            Self::Log => "mission.log",
            Self::Stats => "mission.stats",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionEvent {
    pub kind: EventKind,
    pub mission_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl MissionEvent {
    pub fn new(kind: EventKind, mission_id: impl Into<String>) -> Self {
        Self {
            kind,
            mission_id: mission_id.into(),
            created_at: Utc::now(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}
