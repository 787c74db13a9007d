use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    #[default]
    Success,
    Failure,
    Warning,
    Running,
}

/// One step in the mission's append-only execution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub log_id: String,
    pub timestamp: DateTime<Utc>,
    pub agent_name: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_summary: Option<String>,
    pub status: LogStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_interactions: Option<Vec<String>>,
}

impl ExecutionLogEntry {
    pub fn new(agent_name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            log_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            agent_name: agent_name.into(),
            action: action.into(),
            input_summary: None,
            output_summary: None,
            status: LogStatus::Success,
            error_message: None,
            full_input: None,
            full_output: None,
            model_details: None,
            tool_calls: None,
            file_interactions: None,
        }
    }

    pub fn with_input_summary(mut self, summary: impl Into<String>) -> Self {
        self.input_summary = Some(summary.into());
        self
    }

    pub fn with_output_summary(mut self, summary: impl Into<String>) -> Self {
        self.output_summary = Some(summary.into());
        self
    }

    pub fn with_status(mut self, status: LogStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.status = LogStatus::Failure;
        self.error_message = Some(message.into());
        self
    }

    pub fn with_model_details(mut self, details: Value) -> Self {
        self.model_details = Some(details);
        self
    }
}
