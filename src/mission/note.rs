use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Web,
    Document,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Document => "document",
        }
    }
}

/// Provenance details attached to a note's source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceMetadata {
    pub title: Option<String>,
    /// True when the full page content was fetched, not just a snippet.
    pub fetched_full_content: bool,
    pub full_text: Option<String>,
    pub doc_id: Option<String>,
}

/// A piece of discovered content referencing a web page or stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub note_id: String,
    pub content: String,
    pub source_type: SourceType,
    pub source_id: String,
    #[serde(default = "default_relevant")]
    pub is_relevant: bool,
    #[serde(default)]
    pub source_metadata: SourceMetadata,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_relevant() -> bool {
    true
}

impl Note {
    pub fn new(
        content: impl Into<String>,
        source_type: SourceType,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            note_id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            source_type,
            source_id: source_id.into(),
            is_relevant: true,
            source_metadata: SourceMetadata::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.source_metadata = metadata;
        self
    }

    pub fn with_relevance(mut self, is_relevant: bool) -> Self {
        self.is_relevant = is_relevant;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Addressed,
    Obsolete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalEntry {
    pub goal_id: String,
    pub text: String,
    pub status: GoalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GoalEntry {
    pub fn new(text: impl Into<String>, source_agent: Option<String>) -> Self {
        Self {
            goal_id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            status: GoalStatus::Active,
            source_agent,
            created_at: Utc::now(),
        }
    }
}

/// Working-memory entry from one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtEntry {
    pub thought_id: String,
    pub agent_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ThoughtEntry {
    pub fn new(agent_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            thought_id: uuid::Uuid::new_v4().to_string(),
            agent_name: agent_name.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
