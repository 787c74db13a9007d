//! The canonical in-memory record of one research mission.

mod context;
mod draft;
mod log;
mod note;
mod plan;
mod status;

pub use context::{ChatMessage, MissionContext, MissionParams, MissionSettings};
pub use draft::build_draft;
pub use log::{ExecutionLogEntry, LogStatus};
pub use note::{GoalEntry, GoalStatus, Note, SourceMetadata, SourceType, ThoughtEntry};
pub use plan::{ReportSection, ResearchPlan};
pub use status::MissionStatus;
