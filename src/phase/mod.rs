//! Fixed phase order and checkpoint-based resume.

mod checkpoint;
mod scheduler;

pub use checkpoint::PhaseCheckpoint;
pub use scheduler::{
    CheckpointSummary, LastActivity, StructuredResearchProgress, checkpoint_summary,
    mark_completed, next_phase, save_checkpoint,
};

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named stage in the mission's fixed execution order. The declaration
/// order is the execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InitialAnalysis,
    InitialResearch,
    OutlineGeneration,
    StructuredResearch,
    NotePreparation,
    Writing,
    TitleGeneration,
    CitationProcessing,
    Completed,
}

impl Phase {
    pub const ORDER: [Phase; 9] = [
        Phase::InitialAnalysis,
        Phase::InitialResearch,
        Phase::OutlineGeneration,
        Phase::StructuredResearch,
        Phase::NotePreparation,
        Phase::Writing,
        Phase::TitleGeneration,
        Phase::CitationProcessing,
        Phase::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialAnalysis => "initial_analysis",
            Self::InitialResearch => "initial_research",
            Self::OutlineGeneration => "outline_generation",
            Self::StructuredResearch => "structured_research",
            Self::NotePreparation => "note_preparation",
            Self::Writing => "writing",
            Self::TitleGeneration => "title_generation",
            Self::CitationProcessing => "citation_processing",
            Self::Completed => "completed",
        }
    }

    /// Terminal marker, not an executable phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_enum_ordering() {
        for pair in Phase::ORDER.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_only_completed_is_terminal() {
        for phase in Phase::ORDER {
            assert_eq!(phase.is_terminal(), phase == Phase::Completed);
        }
    }
}
