use serde::{Deserialize, Serialize};

/// One node of the report outline tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub section_id: String,
    pub title: String,
    #[serde(default)]
    pub subsections: Vec<ReportSection>,
}

impl ReportSection {
    pub fn new(section_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            title: title.into(),
            subsections: Vec::new(),
        }
    }

    pub fn with_subsections(mut self, subsections: Vec<ReportSection>) -> Self {
        self.subsections = subsections;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPlan {
    pub mission_goal: String,
    #[serde(default)]
    pub report_outline: Vec<ReportSection>,
}

impl ResearchPlan {
    pub fn new(mission_goal: impl Into<String>) -> Self {
        Self {
            mission_goal: mission_goal.into(),
            report_outline: Vec::new(),
        }
    }

    pub fn with_outline(mut self, outline: Vec<ReportSection>) -> Self {
        self.report_outline = outline;
        self
    }

    /// Total section count across the whole outline tree.
    pub fn section_count(&self) -> usize {
        fn count(sections: &[ReportSection]) -> usize {
            sections
                .iter()
                .map(|s| 1 + count(&s.subsections))
                .sum()
        }
        count(&self.report_outline)
    }
}
