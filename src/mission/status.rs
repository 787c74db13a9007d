use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    #[default]
    Planning,
    Running,
    Completed,
    Failed,
    Paused,
    Stopped,
}

impl MissionStatus {
    pub fn allowed_transitions(&self) -> &'static [MissionStatus] {
        use MissionStatus::*;
        match self {
            Planning => &[Running, Paused, Completed, Failed, Stopped],
            Running => &[Completed, Failed, Paused, Stopped],
            Paused => &[Running, Failed, Stopped],
            // Terminal statuses change only through an external override,
            // which is outside this crate.
            Completed => &[],
            Failed => &[],
            Stopped => &[],
        }
    }

    pub fn can_transition_to(&self, target: MissionStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Planning | Self::Running)
    }

    pub fn can_resume(&self) -> bool {
        matches!(self, Self::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(MissionStatus::Planning.can_transition_to(MissionStatus::Running));
        assert!(MissionStatus::Running.can_transition_to(MissionStatus::Paused));
        assert!(MissionStatus::Paused.can_transition_to(MissionStatus::Running));
        assert!(MissionStatus::Running.can_transition_to(MissionStatus::Completed));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        assert!(MissionStatus::Completed.allowed_transitions().is_empty());
        assert!(MissionStatus::Failed.allowed_transitions().is_empty());
        assert!(MissionStatus::Stopped.allowed_transitions().is_empty());
        assert!(!MissionStatus::Completed.can_transition_to(MissionStatus::Running));
    }

    #[test]
    fn test_pause_resume_is_the_only_cycle() {
        assert!(MissionStatus::Paused.can_resume());
        assert!(!MissionStatus::Failed.can_resume());
        assert!(!MissionStatus::Running.can_resume());
    }
}
