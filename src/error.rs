use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConductorError {
    #[error("Mission not found: {0}")]
    MissionNotFound(String),

    #[error("Mission already exists: {0}")]
    MissionAlreadyExists(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Concurrency governor unavailable for mission: {0}")]
    GovernorClosed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConductorError>;
