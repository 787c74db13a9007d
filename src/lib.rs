pub mod artifact;
pub mod config;
pub mod error;
pub mod governor;
pub mod mission;
pub mod notification;
pub mod orchestrator;
pub mod phase;
pub mod reference;
pub mod stats;
pub mod store;

pub use artifact::{ArtifactOutcome, ArtifactProcessor};
pub use config::ConductorConfig;
pub use error::{ConductorError, Result};
pub use governor::ConcurrencyGovernor;
pub use mission::{MissionContext, MissionParams, MissionSettings, MissionStatus, Note};
pub use notification::{EventKind, MissionEvent, Notifier, RecordingNotifier};
pub use orchestrator::{ControlSignal, MissionOrchestrator, SignalHandle};
pub use phase::{Phase, PhaseCheckpoint};
pub use reference::ReferenceMap;
pub use stats::{StatsAggregator, StatsSnapshot, UsageReport};
pub use store::{DocumentStore, MemoryDocumentStore, MemoryStore, MissionStore};
