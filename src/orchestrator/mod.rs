//! Composition root: owns the canonical mission map and routes every
//! mutation through persistence and notification.

mod engine;
mod outbound;
mod signal;

pub use engine::MissionOrchestrator;
pub use outbound::{OutboundJob, OutboundQueue};
pub use signal::{ControlSignal, SignalHandle, SignalRegistry};
