//! Push-notification channel streaming state changes to observers.

mod events;

pub use events::{EventKind, MissionEvent};

use async_trait::async_trait;

use crate::error::Result;

/// Outbound change channel. Pushes are fire-and-forget: delivery failures
/// are logged by the dispatcher and never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn push(&self, event: MissionEvent) -> Result<()>;
}

/// Test double that records every pushed event.
#[derive(Default)]
pub struct RecordingNotifier {
    events: parking_lot::Mutex<Vec<MissionEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MissionEvent> {
        self.events.lock().clone()
    }

    pub fn events_of_kind(&self, kind: EventKind) -> Vec<MissionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn push(&self, event: MissionEvent) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}
