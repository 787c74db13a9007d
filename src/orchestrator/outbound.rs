//! Outbound dispatch queue for persistence writes and notification pushes.
//!
//! Mutating orchestrator calls enqueue jobs and return immediately; a
//! supervisor task drains the queue in order, calling the store and the
//! notifier. Failures are logged and never retried, so in-memory state stays
//! authoritative and a flaky store cannot block mission progress.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::notification::{MissionEvent, Notifier};
use crate::store::MissionStore;

pub enum OutboundJob {
    Persist { mission_id: String, snapshot: Value },
    Notify(MissionEvent),
    /// Resolves once every job enqueued before it has been dispatched.
    Flush(oneshot::Sender<()>),
}

pub struct OutboundQueue {
    tx: mpsc::UnboundedSender<OutboundJob>,
    supervisor: JoinHandle<()>,
}

impl OutboundQueue {
    /// Spawns the supervisor on the current runtime.
    pub fn spawn(store: Arc<dyn MissionStore>, notifier: Arc<dyn Notifier>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = tokio::spawn(Self::drain(rx, store, notifier));
        Self { tx, supervisor }
    }

    async fn drain(
        mut rx: mpsc::UnboundedReceiver<OutboundJob>,
        store: Arc<dyn MissionStore>,
        notifier: Arc<dyn Notifier>,
    ) {
        while let Some(job) = rx.recv().await {
            match job {
                OutboundJob::Persist {
                    mission_id,
                    snapshot,
                } => {
                    if let Err(err) = store.save_snapshot(&mission_id, snapshot).await {
                        warn!(mission_id = %mission_id, error = %err, "Snapshot write failed");
                    }
                }
                OutboundJob::Notify(event) => {
                    let mission_id = event.mission_id.clone();
                    let kind = event.kind;
                    if let Err(err) = notifier.push(event).await {
                        warn!(
                            mission_id = %mission_id,
                            kind = kind.as_str(),
                            error = %err,
                            "Notification push failed"
                        );
                    }
                }
                OutboundJob::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("Outbound queue drained and closed");
    }

    /// Fire-and-forget. A closed queue (shutdown in progress) drops the job.
    pub fn enqueue(&self, job: OutboundJob) {
        if self.tx.send(job).is_err() {
            debug!("Outbound queue closed, dropping job");
        }
    }

    pub fn persist(&self, mission_id: impl Into<String>, snapshot: Value) {
        self.enqueue(OutboundJob::Persist {
            mission_id: mission_id.into(),
            snapshot,
        });
    }

    pub fn notify(&self, event: MissionEvent) {
        self.enqueue(OutboundJob::Notify(event));
    }

    /// Waits until everything enqueued so far has been dispatched. Used by
    /// callers that need a consistent store view, such as shutdown paths.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(OutboundJob::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

impl Drop for OutboundQueue {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{EventKind, RecordingNotifier};
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_persist_reaches_store_after_flush() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let queue = OutboundQueue::spawn(store.clone(), notifier);

        queue.persist("m1", json!({"id": "m1"}));
        queue.flush().await;

        assert_eq!(store.snapshot("m1"), Some(json!({"id": "m1"})));
    }

    #[tokio::test]
    async fn test_store_failure_is_absorbed() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let notifier = Arc::new(RecordingNotifier::new());
        let queue = OutboundQueue::spawn(store.clone(), notifier.clone());

        queue.persist("m1", json!({}));
        queue.notify(MissionEvent::new(EventKind::Status, "m1"));
        queue.flush().await;

        assert!(store.snapshot("m1").is_none());
        // The notification behind the failed write still goes out.
        assert_eq!(notifier.events().len(), 1);
    }

    #[tokio::test]
    async fn test_jobs_dispatch_in_order() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let queue = OutboundQueue::spawn(store.clone(), notifier);

        queue.persist("m1", json!({"rev": 1}));
        queue.persist("m1", json!({"rev": 2}));
        queue.flush().await;

        assert_eq!(store.snapshot("m1"), Some(json!({"rev": 2})));
    }
}
