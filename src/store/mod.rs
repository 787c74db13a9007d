//! Persistence boundary: the opaque keyed document store and the
//! serialization rules for crossing into it.

mod documents;
mod memory;
mod migrate;
mod sanitize;

pub use documents::{CollectionGroup, DocumentRecord, DocumentStore, MemoryDocumentStore};
pub use memory::MemoryStore;
pub use migrate::migrate_snapshot;
pub use sanitize::scrub;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// One persisted mission snapshot as the store hands it back.
#[derive(Debug, Clone)]
pub struct PersistedMission {
    pub id: String,
    pub snapshot: Value,
}

/// Opaque store keyed by mission id. Snapshots are full state, written after
/// essentially every mutating operation; `load_all` warms memory once at
/// startup.
#[async_trait]
pub trait MissionStore: Send + Sync {
    async fn create(&self, mission_id: &str, snapshot: Value) -> Result<()>;
    async fn load_all(&self) -> Result<Vec<PersistedMission>>;
    async fn save_snapshot(&self, mission_id: &str, snapshot: Value) -> Result<()>;
}
