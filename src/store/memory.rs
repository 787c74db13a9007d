use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{MissionStore, PersistedMission};
use crate::error::{ConductorError, Result};

/// In-memory mission store. Backs tests and single-process deployments that
/// do not need durability.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<String, Value>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes fail, for exercising persistence-failure
    /// handling.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    pub fn snapshot(&self, mission_id: &str) -> Option<Value> {
        self.snapshots.lock().get(mission_id).cloned()
    }

    /// Plants a snapshot directly, bypassing the create/save paths. For
    /// setting up warm-from-store scenarios in tests.
    pub fn seed(&self, mission_id: impl Into<String>, snapshot: Value) {
        self.snapshots.lock().insert(mission_id.into(), snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }

    fn check_writable(&self) -> Result<()> {
        if *self.fail_writes.lock() {
            return Err(ConductorError::Persistence(
                "memory store write disabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MissionStore for MemoryStore {
    async fn create(&self, mission_id: &str, snapshot: Value) -> Result<()> {
        self.check_writable()?;
        let mut snapshots = self.snapshots.lock();
        if snapshots.contains_key(mission_id) {
            return Err(ConductorError::MissionAlreadyExists(mission_id.to_string()));
        }
        snapshots.insert(mission_id.to_string(), snapshot);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<PersistedMission>> {
        Ok(self
            .snapshots
            .lock()
            .iter()
            .map(|(id, snapshot)| PersistedMission {
                id: id.clone(),
                snapshot: snapshot.clone(),
            })
            .collect())
    }

    async fn save_snapshot(&self, mission_id: &str, snapshot: Value) -> Result<()> {
        self.check_writable()?;
        self.snapshots
            .lock()
            .insert(mission_id.to_string(), snapshot);
        Ok(())
    }
}
