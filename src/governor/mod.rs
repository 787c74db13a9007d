//! Bounded admission-permit pool, one per mission.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

use crate::error::{ConductorError, Result};

/// Gates all backend-bound work for a mission behind a counting-permit pool.
/// Pools are created lazily on first request and cached until the mission
/// reaches a terminal status; a paused mission resumed later either reuses
/// its cached pool or lazily recreates one.
pub struct ConcurrencyGovernor {
    pools: Mutex<HashMap<String, Arc<Semaphore>>>,
    global_max: i64,
}

impl ConcurrencyGovernor {
    pub fn new(global_max: i64) -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
            global_max,
        }
    }

    /// Per-mission capacity: half the global per-user ceiling so several
    /// missions can run at once, floor 3; 10 when the ceiling is unset.
    pub fn capacity_for(global_max: i64) -> usize {
        if global_max > 0 {
            (global_max / 2).max(3) as usize
        } else {
            10
        }
    }

    /// Gets or creates the permit pool for a mission. An explicit `limit`
    /// overrides the derived default on creation only.
    pub fn handle(&self, mission_id: &str, limit: Option<usize>) -> Arc<Semaphore> {
        let mut pools = self.pools.lock();
        pools
            .entry(mission_id.to_string())
            .or_insert_with(|| {
                let capacity = limit.unwrap_or_else(|| Self::capacity_for(self.global_max));
                info!(mission_id, capacity, "Created concurrency pool");
                Arc::new(Semaphore::new(capacity))
            })
            .clone()
    }

    /// Blocks until a slot frees; the permit returns its slot on drop.
    pub async fn acquire_capacity(
        &self,
        mission_id: &str,
        limit: Option<usize>,
    ) -> Result<OwnedSemaphorePermit> {
        let pool = self.handle(mission_id, limit);
        pool.acquire_owned()
            .await
            .map_err(|_| ConductorError::GovernorClosed(mission_id.to_string()))
    }

    /// Drops the cached pool. Outstanding permits stay valid until released.
    pub fn remove(&self, mission_id: &str) {
        if self.pools.lock().remove(mission_id).is_some() {
            debug!(mission_id, "Removed concurrency pool");
        }
    }

    pub fn has_pool(&self, mission_id: &str) -> bool {
        self.pools.lock().contains_key(mission_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rule() {
        assert_eq!(ConcurrencyGovernor::capacity_for(4), 3);
        assert_eq!(ConcurrencyGovernor::capacity_for(10), 5);
        assert_eq!(ConcurrencyGovernor::capacity_for(0), 10);
        assert_eq!(ConcurrencyGovernor::capacity_for(-2), 10);
        assert_eq!(ConcurrencyGovernor::capacity_for(1), 3);
    }

    #[tokio::test]
    async fn test_pool_cached_per_mission() {
        let governor = ConcurrencyGovernor::new(8);
        let a = governor.handle("m1", None);
        let b = governor.handle("m1", None);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.available_permits(), 4);
    }

    #[tokio::test]
    async fn test_explicit_limit_applies_on_creation_only() {
        let governor = ConcurrencyGovernor::new(8);
        let a = governor.handle("m1", Some(2));
        assert_eq!(a.available_permits(), 2);
        // Later limit is ignored for a cached pool.
        let b = governor.handle("m1", Some(7));
        assert_eq!(b.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_acquire_release_cycle() {
        let governor = ConcurrencyGovernor::new(0);
        let permit = governor.acquire_capacity("m1", Some(1)).await.unwrap();
        assert_eq!(governor.handle("m1", None).available_permits(), 0);
        drop(permit);
        assert_eq!(governor.handle("m1", None).available_permits(), 1);
    }

    #[tokio::test]
    async fn test_remove_then_lazy_recreate() {
        let governor = ConcurrencyGovernor::new(6);
        governor.handle("m1", None);
        governor.remove("m1");
        assert!(!governor.has_pool("m1"));
        let pool = governor.handle("m1", None);
        assert_eq!(pool.available_permits(), 3);
    }
}
