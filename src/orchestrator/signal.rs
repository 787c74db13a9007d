//! Cooperative pause/cancel signalling for phase drivers.
//!
//! Phase drivers poll their mission's handle between sub-operations; there is
//! no hard kill. Eviction raises cancel synchronously before the mission
//! leaves memory so in-flight workers observe it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use dashmap::DashMap;

const IDLE: u8 = 0;
const PAUSE: u8 = 1;
const CANCEL: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Pause,
    Cancel,
}

/// Shared flag for one mission. Cheap to clone into workers.
#[derive(Clone, Default)]
pub struct SignalHandle {
    state: Arc<AtomicU8>,
}

impl SignalHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, signal: ControlSignal) {
        let value = match signal {
            ControlSignal::Pause => PAUSE,
            ControlSignal::Cancel => CANCEL,
        };
        // Cancel dominates: a pause raised after a cancel must not mask it.
        self.state.fetch_max(value, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.state.store(IDLE, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<ControlSignal> {
        match self.state.load(Ordering::SeqCst) {
            PAUSE => Some(ControlSignal::Pause),
            CANCEL => Some(ControlSignal::Cancel),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CANCEL
    }
}

/// Per-mission signal handles, created lazily on first access.
#[derive(Default)]
pub struct SignalRegistry {
    handles: DashMap<String, SignalHandle>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, mission_id: &str) -> SignalHandle {
        self.handles
            .entry(mission_id.to_string())
            .or_default()
            .clone()
    }

    pub fn raise(&self, mission_id: &str, signal: ControlSignal) {
        self.handle(mission_id).raise(signal);
    }

    pub fn clear(&self, mission_id: &str) {
        if let Some(handle) = self.handles.get(mission_id) {
            handle.clear();
        }
    }

    /// Drops the registry entry. Workers still holding a clone keep seeing
    /// the last raised signal.
    pub fn remove(&self, mission_id: &str) {
        self.handles.remove(mission_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_and_clear() {
        let handle = SignalHandle::new();
        assert_eq!(handle.current(), None);
        handle.raise(ControlSignal::Pause);
        assert_eq!(handle.current(), Some(ControlSignal::Pause));
        handle.clear();
        assert_eq!(handle.current(), None);
    }

    #[test]
    fn test_cancel_dominates_pause() {
        let handle = SignalHandle::new();
        handle.raise(ControlSignal::Cancel);
        handle.raise(ControlSignal::Pause);
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_registry_shares_handle_with_workers() {
        let registry = SignalRegistry::new();
        let worker = registry.handle("m1");
        registry.raise("m1", ControlSignal::Cancel);
        assert!(worker.is_cancelled());
    }

    #[test]
    fn test_removed_mission_keeps_signal_for_holders() {
        let registry = SignalRegistry::new();
        let worker = registry.handle("m1");
        registry.raise("m1", ControlSignal::Cancel);
        registry.remove("m1");
        assert!(worker.is_cancelled());
        // A fresh handle after removal starts clean.
        assert_eq!(registry.handle("m1").current(), None);
    }
}
