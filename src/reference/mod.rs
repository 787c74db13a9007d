//! Compact sequential display ids for opaque identifiers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Mission-scoped bijection between opaque ids and short display ids
/// ("ref1", "ref2", ...). Ids are never reused or renumbered, and the maps
/// are never pruned while the mission is active.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceMap {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
    counter: u64,
}

impl ReferenceMap {
    /// Gets or allocates the short id for an opaque id. Idempotent.
    pub fn simple_id(&mut self, original_id: &str) -> String {
        if let Some(existing) = self.forward.get(original_id) {
            return existing.clone();
        }
        self.counter += 1;
        let simple = format!("ref{}", self.counter);
        self.forward
            .insert(original_id.to_string(), simple.clone());
        self.reverse
            .insert(simple.clone(), original_id.to_string());
        simple
    }

    pub fn original_id(&self, simple_id: &str) -> Option<&str> {
        self.reverse.get(simple_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_allocation() {
        let mut map = ReferenceMap::default();
        assert_eq!(map.simple_id("uuid-a"), "ref1");
        assert_eq!(map.simple_id("uuid-b"), "ref2");
        assert_eq!(map.simple_id("uuid-c"), "ref3");
    }

    #[test]
    fn test_idempotent_per_original() {
        let mut map = ReferenceMap::default();
        let first = map.simple_id("uuid-a");
        map.simple_id("uuid-b");
        assert_eq!(map.simple_id("uuid-a"), first);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_round_trip() {
        let mut map = ReferenceMap::default();
        for original in ["x", "y", "z"] {
            let simple = map.simple_id(original);
            assert_eq!(map.original_id(&simple), Some(original));
        }
        assert_eq!(map.original_id("ref99"), None);
    }
}
