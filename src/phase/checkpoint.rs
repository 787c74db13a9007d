use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Partial-progress payload persisted for a phase before completion.
///
/// The structured-research fields are typed because their shape is known;
/// anything else lands in `extra`. Merging is shallow: a key present in the
/// incoming partial overwrites the stored value for that key, nested values
/// are never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseCheckpoint {
    pub completed_sections: Vec<String>,
    pub sections_in_progress: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl PhaseCheckpoint {
    pub fn with_entry(key: impl Into<String>, value: Value) -> Self {
        let mut checkpoint = Self::default();
        checkpoint.extra.insert(key.into(), value);
        checkpoint
    }

    pub fn with_completed_sections(sections: Vec<String>) -> Self {
        Self {
            completed_sections: sections,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.completed_sections.is_empty()
            && self.sections_in_progress.is_empty()
            && self.extra.is_empty()
    }

    /// Shallow merge at depth 1. An empty list/map in the partial leaves the
    /// stored value alone, so repeated partial saves never lose progress.
    pub fn merge(&mut self, partial: PhaseCheckpoint) {
        if !partial.completed_sections.is_empty() {
            self.completed_sections = partial.completed_sections;
        }
        for (section, progress) in partial.sections_in_progress {
            self.sections_in_progress.insert(section, progress);
        }
        for (key, value) in partial.extra {
            self.extra.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shallow_merge_keeps_disjoint_keys() {
        let mut checkpoint = PhaseCheckpoint::with_entry("a", json!(1));
        checkpoint.merge(PhaseCheckpoint::with_entry("b", json!(2)));
        assert_eq!(checkpoint.extra.get("a"), Some(&json!(1)));
        assert_eq!(checkpoint.extra.get("b"), Some(&json!(2)));
    }

    #[test]
    fn test_merge_overwrites_existing_key() {
        let mut checkpoint = PhaseCheckpoint::with_entry("a", json!({"x": 1}));
        checkpoint.merge(PhaseCheckpoint::with_entry("a", json!({"y": 2})));
        // Not deep-merged: the new value replaces the old wholesale.
        assert_eq!(checkpoint.extra.get("a"), Some(&json!({"y": 2})));
    }

    #[test]
    fn test_empty_partial_preserves_sections() {
        let mut checkpoint =
            PhaseCheckpoint::with_completed_sections(vec!["s1".to_string()]);
        checkpoint.merge(PhaseCheckpoint::with_entry("note", json!("x")));
        assert_eq!(checkpoint.completed_sections, vec!["s1".to_string()]);
    }

    #[test]
    fn test_is_empty() {
        assert!(PhaseCheckpoint::default().is_empty());
        assert!(!PhaseCheckpoint::with_entry("k", json!(null)).is_empty());
    }
}
