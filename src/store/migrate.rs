use chrono::Utc;
use serde_json::Value;
use tracing::debug;

/// Forward-compatible migration for snapshots written by older builds.
/// Missing note timestamps default to now; missing tool-selection flags are
/// derived from related fields; `use_web_search` backfills to true.
pub fn migrate_snapshot(mut snapshot: Value) -> Value {
    let Some(root) = snapshot.as_object_mut() else {
        return snapshot;
    };

    let now = Value::String(Utc::now().to_rfc3339());

    if let Some(Value::Array(notes)) = root.get_mut("notes") {
        for note in notes.iter_mut() {
            if let Some(note) = note.as_object_mut() {
                if !note.contains_key("created_at") {
                    note.insert("created_at".to_string(), now.clone());
                }
                if !note.contains_key("updated_at") {
                    note.insert("updated_at".to_string(), now.clone());
                }
            }
        }
    }

    let settings = root
        .entry("settings")
        .or_insert_with(|| Value::Object(Default::default()));
    if let Some(settings) = settings.as_object_mut() {
        if !settings.contains_key("use_web_search") {
            settings.insert("use_web_search".to_string(), Value::Bool(true));
            debug!("Backfilled use_web_search for legacy snapshot");
        }
        if !settings.contains_key("use_local_rag") {
            let has_group = settings
                .get("document_group_id")
                .is_some_and(|v| !v.is_null());
            settings.insert("use_local_rag".to_string(), Value::Bool(has_group));
        }
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_timestamps_backfilled() {
        let migrated = migrate_snapshot(json!({
            "notes": [{"note_id": "n1", "content": "x"}]
        }));
        let note = &migrated["notes"][0];
        assert!(note.get("created_at").is_some());
        assert!(note.get("updated_at").is_some());
    }

    #[test]
    fn test_existing_timestamps_untouched() {
        let migrated = migrate_snapshot(json!({
            "notes": [{"note_id": "n1", "created_at": "2024-01-01T00:00:00Z"}]
        }));
        assert_eq!(migrated["notes"][0]["created_at"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_tool_selection_derived_from_group() {
        let migrated = migrate_snapshot(json!({
            "settings": {"document_group_id": "g1"}
        }));
        assert_eq!(migrated["settings"]["use_local_rag"], json!(true));
        assert_eq!(migrated["settings"]["use_web_search"], json!(true));

        let no_group = migrate_snapshot(json!({"settings": {}}));
        assert_eq!(no_group["settings"]["use_local_rag"], json!(false));
    }
}
