//! Side-effect processing for notes that reference external artifacts.
//!
//! When a mission collects a note backed by a web page or local document,
//! the content may need to be externalized into durable document storage and
//! attached to the mission's generated collection. Processing is idempotent
//! per mission: the same `(source_type, source_id)` pair is handled at most
//! once, and document ids derive from the source address so two missions that
//! discover the same source converge on a single durable record.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::mission::{MissionContext, Note, SourceType};
use crate::store::{CollectionGroup, DocumentRecord, DocumentStore};

/// What happened to a single artifact during processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// The note did not qualify for externalization.
    Skipped,
    /// A new durable record was created and attached.
    Created,
    /// An existing record was attached to this mission's collection.
    Attached,
    /// Already processed for this mission in this process lifetime.
    Duplicate,
}

pub struct ArtifactProcessor {
    store: Arc<dyn DocumentStore>,
    /// Per-mission set of "{source_type}:{source_id}" keys already handled.
    processed: Mutex<HashMap<String, HashSet<String>>>,
}

impl ArtifactProcessor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            processed: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create_collection(&self, group: CollectionGroup) -> Result<()> {
        self.store.create_collection(group).await
    }

    /// Process one note. Never fails the note itself; qualification failures
    /// return [`ArtifactOutcome::Skipped`], store errors propagate.
    pub async fn process(&self, mission: &MissionContext, note: &Note) -> Result<ArtifactOutcome> {
        let settings = &mission.settings;
        if !settings.auto_create_collection {
            return Ok(ArtifactOutcome::Skipped);
        }
        let Some(group_id) = settings.generated_collection_id.as_deref() else {
            return Ok(ArtifactOutcome::Skipped);
        };
        if !note.is_relevant || note.source_id.is_empty() {
            return Ok(ArtifactOutcome::Skipped);
        }
        let source_id = note.source_id.as_str();

        let key = format!("{}:{}", note.source_type.as_str(), source_id);
        {
            let mut processed = self.processed.lock();
            let seen = processed.entry(mission.id.clone()).or_default();
            if !seen.insert(key.clone()) {
                debug!(mission_id = %mission.id, key = %key, "artifact already processed");
                return Ok(ArtifactOutcome::Duplicate);
            }
        }

        match note.source_type {
            SourceType::Web => self.process_web(mission, note, source_id, group_id).await,
            SourceType::Document => self.process_document(note, source_id, group_id).await,
        }
    }

    async fn process_web(
        &self,
        mission: &MissionContext,
        note: &Note,
        source_id: &str,
        group_id: &str,
    ) -> Result<ArtifactOutcome> {
        let metadata = &note.source_metadata;
        if !metadata.fetched_full_content {
            return Ok(ArtifactOutcome::Skipped);
        }

        // Content-address the record by its URL so repeated discoveries of
        // the same page, even across missions, share one document id.
        let doc_id = Uuid::new_v5(&Uuid::NAMESPACE_URL, source_id.as_bytes()).to_string();

        if self.store.find_document(&doc_id).await?.is_none() {
            let content = metadata
                .full_text
                .clone()
                .unwrap_or_else(|| note.content.clone());
            let title = metadata
                .title
                .clone()
                .unwrap_or_else(|| source_id.to_string());
            self.store
                .create_document(DocumentRecord {
                    id: doc_id.clone(),
                    title,
                    source_url: Some(source_id.to_string()),
                    content,
                    captured_by_mission: mission.id.clone(),
                    created_at: Utc::now(),
                })
                .await?;
            self.store.attach_to_collection(&doc_id, group_id).await?;
            debug!(mission_id = %mission.id, doc_id = %doc_id, "captured web artifact");
            return Ok(ArtifactOutcome::Created);
        }

        if self.store.is_attached(&doc_id, group_id).await? {
            return Ok(ArtifactOutcome::Duplicate);
        }
        self.store.attach_to_collection(&doc_id, group_id).await?;
        Ok(ArtifactOutcome::Attached)
    }

    async fn process_document(
        &self,
        note: &Note,
        source_id: &str,
        group_id: &str,
    ) -> Result<ArtifactOutcome> {
        // Local documents already exist in storage; resolve the id either
        // from metadata or from the "{doc_id}_{chunk}" source id convention.
        let doc_id = note
            .source_metadata
            .doc_id
            .clone()
            .unwrap_or_else(|| {
                source_id
                    .split_once('_')
                    .map(|(id, _)| id.to_string())
                    .unwrap_or_else(|| source_id.to_string())
            });

        if self.store.find_document(&doc_id).await?.is_none() {
            warn!(doc_id = %doc_id, "document artifact not found in storage, skipping");
            return Ok(ArtifactOutcome::Skipped);
        }
        if self.store.is_attached(&doc_id, group_id).await? {
            return Ok(ArtifactOutcome::Duplicate);
        }
        self.store.attach_to_collection(&doc_id, group_id).await?;
        Ok(ArtifactOutcome::Attached)
    }

    /// Process a batch, isolating failures so one bad artifact cannot block
    /// the rest of the notes.
    pub async fn process_batch(&self, mission: &MissionContext, notes: &[Note]) -> Vec<ArtifactOutcome> {
        let mut outcomes = Vec::with_capacity(notes.len());
        for note in notes {
            match self.process(mission, note).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    warn!(mission_id = %mission.id, note_id = %note.note_id, error = %err, "artifact processing failed");
                    outcomes.push(ArtifactOutcome::Skipped);
                }
            }
        }
        outcomes
    }

    /// Drop per-mission dedup state. Called when a mission reaches a
    /// terminal status or is evicted.
    pub fn clear_mission(&self, mission_id: &str) {
        self.processed.lock().remove(mission_id);
    }
}
