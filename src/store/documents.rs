use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A durable, shareable record externalized from a discovered artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub source_url: Option<String>,
    pub content: String,
    /// Mission that first captured this document.
    pub captured_by_mission: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionGroup {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Durable document storage and collection membership. Creation and
/// attachment are separate so replays can attach an existing record without
/// rewriting it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_document(&self, doc_id: &str) -> Result<Option<DocumentRecord>>;
    async fn create_document(&self, record: DocumentRecord) -> Result<()>;
    async fn create_collection(&self, group: CollectionGroup) -> Result<()>;
    async fn attach_to_collection(&self, doc_id: &str, group_id: &str) -> Result<()>;
    async fn is_attached(&self, doc_id: &str, group_id: &str) -> Result<bool>;
}

/// In-memory document store for tests and single-process use.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, DocumentRecord>>,
    collections: Mutex<HashMap<String, CollectionGroup>>,
    memberships: Mutex<HashMap<String, HashSet<String>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn attachments(&self, group_id: &str) -> Vec<String> {
        self.memberships
            .lock()
            .get(group_id)
            .map(|docs| docs.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_document(&self, doc_id: &str) -> Result<Option<DocumentRecord>> {
        Ok(self.documents.lock().get(doc_id).cloned())
    }

    async fn create_document(&self, record: DocumentRecord) -> Result<()> {
        self.documents.lock().insert(record.id.clone(), record);
        Ok(())
    }

    async fn create_collection(&self, group: CollectionGroup) -> Result<()> {
        self.collections.lock().insert(group.id.clone(), group);
        Ok(())
    }

    async fn attach_to_collection(&self, doc_id: &str, group_id: &str) -> Result<()> {
        self.memberships
            .lock()
            .entry(group_id.to_string())
            .or_default()
            .insert(doc_id.to_string());
        Ok(())
    }

    async fn is_attached(&self, doc_id: &str, group_id: &str) -> Result<bool> {
        Ok(self
            .memberships
            .lock()
            .get(group_id)
            .is_some_and(|docs| docs.contains(doc_id)))
    }
}
