//! Mock search index for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::index::{GameDocument, IndexError, SearchIndex};

/// Mock implementation of the `SearchIndex` trait.
///
/// Stores documents in a map keyed on the primary key (so repeated adds
/// upsert, like the real service), records each batch, and supports failure
/// injection.
pub struct MockSearchIndex {
    documents: Arc<RwLock<HashMap<i64, GameDocument>>>,
    batches: Arc<RwLock<Vec<Vec<i64>>>>,
    fail_next_add: AtomicBool,
    init_calls: AtomicU64,
}

impl Default for MockSearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchIndex {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            batches: Arc::new(RwLock::new(Vec::new())),
            fail_next_add: AtomicBool::new(false),
            init_calls: AtomicU64::new(0),
        }
    }

    /// Make the next `add_documents` call fail.
    pub fn fail_next_add(&self) {
        self.fail_next_add.store(true, Ordering::SeqCst);
    }

    /// Ids of all stored documents, sorted.
    pub async fn document_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.documents.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// A stored document by id.
    pub async fn document(&self, id: i64) -> Option<GameDocument> {
        self.documents.read().await.get(&id).cloned()
    }

    /// The id sets of every recorded add batch, in call order.
    pub async fn recorded_batches(&self) -> Vec<Vec<i64>> {
        self.batches.read().await.clone()
    }

    pub fn init_count(&self) -> u64 {
        self.init_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndex for MockSearchIndex {
    async fn init(&self) -> Result<(), IndexError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn add_documents(&self, documents: &[GameDocument]) -> Result<(), IndexError> {
        if self.fail_next_add.swap(false, Ordering::SeqCst) {
            return Err(IndexError::Http("injected index failure".to_string()));
        }

        self.batches
            .write()
            .await
            .push(documents.iter().map(|doc| doc.id).collect());

        let mut stored = self.documents.write().await;
        for document in documents {
            stored.insert(document.id, document.clone());
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), IndexError> {
        self.documents.write().await.clear();
        Ok(())
    }

    async fn document_count(&self) -> Result<u64, IndexError> {
        Ok(self.documents.read().await.len() as u64)
    }

    async fn health(&self) -> Result<(), IndexError> {
        Ok(())
    }
}
