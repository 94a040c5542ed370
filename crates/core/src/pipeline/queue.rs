//! The enrichment queue.
//!
//! Multi-producer (crawler flushes), multi-consumer (enrich workers). The
//! batch pop is atomic: no two workers ever observe overlapping slices. The
//! queue is unbounded and never persisted; cancellation discards it.

use std::collections::VecDeque;
use std::sync::Mutex;

/// A record waiting for provider metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichTask {
    pub id: i64,
    pub game_name: String,
}

/// Shared work queue between the crawler and the enrich workers.
#[derive(Default)]
pub struct EnrichQueue {
    items: Mutex<VecDeque<EnrichTask>>,
}

impl EnrichQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task: EnrichTask) {
        self.items.lock().unwrap().push_back(task);
    }

    /// Remove and return up to `max` tasks in one critical section.
    pub fn pop_batch(&self, max: usize) -> Vec<EnrichTask> {
        let mut items = self.items.lock().unwrap();
        let take = max.min(items.len());
        items.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
    }
}
