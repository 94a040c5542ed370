//! Mock metadata provider for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::metadata::{GameMetadata, MetadataError, MetadataProvider};

/// A recorded lookup for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedLookup {
    /// The names sent in one provider call.
    pub names: Vec<String>,
    /// When the call was made.
    pub at: Instant,
}

/// Mock implementation of the `MetadataProvider` trait.
///
/// Provides controllable behavior for testing:
/// - Script hits per game name; everything else is a miss
/// - Record lookup batches and their timestamps
/// - Inject auth failures, lookup failures, and per-call delays
pub struct MockMetadataProvider {
    hits: Arc<RwLock<HashMap<String, GameMetadata>>>,
    lookups: Arc<RwLock<Vec<RecordedLookup>>>,
    lookup_delay: Arc<RwLock<Option<Duration>>>,
    fail_next_lookup: AtomicBool,
    fail_auth: AtomicBool,
    auth_calls: AtomicU64,
}

impl Default for MockMetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMetadataProvider {
    pub fn new() -> Self {
        Self {
            hits: Arc::new(RwLock::new(HashMap::new())),
            lookups: Arc::new(RwLock::new(Vec::new())),
            lookup_delay: Arc::new(RwLock::new(None)),
            fail_next_lookup: AtomicBool::new(false),
            fail_auth: AtomicBool::new(false),
            auth_calls: AtomicU64::new(0),
        }
    }

    /// Script a hit for a game name.
    pub async fn set_hit(&self, name: &str, metadata: GameMetadata) {
        self.hits.write().await.insert(name.to_string(), metadata);
    }

    /// Make the next `batch_lookup` fail.
    pub async fn fail_next_lookup(&self) {
        self.fail_next_lookup.store(true, Ordering::SeqCst);
    }

    /// Make every `authenticate` call fail.
    pub fn fail_auth(&self) {
        self.fail_auth.store(true, Ordering::SeqCst);
    }

    /// Sleep this long inside every `batch_lookup` call.
    pub async fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.write().await = Some(delay);
    }

    /// All recorded lookups, in call order.
    pub async fn recorded_lookups(&self) -> Vec<RecordedLookup> {
        self.lookups.read().await.clone()
    }

    /// The name batches of all recorded lookups.
    pub async fn recorded_batches(&self) -> Vec<Vec<String>> {
        self.lookups
            .read()
            .await
            .iter()
            .map(|lookup| lookup.names.clone())
            .collect()
    }

    /// Number of provider calls made.
    pub async fn lookup_count(&self) -> usize {
        self.lookups.read().await.len()
    }

    /// Number of authenticate calls made.
    pub fn auth_count(&self) -> u64 {
        self.auth_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for MockMetadataProvider {
    async fn authenticate(&self) -> Result<(), MetadataError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(MetadataError::Auth("injected auth failure".to_string()));
        }
        Ok(())
    }

    async fn batch_lookup(
        &self,
        names: &[String],
    ) -> Result<Vec<Option<GameMetadata>>, MetadataError> {
        if self.fail_next_lookup.swap(false, Ordering::SeqCst) {
            return Err(MetadataError::Http("injected lookup failure".to_string()));
        }

        self.lookups.write().await.push(RecordedLookup {
            names: names.to_vec(),
            at: Instant::now(),
        });

        let delay = *self.lookup_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let hits = self.hits.read().await;
        Ok(names.iter().map(|name| hits.get(name).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_hit_and_miss() {
        let provider = MockMetadataProvider::new();
        provider
            .set_hit(
                "Known Game",
                GameMetadata {
                    summary: Some("known".to_string()),
                    ..GameMetadata::default()
                },
            )
            .await;

        let results = provider
            .batch_lookup(&["Known Game".to_string(), "Unknown".to_string()])
            .await
            .unwrap();

        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert_eq!(provider.lookup_count().await, 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let provider = MockMetadataProvider::new();
        provider.fail_next_lookup().await;

        assert!(provider.batch_lookup(&["a".to_string()]).await.is_err());
        assert!(provider.batch_lookup(&["a".to_string()]).await.is_ok());
    }

    #[tokio::test]
    async fn test_auth_failure() {
        let provider = MockMetadataProvider::new();
        assert!(provider.authenticate().await.is_ok());

        provider.fail_auth();
        assert!(provider.authenticate().await.is_err());
        assert_eq!(provider.auth_count(), 2);
    }
}
