//! Enrichment worker pool.
//!
//! Workers drain the enrichment queue in disjoint batches, ask the metadata
//! provider about each batch in one call, write the normalized fields onto
//! the catalog rows, and forward the resulting documents to the index.
//!
//! Pacing: each worker sleeps `enrich_worker_delay_ms` after a provider call
//! and worker starts are staggered by `delay / workers`, so at steady state
//! the pool issues one provider request per stagger interval. That stagger
//! is the sole admission control against the provider's rate limit.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

use crate::catalog::{EnrichedFields, GameCatalog};
use crate::config::PipelineConfig;
use crate::index::{GameDocument, SearchIndex};
use crate::metadata::{normalize, MetadataProvider};

use super::queue::{EnrichQueue, EnrichTask};
use super::state::PipelineState;

/// Sleep between queue polls while the crawler is still producing.
const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The enrichment worker pool.
pub struct Enricher {
    catalog: Arc<dyn GameCatalog>,
    index: Arc<dyn SearchIndex>,
    provider: Arc<dyn MetadataProvider>,
    queue: Arc<EnrichQueue>,
    state: Arc<PipelineState>,
    batch_size: usize,
    worker_delay: Duration,
    stagger: Duration,
}

impl Enricher {
    pub fn new(
        catalog: Arc<dyn GameCatalog>,
        index: Arc<dyn SearchIndex>,
        provider: Arc<dyn MetadataProvider>,
        queue: Arc<EnrichQueue>,
        state: Arc<PipelineState>,
        config: &PipelineConfig,
    ) -> Self {
        let worker_delay = Duration::from_millis(config.enrich_worker_delay_ms);
        let stagger = worker_delay / config.enrich_workers.max(1) as u32;

        Self {
            catalog,
            index,
            provider,
            queue,
            state,
            batch_size: config.enrich_batch_size,
            worker_delay,
            stagger,
        }
    }

    /// One worker's loop. Exits when cancelled, or when the queue is empty
    /// after the crawl has completed.
    pub async fn worker(self: Arc<Self>, worker_idx: usize) {
        tokio::time::sleep(self.stagger * worker_idx as u32).await;
        debug!(worker = worker_idx, "enrich worker started");

        loop {
            if self.state.is_cancelled() {
                break;
            }

            let queued = self.queue.len();
            if queued == 0 && self.state.is_scrape_complete() {
                break;
            }
            // Wait for a full batch while the crawler is still producing
            if queued < self.batch_size && !self.state.is_scrape_complete() {
                tokio::time::sleep(QUEUE_POLL_INTERVAL).await;
                continue;
            }

            let batch = self.queue.pop_batch(self.batch_size);
            if batch.is_empty() {
                continue;
            }

            self.process_batch(&batch).await;
            tokio::time::sleep(self.worker_delay).await;
        }

        debug!(worker = worker_idx, "enrich worker exiting");
    }

    async fn process_batch(&self, batch: &[EnrichTask]) {
        let names: Vec<String> = batch.iter().map(|task| task.game_name.clone()).collect();

        let mut hits = match self.provider.batch_lookup(&names).await {
            Ok(hits) => hits,
            Err(e) => {
                self.state.log(format!(
                    "provider lookup failed, dropping {} records: {e}",
                    batch.len()
                ));
                return;
            }
        };
        hits.resize_with(batch.len(), || None);

        // Item failures only skip that item; siblings still reach the index
        let updated = join_all(batch.iter().zip(hits).map(|(task, hit)| async move {
            let fields = match hit {
                Some(meta) => normalize(&meta),
                None => EnrichedFields::unmatched(),
            };
            match self.catalog.update_enrichment(task.id, &fields) {
                Ok(game) => {
                    self.state.inc_enriched();
                    Some(game)
                }
                Err(e) => {
                    self.state
                        .log(format!("enrichment update failed for id {}: {e}", task.id));
                    None
                }
            }
        }))
        .await;

        let documents: Vec<GameDocument> = updated
            .into_iter()
            .flatten()
            .map(|game| GameDocument::from(&game))
            .collect();
        if documents.is_empty() {
            return;
        }

        match self.index.add_documents(&documents).await {
            Ok(()) => self.state.add_indexed(documents.len() as u64),
            Err(e) => self.state.log(format!(
                "index write failed for {} documents: {e}",
                documents.len()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewGameRecord, SqliteCatalog};
    use crate::metadata::GameMetadata;
    use crate::pipeline::PipelineMode;
    use crate::testing::{MockMetadataProvider, MockSearchIndex};

    fn seed(catalog: &SqliteCatalog, count: i64) -> Vec<EnrichTask> {
        let records: Vec<NewGameRecord> = (0..count)
            .map(|i| NewGameRecord {
                download_url: format!("https://a/game-{i}.nes"),
                game_name: format!("Game {i}"),
                filename: format!("Game {i} (USA).nes"),
                platform: "NES".to_string(),
                group_name: "CONSOLE".to_string(),
                region: "USA".to_string(),
                size: "40 KB".to_string(),
                tags: vec!["USA".to_string()],
            })
            .collect();
        catalog
            .batch_upsert(&records)
            .unwrap()
            .into_iter()
            .map(|row| EnrichTask {
                id: row.id,
                game_name: row.game_name,
            })
            .collect()
    }

    fn enricher_with(
        catalog: Arc<SqliteCatalog>,
        index: Arc<MockSearchIndex>,
        provider: Arc<MockMetadataProvider>,
        queue: Arc<EnrichQueue>,
        state: Arc<PipelineState>,
    ) -> Arc<Enricher> {
        let config = PipelineConfig {
            enrich_worker_delay_ms: 10,
            ..PipelineConfig::default()
        };
        Arc::new(Enricher::new(
            catalog, index, provider, queue, state, &config,
        ))
    }

    #[tokio::test]
    async fn test_workers_drain_queue_and_index_results() {
        let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
        let index = Arc::new(MockSearchIndex::new());
        let provider = Arc::new(MockMetadataProvider::new());
        let queue = Arc::new(EnrichQueue::new());
        let state = Arc::new(PipelineState::new());

        provider
            .set_hit(
                "Game 0",
                GameMetadata {
                    summary: Some("classic".to_string()),
                    rating: Some(80.0),
                    ..GameMetadata::default()
                },
            )
            .await;

        let tasks = seed(&catalog, 12);
        for task in tasks {
            queue.push(task);
        }

        state.try_start(PipelineMode::Incremental);
        state.set_scrape_complete();

        let enricher = enricher_with(
            catalog.clone(),
            index.clone(),
            provider.clone(),
            queue.clone(),
            state.clone(),
        );
        let workers: Vec<_> = (0..4)
            .map(|i| tokio::spawn(Arc::clone(&enricher).worker(i)))
            .collect();
        for worker in workers {
            worker.await.unwrap();
        }

        assert!(queue.is_empty());
        assert_eq!(state.enriched(), 12);
        assert_eq!(index.document_ids().await.len(), 12);

        // The scripted hit got real fields, everyone else the sentinel
        let games = catalog
            .get_by_ids(&(1..=12).collect::<Vec<i64>>())
            .unwrap();
        let hit = games.iter().find(|g| g.game_name == "Game 0").unwrap();
        assert_eq!(hit.description.as_deref(), Some("classic"));
        assert_eq!(hit.rating, Some(4.0));
        let miss = games.iter().find(|g| g.game_name == "Game 5").unwrap();
        assert_eq!(miss.description.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_batches_are_capped_at_batch_size() {
        let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
        let index = Arc::new(MockSearchIndex::new());
        let provider = Arc::new(MockMetadataProvider::new());
        let queue = Arc::new(EnrichQueue::new());
        let state = Arc::new(PipelineState::new());

        for task in seed(&catalog, 25) {
            queue.push(task);
        }
        state.try_start(PipelineMode::Incremental);
        state.set_scrape_complete();

        let enricher = enricher_with(
            catalog,
            index,
            provider.clone(),
            queue.clone(),
            state.clone(),
        );
        Arc::clone(&enricher).worker(0).await;

        let batches = provider.recorded_batches().await;
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() <= 10));
        assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), 25);
    }

    #[tokio::test]
    async fn test_provider_failure_drops_batch_without_sentinel() {
        let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
        let index = Arc::new(MockSearchIndex::new());
        let provider = Arc::new(MockMetadataProvider::new());
        let queue = Arc::new(EnrichQueue::new());
        let state = Arc::new(PipelineState::new());

        provider.fail_next_lookup().await;
        let tasks = seed(&catalog, 5);
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        for task in tasks {
            queue.push(task);
        }
        state.try_start(PipelineMode::Incremental);
        state.set_scrape_complete();

        let enricher = enricher_with(
            catalog.clone(),
            index.clone(),
            provider,
            queue.clone(),
            state.clone(),
        );
        Arc::clone(&enricher).worker(0).await;

        // Dropped, not marked attempted: description stays NULL
        assert_eq!(state.enriched(), 0);
        let games = catalog.get_by_ids(&ids).unwrap();
        assert!(games.iter().all(|g| g.description.is_none()));
        assert!(index.document_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_stops_worker() {
        let catalog = Arc::new(SqliteCatalog::in_memory().unwrap());
        let index = Arc::new(MockSearchIndex::new());
        let provider = Arc::new(MockMetadataProvider::new());
        let queue = Arc::new(EnrichQueue::new());
        let state = Arc::new(PipelineState::new());

        for task in seed(&catalog, 20) {
            queue.push(task);
        }
        state.try_start(PipelineMode::Incremental);
        state.cancel();

        let enricher = enricher_with(catalog, index, provider, queue.clone(), state.clone());
        Arc::clone(&enricher).worker(0).await;

        assert_eq!(queue.len(), 20);
        assert_eq!(state.enriched(), 0);
    }
}
