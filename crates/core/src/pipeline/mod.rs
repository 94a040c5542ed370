//! Pipeline orchestrator.
//!
//! Wires the crawler, the enrichment queue, and the worker pool together for
//! one run, owns the observable run state, and maps the outcome onto the
//! terminal status: cancelled runs end `idle`, panicked tasks end `error`,
//! everything else ends `done`.

pub mod enricher;
pub mod queue;
pub mod state;
mod types;

pub use queue::{EnrichQueue, EnrichTask};
pub use state::PipelineState;
pub use types::{PipelineError, PipelineMode, PipelineSnapshot, PipelineStatus};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use url::Url;

use crate::catalog::GameCatalog;
use crate::config::PipelineConfig;
use crate::crawler::{Crawler, CrawlerConfig};
use crate::index::SearchIndex;
use crate::metadata::MetadataProvider;

use enricher::Enricher;

/// The ingestion pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    base_url: Url,
    catalog: Arc<dyn GameCatalog>,
    index: Arc<dyn SearchIndex>,
    provider: Option<Arc<dyn MetadataProvider>>,
    state: Arc<PipelineState>,
    queue: Arc<EnrichQueue>,
}

impl Pipeline {
    /// Create a new pipeline. A `None` provider disables enrichment; the
    /// crawl still runs.
    pub fn new(
        config: PipelineConfig,
        base_url: Url,
        catalog: Arc<dyn GameCatalog>,
        index: Arc<dyn SearchIndex>,
        provider: Option<Arc<dyn MetadataProvider>>,
    ) -> Self {
        Self {
            config,
            base_url,
            catalog,
            index,
            provider,
            state: Arc::new(PipelineState::new()),
            queue: Arc::new(EnrichQueue::new()),
        }
    }

    /// The observable state of the current (or last) run.
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.state.snapshot(self.queue.len())
    }

    pub fn status(&self) -> PipelineStatus {
        self.state.status()
    }

    /// Start a run in the background. Fails fast when a run is active.
    pub fn start(self: &Arc<Self>, mode: PipelineMode) -> Result<(), PipelineError> {
        if !self.state.try_start(mode) {
            return Err(PipelineError::AlreadyRunning);
        }
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline.run_to_completion(mode).await;
        });
        Ok(())
    }

    /// Run to completion on the caller's task. Fails fast when a run is
    /// active.
    pub async fn run(self: &Arc<Self>, mode: PipelineMode) -> Result<(), PipelineError> {
        if !self.state.try_start(mode) {
            return Err(PipelineError::AlreadyRunning);
        }
        self.run_to_completion(mode).await;
        Ok(())
    }

    /// Request cancellation of the active run. Cooperative: the crawler and
    /// workers observe the flag at their next loop head.
    pub fn stop(&self) -> Result<(), PipelineError> {
        if self.state.status() != PipelineStatus::Running {
            return Err(PipelineError::NotRunning);
        }
        self.state.cancel();
        self.state.log("cancellation requested");
        Ok(())
    }

    async fn run_to_completion(&self, mode: PipelineMode) {
        self.queue.clear();
        self.state.log(format!("pipeline started in {mode} mode"));

        // Schema problems are warnings; the run proceeds and individual
        // writes surface their own errors.
        if let Err(e) = self.catalog.init() {
            self.state.log(format!("catalog init warning: {e}"));
        }
        if let Err(e) = self.index.init().await {
            self.state.log(format!("index init warning: {e}"));
        }

        if mode == PipelineMode::Clean {
            if let Err(e) = self.index.delete_all().await {
                self.state.log(format!("index wipe warning: {e}"));
            }
            if let Err(e) = self.catalog.clear() {
                self.state.log(format!("catalog wipe warning: {e}"));
            }
        }

        let enrichment_provider = match &self.provider {
            Some(provider) => match provider.authenticate().await {
                Ok(()) => Some(Arc::clone(provider)),
                Err(e) => {
                    self.state
                        .log(format!("provider auth failed, running scrape-only: {e}"));
                    None
                }
            },
            None => {
                self.state
                    .log("no provider credentials, running scrape-only");
                None
            }
        };

        let mut tasks = JoinSet::new();

        let crawler = Crawler::new(
            CrawlerConfig {
                base_url: self.base_url.clone(),
                concurrency: self.config.crawl_concurrency,
                batch_size: self.config.db_batch_size,
                fetch_timeout: Duration::from_secs(self.config.fetch_timeout_secs),
            },
            Arc::clone(&self.catalog),
            Arc::clone(&self.index),
            Arc::clone(&self.queue),
            Arc::clone(&self.state),
            mode,
        );
        tasks.spawn(async move { crawler.run().await });

        if let Some(provider) = enrichment_provider {
            let enricher = Arc::new(Enricher::new(
                Arc::clone(&self.catalog),
                Arc::clone(&self.index),
                provider,
                Arc::clone(&self.queue),
                Arc::clone(&self.state),
                &self.config,
            ));
            for worker_idx in 0..self.config.enrich_workers {
                let enricher = Arc::clone(&enricher);
                tasks.spawn(async move { enricher.worker(worker_idx).await });
            }
        }

        let mut failed = false;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                failed = true;
                self.state.log(format!("pipeline task failed: {e}"));
            }
        }

        self.state.finish(failed);
        self.state.log(format!(
            "pipeline finished with status {:?}",
            self.state.status()
        ));
    }
}
