//! Archive crawler.
//!
//! Breadth-first traversal of the archive's nested directory listings with a
//! bounded pool of in-flight fetches. File leaves are parsed into catalog
//! records and flushed in batches; each flushed row is either queued for
//! enrichment or re-indexed as-is. The work queue and visited set are owned
//! by the dispatcher alone; fetch tasks only return page bodies.

pub mod filename;
pub mod filter;
mod listing;

pub use filename::{parse_filename, ParsedFilename};
pub use filter::is_enrichable;
pub use listing::{parse_listing, ListingEntry};

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::catalog::{GameCatalog, NewGameRecord};
use crate::index::{GameDocument, SearchIndex};
use crate::pipeline::queue::{EnrichQueue, EnrichTask};
use crate::pipeline::state::PipelineState;
use crate::pipeline::PipelineMode;

/// Crawler tunables, filled from the pipeline config.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub base_url: Url,
    pub concurrency: usize,
    pub batch_size: usize,
    pub fetch_timeout: Duration,
}

/// The archive crawler.
pub struct Crawler {
    client: Client,
    config: CrawlerConfig,
    catalog: Arc<dyn GameCatalog>,
    index: Arc<dyn SearchIndex>,
    queue: Arc<EnrichQueue>,
    state: Arc<PipelineState>,
    mode: PipelineMode,
}

impl Crawler {
    pub fn new(
        config: CrawlerConfig,
        catalog: Arc<dyn GameCatalog>,
        index: Arc<dyn SearchIndex>,
        queue: Arc<EnrichQueue>,
        state: Arc<PipelineState>,
        mode: PipelineMode,
    ) -> Self {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .pool_max_idle_per_host(config.concurrency + 5)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            catalog,
            index,
            queue,
            state,
            mode,
        }
    }

    /// Run the crawl to completion (or cancellation).
    pub async fn run(&self) {
        let mut work: VecDeque<Url> = VecDeque::new();
        work.push_back(self.config.base_url.clone());

        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut buffer: Vec<NewGameRecord> = Vec::new();
        let mut in_flight = FuturesUnordered::new();

        self.state
            .log(format!("crawl started at {}", self.config.base_url));

        loop {
            // Once cancelled, stop dispatching; in-flight fetches finish.
            if !self.state.is_cancelled() {
                while in_flight.len() < self.config.concurrency {
                    let Some(url) = work.pop_front() else { break };
                    if !visited.insert(url.as_str().to_string()) {
                        continue;
                    }
                    let client = self.client.clone();
                    in_flight.push(async move {
                        let result = fetch_listing(&client, &url).await;
                        (url, result)
                    });
                }
            }

            let Some((url, result)) = in_flight.next().await else {
                break;
            };

            match result {
                Ok(body) => {
                    self.process_page(&url, &body, &mut work, &visited, &mut seen_urls, &mut buffer)
                }
                Err(e) => self.state.log(format!("fetch failed for {url}: {e}")),
            }

            if buffer.len() >= self.config.batch_size {
                self.flush(&mut buffer).await;
            }
        }

        if !buffer.is_empty() {
            self.flush(&mut buffer).await;
        }

        if self.mode == PipelineMode::Incremental && !self.state.is_cancelled() {
            self.prune_stale(&seen_urls);
        }

        self.state.set_scrape_complete();
        self.state.log(format!(
            "crawl complete: {} pages visited, {} files seen",
            visited.len(),
            seen_urls.len()
        ));
    }

    /// Turn one listing page into queued sub-directories and buffered records.
    fn process_page(
        &self,
        page_url: &Url,
        body: &str,
        work: &mut VecDeque<Url>,
        visited: &HashSet<String>,
        seen_urls: &mut HashSet<String>,
        buffer: &mut Vec<NewGameRecord>,
    ) {
        let (group_name, platform) = self.group_platform(page_url);

        for entry in parse_listing(body) {
            if !accept_href(&entry.href) {
                continue;
            }
            let Ok(resolved) = page_url.join(&entry.href) else {
                debug!(href = %entry.href, "unresolvable href");
                continue;
            };

            if entry.href.ends_with('/') {
                if !visited.contains(resolved.as_str()) {
                    work.push_back(resolved);
                }
                continue;
            }

            let raw_name = resolved
                .path_segments()
                .and_then(|segments| segments.last())
                .unwrap_or_default();
            let filename = urlencoding::decode(raw_name)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw_name.to_string());
            let parsed = parse_filename(&filename);

            let record = NewGameRecord {
                download_url: resolved.as_str().to_string(),
                game_name: parsed.base_name,
                filename,
                platform: platform.clone(),
                group_name: group_name.clone(),
                region: parsed.region,
                size: entry.size,
                tags: parsed.tags,
            };

            seen_urls.insert(record.download_url.clone());
            self.state.inc_scrape_total();
            buffer.push(record);
        }
    }

    /// Upsert the buffered batch, then route each row: enrichment queue for
    /// records that still need metadata, straight to the index otherwise.
    async fn flush(&self, buffer: &mut Vec<NewGameRecord>) {
        let batch = std::mem::take(buffer);
        if batch.is_empty() {
            return;
        }

        let rows = match self.catalog.batch_upsert(&batch) {
            Ok(rows) => rows,
            Err(e) => {
                self.state
                    .log(format!("dropping batch of {} records: {e}", batch.len()));
                return;
            }
        };

        let mut reindex_ids = Vec::new();
        for row in &rows {
            let needs_enrichment = (self.mode == PipelineMode::Clean
                || row.description.is_none())
                && is_enrichable(&row.filename);
            if needs_enrichment {
                self.queue.push(EnrichTask {
                    id: row.id,
                    game_name: row.game_name.clone(),
                });
                self.state.inc_scrape_new();
            } else {
                reindex_ids.push(row.id);
            }
        }

        if reindex_ids.is_empty() {
            return;
        }

        // Already-enriched (or filtered) rows skip the queue but must still
        // reach the index with their current contents.
        match self.catalog.get_by_ids(&reindex_ids) {
            Ok(games) => {
                let documents: Vec<GameDocument> =
                    games.iter().map(GameDocument::from).collect();
                match self.index.add_documents(&documents).await {
                    Ok(()) => self.state.add_indexed(documents.len() as u64),
                    Err(e) => self
                        .state
                        .log(format!("index write failed for {} documents: {e}", documents.len())),
                }
            }
            Err(e) => self.state.log(format!("re-index read failed: {e}")),
        }
    }

    /// Delete store rows whose URLs were not observed by this crawl.
    fn prune_stale(&self, seen_urls: &HashSet<String>) {
        let store_urls = match self.catalog.all_urls() {
            Ok(urls) => urls,
            Err(e) => {
                self.state.log(format!("prune skipped, url read failed: {e}"));
                return;
            }
        };

        let stale: Vec<String> = store_urls
            .into_iter()
            .filter(|url| !seen_urls.contains(url))
            .collect();
        if stale.is_empty() {
            return;
        }

        match self.catalog.delete_by_urls(&stale) {
            Ok(deleted) => self.state.log(format!("pruned {deleted} stale records")),
            Err(e) => self.state.log(format!("prune failed: {e}")),
        }
    }

    /// Group and platform come from the page's path below the archive root:
    /// segment 0 is the group, segment 1 the platform (falling back to the
    /// group for files sitting one level deep).
    fn group_platform(&self, page_url: &Url) -> (String, String) {
        let base_path = self.config.base_url.path();
        let relative = page_url.path().strip_prefix(base_path).unwrap_or("");

        let segments: Vec<String> = relative
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            })
            .collect();

        let group = segments.first().cloned().unwrap_or_default();
        let platform = segments.get(1).cloned().unwrap_or_else(|| group.clone());
        (group, platform)
    }
}

/// Href acceptance rules for listing anchors: no query-only links, no
/// absolute schemes, no root-absolute paths, no parent traversal, and no
/// self-link.
fn accept_href(href: &str) -> bool {
    if href.is_empty() || href == "./" {
        return false;
    }
    if href.starts_with('?') || href.starts_with('/') {
        return false;
    }
    if href.contains("..") {
        return false;
    }
    if let Some((head, _)) = href.split_once(':') {
        if !head.contains('/') {
            return false;
        }
    }
    true
}

async fn fetch_listing(client: &Client, url: &Url) -> Result<String, reqwest::Error> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    response.text().await
}
