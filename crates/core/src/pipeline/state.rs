//! Observable pipeline state.
//!
//! Written by the crawler, the enrich workers, and the orchestrator; read
//! concurrently by admin handlers. Counters are atomics, the status/mode/
//! timestamp block sits behind one mutex, and log lines go into a bounded
//! ring. Readers get a consistent-per-field view; only status transitions
//! are totally ordered.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::info;

use super::types::{PipelineMode, PipelineSnapshot, PipelineStatus};

/// Capacity of the log ring.
pub const MAX_LOG_LINES: usize = 1000;

struct Meta {
    status: PipelineStatus,
    mode: PipelineMode,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

/// Process-wide pipeline state.
pub struct PipelineState {
    meta: Mutex<Meta>,
    scrape_total: AtomicU64,
    scrape_new: AtomicU64,
    enriched: AtomicU64,
    indexed: AtomicU64,
    scrape_complete: AtomicBool,
    cancelled: AtomicBool,
    logs: Mutex<VecDeque<String>>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            meta: Mutex::new(Meta {
                status: PipelineStatus::Idle,
                mode: PipelineMode::default(),
                started_at: None,
                ended_at: None,
            }),
            scrape_total: AtomicU64::new(0),
            scrape_new: AtomicU64::new(0),
            enriched: AtomicU64::new(0),
            indexed: AtomicU64::new(0),
            scrape_complete: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            logs: Mutex::new(VecDeque::new()),
        }
    }

    /// Claim the run slot and reset every field for a fresh run.
    ///
    /// Returns false without touching anything when a run is already active.
    pub fn try_start(&self, mode: PipelineMode) -> bool {
        let mut meta = self.meta.lock().unwrap();
        if meta.status == PipelineStatus::Running {
            return false;
        }

        meta.status = PipelineStatus::Running;
        meta.mode = mode;
        meta.started_at = Some(Utc::now());
        meta.ended_at = None;
        drop(meta);

        self.scrape_total.store(0, Ordering::Relaxed);
        self.scrape_new.store(0, Ordering::Relaxed);
        self.enriched.store(0, Ordering::Relaxed);
        self.indexed.store(0, Ordering::Relaxed);
        self.scrape_complete.store(false, Ordering::SeqCst);
        self.cancelled.store(false, Ordering::SeqCst);
        self.logs.lock().unwrap().clear();
        true
    }

    /// Record the terminal status of the run. Cancellation wins over
    /// failure: a cancelled run ends `Idle`, not `Error`.
    pub fn finish(&self, failed: bool) {
        let mut meta = self.meta.lock().unwrap();
        meta.status = if self.is_cancelled() {
            PipelineStatus::Idle
        } else if failed {
            PipelineStatus::Error
        } else {
            PipelineStatus::Done
        };
        meta.ended_at = Some(Utc::now());
    }

    pub fn status(&self) -> PipelineStatus {
        self.meta.lock().unwrap().status
    }

    pub fn mode(&self) -> PipelineMode {
        self.meta.lock().unwrap().mode
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn set_scrape_complete(&self) {
        self.scrape_complete.store(true, Ordering::SeqCst);
    }

    pub fn is_scrape_complete(&self) -> bool {
        self.scrape_complete.load(Ordering::SeqCst)
    }

    pub fn inc_scrape_total(&self) {
        self.scrape_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_scrape_new(&self) {
        self.scrape_new.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_enriched(&self) {
        self.enriched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_indexed(&self, count: u64) {
        self.indexed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn enriched(&self) -> u64 {
        self.enriched.load(Ordering::Relaxed)
    }

    pub fn indexed(&self) -> u64 {
        self.indexed.load(Ordering::Relaxed)
    }

    /// Append a line to the log ring and the tracing output.
    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");

        let mut logs = self.logs.lock().unwrap();
        if logs.len() == MAX_LOG_LINES {
            logs.pop_front();
        }
        logs.push_back(format!("{} {}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"), line));
    }

    pub fn snapshot(&self, queue_size: usize) -> PipelineSnapshot {
        let meta = self.meta.lock().unwrap();
        PipelineSnapshot {
            status: meta.status,
            mode: meta.mode,
            started_at: meta.started_at,
            ended_at: meta.ended_at,
            scrape_total: self.scrape_total.load(Ordering::Relaxed),
            scrape_new: self.scrape_new.load(Ordering::Relaxed),
            queue_size: queue_size as u64,
            enriched: self.enriched.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            scrape_complete: self.is_scrape_complete(),
            cancelled: self.is_cancelled(),
            logs: self.logs.lock().unwrap().iter().cloned().collect(),
        }
    }
}
