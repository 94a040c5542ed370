//! Types for the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to direct callers of the pipeline. Everything else is
/// downgraded to log lines inside the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline already running")]
    AlreadyRunning,

    #[error("pipeline is not running")]
    NotRunning,
}

/// How a run treats existing rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Retain prior rows, update in place, prune URLs not seen this run.
    #[default]
    Incremental,
    /// Wipe the store and the index before crawling.
    Clean,
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineMode::Incremental => write!(f, "incremental"),
            PipelineMode::Clean => write!(f, "clean"),
        }
    }
}

/// Lifecycle of the pipeline. Cancellation terminates a run but returns the
/// pipeline to `Idle`, not `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Idle,
    Running,
    Done,
    Error,
}

/// Point-in-time view of the pipeline, served to admin callers.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSnapshot {
    pub status: PipelineStatus,
    pub mode: PipelineMode,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub scrape_total: u64,
    pub scrape_new: u64,
    pub queue_size: u64,
    pub enriched: u64,
    pub indexed: u64,
    pub scrape_complete: bool,
    pub cancelled: bool,
    pub logs: Vec<String>,
}
