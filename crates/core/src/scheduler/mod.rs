//! Cron scheduler for the ingestion pipeline.
//!
//! A single persisted document `{enabled, mode, expression}` drives one
//! registered job. Expressions are standard 5-field cron, evaluated in UTC.
//! Applying a config validates the expression first; invalid expressions are
//! rejected without mutating the persisted document or the running job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};
use uuid::Uuid;

use crate::pipeline::{Pipeline, PipelineError, PipelineMode};

/// Errors from the scheduler.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression: {0}")]
    InvalidExpression(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("failed to persist schedule: {0}")]
    Persist(String),
}

/// The persisted schedule document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub enabled: bool,
    #[serde(default)]
    pub mode: PipelineMode,
    pub expression: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: PipelineMode::Incremental,
            expression: "0 3 * * *".to_string(),
        }
    }
}

struct Inner {
    sched: JobScheduler,
    job_id: Option<Uuid>,
    config: ScheduleConfig,
}

/// Fires the pipeline on a cron schedule.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl Scheduler {
    /// Load the persisted config (or the default) and start the job runner.
    /// A broken persisted job is logged, not fatal: the server still comes up.
    pub async fn start(pipeline: Arc<Pipeline>, path: PathBuf) -> Result<Self, ScheduleError> {
        let config = Self::load(&path);

        let sched = JobScheduler::new()
            .await
            .map_err(|e| ScheduleError::Scheduler(e.to_string()))?;
        sched
            .start()
            .await
            .map_err(|e| ScheduleError::Scheduler(e.to_string()))?;

        let scheduler = Self {
            pipeline,
            path,
            inner: Mutex::new(Inner {
                sched,
                job_id: None,
                config: config.clone(),
            }),
        };

        if config.enabled {
            if let Err(e) = scheduler.register(&config).await {
                warn!(error = %e, "persisted schedule could not be registered");
            } else {
                info!(expression = %config.expression, mode = %config.mode, "schedule registered");
            }
        }

        Ok(scheduler)
    }

    fn load(path: &Path) -> ScheduleConfig {
        match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "unreadable schedule document, using defaults");
                ScheduleConfig::default()
            }),
            Err(_) => ScheduleConfig::default(),
        }
    }

    /// The currently applied config.
    pub async fn config(&self) -> ScheduleConfig {
        self.inner.lock().await.config.clone()
    }

    /// Syntactic validation of a cron expression.
    pub fn validate_expression(expression: &str) -> Result<(), ScheduleError> {
        Job::new_async(Self::with_seconds_field(expression).as_str(), |_uuid, _lock| {
            Box::pin(async {})
        })
        .map(|_| ())
        .map_err(|e| ScheduleError::InvalidExpression(format!("{expression}: {e}")))
    }

    /// `tokio-cron-scheduler` requires a leading seconds field; standard
    /// 5-field cron expressions implicitly fire at second 0.
    fn with_seconds_field(expression: &str) -> String {
        format!("0 {expression}")
    }

    /// Validate, persist, and swap the registered job for the new config.
    pub async fn apply(&self, new_config: ScheduleConfig) -> Result<ScheduleConfig, ScheduleError> {
        Self::validate_expression(&new_config.expression)?;

        let json = serde_json::to_string_pretty(&new_config)
            .map_err(|e| ScheduleError::Persist(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| ScheduleError::Persist(e.to_string()))?;

        let mut inner = self.inner.lock().await;
        if let Some(job_id) = inner.job_id.take() {
            let _ = inner.sched.remove(&job_id).await;
        }
        if new_config.enabled {
            let job = self.make_job(&new_config)?;
            let job_id = inner
                .sched
                .add(job)
                .await
                .map_err(|e| ScheduleError::Scheduler(e.to_string()))?;
            inner.job_id = Some(job_id);
        }
        inner.config = new_config.clone();

        info!(
            enabled = new_config.enabled,
            expression = %new_config.expression,
            mode = %new_config.mode,
            "schedule applied"
        );
        Ok(new_config)
    }

    async fn register(&self, config: &ScheduleConfig) -> Result<(), ScheduleError> {
        let job = self.make_job(config)?;
        let mut inner = self.inner.lock().await;
        let job_id = inner
            .sched
            .add(job)
            .await
            .map_err(|e| ScheduleError::Scheduler(e.to_string()))?;
        inner.job_id = Some(job_id);
        Ok(())
    }

    fn make_job(&self, config: &ScheduleConfig) -> Result<Job, ScheduleError> {
        let pipeline = Arc::clone(&self.pipeline);
        let mode = config.mode;

        Job::new_async(Self::with_seconds_field(&config.expression).as_str(), move |_uuid, _lock| {
            let pipeline = Arc::clone(&pipeline);
            Box::pin(async move {
                info!(%mode, "scheduled pipeline run firing");
                match pipeline.start(mode) {
                    Ok(()) => {}
                    // A concurrent manual run owns the slot; skip this tick
                    Err(PipelineError::AlreadyRunning) => {
                        warn!("scheduled run skipped, pipeline already running");
                    }
                    Err(e) => warn!(error = %e, "scheduled run failed to start"),
                }
            })
        })
        .map_err(|e| ScheduleError::InvalidExpression(format!("{}: {e}", config.expression)))
    }
}
