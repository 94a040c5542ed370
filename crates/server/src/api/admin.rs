//! Admin endpoints: pipeline control, schedule management, connectivity
//! status, and the sanitized config view.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use romshelf_core::{PipelineError, PipelineMode, ScheduleConfig, ScheduleError};

use crate::state::AppState;

/// Request body for starting a pipeline run.
#[derive(Debug, Default, Deserialize)]
pub struct StartPipelineRequest {
    #[serde(default)]
    pub mode: PipelineMode,
}

/// Generic action result.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// Connectivity and counts for the two downstream stores.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database: DatabaseStatus,
    pub index: IndexStatus,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub reachable: bool,
    pub total_games: u64,
    pub enriched_games: u64,
    pub search_logs: u64,
}

#[derive(Debug, Serialize)]
pub struct IndexStatus {
    pub reachable: bool,
    pub documents: u64,
}

/// Get the observable pipeline state.
pub async fn get_pipeline(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline().snapshot())
}

/// Start a pipeline run. 409 when a run is already active.
pub async fn start_pipeline(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<StartPipelineRequest>>,
) -> impl IntoResponse {
    let request = payload.map(|Json(body)| body).unwrap_or_default();

    match state.pipeline().start(request.mode) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ActionResponse {
                success: true,
                message: format!("pipeline started in {} mode", request.mode),
            }),
        ),
        Err(e @ PipelineError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(ActionResponse {
                success: false,
                message: e.to_string(),
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ActionResponse {
                success: false,
                message: e.to_string(),
            }),
        ),
    }
}

/// Request cancellation of the active run. 409 when nothing is running.
pub async fn stop_pipeline(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline().stop() {
        Ok(()) => (
            StatusCode::OK,
            Json(ActionResponse {
                success: true,
                message: "cancellation requested".to_string(),
            }),
        ),
        Err(e) => (
            StatusCode::CONFLICT,
            Json(ActionResponse {
                success: false,
                message: e.to_string(),
            }),
        ),
    }
}

/// Read the current schedule config.
pub async fn get_schedule(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler().config().await)
}

/// Validate and apply a schedule config.
pub async fn apply_schedule(
    State(state): State<Arc<AppState>>,
    Json(config): Json<ScheduleConfig>,
) -> impl IntoResponse {
    match state.scheduler().apply(config).await {
        Ok(applied) => (StatusCode::OK, Json(applied)).into_response(),
        Err(e @ ScheduleError::InvalidExpression(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ActionResponse {
                success: false,
                message: e.to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ActionResponse {
                success: false,
                message: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Store and index connectivity plus row/document counts.
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.catalog().stats() {
        Ok(stats) => DatabaseStatus {
            reachable: true,
            total_games: stats.total_games,
            enriched_games: stats.enriched_games,
            search_logs: stats.search_logs,
        },
        Err(e) => {
            warn!(error = %e, "catalog unreachable");
            DatabaseStatus {
                reachable: false,
                total_games: 0,
                enriched_games: 0,
                search_logs: 0,
            }
        }
    };

    let index = match state.index().document_count().await {
        Ok(documents) => IndexStatus {
            reachable: true,
            documents,
        },
        Err(e) => {
            warn!(error = %e, "index unreachable");
            IndexStatus {
                reachable: false,
                documents: 0,
            }
        }
    };

    Json(StatusResponse { database, index })
}

/// The running config with secrets redacted.
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.sanitized_config())
}
