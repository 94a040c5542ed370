use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the catalog store.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(String),

    #[error("game not found: id {0}")]
    NotFound(i64),
}

/// A full catalog row.
///
/// `description` doubles as the enrichment sentinel: NULL means the metadata
/// provider has never been asked about this record, an empty string means it
/// was asked and had no hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: i64,
    pub download_url: String,
    pub game_name: String,
    pub filename: String,
    pub platform: String,
    pub group_name: String,
    pub region: String,
    pub size: String,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub release_date: Option<NaiveDate>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub images: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl GameRecord {
    /// Whether enrichment has been attempted for this record.
    pub fn is_enriched(&self) -> bool {
        self.description.is_some()
    }
}

/// A record as produced by the crawler, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGameRecord {
    pub download_url: String,
    pub game_name: String,
    pub filename: String,
    pub platform: String,
    pub group_name: String,
    pub region: String,
    pub size: String,
    pub tags: Vec<String>,
}

/// The slice of a row returned by a batched upsert, enough for the crawler
/// to route the record onward.
#[derive(Debug, Clone)]
pub struct UpsertedRow {
    pub id: i64,
    pub game_name: String,
    pub description: Option<String>,
    pub filename: String,
}

/// Enrichment fields to write onto a row. `None` means "leave untouched".
#[derive(Debug, Clone, Default)]
pub struct EnrichedFields {
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub release_date: Option<NaiveDate>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub images: Option<Vec<String>>,
}

impl EnrichedFields {
    /// The "provider was asked, no hit" sentinel.
    pub fn unmatched() -> Self {
        Self {
            description: Some(String::new()),
            ..Self::default()
        }
    }
}

/// Catalog counts for the admin status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogStats {
    pub total_games: u64,
    pub enriched_games: u64,
    pub search_logs: u64,
}
