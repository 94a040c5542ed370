//! Search index adapter.
//!
//! The index itself is an external service; this module only knows the
//! operations the pipeline performs against it: schema initialization,
//! idempotent batched document upserts, a clean-mode wipe, and the counts
//! the admin surface reports.

mod document;
mod http;

pub use document::GameDocument;
pub use http::HttpSearchIndex;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the index service.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index request failed: {0}")]
    Http(String),

    #[error("index API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse index response: {0}")]
    Parse(String),
}

/// Trait for the search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Ensure the index exists with primary key `id` and the expected
    /// searchable/filterable/sortable attributes. Idempotent.
    async fn init(&self) -> Result<(), IndexError>;

    /// Upsert documents by primary key.
    async fn add_documents(&self, documents: &[GameDocument]) -> Result<(), IndexError>;

    /// Remove every document (clean mode).
    async fn delete_all(&self) -> Result<(), IndexError>;

    /// Number of documents currently in the index.
    async fn document_count(&self) -> Result<u64, IndexError>;

    /// Service liveness.
    async fn health(&self) -> Result<(), IndexError>;
}
