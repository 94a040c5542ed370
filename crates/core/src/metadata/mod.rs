//! Metadata provider client.
//!
//! Looks up game metadata against an external rate-limited API. The client
//! itself is stateless about pacing; the enrich workers own the request
//! budget. One bearer token is fetched per pipeline run and cached for its
//! duration.

mod igdb;
mod types;

pub use igdb::{IgdbClient, MULTIQUERY_LIMIT};
pub use types::{normalize, GameMetadata};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the metadata provider.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata provider not configured: {0}")]
    NotConfigured(String),

    #[error("metadata provider auth failed: {0}")]
    Auth(String),

    #[error("metadata request failed: {0}")]
    Http(String),

    #[error("metadata API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse metadata response: {0}")]
    Parse(String),
}

/// Trait for the metadata provider.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Acquire and cache the bearer token for this run.
    async fn authenticate(&self) -> Result<(), MetadataError>;

    /// Look up a batch of names in one provider call.
    ///
    /// The result is aligned with the input: `results[i]` is the best hit
    /// for `names[i]`, or `None` when the provider had no match (or its
    /// response for that alias was missing or malformed).
    async fn batch_lookup(
        &self,
        names: &[String],
    ) -> Result<Vec<Option<GameMetadata>>, MetadataError>;
}
