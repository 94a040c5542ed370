//! Game catalog - the relational store of record for crawled archive entries.
//!
//! The crawler upserts batches keyed on `download_url`, the enricher writes
//! provider metadata onto individual rows, and the pipeline prunes rows whose
//! URLs disappeared from the archive.

mod sqlite;
mod types;

pub use sqlite::SqliteCatalog;
pub use types::*;

/// Trait for the catalog store.
pub trait GameCatalog: Send + Sync {
    /// Ensure the schema exists and prune search logs older than one year.
    fn init(&self) -> Result<(), CatalogError>;

    /// Upsert a batch of crawled records in a single statement.
    ///
    /// On a `download_url` conflict only the crawl-owned columns
    /// (game_name, platform, group_name, region, size, tags) are updated;
    /// enrichment fields and `created_at` are preserved.
    ///
    /// Returns one row per input record, in input order.
    fn batch_upsert(&self, records: &[NewGameRecord]) -> Result<Vec<UpsertedRow>, CatalogError>;

    /// Write the provided enrichment fields onto a row and return the full
    /// resulting record.
    fn update_enrichment(
        &self,
        id: i64,
        fields: &EnrichedFields,
    ) -> Result<GameRecord, CatalogError>;

    /// Bulk select full rows by id. Unknown ids are silently absent.
    fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<GameRecord>, CatalogError>;

    /// All download URLs currently in the store.
    fn all_urls(&self) -> Result<Vec<String>, CatalogError>;

    /// Bulk delete by download URL. Returns the number of rows removed.
    fn delete_by_urls(&self, urls: &[String]) -> Result<usize, CatalogError>;

    /// Append a search-log row. Best effort: failures are logged, never
    /// surfaced to the caller.
    fn append_search_log(&self, query: &str, results: u32);

    /// Row counts for the admin status endpoint.
    fn stats(&self) -> Result<CatalogStats, CatalogError>;

    /// Delete every game row (clean mode).
    fn clear(&self) -> Result<(), CatalogError>;
}
