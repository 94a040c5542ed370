//! SQLite-backed game catalog implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use tracing::warn;

use super::{
    CatalogError, CatalogStats, EnrichedFields, GameCatalog, GameRecord, NewGameRecord, UpsertedRow,
};

/// Column count of one row in the batched upsert statement.
const UPSERT_PARAMS_PER_ROW: usize = 9;

/// Chunk size for IN (...) clauses, kept well under the SQLite variable cap.
const IN_CHUNK: usize = 500;

/// SQLite-backed game catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open (or create) the catalog database at the given path.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(|e| CatalogError::Database(e.to_string()))?;
        let catalog = Self {
            conn: Mutex::new(conn),
        };
        catalog.init()?;
        Ok(catalog)
    }

    /// Create an in-memory catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::Database(e.to_string()))?;
        let catalog = Self {
            conn: Mutex::new(conn),
        };
        catalog.init()?;
        Ok(catalog)
    }

    fn ensure_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            -- One row per unique file URL on the archive
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                download_url TEXT NOT NULL UNIQUE,
                game_name TEXT NOT NULL,
                filename TEXT NOT NULL,
                platform TEXT NOT NULL DEFAULT '',
                group_name TEXT NOT NULL DEFAULT '',
                region TEXT NOT NULL DEFAULT '',
                size TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '[]',
                description TEXT,
                rating REAL,
                release_date TEXT,
                developer TEXT,
                publisher TEXT,
                genre TEXT,
                images TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_platform ON games(platform);
            CREATE INDEX IF NOT EXISTS idx_games_group_name ON games(group_name);

            -- Append-only log of searches served by the public API
            CREATE TABLE IF NOT EXISTS search_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                results INTEGER NOT NULL,
                searched_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_search_logs_searched_at ON search_logs(searched_at);
            CREATE INDEX IF NOT EXISTS idx_search_logs_query ON search_logs(query);
            "#,
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
        let tags_json: String = row.get(8)?;
        let images_json: Option<String> = row.get(15)?;
        let release_date: Option<String> = row.get(11)?;
        let created_at_str: String = row.get(16)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(GameRecord {
            id: row.get(0)?,
            download_url: row.get(1)?,
            game_name: row.get(2)?,
            filename: row.get(3)?,
            platform: row.get(4)?,
            group_name: row.get(5)?,
            region: row.get(6)?,
            size: row.get(7)?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            description: row.get(9)?,
            rating: row.get(10)?,
            release_date: release_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            developer: row.get(12)?,
            publisher: row.get(13)?,
            genre: row.get(14)?,
            images: images_json.and_then(|j| serde_json::from_str(&j).ok()),
            created_at,
        })
    }

    const GAME_COLUMNS: &'static str = "id, download_url, game_name, filename, platform, \
         group_name, region, size, tags, description, rating, release_date, developer, \
         publisher, genre, images, created_at";
}

impl GameCatalog for SqliteCatalog {
    fn init(&self) -> Result<(), CatalogError> {
        let conn = self.conn.lock().unwrap();
        Self::ensure_schema(&conn)?;

        // Search logs older than a year are dead weight
        let cutoff = (Utc::now() - Duration::days(365)).to_rfc3339();
        conn.execute(
            "DELETE FROM search_logs WHERE searched_at < ?",
            params![cutoff],
        )
        .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(())
    }

    fn batch_upsert(&self, records: &[NewGameRecord]) -> Result<Vec<UpsertedRow>, CatalogError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let row_placeholder = format!("({})", vec!["?"; UPSERT_PARAMS_PER_ROW].join(", "));
        let placeholders = vec![row_placeholder; records.len()].join(", ");
        let sql = format!(
            "INSERT INTO games (download_url, game_name, filename, platform, group_name, \
             region, size, tags, created_at) VALUES {placeholders} \
             ON CONFLICT(download_url) DO UPDATE SET \
                game_name = excluded.game_name, \
                platform = excluded.platform, \
                group_name = excluded.group_name, \
                region = excluded.region, \
                size = excluded.size, \
                tags = excluded.tags \
             RETURNING id, download_url, game_name, description, filename"
        );

        let mut values: Vec<Value> = Vec::with_capacity(records.len() * UPSERT_PARAMS_PER_ROW);
        for record in records {
            let tags_json = serde_json::to_string(&record.tags)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            values.push(record.download_url.clone().into());
            values.push(record.game_name.clone().into());
            values.push(record.filename.clone().into());
            values.push(record.platform.clone().into());
            values.push(record.group_name.clone().into());
            values.push(record.region.clone().into());
            values.push(record.size.clone().into());
            values.push(tags_json.into());
            values.push(now.clone().into());
        }

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        let mut rows = stmt
            .query(params_from_iter(values))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        // RETURNING order is not contractual; correlate on the unique URL.
        let mut by_url: HashMap<String, UpsertedRow> = HashMap::with_capacity(records.len());
        while let Some(row) = rows.next().map_err(|e| CatalogError::Database(e.to_string()))? {
            let url: String = row
                .get(1)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            let upserted = UpsertedRow {
                id: row.get(0).map_err(|e| CatalogError::Database(e.to_string()))?,
                game_name: row
                    .get(2)
                    .map_err(|e| CatalogError::Database(e.to_string()))?,
                description: row
                    .get(3)
                    .map_err(|e| CatalogError::Database(e.to_string()))?,
                filename: row
                    .get(4)
                    .map_err(|e| CatalogError::Database(e.to_string()))?,
            };
            by_url.insert(url, upserted);
        }

        records
            .iter()
            .map(|record| {
                by_url.get(&record.download_url).cloned().ok_or_else(|| {
                    CatalogError::Database(format!(
                        "upsert returned no row for {}",
                        record.download_url
                    ))
                })
            })
            .collect()
    }

    fn update_enrichment(
        &self,
        id: i64,
        fields: &EnrichedFields,
    ) -> Result<GameRecord, CatalogError> {
        let conn = self.conn.lock().unwrap();

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(description) = &fields.description {
            sets.push("description = ?");
            values.push(description.clone().into());
        }
        if let Some(rating) = fields.rating {
            sets.push("rating = ?");
            values.push(rating.into());
        }
        if let Some(release_date) = fields.release_date {
            sets.push("release_date = ?");
            values.push(release_date.format("%Y-%m-%d").to_string().into());
        }
        if let Some(developer) = &fields.developer {
            sets.push("developer = ?");
            values.push(developer.clone().into());
        }
        if let Some(publisher) = &fields.publisher {
            sets.push("publisher = ?");
            values.push(publisher.clone().into());
        }
        if let Some(genre) = &fields.genre {
            sets.push("genre = ?");
            values.push(genre.clone().into());
        }
        if let Some(images) = &fields.images {
            sets.push("images = ?");
            let json = serde_json::to_string(images)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            values.push(json.into());
        }

        if !sets.is_empty() {
            let sql = format!("UPDATE games SET {} WHERE id = ?", sets.join(", "));
            values.push(id.into());
            let updated = conn
                .execute(&sql, params_from_iter(values))
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            if updated == 0 {
                return Err(CatalogError::NotFound(id));
            }
        }

        conn.query_row(
            &format!("SELECT {} FROM games WHERE id = ?", Self::GAME_COLUMNS),
            params![id],
            Self::row_to_game,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CatalogError::NotFound(id),
            _ => CatalogError::Database(e.to_string()),
        })
    }

    fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<GameRecord>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();
        let mut games = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(IN_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT {} FROM games WHERE id IN ({})",
                Self::GAME_COLUMNS,
                placeholders
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), Self::row_to_game)
                .map_err(|e| CatalogError::Database(e.to_string()))?;
            for row in rows {
                games.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
            }
        }

        Ok(games)
    }

    fn all_urls(&self) -> Result<Vec<String>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT download_url FROM games")
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let mut urls = Vec::new();
        for row in rows {
            urls.push(row.map_err(|e| CatalogError::Database(e.to_string()))?);
        }
        Ok(urls)
    }

    fn delete_by_urls(&self, urls: &[String]) -> Result<usize, CatalogError> {
        if urls.is_empty() {
            return Ok(0);
        }

        let conn = self.conn.lock().unwrap();
        let mut deleted = 0;

        for chunk in urls.chunks(IN_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("DELETE FROM games WHERE download_url IN ({})", placeholders);
            deleted += conn
                .execute(&sql, params_from_iter(chunk.iter()))
                .map_err(|e| CatalogError::Database(e.to_string()))?;
        }

        Ok(deleted)
    }

    fn append_search_log(&self, query: &str, results: u32) {
        let normalized = query.trim().to_lowercase();
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO search_logs (query, results, searched_at) VALUES (?, ?, ?)",
            params![normalized, results, Utc::now().to_rfc3339()],
        );
        if let Err(e) = result {
            warn!(error = %e, "failed to append search log");
        }
    }

    fn stats(&self) -> Result<CatalogStats, CatalogError> {
        let conn = self.conn.lock().unwrap();

        let total_games: u64 = conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let enriched_games: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM games WHERE description IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        let search_logs: u64 = conn
            .query_row("SELECT COUNT(*) FROM search_logs", [], |row| row.get(0))
            .map_err(|e| CatalogError::Database(e.to_string()))?;

        Ok(CatalogStats {
            total_games,
            enriched_games,
            search_logs,
        })
    }

    fn clear(&self) -> Result<(), CatalogError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM games", [])
            .map_err(|e| CatalogError::Database(e.to_string()))?;
        Ok(())
    }
}
