use serde::{Deserialize, Serialize};

use crate::catalog::GameRecord;

/// A catalog row shaped for the search index.
///
/// `release_date` is serialized as `YYYY-MM-DD`; fields that are absent on
/// the row are transmitted as explicit nulls so a re-index clears stale
/// values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDocument {
    pub id: i64,
    pub game_name: String,
    pub filename: String,
    pub platform: String,
    pub group_name: String,
    pub region: String,
    pub size: String,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub release_date: Option<String>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub images: Option<Vec<String>>,
}

impl From<&GameRecord> for GameDocument {
    fn from(record: &GameRecord) -> Self {
        Self {
            id: record.id,
            game_name: record.game_name.clone(),
            filename: record.filename.clone(),
            platform: record.platform.clone(),
            group_name: record.group_name.clone(),
            region: record.region.clone(),
            size: record.size.clone(),
            tags: record.tags.clone(),
            description: record.description.clone(),
            rating: record.rating,
            release_date: record
                .release_date
                .map(|date| date.format("%Y-%m-%d").to_string()),
            developer: record.developer.clone(),
            publisher: record.publisher.clone(),
            genre: record.genre.clone(),
            images: record.images.clone(),
        }
    }
}
