use chrono::DateTime;
use serde::Deserialize;

use crate::catalog::EnrichedFields;

/// A provider hit, in the provider's own shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameMetadata {
    pub name: Option<String>,
    pub summary: Option<String>,
    /// 0-100 scale.
    pub rating: Option<f64>,
    /// Unix seconds.
    pub first_release_date: Option<i64>,
    #[serde(default)]
    pub involved_companies: Vec<InvolvedCompany>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub cover: Option<Image>,
    #[serde(default)]
    pub screenshots: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvolvedCompany {
    pub company: Company,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Company {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    pub url: Option<String>,
}

/// Map a provider hit into catalog enrichment fields.
///
/// The provider rates 0-100; the catalog stores 0-5 with two decimals. The
/// first involved company fills both developer and publisher. Images are the
/// cover plus the first three screenshots, with protocol-relative URLs made
/// absolute and thumbnail renditions swapped for 1080p.
pub fn normalize(meta: &GameMetadata) -> EnrichedFields {
    let rating = meta.rating.map(|r| (r / 20.0 * 100.0).round() / 100.0);

    let release_date = meta
        .first_release_date
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.date_naive());

    let company = meta
        .involved_companies
        .first()
        .and_then(|ic| ic.company.name.clone());

    let genre = if meta.genres.is_empty() {
        None
    } else {
        Some(
            meta.genres
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )
    };

    let mut images = Vec::new();
    if let Some(url) = meta.cover.as_ref().and_then(|c| c.url.as_deref()) {
        images.push(normalize_image_url(url));
    }
    for screenshot in meta.screenshots.iter().take(3) {
        if let Some(url) = screenshot.url.as_deref() {
            images.push(normalize_image_url(url));
        }
    }

    EnrichedFields {
        description: Some(meta.summary.clone().unwrap_or_default()),
        rating,
        release_date,
        developer: company.clone(),
        publisher: company,
        genre,
        images: if images.is_empty() { None } else { Some(images) },
    }
}

fn normalize_image_url(url: &str) -> String {
    let url = if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    };
    url.replace("t_thumb", "t_1080p")
}
