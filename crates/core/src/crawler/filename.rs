//! Filename parser - splits a ROM filename into base title, bracketed tags,
//! and a region classification.
//!
//! Pure and stateless; the crawler runs it on every decoded file leaf.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Tag groups whose pieces are countries/regions rather than languages,
/// revisions, or dump flags. Lowercased.
const REGION_VOCABULARY: &[&str] = &[
    "usa",
    "japan",
    "europe",
    "world",
    "asia",
    "australia",
    "brazil",
    "canada",
    "china",
    "denmark",
    "finland",
    "france",
    "germany",
    "greece",
    "hong kong",
    "israel",
    "italy",
    "korea",
    "netherlands",
    "norway",
    "poland",
    "portugal",
    "russia",
    "spain",
    "sweden",
    "taiwan",
    "uk",
    "united kingdom",
];

/// Parsed pieces of a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    /// Title before the first `(` or `[`, extension stripped, trimmed.
    pub base_name: String,
    /// Every `(...)` / `[...]` group, in order of appearance.
    pub tags: Vec<String>,
    /// The first region-classified tag, verbatim; empty when none matched.
    pub region: String,
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^)]*)\)|\[([^\]]*)\]").unwrap())
}

/// Parse a filename into `{base_name, tags, region}`.
pub fn parse_filename(filename: &str) -> ParsedFilename {
    let stem = match filename.rfind('.') {
        Some(idx) => &filename[..idx],
        None => filename,
    };

    let base_end = stem.find(['(', '[']).unwrap_or(stem.len());
    let base_name = stem[..base_end].trim().to_string();

    let mut tags = Vec::new();
    for caps in tag_regex().captures_iter(stem) {
        let tag = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or("");
        tags.push(tag.to_string());
    }

    let region = tags
        .iter()
        .find(|tag| is_region_tag(tag))
        .cloned()
        .unwrap_or_default();

    ParsedFilename {
        base_name,
        tags,
        region,
    }
}

/// A tag counts as a region when at least half of its `,`/`+` separated
/// pieces are in the region vocabulary.
fn is_region_tag(tag: &str) -> bool {
    let pieces: Vec<String> = tag
        .split([',', '+'])
        .map(|piece| piece.trim().to_lowercase())
        .filter(|piece| !piece.is_empty())
        .collect();
    if pieces.is_empty() {
        return false;
    }

    let hits = pieces
        .iter()
        .filter(|piece| REGION_VOCABULARY.contains(&piece.as_str()))
        .count();
    hits * 2 >= pieces.len()
}
