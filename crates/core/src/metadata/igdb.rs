//! IGDB API client.
//!
//! Auth is the Twitch client-credentials flow; lookups go through the
//! `/multiquery` endpoint with one aliased subquery per name.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::IgdbConfig;

use super::{GameMetadata, MetadataError, MetadataProvider};

const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const DEFAULT_API_URL: &str = "https://api.igdb.com/v4";

/// Provider cap on aliased subqueries per multiquery call.
pub const MULTIQUERY_LIMIT: usize = 10;

/// IGDB metadata client.
pub struct IgdbClient {
    client: Client,
    config: IgdbConfig,
    token: RwLock<Option<String>>,
}

impl IgdbClient {
    /// Create a new client. Fails when credentials are missing.
    pub fn new(config: IgdbConfig) -> Result<Self, MetadataError> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(MetadataError::NotConfigured(
                "client_id and client_secret are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MetadataError::Http(e.to_string()))?;

        Ok(Self {
            client,
            config,
            token: RwLock::new(None),
        })
    }

    fn token_url(&self) -> &str {
        self.config.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL)
    }

    fn api_url(&self) -> &str {
        self.config.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// One newline-separated query block per name, aliased `q_<i>` so the
    /// response can be correlated back to its input.
    fn build_multiquery(names: &[String]) -> String {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                format!(
                    "query games \"q_{i}\" {{ fields name,summary,rating,first_release_date,\
                     involved_companies.company.name,genres.name,cover.url,screenshots.url; \
                     where name ~ \"{}\"*; sort popularity desc; limit 1; }};",
                    escape_query(name)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn escape_query(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Map aliased results back onto input positions. Aliases that are missing,
/// unparsable, or out of range fall through as misses.
fn correlate(results: Vec<MultiqueryResult>, len: usize) -> Vec<Option<GameMetadata>> {
    let mut out: Vec<Option<GameMetadata>> = vec![None; len];
    for entry in results {
        let Some(idx) = entry
            .name
            .strip_prefix("q_")
            .and_then(|s| s.parse::<usize>().ok())
        else {
            continue;
        };
        if idx < out.len() {
            out[idx] = entry.result.into_iter().next();
        }
    }
    out
}

#[async_trait]
impl MetadataProvider for IgdbClient {
    async fn authenticate(&self) -> Result<(), MetadataError> {
        let response = self
            .client
            .post(self.token_url())
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| MetadataError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::Auth(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MetadataError::Parse(e.to_string()))?;

        *self.token.write().await = Some(token.access_token);
        debug!("metadata provider token acquired");
        Ok(())
    }

    async fn batch_lookup(
        &self,
        names: &[String],
    ) -> Result<Vec<Option<GameMetadata>>, MetadataError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let token = self
            .token
            .read()
            .await
            .clone()
            .ok_or_else(|| MetadataError::Auth("no bearer token; authenticate first".to_string()))?;

        // Anything past the provider cap stays a miss for this call.
        let queried = &names[..names.len().min(MULTIQUERY_LIMIT)];
        let body = Self::build_multiquery(queried);

        let response = self
            .client
            .post(format!("{}/multiquery", self.api_url()))
            .header("Client-ID", &self.config.client_id)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| MetadataError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MetadataError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let results: Vec<MultiqueryResult> = response
            .json()
            .await
            .map_err(|e| MetadataError::Parse(e.to_string()))?;

        Ok(correlate(results, names.len()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MultiqueryResult {
    name: String,
    #[serde(default)]
    result: Vec<GameMetadata>,
}
