//! REST client for the search index service.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::IndexConfig;

use super::{GameDocument, IndexError, SearchIndex};
use async_trait::async_trait;

/// Index uid holding the game documents.
const INDEX_UID: &str = "games";

/// HTTP-backed search index.
pub struct HttpSearchIndex {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpSearchIndex {
    /// Create a new index client.
    pub fn new(config: &IndexConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        request
    }

    async fn check(response: Response) -> Result<Response, IndexError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(IndexError::Api {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn init(&self) -> Result<(), IndexError> {
        let response = self
            .request(Method::GET, &format!("/indexes/{INDEX_UID}"))
            .send()
            .await
            .map_err(|e| IndexError::Http(e.to_string()))?;

        if response.status().as_u16() == 404 {
            debug!(index = INDEX_UID, "creating search index");
            let response = self
                .request(Method::POST, "/indexes")
                .json(&json!({ "uid": INDEX_UID, "primaryKey": "id" }))
                .send()
                .await
                .map_err(|e| IndexError::Http(e.to_string()))?;
            Self::check(response).await?;
        } else {
            Self::check(response).await?;
        }

        let settings = json!({
            "searchableAttributes": ["game_name", "genre", "developer", "description", "tags"],
            "filterableAttributes": ["platform", "region", "tags", "genre"],
            "sortableAttributes": ["rating", "release_date"],
        });
        let response = self
            .request(Method::PATCH, &format!("/indexes/{INDEX_UID}/settings"))
            .json(&settings)
            .send()
            .await
            .map_err(|e| IndexError::Http(e.to_string()))?;
        Self::check(response).await?;

        Ok(())
    }

    async fn add_documents(&self, documents: &[GameDocument]) -> Result<(), IndexError> {
        if documents.is_empty() {
            return Ok(());
        }

        let response = self
            .request(Method::POST, &format!("/indexes/{INDEX_UID}/documents"))
            .json(documents)
            .send()
            .await
            .map_err(|e| IndexError::Http(e.to_string()))?;
        Self::check(response).await?;

        debug!(count = documents.len(), "indexed documents");
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), IndexError> {
        let response = self
            .request(Method::DELETE, &format!("/indexes/{INDEX_UID}/documents"))
            .send()
            .await
            .map_err(|e| IndexError::Http(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn document_count(&self) -> Result<u64, IndexError> {
        let response = self
            .request(Method::GET, &format!("/indexes/{INDEX_UID}/stats"))
            .send()
            .await
            .map_err(|e| IndexError::Http(e.to_string()))?;
        let response = Self::check(response).await?;

        let stats: IndexStats = response
            .json()
            .await
            .map_err(|e| IndexError::Parse(e.to_string()))?;
        Ok(stats.number_of_documents)
    }

    async fn health(&self) -> Result<(), IndexError> {
        let response = self
            .request(Method::GET, "/health")
            .send()
            .await
            .map_err(|e| IndexError::Http(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct IndexStats {
    #[serde(rename = "numberOfDocuments")]
    number_of_documents: u64,
}
