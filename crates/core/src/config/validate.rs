use url::Url;

use super::{types::AuthMethod, Config, ConfigError};

/// Validate a loaded configuration.
///
/// Catches the mistakes that would otherwise only surface mid-run: a base URL
/// the crawler cannot resolve against, a missing admin key, half-configured
/// provider credentials, or zeroed pipeline tunables.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let base = Url::parse(&config.archive.base_url)
        .map_err(|e| ConfigError::ValidationError(format!("archive.base_url: {}", e)))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::ValidationError(format!(
            "archive.base_url must be http(s), got {}",
            base.scheme()
        )));
    }
    if !base.path().ends_with('/') {
        return Err(ConfigError::ValidationError(
            "archive.base_url must end with '/' (it names a listing directory)".to_string(),
        ));
    }

    if config.index.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "index.url must not be empty".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().unwrap_or("").is_empty()
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key is required when auth.method is api_key".to_string(),
        ));
    }

    if let Some(igdb) = &config.igdb {
        if igdb.client_id.is_empty() || igdb.client_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "igdb.client_id and igdb.client_secret must both be set".to_string(),
            ));
        }
    }

    let p = &config.pipeline;
    if p.crawl_concurrency == 0
        || p.db_batch_size == 0
        || p.enrich_workers == 0
        || p.enrich_batch_size == 0
    {
        return Err(ConfigError::ValidationError(
            "pipeline sizes must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
