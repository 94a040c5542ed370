use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub archive: ArchiveConfig,
    pub index: IndexConfig,
    /// Metadata provider credentials. Absent means enrichment is disabled;
    /// crawling still runs.
    #[serde(default)]
    pub igdb: Option<IgdbConfig>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration for the admin surface
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared admin key for the api_key method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// No authentication - all requests allowed
    None,
    /// Shared key in Authorization: Bearer or X-API-Key
    ApiKey,
}

/// Catalog database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("romshelf.db")
}

/// Archive configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    /// Root of the directory-listing tree, e.g. "https://archive.example/files/".
    pub base_url: String,
}

/// Search index configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Index service URL, e.g. "http://localhost:7700".
    pub url: String,
    /// Index service API key (empty when the service runs unprotected).
    #[serde(default)]
    pub api_key: String,
}

/// IGDB metadata provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IgdbConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Token endpoint override (defaults to the Twitch id host).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    /// API endpoint override (defaults to the IGDB v4 host).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// Ingestion pipeline tunables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Maximum concurrent listing fetches.
    #[serde(default = "default_crawl_concurrency")]
    pub crawl_concurrency: usize,
    /// Records per batched catalog upsert.
    #[serde(default = "default_db_batch_size")]
    pub db_batch_size: usize,
    /// Enrichment worker count.
    #[serde(default = "default_enrich_workers")]
    pub enrich_workers: usize,
    /// Names per provider multi-query.
    #[serde(default = "default_enrich_batch_size")]
    pub enrich_batch_size: usize,
    /// Per-worker sleep after each provider call, in milliseconds. Worker
    /// start is staggered by delay / workers so the pool stays inside the
    /// provider's request budget.
    #[serde(default = "default_enrich_worker_delay_ms")]
    pub enrich_worker_delay_ms: u64,
    /// Per-fetch timeout against the archive, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_crawl_concurrency() -> usize {
    20
}

fn default_db_batch_size() -> usize {
    500
}

fn default_enrich_workers() -> usize {
    4
}

fn default_enrich_batch_size() -> usize {
    10
}

fn default_enrich_worker_delay_ms() -> u64 {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            crawl_concurrency: default_crawl_concurrency(),
            db_batch_size: default_db_batch_size(),
            enrich_workers: default_enrich_workers(),
            enrich_batch_size: default_enrich_batch_size(),
            enrich_worker_delay_ms: default_enrich_worker_delay_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Where the persisted schedule document lives.
    #[serde(default = "default_schedule_path")]
    pub schedule_path: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_path: default_schedule_path(),
        }
    }
}

fn default_schedule_path() -> PathBuf {
    PathBuf::from("schedule.json")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub archive: ArchiveConfig,
    pub index: SanitizedIndexConfig,
    pub igdb_configured: bool,
    pub pipeline: PipelineConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
}

/// Sanitized index config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedIndexConfig {
    pub url: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
            },
            server: config.server.clone(),
            database: config.database.clone(),
            archive: config.archive.clone(),
            index: SanitizedIndexConfig {
                url: config.index.url.clone(),
                api_key_configured: !config.index.api_key.is_empty(),
            },
            igdb_configured: config
                .igdb
                .as_ref()
                .map(|c| !c.client_id.is_empty() && !c.client_secret.is_empty())
                .unwrap_or(false),
            pipeline: config.pipeline.clone(),
            scheduler: config.scheduler.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
[auth]
method = "none"

[archive]
base_url = "https://archive.example/files/"

[index]
url = "http://localhost:7700"
"#
    }

    #[test]
    fn test_deserialize_minimal_config() {
        let config: Config = toml::from_str(minimal_toml()).unwrap();
        assert!(matches!(config.auth.method, AuthMethod::None));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path.to_str().unwrap(), "romshelf.db");
        assert_eq!(config.archive.base_url, "https://archive.example/files/");
        assert!(config.igdb.is_none());
    }

    #[test]
    fn test_pipeline_defaults() {
        let config: Config = toml::from_str(minimal_toml()).unwrap();
        assert_eq!(config.pipeline.crawl_concurrency, 20);
        assert_eq!(config.pipeline.db_batch_size, 500);
        assert_eq!(config.pipeline.enrich_workers, 4);
        assert_eq!(config.pipeline.enrich_batch_size, 10);
        assert_eq!(config.pipeline.enrich_worker_delay_ms, 1000);
        assert_eq!(config.pipeline.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_deserialize_missing_archive_fails() {
        let toml = r#"
[auth]
method = "none"

[index]
url = "http://localhost:7700"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_igdb_section() {
        let toml = r#"
[auth]
method = "api_key"
api_key = "shh"

[archive]
base_url = "https://archive.example/files/"

[index]
url = "http://localhost:7700"
api_key = "master-key"

[igdb]
client_id = "abc"
client_secret = "def"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let igdb = config.igdb.as_ref().unwrap();
        assert_eq!(igdb.client_id, "abc");
        assert_eq!(igdb.client_secret, "def");
        assert!(igdb.token_url.is_none());
    }

    #[test]
    fn test_sanitized_config_redacts_secrets() {
        let toml = r#"
[auth]
method = "api_key"
api_key = "shh"

[archive]
base_url = "https://archive.example/files/"

[index]
url = "http://localhost:7700"
api_key = "master-key"

[igdb]
client_id = "abc"
client_secret = "def"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.auth.method, "api_key");
        assert!(sanitized.index.api_key_configured);
        assert!(sanitized.igdb_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("master-key"));
        assert!(!json.contains("def"));
    }
}
