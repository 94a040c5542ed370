pub mod auth;
pub mod catalog;
pub mod config;
pub mod crawler;
pub mod index;
pub mod metadata;
pub mod pipeline;
pub mod scheduler;
pub mod testing;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use catalog::{CatalogError, GameCatalog, GameRecord, SqliteCatalog};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use index::{GameDocument, HttpSearchIndex, IndexError, SearchIndex};
pub use metadata::{IgdbClient, MetadataError, MetadataProvider};
pub use pipeline::{Pipeline, PipelineError, PipelineMode, PipelineSnapshot, PipelineStatus};
pub use scheduler::{ScheduleConfig, ScheduleError, Scheduler};
