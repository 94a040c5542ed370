use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides. Nested keys follow the TOML shape, so
/// `ROMSHELF_SERVER_PORT=9000` overrides `[server] port` and
/// `ROMSHELF_INDEX_URL` overrides `[index] url`.
const ENV_PREFIX: &str = "ROMSHELF_";

/// Load configuration: TOML file first, `ROMSHELF_*` environment on top.
///
/// The file is read eagerly so a missing file surfaces as `FileNotFound`
/// rather than as a parse failure buried in the figment error chain.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.display().to_string()),
        _ => ConfigError::ParseError(format!("{}: {e}", path.display())),
    })?;

    Figment::new()
        .merge(Toml::string(&text))
        .merge(Env::prefixed(ENV_PREFIX).split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse configuration from TOML text alone, without environment overrides.
/// Used by tests that need a fully deterministic config.
pub fn load_config_from_str(toml_text: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_text).map_err(|e| ConfigError::ParseError(e.to_string()))
}
