//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from environment, and validate configuration.
///
/// A missing file is not an error: defaults are used instead.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) if path.exists() => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        Some(path) => {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            ServiceConfig::default()
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on top of file values.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("BANXICO_TOKEN") {
        config.upstream.token = v;
    }
    if let Some(v) = lookup("BANXICO_API_BASE_URL") {
        config.upstream.base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = lookup("BANXICO_SERIES_ID") {
        config.upstream.series_id = v;
    }
    if let Some(v) = lookup("REDIS_URL") {
        config.cache.url = v;
    }
    if let Some(v) = lookup("DATABASE_URL") {
        config.database.url = v;
        config.database.enabled = true;
    }
    if let Some(v) = lookup("LOG_LEVEL") {
        config.observability.log_level = v.to_lowercase();
    }
    if let Some(v) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
}
