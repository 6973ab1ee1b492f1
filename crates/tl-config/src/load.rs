//! Sink configuration loading.
//!
//! Files ending in `.json` are parsed as JSON, everything else as TOML.
//! Environment overrides are applied after the file is parsed and before
//! validation.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::resolve::{resolve_config_path, ConfigSource};
use crate::sink::SinkConfig;
use crate::validate::{validate_sink, ValidationError};

/// Environment overrides.
pub const ENV_TABLE_PATH: &str = "TABLOG_TABLE_PATH";
pub const ENV_PAYLOAD_CEILING: &str = "TABLOG_PAYLOAD_CEILING";
pub const ENV_CHUNK_FAILURE: &str = "TABLOG_CHUNK_FAILURE";
pub const ENV_LOG_LEVEL: &str = "TABLOG_LOG_LEVEL";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no sink configuration found (pass --config or set TABLOG_CONFIG)")]
    NotFound,

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {var}: {message}")]
    EnvOverride { var: String, message: String },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl From<ConfigError> for tl_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ValidationError(inner) => inner.into(),
            other => tl_common::Error::Config(other.to_string()),
        }
    }
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config file path (highest priority).
    pub config_path: Option<PathBuf>,
}

/// Loaded configuration with provenance.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SinkConfig,
    pub path: PathBuf,
    pub source: ConfigSource,
}

/// Load, override, and validate the sink configuration.
pub fn load_sink_config(options: &ConfigOptions) -> Result<LoadedConfig, ConfigError> {
    let (path, source) = resolve_config_path(options.config_path.as_deref());
    let path = path.ok_or(ConfigError::NotFound)?;

    let mut config = load_sink_file(&path)?;
    apply_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_sink(&config)?;

    Ok(LoadedConfig {
        config,
        path,
        source,
    })
}

/// Parse one config file without overrides or semantic validation.
pub fn load_sink_file(path: &Path) -> Result<SinkConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    } else {
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_overrides<F>(config: &mut SinkConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(table_path) = lookup(ENV_TABLE_PATH) {
        config.table_path = table_path;
    }

    if let Some(value) = lookup(ENV_PAYLOAD_CEILING) {
        config.payload_ceiling_bytes =
            value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::EnvOverride {
                    var: ENV_PAYLOAD_CEILING.to_string(),
                    message: e.to_string(),
                })?;
    }

    if let Some(value) = lookup(ENV_CHUNK_FAILURE) {
        config.on_chunk_failure = value
            .parse()
            .map_err(|message| ConfigError::EnvOverride {
                var: ENV_CHUNK_FAILURE.to_string(),
                message,
            })?;
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.log_level = Some(level);
    }

    Ok(())
}
