//! Configuration path discovery.
//!
//! Resolution order: CLI argument → `TABLOG_CONFIG` → XDG config dir → none.

use std::path::{Path, PathBuf};

/// Where the sink configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// No file found.
    #[default]
    None,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::None => write!(f, "none"),
        }
    }
}

/// Environment variable naming the config file.
pub const ENV_CONFIG_PATH: &str = "TABLOG_CONFIG";

/// Standard config file name inside the XDG directory.
const SINK_FILENAME: &str = "sink.toml";

/// Application name for XDG directories.
const APP_NAME: &str = "tablog";

/// Resolve the sink configuration file path.
///
/// An explicit CLI path is returned even if it does not exist, so the
/// loader can report it; the other sources are only used when present.
pub fn resolve_config_path(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    // 1. CLI argument
    if let Some(path) = cli_path {
        return (Some(path.to_path_buf()), ConfigSource::CliArgument);
    }

    // 2. Environment variable
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    // 3. XDG config directory
    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(SINK_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }

    (None, ConfigSource::None)
}

/// Get the XDG config directory for tablog.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
