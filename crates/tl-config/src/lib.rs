//! tablog sink configuration loading and validation.
//!
//! This crate provides:
//! - Typed `SinkConfig` deserialized from TOML or JSON
//! - Field-to-column declarations given inline or as a JSON file path
//! - Config resolution (CLI → env → XDG → none) and env overrides
//! - Semantic validation with stable error codes

pub mod columns;
pub mod load;
pub mod resolve;
pub mod sink;
pub mod validate;

pub use columns::ColumnDeclarations;
pub use load::{load_sink_config, ConfigError, ConfigOptions, LoadedConfig};
pub use resolve::{resolve_config_path, ConfigSource};
pub use sink::{ChunkFailurePolicy, SinkConfig};
pub use validate::{ValidationError, ValidationResult};

/// Default payload ceiling for one bulk insert: 30 MiB.
pub const DEFAULT_PAYLOAD_CEILING_BYTES: usize = 30 * 1024 * 1024;

/// Default bound on a schema describe call.
pub const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 5_000;
