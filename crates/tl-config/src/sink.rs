//! Sink configuration consumed by the write engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::columns::ColumnDeclarations;

/// What the batch writer does after a non-drift chunk failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkFailurePolicy {
    /// Stop at the first failed chunk; later rows are not sent (default).
    #[default]
    Stop,
    /// Record the failure and keep submitting the remaining chunks.
    Continue,
}

impl std::str::FromStr for ChunkFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stop" | "stop_on_first" => Ok(ChunkFailurePolicy::Stop),
            "continue" | "continue_remaining" => Ok(ChunkFailurePolicy::Continue),
            _ => Err(format!("unknown chunk failure policy: {}", s)),
        }
    }
}

impl std::fmt::Display for ChunkFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkFailurePolicy::Stop => write!(f, "stop"),
            ChunkFailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

/// Configuration for one destination table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkConfig {
    /// Table path relative to the store root.
    pub table_path: String,

    /// Field-to-column declarations.
    pub columns: ColumnDeclarations,

    /// Payload ceiling for one bulk insert, in estimated bytes.
    #[serde(default = "default_payload_ceiling")]
    pub payload_ceiling_bytes: usize,

    /// Behavior after a non-drift chunk failure.
    #[serde(default)]
    pub on_chunk_failure: ChunkFailurePolicy,

    /// Bound on a describe-table call, in milliseconds.
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,

    /// Log level override (trace, debug, info, warn, error, off).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

fn default_payload_ceiling() -> usize {
    crate::DEFAULT_PAYLOAD_CEILING_BYTES
}

fn default_resolve_timeout_ms() -> u64 {
    crate::DEFAULT_RESOLVE_TIMEOUT_MS
}

impl SinkConfig {
    /// Create config with defaults.
    pub fn new(table_path: impl Into<String>, columns: ColumnDeclarations) -> Self {
        SinkConfig {
            table_path: table_path.into(),
            columns,
            payload_ceiling_bytes: default_payload_ceiling(),
            on_chunk_failure: ChunkFailurePolicy::default(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
            log_level: None,
        }
    }

    /// Set a custom payload ceiling.
    pub fn with_payload_ceiling(mut self, bytes: usize) -> Self {
        self.payload_ceiling_bytes = bytes;
        self
    }

    /// Set the chunk failure policy.
    pub fn with_chunk_failure_policy(mut self, policy: ChunkFailurePolicy) -> Self {
        self.on_chunk_failure = policy;
        self
    }

    /// Set the describe timeout.
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }
}
