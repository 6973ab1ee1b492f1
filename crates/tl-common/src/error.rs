//! Error types for tablog.
//!
//! Component crates define precise error enums (`SchemaError`,
//! `ConversionError`, `WriteError`, ...). This module provides the unified
//! error the CLI and host adapters report, with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 20,
//!   "category": "schema",
//!   "message": "schema error: not found column 'msg' in destination table for field log",
//!   "recoverable": true
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for tablog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration parsing and validation.
    Config,
    /// Schema discovery and field mapping.
    Schema,
    /// Value-to-column conversion.
    Conversion,
    /// Store submission failures.
    Store,
    /// File I/O and serialization.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Schema => write!(f, "schema"),
            ErrorCategory::Conversion => write!(f, "conversion"),
            ErrorCategory::Store => write!(f, "store"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for tablog.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing required column mapping '{0}'")]
    MissingRequiredKey(String),

    // Schema errors (20-29)
    #[error("schema error: {0}")]
    Schema(String),

    #[error("schema drift not repaired: {0}")]
    DriftUnresolved(String),

    // Conversion errors (30-39)
    #[error("conversion error: {0}")]
    Conversion(String),

    // Store errors (40-49)
    #[error("store rejected chunk: {0}")]
    Store(#[from] StoreError),

    #[error("write failed: {0}")]
    Write(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Schema errors
    /// - 30-39: Conversion errors
    /// - 40-49: Store errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::MissingRequiredKey(_) => 11,
            Error::Schema(_) => 20,
            Error::DriftUnresolved(_) => 21,
            Error::Conversion(_) => 30,
            Error::Store(StoreError::SchemaDrift { .. }) => 41,
            Error::Store(_) => 40,
            Error::Write(_) => 42,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::MissingRequiredKey(_) => ErrorCategory::Config,
            Error::Schema(_) | Error::DriftUnresolved(_) => ErrorCategory::Schema,
            Error::Conversion(_) => ErrorCategory::Conversion,
            Error::Store(_) | Error::Write(_) => ErrorCategory::Store,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Store failures and drift are transient from the caller's point of
    /// view: the next call runs against a re-resolved mapping.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::MissingRequiredKey(_) => false,
            Error::Schema(_) => false,
            Error::DriftUnresolved(_) => true,
            Error::Conversion(_) => false,
            Error::Store(_) | Error::Write(_) => true,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., table path).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::MissingRequiredKey(key) => {
                context.insert("key".to_string(), serde_json::json!(key));
            }
            Error::Store(StoreError::SchemaDrift { table, .. })
            | Error::Store(StoreError::TableNotFound(table))
            | Error::Store(StoreError::Timeout { table, .. }) => {
                context.insert("table".to_string(), serde_json::json!(table));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_by_category() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::Schema("x".into()).code(), 20);
        assert_eq!(Error::Conversion("x".into()).code(), 30);
        assert_eq!(Error::Store(StoreError::Other("x".into())).code(), 40);
        assert_eq!(
            Error::Store(StoreError::SchemaDrift {
                table: "t".into(),
                detail: "d".into()
            })
            .code(),
            41
        );
    }

    #[test]
    fn test_category() {
        assert_eq!(
            Error::MissingRequiredKey(".input".into()).category(),
            ErrorCategory::Config
        );
        assert_eq!(
            Error::DriftUnresolved("x".into()).category(),
            ErrorCategory::Schema
        );
        assert_eq!(Error::Write("x".into()).category(), ErrorCategory::Store);
    }

    #[test]
    fn test_structured_error_context() {
        let err = Error::Store(StoreError::TableNotFound("logs/app".into()));
        let structured = StructuredError::from(&err);
        assert_eq!(structured.code, 40);
        assert_eq!(structured.category, ErrorCategory::Store);
        assert!(structured.recoverable);
        assert_eq!(structured.context["table"], serde_json::json!("logs/app"));
    }

    #[test]
    fn test_structured_error_json() {
        let err = Error::MissingRequiredKey(".timestamp".into());
        let json = StructuredError::from(&err)
            .with_context("source", "sink.toml")
            .to_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["code"], 11);
        assert_eq!(parsed["category"], "config");
        assert_eq!(parsed["context"]["key"], ".timestamp");
        assert_eq!(parsed["context"]["source"], "sink.toml");
    }
}
