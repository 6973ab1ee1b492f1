//! Configuration validation errors and semantic validation.

use std::collections::BTreeMap;
use thiserror::Error;
use tl_common::keys;

use crate::sink::SinkConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("no required column '{0}'")]
    MissingField(String),

    #[error("unknown reserved key '{0}' (expected one of .timestamp, .input, .others, .hash)")]
    UnknownReservedKey(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::MissingField(_) => 11,
            ValidationError::UnknownReservedKey(_) => 12,
            ValidationError::InvalidValue { .. } => 13,
        }
    }
}

impl From<ValidationError> for tl_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingField(key) => tl_common::Error::MissingRequiredKey(key),
            other => tl_common::Error::Config(other.to_string()),
        }
    }
}

/// Validate a field-to-column declaration map.
///
/// `.timestamp` and `.input` are mandatory; other `.`-prefixed keys must be
/// one of the reserved keys; column names must be non-empty and each column
/// may be targeted by one field only.
pub fn validate_columns(columns: &BTreeMap<String, String>) -> ValidationResult<()> {
    for required in [keys::TIMESTAMP, keys::INPUT] {
        if !columns.contains_key(required) {
            return Err(ValidationError::MissingField(required.to_string()));
        }
    }

    let mut targets: BTreeMap<&str, &str> = BTreeMap::new();
    for (field, column) in columns {
        if keys::is_reserved(field) && !keys::ALL.contains(&field.as_str()) {
            return Err(ValidationError::UnknownReservedKey(field.clone()));
        }
        if field.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "columns".to_string(),
                message: "field names must be non-empty".to_string(),
            });
        }
        if column.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("columns.{}", field),
                message: "column name must be non-empty".to_string(),
            });
        }
        if let Some(previous) = targets.insert(column.as_str(), field.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: format!("columns.{}", field),
                message: format!("column '{}' is already mapped from '{}'", column, previous),
            });
        }
    }

    Ok(())
}

/// Validate a sink configuration semantically.
pub fn validate_sink(config: &SinkConfig) -> ValidationResult<()> {
    if config.table_path.trim().is_empty() {
        return Err(ValidationError::MissingField("table_path".to_string()));
    }

    if config.payload_ceiling_bytes == 0 {
        return Err(ValidationError::InvalidValue {
            field: "payload_ceiling_bytes".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if config.resolve_timeout_ms == 0 {
        return Err(ValidationError::InvalidValue {
            field: "resolve_timeout_ms".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    validate_columns(config.columns.as_map())
}
