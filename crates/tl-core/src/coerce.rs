//! Dynamic value to column type coercion.
//!
//! | input | Text | Bytes | Json, JsonDocument | Timestamp | Uint64 |
//! |---|---|---|---|---|---|
//! | time | | | | direct | |
//! | bytes | lossy UTF-8 | as-is | | parsed | |
//! | string | as-is | UTF-8 bytes | | parsed | |
//! | map | JSON text | JSON bytes | JSON | JSON, parsed | |
//! | uint64 | | | | | direct |
//!
//! Nulls become typed nulls in optional columns and zero values otherwise
//! (`""`, empty bytes, `{}`, the Unix epoch). Every other pairing fails.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tl_common::{Cell, Column, LogicalType, Scalar, Value};
use tracing::warn;

use crate::estimate::{DefaultEstimator, SizeEstimator};
use crate::logging::event_names;

/// Length of an RFC 3339 timestamp with millisecond precision and `Z`.
pub const TIMESTAMP_RFC3339_LEN: usize = 24;

/// Errors from value coercion.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("not supported conversion ({source_kind}) into column `{column}` of type {target}")]
    Unsupported {
        column: String,
        source_kind: &'static str,
        target: String,
    },

    #[error("not supported conversion from NULL into column `{column}` of type {target}")]
    NullNotRepresentable { column: String, target: String },

    #[error("failed to serialize value for column `{column}`: {source}")]
    Json {
        column: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ConversionError> for tl_common::Error {
    fn from(err: ConversionError) -> Self {
        tl_common::Error::Conversion(err.to_string())
    }
}

/// A coerced cell and its estimated encoded size.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub cell: Cell,
    pub estimated_bytes: usize,
}

/// Coerce with the default estimator.
pub fn coerce(column: &Column, value: Option<&Value>) -> Result<Coerced, ConversionError> {
    coerce_with(&DefaultEstimator, column, value)
}

/// Coerce `value` into `column`, pricing the result with `estimator`.
pub fn coerce_with<E>(
    estimator: &E,
    column: &Column,
    value: Option<&Value>,
) -> Result<Coerced, ConversionError>
where
    E: SizeEstimator + ?Sized,
{
    let cell = match value {
        None | Some(Value::Nil) => null_cell(column)?,
        Some(value) => convert(column, value)?,
    };
    let estimated_bytes = estimator.cell_bytes(&cell);
    Ok(Coerced {
        cell,
        estimated_bytes,
    })
}

fn unsupported(column: &Column, value: &Value) -> ConversionError {
    ConversionError::Unsupported {
        column: column.name.clone(),
        source_kind: value.kind(),
        target: column.store_type(),
    }
}

fn wrap(column: &Column, scalar: Scalar) -> Cell {
    if column.optional {
        Cell::Optional(scalar)
    } else {
        Cell::Value(scalar)
    }
}

fn null_cell(column: &Column) -> Result<Cell, ConversionError> {
    if column.optional {
        return match column.logical_type {
            LogicalType::Other(_) => Err(ConversionError::NullNotRepresentable {
                column: column.name.clone(),
                target: column.store_type(),
            }),
            ref t => Ok(Cell::Null(t.clone())),
        };
    }

    let scalar = match column.logical_type {
        LogicalType::Text => Scalar::Text(String::new()),
        LogicalType::Bytes => Scalar::Bytes(Vec::new()),
        LogicalType::Json => Scalar::Json("{}".to_string()),
        LogicalType::JsonDocument => Scalar::JsonDocument("{}".to_string()),
        LogicalType::Timestamp => Scalar::Timestamp(DateTime::<Utc>::default()),
        LogicalType::Uint64 | LogicalType::Other(_) => {
            return Err(ConversionError::NullNotRepresentable {
                column: column.name.clone(),
                target: column.store_type(),
            })
        }
    };
    Ok(Cell::Value(scalar))
}

fn convert(column: &Column, value: &Value) -> Result<Cell, ConversionError> {
    let target = &column.logical_type;
    let scalar = match (value, target) {
        (Value::Timestamp(ts), LogicalType::Timestamp) => Scalar::Timestamp(*ts),

        (Value::Bytes(b), LogicalType::Text) => {
            Scalar::Text(String::from_utf8_lossy(b).into_owned())
        }
        (Value::Bytes(b), LogicalType::Bytes) => Scalar::Bytes(b.clone()),
        (Value::Bytes(b), LogicalType::Timestamp) => {
            return Ok(parse_timestamp(column, &String::from_utf8_lossy(b)))
        }

        (Value::Str(s), LogicalType::Text) => Scalar::Text(s.clone()),
        (Value::Str(s), LogicalType::Bytes) => Scalar::Bytes(s.as_bytes().to_vec()),
        (Value::Str(s), LogicalType::Timestamp) => return Ok(parse_timestamp(column, s)),

        (Value::Map(_), LogicalType::Text) => Scalar::Text(to_json(column, value)?),
        (Value::Map(_), LogicalType::Bytes) => Scalar::Bytes(to_json(column, value)?.into_bytes()),
        (Value::Map(_), LogicalType::Json) => Scalar::Json(to_json(column, value)?),
        (Value::Map(_), LogicalType::JsonDocument) => Scalar::JsonDocument(to_json(column, value)?),
        (Value::Map(_), LogicalType::Timestamp) => {
            return Ok(parse_timestamp(column, &to_json(column, value)?))
        }

        (Value::Uint(u), LogicalType::Uint64) => Scalar::Uint64(*u),

        _ => return Err(unsupported(column, value)),
    };
    Ok(wrap(column, scalar))
}

fn to_json(column: &Column, value: &Value) -> Result<String, ConversionError> {
    value
        .to_json_string()
        .map_err(|source| ConversionError::Json {
            column: column.name.clone(),
            source,
        })
}

/// Parse an RFC 3339 timestamp string of exactly 24 characters.
pub fn parse_rfc3339(text: &str) -> Option<DateTime<Utc>> {
    if text.len() != TIMESTAMP_RFC3339_LEN {
        return None;
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Timestamp from text; unparseable text falls back instead of failing.
///
/// Optional columns get a typed null, required ones the current time.
fn parse_timestamp(column: &Column, text: &str) -> Cell {
    if let Some(ts) = parse_rfc3339(text) {
        return wrap(column, Scalar::Timestamp(ts));
    }

    warn!(
        target: event_names::COERCE_TIMESTAMP_FALLBACK,
        column = %column.name,
        value = %text,
        "failed to parse value as timestamp - unknown format"
    );

    if column.optional {
        Cell::Null(LogicalType::Timestamp)
    } else {
        Cell::Value(Scalar::Timestamp(Utc::now()))
    }
}
