//! Table schema files and Arrow schema construction.
//!
//! Each table directory holds `_schema.json`:
//! ```json
//! {"schema_version":"1.0.0","columns":[{"name":"ts","type":"Timestamp"},{"name":"msg","type":"Optional<Utf8>"}]}
//! ```
//! Column types use store spelling (`Utf8`, `String`, `Json`,
//! `JsonDocument`, `Timestamp`, `Uint64`, optionally wrapped in
//! `Optional<...>`).

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tl_common::{Column, LogicalType};

use crate::writer::WriteError;

/// File name of the per-table schema file.
pub const SCHEMA_FILE: &str = "_schema.json";

/// Field metadata key carrying the store type name.
pub const STORE_TYPE_KEY: &str = "tablog.store_type";

/// On-disk table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchemaFile {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub columns: Vec<ColumnEntry>,
}

/// One column as written in the schema file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

fn default_schema_version() -> String {
    crate::SCHEMA_VERSION.to_string()
}

impl TableSchemaFile {
    pub fn from_columns(columns: &[Column]) -> Self {
        TableSchemaFile {
            schema_version: default_schema_version(),
            columns: columns
                .iter()
                .map(|c| ColumnEntry {
                    name: c.name.clone(),
                    type_name: c.store_type(),
                })
                .collect(),
        }
    }

    pub fn to_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|entry| Column::from_store_type(entry.name.clone(), &entry.type_name))
            .collect()
    }
}

/// Arrow type used to store a logical type, if the store supports it.
pub fn arrow_data_type(logical_type: &LogicalType) -> Option<DataType> {
    match logical_type {
        LogicalType::Text | LogicalType::Json | LogicalType::JsonDocument => Some(DataType::Utf8),
        LogicalType::Bytes => Some(DataType::Binary),
        LogicalType::Timestamp => Some(DataType::Timestamp(
            TimeUnit::Microsecond,
            Some("UTC".into()),
        )),
        LogicalType::Uint64 => Some(DataType::UInt64),
        LogicalType::Other(_) => None,
    }
}

/// Helper to create a field tagged with its store type.
fn column_field(column: &Column, data_type: DataType) -> Field {
    Field::new(&column.name, data_type, column.optional).with_metadata(HashMap::from([(
        STORE_TYPE_KEY.to_string(),
        column.store_type(),
    )]))
}

/// Build the Arrow schema for a table's columns.
pub fn arrow_schema(columns: &[Column]) -> Result<Schema, WriteError> {
    let fields = columns
        .iter()
        .map(|column| {
            arrow_data_type(&column.logical_type)
                .map(|data_type| column_field(column, data_type))
                .ok_or_else(|| WriteError::UnsupportedType {
                    column: column.name.clone(),
                    type_name: column.store_type(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Schema::new(fields))
}
