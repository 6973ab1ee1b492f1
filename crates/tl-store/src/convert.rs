//! Row to Arrow conversion with live-schema checks.
//!
//! Arrays are built in live-schema order. A row is rejected as drift if
//! it names a column the table does not have, carries a cell whose type
//! or optional-ness disagrees with the column, or omits a required
//! column. Omitted optional columns are stored as null.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryBuilder, RecordBatch, StringBuilder, TimestampMicrosecondBuilder,
    UInt64Builder,
};
use arrow::datatypes::Schema;
use tl_common::{Cell, Column, LogicalType, Row, Scalar, StoreError};

use crate::schema::arrow_schema;

fn drift(table: &str, detail: String) -> StoreError {
    StoreError::SchemaDrift {
        table: table.to_string(),
        detail,
    }
}

/// Check every row against the live columns.
pub fn check_rows(table: &str, columns: &[Column], rows: &[Row]) -> Result<(), StoreError> {
    for (index, row) in rows.iter().enumerate() {
        for (name, cell) in row.iter() {
            let column = columns
                .iter()
                .find(|c| c.name == name)
                .ok_or_else(|| drift(table, format!("row {index}: unknown column `{name}`")))?;
            if !cell.fits(column) {
                let got = if cell.is_optional() {
                    format!("Optional<{}>", cell.logical_type().store_name())
                } else {
                    cell.logical_type().store_name().to_string()
                };
                return Err(drift(
                    table,
                    format!(
                        "row {index}: column `{name}` is {} but cell is {got}",
                        column.store_type()
                    ),
                ));
            }
        }
        if let Some(missing) = columns
            .iter()
            .find(|c| !c.optional && row.get(&c.name).is_none())
        {
            return Err(drift(
                table,
                format!("row {index}: required column `{}` not supplied", missing.name),
            ));
        }
    }
    Ok(())
}

/// Convert rows into one record batch laid out by `columns`.
pub fn rows_to_batch(
    table: &str,
    columns: &[Column],
    rows: &[Row],
) -> Result<(Arc<Schema>, RecordBatch), StoreError> {
    check_rows(table, columns, rows)?;

    let schema = Arc::new(arrow_schema(columns)?);
    let arrays = columns
        .iter()
        .map(|column| column_array(column, rows))
        .collect::<Result<Vec<_>, _>>()?;

    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .map_err(|e| StoreError::Other(format!("failed to assemble batch: {e}")))?;
    Ok((schema, batch))
}

fn column_array(column: &Column, rows: &[Row]) -> Result<ArrayRef, StoreError> {
    let cells = rows.iter().map(|row| row.get(&column.name).and_then(Cell::scalar));

    let array: ArrayRef = match &column.logical_type {
        LogicalType::Text | LogicalType::Json | LogicalType::JsonDocument => {
            let mut builder = StringBuilder::new();
            for scalar in cells {
                match scalar {
                    Some(Scalar::Text(s) | Scalar::Json(s) | Scalar::JsonDocument(s)) => {
                        builder.append_value(s)
                    }
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        LogicalType::Bytes => {
            let mut builder = BinaryBuilder::new();
            for scalar in cells {
                match scalar {
                    Some(Scalar::Bytes(b)) => builder.append_value(b),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        LogicalType::Timestamp => {
            let mut builder = TimestampMicrosecondBuilder::new();
            for scalar in cells {
                match scalar {
                    Some(Scalar::Timestamp(ts)) => builder.append_value(ts.timestamp_micros()),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish().with_timezone("UTC"))
        }
        LogicalType::Uint64 => {
            let mut builder = UInt64Builder::new();
            for scalar in cells {
                match scalar {
                    Some(Scalar::Uint64(v)) => builder.append_value(*v),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        LogicalType::Other(name) => {
            return Err(StoreError::Other(format!(
                "column `{}` has unsupported type {name}",
                column.name
            )))
        }
    };
    Ok(array)
}
