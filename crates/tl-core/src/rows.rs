//! Event to row conversion.
//!
//! Every row carries exactly the mapping's column set, in this order:
//! `.timestamp`, `.input`, mapped fields present in the message (field
//! order), mapped fields absent or unconvertible (as nulls), `.others`,
//! `.hash`.

use std::collections::{BTreeMap, BTreeSet};

use tl_common::{Column, Event, Row, Value};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::coerce::{coerce_with, ConversionError};
use crate::estimate::SizeEstimator;
use crate::logging::event_names;
use crate::schema::FieldMapping;

/// Rows built from one batch of events.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuiltRows {
    pub rows: Vec<Row>,
    /// Largest estimated row size; at least 1.
    pub max_row_bytes: usize,
}

/// Accumulates one row and its estimated size.
struct RowAssembler<'a, E: ?Sized> {
    estimator: &'a E,
    row: Row,
    bytes: usize,
}

impl<'a, E: SizeEstimator + ?Sized> RowAssembler<'a, E> {
    fn new(estimator: &'a E, capacity: usize) -> Self {
        RowAssembler {
            estimator,
            row: Row::with_capacity(capacity),
            bytes: estimator.row_overhead(),
        }
    }

    fn append(&mut self, column: &Column, value: Option<&Value>) -> Result<(), ConversionError> {
        let coerced = coerce_with(self.estimator, column, value)?;
        self.bytes += self
            .estimator
            .field_bytes(&column.name, coerced.estimated_bytes);
        self.row.push(column.name.clone(), coerced.cell);
        Ok(())
    }
}

/// Content hash of a field bag: XXH3-64 over its sorted JSON encoding.
pub fn content_hash(bag: &BTreeMap<String, Value>) -> serde_json::Result<u64> {
    let json = serde_json::to_vec(&Value::Map(bag.clone()).to_json())?;
    Ok(xxh3_64(&json))
}

/// Convert events into rows shaped by `mapping`.
///
/// Conversion failures of the reserved columns and of the null fill for
/// absent fields abort the whole call; a message field that fails to
/// convert is logged and treated as absent.
pub fn build_rows<E>(
    events: &[Event],
    mapping: &FieldMapping,
    estimator: &E,
) -> Result<BuiltRows, ConversionError>
where
    E: SizeEstimator + ?Sized,
{
    let mut rows = Vec::with_capacity(events.len());
    let mut max_row_bytes = 1;

    for event in events {
        let mut row = RowAssembler::new(estimator, mapping.column_count());

        row.append(mapping.timestamp(), Some(&Value::Timestamp(event.timestamp)))?;
        row.append(mapping.input(), Some(&Value::Str(event.metadata.clone())))?;

        let mut unused: BTreeSet<&str> = mapping.fields().map(|(field, _)| field).collect();
        let mut others: BTreeMap<String, Value> = BTreeMap::new();
        let mut hashed: BTreeMap<String, Value> = BTreeMap::new();

        for (field, value) in &event.message {
            let Some(column) = mapping.field(field) else {
                if mapping.others().is_some() {
                    others.insert(field.clone(), value.clone());
                    if mapping.hash().is_some() {
                        hashed.insert(field.clone(), value.clone());
                    }
                } else {
                    debug!(
                        target: event_names::ROW_FIELD_DROPPED,
                        field = %field,
                        kind = value.kind(),
                        "column for message key not found, skipped"
                    );
                }
                continue;
            };

            if let Err(err) = row.append(column, Some(value)) {
                warn!(
                    target: event_names::ROW_FIELD_SKIPPED,
                    field = %field,
                    error = %err,
                    "failed to convert message field, skipped"
                );
                continue;
            }

            unused.remove(field.as_str());
            if mapping.hash().is_some() {
                hashed.insert(field.clone(), value.clone());
            }
        }

        for field in unused {
            if let Some(column) = mapping.field(field) {
                row.append(column, None)?;
            }
        }

        if let Some(column) = mapping.others() {
            row.append(column, Some(&Value::Map(others)))?;
        }

        if let Some(column) = mapping.hash() {
            let hash = content_hash(&hashed).map_err(|source| ConversionError::Json {
                column: column.name.clone(),
                source,
            })?;
            row.append(column, Some(&Value::Uint(hash)))?;
        }

        max_row_bytes = max_row_bytes.max(row.bytes);
        rows.push(row.row);
    }

    Ok(BuiltRows {
        rows,
        max_row_bytes,
    })
}
