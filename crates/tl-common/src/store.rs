//! Store capabilities consumed by the engine.
//!
//! A store exposes two operations: describing a table's live schema and
//! atomically inserting a list of rows. Inserts must reject rows that
//! disagree with the live schema and report that as
//! [`StoreError::SchemaDrift`], distinct from every other failure.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::column::Column;
use crate::row::Row;

/// Errors reported by a store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("schema drift on table `{table}`: {detail}")]
    SchemaDrift { table: String, detail: String },

    #[error("table `{0}` not found")]
    TableNotFound(String),

    #[error("table `{0}` already exists")]
    TableExists(String),

    #[error("describe of table `{table}` exceeded {timeout_ms}ms")]
    Timeout { table: String, timeout_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Whether the store rejected rows because its live schema changed.
    pub fn is_schema_drift(&self) -> bool {
        matches!(self, StoreError::SchemaDrift { .. })
    }
}

/// Read-only schema discovery.
pub trait TableDescriber {
    /// Return the live columns of `path`, giving up after `timeout`.
    fn describe_table(&self, path: &str, timeout: Duration) -> Result<Vec<Column>, StoreError>;
}

/// Atomic bulk insert of one chunk.
pub trait BulkInserter {
    fn bulk_insert(&self, path: &str, rows: &[Row]) -> Result<(), StoreError>;
}

/// A store offering both capabilities, shareable across threads.
pub trait TableStore: TableDescriber + BulkInserter + Send + Sync {}

impl<T: TableDescriber + BulkInserter + Send + Sync> TableStore for T {}

impl<T: TableDescriber + ?Sized> TableDescriber for Arc<T> {
    fn describe_table(&self, path: &str, timeout: Duration) -> Result<Vec<Column>, StoreError> {
        (**self).describe_table(path, timeout)
    }
}

impl<T: BulkInserter + ?Sized> BulkInserter for Arc<T> {
    fn bulk_insert(&self, path: &str, rows: &[Row]) -> Result<(), StoreError> {
        (**self).bulk_insert(path, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_is_distinct() {
        let drift = StoreError::SchemaDrift {
            table: "logs".into(),
            detail: "unknown column `x`".into(),
        };
        assert!(drift.is_schema_drift());
        assert!(!StoreError::Other("unavailable".into()).is_schema_drift());
        assert!(!StoreError::TableNotFound("logs".into()).is_schema_drift());
    }

    #[test]
    fn test_drift_message() {
        let drift = StoreError::SchemaDrift {
            table: "logs".into(),
            detail: "unknown column `x`".into(),
        };
        assert_eq!(
            drift.to_string(),
            "schema drift on table `logs`: unknown column `x`"
        );
    }
}
