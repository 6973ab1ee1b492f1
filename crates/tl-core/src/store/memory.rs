//! In-memory table store.
//!
//! Tables live in a map guarded by a mutex. Inserts apply the same
//! live-schema checks as the Parquet store, so altering or dropping a
//! table reproduces schema drift. Failures can be injected per insert
//! call for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tl_common::{BulkInserter, Column, Row, StoreError, TableDescriber};
use tl_store::convert::check_rows;

/// Failure injected into a bulk insert call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A transient store error.
    Unavailable,
    /// A schema drift signal.
    Drift,
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    insert_failures: HashMap<usize, FailureKind>,
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    describe_delay: Option<Duration>,
    describe_calls: AtomicUsize,
    insert_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Add a table with the given columns.
    pub fn with_table(self, name: impl Into<String>, columns: Vec<Column>) -> Self {
        self.create_table(name, columns);
        self
    }

    /// Delay every describe call, to exercise resolve timeouts.
    pub fn with_describe_delay(mut self, delay: Duration) -> Self {
        self.describe_delay = Some(delay);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Poisoning is ignored.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn create_table(&self, name: impl Into<String>, columns: Vec<Column>) {
        self.lock().tables.insert(
            name.into(),
            Table {
                columns,
                rows: Vec::new(),
            },
        );
    }

    /// Replace a table's columns, keeping its rows.
    pub fn alter_table(&self, name: &str, columns: Vec<Column>) {
        let mut state = self.lock();
        let table = state.tables.entry(name.to_string()).or_default();
        table.columns = columns;
    }

    pub fn drop_table(&self, name: &str) {
        self.lock().tables.remove(name);
    }

    /// Fail the insert call with zero-based index `call`.
    pub fn fail_insert(&self, call: usize, kind: FailureKind) {
        self.lock().insert_failures.insert(call, kind);
    }

    /// Committed rows of a table.
    pub fn rows(&self, name: &str) -> Vec<Row> {
        self.lock()
            .tables
            .get(name)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }
}

impl TableDescriber for MemoryStore {
    fn describe_table(&self, path: &str, _timeout: Duration) -> Result<Vec<Column>, StoreError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.describe_delay {
            std::thread::sleep(delay);
        }
        self.lock()
            .tables
            .get(path)
            .map(|t| t.columns.clone())
            .ok_or_else(|| StoreError::TableNotFound(path.to_string()))
    }
}

impl BulkInserter for MemoryStore {
    fn bulk_insert(&self, path: &str, rows: &[Row]) -> Result<(), StoreError> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();

        match state.insert_failures.remove(&call) {
            Some(FailureKind::Unavailable) => {
                return Err(StoreError::Other(format!(
                    "insert call {call} failed: store unavailable"
                )))
            }
            Some(FailureKind::Drift) => {
                return Err(StoreError::SchemaDrift {
                    table: path.to_string(),
                    detail: format!("insert call {call} rejected"),
                })
            }
            None => {}
        }

        let table = state
            .tables
            .get_mut(path)
            .ok_or_else(|| StoreError::TableNotFound(path.to_string()))?;
        check_rows(path, &table.columns, rows)?;
        table.rows.extend_from_slice(rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_common::{Cell, LogicalType, Scalar};

    fn columns() -> Vec<Column> {
        vec![Column::new("tag", LogicalType::Text, false)]
    }

    fn row() -> Row {
        let mut row = Row::new();
        row.push("tag", Cell::Value(Scalar::Text("app".into())));
        row
    }

    #[test]
    fn test_insert_and_read_back() {
        let store = MemoryStore::new().with_table("logs", columns());
        store.bulk_insert("logs", &[row(), row()]).unwrap();
        assert_eq!(store.rows("logs").len(), 2);
        assert_eq!(store.insert_calls(), 1);
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let store = MemoryStore::new().with_table("logs", columns());
        store.fail_insert(0, FailureKind::Drift);
        assert!(store.bulk_insert("logs", &[row()]).unwrap_err().is_schema_drift());
        store.bulk_insert("logs", &[row()]).unwrap();
        assert_eq!(store.rows("logs").len(), 1);
    }

    #[test]
    fn test_altered_table_rejects_old_rows() {
        let store = MemoryStore::new().with_table("logs", columns());
        store.alter_table("logs", vec![Column::new("tag", LogicalType::Bytes, false)]);
        let err = store.bulk_insert("logs", &[row()]).unwrap_err();
        assert!(err.is_schema_drift());
    }

    #[test]
    fn test_describe_counts_calls() {
        let store = MemoryStore::new().with_table("logs", columns());
        store.describe_table("logs", Duration::from_secs(1)).unwrap();
        store.drop_table("logs");
        assert!(matches!(
            store.describe_table("logs", Duration::from_secs(1)),
            Err(StoreError::TableNotFound(_))
        ));
        assert_eq!(store.describe_calls(), 2);
    }
}
