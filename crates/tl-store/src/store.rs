//! Directory-backed table store.
//!
//! Layout under the store root:
//! ```text
//! <root>/<table>/_schema.json
//! <root>/<table>/part-20240102T030405000000-1a2b3c4d.parquet
//! ```

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use arrow::array::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tl_common::{BulkInserter, Column, Row, StoreError, TableDescriber};
use tracing::debug;

use crate::convert::rows_to_batch;
use crate::schema::{arrow_schema, TableSchemaFile, SCHEMA_FILE};
use crate::writer::{ChunkWriter, WriteError, WriterConfig};

/// A table store rooted at one local directory.
#[derive(Debug, Clone)]
pub struct ParquetTableStore {
    root: PathBuf,
    writer: ChunkWriter,
}

impl ParquetTableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_writer_config(root, WriterConfig::default())
    }

    pub fn with_writer_config(root: impl Into<PathBuf>, config: WriterConfig) -> Self {
        ParquetTableStore {
            root: root.into(),
            writer: ChunkWriter::new(config),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one table.
    pub fn table_dir(&self, table: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(table);
        let valid = !table.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(WriteError::InvalidPath(table.to_string()).into());
        }
        Ok(self.root.join(relative))
    }

    pub fn schema_path(&self, table: &str) -> Result<PathBuf, StoreError> {
        Ok(self.table_dir(table)?.join(SCHEMA_FILE))
    }

    /// Create a table with the given columns.
    pub fn create_table(&self, table: &str, columns: &[Column]) -> Result<(), StoreError> {
        arrow_schema(columns)?;

        let schema_path = self.schema_path(table)?;
        if schema_path.exists() {
            return Err(StoreError::TableExists(table.to_string()));
        }
        if let Some(parent) = schema_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = TableSchemaFile::from_columns(columns);
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| StoreError::Other(format!("failed to encode schema: {e}")))?;
        fs::write(&schema_path, json)?;

        debug!(table, columns = columns.len(), "table created");
        Ok(())
    }

    fn read_schema(&self, table: &str) -> Result<Vec<Column>, StoreError> {
        let schema_path = self.schema_path(table)?;
        let content = match fs::read_to_string(&schema_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::TableNotFound(table.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let file: TableSchemaFile = serde_json::from_str(&content).map_err(|e| {
            StoreError::Other(format!("invalid schema file {}: {e}", schema_path.display()))
        })?;
        Ok(file.to_columns())
    }

    /// Committed chunk files of a table, oldest first.
    pub fn chunk_files(&self, table: &str) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.table_dir(table)?;
        if !dir.join(SCHEMA_FILE).exists() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("part-") && n.ends_with(".parquet"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Read every committed batch of a table.
    pub fn read_table(&self, table: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut batches = Vec::new();
        for path in self.chunk_files(table)? {
            let file = File::open(&path)?;
            let reader = ParquetRecordBatchReaderBuilder::try_new(file)
                .and_then(|builder| builder.build())
                .map_err(WriteError::from)?;
            for batch in reader {
                batches.push(batch.map_err(WriteError::from)?);
            }
        }
        Ok(batches)
    }

    /// Total committed rows of a table.
    pub fn row_count(&self, table: &str) -> Result<usize, StoreError> {
        Ok(self
            .read_table(table)?
            .iter()
            .map(RecordBatch::num_rows)
            .sum())
    }
}

impl TableDescriber for ParquetTableStore {
    fn describe_table(&self, table: &str, timeout: Duration) -> Result<Vec<Column>, StoreError> {
        let started = Instant::now();
        let columns = self.read_schema(table)?;
        if started.elapsed() > timeout {
            return Err(StoreError::Timeout {
                table: table.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(columns)
    }
}

impl BulkInserter for ParquetTableStore {
    fn bulk_insert(&self, table: &str, rows: &[Row]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let columns = self.read_schema(table)?;
        let (schema, batch) = rows_to_batch(table, &columns, rows)?;
        let path = self
            .writer
            .write_chunk(&self.table_dir(table)?, schema, &batch)?;

        debug!(table, rows = rows.len(), file = %path.display(), "chunk written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tl_common::{Cell, LogicalType, Scalar};

    fn columns() -> Vec<Column> {
        vec![
            Column::new("tag", LogicalType::Text, false),
            Column::new("msg", LogicalType::Text, true),
        ]
    }

    fn row(tag: &str) -> Row {
        let mut row = Row::new();
        row.push("tag", Cell::Value(Scalar::Text(tag.into())));
        row.push("msg", Cell::Null(LogicalType::Text));
        row
    }

    #[test]
    fn test_create_and_describe() {
        let dir = TempDir::new().unwrap();
        let store = ParquetTableStore::new(dir.path());
        store.create_table("logs/app", &columns()).unwrap();

        let described = store
            .describe_table("logs/app", Duration::from_secs(5))
            .unwrap();
        assert_eq!(described, columns());
        assert!(dir.path().join("logs/app").join(SCHEMA_FILE).exists());
    }

    #[test]
    fn test_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        let store = ParquetTableStore::new(dir.path());
        store.create_table("logs", &columns()).unwrap();
        let err = store.create_table("logs", &columns()).unwrap_err();
        assert!(matches!(err, StoreError::TableExists(_)));
    }

    #[test]
    fn test_create_rejects_unsupported_type() {
        let dir = TempDir::new().unwrap();
        let store = ParquetTableStore::new(dir.path());
        let err = store
            .create_table("logs", &[Column::from_store_type("n", "Int32")])
            .unwrap_err();
        assert!(err.to_string().contains("unsupported type"));
        assert!(!dir.path().join("logs").exists());
    }

    #[test]
    fn test_describe_missing_table() {
        let dir = TempDir::new().unwrap();
        let store = ParquetTableStore::new(dir.path());
        let err = store
            .describe_table("nope", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::TableNotFound(_)));
    }

    #[test]
    fn test_invalid_table_paths() {
        let store = ParquetTableStore::new("/tmp/unused");
        assert!(store.table_dir("").is_err());
        assert!(store.table_dir("../escape").is_err());
        assert!(store.table_dir("/abs").is_err());
        assert!(store.table_dir("a/b").is_ok());
    }

    #[test]
    fn test_bulk_insert_and_read() {
        let dir = TempDir::new().unwrap();
        let store = ParquetTableStore::new(dir.path());
        store.create_table("logs", &columns()).unwrap();

        store.bulk_insert("logs", &[row("a"), row("b")]).unwrap();
        store.bulk_insert("logs", &[row("c")]).unwrap();

        assert_eq!(store.chunk_files("logs").unwrap().len(), 2);
        assert_eq!(store.row_count("logs").unwrap(), 3);
    }

    #[test]
    fn test_bulk_insert_empty_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = ParquetTableStore::new(dir.path());
        store.create_table("logs", &columns()).unwrap();
        store.bulk_insert("logs", &[]).unwrap();
        assert!(store.chunk_files("logs").unwrap().is_empty());
    }

    #[test]
    fn test_bulk_insert_rejects_drifted_rows() {
        let dir = TempDir::new().unwrap();
        let store = ParquetTableStore::new(dir.path());
        store.create_table("logs", &columns()).unwrap();

        let mut extra = row("a");
        extra.push("host", Cell::Optional(Scalar::Text("h1".into())));
        let err = store.bulk_insert("logs", &[extra]).unwrap_err();
        assert!(err.is_schema_drift());
        assert!(store.chunk_files("logs").unwrap().is_empty());
    }
}
