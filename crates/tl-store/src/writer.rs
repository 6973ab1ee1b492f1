//! Parquet chunk writer.
//!
//! Every bulk insert becomes one Parquet file, written to a temp path and
//! renamed into place so readers never observe a partial chunk.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::Schema;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{WriterProperties, WriterVersion};
use thiserror::Error;
use tl_common::StoreError;

/// Errors from chunk writer operations.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("column `{column}` has unsupported type {type_name}")]
    UnsupportedType { column: String, type_name: String },

    #[error("Chunk empty")]
    EmptyChunk,
}

impl From<WriteError> for StoreError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Io(e) => StoreError::Io(e),
            other => StoreError::Other(other.to_string()),
        }
    }
}

/// Configuration for the chunk writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Compression codec.
    pub compression: Compression,

    /// Maximum rows per row group.
    pub row_group_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            compression: Compression::ZSTD(ZstdLevel::default()),
            row_group_size: 64 * 1024,
        }
    }
}

impl WriterConfig {
    /// Use snappy compression instead of zstd.
    pub fn with_snappy(mut self) -> Self {
        self.compression = Compression::SNAPPY;
        self
    }
}

/// Writes record batches as atomic Parquet chunk files.
#[derive(Debug, Clone, Default)]
pub struct ChunkWriter {
    config: WriterConfig,
}

impl ChunkWriter {
    pub fn new(config: WriterConfig) -> Self {
        ChunkWriter { config }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Write one batch into `table_dir`, returning the final file path.
    pub fn write_chunk(
        &self,
        table_dir: &Path,
        schema: Arc<Schema>,
        batch: &RecordBatch,
    ) -> Result<PathBuf, WriteError> {
        if batch.num_rows() == 0 {
            return Err(WriteError::EmptyChunk);
        }

        fs::create_dir_all(table_dir)?;

        let output_path = table_dir.join(chunk_file_name());
        let temp_path = output_path.with_extension("parquet.tmp");
        let file = File::create(&temp_path)?;

        let props = WriterProperties::builder()
            .set_writer_version(WriterVersion::PARQUET_2_0)
            .set_compression(self.config.compression)
            .set_max_row_group_size(self.config.row_group_size)
            .set_dictionary_enabled(true)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        if let Err(e) = writer.write(batch).and_then(|_| writer.close().map(|_| ())) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        atomic_rename(&temp_path, &output_path)?;
        Ok(output_path)
    }
}

/// Chunk file name: `part-<utc timestamp>-<suffix>.parquet`.
///
/// Names sort in commit order within one process.
fn chunk_file_name() -> String {
    let now = chrono::Utc::now();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "part-{}-{}.parquet",
        now.format("%Y%m%dT%H%M%S%6f"),
        &suffix[..8]
    )
}

/// Helper to rename temp file to final path atomically.
pub fn atomic_rename(temp_path: &Path, final_path: &Path) -> Result<(), WriteError> {
    fs::rename(temp_path, final_path)?;
    Ok(())
}
