//! tablog local table store.
//!
//! This crate provides:
//! - A per-table schema file mapping column names to store type names
//! - Arrow schema construction from discovered columns
//! - Conversion of typed rows into Arrow record batches, rejecting rows
//!   that disagree with the live schema
//! - Atomic Parquet chunk files, one per bulk insert

pub mod convert;
pub mod schema;
pub mod store;
pub mod writer;

pub use convert::rows_to_batch;
pub use schema::{arrow_schema, TableSchemaFile, SCHEMA_FILE};
pub use store::ParquetTableStore;
pub use writer::{ChunkWriter, WriteError, WriterConfig};

/// Schema version written into every table schema file.
pub const SCHEMA_VERSION: &str = "1.0.0";
