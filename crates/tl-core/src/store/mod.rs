//! Store implementations available to the engine.
//!
//! The capability traits live in `tl_common::store`; this module adds the
//! in-memory store and re-exports the Parquet-backed one.

pub mod memory;

pub use memory::{FailureKind, MemoryStore};
pub use tl_common::{BulkInserter, StoreError, TableDescriber, TableStore};
pub use tl_store::ParquetTableStore;
