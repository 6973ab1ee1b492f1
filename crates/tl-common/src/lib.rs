//! tablog common types and errors.
//!
//! This crate provides the vocabulary shared by every tablog crate:
//! - Column descriptors and logical types discovered from a table schema
//! - The dynamic `Value` union carried by incoming log events
//! - Typed rows as submitted to a store
//! - The store capability traits (`describe_table`, `bulk_insert`)
//! - The unified error type with stable codes

pub mod column;
pub mod error;
pub mod event;
pub mod row;
pub mod store;
pub mod value;

pub use column::{Column, LogicalType};
pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use event::Event;
pub use row::{Cell, Row, Scalar};
pub use store::{BulkInserter, StoreError, TableDescriber, TableStore};
pub use value::Value;

/// Reserved field keys understood by the field mapping.
pub mod keys {
    /// Event time column.
    pub const TIMESTAMP: &str = ".timestamp";
    /// Source tag (metadata) column.
    pub const INPUT: &str = ".input";
    /// Overflow bag for unmapped message fields.
    pub const OTHERS: &str = ".others";
    /// Content hash of matched and overflow fields.
    pub const HASH: &str = ".hash";

    /// All reserved keys, required ones first.
    pub const ALL: [&str; 4] = [TIMESTAMP, INPUT, OTHERS, HASH];

    /// Whether a key uses the reserved `.` prefix.
    pub fn is_reserved(key: &str) -> bool {
        key.starts_with('.')
    }
}
