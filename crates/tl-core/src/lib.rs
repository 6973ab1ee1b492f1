//! tablog core library.
//!
//! This crate turns log events into typed rows and writes them to a table
//! store in payload-bounded chunks:
//! - `schema`: resolve field declarations against the live table
//! - `coerce`: convert one dynamic value into a column-typed cell
//! - `estimate`: estimate serialized row size and derive chunk portions
//! - `rows`: assemble rows, overflow bag and content hash per event
//! - `writer`: the batch writer with drift recovery
//!
//! Host-side pieces (JSON-lines decoding, logging, exit codes, the
//! in-memory store) live here too and back the `tablog` binary.

pub mod coerce;
pub mod decode;
pub mod estimate;
pub mod exit_codes;
pub mod logging;
pub mod rows;
pub mod schema;
pub mod store;
pub mod writer;

pub use coerce::{coerce, coerce_with, Coerced, ConversionError};
pub use decode::{decode_line, DecodeError, EventReader};
pub use estimate::{portion, DefaultEstimator, SizeEstimator};
pub use exit_codes::ExitCode;
pub use rows::{build_rows, content_hash, BuiltRows};
pub use schema::{resolve, FieldMapping, SchemaError};
pub use writer::{BatchWriter, BatchWriterConfig, ChunkFailure, WriteError, WriteSummary};
