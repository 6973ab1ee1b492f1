//! Adaptive batch writer.
//!
//! One `write` call converts its events with a single mapping snapshot,
//! splits the rows into chunks sized from the largest row seen in the call,
//! and bulk-inserts the chunks in order. A schema drift reported by the
//! store triggers one re-resolution before the call returns; the new
//! mapping is used from the next call on.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tl_common::{Event, StoreError, TableStore};
use tl_config::{ChunkFailurePolicy, ColumnDeclarations, SinkConfig};
use tracing::{debug, info, warn};

use crate::coerce::ConversionError;
use crate::estimate::{portion, DefaultEstimator, SizeEstimator};
use crate::logging::event_names;
use crate::rows::build_rows;
use crate::schema::{resolve, FieldMapping, SchemaError};

/// Settings the batch writer needs from the sink configuration.
#[derive(Debug, Clone)]
pub struct BatchWriterConfig {
    pub table_path: String,
    pub declarations: ColumnDeclarations,
    pub payload_ceiling_bytes: usize,
    pub on_chunk_failure: ChunkFailurePolicy,
    pub resolve_timeout: Duration,
}

impl From<&SinkConfig> for BatchWriterConfig {
    fn from(config: &SinkConfig) -> Self {
        BatchWriterConfig {
            table_path: config.table_path.clone(),
            declarations: config.columns.clone(),
            payload_ceiling_bytes: config.payload_ceiling_bytes,
            on_chunk_failure: config.on_chunk_failure,
            resolve_timeout: config.resolve_timeout(),
        }
    }
}

/// Outcome of a fully committed `write` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteSummary {
    pub rows: usize,
    pub chunks: usize,
    pub portion: usize,
    pub max_row_bytes: usize,
}

/// One chunk the store refused, as a half-open row range.
#[derive(Debug)]
pub struct ChunkFailure {
    pub start: usize,
    pub end: usize,
    pub error: StoreError,
}

impl fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rows [{}:{}]: {}", self.start, self.end, self.error)
    }
}

/// Errors from a `write` call.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Rows could not be built; nothing was sent.
    #[error("failed to build rows: {0}")]
    Build(#[from] ConversionError),

    /// At least one chunk was refused.
    #[error("{}", describe_chunk_failures(.failures, .committed_rows, .resolve_error))]
    Chunks {
        failures: Vec<ChunkFailure>,
        committed_rows: usize,
        /// Set when drift re-resolution itself failed.
        resolve_error: Option<SchemaError>,
    },
}

fn describe_chunk_failures(
    failures: &[ChunkFailure],
    committed_rows: &usize,
    resolve_error: &Option<SchemaError>,
) -> String {
    let mut out = format!(
        "{} chunk(s) failed ({} rows committed)",
        failures.len(),
        committed_rows
    );
    for failure in failures {
        out.push_str("; ");
        out.push_str(&failure.to_string());
    }
    if let Some(err) = resolve_error {
        out.push_str("; re-resolution failed: ");
        out.push_str(&err.to_string());
    }
    out
}

impl WriteError {
    /// Whether any refused chunk was reported as schema drift.
    pub fn is_schema_drift(&self) -> bool {
        match self {
            WriteError::Chunks { failures, .. } => {
                failures.iter().any(|f| f.error.is_schema_drift())
            }
            WriteError::Build(_) => false,
        }
    }
}

impl From<WriteError> for tl_common::Error {
    fn from(err: WriteError) -> Self {
        let message = err.to_string();
        match err {
            WriteError::Build(inner) => inner.into(),
            WriteError::Chunks {
                resolve_error: Some(_),
                ..
            } => tl_common::Error::DriftUnresolved(message),
            WriteError::Chunks { mut failures, .. } => match failures.pop() {
                Some(failure) if failures.is_empty() => tl_common::Error::Store(failure.error),
                _ => tl_common::Error::Write(message),
            },
        }
    }
}

/// Converts events to rows and bulk-inserts them in size-bounded chunks.
pub struct BatchWriter<S> {
    store: S,
    config: BatchWriterConfig,
    mapping: ArcSwap<FieldMapping>,
    estimator: Arc<dyn SizeEstimator>,
}

impl<S: TableStore> BatchWriter<S> {
    /// Resolve the mapping against the live table and build a writer.
    pub fn connect(store: S, config: BatchWriterConfig) -> Result<Self, SchemaError> {
        let mapping = resolve(
            &store,
            &config.table_path,
            &config.declarations,
            config.resolve_timeout,
        )?;
        Ok(Self::with_mapping(store, config, mapping))
    }

    /// Build a writer around an already resolved mapping.
    pub fn with_mapping(store: S, config: BatchWriterConfig, mapping: FieldMapping) -> Self {
        BatchWriter {
            store,
            config,
            mapping: ArcSwap::from_pointee(mapping),
            estimator: Arc::new(DefaultEstimator),
        }
    }

    /// Replace the size estimator.
    pub fn with_estimator(mut self, estimator: Arc<dyn SizeEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &BatchWriterConfig {
        &self.config
    }

    /// Current mapping snapshot.
    pub fn mapping(&self) -> Arc<FieldMapping> {
        self.mapping.load_full()
    }

    /// Re-resolve the mapping and swap it in.
    pub fn refresh_mapping(&self) -> Result<Arc<FieldMapping>, SchemaError> {
        let mapping = Arc::new(resolve(
            &self.store,
            &self.config.table_path,
            &self.config.declarations,
            self.config.resolve_timeout,
        )?);
        self.mapping.store(mapping.clone());
        Ok(mapping)
    }

    /// Convert and insert one batch of events.
    pub fn write(&self, events: &[Event]) -> Result<WriteSummary, WriteError> {
        let mapping = self.mapping.load_full();
        let built = build_rows(events, &mapping, self.estimator.as_ref())?;

        let total = built.rows.len();
        let portion = portion(
            self.config.payload_ceiling_bytes,
            built.max_row_bytes,
            total,
        );
        debug!(
            target: event_names::WRITE_STARTED,
            table = %self.config.table_path,
            rows = total,
            portion,
            max_row_bytes = built.max_row_bytes,
            "got events block"
        );

        let mut failures = Vec::new();
        let mut committed_rows = 0;
        let mut chunks = 0;
        let mut position = 0;
        while position < total {
            let end = (position + portion).min(total);
            let part = &built.rows[position..end];

            match self.store.bulk_insert(&self.config.table_path, part) {
                Ok(()) => {
                    debug!(
                        target: event_names::WRITE_CHUNK_COMMITTED,
                        start = position,
                        end,
                        "chunk committed"
                    );
                    committed_rows += part.len();
                    chunks += 1;
                }
                Err(error) => {
                    warn!(
                        target: event_names::WRITE_CHUNK_FAILED,
                        start = position,
                        end,
                        drift = error.is_schema_drift(),
                        error = %error,
                        "chunk failed"
                    );
                    failures.push(ChunkFailure {
                        start: position,
                        end,
                        error,
                    });
                    if self.config.on_chunk_failure == ChunkFailurePolicy::Stop {
                        break;
                    }
                }
            }
            position = end;
        }

        if failures.is_empty() {
            info!(
                target: event_names::WRITE_COMPLETED,
                table = %self.config.table_path,
                rows = total,
                chunks,
                "write completed"
            );
            return Ok(WriteSummary {
                rows: total,
                chunks,
                portion,
                max_row_bytes: built.max_row_bytes,
            });
        }

        let mut resolve_error = None;
        if failures.iter().any(|f| f.error.is_schema_drift()) {
            warn!(
                target: event_names::SCHEMA_DRIFT_DETECTED,
                table = %self.config.table_path,
                "detected schema drift, re-resolving field mapping from table description"
            );
            if let Err(err) = self.refresh_mapping() {
                warn!(
                    target: event_names::SCHEMA_RESOLVE_FAILED,
                    error = %err,
                    "re-resolution failed"
                );
                resolve_error = Some(err);
            }
        }

        Err(WriteError::Chunks {
            failures,
            committed_rows,
            resolve_error,
        })
    }
}

impl<S: fmt::Debug> fmt::Debug for BatchWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchWriter")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("mapping", &self.mapping.load())
            .finish_non_exhaustive()
    }
}
