//! Stable event names.
//!
//! Engine log records use these names as their `tracing` target, so a
//! filter such as `RUST_LOG=schema.drift_detected=warn` or a JSONL
//! consumer can select them without parsing messages.

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_ERROR: &str = "config.error";

    // Schema resolution
    pub const SCHEMA_DESCRIBED: &str = "schema.described";
    pub const SCHEMA_RESOLVED: &str = "schema.resolved";
    pub const SCHEMA_DRIFT_DETECTED: &str = "schema.drift_detected";
    pub const SCHEMA_RESOLVE_FAILED: &str = "schema.resolve_failed";

    // Row building
    pub const COERCE_TIMESTAMP_FALLBACK: &str = "coerce.timestamp_fallback";
    pub const ROW_FIELD_SKIPPED: &str = "row.field_skipped";
    pub const ROW_FIELD_DROPPED: &str = "row.field_dropped";

    // Chunk submission
    pub const WRITE_STARTED: &str = "write.started";
    pub const WRITE_CHUNK_COMMITTED: &str = "write.chunk_committed";
    pub const WRITE_CHUNK_FAILED: &str = "write.chunk_failed";
    pub const WRITE_COMPLETED: &str = "write.completed";
    pub const WRITE_BATCH_FAILED: &str = "write.batch_failed";

    // Host adapter
    pub const INPUT_LINE_SKIPPED: &str = "input.line_skipped";
    pub const INPUT_TIMESTAMP_FALLBACK: &str = "input.timestamp_fallback";
}
