//! Incoming log events.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::value::Value;

/// One decoded log record.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event time as reported by the host.
    pub timestamp: DateTime<Utc>,
    /// Source tag of the record.
    pub metadata: String,
    /// Record fields.
    pub message: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(timestamp: DateTime<Utc>, metadata: impl Into<String>) -> Self {
        Event {
            timestamp,
            metadata: metadata.into(),
            message: BTreeMap::new(),
        }
    }

    /// Add a message field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.message.insert(key.into(), value.into());
        self
    }
}
