//! JSON-lines host adapter.
//!
//! Each input line is one record:
//! ```json
//! {"timestamp": "2024-01-02T03:04:05.000Z", "tag": "app", "record": {"log": "hello"}}
//! ```
//! `timestamp` is an RFC 3339 string or Unix seconds (integer or float);
//! when it is missing or unreadable the record is kept with the current time.
//! `record` is optional; when present it must be an object.

use std::io::BufRead;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tl_common::{Event, Value};
use tracing::warn;

use crate::logging::event_names;

/// Errors decoding one input line.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("line {line}: invalid JSON: {source}")]
    InvalidJson {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: expected a JSON object")]
    NotAnObject { line: usize },

    #[error("line {line}: missing or invalid field `{field}`")]
    InvalidField { line: usize, field: &'static str },

    #[error("line {line}: unreadable input: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    pub fn line(&self) -> usize {
        match self {
            DecodeError::InvalidJson { line, .. }
            | DecodeError::NotAnObject { line }
            | DecodeError::InvalidField { line, .. }
            | DecodeError::Io { line, .. } => *line,
        }
    }
}

impl From<DecodeError> for tl_common::Error {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Io { source, .. } => tl_common::Error::Io(source),
            other => tl_common::Error::Conversion(other.to_string()),
        }
    }
}

fn decode_timestamp(json: &serde_json::Value) -> Option<DateTime<Utc>> {
    match json {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        serde_json::Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                DateTime::from_timestamp(secs, 0)
            } else {
                let secs = n.as_f64()?;
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9).round() as u32;
                DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
            }
        }
        _ => None,
    }
}

/// Decode one line (1-based `line` for error reporting).
pub fn decode_line(line: usize, text: &str) -> Result<Event, DecodeError> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|source| DecodeError::InvalidJson { line, source })?;
    let object = json
        .as_object()
        .ok_or(DecodeError::NotAnObject { line })?;

    let timestamp = match object.get("timestamp").and_then(decode_timestamp) {
        Some(ts) => ts,
        None => {
            warn!(
                target: event_names::INPUT_TIMESTAMP_FALLBACK,
                line,
                "missing or invalid record timestamp, using current time"
            );
            Utc::now()
        }
    };
    let tag = object
        .get("tag")
        .and_then(|t| t.as_str())
        .ok_or(DecodeError::InvalidField { line, field: "tag" })?;

    let mut event = Event::new(timestamp, tag);
    match object.get("record") {
        None | Some(serde_json::Value::Null) => {}
        Some(serde_json::Value::Object(record)) => {
            event.message = record
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect();
        }
        Some(_) => {
            return Err(DecodeError::InvalidField {
                line,
                field: "record",
            })
        }
    }
    Ok(event)
}

/// Iterator over decoded events of a JSON-lines reader. Blank lines are skipped.
pub struct EventReader<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        EventReader {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<Event, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            self.line += 1;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let text = self.buf.trim();
                    if text.is_empty() {
                        continue;
                    }
                    return Some(decode_line(self.line, text));
                }
                Err(source) => {
                    return Some(Err(DecodeError::Io {
                        line: self.line,
                        source,
                    }))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Cursor;

    #[test]
    fn test_decode_rfc3339_line() {
        let event = decode_line(
            1,
            r#"{"timestamp":"2024-01-02T03:04:05Z","tag":"app","record":{"log":"hi","n":3,"neg":-1,"m":{"a":true}}}"#,
        )
        .unwrap();
        assert_eq!(event.timestamp, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        assert_eq!(event.metadata, "app");
        assert_eq!(event.message["log"], Value::from("hi"));
        assert_eq!(event.message["n"], Value::Uint(3));
        assert_eq!(event.message["neg"], Value::Int(-1));
        assert!(matches!(event.message["m"], Value::Map(_)));
    }

    #[test]
    fn test_decode_unix_seconds() {
        let event = decode_line(1, r#"{"timestamp":1704164645,"tag":"app"}"#).unwrap();
        assert_eq!(event.timestamp, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        assert!(event.message.is_empty());

        let event = decode_line(1, r#"{"timestamp":1704164645.5,"tag":"app"}"#).unwrap();
        assert_eq!(event.timestamp.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_line(3, "not json"),
            Err(DecodeError::InvalidJson { line: 3, .. })
        ));
        assert!(matches!(
            decode_line(1, "[1,2]"),
            Err(DecodeError::NotAnObject { .. })
        ));
        assert!(matches!(
            decode_line(1, r#"{"timestamp":0}"#),
            Err(DecodeError::InvalidField { field: "tag", .. })
        ));
        assert!(matches!(
            decode_line(1, r#"{"timestamp":0,"tag":"app","record":[1]}"#),
            Err(DecodeError::InvalidField { field: "record", .. })
        ));
    }

    #[test]
    fn test_missing_or_bad_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let missing = decode_line(1, r#"{"tag":"app","record":{"log":"x"}}"#).unwrap();
        let garbled = decode_line(2, r#"{"timestamp":"yesterday","tag":"app"}"#).unwrap();
        let after = Utc::now();

        for event in [&missing, &garbled] {
            assert!(event.timestamp >= before && event.timestamp <= after);
            assert_eq!(event.metadata, "app");
        }
        assert_eq!(missing.message["log"], Value::from("x"));
    }

    #[test]
    fn test_reader_skips_blank_lines_and_counts() {
        let input = "\n{\"timestamp\":0,\"tag\":\"a\"}\n\nbad\n";
        let results: Vec<_> = EventReader::new(Cursor::new(input)).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().line(), 4);
    }
}
