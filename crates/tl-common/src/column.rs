//! Column descriptors discovered from a destination table.
//!
//! Store type names follow the spelling of the reference store:
//! `Utf8` is text, `String` is raw bytes, and `Optional<T>` marks a
//! nullable column of `T`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical type of a destination column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Text,
    Bytes,
    Json,
    JsonDocument,
    Timestamp,
    Uint64,
    /// Any store type the engine cannot write into.
    Other(String),
}

impl LogicalType {
    /// Parse a bare (non-optional) store type name.
    pub fn from_store_name(name: &str) -> Self {
        match name {
            "Utf8" | "Text" => LogicalType::Text,
            "String" | "Bytes" => LogicalType::Bytes,
            "Json" => LogicalType::Json,
            "JsonDocument" => LogicalType::JsonDocument,
            "Timestamp" => LogicalType::Timestamp,
            "Uint64" => LogicalType::Uint64,
            other => LogicalType::Other(other.to_string()),
        }
    }

    /// Store spelling of this type.
    pub fn store_name(&self) -> &str {
        match self {
            LogicalType::Text => "Utf8",
            LogicalType::Bytes => "String",
            LogicalType::Json => "Json",
            LogicalType::JsonDocument => "JsonDocument",
            LogicalType::Timestamp => "Timestamp",
            LogicalType::Uint64 => "Uint64",
            LogicalType::Other(name) => name,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Text => write!(f, "Text"),
            LogicalType::Bytes => write!(f, "Bytes"),
            LogicalType::Json => write!(f, "Json"),
            LogicalType::JsonDocument => write!(f, "JsonDocument"),
            LogicalType::Timestamp => write!(f, "Timestamp"),
            LogicalType::Uint64 => write!(f, "Uint64"),
            LogicalType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// One destination column. Identity is the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub logical_type: LogicalType,
    pub optional: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, logical_type: LogicalType, optional: bool) -> Self {
        Column {
            name: name.into(),
            logical_type,
            optional,
        }
    }

    /// Build a column from a store type name such as `Optional<Utf8>`.
    pub fn from_store_type(name: impl Into<String>, type_name: &str) -> Self {
        let type_name = type_name.trim();
        let (optional, inner) = match type_name
            .strip_prefix("Optional<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            Some(inner) => (true, inner.trim()),
            None => (false, type_name),
        };
        Column::new(name, LogicalType::from_store_name(inner), optional)
    }

    /// Full store type name, including the `Optional<...>` wrapper.
    pub fn store_type(&self) -> String {
        if self.optional {
            format!("Optional<{}>", self.logical_type.store_name())
        } else {
            self.logical_type.store_name().to_string()
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.store_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_type_plain() {
        let col = Column::from_store_type("msg", "Utf8");
        assert_eq!(col.logical_type, LogicalType::Text);
        assert!(!col.optional);
    }

    #[test]
    fn test_from_store_type_optional() {
        let col = Column::from_store_type("ts", "Optional<Timestamp>");
        assert_eq!(col.logical_type, LogicalType::Timestamp);
        assert!(col.optional);
        assert_eq!(col.store_type(), "Optional<Timestamp>");
    }

    #[test]
    fn test_bytes_spelled_string() {
        let col = Column::from_store_type("raw", "String");
        assert_eq!(col.logical_type, LogicalType::Bytes);
        assert_eq!(col.store_type(), "String");
    }

    #[test]
    fn test_unknown_type_is_other() {
        let col = Column::from_store_type("n", "Optional<Int32>");
        assert_eq!(col.logical_type, LogicalType::Other("Int32".to_string()));
        assert!(col.optional);
        assert_eq!(col.store_type(), "Optional<Int32>");
    }

    #[test]
    fn test_unterminated_optional_is_not_optional() {
        let col = Column::from_store_type("x", "Optional<Utf8");
        assert!(!col.optional);
        assert_eq!(col.logical_type, LogicalType::Other("Optional<Utf8".to_string()));
    }
}
