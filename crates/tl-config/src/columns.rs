//! Field-to-column declarations.
//!
//! The host hands over one string: either inline JSON (`{"log": "msg"}`)
//! or a path to a file containing that JSON. In TOML/JSON config files the
//! declarations may also be written as a table directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tl_common::keys;

use crate::validate::{validate_columns, ValidationError, ValidationResult};

/// Validated mapping from field key to destination column name.
///
/// Always contains `.timestamp` and `.input`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "ColumnsSource",
    into = "BTreeMap<String, String>"
)]
pub struct ColumnDeclarations {
    entries: BTreeMap<String, String>,
}

/// Raw shapes accepted when deserializing declarations.
#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnsSource {
    Table(BTreeMap<String, String>),
    Reference(String),
}

impl TryFrom<ColumnsSource> for ColumnDeclarations {
    type Error = ValidationError;

    fn try_from(source: ColumnsSource) -> Result<Self, Self::Error> {
        match source {
            ColumnsSource::Table(entries) => ColumnDeclarations::new(entries),
            ColumnsSource::Reference(value) => ColumnDeclarations::parse(&value),
        }
    }
}

impl From<ColumnDeclarations> for BTreeMap<String, String> {
    fn from(decl: ColumnDeclarations) -> Self {
        decl.entries
    }
}

impl ColumnDeclarations {
    /// Validate and wrap a declaration map.
    pub fn new(entries: BTreeMap<String, String>) -> ValidationResult<Self> {
        validate_columns(&entries)?;
        Ok(ColumnDeclarations { entries })
    }

    /// Parse a declaration string: a path to a JSON file, or inline JSON.
    pub fn parse(value: &str) -> ValidationResult<Self> {
        let path = Path::new(value);
        let json = if path.is_file() {
            std::fs::read_to_string(path).map_err(|e| {
                ValidationError::IoError(format!("failed to read file '{}': {}", value, e))
            })?
        } else {
            value.to_string()
        };

        let entries: BTreeMap<String, String> = serde_json::from_str(&json).map_err(|e| {
            ValidationError::ParseError(format!("failed to decode columns JSON: {}", e))
        })?;

        ColumnDeclarations::new(entries)
    }

    /// Column name declared for a field key.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, c)| (f.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Whether an overflow column is declared.
    pub fn has_overflow(&self) -> bool {
        self.entries.contains_key(keys::OTHERS)
    }

    /// Whether a hash column is declared.
    pub fn has_hash(&self) -> bool {
        self.entries.contains_key(keys::HASH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_inline_json() {
        let decl =
            ColumnDeclarations::parse(r#"{".timestamp":"ts",".input":"tag","log":"msg"}"#)
                .unwrap();
        assert_eq!(decl.len(), 3);
        assert_eq!(decl.get("log"), Some("msg"));
        assert!(!decl.has_overflow());
        assert!(!decl.has_hash());
    }

    #[test]
    fn test_parse_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{".timestamp":"ts",".input":"tag",".others":"rest",".hash":"h"}}"#
        )
        .unwrap();

        let decl = ColumnDeclarations::parse(file.path().to_str().unwrap()).unwrap();
        assert!(decl.has_overflow());
        assert!(decl.has_hash());
        assert_eq!(decl.get(".others"), Some("rest"));
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = ColumnDeclarations::parse("{not json").unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }

    #[test]
    fn test_parse_requires_reserved_keys() {
        let err = ColumnDeclarations::parse(r#"{".timestamp":"ts"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField(ref k) if k == ".input"));
    }

    #[test]
    fn test_deserialize_table_and_string() {
        let from_table: ColumnDeclarations =
            serde_json::from_str(r#"{".timestamp":"ts",".input":"tag"}"#).unwrap();
        let from_string: ColumnDeclarations =
            serde_json::from_str(r#""{\".timestamp\":\"ts\",\".input\":\"tag\"}""#).unwrap();
        assert_eq!(from_table, from_string);
    }

    #[test]
    fn test_serialize_as_table() {
        let decl = ColumnDeclarations::parse(r#"{".timestamp":"ts",".input":"tag"}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&decl).unwrap(),
            r#"{".input":"tag",".timestamp":"ts"}"#
        );
    }
}
