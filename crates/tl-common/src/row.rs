//! Typed rows as submitted to a store.

use chrono::{DateTime, Utc};

use crate::column::{Column, LogicalType};

/// A non-null value of one logical type.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Bytes(Vec<u8>),
    Json(String),
    JsonDocument(String),
    Timestamp(DateTime<Utc>),
    Uint64(u64),
}

impl Scalar {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Scalar::Text(_) => LogicalType::Text,
            Scalar::Bytes(_) => LogicalType::Bytes,
            Scalar::Json(_) => LogicalType::Json,
            Scalar::JsonDocument(_) => LogicalType::JsonDocument,
            Scalar::Timestamp(_) => LogicalType::Timestamp,
            Scalar::Uint64(_) => LogicalType::Uint64,
        }
    }

    /// Length of the encoded payload for variable-width types.
    pub fn payload_len(&self) -> Option<usize> {
        match self {
            Scalar::Text(s) | Scalar::Json(s) | Scalar::JsonDocument(s) => Some(s.len()),
            Scalar::Bytes(b) => Some(b.len()),
            Scalar::Timestamp(_) | Scalar::Uint64(_) => None,
        }
    }
}

/// One typed cell of a row.
///
/// Optional columns carry either `Optional` or a typed `Null`; required
/// columns always carry `Value`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Value(Scalar),
    Optional(Scalar),
    Null(LogicalType),
}

impl Cell {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Cell::Value(s) | Cell::Optional(s) => s.logical_type(),
            Cell::Null(t) => t.clone(),
        }
    }

    /// Whether the cell targets an optional column.
    pub fn is_optional(&self) -> bool {
        matches!(self, Cell::Optional(_) | Cell::Null(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null(_))
    }

    pub fn scalar(&self) -> Option<&Scalar> {
        match self {
            Cell::Value(s) | Cell::Optional(s) => Some(s),
            Cell::Null(_) => None,
        }
    }

    /// Whether the cell can be stored in `column` without conversion.
    pub fn fits(&self, column: &Column) -> bool {
        self.is_optional() == column.optional && self.logical_type() == column.logical_type
    }
}

/// Ordered `(column name, cell)` pairs for one event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<(String, Cell)>,
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Row {
            cells: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, cell: Cell) {
        self.cells.push((column.into(), cell));
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell stored for a column, if any.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_fits_column() {
        let required = Column::new("msg", LogicalType::Text, false);
        let optional = Column::new("msg", LogicalType::Text, true);

        let plain = Cell::Value(Scalar::Text("x".into()));
        let wrapped = Cell::Optional(Scalar::Text("x".into()));
        let null = Cell::Null(LogicalType::Text);

        assert!(plain.fits(&required));
        assert!(!plain.fits(&optional));
        assert!(wrapped.fits(&optional));
        assert!(null.fits(&optional));
        assert!(!null.fits(&required));
        assert!(!Cell::Null(LogicalType::Bytes).fits(&optional));
    }

    #[test]
    fn test_row_lookup_preserves_order() {
        let mut row = Row::new();
        row.push("a", Cell::Value(Scalar::Uint64(1)));
        row.push("b", Cell::Null(LogicalType::Json));
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("b"), Some(&Cell::Null(LogicalType::Json)));
        assert!(row.get("c").is_none());
    }
}
