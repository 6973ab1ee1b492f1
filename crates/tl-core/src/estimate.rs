//! Encoded-size heuristics and chunk arithmetic.
//!
//! Estimates only drive chunk sizing; they are deliberately conservative
//! and never affect what gets stored.

use tl_common::{Cell, LogicalType, Scalar};

pub const SZ8: usize = 8;
pub const SZ16: usize = 16;
pub const SZ64: usize = 64;

/// Prices cells, fields and rows.
pub trait SizeEstimator: Send + Sync {
    /// Estimated encoded size of one coerced cell.
    fn cell_bytes(&self, cell: &Cell) -> usize;

    /// Estimated size of one named field carrying a cell of `cell_bytes`.
    fn field_bytes(&self, column: &str, cell_bytes: usize) -> usize;

    /// Fixed cost of a row before any field.
    fn row_overhead(&self) -> usize;
}

/// Default estimator.
///
/// | cell | bytes |
/// |---|---|
/// | text, bytes, json | 8 + payload length |
/// | timestamp (value or null) | 64 |
/// | uint64 | 16 |
/// | other typed null | 16 |
///
/// Each field adds 64 plus the column name length; each row starts at 128.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEstimator;

impl SizeEstimator for DefaultEstimator {
    fn cell_bytes(&self, cell: &Cell) -> usize {
        match cell {
            Cell::Null(LogicalType::Timestamp) => SZ64,
            Cell::Null(_) => SZ16,
            Cell::Value(scalar) | Cell::Optional(scalar) => match scalar {
                Scalar::Timestamp(_) => SZ64,
                Scalar::Uint64(_) => SZ8 + SZ8,
                other => SZ8 + other.payload_len().unwrap_or(0),
            },
        }
    }

    fn field_bytes(&self, column: &str, cell_bytes: usize) -> usize {
        SZ64 + cell_bytes + column.len()
    }

    fn row_overhead(&self) -> usize {
        SZ64 + SZ64
    }
}

/// Rows per chunk so one chunk of worst-case rows stays under `ceiling`.
///
/// Never less than one row, never more than `total_rows`. Returns zero
/// only when there are no rows.
pub fn portion(ceiling: usize, max_row_bytes: usize, total_rows: usize) -> usize {
    if total_rows == 0 {
        return 0;
    }
    (ceiling / max_row_bytes.max(1)).clamp(1, total_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_portion_divides_ceiling() {
        assert_eq!(portion(300, 100, 10), 3);
        assert_eq!(portion(300, 100, 3), 3);
    }

    #[test]
    fn test_portion_clamps_to_total() {
        assert_eq!(portion(500, 100, 2), 2);
    }

    #[test]
    fn test_portion_at_least_one() {
        assert_eq!(portion(100, 1_000, 7), 1);
        assert_eq!(portion(100, 0, 7), 7);
    }

    #[test]
    fn test_portion_no_rows() {
        assert_eq!(portion(100, 10, 0), 0);
    }

    #[test]
    fn test_default_cell_sizes() {
        let e = DefaultEstimator;
        assert_eq!(e.cell_bytes(&Cell::Value(Scalar::Text("abc".into()))), 11);
        assert_eq!(e.cell_bytes(&Cell::Optional(Scalar::Bytes(vec![0; 10]))), 18);
        assert_eq!(e.cell_bytes(&Cell::Value(Scalar::Timestamp(Utc::now()))), 64);
        assert_eq!(e.cell_bytes(&Cell::Value(Scalar::Uint64(7))), 16);
        assert_eq!(e.cell_bytes(&Cell::Null(LogicalType::Timestamp)), 64);
        assert_eq!(e.cell_bytes(&Cell::Null(LogicalType::Json)), 16);
    }

    #[test]
    fn test_default_field_and_row() {
        let e = DefaultEstimator;
        assert_eq!(e.field_bytes("msg", 11), 64 + 11 + 3);
        assert_eq!(e.row_overhead(), 128);
    }
}
