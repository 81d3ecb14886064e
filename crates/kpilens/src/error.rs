use arrow_schema::ArrowError;
use serde::Serialize;

use crate::schema::ColumnKind;

/// Errors that make the current request unanswerable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Dataset has no columns")]
    NoColumns,
    #[error("Column {0:?} appears more than once")]
    DuplicateColumn(String),
    #[error("Dataset has no rows")]
    NoRows,
    #[error("No numeric column")]
    NoNumericColumn,
}

/// A metric whose group means are all equal cannot be min-max normalized.
///
/// Reported alongside the result rather than failing it; the affected metric
/// is given the neutral value [`DegenerateRangeError::NEUTRAL`].
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("Metric column {column:?} has a degenerate range: every group mean is {value:?}")]
pub struct DegenerateRangeError {
    pub column: String,
    /// The shared group mean, `None` when no group has a value.
    pub value: Option<f64>,
}

impl DegenerateRangeError {
    pub const NEUTRAL: f64 = 0.5;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("Column {column:?} is {actual:?}, expected {expected:?}")]
    ColumnKind {
        column: String,
        expected: ColumnKind,
        actual: ColumnKind,
    },
    #[error("Sum of {column:?} for group {group:?} overflows")]
    NonFiniteSum { column: String, group: String },
    #[error("Row {row} out of bounds for {len} rows")]
    RowOutOfBounds { row: usize, len: usize },
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
