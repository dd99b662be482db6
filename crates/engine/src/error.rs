use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::address::col_to_letter;

/// Which of the two documents a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::A => "A",
            Side::B => "B",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareError {
    /// A designated column index was below zero. Nothing was opened.
    NegativeColumn { side: Side, value: i64 },
    /// The document could not be opened (missing file, corrupt container).
    Open { path: PathBuf, cause: String },
    /// The working sheet could not be read.
    ReadRows { path: PathBuf, cause: String },
    /// A row is narrower than the designated column (abort policy only).
    /// `row` is the 1-based spreadsheet row.
    ColumnNotFound { path: PathBuf, column: usize, row: usize },
    /// A marked cell could not be styled.
    Mark { path: PathBuf, cause: String },
    /// The document could not be written back.
    Save { path: PathBuf, cause: String },
}

impl CompareError {
    /// Stable machine-readable kind, used for exit codes and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NegativeColumn { .. } => "negative_column",
            Self::Open { .. } => "open_failed",
            Self::ReadRows { .. } => "read_rows_failed",
            Self::ColumnNotFound { .. } => "column_not_found",
            Self::Mark { .. } => "mark_failed",
            Self::Save { .. } => "save_failed",
        }
    }
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeColumn { side, value } => {
                write!(f, "column {} index must not be negative (got {value})", side.as_str())
            }
            Self::Open { path, cause } => {
                write!(f, "failed to open {}: {cause}", path.display())
            }
            Self::ReadRows { path, cause } => {
                write!(f, "failed to read rows from {}: {cause}", path.display())
            }
            Self::ColumnNotFound { path, column, row } => {
                write!(
                    f,
                    "column {} not found at row {row} in {}",
                    col_to_letter(*column),
                    path.display()
                )
            }
            Self::Mark { path, cause } => {
                write!(f, "failed to mark cells in {}: {cause}", path.display())
            }
            Self::Save { path, cause } => {
                write!(f, "failed to save {}: {cause}", path.display())
            }
        }
    }
}

impl std::error::Error for CompareError {}
