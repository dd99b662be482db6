use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CompareError, Side};

/// Two files and the 0-based column to compare in each.
///
/// Columns are signed so that out-of-range input from a front end can be
/// rejected with a message instead of failing to marshal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub path_a: PathBuf,
    pub path_b: PathBuf,
    pub col_a: i64,
    pub col_b: i64,
}

/// Column indices that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub a: usize,
    pub b: usize,
}

impl ComparisonRequest {
    pub fn new(path_a: impl Into<PathBuf>, path_b: impl Into<PathBuf>, col_a: i64, col_b: i64) -> Self {
        Self {
            path_a: path_a.into(),
            path_b: path_b.into(),
            col_a,
            col_b,
        }
    }

    /// A is checked before B.
    pub fn columns(&self) -> Result<Columns, CompareError> {
        let a = usize::try_from(self.col_a).map_err(|_| CompareError::NegativeColumn {
            side: Side::A,
            value: self.col_a,
        })?;
        let b = usize::try_from(self.col_b).map_err(|_| CompareError::NegativeColumn {
            side: Side::B,
            value: self.col_b,
        })?;
        Ok(Columns { a, b })
    }
}
