//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! | Code | Trigger                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified, marking failure)     |
//! | 2    | Usage error (bad args, bad settings, bad JSON)   |
//! | 3    | Negative column index                            |
//! | 4    | A document could not be opened                   |
//! | 5    | Rows could not be read (missing sheet)           |
//! | 6    | Column not found (abort policy)                  |
//! | 7    | A document could not be saved                    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use colmatch_engine::CompareError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Compare (3-7)
// =============================================================================

/// A column index was negative. Nothing was opened.
pub const EXIT_NEGATIVE_COLUMN: u8 = 3;

/// Missing file or not an XLSX container.
pub const EXIT_OPEN: u8 = 4;

/// The working sheet could not be read.
pub const EXIT_READ_ROWS: u8 = 5;

/// A row was narrower than its column under the abort policy. Nothing was saved.
pub const EXIT_COLUMN_NOT_FOUND: u8 = 6;

/// Writing a marked document back failed.
pub const EXIT_SAVE: u8 = 7;

/// Map a CompareError to its exit code.
pub fn compare_exit_code(err: &CompareError) -> u8 {
    match err {
        CompareError::NegativeColumn { .. } => EXIT_NEGATIVE_COLUMN,
        CompareError::Open { .. } => EXIT_OPEN,
        CompareError::ReadRows { .. } => EXIT_READ_ROWS,
        CompareError::ColumnNotFound { .. } => EXIT_COLUMN_NOT_FOUND,
        CompareError::Mark { .. } => EXIT_ERROR,
        CompareError::Save { .. } => EXIT_SAVE,
    }
}

/// Structured error output for `compare --json`.
#[derive(Debug, serde::Serialize)]
pub struct CompareErrorOutput {
    pub error: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl CompareErrorOutput {
    pub fn from_compare_error(err: &CompareError) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
            exit_code: compare_exit_code(err),
        }
    }
}
