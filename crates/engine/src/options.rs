use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::style::HighlightStyle;

/// Last column of the fixed row range used by [`MarkMode::RowRange`] (`AA`).
pub const ROW_RANGE_LAST_COL: usize = 26;

/// Default working sheet.
pub const DEFAULT_SHEET: &str = "Sheet1";

/// What to do with a row narrower than its designated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingColumnPolicy {
    /// Ignore the row; every other row is still compared.
    #[default]
    Skip,
    /// Fail the whole comparison before anything is saved.
    Abort,
}

impl fmt::Display for MissingColumnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for MissingColumnPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown missing-column policy '{other}' (expected skip or abort)")),
        }
    }
}

/// Where the highlight goes when a pair matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkMode {
    /// The matched cell in A and the matched cell in B.
    #[default]
    Symmetric,
    /// Columns `A..=AA` of the matched row in A; B is left untouched.
    RowRange,
}

impl MarkMode {
    pub fn marks_b(&self) -> bool {
        matches!(self, Self::Symmetric)
    }
}

impl fmt::Display for MarkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symmetric => write!(f, "symmetric"),
            Self::RowRange => write!(f, "row-range"),
        }
    }
}

impl FromStr for MarkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "symmetric" => Ok(Self::Symmetric),
            "row-range" => Ok(Self::RowRange),
            other => Err(format!("unknown mark mode '{other}' (expected symmetric or row-range)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareOptions {
    pub sheet: String,
    pub missing_column: MissingColumnPolicy,
    pub mark_mode: MarkMode,
    pub style: HighlightStyle,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            sheet: DEFAULT_SHEET.to_string(),
            missing_column: MissingColumnPolicy::default(),
            mark_mode: MarkMode::default(),
            style: HighlightStyle::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_round_trip_through_strings() {
        for p in [MissingColumnPolicy::Skip, MissingColumnPolicy::Abort] {
            assert_eq!(p.to_string().parse::<MissingColumnPolicy>(), Ok(p));
        }
        for m in [MarkMode::Symmetric, MarkMode::RowRange] {
            assert_eq!(m.to_string().parse::<MarkMode>(), Ok(m));
        }
        assert!("lenient".parse::<MissingColumnPolicy>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        assert_eq!(serde_json::to_string(&MarkMode::RowRange).unwrap(), "\"row-range\"");
        assert_eq!(serde_json::to_string(&MissingColumnPolicy::Abort).unwrap(), "\"abort\"");
    }

    #[test]
    fn test_defaults() {
        let opts = CompareOptions::default();
        assert_eq!(opts.sheet, "Sheet1");
        assert_eq!(opts.missing_column, MissingColumnPolicy::Skip);
        assert_eq!(opts.mark_mode, MarkMode::Symmetric);
        assert!(opts.mark_mode.marks_b());
        assert!(!MarkMode::RowRange.marks_b());
    }
}
