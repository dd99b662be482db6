// Document model and the seam between the matcher and a spreadsheet codec.

use std::path::{Path, PathBuf};

use crate::address::CellRange;
use crate::style::HighlightStyle;

/// One sheet of one file, as rows of cell text.
///
/// Row `i` is spreadsheet row `i + 1`. Rows are trimmed of trailing empty
/// cells, so `row.len()` is the row's width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularDocument {
    pub path: PathBuf,
    pub sheet: String,
    pub rows: Vec<Vec<String>>,
}

impl TabularDocument {
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        let mut rows = rows;
        for row in &mut rows {
            trim_trailing_empty(row);
        }
        Self {
            path: path.into(),
            sheet: sheet.into(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Text at (row, col), or `None` when the row is too narrow.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn width(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }
}

/// Drop empty cells from the end of a row.
pub fn trim_trailing_empty(row: &mut Vec<String>) {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
}

/// Handle to a style defined inside one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleId(pub usize);

/// An opened spreadsheet that can be read, marked, and written back.
///
/// Codec errors cross this boundary as plain strings.
pub trait Annotatable {
    fn path(&self) -> &Path;

    /// All rows of `sheet` as text.
    fn read_table(&self, sheet: &str) -> Result<TabularDocument, String>;

    /// Register a highlight style. Defining an equal style twice returns the same id.
    fn define_style(&mut self, style: &HighlightStyle) -> StyleId;

    fn apply_style(&mut self, sheet: &str, range: CellRange, style: StyleId) -> Result<(), String>;

    /// Flush to the document's own path.
    fn save(&mut self) -> Result<(), String>;
}

/// Opens documents by path.
pub trait DocumentOpener {
    type Document: Annotatable;

    fn open(&self, path: &Path) -> Result<Self::Document, String>;
}
