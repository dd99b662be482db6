// Cell addressing: column letters, A1-style references, rectangular ranges.

use std::fmt;

/// Convert column index to Excel column letter (0 = A, 25 = Z, 26 = AA, etc.)
pub fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Convert row/col to Excel cell address (e.g., "A1", "B5", "AA100")
pub fn cell_address(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letter(col), row + 1)
}

/// Parse a cell reference like "B5" into (row, col) = (4, 1).
/// Absolute markers (`$B$5`) are accepted.
pub fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    let r = r.trim().replace('$', "");
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (col_part, row_part) = r.split_at(split);

    if col_part.is_empty() || !col_part.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if row_part.is_empty() || !row_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut col: usize = 0;
    for ch in col_part.chars() {
        col = col * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }

    let row: usize = row_part.parse().ok()?;
    if row == 0 {
        return None;
    }

    Some((row - 1, col - 1))
}

/// Inclusive rectangular range of cells, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

impl CellRange {
    pub fn cell(row: usize, col: usize) -> Self {
        Self {
            first_row: row,
            first_col: col,
            last_row: row,
            last_col: col,
        }
    }

    /// Columns `first_col..=last_col` of a single row.
    pub fn row_span(row: usize, first_col: usize, last_col: usize) -> Self {
        Self {
            first_row: row,
            first_col: first_col.min(last_col),
            last_row: row,
            last_col: first_col.max(last_col),
        }
    }

    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }

    /// Every (row, col) inside the range, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.first_row..=self.last_row)
            .flat_map(move |r| (self.first_col..=self.last_col).map(move |c| (r, c)))
    }

    pub fn cell_count(&self) -> usize {
        (self.last_row - self.first_row + 1) * (self.last_col - self.first_col + 1)
    }

    /// Parse "B5" or "A3:AA3".
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once(':') {
            Some((start, end)) => {
                let (r1, c1) = parse_cell_ref(start)?;
                let (r2, c2) = parse_cell_ref(end)?;
                Some(Self {
                    first_row: r1.min(r2),
                    first_col: c1.min(c2),
                    last_row: r1.max(r2),
                    last_col: c1.max(c2),
                })
            }
            None => {
                let (r, c) = parse_cell_ref(s)?;
                Some(Self::cell(r, c))
            }
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", cell_address(self.first_row, self.first_col))
        } else {
            write!(
                f,
                "{}:{}",
                cell_address(self.first_row, self.first_col),
                cell_address(self.last_row, self.last_col)
            )
        }
    }
}
