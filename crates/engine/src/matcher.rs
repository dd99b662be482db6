// All-pairs equality matching between one column of A and one column of B.
// Pure function: two tables in, matched row pairs out. No IO, no styling.

use serde::Serialize;

use crate::document::TabularDocument;
use crate::error::Side;
use crate::options::MissingColumnPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchPair {
    /// 0-based row in A.
    pub row_a: usize,
    /// 0-based row in B.
    pub row_b: usize,
    pub value: String,
}

/// A row too narrow for its designated column, under [`MissingColumnPolicy::Abort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarrowRow {
    pub side: Side,
    /// 0-based row.
    pub row: usize,
}

/// Compare `a[i][col_a]` with `b[j][col_b]` for every `(i, j)`.
///
/// Exact string equality: no trimming, no case folding, no numeric coercion.
/// Pairs come out in row-major order of A then B. Rows that are too narrow
/// are skipped or fail the call depending on `policy`; with `Abort` the first
/// narrow row met in iteration order is reported.
pub fn find_matches(
    a: &TabularDocument,
    col_a: usize,
    b: &TabularDocument,
    col_b: usize,
    policy: MissingColumnPolicy,
) -> Result<Vec<MatchPair>, NarrowRow> {
    let mut matches = Vec::new();

    for (i, row_a) in a.rows.iter().enumerate() {
        let Some(left) = row_a.get(col_a) else {
            match policy {
                MissingColumnPolicy::Skip => continue,
                MissingColumnPolicy::Abort => return Err(NarrowRow { side: Side::A, row: i }),
            }
        };

        for (j, row_b) in b.rows.iter().enumerate() {
            let Some(right) = row_b.get(col_b) else {
                match policy {
                    MissingColumnPolicy::Skip => continue,
                    MissingColumnPolicy::Abort => return Err(NarrowRow { side: Side::B, row: j }),
                }
            };

            if left == right {
                matches.push(MatchPair {
                    row_a: i,
                    row_b: j,
                    value: left.clone(),
                });
            }
        }
    }

    Ok(matches)
}
