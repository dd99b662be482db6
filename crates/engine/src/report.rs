use serde::Serialize;

use crate::matcher::MatchPair;
use crate::options::{MarkMode, MissingColumnPolicy};
use crate::request::ComparisonRequest;

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub meta: ReportMeta,
    pub request: ComparisonRequest,
    pub summary: MatchSummary,
    pub matches: Vec<MatchPair>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub sheet: String,
    pub missing_column: MissingColumnPolicy,
    pub mark_mode: MarkMode,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchSummary {
    pub rows_a: usize,
    pub rows_b: usize,
    pub matches: usize,
    /// Distinct cells carrying the highlight in A.
    pub cells_marked_a: usize,
    /// Distinct cells carrying the highlight in B.
    pub cells_marked_b: usize,
    pub saved_a: bool,
    pub saved_b: bool,
}

impl MatchReport {
    /// The success line shown to the caller.
    pub fn status_line(&self) -> String {
        let n = self.summary.matches;
        format!("update complete: {} match{}", n, if n == 1 { "" } else { "es" })
    }
}
