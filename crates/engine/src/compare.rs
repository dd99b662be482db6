use std::collections::BTreeSet;

use crate::address::{cell_address, CellRange};
use crate::document::{Annotatable, DocumentOpener};
use crate::error::{CompareError, Side};
use crate::matcher::find_matches;
use crate::options::{CompareOptions, MarkMode, ROW_RANGE_LAST_COL};
use crate::report::{MatchReport, MatchSummary, ReportMeta};
use crate::request::ComparisonRequest;

/// Run one comparison: open both documents, mark matching cells, save.
///
/// Stops at the first failure. Negative columns fail before anything is
/// opened; a failure on A means B is never opened; a column-not-found abort
/// happens before anything is saved. B is saved only if it was marked.
pub fn compare<O: DocumentOpener>(
    request: &ComparisonRequest,
    opener: &O,
    options: &CompareOptions,
) -> Result<MatchReport, CompareError> {
    let cols = request.columns()?;
    let sheet = options.sheet.as_str();

    log::info!(
        "comparing {} (col {}) with {} (col {}) on sheet '{}'",
        request.path_a.display(),
        cols.a,
        request.path_b.display(),
        cols.b,
        sheet
    );

    let mut doc_a = opener.open(&request.path_a).map_err(|cause| CompareError::Open {
        path: request.path_a.clone(),
        cause,
    })?;
    let table_a = doc_a.read_table(sheet).map_err(|cause| CompareError::ReadRows {
        path: request.path_a.clone(),
        cause,
    })?;

    let mut doc_b = opener.open(&request.path_b).map_err(|cause| CompareError::Open {
        path: request.path_b.clone(),
        cause,
    })?;
    let table_b = doc_b.read_table(sheet).map_err(|cause| CompareError::ReadRows {
        path: request.path_b.clone(),
        cause,
    })?;

    let style_a = doc_a.define_style(&options.style);
    let style_b = options
        .mark_mode
        .marks_b()
        .then(|| doc_b.define_style(&options.style));

    let matches = find_matches(&table_a, cols.a, &table_b, cols.b, options.missing_column)
        .map_err(|narrow| {
            let (path, column) = match narrow.side {
                Side::A => (request.path_a.clone(), cols.a),
                Side::B => (request.path_b.clone(), cols.b),
            };
            CompareError::ColumnNotFound {
                path,
                column,
                row: narrow.row + 1,
            }
        })?;

    let mut marked_a: BTreeSet<(usize, usize)> = BTreeSet::new();
    let mut marked_b: BTreeSet<(usize, usize)> = BTreeSet::new();

    for pair in &matches {
        let target_a = match options.mark_mode {
            MarkMode::Symmetric => CellRange::cell(pair.row_a, cols.a),
            MarkMode::RowRange => CellRange::row_span(pair.row_a, 0, ROW_RANGE_LAST_COL),
        };
        log::debug!(
            "match {:?}: A {} <-> B {}",
            pair.value,
            target_a,
            cell_address(pair.row_b, cols.b)
        );

        doc_a
            .apply_style(sheet, target_a, style_a)
            .map_err(|cause| CompareError::Mark {
                path: request.path_a.clone(),
                cause,
            })?;
        marked_a.extend(target_a.cells());

        if let Some(style_b) = style_b {
            let target_b = CellRange::cell(pair.row_b, cols.b);
            doc_b
                .apply_style(sheet, target_b, style_b)
                .map_err(|cause| CompareError::Mark {
                    path: request.path_b.clone(),
                    cause,
                })?;
            marked_b.extend(target_b.cells());
        }
    }

    doc_a.save().map_err(|cause| CompareError::Save {
        path: request.path_a.clone(),
        cause,
    })?;
    log::info!("saved {} ({} cells marked)", request.path_a.display(), marked_a.len());

    let saved_b = !marked_b.is_empty();
    if saved_b {
        doc_b.save().map_err(|cause| CompareError::Save {
            path: request.path_b.clone(),
            cause,
        })?;
        log::info!("saved {} ({} cells marked)", request.path_b.display(), marked_b.len());
    }

    Ok(MatchReport {
        meta: ReportMeta {
            sheet: options.sheet.clone(),
            missing_column: options.missing_column,
            mark_mode: options.mark_mode,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        request: request.clone(),
        summary: MatchSummary {
            rows_a: table_a.row_count(),
            rows_b: table_b.row_count(),
            matches: matches.len(),
            cells_marked_a: marked_a.len(),
            cells_marked_b: marked_b.len(),
            saved_a: true,
            saved_b,
        },
        matches,
    })
}

/// [`compare`] collapsed into the single status string a front end displays.
pub fn compare_status<O: DocumentOpener>(
    request: &ComparisonRequest,
    opener: &O,
    options: &CompareOptions,
) -> String {
    match compare(request, opener, options) {
        Ok(report) => report.status_line(),
        Err(e) => {
            log::warn!("comparison failed: {e}");
            e.to_string()
        }
    }
}
