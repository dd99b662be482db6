//! XLSX documents: load every sheet, expose one as a table, mark cells, and
//! save the marks back into the same file.
//!
//! Saving patches the package in place (see `xlsx_patch`). Nothing
//! but cell formats changes; a document with no marks is not written at all.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};

use colmatch_engine::address::{cell_address, CellRange};
use colmatch_engine::document::{Annotatable, DocumentOpener, StyleId, TabularDocument};
use colmatch_engine::style::{HighlightStyle, Rgb};

use crate::xlsx_patch::{self, SheetMarks};
use crate::xlsx_styles;

/// A typed cell value as read from the workbook.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel error literal, e.g. `#DIV/0!`
    Error(String),
}

impl CellValue {
    /// The text a comparison sees. Integer-valued numbers drop the decimals;
    /// dates stay as their serial number.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.clone(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[derive(Debug, Default)]
struct SheetData {
    name: String,
    cells: BTreeMap<(u32, u16), CellValue>,
    merged_regions: Vec<CellRange>,
    marks: BTreeMap<(u32, u16), StyleId>,
}

impl SheetData {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Rows as text, absolute from sheet row 1. Gaps become empty cells.
    fn rows(&self) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = Vec::new();
        for (&(row, col), value) in &self.cells {
            let (row, col) = (row as usize, col as usize);
            if rows.len() <= row {
                rows.resize_with(row + 1, Vec::new);
            }
            let cells = &mut rows[row];
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value.to_text();
        }
        rows
    }

    fn is_merge_hidden(&self, row: u32, col: u16) -> bool {
        let (row, col) = (row as usize, col as usize);
        self.merged_regions.iter().any(|m| {
            row >= m.first_row
                && row <= m.last_row
                && col >= m.first_col
                && col <= m.last_col
                && (row, col) != (m.first_row, m.first_col)
        })
    }
}

/// Opens `.xlsx` files for comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxOpener;

impl DocumentOpener for XlsxOpener {
    type Document = XlsxDocument;

    fn open(&self, path: &Path) -> Result<XlsxDocument, String> {
        XlsxDocument::open(path)
    }
}

/// An open workbook plus the marks applied since it was opened.
#[derive(Debug)]
pub struct XlsxDocument {
    path: PathBuf,
    sheets: Vec<SheetData>,
    highlights: Vec<HighlightStyle>,
}

fn open_xlsx(path: &Path) -> Result<Xlsx<BufReader<File>>, String> {
    open_workbook(path).map_err(|e: XlsxError| e.to_string())
}

impl XlsxDocument {
    pub fn open(path: &Path) -> Result<Self, String> {
        let start_time = Instant::now();

        let mut workbook = open_xlsx(path)?;
        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            let mut sheet = SheetData::new(name);

            let range = workbook
                .worksheet_range(name)
                .map_err(|e| format!("failed to read sheet '{}': {}", name, e))?;

            // Range start offset (data may not begin at A1)
            let (start_row, start_col) = range.start().unwrap_or((0, 0));
            for (row_idx, row) in range.rows().enumerate() {
                for (col_idx, data) in row.iter().enumerate() {
                    let Some(value) = cell_value(data) else {
                        continue;
                    };
                    let Some(pos) = position(start_row as usize + row_idx, start_col as usize + col_idx) else {
                        log::warn!("sheet '{}': cell beyond the XLSX grid dropped", name);
                        continue;
                    };
                    sheet.cells.insert(pos, value);
                }
            }

            sheets.push(sheet);
        }

        match xlsx_styles::parse_xlsx_formatting(path, &sheet_names) {
            Ok(formatting) => {
                for (sheet, sheet_formatting) in sheets.iter_mut().zip(formatting.sheets) {
                    sheet.merged_regions = sheet_formatting.merged_regions;
                }
            }
            Err(e) => log::warn!("{}: merged cells not read: {}", path.display(), e),
        }

        log::debug!(
            "opened {} ({} sheets, {} cells) in {} ms",
            path.display(),
            sheets.len(),
            sheets.iter().map(|s| s.cells.len()).sum::<usize>(),
            start_time.elapsed().as_millis()
        );

        Ok(Self {
            path: path.to_path_buf(),
            sheets,
            highlights: Vec::new(),
        })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of cells marked so far across all sheets.
    pub fn marked_count(&self) -> usize {
        self.sheets.iter().map(|s| s.marks.len()).sum()
    }

    fn sheet(&self, name: &str) -> Result<&SheetData, String> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| format!("sheet '{}' not found", name))
    }
}

impl Annotatable for XlsxDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self, sheet: &str) -> Result<TabularDocument, String> {
        let data = self.sheet(sheet)?;
        Ok(TabularDocument::new(&self.path, sheet, data.rows()))
    }

    fn define_style(&mut self, style: &HighlightStyle) -> StyleId {
        if let Some(pos) = self.highlights.iter().position(|h| h == style) {
            return StyleId(pos);
        }
        self.highlights.push(style.clone());
        StyleId(self.highlights.len() - 1)
    }

    fn apply_style(&mut self, sheet: &str, range: CellRange, style: StyleId) -> Result<(), String> {
        if style.0 >= self.highlights.len() {
            return Err(format!("unknown style {}", style.0));
        }
        let data = self
            .sheets
            .iter_mut()
            .find(|s| s.name == sheet)
            .ok_or_else(|| format!("sheet '{}' not found", sheet))?;
        for (row, col) in range.cells() {
            let pos = position(row, col)
                .ok_or_else(|| format!("cell {} is outside the XLSX grid", cell_address(row, col)))?;
            data.marks.insert(pos, style);
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), String> {
        if self.marked_count() == 0 {
            log::debug!("{}: nothing marked, file left untouched", self.path.display());
            return Ok(());
        }
        let start_time = Instant::now();

        let mut marks = Vec::new();
        for sheet in self.sheets.iter().filter(|s| !s.marks.is_empty()) {
            for &(row, col) in sheet.marks.keys() {
                if sheet.is_merge_hidden(row, col) {
                    log::debug!(
                        "{}!{} lies under a merged cell; its mark will not show",
                        sheet.name,
                        cell_address(row as usize, col as usize)
                    );
                }
            }
            marks.push(SheetMarks {
                sheet: &sheet.name,
                cells: &sheet.marks,
            });
        }

        xlsx_patch::mark_package(&self.path, &marks, &self.highlights)?;

        log::debug!(
            "saved {} ({} marked cells) in {} ms",
            self.path.display(),
            self.marked_count(),
            start_time.elapsed().as_millis()
        );
        Ok(())
    }
}

/// Addresses of cells in `sheet` whose solid fill is `fill`, row-major.
pub fn highlighted_cells(path: &Path, sheet: &str, fill: Rgb) -> Result<Vec<String>, String> {
    let workbook = open_xlsx(path)?;
    if !workbook.sheet_names().iter().any(|n| n == sheet) {
        return Err(format!("sheet '{}' not found", sheet));
    }

    let formatting = xlsx_styles::parse_xlsx_formatting(path, &[sheet.to_string()])?;
    let mut cells: Vec<(u32, u16)> = formatting
        .sheets
        .into_iter()
        .next()
        .unwrap_or_default()
        .cell_styles
        .into_iter()
        .filter(|&(_, _, id)| formatting.styles.get(id).and_then(|s| s.fill) == Some(fill))
        .map(|(row, col, _)| (row, col))
        .collect();
    cells.sort_unstable();
    cells.dedup();

    Ok(cells
        .into_iter()
        .map(|(row, col)| cell_address(row as usize, col as usize))
        .collect())
}

fn position(row: usize, col: usize) -> Option<(u32, u16)> {
    Some((u32::try_from(row).ok()?, u16::try_from(col).ok()?))
}

fn cell_value(data: &Data) -> Option<CellValue> {
    match data {
        Data::Empty => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Float(n) => Some(CellValue::Number(*n)),
        Data::Int(n) => Some(CellValue::Number(*n as f64)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::Error(e) => Some(CellValue::Error(e.to_string())),
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

    fn write_fixture(path: &Path) {
        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet().set_name("Sheet1").unwrap();
        sheet.write_string(0, 0, "name").unwrap();
        sheet.write_number(1, 0, 42.0).unwrap();
        sheet.write_number(2, 0, 2.5).unwrap();
        sheet.write_boolean(3, 0, true).unwrap();
        sheet.write_string(5, 2, "far").unwrap();
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1e16), "10000000000000000");
    }

    #[test]
    fn test_cell_value_text() {
        assert_eq!(CellValue::Bool(false).to_text(), "FALSE");
        assert_eq!(CellValue::Error("#N/A".into()).to_text(), "#N/A");
        assert_eq!(cell_value(&Data::Int(7)), Some(CellValue::Number(7.0)));
        assert_eq!(cell_value(&Data::Empty), None);
    }

    #[test]
    fn test_read_table_rows_are_absolute_and_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");
        write_fixture(&path);

        let doc = XlsxDocument::open(&path).unwrap();
        let table = doc.read_table("Sheet1").unwrap();
        assert_eq!(table.row_count(), 6);
        assert_eq!(table.cell(0, 0), Some("name"));
        assert_eq!(table.cell(1, 0), Some("42"));
        assert_eq!(table.cell(2, 0), Some("2.5"));
        assert_eq!(table.cell(3, 0), Some("TRUE"));
        assert_eq!(table.width(4), 0);
        assert_eq!(table.cell(5, 2), Some("far"));
        assert_eq!(table.cell(5, 1), Some(""));
    }

    #[test]
    fn test_missing_sheet_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");
        write_fixture(&path);

        let doc = XlsxDocument::open(&path).unwrap();
        let err = doc.read_table("Nope").unwrap_err();
        assert!(err.contains("Nope"), "{err}");
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(XlsxDocument::open(&dir.path().join("absent.xlsx")).is_err());
    }

    #[test]
    fn test_define_style_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");
        write_fixture(&path);

        let mut doc = XlsxDocument::open(&path).unwrap();
        let a = doc.define_style(&HighlightStyle::default());
        let b = doc.define_style(&HighlightStyle::default());
        let c = doc.define_style(&HighlightStyle::default().with_fill(Rgb(0x00FF00)));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(doc.apply_style("Sheet1", CellRange::cell(0, 0), StyleId(9)).is_err());
        assert!(doc.apply_style("Other", CellRange::cell(0, 0), a).is_err());
    }

    #[test]
    fn test_mark_save_and_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");
        write_fixture(&path);

        let mut doc = XlsxDocument::open(&path).unwrap();
        let style = doc.define_style(&HighlightStyle::default());
        doc.apply_style("Sheet1", CellRange::cell(1, 0), style).unwrap();
        doc.apply_style("Sheet1", CellRange::row_span(3, 0, 2), style).unwrap();
        assert_eq!(doc.marked_count(), 4);
        doc.save().unwrap();

        let marked = highlighted_cells(&path, "Sheet1", Rgb::MARKER_YELLOW).unwrap();
        assert_eq!(marked, vec!["A2", "A4", "B4", "C4"]);

        // Values survive the patch.
        let reopened = XlsxDocument::open(&path).unwrap();
        assert_eq!(
            reopened.read_table("Sheet1").unwrap(),
            doc.read_table("Sheet1").unwrap()
        );
    }

    #[test]
    fn test_highlighted_cells_unknown_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");
        write_fixture(&path);
        assert!(highlighted_cells(&path, "Nope", Rgb::MARKER_YELLOW).is_err());
    }

    #[test]
    fn test_save_without_marks_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");
        write_fixture(&path);
        let before = std::fs::read(&path).unwrap();

        let mut doc = XlsxDocument::open(&path).unwrap();
        doc.define_style(&HighlightStyle::default());
        doc.save().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_resave_adds_no_styles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");
        write_fixture(&path);

        let mut doc = XlsxDocument::open(&path).unwrap();
        let style = doc.define_style(&HighlightStyle::default());
        doc.apply_style("Sheet1", CellRange::cell(0, 0), style).unwrap();
        doc.save().unwrap();
        let first = xlsx_styles::parse_xlsx_formatting(&path, &[]).unwrap().styles.len();

        let mut doc = XlsxDocument::open(&path).unwrap();
        let style = doc.define_style(&HighlightStyle::default());
        doc.apply_style("Sheet1", CellRange::cell(0, 0), style).unwrap();
        doc.save().unwrap();
        let second = xlsx_styles::parse_xlsx_formatting(&path, &[]).unwrap().styles.len();

        assert_eq!(first, second);
        assert_eq!(highlighted_cells(&path, "Sheet1", Rgb::MARKER_YELLOW).unwrap(), vec!["A1"]);
    }

    #[test]
    fn test_mark_under_merge_still_lands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.xlsx");
        let mut workbook = XlsxWorkbook::new();
        let sheet = workbook.add_worksheet().set_name("Sheet1").unwrap();
        sheet.merge_range(0, 3, 1, 4, "merged", &Format::new()).unwrap();
        workbook.save(&path).unwrap();

        let mut doc = XlsxDocument::open(&path).unwrap();
        assert!(doc.sheet("Sheet1").unwrap().is_merge_hidden(0, 4));
        let style = doc.define_style(&HighlightStyle::default());
        doc.apply_style("Sheet1", CellRange::cell(0, 4), style).unwrap();
        doc.save().unwrap();

        let marked = highlighted_cells(&path, "Sheet1", Rgb::MARKER_YELLOW).unwrap();
        assert_eq!(marked, vec!["E1"]);
    }

    #[test]
    fn test_save_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");
        write_fixture(&path);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();
        }

        let mut doc = XlsxDocument::open(&path).unwrap();
        let style = doc.define_style(&HighlightStyle::default());
        doc.apply_style("Sheet1", CellRange::cell(1, 0), style).unwrap();
        doc.save().unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("t.xlsx")]);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o640);
        }
    }

    #[test]
    fn test_merge_hidden() {
        let mut sheet = SheetData::new("S");
        sheet.merged_regions.push(CellRange::parse("B2:C3").unwrap());
        assert!(!sheet.is_merge_hidden(1, 1));
        assert!(sheet.is_merge_hidden(1, 2));
        assert!(sheet.is_merge_hidden(2, 1));
        assert!(!sheet.is_merge_hidden(0, 0));
    }
}
