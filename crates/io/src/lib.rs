// File I/O: XLSX documents that can be compared, marked, and saved in place.

pub mod xlsx;
mod xlsx_patch;
pub mod xlsx_styles;

pub use xlsx::{highlighted_cells, CellValue, XlsxDocument, XlsxOpener};
