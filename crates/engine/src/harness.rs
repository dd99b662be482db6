//! In-memory documents for exercising `compare` without a spreadsheet codec.
//!
//! `MemoryStore` plays the file system: it records every open and every save,
//! can be told to fail a save, and keeps the marks each saved document carried.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::address::CellRange;
use crate::document::{Annotatable, DocumentOpener, StyleId, TabularDocument};
use crate::style::HighlightStyle;

#[derive(Debug, Clone, Default)]
pub struct StoredFile {
    pub sheets: HashMap<String, Vec<Vec<String>>>,
    /// (sheet, row, col) → style, as of the last save.
    pub marks: BTreeMap<(String, usize, usize), StyleId>,
    pub styles: Vec<HighlightStyle>,
    pub saves: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    files: HashMap<PathBuf, StoredFile>,
    opened: Vec<PathBuf>,
    failing_saves: HashSet<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with a single sheet.
    pub fn insert(&self, path: &str, sheet: &str, rows: &[&[&str]]) {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect();
        let mut file = StoredFile::default();
        file.sheets.insert(sheet.to_string(), rows);
        self.state.borrow_mut().files.insert(PathBuf::from(path), file);
    }

    pub fn fail_saves_of(&self, path: &str) {
        self.state.borrow_mut().failing_saves.insert(PathBuf::from(path));
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.state.borrow().opened.clone()
    }

    pub fn file(&self, path: &str) -> StoredFile {
        self.state
            .borrow()
            .files
            .get(Path::new(path))
            .cloned()
            .unwrap_or_default()
    }

    /// Addresses marked in `path` as of its last save, e.g. `["B2", "B5"]`.
    pub fn marked_cells(&self, path: &str) -> Vec<String> {
        self.file(path)
            .marks
            .keys()
            .map(|(_, r, c)| CellRange::cell(*r, *c).to_string())
            .collect()
    }
}

pub struct MemoryDocument {
    path: PathBuf,
    file: StoredFile,
    store: MemoryStore,
}

impl DocumentOpener for MemoryStore {
    type Document = MemoryDocument;

    fn open(&self, path: &Path) -> Result<MemoryDocument, String> {
        let mut state = self.state.borrow_mut();
        state.opened.push(path.to_path_buf());
        let file = state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| "no such file".to_string())?;
        Ok(MemoryDocument {
            path: path.to_path_buf(),
            file,
            store: self.clone(),
        })
    }
}

impl Annotatable for MemoryDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self, sheet: &str) -> Result<TabularDocument, String> {
        let rows = self
            .file
            .sheets
            .get(sheet)
            .ok_or_else(|| format!("sheet {sheet} does not exist"))?;
        Ok(TabularDocument::new(&self.path, sheet, rows.clone()))
    }

    fn define_style(&mut self, style: &HighlightStyle) -> StyleId {
        if let Some(pos) = self.file.styles.iter().position(|s| s == style) {
            return StyleId(pos);
        }
        self.file.styles.push(style.clone());
        StyleId(self.file.styles.len() - 1)
    }

    fn apply_style(&mut self, sheet: &str, range: CellRange, style: StyleId) -> Result<(), String> {
        if style.0 >= self.file.styles.len() {
            return Err(format!("unknown style {}", style.0));
        }
        for (r, c) in range.cells() {
            self.file.marks.insert((sheet.to_string(), r, c), style);
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), String> {
        let mut state = self.store.state.borrow_mut();
        if state.failing_saves.contains(&self.path) {
            return Err("disk full".to_string());
        }
        self.file.saves += 1;
        state.files.insert(self.path.clone(), self.file.clone());
        Ok(())
    }
}
