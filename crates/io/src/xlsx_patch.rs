//! Marks cells inside an existing XLSX package.
//!
//! Only `xl/styles.xml` and the worksheets that carry marks are rewritten.
//! Every other part is raw-copied, compressed bytes included. The new package
//! is staged next to the original and renamed over it once complete.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use colmatch_engine::address::{cell_address, parse_cell_ref, CellRange};
use colmatch_engine::document::StyleId;
use colmatch_engine::style::{HighlightStyle, HorizontalAlign, Rgb, VerticalAlign};

use crate::xlsx_styles::{self, Border, BorderLine, ParsedBorder, XfEntry};

const STYLES_PART: &str = "xl/styles.xml";

/// Marks for one sheet, keyed by 0-based (row, col).
pub(crate) struct SheetMarks<'a> {
    pub sheet: &'a str,
    pub cells: &'a BTreeMap<(u32, u16), StyleId>,
}

/// Apply `marks` to the package at `path`, replacing it in place.
pub(crate) fn mark_package(path: &Path, marks: &[SheetMarks<'_>], highlights: &[HighlightStyle]) -> Result<(), String> {
    let file = File::open(path).map_err(|e| format!("failed to reopen {}: {}", path.display(), e))?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(zip_err)?;

    let styles_xml = xlsx_styles::read_zip_file(&mut archive, STYLES_PART)?;
    let workbook_xml = xlsx_styles::read_zip_file(&mut archive, "xl/workbook.xml")?;
    let rels_xml = xlsx_styles::read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels")?;
    let names: Vec<String> = marks.iter().map(|m| m.sheet.to_string()).collect();
    let parts = xlsx_styles::resolve_worksheet_paths(&workbook_xml, &rels_xml, &names);

    let mut styles = StylePlan::new(&styles_xml);
    let mut replaced: HashMap<String, Vec<u8>> = HashMap::new();

    for (marks, part) in marks.iter().zip(parts) {
        let part = part.ok_or_else(|| format!("sheet '{}' has no worksheet part", marks.sheet))?;
        let xml = xlsx_styles::read_zip_file(&mut archive, &part)?;
        let existing: HashMap<(u32, u16), usize> = xlsx_styles::parse_sheet_formatting(&xml)
            .cell_styles
            .into_iter()
            .map(|(row, col, id)| ((row, col), id))
            .collect();

        let mut targets = BTreeMap::new();
        for (&pos, &style) in marks.cells {
            let highlight = highlights
                .get(style.0)
                .ok_or_else(|| format!("unknown style {}", style.0))?;
            let base = existing.get(&pos).copied().unwrap_or(0);
            targets.insert(pos, styles.xf_for(base, style, highlight));
        }

        let patched = patch_worksheet_xml(&xml, &targets).map_err(|e| format!("{}: {}", part, e))?;
        replaced.insert(part, patched);
    }

    if let Some(patched) = styles.write()? {
        replaced.insert(STYLES_PART.to_string(), patched);
    }

    let staged = stage_package(path, &mut archive, &replaced)?;
    drop(archive);
    staged
        .persist(path)
        .map_err(|e| format!("failed to replace {}: {}", path.display(), e.error))?;
    Ok(())
}

/// Copy of the package with `replaced` parts swapped in, written to a temp
/// file in the same directory so the final rename never crosses filesystems.
fn stage_package<R: Read + Seek>(
    path: &Path,
    archive: &mut ZipArchive<R>,
    replaced: &HashMap<String, Vec<u8>>,
) -> Result<NamedTempFile, String> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir)
        .map_err(|e| format!("failed to stage save in {}: {}", dir.display(), e))?;

    let mut zip = ZipWriter::new(staged);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(zip_err)?;
        match replaced.get(entry.name()) {
            Some(bytes) => {
                let name = entry.name().to_string();
                zip.start_file(name, options).map_err(zip_err)?;
                zip.write_all(bytes).map_err(|e| e.to_string())?;
            }
            None => zip.raw_copy_file(entry).map_err(zip_err)?,
        }
    }

    let staged = zip.finish().map_err(zip_err)?;
    if let Ok(meta) = std::fs::metadata(path) {
        if let Err(e) = staged.as_file().set_permissions(meta.permissions()) {
            log::warn!("{}: permissions not carried over: {}", path.display(), e);
        }
    }
    Ok(staged)
}

fn zip_err(e: ZipError) -> String {
    e.to_string()
}

// =============================================================================
// styles.xml
// =============================================================================

/// Fills, borders and cell formats the marks need, reusing what styles.xml
/// already has so that marking twice adds nothing the second time.
struct StylePlan<'a> {
    xml: &'a str,
    fills: Vec<Option<Rgb>>,
    borders: Vec<ParsedBorder>,
    xfs: Vec<XfEntry>,
    added_fills: Vec<Rgb>,
    added_borders: Vec<Rgb>,
    /// (index of the cellXfs entry it was derived from, entry)
    added_xfs: Vec<(usize, XfEntry)>,
    assigned: HashMap<(usize, StyleId), usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Fills,
    Borders,
    CellXfs,
}

impl Section {
    fn of(name: &[u8]) -> Option<Self> {
        match local_name(name) {
            b"fills" => Some(Section::Fills),
            b"borders" => Some(Section::Borders),
            b"cellXfs" => Some(Section::CellXfs),
            _ => None,
        }
    }
}

impl<'a> StylePlan<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            xml,
            fills: xlsx_styles::parse_fills(xml),
            borders: xlsx_styles::parse_borders(xml),
            xfs: xlsx_styles::parse_cell_xfs(xml),
            added_fills: Vec::new(),
            added_borders: Vec::new(),
            added_xfs: Vec::new(),
            assigned: HashMap::new(),
        }
    }

    fn fill_id(&mut self, fill: Rgb) -> usize {
        if let Some(id) = self.fills.iter().position(|f| *f == Some(fill)) {
            return id;
        }
        if let Some(i) = self.added_fills.iter().position(|f| *f == fill) {
            return self.fills.len() + i;
        }
        self.added_fills.push(fill);
        self.fills.len() + self.added_fills.len() - 1
    }

    fn border_id(&mut self, color: Rgb) -> usize {
        let side = Border {
            line: BorderLine::Thin,
            color: Some(color),
        };
        let wanted = ParsedBorder {
            top: side,
            right: side,
            bottom: side,
            left: side,
        };
        if let Some(id) = self.borders.iter().position(|b| *b == wanted) {
            return id;
        }
        if let Some(i) = self.added_borders.iter().position(|c| *c == color) {
            return self.borders.len() + i;
        }
        self.added_borders.push(color);
        self.borders.len() + self.added_borders.len() - 1
    }

    /// cellXfs index for a cell currently formatted with `base` once the
    /// highlight is laid over it: font and number format from `base`,
    /// border, fill and alignment from the highlight.
    fn xf_for(&mut self, base: usize, style: StyleId, highlight: &HighlightStyle) -> usize {
        if let Some(&id) = self.assigned.get(&(base, style)) {
            return id;
        }

        let template = self.xfs.get(base).cloned().unwrap_or_default();
        let wanted = XfEntry {
            num_fmt_id: Some(template.num_fmt_id.unwrap_or(0)),
            font_id: Some(template.font_id.unwrap_or(0)),
            fill_id: Some(self.fill_id(highlight.fill)),
            border_id: Some(self.border_id(highlight.border_color)),
            horizontal: Some(highlight.horizontal),
            vertical: Some(highlight.vertical),
            wrap_text: highlight.wrap_text,
        };

        let id = if let Some(id) = self.xfs.iter().position(|xf| xf.same_look(&wanted)) {
            id
        } else if let Some(i) = self.added_xfs.iter().position(|(_, xf)| xf.same_look(&wanted)) {
            self.xfs.len() + i
        } else {
            self.added_xfs.push((base, wanted));
            self.xfs.len() + self.added_xfs.len() - 1
        };
        self.assigned.insert((base, style), id);
        id
    }

    fn total(&self, section: Section) -> usize {
        match section {
            Section::Fills => self.fills.len() + self.added_fills.len(),
            Section::Borders => self.borders.len() + self.added_borders.len(),
            Section::CellXfs => self.xfs.len() + self.added_xfs.len(),
        }
    }

    fn adds_to(&self, section: Section) -> bool {
        match section {
            Section::Fills => !self.added_fills.is_empty(),
            Section::Borders => !self.added_borders.is_empty(),
            Section::CellXfs => !self.added_xfs.is_empty(),
        }
    }

    /// styles.xml with the additions appended and counts updated. None when
    /// nothing had to be added.
    fn write(&self) -> Result<Option<Vec<u8>>, String> {
        let sections = [Section::Fills, Section::Borders, Section::CellXfs];
        if !sections.iter().any(|&s| self.adds_to(s)) {
            return Ok(None);
        }

        let mut reader = Reader::from_str(self.xml);
        reader.config_mut().trim_text(false);
        let mut writer = Writer::new(Vec::new());
        let mut buf = Vec::new();

        let mut current: Option<(Section, Option<String>)> = None;
        let mut seen: Vec<Section> = Vec::new();
        // Raw events of each cellXfs entry, so derived entries keep whatever
        // the parser does not model (xfId, quotePrefix, protection, ...).
        let mut xf_events: Vec<Vec<Event<'static>>> = Vec::new();
        let mut capture: Option<(Vec<Event<'static>>, usize)> = None;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| e.to_string())?;

            if let Some((events, depth)) = capture.as_mut() {
                match &event {
                    Event::Start(_) => *depth += 1,
                    Event::End(_) => *depth -= 1,
                    _ => {}
                }
                events.push(event.clone().into_owned());
                if *depth == 0 {
                    if let Some((events, _)) = capture.take() {
                        xf_events.push(events);
                    }
                }
                emit(&mut writer, event)?;
                buf.clear();
                continue;
            }

            match event {
                Event::Eof => break,
                Event::Start(ref e) if current.is_none() && Section::of(e.name().as_ref()).is_some() => {
                    if let Some(section) = Section::of(e.name().as_ref()) {
                        seen.push(section);
                        current = Some((section, element_prefix(e.name().as_ref())));
                        emit(&mut writer, Event::Start(self.counted(e, section)?))?;
                    }
                }
                Event::Empty(ref e) if current.is_none() && Section::of(e.name().as_ref()).is_some() => {
                    if let Some(section) = Section::of(e.name().as_ref()) {
                        seen.push(section);
                        let prefix = element_prefix(e.name().as_ref());
                        let start = self.counted(e, section)?;
                        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                        emit(&mut writer, Event::Start(start))?;
                        self.append(&mut writer, section, prefix.as_deref(), &xf_events)?;
                        emit(&mut writer, Event::End(BytesEnd::new(name)))?;
                    }
                }
                Event::End(ref e)
                    if current
                        .as_ref()
                        .is_some_and(|(s, _)| Section::of(e.name().as_ref()) == Some(*s)) =>
                {
                    if let Some((section, prefix)) = current.take() {
                        self.append(&mut writer, section, prefix.as_deref(), &xf_events)?;
                    }
                    emit(&mut writer, Event::End(e.to_owned()))?;
                }
                Event::Start(ref e)
                    if matches!(current, Some((Section::CellXfs, _))) && local_name(e.name().as_ref()) == b"xf" =>
                {
                    capture = Some((vec![Event::Start(e.to_owned())], 1));
                    emit(&mut writer, Event::Start(e.to_owned()))?;
                }
                Event::Empty(ref e)
                    if matches!(current, Some((Section::CellXfs, _))) && local_name(e.name().as_ref()) == b"xf" =>
                {
                    xf_events.push(vec![Event::Empty(e.to_owned())]);
                    emit(&mut writer, Event::Empty(e.to_owned()))?;
                }
                ev => emit(&mut writer, ev)?,
            }
            buf.clear();
        }

        if let Some(missing) = sections.iter().find(|&&s| self.adds_to(s) && !seen.contains(&s)) {
            return Err(format!("styles part has no {:?} section", missing));
        }
        Ok(Some(writer.into_inner()))
    }

    fn counted(&self, e: &BytesStart<'_>, section: Section) -> Result<BytesStart<'static>, String> {
        rewrite_attrs(e, &[("count", self.total(section).to_string())], &[])
    }

    fn append<W: Write>(
        &self,
        writer: &mut Writer<W>,
        section: Section,
        prefix: Option<&str>,
        xf_events: &[Vec<Event<'static>>],
    ) -> Result<(), String> {
        match section {
            Section::Fills => self
                .added_fills
                .iter()
                .try_for_each(|&fill| write_fill(writer, prefix, fill)),
            Section::Borders => self
                .added_borders
                .iter()
                .try_for_each(|&color| write_border(writer, prefix, color)),
            Section::CellXfs => self.added_xfs.iter().try_for_each(|(base, entry)| {
                write_xf(writer, prefix, xf_events.get(*base).map(Vec::as_slice), entry)
            }),
        }
    }
}

fn argb(color: Rgb) -> String {
    format!("FF{:06X}", color.0)
}

fn write_fill<W: Write>(writer: &mut Writer<W>, prefix: Option<&str>, fill: Rgb) -> Result<(), String> {
    let fill_tag = tag(prefix, "fill");
    let pattern_tag = tag(prefix, "patternFill");

    emit(writer, Event::Start(BytesStart::new(fill_tag.as_str())))?;
    let mut pattern = BytesStart::new(pattern_tag.as_str());
    pattern.push_attribute(("patternType", "solid"));
    emit(writer, Event::Start(pattern))?;

    let mut fg = BytesStart::new(tag(prefix, "fgColor"));
    fg.push_attribute(("rgb", argb(fill).as_str()));
    emit(writer, Event::Empty(fg))?;
    let mut bg = BytesStart::new(tag(prefix, "bgColor"));
    bg.push_attribute(("indexed", "64"));
    emit(writer, Event::Empty(bg))?;

    emit(writer, Event::End(BytesEnd::new(pattern_tag.as_str())))?;
    emit(writer, Event::End(BytesEnd::new(fill_tag.as_str())))
}

fn write_border<W: Write>(writer: &mut Writer<W>, prefix: Option<&str>, color: Rgb) -> Result<(), String> {
    let border_tag = tag(prefix, "border");
    emit(writer, Event::Start(BytesStart::new(border_tag.as_str())))?;

    for side in ["left", "right", "top", "bottom"] {
        let side_tag = tag(prefix, side);
        let mut start = BytesStart::new(side_tag.as_str());
        start.push_attribute(("style", "thin"));
        emit(writer, Event::Start(start))?;
        let mut color_el = BytesStart::new(tag(prefix, "color"));
        color_el.push_attribute(("rgb", argb(color).as_str()));
        emit(writer, Event::Empty(color_el))?;
        emit(writer, Event::End(BytesEnd::new(side_tag.as_str())))?;
    }
    emit(writer, Event::Empty(BytesStart::new(tag(prefix, "diagonal"))))?;

    emit(writer, Event::End(BytesEnd::new(border_tag.as_str())))
}

/// A cellXfs entry copied from `base` with fill, border and alignment swapped.
fn write_xf<W: Write>(
    writer: &mut Writer<W>,
    prefix: Option<&str>,
    base: Option<&[Event<'static>]>,
    entry: &XfEntry,
) -> Result<(), String> {
    let set = [
        ("fillId", entry.fill_id.unwrap_or(0).to_string()),
        ("borderId", entry.border_id.unwrap_or(0).to_string()),
        ("applyFill", "1".to_string()),
        ("applyBorder", "1".to_string()),
        ("applyAlignment", "1".to_string()),
    ];

    let (start, children) = match base {
        Some([Event::Start(e), children @ .., Event::End(_)]) => (rewrite_attrs(e, &set, &[])?, children),
        Some([Event::Empty(e)]) => (rewrite_attrs(e, &set, &[])?, &[][..]),
        _ => {
            let mut start = BytesStart::new(tag(prefix, "xf"));
            start.push_attribute(("numFmtId", entry.num_fmt_id.unwrap_or(0).to_string().as_str()));
            start.push_attribute(("fontId", entry.font_id.unwrap_or(0).to_string().as_str()));
            start.push_attribute(("xfId", "0"));
            (rewrite_attrs(&start, &set, &[])?, &[][..])
        }
    };
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    emit(writer, Event::Start(start))?;

    let mut alignment = BytesStart::new(tag(prefix, "alignment"));
    if let Some(horizontal) = entry.horizontal {
        alignment.push_attribute(("horizontal", horizontal_name(horizontal)));
    }
    if let Some(vertical) = entry.vertical {
        alignment.push_attribute(("vertical", vertical_name(vertical)));
    }
    if entry.wrap_text {
        alignment.push_attribute(("wrapText", "1"));
    }
    emit(writer, Event::Empty(alignment))?;

    // Everything but the old alignment, which must stay the first child.
    let mut skipping = 0usize;
    for event in children {
        match event {
            Event::Start(e) if skipping == 0 && local_name(e.name().as_ref()) == b"alignment" => skipping = 1,
            Event::Start(_) if skipping > 0 => skipping += 1,
            Event::End(_) if skipping > 0 => skipping -= 1,
            _ if skipping > 0 => {}
            Event::Empty(e) if local_name(e.name().as_ref()) == b"alignment" => {}
            Event::Text(_) => {}
            other => emit(writer, other.clone())?,
        }
    }

    emit(writer, Event::End(BytesEnd::new(name)))
}

fn horizontal_name(align: HorizontalAlign) -> &'static str {
    match align {
        HorizontalAlign::Left => "left",
        HorizontalAlign::Center => "center",
        HorizontalAlign::Right => "right",
    }
}

fn vertical_name(align: VerticalAlign) -> &'static str {
    match align {
        VerticalAlign::Top => "top",
        VerticalAlign::Center => "center",
        VerticalAlign::Bottom => "bottom",
    }
}

// =============================================================================
// Worksheet XML
// =============================================================================

struct RowPatch {
    number: u32,
    /// (col, xf) sorted by column
    cells: Vec<(u16, usize)>,
    next: usize,
    last_col: Option<u16>,
}

/// Set `s` on each target cell, inserting empty styled cells (and rows) where
/// the sheet has none. Targets are 0-based (row, col) → cellXfs index.
pub(crate) fn patch_worksheet_xml(xml: &str, targets: &BTreeMap<(u32, u16), usize>) -> Result<Vec<u8>, String> {
    let mut pending: BTreeMap<u32, Vec<(u16, usize)>> = BTreeMap::new();
    for (&(row, col), &xf) in targets {
        pending.entry(row + 1).or_default().push((col, xf));
    }
    let bounds = targets_bounds(targets);

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();

    let mut saw_sheet_data = false;
    let mut in_sheet_data = false;
    let mut prefix: Option<String> = None;
    let mut row: Option<RowPatch> = None;
    let mut last_row = 0u32;
    let mut in_cell = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| e.to_string())?;
        match event {
            Event::Eof => break,

            Event::Start(ref e) if !saw_sheet_data && local_name(e.name().as_ref()) == b"dimension" => {
                emit(&mut writer, Event::Start(widen_dimension(e, bounds)?))?;
            }
            Event::Empty(ref e) if !saw_sheet_data && local_name(e.name().as_ref()) == b"dimension" => {
                emit(&mut writer, Event::Empty(widen_dimension(e, bounds)?))?;
            }

            Event::Start(ref e) if local_name(e.name().as_ref()) == b"sheetData" => {
                saw_sheet_data = true;
                in_sheet_data = true;
                prefix = element_prefix(e.name().as_ref());
                emit(&mut writer, Event::Start(e.to_owned()))?;
            }
            Event::Empty(ref e) if local_name(e.name().as_ref()) == b"sheetData" => {
                saw_sheet_data = true;
                prefix = element_prefix(e.name().as_ref());
                if pending.is_empty() {
                    emit(&mut writer, Event::Empty(e.to_owned()))?;
                } else {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    emit(&mut writer, Event::Start(e.to_owned()))?;
                    write_rows_before(&mut writer, &mut pending, u32::MAX, prefix.as_deref())?;
                    emit(&mut writer, Event::End(BytesEnd::new(name)))?;
                }
            }
            Event::End(ref e) if in_sheet_data && local_name(e.name().as_ref()) == b"sheetData" => {
                write_rows_before(&mut writer, &mut pending, u32::MAX, prefix.as_deref())?;
                in_sheet_data = false;
                emit(&mut writer, Event::End(e.to_owned()))?;
            }

            Event::Start(ref e) if in_sheet_data && local_name(e.name().as_ref()) == b"row" => {
                let number = row_number(e, last_row);
                last_row = number;
                in_cell = false;
                write_rows_before(&mut writer, &mut pending, number, prefix.as_deref())?;
                match pending.remove(&number) {
                    Some(cells) => {
                        emit(&mut writer, Event::Start(row_start(e, &cells)?))?;
                        row = Some(RowPatch {
                            number,
                            cells,
                            next: 0,
                            last_col: None,
                        });
                    }
                    None => emit(&mut writer, Event::Start(e.to_owned()))?,
                }
            }
            Event::Empty(ref e) if in_sheet_data && local_name(e.name().as_ref()) == b"row" => {
                let number = row_number(e, last_row);
                last_row = number;
                write_rows_before(&mut writer, &mut pending, number, prefix.as_deref())?;
                match pending.remove(&number) {
                    Some(cells) => {
                        let start = row_start(e, &cells)?;
                        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                        emit(&mut writer, Event::Start(start))?;
                        for &(col, xf) in &cells {
                            write_cell(&mut writer, prefix.as_deref(), number, col, xf)?;
                        }
                        emit(&mut writer, Event::End(BytesEnd::new(name)))?;
                    }
                    None => emit(&mut writer, Event::Empty(e.to_owned()))?,
                }
            }
            Event::End(ref e) if in_sheet_data && local_name(e.name().as_ref()) == b"row" => {
                if let Some(mut state) = row.take() {
                    flush_row(&mut writer, &mut state, None, prefix.as_deref())?;
                }
                in_cell = false;
                emit(&mut writer, Event::End(e.to_owned()))?;
            }

            Event::Start(ref e) if row.is_some() && local_name(e.name().as_ref()) == b"c" => {
                if let Some(state) = row.as_mut() {
                    let start = patch_cell(&mut writer, state, e, prefix.as_deref())?;
                    emit(&mut writer, Event::Start(start))?;
                }
                in_cell = true;
            }
            Event::Empty(ref e) if row.is_some() && local_name(e.name().as_ref()) == b"c" => {
                if let Some(state) = row.as_mut() {
                    let start = patch_cell(&mut writer, state, e, prefix.as_deref())?;
                    emit(&mut writer, Event::Empty(start))?;
                }
            }
            Event::End(ref e) if in_cell && local_name(e.name().as_ref()) == b"c" => {
                in_cell = false;
                emit(&mut writer, Event::End(e.to_owned()))?;
            }
            // Cells go before anything else a row holds (extLst).
            Event::Start(ref e) if row.is_some() && !in_cell => {
                if let Some(state) = row.as_mut() {
                    flush_row(&mut writer, state, None, prefix.as_deref())?;
                }
                emit(&mut writer, Event::Start(e.to_owned()))?;
            }
            Event::Empty(ref e) if row.is_some() && !in_cell => {
                if let Some(state) = row.as_mut() {
                    flush_row(&mut writer, state, None, prefix.as_deref())?;
                }
                emit(&mut writer, Event::Empty(e.to_owned()))?;
            }

            ev => emit(&mut writer, ev)?,
        }
        buf.clear();
    }

    if !saw_sheet_data {
        return Err("worksheet has no sheetData".to_string());
    }
    Ok(writer.into_inner())
}

/// Inserts pending cells left of `e`, then returns `e` restyled when it is a
/// target itself.
fn patch_cell<W: Write>(
    writer: &mut Writer<W>,
    state: &mut RowPatch,
    e: &BytesStart<'_>,
    prefix: Option<&str>,
) -> Result<BytesStart<'static>, String> {
    let col = xlsx_styles::attr_string(e, b"r")
        .and_then(|r| parse_cell_ref(&r))
        .and_then(|(_, col)| u16::try_from(col).ok())
        .unwrap_or_else(|| state.last_col.map_or(0, |c| c.saturating_add(1)));
    state.last_col = Some(col);

    flush_row(writer, state, Some(col), prefix)?;
    match state.cells.get(state.next) {
        Some(&(target, xf)) if target == col => {
            state.next += 1;
            rewrite_attrs(e, &[("s", xf.to_string())], &[])
        }
        _ => Ok(e.to_owned()),
    }
}

/// Writes this row's pending cells left of `before` (all of them for None).
fn flush_row<W: Write>(
    writer: &mut Writer<W>,
    state: &mut RowPatch,
    before: Option<u16>,
    prefix: Option<&str>,
) -> Result<(), String> {
    while let Some(&(col, xf)) = state.cells.get(state.next) {
        if before.is_some_and(|before| col >= before) {
            break;
        }
        write_cell(writer, prefix, state.number, col, xf)?;
        state.next += 1;
    }
    Ok(())
}

/// Writes whole pending rows numbered below `before`.
fn write_rows_before<W: Write>(
    writer: &mut Writer<W>,
    pending: &mut BTreeMap<u32, Vec<(u16, usize)>>,
    before: u32,
    prefix: Option<&str>,
) -> Result<(), String> {
    while let Some(entry) = pending.first_entry() {
        if *entry.key() >= before {
            break;
        }
        let (number, cells) = entry.remove_entry();
        let row_tag = tag(prefix, "row");
        let mut start = BytesStart::new(row_tag.as_str());
        start.push_attribute(("r", number.to_string().as_str()));
        emit(writer, Event::Start(start))?;
        for &(col, xf) in &cells {
            write_cell(writer, prefix, number, col, xf)?;
        }
        emit(writer, Event::End(BytesEnd::new(row_tag.as_str())))?;
    }
    Ok(())
}

fn write_cell<W: Write>(writer: &mut Writer<W>, prefix: Option<&str>, row: u32, col: u16, xf: usize) -> Result<(), String> {
    let mut cell = BytesStart::new(tag(prefix, "c"));
    let reference = cell_address(row as usize - 1, col as usize);
    cell.push_attribute(("r", reference.as_str()));
    cell.push_attribute(("s", xf.to_string().as_str()));
    emit(writer, Event::Empty(cell))
}

fn row_number(e: &BytesStart<'_>, last_row: u32) -> u32 {
    xlsx_styles::attr_string(e, b"r")
        .and_then(|r| r.parse().ok())
        .unwrap_or(last_row + 1)
}

/// The row element, minus `spans` when the new cells fall outside it.
fn row_start(e: &BytesStart<'_>, cells: &[(u16, usize)]) -> Result<BytesStart<'static>, String> {
    let Some(spans) = xlsx_styles::attr_string(e, b"spans") else {
        return Ok(e.to_owned());
    };
    let inside = parse_spans(&spans).is_some_and(|(min, max)| {
        cells
            .iter()
            .all(|&(col, _)| (min..=max).contains(&(u32::from(col) + 1)))
    });
    if inside {
        Ok(e.to_owned())
    } else {
        rewrite_attrs(e, &[], &["spans"])
    }
}

/// "1:3" or "1:3 5:9" → (1, 9), 1-based columns.
fn parse_spans(spans: &str) -> Option<(u32, u32)> {
    let mut parts = spans.split_whitespace();
    let first = parts.next()?;
    let last = parts.last().unwrap_or(first);
    let min = first.split(':').next()?.parse().ok()?;
    let max = last.split(':').last()?.parse().ok()?;
    Some((min, max))
}

fn targets_bounds(targets: &BTreeMap<(u32, u16), usize>) -> Option<CellRange> {
    targets.keys().fold(None, |acc: Option<CellRange>, &(row, col)| {
        let (row, col) = (row as usize, col as usize);
        Some(match acc {
            None => CellRange::cell(row, col),
            Some(r) => CellRange {
                first_row: r.first_row.min(row),
                first_col: r.first_col.min(col),
                last_row: r.last_row.max(row),
                last_col: r.last_col.max(col),
            },
        })
    })
}

/// `<dimension ref>` grown to cover the targets.
fn widen_dimension(e: &BytesStart<'_>, bounds: Option<CellRange>) -> Result<BytesStart<'static>, String> {
    let current = xlsx_styles::attr_string(e, b"ref").and_then(|r| CellRange::parse(&r));
    let (Some(current), Some(bounds)) = (current, bounds) else {
        return Ok(e.to_owned());
    };
    let widened = CellRange {
        first_row: current.first_row.min(bounds.first_row),
        first_col: current.first_col.min(bounds.first_col),
        last_row: current.last_row.max(bounds.last_row),
        last_col: current.last_col.max(bounds.last_col),
    };
    if widened == current {
        return Ok(e.to_owned());
    }
    rewrite_attrs(e, &[("ref", widened.to_string())], &[])
}

// =============================================================================
// Helpers
// =============================================================================

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| e.to_string())
}

/// Copy of `e` with `set` attributes replaced in place (or appended) and
/// `remove` attributes dropped. Untouched attributes keep their raw bytes.
fn rewrite_attrs(e: &BytesStart<'_>, set: &[(&str, String)], remove: &[&str]) -> Result<BytesStart<'static>, String> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    let mut placed = vec![false; set.len()];

    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = attr.key.as_ref();
        if let Some(i) = set.iter().position(|(k, _)| k.as_bytes() == key) {
            out.push_attribute((set[i].0, set[i].1.as_str()));
            placed[i] = true;
        } else if !remove.iter().any(|k| k.as_bytes() == key) {
            out.push_attribute(attr);
        }
    }
    for ((key, value), done) in set.iter().zip(placed) {
        if !done {
            out.push_attribute((*key, value.as_str()));
        }
    }
    Ok(out)
}

fn local_name(name: &[u8]) -> &[u8] {
    name.rsplit(|&b| b == b':').next().unwrap_or(name)
}

fn element_prefix(name: &[u8]) -> Option<String> {
    let colon = name.iter().position(|&b| b == b':')?;
    Some(String::from_utf8_lossy(&name[..colon]).into_owned())
}

fn tag(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(xml: &str, targets: &[((u32, u16), usize)]) -> String {
        let targets: BTreeMap<_, _> = targets.iter().copied().collect();
        String::from_utf8(patch_worksheet_xml(xml, &targets).unwrap()).unwrap()
    }

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:C3"/><sheetViews><sheetView tabSelected="1" workbookViewId="0"><pane ySplit="1" topLeftCell="A2" activePane="bottomLeft" state="frozen"/></sheetView></sheetViews><sheetData><row r="1" spans="1:3"><c r="A1" t="s"><v>0</v></c><c r="C1" s="2"><v>7</v></c></row><row r="3" spans="1:3"><c r="B3" t="s"><v>1</v></c></row></sheetData><hyperlinks><hyperlink ref="B3" r:id="rId1"/></hyperlinks></worksheet>"#;

    #[test]
    fn test_restyles_existing_cells_and_keeps_content() {
        let out = patch(SHEET, &[((0, 0), 5), ((0, 2), 6)]);
        assert!(out.contains(r#"<c r="A1" t="s" s="5"><v>0</v></c>"#), "{out}");
        assert!(out.contains(r#"<c r="C1" s="6"><v>7</v></c>"#), "{out}");
        assert!(out.contains(r#"<row r="1" spans="1:3">"#));
        assert!(out.contains(r#"state="frozen""#));
        assert!(out.contains(r#"<hyperlink ref="B3" r:id="rId1"/>"#));
    }

    #[test]
    fn test_inserts_missing_cells_in_column_order() {
        let out = patch(SHEET, &[((0, 1), 5), ((0, 4), 5)]);
        assert!(
            out.contains(r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" s="5"/><c r="C1" s="2"><v>7</v></c><c r="E1" s="5"/></row>"#),
            "{out}"
        );
    }

    #[test]
    fn test_inserts_missing_rows_in_order() {
        let out = patch(SHEET, &[((1, 0), 5), ((9, 0), 5)]);
        let row1 = out.find(r#"<row r="1""#).unwrap();
        let row2 = out.find(r#"<row r="2"><c r="A2" s="5"/></row>"#).unwrap();
        let row3 = out.find(r#"<row r="3""#).unwrap();
        let row10 = out.find(r#"<row r="10"><c r="A10" s="5"/></row></sheetData>"#).unwrap();
        assert!(row1 < row2 && row2 < row3 && row3 < row10, "{out}");
        assert!(out.contains(r#"<dimension ref="A1:C10"/>"#), "{out}");
    }

    #[test]
    fn test_expands_empty_sheet_data() {
        let xml = r#"<worksheet><sheetData/></worksheet>"#;
        assert_eq!(
            patch(xml, &[((0, 1), 3)]),
            r#"<worksheet><sheetData><row r="1"><c r="B1" s="3"/></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_untouched_when_no_targets() {
        assert_eq!(patch(SHEET, &[]), SHEET);
    }

    #[test]
    fn test_missing_sheet_data_is_an_error() {
        let targets = BTreeMap::from([((0, 0), 1)]);
        assert!(patch_worksheet_xml("<worksheet/>", &targets).is_err());
    }

    const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="0.000"/></numFmts><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="164" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1" applyNumberFormat="1"><alignment horizontal="right"/><protection locked="0"/></xf></cellXfs></styleSheet>"#;

    #[test]
    fn test_style_plan_appends_fill_border_and_formats() {
        let highlight = HighlightStyle::default();
        let mut plan = StylePlan::new(STYLES);
        assert_eq!(plan.xf_for(0, StyleId(0), &highlight), 2);
        assert_eq!(plan.xf_for(1, StyleId(0), &highlight), 3);
        assert_eq!(plan.xf_for(0, StyleId(0), &highlight), 2);

        let out = String::from_utf8(plan.write().unwrap().unwrap()).unwrap();
        assert!(out.contains(r#"<fills count="3">"#), "{out}");
        assert!(out.contains(r#"<fgColor rgb="FFFFEB00"/>"#));
        assert!(out.contains(r#"<borders count="2">"#));
        assert!(out.contains(r#"<left style="thin"><color rgb="FF000000"/></left>"#));
        assert!(out.contains(r#"<cellXfs count="4">"#));
        assert!(out.contains(r#"<cellStyleXfs count="1">"#));

        // Font and number format survive; the old alignment is replaced, protection kept.
        assert!(out.contains(
            r#"<xf numFmtId="164" fontId="1" fillId="2" borderId="1" xfId="0" applyFont="1" applyNumberFormat="1" applyFill="1" applyBorder="1" applyAlignment="1"><alignment horizontal="left" vertical="center" wrapText="1"/><protection locked="0"/></xf>"#
        ), "{out}");

        let table = xlsx_styles::parse_styles_xml(&out);
        let marked = table.get(3).unwrap();
        assert!(marked.bold);
        assert_eq!(marked.fill, Some(Rgb::MARKER_YELLOW));
        assert_eq!(marked.num_format, xlsx_styles::NumFormat::Custom("0.000".to_string()));
    }

    #[test]
    fn test_style_plan_reuses_what_is_there() {
        let highlight = HighlightStyle::default();
        let mut first = StylePlan::new(STYLES);
        first.xf_for(1, StyleId(0), &highlight);
        let patched = String::from_utf8(first.write().unwrap().unwrap()).unwrap();

        // Marking the already-marked format again needs nothing new.
        let mut second = StylePlan::new(&patched);
        assert_eq!(second.xf_for(2, StyleId(0), &highlight), 2);
        assert!(second.write().unwrap().is_none());

        // Another colour adds one fill and one format, not another border.
        let green = highlight.clone().with_fill(Rgb(0x92D050));
        let mut third = StylePlan::new(&patched);
        assert_eq!(third.xf_for(0, StyleId(1), &green), 3);
        let out = String::from_utf8(third.write().unwrap().unwrap()).unwrap();
        assert!(out.contains(r#"<fills count="4">"#), "{out}");
        assert!(out.contains(r#"<borders count="2">"#), "{out}");
    }

    #[test]
    fn test_style_plan_needs_sections() {
        let mut plan = StylePlan::new("<styleSheet><cellXfs count=\"0\"/></styleSheet>");
        plan.xf_for(0, StyleId(0), &HighlightStyle::default());
        assert!(plan.write().is_err());
    }
}
