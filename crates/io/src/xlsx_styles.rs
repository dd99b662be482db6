//! XLSX style parser: extracts existing formatting from styles.xml and per-cell
//! style IDs and merges from worksheet XML within XLSX (ZIP) archives.
//!
//! Read-only. `xlsx_patch` uses the same tables to decide which
//! fills, borders and cell formats a mark can reuse.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use colmatch_engine::address::CellRange;
use colmatch_engine::style::{HorizontalAlign, Rgb, VerticalAlign};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

// =============================================================================
// Public types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderLine {
    #[default]
    None,
    Hair,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Border {
    pub line: BorderLine,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NumFormat {
    #[default]
    General,
    /// Excel built-in format index (14 = short date, ...).
    Builtin(u8),
    Custom(String),
}

/// Formatting already present on a cell before it is marked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub font_size: Option<f64>,
    pub font_color: Option<Rgb>,
    pub font_name: Option<String>,
    pub fill: Option<Rgb>,
    pub border_top: Border,
    pub border_right: Border,
    pub border_bottom: Border,
    pub border_left: Border,
    pub horizontal: Option<HorizontalAlign>,
    pub vertical: Option<VerticalAlign>,
    pub wrap_text: bool,
    pub num_format: NumFormat,
}

/// Parsed style table from styles.xml. Maps cellXfs index → CellStyle.
#[derive(Debug, Default)]
pub struct StyleTable {
    pub styles: Vec<CellStyle>,
}

impl StyleTable {
    pub fn get(&self, id: usize) -> Option<&CellStyle> {
        self.styles.get(id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// Per-cell style references and merges extracted from a worksheet XML.
#[derive(Debug, Default)]
pub struct SheetFormatting {
    /// (row, col, style_id) triples, style 0 omitted
    pub cell_styles: Vec<(u32, u16, usize)>,
    pub merged_regions: Vec<CellRange>,
}

// =============================================================================
// Colours
// =============================================================================

/// First 16 entries of Excel's indexed palette plus the system colours.
fn indexed_color(idx: u8) -> Option<Rgb> {
    let rgb = match idx {
        0 | 8 | 64 => 0x000000,
        1 | 9 | 65 => 0xFFFFFF,
        2 | 10 => 0xFF0000,
        3 | 11 => 0x00FF00,
        4 | 12 => 0x0000FF,
        5 | 13 => 0xFFFF00,
        6 | 14 => 0xFF00FF,
        7 | 15 => 0x00FFFF,
        16 => 0x800000,
        17 => 0x008000,
        18 => 0x000080,
        22 => 0xC0C0C0,
        23 => 0x808080,
        _ => return None,
    };
    Some(Rgb(rgb))
}

/// Flat defaults of the Office theme (no tint math).
fn theme_color_default(idx: u8) -> Option<Rgb> {
    let rgb = match idx {
        0 => 0xFFFFFF, // lt1
        1 => 0x000000, // dk1
        2 => 0xE7E6E6, // lt2
        3 => 0x44546A, // dk2
        4 => 0x4472C4, // accent1
        5 => 0xED7D31, // accent2
        6 => 0xA5A5A5, // accent3
        7 => 0xFFC000, // accent4
        8 => 0x5B9BD5, // accent5
        9 => 0x70AD47, // accent6
        _ => return None,
    };
    Some(Rgb(rgb))
}

/// rgb > indexed > theme.
fn parse_color(e: &BytesStart) -> Option<Rgb> {
    let mut rgb = None;
    let mut indexed = None;
    let mut theme = None;
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value);
        match attr.key.as_ref() {
            b"rgb" => rgb = value.parse::<Rgb>().ok(),
            b"indexed" => indexed = value.parse::<u8>().ok(),
            b"theme" => theme = value.parse::<u8>().ok(),
            _ => {}
        }
    }
    rgb.or_else(|| indexed.and_then(indexed_color))
        .or_else(|| theme.and_then(theme_color_default))
}

// =============================================================================
// Internal parsed components
// =============================================================================

#[derive(Debug, Clone, Default)]
struct ParsedFont {
    bold: bool,
    italic: bool,
    underline: bool,
    strikethrough: bool,
    size: Option<f64>,
    color: Option<Rgb>,
    name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct ParsedBorder {
    pub top: Border,
    pub right: Border,
    pub bottom: Border,
    pub left: Border,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct XfEntry {
    pub num_fmt_id: Option<u16>,
    pub font_id: Option<usize>,
    pub fill_id: Option<usize>,
    pub border_id: Option<usize>,
    pub horizontal: Option<HorizontalAlign>,
    pub vertical: Option<VerticalAlign>,
    pub wrap_text: bool,
}

impl XfEntry {
    /// Same rendering; absent ids count as 0.
    pub fn same_look(&self, other: &XfEntry) -> bool {
        self.num_fmt_id.unwrap_or(0) == other.num_fmt_id.unwrap_or(0)
            && self.font_id.unwrap_or(0) == other.font_id.unwrap_or(0)
            && self.fill_id.unwrap_or(0) == other.fill_id.unwrap_or(0)
            && self.border_id.unwrap_or(0) == other.border_id.unwrap_or(0)
            && self.horizontal == other.horizontal
            && self.vertical == other.vertical
            && self.wrap_text == other.wrap_text
    }
}

// =============================================================================
// styles.xml parser
// =============================================================================

/// Parse styles.xml content into a StyleTable.
pub fn parse_styles_xml(xml: &str) -> StyleTable {
    let num_fmts = parse_num_fmts(xml);
    let fonts = parse_fonts(xml);
    let fills = parse_fills(xml);
    let borders = parse_borders(xml);
    let styles = parse_cell_xfs(xml)
        .iter()
        .map(|xf| resolve_xf(xf, &num_fmts, &fonts, &fills, &borders))
        .collect();
    StyleTable { styles }
}

/// <numFmts> → formatId → formatCode
fn parse_num_fmts(xml: &str) -> HashMap<u16, String> {
    let mut map = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_num_fmts = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"numFmts" => in_num_fmts = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"numFmts" => break,
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if in_num_fmts && e.name().as_ref() == b"numFmt" =>
            {
                let id = attr_parse::<u16>(e, b"numFmtId");
                let code = attr_string(e, b"formatCode").map(|s| unescape_xml(&s));
                if let (Some(id), Some(code)) = (id, code) {
                    map.insert(id, code);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    map
}

fn parse_fonts(xml: &str) -> Vec<ParsedFont> {
    let mut fonts = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fonts>, 2 = inside <font>
    let mut current = ParsedFont::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"fonts" if depth == 0 => depth = 1,
                b"font" if depth == 1 => {
                    depth = 2;
                    current = ParsedFont::default();
                }
                b"color" if depth == 2 => current.color = parse_color(e),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 2 => match e.name().as_ref() {
                b"b" => current.bold = attr_flag(e, b"val").unwrap_or(true),
                b"i" => current.italic = attr_flag(e, b"val").unwrap_or(true),
                b"strike" => current.strikethrough = attr_flag(e, b"val").unwrap_or(true),
                b"u" => {
                    current.underline = attr_string(e, b"val").map_or(true, |v| v != "none")
                }
                b"sz" => current.size = attr_parse(e, b"val"),
                b"color" => current.color = parse_color(e),
                b"name" => current.name = attr_string(e, b"val"),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 1 && e.name().as_ref() == b"font" => {
                fonts.push(ParsedFont::default());
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"font" if depth == 2 => {
                    fonts.push(std::mem::take(&mut current));
                    depth = 1;
                }
                b"fonts" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    fonts
}

/// <fills> → solid foreground colour per fill (None for pattern "none").
pub(crate) fn parse_fills(xml: &str) -> Vec<Option<Rgb>> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fills>, 2 = inside <fill>
    let mut in_pattern = false;
    let mut solid = false;
    let mut current: Option<Rgb> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"fills" if depth == 0 => depth = 1,
                b"fill" if depth == 1 => {
                    depth = 2;
                    current = None;
                    solid = false;
                }
                b"patternFill" if depth == 2 => {
                    in_pattern = true;
                    solid = attr_string(e, b"patternType").as_deref() == Some("solid");
                }
                b"fgColor" if in_pattern => current = parse_color(e),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"fgColor" if in_pattern => current = parse_color(e),
                b"fill" if depth == 1 => fills.push(None),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"patternFill" => in_pattern = false,
                b"fill" if depth == 2 => {
                    fills.push(if solid { current } else { None });
                    depth = 1;
                    in_pattern = false;
                }
                b"fills" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    fills
}

pub(crate) fn parse_borders(xml: &str) -> Vec<ParsedBorder> {
    let mut borders = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <borders>, 2 = inside <border>
    let mut current = ParsedBorder::default();
    let mut side: Option<Vec<u8>> = None;
    let mut side_border = Border::default();

    fn store(target: &mut ParsedBorder, side: &[u8], border: Border) {
        match side {
            b"left" => target.left = border,
            b"right" => target.right = border,
            b"top" => target.top = border,
            b"bottom" => target.bottom = border,
            _ => {}
        }
    }

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"borders" if depth == 0 => depth = 1,
                b"border" if depth == 1 => {
                    depth = 2;
                    current = ParsedBorder::default();
                }
                name @ (b"left" | b"right" | b"top" | b"bottom") if depth == 2 => {
                    side = Some(name.to_vec());
                    side_border = Border {
                        line: attr_string(e, b"style").map_or(BorderLine::None, |s| parse_border_line(&s)),
                        color: None,
                    };
                }
                b"color" if side.is_some() => side_border.color = parse_color(e),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                name @ (b"left" | b"right" | b"top" | b"bottom") if depth == 2 => {
                    let line = attr_string(e, b"style").map_or(BorderLine::None, |s| parse_border_line(&s));
                    store(&mut current, name, Border { line, color: None });
                }
                b"color" if side.is_some() => side_border.color = parse_color(e),
                b"border" if depth == 1 => borders.push(ParsedBorder::default()),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"left" | b"right" | b"top" | b"bottom" if depth == 2 => {
                    if let Some(name) = side.take() {
                        store(&mut current, &name, side_border);
                    }
                    side_border = Border::default();
                }
                b"border" if depth == 2 => {
                    borders.push(std::mem::take(&mut current));
                    depth = 1;
                }
                b"borders" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    borders
}

fn parse_border_line(s: &str) -> BorderLine {
    match s {
        "hair" => BorderLine::Hair,
        "thin" => BorderLine::Thin,
        "medium" | "mediumDashed" | "mediumDashDot" | "mediumDashDotDot" => BorderLine::Medium,
        "thick" => BorderLine::Thick,
        "dashed" | "dashDot" | "dashDotDot" | "slantDashDot" => BorderLine::Dashed,
        "dotted" => BorderLine::Dotted,
        "double" => BorderLine::Double,
        _ => BorderLine::None,
    }
}

/// <cellXfs> entries in order. <cellStyleXfs> is skipped.
pub(crate) fn parse_cell_xfs(xml: &str) -> Vec<XfEntry> {
    let mut entries = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;
    let mut current: Option<XfEntry> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => current = Some(read_xf_attrs(e)),
                b"alignment" => {
                    if let Some(xf) = current.as_mut() {
                        read_alignment(e, xf);
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"xf" if in_cell_xfs => entries.push(read_xf_attrs(e)),
                b"alignment" => {
                    if let Some(xf) = current.as_mut() {
                        read_alignment(e, xf);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"xf" => {
                    if let Some(xf) = current.take() {
                        entries.push(xf);
                    }
                }
                b"cellXfs" => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    entries
}

fn read_xf_attrs(e: &BytesStart) -> XfEntry {
    XfEntry {
        num_fmt_id: attr_parse(e, b"numFmtId"),
        font_id: attr_parse(e, b"fontId"),
        fill_id: attr_parse(e, b"fillId"),
        border_id: attr_parse(e, b"borderId"),
        ..XfEntry::default()
    }
}

fn read_alignment(e: &BytesStart, xf: &mut XfEntry) {
    xf.horizontal = attr_string(e, b"horizontal").and_then(|h| match h.as_str() {
        "left" => Some(HorizontalAlign::Left),
        "center" | "centerContinuous" => Some(HorizontalAlign::Center),
        "right" => Some(HorizontalAlign::Right),
        _ => None,
    });
    xf.vertical = attr_string(e, b"vertical").and_then(|v| match v.as_str() {
        "top" => Some(VerticalAlign::Top),
        "center" => Some(VerticalAlign::Center),
        "bottom" => Some(VerticalAlign::Bottom),
        _ => None,
    });
    xf.wrap_text = attr_flag(e, b"wrapText").unwrap_or(false);
}

/// Resolve an XfEntry into a CellStyle using the parsed component tables.
fn resolve_xf(
    xf: &XfEntry,
    num_fmts: &HashMap<u16, String>,
    fonts: &[ParsedFont],
    fills: &[Option<Rgb>],
    borders: &[ParsedBorder],
) -> CellStyle {
    let mut style = CellStyle {
        horizontal: xf.horizontal,
        vertical: xf.vertical,
        wrap_text: xf.wrap_text,
        ..CellStyle::default()
    };

    if let Some(font) = xf.font_id.and_then(|id| fonts.get(id)) {
        style.bold = font.bold;
        style.italic = font.italic;
        style.underline = font.underline;
        style.strikethrough = font.strikethrough;
        style.font_size = font.size;
        style.font_color = font.color;
        style.font_name = font.name.clone();
    }

    if let Some(fill) = xf.fill_id.and_then(|id| fills.get(id)) {
        style.fill = *fill;
    }

    if let Some(border) = xf.border_id.and_then(|id| borders.get(id)) {
        style.border_top = border.top;
        style.border_right = border.right;
        style.border_bottom = border.bottom;
        style.border_left = border.left;
    }

    style.num_format = match xf.num_fmt_id {
        None | Some(0) => NumFormat::General,
        Some(id) => match num_fmts.get(&id) {
            Some(code) => NumFormat::Custom(code.clone()),
            None => u8::try_from(id).map_or(NumFormat::General, NumFormat::Builtin),
        },
    };

    style
}

// =============================================================================
// Worksheet XML parser: per-cell style IDs and layout
// =============================================================================

/// Parse a worksheet XML to extract per-cell style IDs and merges.
pub fn parse_sheet_formatting(xml: &str) -> SheetFormatting {
    let mut formatting = SheetFormatting::default();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"c" => {
                    let style_id = attr_parse::<usize>(e, b"s").unwrap_or(0);
                    let cell = attr_string(e, b"r")
                        .and_then(|r| colmatch_engine::address::parse_cell_ref(&r));
                    if let (true, Some((row, col))) = (style_id > 0, cell) {
                        if let (Ok(row), Ok(col)) = (u32::try_from(row), u16::try_from(col)) {
                            formatting.cell_styles.push((row, col, style_id));
                        }
                    }
                }
                b"mergeCell" => {
                    if let Some(region) = attr_string(e, b"ref").and_then(|r| CellRange::parse(&r)) {
                        formatting.merged_regions.push(region);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    formatting
}

// =============================================================================
// Top-level entry points
// =============================================================================

/// Style table plus one `SheetFormatting` per requested sheet, in order.
pub struct WorkbookFormatting {
    pub styles: StyleTable,
    pub sheets: Vec<SheetFormatting>,
}

/// Parse all formatting data from an XLSX file.
/// `sheet_names` must match the order of sheets in the workbook.
pub fn parse_xlsx_formatting(path: &Path, sheet_names: &[String]) -> Result<WorkbookFormatting, String> {
    let file = std::fs::File::open(path)
        .map_err(|e| format!("Failed to open XLSX file for styles: {}", e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| format!("Failed to read XLSX as ZIP for styles: {}", e))?;

    let styles = match read_zip_file(&mut archive, "xl/styles.xml") {
        Ok(xml) => parse_styles_xml(&xml),
        Err(_) => StyleTable::default(),
    };

    let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml").unwrap_or_default();
    let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
    let worksheet_paths = resolve_worksheet_paths(&workbook_xml, &rels_xml, sheet_names);

    let sheets = worksheet_paths
        .iter()
        .map(|ws_path| match ws_path {
            Some(ws_path) => read_zip_file(&mut archive, ws_path)
                .map(|xml| parse_sheet_formatting(&xml))
                .unwrap_or_default(),
            None => SheetFormatting::default(),
        })
        .collect();

    Ok(WorkbookFormatting { styles, sheets })
}

// =============================================================================
// Helpers
// =============================================================================

/// Unescape the 5 predefined XML entities: &amp; &lt; &gt; &quot; &apos;
fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub(crate) fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn attr_parse<T: std::str::FromStr>(e: &BytesStart, key: &[u8]) -> Option<T> {
    attr_string(e, key).and_then(|s| s.parse().ok())
}

/// "1"/"true" → true, "0"/"false" → false, absent → None.
fn attr_flag(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|v| v == "1" || v == "true")
}

pub(crate) fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String, String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| format!("File '{}' not found in XLSX: {}", path, e))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    Ok(content)
}

/// Worksheet part path for each sheet name, via workbook.xml (name → r:id)
/// and workbook.xml.rels (r:id → target).
pub(crate) fn resolve_worksheet_paths(workbook_xml: &str, rels_xml: &str, sheet_names: &[String]) -> Vec<Option<String>> {
    let mut name_to_rid: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"sheet" => {
                if let (Some(name), Some(rid)) = (attr_string(e, b"name"), attr_string(e, b"r:id")) {
                    name_to_rid.insert(unescape_xml(&name), rid);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let mut rid_to_target: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr_string(e, b"Id"), attr_string(e, b"Target")) {
                    rid_to_target.insert(id, target);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    sheet_names
        .iter()
        .map(|name| {
            let target = rid_to_target.get(name_to_rid.get(name)?)?;
            Some(match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("xl/{}", target),
            })
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
