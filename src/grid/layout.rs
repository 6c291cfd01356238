//! Template layout of an xlsx package: per-cell styles and column widths.
//!
//! `calamine` yields cell values only. The styles and widths of a template live in
//! `xl/styles.xml` and the worksheet parts, which are read here directly so a filled
//! template keeps its look.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use super::Workbook;
use crate::error::{SheetError, SheetResult};
use crate::style::{CellStyle, StyleId};

// Stored widths include font padding; these are the Calibri and fallback paddings.
const CALIBRI_WIDTH_PADDING: f64 = 0.83203125;
const ALT_WIDTH_PADDING: f64 = 0.7109375;
const WIDTH_TOLERANCE: f64 = 0.0005;

const MAX_COLUMNS: u32 = 16_384;

/// Styles and widths of every sheet of one xlsx package.
#[derive(Debug, Clone, Default)]
pub struct TemplateLayout {
    /// Resolved style per `cellXfs` entry; `None` for the default look.
    xf_styles: Vec<Option<CellStyle>>,
    sheets: Vec<SheetLayout>,
}

#[derive(Debug, Clone, Default)]
struct SheetLayout {
    name: String,
    /// (row, col) -> `cellXfs` index
    cell_xfs: BTreeMap<(u32, u16), usize>,
    column_widths: BTreeMap<u16, f64>,
}

impl TemplateLayout {
    /// Read the layout of xlsx bytes.
    pub fn read(bytes: &[u8]) -> SheetResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(layout_error)?;

        let xf_styles = match read_part(&mut archive, "xl/styles.xml")? {
            Some(xml) => parse_styles(&xml)?,
            None => Vec::new(),
        };

        let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?.unwrap_or_default();
        let rels_xml =
            read_part(&mut archive, "xl/_rels/workbook.xml.rels")?.unwrap_or_default();
        let targets = parse_relationships(&rels_xml)?;

        let mut sheets = Vec::new();
        for (name, rel_id) in parse_sheet_refs(&workbook_xml)? {
            let Some(target) = targets.get(&rel_id) else {
                continue;
            };
            let Some(xml) = read_part(&mut archive, &part_path(target))? else {
                continue;
            };
            let mut sheet = parse_sheet(&xml)?;
            sheet.name = name;
            sheets.push(sheet);
        }

        Ok(Self { xf_styles, sheets })
    }

    /// Attach styles and widths to the sheets of `workbook` with matching names.
    ///
    /// Styled cells without a value are created as blank cells.
    pub fn apply(&self, workbook: &mut Workbook) -> SheetResult<()> {
        let mut interned: HashMap<usize, StyleId> = HashMap::new();

        for index in 0..workbook.sheets().len() {
            let (sheet, styles) = workbook.sheet_and_styles_mut(index)?;
            let Some(layout) = self.sheets.iter().find(|s| s.name == sheet.name()) else {
                continue;
            };

            for (&(row, col), &xf) in &layout.cell_xfs {
                let Some(style) = self.xf_styles.get(xf).and_then(Option::as_ref) else {
                    continue;
                };
                let id = *interned
                    .entry(xf)
                    .or_insert_with(|| styles.intern(style.clone()));
                sheet.cell_mut(row, col).style = Some(id);
            }
            for (&col, &width) in &layout.column_widths {
                sheet.set_column_width(col, width);
            }

            debug!(
                sheet = %layout.name,
                styled = layout.cell_xfs.len(),
                widths = layout.column_widths.len(),
                "applied template layout"
            );
        }

        Ok(())
    }
}

fn layout_error(e: impl std::fmt::Display) -> SheetError {
    SheetError::Format(format!("cannot read template layout: {}", e))
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> SheetResult<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(layout_error(e)),
    };
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    Ok(Some(text))
}

/// `worksheets/sheet1.xml` -> `xl/worksheets/sheet1.xml`; absolute targets keep their path.
fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn attr_flag(e: &BytesStart<'_>, name: &[u8]) -> Option<bool> {
    attr(e, name).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn attr_num<T: std::str::FromStr>(e: &BytesStart<'_>, name: &[u8]) -> Option<T> {
    attr(e, name).and_then(|v| v.trim().parse().ok())
}

enum Node<'a, 'b> {
    Open(&'a BytesStart<'b>),
    Close(&'a [u8]),
}

/// Visit every element of `xml`; empty elements open and close at once.
fn walk(xml: &str, mut visit: impl FnMut(Node<'_, '_>)) -> SheetResult<()> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => visit(Node::Open(&e)),
            Ok(Event::Empty(e)) => {
                visit(Node::Open(&e));
                visit(Node::Close(e.local_name().as_ref()));
            }
            Ok(Event::End(e)) => visit(Node::Close(e.local_name().as_ref())),
            Ok(Event::Eof) => break,
            Err(e) => return Err(layout_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// PACKAGE PARTS
// ═══════════════════════════════════════════════════════════════════════════

/// (sheet name, relationship id) in workbook order.
fn parse_sheet_refs(xml: &str) -> SheetResult<Vec<(String, String)>> {
    let mut refs = Vec::new();
    walk(xml, |node| {
        if let Node::Open(e) = node {
            if e.local_name().as_ref() == b"sheet" {
                if let (Some(name), Some(id)) = (attr(e, b"name"), attr(e, b"id")) {
                    refs.push((name, id));
                }
            }
        }
    })?;
    Ok(refs)
}

fn parse_relationships(xml: &str) -> SheetResult<HashMap<String, String>> {
    let mut targets = HashMap::new();
    walk(xml, |node| {
        if let Node::Open(e) = node {
            if e.local_name().as_ref() == b"Relationship" {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    targets.insert(id, target);
                }
            }
        }
    })?;
    Ok(targets)
}

fn parse_sheet(xml: &str) -> SheetResult<SheetLayout> {
    let mut layout = SheetLayout::default();
    walk(xml, |node| {
        let Node::Open(e) = node else {
            return;
        };
        match e.local_name().as_ref() {
            b"col" => {
                if attr_flag(e, b"customWidth") != Some(true) {
                    return;
                }
                let (Some(min), Some(max), Some(width)) = (
                    attr_num::<u32>(e, b"min"),
                    attr_num::<u32>(e, b"max"),
                    attr_num::<f64>(e, b"width"),
                ) else {
                    return;
                };
                let width = strip_width_padding(width);
                for col in min.max(1)..=max.min(MAX_COLUMNS) {
                    if let Ok(col) = u16::try_from(col - 1) {
                        layout.column_widths.insert(col, width);
                    }
                }
            }
            b"c" => {
                let xf = attr_num::<usize>(e, b"s").unwrap_or(0);
                if xf == 0 {
                    return;
                }
                if let Some(pos) = attr(e, b"r").as_deref().and_then(parse_a1) {
                    layout.cell_xfs.insert(pos, xf);
                }
            }
            _ => {}
        }
    })?;
    Ok(layout)
}

fn strip_width_padding(raw: f64) -> f64 {
    let frac = raw % 1.0;
    for padding in [CALIBRI_WIDTH_PADDING, ALT_WIDTH_PADDING] {
        if (frac - padding).abs() < WIDTH_TOLERANCE && raw - padding >= 0.0 {
            return ((raw - padding) * 10_000.0).round() / 10_000.0;
        }
    }
    (raw * 10_000.0).round() / 10_000.0
}

/// `B12` -> (11, 1)
fn parse_a1(reference: &str) -> Option<(u32, u16)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        if col > MAX_COLUMNS {
            return None;
        }
    }
    let row: u32 = digits.parse().ok()?;
    let row = row.checked_sub(1)?;
    Some((row, u16::try_from(col - 1).ok()?))
}

// ═══════════════════════════════════════════════════════════════════════════
// STYLES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

#[derive(Debug, Clone, Default)]
struct FontDef {
    bold: bool,
    italic: bool,
    underline: bool,
    name: Option<String>,
    size: Option<f64>,
    color: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct FillDef {
    solid: bool,
    color: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct XfDef {
    num_fmt: u32,
    font: usize,
    fill: usize,
    border: usize,
    align: Option<String>,
    vertical_align: Option<String>,
    wrap_text: bool,
}

#[derive(Debug, Default)]
struct StyleSheet {
    num_formats: HashMap<u32, String>,
    fonts: Vec<FontDef>,
    fills: Vec<FillDef>,
    borders: Vec<Option<String>>,
    xfs: Vec<XfDef>,
}

fn parse_styles(xml: &str) -> SheetResult<Vec<Option<CellStyle>>> {
    let mut sheet = StyleSheet::default();
    let mut section: Option<Section> = None;

    walk(xml, |node| {
        let e = match node {
            Node::Open(e) => e,
            Node::Close(name) => {
                if matches!(
                    name,
                    b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs"
                ) {
                    section = None;
                }
                return;
            }
        };
        let name = e.local_name();
        match (section, name.as_ref()) {
            (_, b"numFmts") => section = Some(Section::NumFmts),
            (_, b"fonts") => section = Some(Section::Fonts),
            (_, b"fills") => section = Some(Section::Fills),
            (_, b"borders") => section = Some(Section::Borders),
            (_, b"cellXfs") => section = Some(Section::CellXfs),

            (Some(Section::NumFmts), b"numFmt") => {
                if let (Some(id), Some(code)) =
                    (attr_num::<u32>(e, b"numFmtId"), attr(e, b"formatCode"))
                {
                    sheet.num_formats.insert(id, code);
                }
            }

            (Some(Section::Fonts), b"font") => sheet.fonts.push(FontDef::default()),
            (Some(Section::Fonts), tag) => {
                if let Some(font) = sheet.fonts.last_mut() {
                    let on = attr(e, b"val").map_or(true, |v| v != "0" && v != "false");
                    match tag {
                        b"b" => font.bold = on,
                        b"i" => font.italic = on,
                        b"u" => font.underline = attr(e, b"val").as_deref() != Some("none"),
                        b"sz" => font.size = attr_num(e, b"val"),
                        b"name" => font.name = attr(e, b"val"),
                        b"color" => font.color = attr(e, b"rgb").and_then(|c| argb_to_hex(&c)),
                        _ => {}
                    }
                }
            }

            (Some(Section::Fills), b"fill") => sheet.fills.push(FillDef::default()),
            (Some(Section::Fills), b"patternFill") => {
                if let Some(fill) = sheet.fills.last_mut() {
                    fill.solid = attr(e, b"patternType").is_some_and(|p| p != "none");
                }
            }
            (Some(Section::Fills), b"fgColor" | b"bgColor") => {
                if let Some(fill) = sheet.fills.last_mut() {
                    if fill.color.is_none() {
                        fill.color = attr(e, b"rgb").and_then(|c| argb_to_hex(&c));
                    }
                }
            }

            (Some(Section::Borders), b"border") => sheet.borders.push(None),
            (Some(Section::Borders), b"left" | b"right" | b"top" | b"bottom") => {
                if let Some(border) = sheet.borders.last_mut() {
                    if border.is_none() {
                        *border = attr(e, b"style").filter(|s| s != "none");
                    }
                }
            }

            (Some(Section::CellXfs), b"xf") => sheet.xfs.push(XfDef {
                num_fmt: attr_num(e, b"numFmtId").unwrap_or(0),
                font: attr_num(e, b"fontId").unwrap_or(0),
                fill: attr_num(e, b"fillId").unwrap_or(0),
                border: attr_num(e, b"borderId").unwrap_or(0),
                ..Default::default()
            }),
            (Some(Section::CellXfs), b"alignment") => {
                if let Some(xf) = sheet.xfs.last_mut() {
                    xf.align = attr(e, b"horizontal").filter(|a| a != "general");
                    xf.vertical_align = attr(e, b"vertical").filter(|a| a != "bottom");
                    xf.wrap_text = attr_flag(e, b"wrapText").unwrap_or(false);
                }
            }
            _ => {}
        }
    })?;

    Ok(sheet.xfs.iter().map(|xf| sheet.resolve(xf)).collect())
}

impl StyleSheet {
    fn resolve(&self, xf: &XfDef) -> Option<CellStyle> {
        let mut style = CellStyle::default();

        if let Some(font) = self.fonts.get(xf.font) {
            let base = self.fonts.first();
            style.bold = font.bold;
            style.italic = font.italic;
            style.underline = font.underline;
            style.font_color = font.color.clone();
            if base.map_or(true, |b| b.name != font.name) {
                style.font_name = font.name.clone();
            }
            if base.map_or(true, |b| b.size != font.size) {
                style.font_size = font.size;
            }
        }
        if let Some(fill) = self.fills.get(xf.fill).filter(|f| f.solid) {
            style.background_color = fill.color.clone();
        }
        if let Some(border) = self.borders.get(xf.border) {
            style.border = border.clone();
        }
        if xf.num_fmt != 0 {
            style.num_format = self
                .num_formats
                .get(&xf.num_fmt)
                .cloned()
                .or_else(|| builtin_num_format(xf.num_fmt).map(str::to_string));
        }
        style.align = xf.align.clone();
        style.vertical_align = xf.vertical_align.clone();
        style.wrap_text = xf.wrap_text;

        (style != CellStyle::default()).then_some(style)
    }
}

/// `FFRRGGBB` / `RRGGBB` -> `#RRGGBB`
fn argb_to_hex(argb: &str) -> Option<String> {
    if !argb.is_ascii() {
        return None;
    }
    let rgb = match argb.len() {
        8 => &argb[2..],
        6 => argb,
        _ => return None,
    };
    rgb.chars()
        .all(|c| c.is_ascii_hexdigit())
        .then(|| format!("#{}", rgb.to_ascii_uppercase()))
}

fn builtin_num_format(id: u32) -> Option<&'static str> {
    Some(match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        49 => "@",
        _ => return None,
    })
}
