//! Cell style descriptors and the workbook-owned style table.
//!
//! A style descriptor is a small JSON document (`{"bold":true,"font_color":"#FF0000"}`)
//! declared on a column. Decoding turns it into a [`CellStyle`]; interning it into a
//! [`StyleTable`] yields the [`StyleId`] handle cells refer to. Styles are never mutated
//! in place: deriving a variant (e.g. a date number format) interns a new entry, so
//! cells sharing the original handle are unaffected.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatUnderline};
use serde::{Deserialize, Serialize};

use crate::error::{SheetError, SheetResult};

/// Handle to a style owned by a workbook's [`StyleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleId(usize);

impl StyleId {
    pub fn index(self) -> usize {
        self.0
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Concrete visual formatting of a cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CellStyle {
    #[serde(skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(alias = "fontName", skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(alias = "fontSize", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// `#RRGGBB`
    #[serde(alias = "fontColor", skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    /// `#RRGGBB`
    #[serde(
        alias = "backgroundColor",
        alias = "bg_color",
        skip_serializing_if = "Option::is_none"
    )]
    pub background_color: Option<String>,
    #[serde(
        alias = "numFormat",
        alias = "dataFormat",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_format: Option<String>,
    /// left | center | right | fill | justify
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    /// top | center | bottom
    #[serde(alias = "verticalAlign", skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<String>,
    #[serde(alias = "wrapText", skip_serializing_if = "is_false")]
    pub wrap_text: bool,
    /// thin | medium | thick | double | dashed | dotted | hair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
}

impl CellStyle {
    pub fn with_num_format(mut self, num_format: impl Into<String>) -> Self {
        self.num_format = Some(num_format.into());
        self
    }

    /// Convert to the write backend's format object.
    pub fn to_format(&self) -> Format {
        let mut format = Format::new();

        if self.bold {
            format = format.set_bold();
        }
        if self.italic {
            format = format.set_italic();
        }
        if self.underline {
            format = format.set_underline(FormatUnderline::Single);
        }
        if let Some(name) = &self.font_name {
            format = format.set_font_name(name);
        }
        if let Some(size) = self.font_size {
            format = format.set_font_size(size);
        }
        if let Some(color) = self.font_color.as_deref().and_then(parse_hex_color) {
            format = format.set_font_color(color);
        }
        if let Some(color) = self.background_color.as_deref().and_then(parse_hex_color) {
            format = format.set_background_color(color);
        }
        if let Some(num_format) = &self.num_format {
            format = format.set_num_format(num_format);
        }
        if let Some(align) = self.align.as_deref().and_then(map_align) {
            format = format.set_align(align);
        }
        if let Some(align) = self.vertical_align.as_deref().and_then(map_vertical_align) {
            format = format.set_align(align);
        }
        if self.wrap_text {
            format = format.set_text_wrap();
        }
        if let Some(border) = self.border.as_deref().and_then(map_border) {
            format = format.set_border(border);
        }

        format
    }
}

/// Decode a style descriptor. Blank input (or JSON `null`) yields no style;
/// unknown fields are ignored.
pub fn decode(descriptor: &str) -> SheetResult<Option<CellStyle>> {
    let descriptor = descriptor.trim();
    if descriptor.is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<CellStyle>>(descriptor)
        .map_err(|e| SheetError::Decode(format!("'{}': {}", descriptor, e)))
}

/// Encode a style back into its descriptor form.
pub fn encode(style: &CellStyle) -> SheetResult<String> {
    serde_json::to_string(style).map_err(|e| SheetError::Decode(e.to_string()))
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let s = hex.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    u32::from_str_radix(s, 16).ok().map(Color::RGB)
}

fn map_align(s: &str) -> Option<FormatAlign> {
    match s.to_ascii_lowercase().as_str() {
        "left" => Some(FormatAlign::Left),
        "center" | "centre" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        _ => None,
    }
}

fn map_vertical_align(s: &str) -> Option<FormatAlign> {
    match s.to_ascii_lowercase().as_str() {
        "top" => Some(FormatAlign::Top),
        "center" | "centre" | "middle" => Some(FormatAlign::VerticalCenter),
        "bottom" => Some(FormatAlign::Bottom),
        _ => None,
    }
}

fn map_border(s: &str) -> Option<FormatBorder> {
    match s.to_ascii_lowercase().as_str() {
        "thin" => Some(FormatBorder::Thin),
        "medium" => Some(FormatBorder::Medium),
        "thick" => Some(FormatBorder::Thick),
        "double" => Some(FormatBorder::Double),
        "dashed" => Some(FormatBorder::Dashed),
        "dotted" => Some(FormatBorder::Dotted),
        "hair" => Some(FormatBorder::Hair),
        _ => None,
    }
}

/// Interned styles of one workbook. Equal styles share one handle.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    styles: Vec<CellStyle>,
}

impl StyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, style: CellStyle) -> StyleId {
        if let Some(pos) = self.styles.iter().position(|s| *s == style) {
            return StyleId(pos);
        }
        self.styles.push(style);
        StyleId(self.styles.len() - 1)
    }

    pub fn get(&self, id: StyleId) -> Option<&CellStyle> {
        self.styles.get(id.0)
    }

    /// Intern a copy of `base` (or the default style) carrying `num_format`.
    pub fn derive_num_format(&mut self, base: Option<StyleId>, num_format: &str) -> StyleId {
        let style = base
            .and_then(|id| self.get(id))
            .cloned()
            .unwrap_or_default()
            .with_num_format(num_format);
        self.intern(style)
    }

    /// Styles in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &CellStyle> + '_ {
        self.styles.iter()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
