use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use std::fmt;

use crate::style::StyleId;

/// Number format applied to date cells whose column declares none.
pub const DEFAULT_DATE_FORMAT: &str = "MM/dd/yyyy HH:mm:ss";

/// Textual form of dates when they are stringified (decoration, text cells).
pub const DATE_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

//==============================================================================
// Values
//==============================================================================

/// A raw value taken from a record field, before it is written into a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    /// Short/int/long values
    Int(i64),
    /// Float/double values
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDateTime),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "Null",
            FieldValue::Int(_) => "Int",
            FieldValue::Float(_) => "Float",
            FieldValue::Bool(_) => "Bool",
            FieldValue::Text(_) => "Text",
            FieldValue::Date(_) => "Date",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::Date(v) => write!(f, "{}", v.format(DATE_DISPLAY_FORMAT)),
        }
    }
}

macro_rules! field_value_from {
    ($variant:ident, $target:ty, $($t:ty),+) => {
        $(
            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    FieldValue::$variant(v as $target)
                }
            }
        )+
    };
}

field_value_from!(Int, i64, i8, i16, i32, i64, u8, u16, u32);
field_value_from!(Float, f64, f32, f64);

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::Text(v.clone())
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(v: NaiveDateTime) -> Self {
        FieldValue::Date(v)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        FieldValue::Date(v.and_hms_opt(0, 0, 0).unwrap_or_default())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

/// The typed content of a grid cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            CellValue::Number(n) => Some(*n != 0.0),
            CellValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Number(n) => crate::grid::codec::serial_to_datetime(*n),
            CellValue::Text(s) => parse_datetime(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            // Whole numbers print without a fraction, like Excel's General format
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Date(d) => write!(f, "{}", d.format(DATE_DISPLAY_FORMAT)),
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(v: NaiveDateTime) -> Self {
        CellValue::Date(v)
    }
}

/// Parse the textual date forms accepted on import and from CLI data.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

//==============================================================================
// Column mapping model
//==============================================================================

/// Resolved per-field formatting and location rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnMetadata {
    pub header_title: String,
    /// Target column; `None` until resolved (or when auto-placed by title).
    pub column_index: Option<u16>,
    /// Column width in character units; 0 leaves the width untouched.
    pub width: u32,
    pub prefix: String,
    pub suffix: String,
    pub date_format: String,
    /// Opaque style descriptor (JSON), may be empty.
    pub style_descriptor: String,
    /// Set once resolution assigns a workbook style.
    pub resolved_style: Option<StyleId>,
}

impl ColumnMetadata {
    pub fn at(column_index: u16) -> Self {
        Self {
            column_index: Some(column_index),
            ..Default::default()
        }
    }

    pub fn is_decorated(&self) -> bool {
        !self.prefix.is_empty() || !self.suffix.is_empty()
    }

    /// Declared date format, or the default when unset.
    pub fn effective_date_format(&self) -> &str {
        if self.date_format.trim().is_empty() {
            DEFAULT_DATE_FORMAT
        } else {
            &self.date_format
        }
    }
}

/// Record field name -> column metadata, in field declaration order.
pub type FieldColumnMap = IndexMap<String, ColumnMetadata>;

/// Caller-supplied field name -> header title overrides.
pub type HeaderMap = IndexMap<String, String>;

/// One title cell of a sheet's existing header row.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetHeaderEntry {
    pub title: String,
    pub column_index: u16,
    /// Style of the cell directly below the header (the data-row style).
    pub style: Option<StyleId>,
}

impl SheetHeaderEntry {
    /// Case-insensitive, trimmed title comparison.
    pub fn matches(&self, title: &str) -> bool {
        let wanted = title.trim();
        !wanted.is_empty() && self.title.trim().to_lowercase() == wanted.to_lowercase()
    }
}
