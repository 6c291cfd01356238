//! Record reflection: how a record type declares its columns and exposes its values.
//!
//! Column declarations are built once per type with [`RecordSchema`] / [`ColumnSpec`]
//! instead of being discovered at runtime:
//!
//! ```
//! use sheetbind::record::{ColumnSpec, RecordSchema};
//!
//! let schema = RecordSchema::new()
//!     .column(ColumnSpec::new("id", "ID").index(0).width(8))
//!     .column(ColumnSpec::new("joined", "Joined").index(2).date_format("yyyy-MM-dd"))
//!     .field("internal_note");
//! assert_eq!(schema.columns.len(), 3);
//! ```

use chrono::NaiveDateTime;
use indexmap::IndexMap;

use crate::error::{SheetError, SheetResult};
use crate::types::{CellValue, FieldValue};

/// Declared column metadata of one record field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSpec {
    pub field: String,
    pub title: String,
    pub index: Option<u16>,
    pub width: u32,
    pub prefix: String,
    pub suffix: String,
    pub date_format: String,
    /// Style descriptor (JSON)
    pub style: String,
    /// False for plain fields declared without column metadata.
    pub annotated: bool,
    /// Never written or read.
    pub ignore: bool,
}

impl ColumnSpec {
    /// An annotated field mapped to the header `title`.
    pub fn new(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            title: title.into(),
            annotated: true,
            ..Default::default()
        }
    }

    /// A field without any column declaration.
    pub fn plain(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn index(mut self, index: u16) -> Self {
        self.index = Some(index);
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    pub fn style(mut self, descriptor: impl Into<String>) -> Self {
        self.style = descriptor.into();
        self
    }

    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }
}

/// All fields of a record type, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSchema {
    pub columns: Vec<ColumnSpec>,
    /// Drop fields that carry no column declaration.
    pub ignore_unannotated: bool,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    pub fn field(self, name: impl Into<String>) -> Self {
        self.column(ColumnSpec::plain(name))
    }

    pub fn ignore_unannotated(mut self) -> Self {
        self.ignore_unannotated = true;
        self
    }
}

/// A record that can be written as one spreadsheet row.
pub trait Record {
    /// Column declarations for this record's type.
    fn schema(&self) -> RecordSchema;

    /// Field name -> value, in declaration order.
    fn values(&self) -> IndexMap<String, FieldValue>;
}

/// A record that can be rebuilt from one spreadsheet row.
pub trait FromRow: Sized {
    fn from_row(row: &RowValues) -> SheetResult<Self>;
}

/// The mapped cells of one sheet row, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowValues {
    row: u32,
    values: IndexMap<String, CellValue>,
}

impl RowValues {
    pub fn new(row: u32) -> Self {
        Self {
            row,
            values: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: CellValue) {
        self.values.insert(field.into(), value);
    }

    /// 0-based sheet row these values came from.
    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.values.get(field).filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when every mapped cell is empty.
    pub fn is_blank(&self) -> bool {
        self.values.values().all(CellValue::is_empty)
    }

    /// Text form of a cell; missing cells read as an empty string.
    pub fn text(&self, field: &str) -> String {
        self.get(field).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn f64(&self, field: &str) -> SheetResult<f64> {
        self.required(field)?
            .as_f64()
            .ok_or_else(|| self.conversion(field, "a number"))
    }

    pub fn i64(&self, field: &str) -> SheetResult<i64> {
        let n = self.f64(field)?;
        if n.fract() != 0.0 {
            return Err(self.conversion(field, "an integer"));
        }
        Ok(n as i64)
    }

    pub fn bool(&self, field: &str) -> SheetResult<bool> {
        self.required(field)?
            .as_bool()
            .ok_or_else(|| self.conversion(field, "a boolean"))
    }

    pub fn datetime(&self, field: &str) -> SheetResult<NaiveDateTime> {
        self.required(field)?
            .as_datetime()
            .ok_or_else(|| self.conversion(field, "a date"))
    }

    fn required(&self, field: &str) -> SheetResult<&CellValue> {
        self.get(field).ok_or_else(|| {
            SheetError::Conversion(format!("row {}: field '{}' is empty", self.row + 1, field))
        })
    }

    fn conversion(&self, field: &str, expected: &str) -> SheetError {
        let found = self.get(field).map(|v| v.to_string()).unwrap_or_default();
        SheetError::Conversion(format!(
            "row {}: field '{}' is not {} ('{}')",
            self.row + 1,
            field,
            expected,
            found
        ))
    }
}
