//! YAML mapping configuration and schema-driven records.
//!
//! A mapping file describes one record type without Rust code:
//!
//! ```yaml
//! sheet: 0
//! start_row: 1
//! columns:
//!   - field: id
//!     title: ID
//!     index: 0
//!     kind: integer
//!   - field: joined
//!     title: Joined
//!     date_format: yyyy-MM-dd
//!     kind: date
//! ```
//!
//! Records for such a schema are [`DynamicRecord`]s, built from JSON objects on
//! export and turned back into JSON on import.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{SheetError, SheetResult};
use crate::grid::codec::serial_to_datetime;
use crate::record::{ColumnSpec, FromRow, Record, RecordSchema, RowValues};
use crate::types::{parse_datetime, CellValue, FieldValue, HeaderMap, DATE_DISPLAY_FORMAT};

fn default_start_row() -> u32 {
    1
}

/// Parsed mapping file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// 0-based sheet index
    #[serde(default)]
    pub sheet: usize,
    /// 0-based row of the first record; the header is the row above
    #[serde(default = "default_start_row")]
    pub start_row: u32,
    /// field -> header title overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_map: Option<HeaderMap>,
    #[serde(default)]
    pub ignore_unannotated: bool,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// Value type a column's JSON data is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Integer,
    Number,
    Boolean,
    Date,
}

/// One `columns:` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub field: String,
    pub title: Option<String>,
    /// Negative values mean "no index"
    pub index: Option<i32>,
    pub width: u32,
    pub prefix: String,
    pub suffix: String,
    pub date_format: String,
    /// Style descriptor (JSON)
    pub style: String,
    pub kind: Option<ValueKind>,
    pub ignore: bool,
}

impl ColumnConfig {
    fn column_index(&self) -> SheetResult<Option<u16>> {
        match self.index {
            Some(i) if i >= 0 => u16::try_from(i).map(Some).map_err(|_| {
                SheetError::invalid(format!("column '{}': index {} out of range", self.field, i))
            }),
            _ => Ok(None),
        }
    }

    /// True when the entry declares nothing beyond its field name.
    fn is_plain(&self) -> bool {
        self.title.is_none()
            && self.width == 0
            && self.prefix.is_empty()
            && self.suffix.is_empty()
            && self.date_format.is_empty()
            && self.style.is_empty()
    }

    fn to_spec(&self) -> SheetResult<ColumnSpec> {
        let index = self.column_index()?;
        if index.is_none() && self.is_plain() {
            let mut spec = ColumnSpec::plain(&self.field);
            spec.ignore = self.ignore;
            return Ok(spec);
        }

        let mut spec = ColumnSpec::new(&self.field, self.title.clone().unwrap_or_default())
            .width(self.width)
            .prefix(&self.prefix)
            .suffix(&self.suffix)
            .date_format(&self.date_format)
            .style(&self.style);
        spec.index = index;
        spec.ignore = self.ignore;
        Ok(spec)
    }
}

impl MappingConfig {
    pub fn load(path: &Path) -> SheetResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            SheetError::invalid(format!("cannot read mapping {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> SheetResult<Self> {
        let config: MappingConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SheetResult<()> {
        if self.columns.is_empty() && self.header_map.as_ref().map_or(true, |m| m.is_empty()) {
            return Err(SheetError::invalid("mapping declares no columns"));
        }
        for column in &self.columns {
            if column.field.trim().is_empty() {
                return Err(SheetError::invalid("mapping column without a field name"));
            }
        }
        Ok(())
    }

    pub fn schema(&self) -> SheetResult<RecordSchema> {
        let mut schema = RecordSchema::new();
        for column in &self.columns {
            schema = schema.column(column.to_spec()?);
        }
        schema.ignore_unannotated = self.ignore_unannotated;
        Ok(schema)
    }

    /// field -> declared value kind
    pub fn kinds(&self) -> HashMap<String, ValueKind> {
        self.columns
            .iter()
            .filter_map(|c| c.kind.map(|k| (c.field.clone(), k)))
            .collect()
    }

    /// Build one record per JSON object of `data` (an array, or a single object).
    pub fn records_from_json(&self, data: &Value) -> SheetResult<Vec<DynamicRecord>> {
        let schema = Arc::new(self.schema()?);
        let kinds = self.kinds();

        let items: Vec<&Value> = match data {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![data],
            other => {
                return Err(SheetError::invalid(format!(
                    "record data must be a JSON array or object, found {}",
                    json_type(other)
                )))
            }
        };

        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let Value::Object(object) = item else {
                    return Err(SheetError::invalid(format!(
                        "record {} is a JSON {}, expected an object",
                        i + 1,
                        json_type(item)
                    )));
                };
                let mut values = IndexMap::new();
                for (field, value) in object {
                    let kind = kinds.get(field).copied();
                    let value = json_to_field(value, kind).map_err(|e| {
                        SheetError::Conversion(format!("record {}: field '{}': {}", i + 1, field, e))
                    })?;
                    values.insert(field.clone(), value);
                }
                Ok(DynamicRecord::new(Arc::clone(&schema), values))
            })
            .collect()
    }

    /// Coerce imported records to the declared column kinds.
    pub fn apply_kinds(&self, records: Vec<DynamicRecord>) -> SheetResult<Vec<DynamicRecord>> {
        let schema = Arc::new(self.schema()?);
        let kinds = self.kinds();

        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| -> SheetResult<DynamicRecord> {
                let values = record
                    .values
                    .into_iter()
                    .map(|(field, value)| -> SheetResult<(String, FieldValue)> {
                        let value = match kinds.get(&field) {
                            Some(kind) => coerce_field(value, *kind).map_err(|e| {
                                SheetError::Conversion(format!(
                                    "record {}: field '{}': {}",
                                    i + 1,
                                    field,
                                    e
                                ))
                            })?,
                            None => value,
                        };
                        Ok((field, value))
                    })
                    .collect::<SheetResult<IndexMap<_, _>>>()?;
                Ok(DynamicRecord::new(Arc::clone(&schema), values))
            })
            .collect()
    }
}

/// A record whose fields are described at runtime by a shared schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    schema: Arc<RecordSchema>,
    values: IndexMap<String, FieldValue>,
}

impl DynamicRecord {
    pub fn new(schema: Arc<RecordSchema>, values: IndexMap<String, FieldValue>) -> Self {
        Self { schema, values }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// JSON object form; dates become `YYYY-MM-DD HH:MM:SS` strings.
    pub fn to_json(&self) -> Value {
        let object: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), field_to_json(v)))
            .collect();
        Value::Object(object)
    }
}

impl Record for DynamicRecord {
    fn schema(&self) -> RecordSchema {
        (*self.schema).clone()
    }

    fn values(&self) -> IndexMap<String, FieldValue> {
        self.values.clone()
    }
}

impl FromRow for DynamicRecord {
    fn from_row(row: &RowValues) -> SheetResult<Self> {
        let values = row
            .iter()
            .map(|(field, value)| (field.to_string(), cell_to_field(value)))
            .collect();
        Ok(DynamicRecord::new(Arc::default(), values))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn json_to_field(value: &Value, kind: Option<ValueKind>) -> Result<FieldValue, String> {
    if value.is_null() {
        return Ok(FieldValue::Null);
    }
    match (kind, value) {
        (None, Value::Bool(b)) => Ok(FieldValue::Bool(*b)),
        (None, Value::Number(n)) => Ok(number_to_field(n)),
        (None, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
        (None, other) => Ok(FieldValue::Text(other.to_string())),

        (Some(ValueKind::Text), Value::String(s)) => Ok(FieldValue::Text(s.clone())),
        (Some(ValueKind::Text), other) => Ok(FieldValue::Text(other.to_string())),

        (Some(ValueKind::Integer), Value::Number(n)) => n
            .as_i64()
            .map(FieldValue::Int)
            .ok_or_else(|| format!("{} is not an integer", n)),
        (Some(ValueKind::Integer), Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| format!("'{}' is not an integer", s)),

        (Some(ValueKind::Number), Value::Number(n)) => n
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| format!("{} is not a number", n)),
        (Some(ValueKind::Number), Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| format!("'{}' is not a number", s)),

        (Some(ValueKind::Boolean), Value::Bool(b)) => Ok(FieldValue::Bool(*b)),
        (Some(ValueKind::Boolean), Value::String(s)) => parse_bool(s),

        (Some(ValueKind::Date), Value::String(s)) => parse_datetime(s)
            .map(FieldValue::Date)
            .ok_or_else(|| format!("'{}' is not a date", s)),

        (Some(kind), other) => Err(format!(
            "expected {:?}, found JSON {}",
            kind,
            json_type(other)
        )),
    }
}

fn parse_bool(s: &str) -> Result<FieldValue, String> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(FieldValue::Bool(true)),
        "false" | "no" | "0" => Ok(FieldValue::Bool(false)),
        _ => Err(format!("'{}' is not a boolean", s)),
    }
}

/// Convert a value read from a cell to a declared kind.
fn coerce_field(value: FieldValue, kind: ValueKind) -> Result<FieldValue, String> {
    match (kind, value) {
        (_, FieldValue::Null) => Ok(FieldValue::Null),

        (ValueKind::Text, FieldValue::Text(s)) => Ok(FieldValue::Text(s)),
        (ValueKind::Text, other) => Ok(FieldValue::Text(other.to_string())),

        (ValueKind::Integer, FieldValue::Int(i)) => Ok(FieldValue::Int(i)),
        (ValueKind::Integer, FieldValue::Float(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
            Ok(FieldValue::Int(f as i64))
        }
        (ValueKind::Integer, FieldValue::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| format!("'{}' is not an integer", s)),

        (ValueKind::Number, FieldValue::Int(i)) => Ok(FieldValue::Float(i as f64)),
        (ValueKind::Number, FieldValue::Float(f)) => Ok(FieldValue::Float(f)),
        (ValueKind::Number, FieldValue::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| format!("'{}' is not a number", s)),

        (ValueKind::Boolean, FieldValue::Bool(b)) => Ok(FieldValue::Bool(b)),
        (ValueKind::Boolean, FieldValue::Int(i)) if i == 0 || i == 1 => {
            Ok(FieldValue::Bool(i == 1))
        }
        (ValueKind::Boolean, FieldValue::Text(s)) => parse_bool(&s),

        (ValueKind::Date, FieldValue::Date(d)) => Ok(FieldValue::Date(d)),
        (ValueKind::Date, FieldValue::Int(i)) => serial_to_datetime(i as f64)
            .map(FieldValue::Date)
            .ok_or_else(|| format!("{} is not a date serial", i)),
        (ValueKind::Date, FieldValue::Float(f)) => serial_to_datetime(f)
            .map(FieldValue::Date)
            .ok_or_else(|| format!("{} is not a date serial", f)),
        (ValueKind::Date, FieldValue::Text(s)) => parse_datetime(&s)
            .map(FieldValue::Date)
            .ok_or_else(|| format!("'{}' is not a date", s)),

        (kind, other) => Err(format!("cannot read '{}' as {:?}", other, kind)),
    }
}

fn number_to_field(n: &Number) -> FieldValue {
    match n.as_i64() {
        Some(i) => FieldValue::Int(i),
        None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn cell_to_field(value: &CellValue) -> FieldValue {
    match value {
        CellValue::Empty => FieldValue::Null,
        CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => FieldValue::Int(*n as i64),
        CellValue::Number(n) => FieldValue::Float(*n),
        CellValue::Bool(b) => FieldValue::Bool(*b),
        CellValue::Text(s) => FieldValue::Text(s.clone()),
        CellValue::Date(d) => FieldValue::Date(*d),
    }
}

fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Int(i) => Value::from(*i),
        FieldValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::Date(d) => Value::String(d.format(DATE_DISPLAY_FORMAT).to_string()),
    }
}
