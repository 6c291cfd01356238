//! Writing one field value into one cell.

use crate::grid::Cell;
use crate::style::StyleTable;
use crate::types::{CellValue, ColumnMetadata, FieldValue};

/// Write `value` into `cell` following the column's rules.
///
/// - a null value is written as empty text
/// - a prefix or suffix turns the cell into text: `prefix + value + suffix`
/// - otherwise the value keeps its type; dates get the column's date format
///
/// The cell takes the column's resolved style, falling back to the style it already
/// had. Date formatting derives a new style so the shared one is left untouched.
pub fn write_cell(
    styles: &mut StyleTable,
    cell: &mut Cell,
    value: &FieldValue,
    meta: &ColumnMetadata,
) {
    let style = meta.resolved_style.or(cell.style);

    if meta.is_decorated() {
        cell.value = CellValue::Text(format!("{}{}{}", meta.prefix, value, meta.suffix));
        cell.style = style;
        return;
    }

    let (value, style) = match value {
        FieldValue::Null => (CellValue::Text(String::new()), style),
        FieldValue::Int(i) => (CellValue::Number(*i as f64), style),
        FieldValue::Float(f) => (CellValue::Number(*f), style),
        FieldValue::Bool(b) => (CellValue::Bool(*b), style),
        FieldValue::Text(s) => (CellValue::Text(s.clone()), style),
        FieldValue::Date(d) => (
            CellValue::Date(*d),
            Some(styles.derive_num_format(style, meta.effective_date_format())),
        ),
    };

    cell.value = value;
    cell.style = style;
}
