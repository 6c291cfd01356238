//! Field metadata extraction: record schema -> ordered field/column table.

use crate::record::{ColumnSpec, RecordSchema};
use crate::types::{ColumnMetadata, FieldColumnMap};

/// Build the field -> column metadata table for a record type.
///
/// Every declared field gets an entry in declaration order. Plain fields get default
/// metadata (no index, empty strings) so they can still be matched against a header
/// by title later. Ignored fields, and plain fields when the schema ignores
/// unannotated ones, are left out. A repeated field name keeps its first declaration.
pub fn extract_columns(schema: &RecordSchema) -> FieldColumnMap {
    let mut columns = FieldColumnMap::new();

    for spec in &schema.columns {
        if spec.ignore || (schema.ignore_unannotated && !spec.annotated) {
            continue;
        }
        if columns.contains_key(&spec.field) {
            continue;
        }
        columns.insert(spec.field.clone(), to_metadata(spec));
    }

    columns
}

fn to_metadata(spec: &ColumnSpec) -> ColumnMetadata {
    if !spec.annotated {
        return ColumnMetadata::default();
    }
    ColumnMetadata {
        header_title: spec.title.clone(),
        column_index: spec.index,
        width: spec.width,
        prefix: spec.prefix.clone(),
        suffix: spec.suffix.clone(),
        date_format: spec.date_format.clone(),
        style_descriptor: spec.style.clone(),
        resolved_style: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> RecordSchema {
        RecordSchema::new()
            .column(ColumnSpec::new("id", "ID").index(0).width(6))
            .field("note")
            .column(ColumnSpec::new("name", "Name").prefix("[").suffix("]"))
            .column(ColumnSpec::new("secret", "Secret").ignore())
    }

    #[test]
    fn test_extract_keeps_declaration_order() {
        let columns = extract_columns(&schema());
        let fields: Vec<&str> = columns.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["id", "note", "name"]);
    }

    #[test]
    fn test_extract_unannotated_defaults() {
        let columns = extract_columns(&schema());
        assert_eq!(columns["note"], ColumnMetadata::default());
        assert_eq!(columns["id"].column_index, Some(0));
        assert_eq!(columns["id"].width, 6);
        assert_eq!(columns["name"].prefix, "[");
        assert!(columns["name"].column_index.is_none());
    }

    #[test]
    fn test_extract_ignore_unannotated() {
        let columns = extract_columns(&schema().ignore_unannotated());
        assert!(!columns.contains_key("note"));
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_extract_duplicate_field_keeps_first() {
        let schema = RecordSchema::new()
            .column(ColumnSpec::new("id", "ID"))
            .column(ColumnSpec::new("id", "Other"));
        let columns = extract_columns(&schema);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns["id"].header_title, "ID");
    }
}
