//! Template export / import tests against real xlsx bytes

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use rust_xlsxwriter::{Color, Format};
use sheetbind::excel::{read_header_row, RecordExporter, RecordImporter};
use sheetbind::grid::codec::{open_workbook, ExcelType};
use sheetbind::grid::Workbook;
use sheetbind::record::{ColumnSpec, FromRow, Record, RecordSchema, RowValues};
use sheetbind::style::CellStyle;
use sheetbind::types::{CellValue, FieldValue, HeaderMap};
use sheetbind::SheetResult;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ═══════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
struct Member {
    id: i64,
    name: String,
    joined: Option<NaiveDateTime>,
}

fn member_schema() -> RecordSchema {
    RecordSchema::new()
        .column(ColumnSpec::new("id", "ID").width(8))
        .column(ColumnSpec::new("name", "Name").prefix("[").suffix("]"))
        .column(ColumnSpec::new("joined", "Joined").date_format("yyyy-mm-dd"))
}

impl Record for Member {
    fn schema(&self) -> RecordSchema {
        member_schema()
    }

    fn values(&self) -> IndexMap<String, FieldValue> {
        let mut values = IndexMap::new();
        values.insert("id".to_string(), self.id.into());
        values.insert("name".to_string(), (&self.name).into());
        values.insert("joined".to_string(), self.joined.into());
        values
    }
}

impl FromRow for Member {
    fn from_row(row: &RowValues) -> SheetResult<Self> {
        Ok(Member {
            id: row.i64("id")?,
            name: row.text("name"),
            joined: match row.get("joined") {
                Some(_) => Some(row.datetime("joined")?),
                None => None,
            },
        })
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn members() -> Vec<Member> {
    vec![
        Member {
            id: 1,
            name: "Ann".to_string(),
            joined: Some(date(2020, 1, 1)),
        },
        Member {
            id: 2,
            name: "Bo".to_string(),
            joined: None,
        },
    ]
}

/// A one-sheet xlsx template with the given titles in row 0.
fn template_bytes(titles: &[(u16, &str)]) -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Members").unwrap();
    for (col, title) in titles {
        sheet.write_string(0, *col, *title).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

fn template_file(dir: &Path, titles: &[(u16, &str)]) -> PathBuf {
    let path = dir.join("template.xlsx");
    std::fs::write(&path, template_bytes(titles)).unwrap();
    path
}

fn standard_titles() -> Vec<(u16, &'static str)> {
    vec![(0, "ID"), (1, "Name"), (2, "Joined")]
}

// ═══════════════════════════════════════════════════════════════════════════
// EXPORT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_export_fills_rows_below_header() {
    let template = template_bytes(&standard_titles());
    let mut out = Vec::new();
    let summary = RecordExporter::new(0, 1)
        .export_bytes(&template, ExcelType::Xlsx, &members(), &mut out)
        .unwrap();

    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.columns, 3);
    assert_eq!(summary.next_row, 3);

    let workbook = open_workbook(&out, ExcelType::Xlsx).unwrap();
    let sheet = workbook.sheet(0).unwrap();

    assert_eq!(sheet.name(), "Members");
    assert_eq!(sheet.value(0, 0), Some(&CellValue::from("ID")));
    assert_eq!(sheet.value(1, 0), Some(&CellValue::Number(1.0)));
    assert_eq!(sheet.value(1, 1), Some(&CellValue::from("[Ann]")));
    assert_eq!(
        sheet.value(1, 2).and_then(CellValue::as_datetime),
        Some(date(2020, 1, 1))
    );
    assert_eq!(sheet.value(2, 0), Some(&CellValue::Number(2.0)));
    assert_eq!(sheet.value(2, 1), Some(&CellValue::from("[Bo]")));
    // A null field is written as empty text
    assert!(sheet.value(2, 2).map_or(true, CellValue::is_empty));
}

/// Same fields placed by explicit column index.
struct IndexedMember(Member);

impl Record for IndexedMember {
    fn schema(&self) -> RecordSchema {
        RecordSchema::new()
            .column(ColumnSpec::new("id", "ID").index(0).width(6))
            .column(ColumnSpec::new("name", "Name").index(1))
            .column(ColumnSpec::new("joined", "Joined").index(2).date_format("yyyy-MM-dd"))
    }

    fn values(&self) -> IndexMap<String, FieldValue> {
        self.0.values()
    }
}

#[test]
fn test_export_by_explicit_index() {
    let template = template_bytes(&standard_titles());
    let records = vec![
        IndexedMember(Member {
            id: 1,
            name: "Ann".to_string(),
            joined: Some(date(2020, 1, 1)),
        }),
        IndexedMember(Member {
            id: 2,
            name: "Bo".to_string(),
            joined: Some(date(2021, 6, 15)),
        }),
    ];

    let mut out = Vec::new();
    let summary = RecordExporter::new(0, 1)
        .export_bytes(&template, ExcelType::Xlsx, &records, &mut out)
        .unwrap();
    assert_eq!(summary.rows_written, 2);

    let workbook = open_workbook(&out, ExcelType::Xlsx).unwrap();
    let sheet = workbook.sheet(0).unwrap();

    let header: Vec<String> = sheet.row_cells(0).iter().map(|(_, c)| c.value.to_string()).collect();
    assert_eq!(header, vec!["ID", "Name", "Joined"]);

    assert_eq!(sheet.value(1, 0), Some(&CellValue::Number(1.0)));
    assert_eq!(sheet.value(1, 1), Some(&CellValue::from("Ann")));
    assert_eq!(sheet.value(1, 2).and_then(CellValue::as_datetime), Some(date(2020, 1, 1)));
    assert_eq!(sheet.value(2, 0), Some(&CellValue::Number(2.0)));
    assert_eq!(sheet.value(2, 1), Some(&CellValue::from("Bo")));
    assert_eq!(sheet.value(2, 2).and_then(CellValue::as_datetime), Some(date(2021, 6, 15)));
    assert_eq!(sheet.last_row(), Some(2));
}

#[test]
fn test_export_matches_titles_case_insensitively() {
    let template = template_bytes(&[(0, "  id "), (1, "NAME"), (2, "joined")]);
    let mut out = Vec::new();
    let summary = RecordExporter::new(0, 1)
        .export_bytes(&template, ExcelType::Xlsx, &members(), &mut out)
        .unwrap();
    assert_eq!(summary.columns, 3);

    let workbook = open_workbook(&out, ExcelType::Xlsx).unwrap();
    let sheet = workbook.sheet(0).unwrap();
    assert_eq!(sheet.value(1, 1), Some(&CellValue::from("[Ann]")));
}

#[test]
fn test_export_duplicate_title_uses_leftmost_column() {
    let template = template_bytes(&[(2, "Name"), (5, "Name")]);
    let mut out = Vec::new();
    RecordExporter::new(0, 1)
        .export_bytes(&template, ExcelType::Xlsx, &members(), &mut out)
        .unwrap();

    let workbook = open_workbook(&out, ExcelType::Xlsx).unwrap();
    let sheet = workbook.sheet(0).unwrap();
    assert_eq!(sheet.value(1, 2), Some(&CellValue::from("[Ann]")));
    assert_eq!(sheet.value(1, 5), None);
}

#[test]
fn test_export_with_header_map() {
    let template = template_bytes(&[(0, "Member Name"), (3, "Number")]);
    let map: HeaderMap = [
        ("name".to_string(), "member name".to_string()),
        ("id".to_string(), "Number".to_string()),
    ]
    .into_iter()
    .collect();

    let mut out = Vec::new();
    RecordExporter::new(0, 1)
        .with_header_map(map)
        .export_bytes(&template, ExcelType::Xlsx, &members(), &mut out)
        .unwrap();

    let workbook = open_workbook(&out, ExcelType::Xlsx).unwrap();
    let sheet = workbook.sheet(0).unwrap();
    // Header-map placement carries no decoration
    assert_eq!(sheet.value(1, 0), Some(&CellValue::from("Ann")));
    assert_eq!(sheet.value(2, 3), Some(&CellValue::Number(2.0)));
}

#[test]
fn test_export_start_row_leaves_rows_above_untouched() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Member report").unwrap();
    sheet.write_string(2, 0, "ID").unwrap();
    sheet.write_string(2, 1, "Name").unwrap();
    let template = workbook.save_to_buffer().unwrap();

    let mut out = Vec::new();
    RecordExporter::new(0, 3)
        .export_bytes(&template, ExcelType::Xlsx, &members(), &mut out)
        .unwrap();

    let workbook = open_workbook(&out, ExcelType::Xlsx).unwrap();
    let sheet = workbook.sheet(0).unwrap();
    assert_eq!(sheet.value(0, 0), Some(&CellValue::from("Member report")));
    assert_eq!(sheet.value(3, 0), Some(&CellValue::Number(1.0)));
    assert_eq!(sheet.value(4, 1), Some(&CellValue::from("[Bo]")));
}

#[test]
fn test_save_as_writes_file() {
    let dir = TempDir::new().unwrap();
    let template = template_file(dir.path(), &standard_titles());
    let output = dir.path().join("members.xlsx");

    let summary = RecordExporter::default()
        .save_as(&template, &members(), &output)
        .unwrap();
    assert_eq!(summary.rows_written, 2);

    let bytes = std::fs::read(&output).unwrap();
    let workbook = open_workbook(&bytes, ExcelType::Xlsx).unwrap();
    assert_eq!(
        workbook.sheet(0).unwrap().value(2, 0),
        Some(&CellValue::Number(2.0))
    );
}

#[test]
fn test_export_file_and_export_bytes_agree() {
    let dir = TempDir::new().unwrap();
    let template = template_file(dir.path(), &standard_titles());

    let from_file = RecordExporter::default()
        .export_file(&template, &members())
        .unwrap();
    let mut from_bytes = Vec::new();
    RecordExporter::default()
        .export_bytes(
            &std::fs::read(&template).unwrap(),
            ExcelType::Xlsx,
            &members(),
            &mut from_bytes,
        )
        .unwrap();

    let a = open_workbook(&from_file, ExcelType::Xlsx).unwrap();
    let b = open_workbook(&from_bytes, ExcelType::Xlsx).unwrap();
    let cells_a: Vec<_> = a.sheet(0).unwrap().cells().map(|(k, c)| (k, c.value.clone())).collect();
    let cells_b: Vec<_> = b.sheet(0).unwrap().cells().map(|(k, c)| (k, c.value.clone())).collect();
    assert_eq!(cells_a, cells_b);
}

// ═══════════════════════════════════════════════════════════════════════════
// TEMPLATE STYLES
// ═══════════════════════════════════════════════════════════════════════════

/// Filled bold headers; the first data row carries the column looks.
fn styled_template() -> Vec<u8> {
    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xDDEBF7));

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Members").unwrap();
    for (col, title) in standard_titles() {
        sheet.write_string_with_format(0, col, title, &header).unwrap();
    }
    sheet.write_blank(1, 0, &Format::new().set_bold()).unwrap();
    sheet.write_blank(1, 1, &Format::new().set_italic()).unwrap();
    sheet
        .write_blank(1, 2, &Format::new().set_background_color(Color::RGB(0xFFFF00)))
        .unwrap();
    sheet.set_column_width(1, 30).unwrap();
    workbook.save_to_buffer().unwrap()
}

fn style_at(workbook: &Workbook, row: u32, col: u16) -> Option<&CellStyle> {
    let id = workbook.sheet(0).unwrap().style_at(row, col)?;
    workbook.styles().get(id)
}

#[test]
fn test_open_template_reads_styles_and_widths() {
    let workbook = open_workbook(&styled_template(), ExcelType::Xlsx).unwrap();
    let sheet = workbook.sheet(0).unwrap();

    assert_eq!(sheet.column_width(1), Some(30.0));
    assert!(sheet.value(1, 0).is_some_and(CellValue::is_empty));

    let headers = read_header_row(sheet, 0);
    assert_eq!(headers.len(), 3);
    assert!(headers.iter().all(|h| h.style.is_some()));
    assert!(style_at(&workbook, 1, 0).is_some_and(|s| s.bold));
}

#[test]
fn test_export_keeps_template_styles() {
    let mut out = Vec::new();
    RecordExporter::new(0, 1)
        .export_bytes(&styled_template(), ExcelType::Xlsx, &members(), &mut out)
        .unwrap();

    let workbook = open_workbook(&out, ExcelType::Xlsx).unwrap();
    let sheet = workbook.sheet(0).unwrap();

    let header = style_at(&workbook, 0, 0).unwrap();
    assert!(header.bold);
    assert_eq!(header.background_color.as_deref(), Some("#DDEBF7"));

    // Every written row takes the look of the row below the header
    for row in 1..=2 {
        assert!(style_at(&workbook, row, 0).is_some_and(|s| s.bold));
        assert!(style_at(&workbook, row, 1).is_some_and(|s| s.italic));
    }
    assert_eq!(sheet.value(1, 1), Some(&CellValue::from("[Ann]")));

    let joined = style_at(&workbook, 1, 2).unwrap();
    assert_eq!(joined.background_color.as_deref(), Some("#FFFF00"));
    assert_eq!(joined.num_format.as_deref(), Some("yyyy-mm-dd"));
    assert_eq!(
        sheet.value(1, 2).and_then(CellValue::as_datetime),
        Some(date(2020, 1, 1))
    );

    // The null date of the second record stays a blank cell with the fill
    assert!(sheet.value(2, 2).is_some_and(CellValue::is_empty));
    assert!(style_at(&workbook, 2, 2).is_some_and(|s| s.background_color.is_some()));

    assert_eq!(sheet.column_width(0), Some(8.0));
    assert_eq!(sheet.column_width(1), Some(30.0));
}

#[test]
fn test_export_persists_declared_width() {
    let template = template_bytes(&standard_titles());
    let mut out = Vec::new();
    RecordExporter::new(0, 1)
        .export_bytes(&template, ExcelType::Xlsx, &members(), &mut out)
        .unwrap();

    let workbook = open_workbook(&out, ExcelType::Xlsx).unwrap();
    let sheet = workbook.sheet(0).unwrap();
    assert_eq!(sheet.column_width(0), Some(8.0));
    assert_eq!(sheet.column_width(1), None);
}

#[test]
fn test_export_by_explicit_index_uses_template_styles() {
    let records = vec![IndexedMember(Member {
        id: 1,
        name: "Ann".to_string(),
        joined: Some(date(2020, 1, 1)),
    })];

    let mut out = Vec::new();
    RecordExporter::new(0, 1)
        .export_bytes(&styled_template(), ExcelType::Xlsx, &records, &mut out)
        .unwrap();

    let workbook = open_workbook(&out, ExcelType::Xlsx).unwrap();
    assert!(style_at(&workbook, 1, 0).is_some_and(|s| s.bold));
    assert!(style_at(&workbook, 1, 1).is_some_and(|s| s.italic));

    let joined = style_at(&workbook, 1, 2).unwrap();
    assert_eq!(joined.background_color.as_deref(), Some("#FFFF00"));
    assert_eq!(joined.num_format.as_deref(), Some("yyyy-MM-dd"));
    assert_eq!(workbook.sheet(0).unwrap().column_width(0), Some(6.0));
}

// ═══════════════════════════════════════════════════════════════════════════
// IMPORT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_export_then_import_round_trip() {
    let dir = TempDir::new().unwrap();
    let template = template_file(dir.path(), &standard_titles());
    let output = dir.path().join("members.xlsx");
    RecordExporter::default()
        .save_as(&template, &members(), &output)
        .unwrap();

    let imported: Vec<Member> = RecordImporter::new(0, 0)
        .import_file(&output, &member_schema())
        .unwrap();

    assert_eq!(imported, members());
}

#[test]
fn test_import_ignores_unmapped_columns() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Name").unwrap();
    sheet.write_string(0, 1, "Comment").unwrap();
    sheet.write_string(0, 2, "ID").unwrap();
    sheet.write_string(1, 0, "[Cy]").unwrap();
    sheet.write_string(1, 1, "ignored").unwrap();
    sheet.write_number(1, 2, 9).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let imported: Vec<Member> = RecordImporter::default()
        .import_bytes(&bytes, ExcelType::Xlsx, &member_schema())
        .unwrap();

    assert_eq!(
        imported,
        vec![Member {
            id: 9,
            name: "Cy".to_string(),
            joined: None,
        }]
    );
}
