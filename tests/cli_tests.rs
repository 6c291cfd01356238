//! CLI integration tests
//!
//! Runs the binary with assert_cmd against templates built in a temp dir.

#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

use assert_cmd::Command;
use predicates::prelude::*;
use sheetbind::grid::codec::{open_workbook, ExcelType};
use sheetbind::types::CellValue;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MAPPING: &str = r#"
sheet: 0
start_row: 1
columns:
  - field: id
    title: ID
    kind: integer
  - field: name
    title: Name
    prefix: "<"
    suffix: ">"
  - field: joined
    title: Joined
    date_format: yyyy-mm-dd
    kind: date
"#;

const DATA: &str = r#"[
  {"id": 1, "name": "Ann", "joined": "2020-01-01"},
  {"id": 2, "name": "Bo", "joined": null}
]"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "ID").unwrap();
        sheet.write_string(0, 1, "Name").unwrap();
        sheet.write_string(0, 2, "Joined").unwrap();
        fs::write(dir.path().join("template.xlsx"), workbook.save_to_buffer().unwrap()).unwrap();

        fs::write(dir.path().join("mapping.yaml"), MAPPING).unwrap();
        fs::write(dir.path().join("data.json"), DATA).unwrap();
        Fixture { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn sheetbind() -> Command {
    Command::cargo_bin("sheetbind").unwrap()
}

fn export(fx: &Fixture, output: &Path) -> assert_cmd::assert::Assert {
    sheetbind()
        .arg("export")
        .arg(fx.path("template.xlsx"))
        .arg("-m")
        .arg(fx.path("mapping.yaml"))
        .arg("-d")
        .arg(fx.path("data.json"))
        .arg("-o")
        .arg(output)
        .assert()
}

#[test]
fn test_cli_help() {
    sheetbind()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sheetbind"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    sheetbind()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sheetbind"));
}

#[test]
fn test_export_command() {
    let fx = Fixture::new();
    let output = fx.path("out.xlsx");

    export(&fx, &output)
        .success()
        .stdout(predicate::str::contains("2 rows written"))
        .stdout(predicate::str::contains("3 columns mapped"));

    let bytes = fs::read(&output).unwrap();
    let workbook = open_workbook(&bytes, ExcelType::Xlsx).unwrap();
    let sheet = workbook.sheet(0).unwrap();
    assert_eq!(sheet.value(1, 1), Some(&CellValue::from("<Ann>")));
    assert_eq!(sheet.value(2, 0), Some(&CellValue::Number(2.0)));
}

#[test]
fn test_export_then_import_command() {
    let fx = Fixture::new();
    let output = fx.path("out.xlsx");
    export(&fx, &output).success();

    sheetbind()
        .arg("import")
        .arg(&output)
        .arg("-m")
        .arg(fx.path("mapping.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Ann\""))
        .stdout(predicate::str::contains("\"joined\": \"2020-01-01 00:00:00\""))
        .stdout(predicate::str::contains("\"id\": 2"));
}

#[test]
fn test_import_command_writes_file() {
    let fx = Fixture::new();
    let output = fx.path("out.xlsx");
    export(&fx, &output).success();
    let json_path = fx.path("members.json");

    sheetbind()
        .arg("import")
        .arg(&output)
        .arg("-m")
        .arg(fx.path("mapping.yaml"))
        .arg("-o")
        .arg(&json_path)
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json.as_array().map(Vec::len), Some(2));
    assert_eq!(json[1]["name"], "Bo");
}

#[test]
fn test_headers_command() {
    let fx = Fixture::new();
    sheetbind()
        .arg("headers")
        .arg(fx.path("template.xlsx"))
        .assert()
        .success()
        .stdout(predicate::str::contains("ID"))
        .stdout(predicate::str::contains("Joined"));
}

#[test]
fn test_headers_command_marks_styled_columns() {
    let fx = Fixture::new();
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Amount").unwrap();
    sheet
        .write_blank(1, 0, &rust_xlsxwriter::Format::new().set_num_format("0.00"))
        .unwrap();
    let template = fx.path("styled.xlsx");
    fs::write(&template, workbook.save_to_buffer().unwrap()).unwrap();

    sheetbind()
        .arg("headers")
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::contains("Amount"))
        .stdout(predicate::str::contains("(styled)"));
}

#[test]
fn test_export_rejects_csv_template() {
    let fx = Fixture::new();
    let csv = fx.path("data.csv");
    fs::write(&csv, "ID\n").unwrap();

    sheetbind()
        .arg("export")
        .arg(&csv)
        .arg("-m")
        .arg(fx.path("mapping.yaml"))
        .arg("-d")
        .arg(fx.path("data.json"))
        .arg("-o")
        .arg(fx.path("out.xlsx"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("xls or xlsx"));
}

#[test]
fn test_export_rejects_empty_data() {
    let fx = Fixture::new();
    fs::write(fx.path("data.json"), "[]").unwrap();

    export(&fx, &fx.path("out.xlsx"))
        .failure()
        .stderr(predicate::str::contains("records cannot be empty"));
}

#[test]
fn test_export_rejects_bad_mapping() {
    let fx = Fixture::new();
    fs::write(fx.path("mapping.yaml"), "columns: [").unwrap();

    export(&fx, &fx.path("out.xlsx"))
        .failure()
        .stderr(predicate::str::contains("mapping config"));
}
