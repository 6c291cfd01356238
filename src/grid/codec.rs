//! Workbook (de)serialization: xls/xlsx bytes -> [`Workbook`] -> xlsx bytes.
//!
//! Reading goes through `calamine` (both the legacy binary and the zipped variant);
//! persisting goes through `rust_xlsxwriter`, which only emits the zipped variant.
//! Styles and column widths of xlsx sources are attached from their [`TemplateLayout`].

use std::fmt::Display;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use calamine::{Data, Reader, Xls, Xlsx};
use chrono::{DateTime, NaiveDateTime};
use rust_xlsxwriter::Format;
use tracing::{debug, warn};

use super::layout::TemplateLayout;
use super::{Cell, Workbook};
use crate::error::{SheetError, SheetResult};
use crate::style::CellStyle;
use crate::types::{parse_datetime, CellValue, DEFAULT_DATE_FORMAT};

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch.
const UNIX_EPOCH_SERIAL: f64 = 25_569.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// The two accepted spreadsheet variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcelType {
    /// Legacy binary workbook (`.xls`)
    Xls,
    /// Zipped XML workbook (`.xlsx`)
    Xlsx,
}

impl ExcelType {
    pub fn extension(self) -> &'static str {
        match self {
            ExcelType::Xls => "xls",
            ExcelType::Xlsx => "xlsx",
        }
    }

    /// Accepts `xls`, `.XLSX`, `Xls` and so on.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim();
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        if ext.eq_ignore_ascii_case("xls") {
            Some(ExcelType::Xls)
        } else if ext.eq_ignore_ascii_case("xlsx") {
            Some(ExcelType::Xlsx)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// True when `path` is an existing, non-empty regular file with an accepted extension.
pub fn is_allowed_file(path: &Path) -> bool {
    ExcelType::from_path(path).is_some()
        && path
            .metadata()
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
}

/// Check a source path before reading it: accepted extension, existing non-empty file.
pub fn check_source(path: &Path) -> SheetResult<ExcelType> {
    let kind = ExcelType::from_path(path).ok_or_else(|| {
        SheetError::invalid(format!(
            "File format has to be xls or xlsx: {}",
            path.display()
        ))
    })?;
    if !is_allowed_file(path) {
        return Err(SheetError::invalid(format!(
            "Source must be an existing, non-empty file: {}",
            path.display()
        )));
    }
    Ok(kind)
}

/// Read and parse a workbook file.
pub fn open_path(path: &Path) -> SheetResult<Workbook> {
    let kind = check_source(path)?;
    let bytes = std::fs::read(path)?;
    open_workbook(&bytes, kind)
}

/// Parse workbook bytes of the declared variant.
pub fn open_workbook(bytes: &[u8], kind: ExcelType) -> SheetResult<Workbook> {
    let cursor = Cursor::new(bytes);
    match kind {
        ExcelType::Xlsx => {
            let mut reader: Xlsx<_> = Xlsx::new(cursor).map_err(|e| format_error(kind, e))?;
            let mut workbook = load_sheets(&mut reader, kind)?;
            match TemplateLayout::read(bytes) {
                Ok(layout) => layout.apply(&mut workbook)?,
                Err(e) => warn!(error = %e, "template layout unreadable, keeping values only"),
            }
            Ok(workbook)
        }
        ExcelType::Xls => {
            let mut reader: Xls<_> = Xls::new(cursor).map_err(|e| format_error(kind, e))?;
            load_sheets(&mut reader, kind)
        }
    }
}

fn format_error(kind: ExcelType, e: impl Display) -> SheetError {
    SheetError::Format(format!("not a valid .{} workbook: {}", kind.extension(), e))
}

fn load_sheets<RS, R>(reader: &mut R, kind: ExcelType) -> SheetResult<Workbook>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: Display,
{
    let mut workbook = Workbook::new();

    for name in reader.sheet_names() {
        let range = reader
            .worksheet_range(&name)
            .map_err(|e| format_error(kind, e))?;
        let (row0, col0) = range.start().unwrap_or((0, 0));

        let sheet = workbook.add_sheet(name.as_str());
        for (r, c, data) in range.used_cells() {
            let value = data_to_cell_value(data);
            if value == CellValue::Empty {
                continue;
            }
            let row = row0 + r as u32;
            let col = u16::try_from(col0 as usize + c).map_err(|_| {
                SheetError::Format(format!("column {} out of range in '{}'", col0 as usize + c, name))
            })?;
            sheet.set_cell(row, col, Cell::new(value));
        }
        debug!(sheet = %name, cells = sheet.cells().count(), "loaded sheet");
    }

    Ok(workbook)
}

fn data_to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
    }
}

/// Persist a workbook as xlsx bytes.
pub fn to_bytes(workbook: &Workbook) -> SheetResult<Vec<u8>> {
    let mut xlsx = rust_xlsxwriter::Workbook::new();

    let formats: Vec<Format> = workbook
        .styles()
        .iter()
        .map(CellStyle::to_format)
        .collect();
    let default_date = Format::new().set_num_format(DEFAULT_DATE_FORMAT);

    for sheet in workbook.sheets() {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(sheet.name())?;

        for (col, width) in sheet.column_widths() {
            worksheet.set_column_width(col, width)?;
        }

        for ((row, col), cell) in sheet.cells() {
            let format = cell.style.and_then(|id| formats.get(id.index()));
            match (&cell.value, format) {
                (value, Some(fmt)) if value.is_empty() => {
                    worksheet.write_blank(row, col, fmt)?;
                }
                (value, None) if value.is_empty() => {}
                (CellValue::Number(n), Some(fmt)) => {
                    worksheet.write_number_with_format(row, col, *n, fmt)?;
                }
                (CellValue::Number(n), None) => {
                    worksheet.write_number(row, col, *n)?;
                }
                (CellValue::Bool(b), Some(fmt)) => {
                    worksheet.write_boolean_with_format(row, col, *b, fmt)?;
                }
                (CellValue::Bool(b), None) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                (CellValue::Text(s), Some(fmt)) => {
                    worksheet.write_string_with_format(row, col, s.as_str(), fmt)?;
                }
                (CellValue::Text(s), None) => {
                    worksheet.write_string(row, col, s.as_str())?;
                }
                (CellValue::Empty, _) => {}
                (CellValue::Date(d), fmt) => {
                    // Dates are serial numbers displayed through a number format
                    let has_num_format = cell
                        .style
                        .and_then(|id| workbook.styles().get(id))
                        .is_some_and(|s| s.num_format.is_some());
                    let fmt = match fmt {
                        Some(fmt) if has_num_format => fmt,
                        _ => &default_date,
                    };
                    worksheet.write_number_with_format(row, col, datetime_to_serial(d), fmt)?;
                }
            }
        }
    }

    Ok(xlsx.save_to_buffer()?)
}

/// Persist a workbook into any sink.
pub fn persist<W: Write>(workbook: &Workbook, sink: &mut W) -> SheetResult<()> {
    let bytes = to_bytes(workbook)?;
    sink.write_all(&bytes)?;
    sink.flush()?;
    Ok(())
}

pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_SERIAL
}

pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let millis = ((serial - UNIX_EPOCH_SERIAL) * MILLIS_PER_DAY).round() as i64;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}
