//! Record exporter: fill an existing xls/xlsx template with records.
//!
//! Every entry point validates its inputs (extension, source file, record list,
//! start row, target directory) before any workbook is opened. The workbook lives only inside
//! one call and is released on every exit path.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use super::row_writer::{RowWriter, WriteSummary};
use crate::error::{SheetError, SheetResult};
use crate::grid::codec::{self, ExcelType};
use crate::record::Record;
use crate::types::HeaderMap;

/// Writes records into sheet `sheet_index` of a template, starting at `start_row`
/// (0-based; the header is the row above).
#[derive(Debug, Clone)]
pub struct RecordExporter {
    sheet_index: usize,
    start_row: u32,
    header_map: Option<HeaderMap>,
}

impl Default for RecordExporter {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl RecordExporter {
    pub fn new(sheet_index: usize, start_row: u32) -> Self {
        Self {
            sheet_index,
            start_row,
            header_map: None,
        }
    }

    /// Place fields by these field -> header title pairs instead of their declarations.
    pub fn with_header_map(mut self, header_map: HeaderMap) -> Self {
        self.header_map = Some(header_map);
        self
    }

    /// Fill the template at `template` and return the resulting xlsx bytes.
    pub fn export_file<R: Record>(&self, template: &Path, records: &[R]) -> SheetResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.export_file_to(template, records, &mut buffer)?;
        Ok(buffer)
    }

    /// Fill the template at `template` and persist the result into `sink`.
    pub fn export_file_to<R: Record, W: Write>(
        &self,
        template: &Path,
        records: &[R],
        sink: &mut W,
    ) -> SheetResult<WriteSummary> {
        let kind = codec::check_source(template)?;
        validate_records(records)?;
        validate_start_row(self.start_row)?;

        let bytes = fs::read(template)?;
        self.export_bytes(&bytes, kind, records, sink)
    }

    /// Fill the template at `template` and save the result at `output`.
    ///
    /// The output's parent directory must already exist. Nothing is created at
    /// `output` when filling the template fails.
    pub fn save_as<R: Record>(
        &self,
        template: &Path,
        records: &[R],
        output: &Path,
    ) -> SheetResult<WriteSummary> {
        let kind = codec::check_source(template)?;
        validate_records(records)?;
        validate_start_row(self.start_row)?;
        validate_target_dir(output)?;

        let bytes = fs::read(template)?;
        let mut buffer = Vec::new();
        let summary = self.export_bytes(&bytes, kind, records, &mut buffer)?;
        fs::write(output, &buffer)?;

        info!(output = %output.display(), bytes = buffer.len(), "saved workbook");
        Ok(summary)
    }

    /// Fill template bytes of the declared variant and persist the result into `sink`.
    ///
    /// The result is always xlsx, whatever the source variant.
    pub fn export_bytes<R: Record, W: Write>(
        &self,
        source: &[u8],
        kind: ExcelType,
        records: &[R],
        sink: &mut W,
    ) -> SheetResult<WriteSummary> {
        validate_records(records)?;
        validate_start_row(self.start_row)?;
        if source.is_empty() {
            return Err(SheetError::invalid("template is empty"));
        }

        let mut workbook = codec::open_workbook(source, kind)?;
        let summary = RowWriter::new(self.sheet_index, self.start_row)
            .with_header_map(self.header_map.as_ref())
            .write_rows(&mut workbook, records)?;
        codec::persist(&workbook, sink)?;

        Ok(summary)
    }
}

fn validate_records<R>(records: &[R]) -> SheetResult<()> {
    if records.is_empty() {
        return Err(SheetError::invalid("records cannot be empty"));
    }
    Ok(())
}

fn validate_start_row(start_row: u32) -> SheetResult<()> {
    if start_row == 0 {
        return Err(SheetError::invalid(
            "start row must be at least 1 (row 0 is the header row)",
        ));
    }
    Ok(())
}

fn validate_target_dir(output: &Path) -> SheetResult<()> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(SheetError::invalid(format!(
            "Target directory does not exist: {}",
            dir.display()
        )));
    }
    Ok(())
}
