//! Record importer: read sheet rows back into records.
//!
//! Columns are resolved the same way the exporter resolves them, so a template
//! filled by [`RecordExporter`](super::RecordExporter) reads back into the same fields.

use std::path::Path;

use tracing::{debug, info};

use super::resolver::ColumnResolver;
use crate::error::SheetResult;
use crate::grid::codec::{self, ExcelType};
use crate::grid::Workbook;
use crate::record::{FromRow, RecordSchema, RowValues};
use crate::types::{CellValue, ColumnMetadata, HeaderMap};

/// Reads the rows below the header row of one sheet.
#[derive(Debug, Clone)]
pub struct RecordImporter {
    sheet_index: usize,
    header_row: u32,
    header_map: Option<HeaderMap>,
}

impl Default for RecordImporter {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl RecordImporter {
    /// `header_row` is 0-based; data starts on the next row.
    pub fn new(sheet_index: usize, header_row: u32) -> Self {
        Self {
            sheet_index,
            header_row,
            header_map: None,
        }
    }

    pub fn with_header_map(mut self, header_map: HeaderMap) -> Self {
        self.header_map = Some(header_map);
        self
    }

    pub fn import_file<R: FromRow>(&self, path: &Path, schema: &RecordSchema) -> SheetResult<Vec<R>> {
        let mut workbook = codec::open_path(path)?;
        let records = self.read_workbook(&mut workbook, schema)?;
        info!(path = %path.display(), records = records.len(), "imported records");
        Ok(records)
    }

    pub fn import_bytes<R: FromRow>(
        &self,
        bytes: &[u8],
        kind: ExcelType,
        schema: &RecordSchema,
    ) -> SheetResult<Vec<R>> {
        let mut workbook = codec::open_workbook(bytes, kind)?;
        self.read_workbook(&mut workbook, schema)
    }

    /// Convert every non-blank row below the header into a record.
    pub fn read_workbook<R: FromRow>(
        &self,
        workbook: &mut Workbook,
        schema: &RecordSchema,
    ) -> SheetResult<Vec<R>> {
        let (sheet, styles) = workbook.sheet_and_styles_mut(self.sheet_index)?;
        let columns = ColumnResolver::new(self.header_row)
            .with_header_map(self.header_map.as_ref())
            .resolve(sheet, styles, schema);

        let mut records = Vec::new();
        let Some(last_row) = sheet.last_row() else {
            return Ok(records);
        };

        for row in self.header_row.saturating_add(1)..=last_row {
            let mut values = RowValues::new(row);
            for (field, meta) in &columns {
                let Some(col) = meta.column_index else {
                    continue;
                };
                let value = sheet.value(row, col).cloned().unwrap_or_default();
                values.insert(field.as_str(), undecorate(value, meta));
            }
            if values.is_blank() {
                debug!(row, "skipping blank row");
                continue;
            }
            records.push(R::from_row(&values)?);
        }

        Ok(records)
    }
}

/// Strip a column's prefix and suffix from text written with them.
fn undecorate(value: CellValue, meta: &ColumnMetadata) -> CellValue {
    if !meta.is_decorated() {
        return value;
    }
    match value {
        CellValue::Text(text) => {
            let inner = text
                .strip_prefix(meta.prefix.as_str())
                .and_then(|t| t.strip_suffix(meta.suffix.as_str()));
            match inner {
                Some(inner) => CellValue::Text(inner.to_string()),
                None => CellValue::Text(text),
            }
        }
        other => other,
    }
}
