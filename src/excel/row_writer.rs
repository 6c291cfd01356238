//! Batch row writing: one record per row, starting below a template header.

use tracing::{debug, info};

use super::cell_writer::write_cell;
use super::resolver::ColumnResolver;
use crate::error::{SheetError, SheetResult};
use crate::grid::Workbook;
use crate::record::Record;
use crate::types::HeaderMap;

/// Outcome of a batch write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows_written: usize,
    /// Absent record slots that were passed over.
    pub skipped: usize,
    /// Resolved columns used for every row.
    pub columns: usize,
    /// First row after the written block.
    pub next_row: u32,
}

/// Writes records into consecutive rows of one sheet.
///
/// `start_row` is the 0-based row of the first record; the header row is the one
/// right above it, so `start_row` must be at least 1.
#[derive(Debug, Clone, Copy)]
pub struct RowWriter<'a> {
    sheet_index: usize,
    start_row: u32,
    header_map: Option<&'a HeaderMap>,
}

impl<'a> RowWriter<'a> {
    pub fn new(sheet_index: usize, start_row: u32) -> Self {
        Self {
            sheet_index,
            start_row,
            header_map: None,
        }
    }

    pub fn with_header_map(mut self, header_map: Option<&'a HeaderMap>) -> Self {
        self.header_map = header_map;
        self
    }

    pub fn write_rows<R: Record>(
        &self,
        workbook: &mut Workbook,
        records: &[R],
    ) -> SheetResult<WriteSummary> {
        self.write_slots(workbook, records.iter().map(Some).collect())
    }

    /// Like [`write_rows`](Self::write_rows), but `None` slots are skipped without
    /// consuming a row.
    pub fn write_optional_rows<R: Record>(
        &self,
        workbook: &mut Workbook,
        records: &[Option<R>],
    ) -> SheetResult<WriteSummary> {
        self.write_slots(workbook, records.iter().map(Option::as_ref).collect())
    }

    fn write_slots<R: Record>(
        &self,
        workbook: &mut Workbook,
        slots: Vec<Option<&R>>,
    ) -> SheetResult<WriteSummary> {
        if slots.is_empty() {
            return Err(SheetError::invalid("records cannot be empty"));
        }
        let Some(first) = slots.iter().flatten().next() else {
            return Err(SheetError::invalid("records contain no present entries"));
        };
        let Some(header_row) = self.start_row.checked_sub(1) else {
            return Err(SheetError::invalid(
                "start row must be at least 1 (row 0 is the header row)",
            ));
        };

        let (sheet, styles) = workbook.sheet_and_styles_mut(self.sheet_index)?;
        let columns = ColumnResolver::new(header_row)
            .with_header_map(self.header_map)
            .resolve(sheet, styles, &first.schema());

        let mut row = self.start_row;
        let mut rows_written = 0;
        let mut skipped = 0;

        for slot in slots {
            let Some(record) = slot else {
                skipped += 1;
                continue;
            };
            for (field, value) in record.values() {
                let Some(meta) = columns.get(&field) else {
                    continue;
                };
                let Some(col) = meta.column_index else {
                    continue;
                };
                write_cell(styles, sheet.cell_mut(row, col), &value, meta);
                if row == self.start_row && meta.width > 0 {
                    sheet.set_column_width(col, f64::from(meta.width));
                }
            }
            debug!(row, "wrote row");
            row = row.checked_add(1).ok_or_else(|| {
                SheetError::Export(format!("row index overflow after row {}", row))
            })?;
            rows_written += 1;
        }

        info!(
            sheet = %sheet.name(),
            rows = rows_written,
            skipped,
            columns = columns.len(),
            "wrote records"
        );

        Ok(WriteSummary {
            rows_written,
            skipped,
            columns: columns.len(),
            next_row: row,
        })
    }
}
