//! Record <-> sheet mapping engine
//!
//! - Export: records -> existing xls/xlsx template -> xlsx
//! - Import: xls/xlsx rows -> records

mod cell_writer;
mod exporter;
mod importer;
mod metadata;
mod resolver;
mod row_writer;

pub use cell_writer::write_cell;
pub use exporter::RecordExporter;
pub use importer::RecordImporter;
pub use metadata::extract_columns;
pub use resolver::{read_header_row, ColumnResolver, ResolveStrategy};
pub use row_writer::{RowWriter, WriteSummary};
