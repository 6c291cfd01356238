//! sheetbind - map typed records onto spreadsheet rows
//!
//! Fills existing xls/xlsx templates with records, one record per row, placing
//! each field under a header column and reusing the template's cell styles.
//!
//! # Features
//!
//! - Three placement strategies: field -> title map, explicit column index, header title match
//! - Case-insensitive, trimmed header matching (leftmost duplicate wins)
//! - Prefix/suffix decoration, per-column date formats, JSON style descriptors
//! - Reading filled sheets back into records
//!
//! # Example
//!
//! ```no_run
//! use indexmap::IndexMap;
//! use sheetbind::excel::RecordExporter;
//! use sheetbind::record::{ColumnSpec, Record, RecordSchema};
//! use sheetbind::types::FieldValue;
//! use std::path::Path;
//!
//! struct Person {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Record for Person {
//!     fn schema(&self) -> RecordSchema {
//!         RecordSchema::new()
//!             .column(ColumnSpec::new("id", "ID"))
//!             .column(ColumnSpec::new("name", "Name"))
//!     }
//!
//!     fn values(&self) -> IndexMap<String, FieldValue> {
//!         let mut values = IndexMap::new();
//!         values.insert("id".to_string(), self.id.into());
//!         values.insert("name".to_string(), (&self.name).into());
//!         values
//!     }
//! }
//!
//! let people = vec![Person { id: 1, name: "Ann".to_string() }];
//! RecordExporter::new(0, 1).save_as(
//!     Path::new("template.xlsx"),
//!     &people,
//!     Path::new("people.xlsx"),
//! )?;
//! # Ok::<(), sheetbind::error::SheetError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod excel;
pub mod grid;
pub mod record;
pub mod style;
pub mod types;

// Re-export commonly used types
pub use error::{SheetError, SheetResult};
pub use excel::{RecordExporter, RecordImporter};
pub use grid::{ExcelType, Workbook, Worksheet};
pub use record::{ColumnSpec, FromRow, Record, RecordSchema, RowValues};
pub use types::{CellValue, ColumnMetadata, FieldColumnMap, FieldValue, HeaderMap};
