//! Column resolution: decide which sheet column every record field lands in.
//!
//! Three strategies, chosen once per resolution:
//! - **HeaderMap**: caller-supplied field -> title overrides, matched against the header row
//! - **ExplicitIndex**: at least one field declares a column index; only indexed fields are placed
//! - **TitleMatch**: fields are matched against the header row by their declared title
//!
//! Title matching is trimmed and case-insensitive. When a title repeats in the header
//! row, its first (leftmost) occurrence wins.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::metadata::extract_columns;
use crate::grid::Worksheet;
use crate::record::RecordSchema;
use crate::style::{self, StyleTable};
use crate::types::{ColumnMetadata, FieldColumnMap, HeaderMap, SheetHeaderEntry};

/// How fields are placed on the sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveStrategy<'a> {
    HeaderMap(&'a HeaderMap),
    ExplicitIndex(FieldColumnMap),
    TitleMatch(FieldColumnMap),
}

impl<'a> ResolveStrategy<'a> {
    /// A non-empty header map always wins; otherwise a single declared index switches
    /// the whole record to index placement.
    pub fn select(header_map: Option<&'a HeaderMap>, schema: &RecordSchema) -> Self {
        match header_map {
            Some(map) if !map.is_empty() => ResolveStrategy::HeaderMap(map),
            _ => {
                let fields = extract_columns(schema);
                if fields.values().any(|m| m.column_index.is_some()) {
                    ResolveStrategy::ExplicitIndex(fields)
                } else {
                    ResolveStrategy::TitleMatch(fields)
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResolveStrategy::HeaderMap(_) => "header-map",
            ResolveStrategy::ExplicitIndex(_) => "explicit-index",
            ResolveStrategy::TitleMatch(_) => "title-match",
        }
    }
}

/// Read the titles of a header row.
///
/// Each non-empty cell becomes an entry carrying the style of the cell directly below
/// it. A title that appears more than once keeps only its leftmost column.
pub fn read_header_row(sheet: &Worksheet, header_row: u32) -> Vec<SheetHeaderEntry> {
    let data_row = header_row.saturating_add(1);
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for (col, cell) in sheet.row_cells(header_row) {
        if cell.value.is_empty() {
            continue;
        }
        let title = cell.value.to_string();
        if !seen.insert(title.clone()) {
            continue;
        }
        entries.push(SheetHeaderEntry {
            title,
            column_index: col,
            style: sheet.style_at(data_row, col),
        });
    }

    entries
}

/// Resolves a record schema against one sheet's header row.
#[derive(Debug, Clone, Copy)]
pub struct ColumnResolver<'a> {
    header_row: u32,
    header_map: Option<&'a HeaderMap>,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(header_row: u32) -> Self {
        Self {
            header_row,
            header_map: None,
        }
    }

    pub fn with_header_map(mut self, header_map: Option<&'a HeaderMap>) -> Self {
        self.header_map = header_map;
        self
    }

    /// Produce the field -> column table. Fields that cannot be placed are omitted.
    ///
    /// Never fails: an undecodable style descriptor is logged and the sampled sheet
    /// style is kept. Resolving twice against an unchanged sheet gives the same table.
    pub fn resolve(
        &self,
        sheet: &Worksheet,
        styles: &mut StyleTable,
        schema: &RecordSchema,
    ) -> FieldColumnMap {
        let strategy = ResolveStrategy::select(self.header_map, schema);
        let name = strategy.name();

        let columns = match strategy {
            ResolveStrategy::HeaderMap(map) => self.by_header_map(sheet, map),
            ResolveStrategy::ExplicitIndex(fields) => self.by_index(sheet, fields),
            ResolveStrategy::TitleMatch(fields) => self.by_title(sheet, styles, fields),
        };

        debug!(
            sheet = %sheet.name(),
            strategy = name,
            header_row = self.header_row,
            columns = columns.len(),
            "resolved columns"
        );
        columns
    }

    fn by_header_map(&self, sheet: &Worksheet, map: &HeaderMap) -> FieldColumnMap {
        let headers = read_header_row(sheet, self.header_row);
        let mut columns = FieldColumnMap::new();

        for (field, title) in map {
            let field = field.trim();
            if field.is_empty() || columns.contains_key(field) {
                continue;
            }
            let Some(entry) = headers.iter().find(|h| h.matches(title)) else {
                debug!(field, title = %title, "no header column for field");
                continue;
            };
            columns.insert(
                field.to_string(),
                ColumnMetadata {
                    header_title: title.trim().to_string(),
                    column_index: Some(entry.column_index),
                    resolved_style: entry.style,
                    ..Default::default()
                },
            );
        }

        columns
    }

    fn by_index(&self, sheet: &Worksheet, fields: FieldColumnMap) -> FieldColumnMap {
        let data_row = self.header_row.saturating_add(1);

        fields
            .into_iter()
            .filter_map(|(field, mut meta)| {
                let col = meta.column_index?;
                meta.resolved_style = sheet.style_at(data_row, col);
                Some((field, meta))
            })
            .collect()
    }

    fn by_title(
        &self,
        sheet: &Worksheet,
        styles: &mut StyleTable,
        fields: FieldColumnMap,
    ) -> FieldColumnMap {
        let headers = read_header_row(sheet, self.header_row);
        let mut columns = FieldColumnMap::new();

        for (field, mut meta) in fields {
            // Plain fields match by their own name
            let title = if meta.header_title.trim().is_empty() {
                field.clone()
            } else {
                meta.header_title.clone()
            };
            let Some(entry) = headers.iter().find(|h| h.matches(&title)) else {
                debug!(field = %field, title = %title, "no header column for field");
                continue;
            };

            meta.column_index = Some(entry.column_index);
            meta.resolved_style = entry.style;

            match style::decode(&meta.style_descriptor) {
                Ok(Some(decoded)) => meta.resolved_style = Some(styles.intern(decoded)),
                Ok(None) => {}
                Err(e) => warn!(field = %field, error = %e, "ignoring style descriptor"),
            }

            columns.insert(field, meta);
        }

        columns
    }
}
