//! In-memory spreadsheet grid: workbook -> sheets -> cells.
//!
//! A [`Workbook`] is the scope-owned context threaded through column resolution and
//! row writing. It owns its sheets and its [`StyleTable`]; cells only hold [`StyleId`]
//! handles into that table.

pub mod codec;
pub mod layout;

use std::collections::BTreeMap;

use crate::error::{SheetError, SheetResult};
use crate::style::{StyleId, StyleTable};
use crate::types::CellValue;

pub use codec::ExcelType;

/// A single grid cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<StyleId>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self { value, style: None }
    }

    pub fn with_style(mut self, style: StyleId) -> Self {
        self.style = Some(style);
        self
    }
}

/// A single sheet of rows and columns (0-based indices).
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(u32, u16), Cell>,
    column_widths: BTreeMap<u16, f64>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Fetch the cell at `(row, col)`, creating an empty one when absent.
    pub fn cell_mut(&mut self, row: u32, col: u16) -> &mut Cell {
        self.cells.entry((row, col)).or_default()
    }

    pub fn value(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cell(row, col).map(|c| &c.value)
    }

    pub fn style_at(&self, row: u32, col: u16) -> Option<StyleId> {
        self.cell(row, col).and_then(|c| c.style)
    }

    pub fn set_value(&mut self, row: u32, col: u16, value: impl Into<CellValue>) {
        self.cell_mut(row, col).value = value.into();
    }

    pub fn set_cell(&mut self, row: u32, col: u16, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    /// Width in character units.
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    pub fn column_widths(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.column_widths.iter().map(|(c, w)| (*c, *w))
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u16), &Cell)> + '_ {
        self.cells.iter().map(|(k, c)| (*k, c))
    }

    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().map(|(r, _)| *r).max()
    }

    /// Existing cells of one row, ordered by column.
    pub fn row_cells(&self, row: u32) -> Vec<(u16, &Cell)> {
        self.cells
            .range((row, 0)..=(row, u16::MAX))
            .map(|((_, c), cell)| (*c, cell))
            .collect()
    }

    /// Existing cells of one column, ordered by row.
    pub fn column_cells(&self, col: u16) -> Vec<(u32, &Cell)> {
        self.cells
            .iter()
            .filter(|((_, c), _)| *c == col)
            .map(|((r, _), cell)| (*r, cell))
            .collect()
    }

    /// Every position of an inclusive rectangle, row-major, with its cell if present.
    pub fn cell_range(
        &self,
        first_row: u32,
        last_row: u32,
        first_col: u16,
        last_col: u16,
    ) -> SheetResult<Vec<((u32, u16), Option<&Cell>)>> {
        if last_row < first_row || last_col < first_col {
            return Err(SheetError::invalid(format!(
                "Invalid cell range: rows {}..={}, columns {}..={}",
                first_row, last_row, first_col, last_col
            )));
        }
        let mut out = Vec::new();
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                out.push(((row, col), self.cell(row, col)));
            }
        }
        Ok(out)
    }

    /// Remove every cell of a column. Other columns keep their positions.
    pub fn remove_column(&mut self, col: u16) {
        self.cells.retain(|(_, c), _| *c != col);
        self.column_widths.remove(&col);
    }
}

/// A workbook: ordered sheets plus the styles their cells refer to.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    styles: StyleTable,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: impl Into<String>) -> &mut Worksheet {
        self.sheets.push(Worksheet::new(name));
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub fn sheet(&self, index: usize) -> SheetResult<&Worksheet> {
        let count = self.sheets.len();
        self.sheets.get(index).ok_or_else(|| missing_sheet(index, count))
    }

    pub fn sheet_mut(&mut self, index: usize) -> SheetResult<&mut Worksheet> {
        let count = self.sheets.len();
        self.sheets
            .get_mut(index)
            .ok_or_else(|| missing_sheet(index, count))
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub fn styles_mut(&mut self) -> &mut StyleTable {
        &mut self.styles
    }

    /// Borrow a sheet and the style table at the same time.
    pub fn sheet_and_styles_mut(
        &mut self,
        index: usize,
    ) -> SheetResult<(&mut Worksheet, &mut StyleTable)> {
        let count = self.sheets.len();
        let sheet = self
            .sheets
            .get_mut(index)
            .ok_or_else(|| missing_sheet(index, count))?;
        Ok((sheet, &mut self.styles))
    }
}

fn missing_sheet(index: usize, count: usize) -> SheetError {
    SheetError::invalid(format!(
        "Sheet index {} out of range (workbook has {} sheets)",
        index, count
    ))
}
