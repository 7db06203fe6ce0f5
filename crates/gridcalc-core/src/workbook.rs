//! An in-memory [`DataModel`]

use crate::address::{CellAddress, CellRange};
use crate::error::{Error, Result};
use crate::model::{DataModel, TableInfo};
use crate::value::ScalarValue;
use crate::{MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN};
use ahash::AHashMap;

/// Scope of a defined name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    /// Visible from every sheet
    Workbook,
    /// Visible only from formulas on one sheet
    Sheet(usize),
}

#[derive(Debug, Clone)]
struct DefinedName {
    name: String,
    scope: NameScope,
    refers_to: String,
}

/// A sheet of sparse cell values
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    cells: AHashMap<(u32, u16), ScalarValue>,
}

impl Sheet {
    /// Sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of non-blank cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn used_range(&self) -> Option<CellRange> {
        let mut keys = self.cells.keys();
        let &(row, col) = keys.next()?;
        let (mut top, mut left, mut bottom, mut right) = (row, col, row, col);
        for &(row, col) in keys {
            top = top.min(row);
            bottom = bottom.max(row);
            left = left.min(col);
            right = right.max(col);
        }
        Some(CellRange::from_indices(top, left, bottom, right))
    }
}

/// Workbook held entirely in memory
///
/// Useful as a test fixture and for hosts that only need to evaluate
/// formulas over plain values.
///
/// ```
/// use gridcalc_core::{DataModel, MemoryWorkbook, ScalarValue};
///
/// let mut wb = MemoryWorkbook::new();
/// wb.set_value(0, "A1", 42.0).unwrap();
/// assert_eq!(wb.cell_value(0, 0, 0), ScalarValue::Number(42.0));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryWorkbook {
    sheets: Vec<Sheet>,
    names: Vec<DefinedName>,
    tables: Vec<TableInfo>,
    spills: AHashMap<(usize, u32, u16), CellRange>,
}

impl Default for MemoryWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWorkbook {
    /// Create a workbook with a single sheet named "Sheet1"
    pub fn new() -> Self {
        Self {
            sheets: vec![Sheet {
                name: "Sheet1".into(),
                cells: AHashMap::new(),
            }],
            names: Vec::new(),
            tables: Vec::new(),
            spills: AHashMap::new(),
        }
    }

    /// Add a sheet, returning its index
    pub fn add_sheet(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name)?;
        self.sheets.push(Sheet {
            name: name.to_string(),
            cells: AHashMap::new(),
        });
        Ok(self.sheets.len() - 1)
    }

    /// Get a sheet by index
    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    /// Set a cell by A1 address
    pub fn set_value<V: Into<ScalarValue>>(
        &mut self,
        sheet: usize,
        address: &str,
        value: V,
    ) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_value_at(sheet, addr.row, addr.col, value)
    }

    /// Set a cell by 0-based row/column; a blank value clears it
    pub fn set_value_at<V: Into<ScalarValue>>(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        let count = self.sheets.len();
        let target = self
            .sheets
            .get_mut(sheet)
            .ok_or(Error::SheetOutOfBounds(sheet, count))?;
        match value.into() {
            ScalarValue::Blank => {
                target.cells.remove(&(row, col));
            }
            value => {
                target.cells.insert((row, col), value);
            }
        }
        Ok(())
    }

    /// Define (or redefine) a name
    ///
    /// `refers_to` is formula text, with or without a leading `=`.
    pub fn define_name(&mut self, name: &str, scope: NameScope, refers_to: &str) -> Result<()> {
        if !is_valid_name(name) {
            return Err(Error::InvalidName(name.to_string()));
        }
        if let NameScope::Sheet(index) = scope {
            if index >= self.sheets.len() {
                return Err(Error::SheetOutOfBounds(index, self.sheets.len()));
            }
        }
        self.names
            .retain(|n| !(n.scope == scope && n.name.eq_ignore_ascii_case(name)));
        self.names.push(DefinedName {
            name: name.to_string(),
            scope,
            refers_to: refers_to.to_string(),
        });
        Ok(())
    }

    /// Register a table
    pub fn add_table(&mut self, table: TableInfo) -> Result<()> {
        if !is_valid_name(&table.name) {
            return Err(Error::InvalidName(table.name));
        }
        if table.sheet >= self.sheets.len() {
            return Err(Error::SheetOutOfBounds(table.sheet, self.sheets.len()));
        }
        if self
            .tables
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(&table.name))
        {
            return Err(Error::InvalidName(format!(
                "table '{}' already exists",
                table.name
            )));
        }
        if table.columns.len() != table.range.col_count() as usize {
            return Err(Error::InvalidRange(format!(
                "table '{}' has {} columns but spans {}",
                table.name,
                table.columns.len(),
                table.range.col_count()
            )));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Record the area a dynamic array anchored at `anchor` spills into
    pub fn set_spill(&mut self, sheet: usize, anchor: &str, extent: &str) -> Result<()> {
        let anchor = CellAddress::parse(anchor)?;
        let extent = CellRange::parse(extent)?;
        if !extent.contains(anchor.row, anchor.col) {
            return Err(Error::InvalidRange(format!(
                "spill {} does not contain its anchor {}",
                extent, anchor
            )));
        }
        self.spills.insert((sheet, anchor.row, anchor.col), extent);
        Ok(())
    }

    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }
        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }
        if name.starts_with('\'') || name.ends_with('\'') {
            return Err(Error::InvalidSheetName(
                "Sheet name cannot start or end with an apostrophe".into(),
            ));
        }
        if self.sheet_index(name).is_some() {
            return Err(Error::DuplicateSheetName(name.to_string()));
        }
        Ok(())
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '\\' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && CellAddress::parse(name).is_err()
}

impl DataModel for MemoryWorkbook {
    fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    fn sheet_name(&self, index: usize) -> Option<&str> {
        self.sheets.get(index).map(|s| s.name.as_str())
    }

    fn cell_value(&self, sheet: usize, row: u32, col: u16) -> ScalarValue {
        self.sheets
            .get(sheet)
            .and_then(|s| s.cells.get(&(row, col)))
            .cloned()
            .unwrap_or_default()
    }

    fn used_range(&self, sheet: usize) -> Option<CellRange> {
        self.sheets.get(sheet)?.used_range()
    }

    fn defined_name(&self, name: &str, sheet: usize) -> Option<&str> {
        let matching = |scope: NameScope| {
            self.names
                .iter()
                .find(|n| n.scope == scope && n.name.eq_ignore_ascii_case(name))
        };
        matching(NameScope::Sheet(sheet))
            .or_else(|| matching(NameScope::Workbook))
            .map(|n| n.refers_to.as_str())
    }

    fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    fn table_at(&self, sheet: usize, row: u32, col: u16) -> Option<&TableInfo> {
        self.tables
            .iter()
            .find(|t| t.sheet == sheet && t.range.contains(row, col))
    }

    fn spill_extent(&self, sheet: usize, row: u32, col: u16) -> Option<CellRange> {
        self.spills.get(&(sheet, row, col)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_and_get_values() {
        let mut wb = MemoryWorkbook::new();
        wb.set_value(0, "B2", 1.5).unwrap();
        wb.set_value(0, "D5", "x").unwrap();
        assert_eq!(wb.cell_value(0, 1, 1), ScalarValue::Number(1.5));
        assert_eq!(wb.cell_value(0, 0, 0), ScalarValue::Blank);
        assert_eq!(wb.used_range(0), Some(CellRange::parse("B2:D5").unwrap()));

        wb.set_value(0, "D5", ScalarValue::Blank).unwrap();
        assert_eq!(wb.used_range(0), Some(CellRange::parse("B2").unwrap()));
        assert!(wb.set_value(3, "A1", 1.0).is_err());
    }

    #[test]
    fn test_sheet_names() {
        let mut wb = MemoryWorkbook::new();
        assert_eq!(wb.add_sheet("Data").unwrap(), 1);
        assert_eq!(wb.sheet_index("data"), Some(1));
        assert_eq!(wb.sheet_name(1), Some("Data"));
        assert!(matches!(
            wb.add_sheet("DATA"),
            Err(Error::DuplicateSheetName(_))
        ));
        assert!(wb.add_sheet("a/b").is_err());
        assert!(wb.add_sheet("").is_err());
    }

    #[test]
    fn test_name_scopes() {
        let mut wb = MemoryWorkbook::new();
        wb.add_sheet("Other").unwrap();
        wb.define_name("Rate", NameScope::Workbook, "0.05").unwrap();
        wb.define_name("rate", NameScope::Sheet(1), "0.10").unwrap();
        assert_eq!(wb.defined_name("RATE", 0), Some("0.05"));
        assert_eq!(wb.defined_name("RATE", 1), Some("0.10"));
        assert!(wb.define_name("A1", NameScope::Workbook, "1").is_err());
        assert!(wb.define_name("1abc", NameScope::Workbook, "1").is_err());
    }

    #[test]
    fn test_tables_and_spills() {
        let mut wb = MemoryWorkbook::new();
        wb.add_table(TableInfo {
            name: "Orders".into(),
            sheet: 0,
            range: CellRange::parse("A1:B4").unwrap(),
            has_header: true,
            has_totals: false,
            columns: vec!["X".into(), "Y".into()],
        })
        .unwrap();
        assert!(wb.table("orders").is_some());
        assert!(wb.table_at(0, 2, 1).is_some());
        assert!(wb.table_at(0, 5, 1).is_none());

        wb.set_spill(0, "D1", "D1:D3").unwrap();
        assert_eq!(
            wb.spill_extent(0, 0, 3),
            Some(CellRange::parse("D1:D3").unwrap())
        );
        assert!(wb.set_spill(0, "E1", "D1:D3").is_err());
    }
}
