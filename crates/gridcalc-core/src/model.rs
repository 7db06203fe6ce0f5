//! The read-only data-model interface formulas are evaluated against

use crate::address::CellRange;
use crate::value::ScalarValue;

/// The cell a formula is evaluated in
///
/// Relative references and implicit intersection are resolved against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellOrigin {
    /// Sheet index
    pub sheet: usize,
    /// Row index (0-based)
    pub row: u32,
    /// Column index (0-based)
    pub col: u16,
}

impl CellOrigin {
    pub fn new(sheet: usize, row: u32, col: u16) -> Self {
        Self { sheet, row, col }
    }
}

/// A table (list object) the structured-reference syntax can address
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    /// Table name, matched case-insensitively
    pub name: String,
    /// Sheet the table lives on
    pub sheet: usize,
    /// Full table area, including header and totals rows
    pub range: CellRange,
    /// Whether the first row holds column headers
    pub has_header: bool,
    /// Whether the last row is a totals row
    pub has_totals: bool,
    /// Column names, left to right
    pub columns: Vec<String>,
}

impl TableInfo {
    /// Index of a column by name (case-insensitive)
    pub fn column_index(&self, name: &str) -> Option<u16> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .map(|i| i as u16)
    }

    /// The rows between the header and totals rows, `None` for an empty table
    pub fn data_range(&self) -> Option<CellRange> {
        let top = self.range.start.row + self.has_header as u32;
        let bottom = self.range.end.row.checked_sub(self.has_totals as u32)?;
        if top > bottom {
            return None;
        }
        Some(CellRange::from_indices(
            top,
            self.range.start.col,
            bottom,
            self.range.end.col,
        ))
    }

    /// The header row, if the table has one
    pub fn header_range(&self) -> Option<CellRange> {
        self.has_header.then(|| {
            CellRange::from_indices(
                self.range.start.row,
                self.range.start.col,
                self.range.start.row,
                self.range.end.col,
            )
        })
    }

    /// The totals row, if the table has one
    pub fn totals_range(&self) -> Option<CellRange> {
        self.has_totals.then(|| {
            CellRange::from_indices(
                self.range.end.row,
                self.range.start.col,
                self.range.end.row,
                self.range.end.col,
            )
        })
    }
}

/// Read access to workbook data
///
/// Implemented by whatever holds the cells. Evaluation only reads through
/// this trait; it never writes.
pub trait DataModel {
    /// Number of sheets
    fn sheet_count(&self) -> usize;

    /// Index of a sheet by name (case-insensitive)
    fn sheet_index(&self, name: &str) -> Option<usize>;

    /// Name of a sheet by index
    fn sheet_name(&self, index: usize) -> Option<&str>;

    /// Value of a single cell; unset cells are [`ScalarValue::Blank`]
    fn cell_value(&self, sheet: usize, row: u32, col: u16) -> ScalarValue;

    /// Bounding box of all non-blank cells, `None` for an empty sheet
    ///
    /// Whole-row and whole-column references are clipped to this area
    /// before their cells are enumerated.
    fn used_range(&self, sheet: usize) -> Option<CellRange>;

    /// Formula text a defined name refers to
    ///
    /// Sheet-scoped names on `sheet` shadow workbook-scoped ones.
    fn defined_name(&self, _name: &str, _sheet: usize) -> Option<&str> {
        None
    }

    /// A table by name
    fn table(&self, _name: &str) -> Option<&TableInfo> {
        None
    }

    /// The table containing a cell
    fn table_at(&self, _sheet: usize, _row: u32, _col: u16) -> Option<&TableInfo> {
        None
    }

    /// Area of the dynamic array anchored at a cell
    fn spill_extent(&self, _sheet: usize, _row: u32, _col: u16) -> Option<CellRange> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(has_header: bool, has_totals: bool) -> TableInfo {
        TableInfo {
            name: "Sales".into(),
            sheet: 0,
            range: CellRange::parse("B2:C6").unwrap(),
            has_header,
            has_totals,
            columns: vec!["Region".into(), "Amount".into()],
        }
    }

    #[test]
    fn test_table_parts() {
        let t = table(true, true);
        assert_eq!(t.data_range(), Some(CellRange::parse("B3:C5").unwrap()));
        assert_eq!(t.header_range(), Some(CellRange::parse("B2:C2").unwrap()));
        assert_eq!(t.totals_range(), Some(CellRange::parse("B6:C6").unwrap()));

        let t = table(false, false);
        assert_eq!(t.data_range(), Some(CellRange::parse("B2:C6").unwrap()));
        assert_eq!(t.header_range(), None);
    }

    #[test]
    fn test_column_index() {
        let t = table(true, false);
        assert_eq!(t.column_index("amount"), Some(1));
        assert_eq!(t.column_index("Missing"), None);
    }
}
