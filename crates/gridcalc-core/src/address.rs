//! Cell addresses and rectangular areas

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "A1", "$B$2")
///
/// Rows and columns are 0-based. The `$` flags only matter to formula text
/// (they decide whether a reference moves when a formula is copied).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, ..., XFD=16383)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new cell address with relative references
    pub fn new(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, false, false)
    }

    /// Create a new cell address with specified absolute/relative flags
    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use gridcalc_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$B$2").unwrap();
    /// assert_eq!((addr.row, addr.col), (1, 1));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (col_absolute, rest) = strip_dollar(s);
        let letters_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if letters_end == 0 {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        let col = Self::letters_to_column(&rest[..letters_end])?;

        let (row_absolute, digits) = strip_dollar(&rest[letters_end..]);
        if digits.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        let row = parse_row_number(digits)
            .ok_or_else(|| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self::with_absolute(row, col, row_absolute, col_absolute))
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::with_capacity(3);
        let mut n = col as u32 + 1;
        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        letters.iter().rev().map(|&b| b as char).collect()
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() || letters.len() > 3 {
            return Err(Error::InvalidAddress(format!(
                "invalid column letters '{}'",
                letters
            )));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }

        let col = col - 1;
        if col >= MAX_COLS as u32 {
            return Err(Error::ColumnOutOfBounds(col as u16, MAX_COLS - 1));
        }
        Ok(col as u16)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            Self::column_to_letters(self.col),
            if self.row_absolute { "$" } else { "" },
            self.row + 1
        )
    }

    /// Move the address by a row/column delta, `None` if it leaves the grid
    pub fn offset(&self, rows: i64, cols: i64) -> Option<Self> {
        let row = self.row as i64 + rows;
        let col = self.col as i64 + cols;
        if row < 0 || row >= MAX_ROWS as i64 || col < 0 || col >= MAX_COLS as i64 {
            return None;
        }
        Some(Self::with_absolute(
            row as u32,
            col as u16,
            self.row_absolute,
            self.col_absolute,
        ))
    }
}

fn strip_dollar(s: &str) -> (bool, &str) {
    match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

/// Parse a 1-based row number into a 0-based index
fn parse_row_number(digits: &str) -> Option<u32> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match digits.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n - 1),
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular block of cells (e.g., "A1:B10")
///
/// Always normalized so `start` is the top-left and `end` the bottom-right
/// corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRange {
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl CellRange {
    /// Create a normalized range from two corners
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        let (top, top_abs, bottom, bottom_abs) = if a.row <= b.row {
            (a.row, a.row_absolute, b.row, b.row_absolute)
        } else {
            (b.row, b.row_absolute, a.row, a.row_absolute)
        };
        let (left, left_abs, right, right_abs) = if a.col <= b.col {
            (a.col, a.col_absolute, b.col, b.col_absolute)
        } else {
            (b.col, b.col_absolute, a.col, a.col_absolute)
        };
        Self {
            start: CellAddress::with_absolute(top, left, top_abs, left_abs),
            end: CellAddress::with_absolute(bottom, right, bottom_abs, right_abs),
        }
    }

    /// Create a range from row/column indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// The whole-row range `first:last` (e.g. `3:5`)
    pub fn rows(first: u32, last: u32) -> Self {
        Self::from_indices(first, 0, last, MAX_COLS - 1)
    }

    /// The whole-column range `first:last` (e.g. `B:D`)
    pub fn columns(first: u16, last: u16) -> Self {
        Self::from_indices(0, first, MAX_ROWS - 1, last)
    }

    /// Parse a range from A1:B10 notation
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?)),
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Get the total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Whether the range covers exactly one cell
    pub fn is_single_cell(&self) -> bool {
        self.start.row == self.end.row && self.start.col == self.end.col
    }

    /// Get the intersection of two ranges, if any
    pub fn intersect(&self, other: &CellRange) -> Option<CellRange> {
        let top = self.start.row.max(other.start.row);
        let bottom = self.end.row.min(other.end.row);
        let left = self.start.col.max(other.start.col);
        let right = self.end.col.min(other.end.col);
        if top > bottom || left > right {
            return None;
        }
        Some(CellRange::from_indices(top, left, bottom, right))
    }

    /// The smallest range covering both ranges
    pub fn bounding(&self, other: &CellRange) -> CellRange {
        CellRange::from_indices(
            self.start.row.min(other.start.row),
            self.start.col.min(other.start.col),
            self.end.row.max(other.end.row),
            self.end.col.max(other.end.col),
        )
    }

    /// Iterate over all cell addresses in the range (row by row)
    pub fn cells(&self) -> CellRangeIterator {
        CellRangeIterator {
            range: *self,
            next: Some((self.start.row, self.start.col)),
        }
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start.to_a1_string(), self.end.to_a1_string())
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over cells in a range, row-major
pub struct CellRangeIterator {
    range: CellRange,
    next: Option<(u32, u16)>,
}

impl Iterator for CellRangeIterator {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        let (row, col) = self.next?;
        self.next = if col < self.range.end.col {
            Some((row, col + 1))
        } else if row < self.range.end.row {
            Some((row + 1, self.range.start.col))
        } else {
            None
        };
        Some(CellAddress::new(row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(701), "ZZ");
        assert_eq!(CellAddress::column_to_letters(16383), "XFD");

        assert_eq!(CellAddress::letters_to_column("a").unwrap(), 0);
        assert_eq!(CellAddress::letters_to_column("AB").unwrap(), 27);
        assert_eq!(CellAddress::letters_to_column("XFD").unwrap(), 16383);
        assert!(CellAddress::letters_to_column("XFE").is_err());
        assert!(CellAddress::letters_to_column("ABCD").is_err());
    }

    #[test]
    fn test_cell_address_parse() {
        let addr = CellAddress::parse("C10").unwrap();
        assert_eq!((addr.row, addr.col), (9, 2));
        assert!(!addr.row_absolute && !addr.col_absolute);

        let addr = CellAddress::parse("$A1").unwrap();
        assert!(addr.col_absolute);
        assert!(!addr.row_absolute);

        let addr = CellAddress::parse("XFD1048576").unwrap();
        assert_eq!((addr.row, addr.col), (1048575, 16383));

        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("A").is_err());
        assert!(CellAddress::parse("1").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("A1048577").is_err());
        assert!(CellAddress::parse("A1x").is_err());
    }

    #[test]
    fn test_offset() {
        let addr = CellAddress::new(1, 1);
        assert_eq!(addr.offset(-1, 2), Some(CellAddress::new(0, 3)));
        assert_eq!(addr.offset(-2, 0), None);
        assert_eq!(CellAddress::new(0, MAX_COLS - 1).offset(0, 1), None);
    }

    #[test]
    fn test_range_normalizes() {
        let range = CellRange::parse("C3:A1").unwrap();
        assert_eq!(range.to_a1_string(), "A1:C3");
        assert_eq!(range.row_count(), 3);
        assert_eq!(range.col_count(), 3);
        assert!(range.contains(1, 1));
        assert!(!range.contains(3, 0));
    }

    #[test]
    fn test_range_intersect_and_bounding() {
        let a = CellRange::parse("A1:C3").unwrap();
        let b = CellRange::parse("B2:D4").unwrap();
        assert_eq!(a.intersect(&b), Some(CellRange::parse("B2:C3").unwrap()));
        assert_eq!(a.bounding(&b), CellRange::parse("A1:D4").unwrap());
        assert_eq!(a.intersect(&CellRange::parse("E5").unwrap()), None);
    }

    #[test]
    fn test_range_cells() {
        let cells: Vec<_> = CellRange::parse("A1:B2").unwrap().cells().collect();
        assert_eq!(
            cells,
            vec![
                CellAddress::new(0, 0),
                CellAddress::new(0, 1),
                CellAddress::new(1, 0),
                CellAddress::new(1, 1),
            ]
        );
    }

    #[test]
    fn test_whole_rows_and_columns() {
        assert_eq!(CellRange::columns(1, 2).row_count(), MAX_ROWS);
        assert_eq!(CellRange::rows(4, 4).col_count(), MAX_COLS);
    }
}
