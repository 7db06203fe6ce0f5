//! # gridcalc-core
//!
//! Core data structures for the gridcalc formula engine.
//!
//! This crate provides:
//! - [`ScalarValue`] and [`ErrorCode`] - single cell values and spreadsheet errors
//! - [`CellAddress`] and [`CellRange`] - cell addressing and rectangular areas
//! - [`DataModel`] - the read-only interface formulas are evaluated against
//! - [`MemoryWorkbook`] - an in-memory implementation of [`DataModel`]
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::{DataModel, MemoryWorkbook, ScalarValue};
//!
//! let mut workbook = MemoryWorkbook::new();
//! workbook.set_value(0, "A1", "Hello").unwrap();
//! workbook.set_value_at(0, 1, 0, 3.5).unwrap();
//!
//! assert_eq!(workbook.cell_value(0, 1, 0), ScalarValue::Number(3.5));
//! ```

pub mod address;
pub mod error;
pub mod model;
pub mod value;
pub mod workbook;

// Re-exports for convenience
pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use error::{Error, Result};
pub use model::{CellOrigin, DataModel, TableInfo};
pub use value::{format_number, ErrorCode, ScalarValue};
pub use workbook::{MemoryWorkbook, NameScope, Sheet};

/// Maximum number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
