//! Runtime values produced while evaluating a formula

use gridcalc_core::{CellRange, DataModel, ErrorCode, ScalarValue};

/// Most cells an evaluated array may hold; larger shapes are `#NUM!`
pub const MAX_ARRAY_CELLS: u64 = 1 << 24;

/// A dense rows x columns grid of scalar values
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    rows: usize,
    cols: usize,
    data: Vec<ScalarValue>,
}

impl ArrayValue {
    /// Create an array from row-major data
    ///
    /// # Panics
    ///
    /// If `data.len() != rows * cols` or either dimension is zero.
    pub fn new(rows: usize, cols: usize, data: Vec<ScalarValue>) -> Self {
        assert!(rows > 0 && cols > 0, "array dimensions must be non-zero");
        assert_eq!(data.len(), rows * cols, "array data does not match shape");
        Self { rows, cols, data }
    }

    /// Whether a `rows` x `cols` array stays within [`MAX_ARRAY_CELLS`]
    pub fn fits(rows: usize, cols: usize) -> bool {
        (rows as u64).saturating_mul(cols as u64) <= MAX_ARRAY_CELLS
    }

    /// An array where every cell holds the same value
    pub fn filled(rows: usize, cols: usize, value: ScalarValue) -> Self {
        Self::new(rows, cols, vec![value; rows * cols])
    }

    /// A 1x1 array
    pub fn single(value: ScalarValue) -> Self {
        Self::new(1, 1, vec![value])
    }

    /// Build from nested rows, `None` if empty or ragged
    pub fn from_rows(rows: Vec<Vec<ScalarValue>>) -> Option<Self> {
        let cols = rows.first()?.len();
        if cols == 0 || rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let count = rows.len();
        Some(Self::new(count, cols, rows.into_iter().flatten().collect()))
    }

    /// Build from a per-cell closure
    pub fn from_fn(
        rows: usize,
        cols: usize,
        mut f: impl FnMut(usize, usize) -> ScalarValue,
    ) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self::new(rows, cols, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Value at a position, `None` if out of bounds
    pub fn get(&self, row: usize, col: usize) -> Option<&ScalarValue> {
        (row < self.rows && col < self.cols).then(|| &self.data[row * self.cols + col])
    }

    pub fn top_left(&self) -> &ScalarValue {
        &self.data[0]
    }

    /// All values, row-major
    pub fn values(&self) -> impl Iterator<Item = &ScalarValue> {
        self.data.iter()
    }

    /// Iterate rows as slices
    pub fn row_slices(&self) -> impl Iterator<Item = &[ScalarValue]> {
        self.data.chunks(self.cols)
    }

    pub fn into_values(self) -> Vec<ScalarValue> {
        self.data
    }

    pub fn transpose(&self) -> ArrayValue {
        ArrayValue::from_fn(self.cols, self.rows, |r, c| self.data[c * self.cols + r].clone())
    }

    /// Expand to `rows` x `cols`
    ///
    /// A dimension of size 1 is repeated; cells past the end of any other
    /// dimension become `#N/A`.
    pub fn broadcast_to(&self, rows: usize, cols: usize) -> ArrayValue {
        if rows == self.rows && cols == self.cols {
            return self.clone();
        }
        ArrayValue::from_fn(rows, cols, |r, c| {
            let src_r = if self.rows == 1 { 0 } else { r };
            let src_c = if self.cols == 1 { 0 } else { c };
            self.get(src_r, src_c)
                .cloned()
                .unwrap_or(ScalarValue::Error(ErrorCode::Na))
        })
    }

    /// Apply a function to every element
    pub fn map(&self, mut f: impl FnMut(&ScalarValue) -> ScalarValue) -> ArrayValue {
        ArrayValue {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(&mut f).collect(),
        }
    }
}

/// One rectangular area on one sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetArea {
    pub sheet: usize,
    pub range: CellRange,
}

impl SheetArea {
    pub fn new(sheet: usize, range: CellRange) -> Self {
        Self { sheet, range }
    }
}

/// A reference that has not been read yet
///
/// Holds one area for ordinary references, several for unions and 3D
/// references. Shape queries never touch cell data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceValue {
    areas: Vec<SheetArea>,
}

impl ReferenceValue {
    /// A reference to one area
    pub fn area(sheet: usize, range: CellRange) -> Self {
        Self {
            areas: vec![SheetArea::new(sheet, range)],
        }
    }

    /// A reference made of several areas; `None` if `areas` is empty
    pub fn from_areas(areas: Vec<SheetArea>) -> Option<Self> {
        (!areas.is_empty()).then(|| Self { areas })
    }

    pub fn areas(&self) -> &[SheetArea] {
        &self.areas
    }

    /// The only area, if there is exactly one
    pub fn single_area(&self) -> Option<&SheetArea> {
        match self.areas.as_slice() {
            [area] => Some(area),
            _ => None,
        }
    }

    /// Row count; multi-area references count as a single cell
    pub fn rows(&self) -> usize {
        self.single_area()
            .map_or(1, |a| a.range.row_count() as usize)
    }

    /// Column count; multi-area references count as a single cell
    pub fn cols(&self) -> usize {
        self.single_area()
            .map_or(1, |a| a.range.col_count() as usize)
    }

    /// Value at a position relative to the top-left of a single-area reference
    pub fn cell(&self, model: &dyn DataModel, row: usize, col: usize) -> ScalarValue {
        match self.single_area() {
            Some(area) if row < self.rows() && col < self.cols() => model.cell_value(
                area.sheet,
                area.range.start.row + row as u32,
                area.range.start.col + col as u16,
            ),
            Some(_) => ScalarValue::Error(ErrorCode::Ref),
            None => ScalarValue::Error(ErrorCode::Value),
        }
    }

    /// Read every cell into an array
    ///
    /// Multi-area references cannot form an array and yield 1x1 `#VALUE!`.
    /// Cells beyond the sheet's used range are filled in as blanks without
    /// asking the model.
    pub fn to_array(&self, model: &dyn DataModel) -> ArrayValue {
        let Some(area) = self.single_area() else {
            return ArrayValue::single(ScalarValue::Error(ErrorCode::Value));
        };
        if !ArrayValue::fits(self.rows(), self.cols()) {
            return ArrayValue::single(ScalarValue::Error(ErrorCode::Num));
        }
        let used = model.used_range(area.sheet);
        let start = area.range.start;
        ArrayValue::from_fn(self.rows(), self.cols(), |r, c| {
            let row = start.row + r as u32;
            let col = start.col + c as u16;
            match used {
                Some(used) if used.contains(row, col) => model.cell_value(area.sheet, row, col),
                _ => ScalarValue::Blank,
            }
        })
    }

    /// Visit the cells of every area that fall inside the used range
    ///
    /// Cells outside the used range are blank and are skipped, so whole
    /// row and column references cost only as much as the data they cover.
    pub fn for_each_cell(
        &self,
        model: &dyn DataModel,
        mut f: impl FnMut(ScalarValue) -> Result<(), ErrorCode>,
    ) -> Result<(), ErrorCode> {
        for area in &self.areas {
            let Some(used) = model.used_range(area.sheet) else {
                continue;
            };
            let Some(clipped) = area.range.intersect(&used) else {
                continue;
            };
            for addr in clipped.cells() {
                f(model.cell_value(area.sheet, addr.row, addr.col))?;
            }
        }
        Ok(())
    }
}

/// The value of any evaluated sub-expression
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    Scalar(ScalarValue),
    Array(ArrayValue),
    Reference(ReferenceValue),
}

impl AnyValue {
    pub fn number(n: f64) -> Self {
        AnyValue::Scalar(ScalarValue::Number(n))
    }

    pub fn error(e: ErrorCode) -> Self {
        AnyValue::Scalar(ScalarValue::Error(e))
    }

    pub fn text<S: Into<String>>(s: S) -> Self {
        AnyValue::Scalar(ScalarValue::Text(s.into()))
    }

    pub fn logical(b: bool) -> Self {
        AnyValue::Scalar(ScalarValue::Logical(b))
    }

    pub fn rows(&self) -> usize {
        match self {
            AnyValue::Scalar(_) => 1,
            AnyValue::Array(a) => a.rows(),
            AnyValue::Reference(r) => r.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            AnyValue::Scalar(_) => 1,
            AnyValue::Array(a) => a.cols(),
            AnyValue::Reference(r) => r.cols(),
        }
    }

    /// Whether the value covers more than one cell
    pub fn is_multi(&self) -> bool {
        match self {
            AnyValue::Reference(r) => r.single_area().is_none() || self.rows() * self.cols() > 1,
            _ => self.rows() * self.cols() > 1,
        }
    }

    /// Reduce to one scalar
    ///
    /// Arrays give their top-left element, single-cell references their
    /// value; anything else that spans several cells is `#VALUE!`.
    pub fn to_single(&self, model: &dyn DataModel) -> ScalarValue {
        match self {
            AnyValue::Scalar(v) => v.clone(),
            AnyValue::Array(a) => a.top_left().clone(),
            AnyValue::Reference(r) if !self.is_multi() => r.cell(model, 0, 0),
            AnyValue::Reference(_) => ScalarValue::Error(ErrorCode::Value),
        }
    }

    /// Expand to an array; scalars become 1x1
    pub fn to_array(&self, model: &dyn DataModel) -> ArrayValue {
        match self {
            AnyValue::Scalar(v) => ArrayValue::single(v.clone()),
            AnyValue::Array(a) => a.clone(),
            AnyValue::Reference(r) => r.to_array(model),
        }
    }

    /// Dereference a reference into a plain value, keeping scalars and arrays
    pub fn deref(self, model: &dyn DataModel) -> AnyValue {
        match self {
            AnyValue::Reference(r) if r.single_area().is_some() && r.rows() * r.cols() == 1 => {
                AnyValue::Scalar(r.cell(model, 0, 0))
            }
            AnyValue::Reference(r) => AnyValue::Array(r.to_array(model)),
            other => other,
        }
    }

    /// Visit every scalar the value holds
    ///
    /// References are visited within the used range only.
    pub fn for_each_value(
        &self,
        model: &dyn DataModel,
        mut f: impl FnMut(ScalarValue) -> Result<(), ErrorCode>,
    ) -> Result<(), ErrorCode> {
        match self {
            AnyValue::Scalar(v) => f(v.clone()),
            AnyValue::Array(a) => a.values().try_for_each(|v| f(v.clone())),
            AnyValue::Reference(r) => r.for_each_cell(model, f),
        }
    }

    /// The error held by a scalar value
    pub fn as_error(&self) -> Option<ErrorCode> {
        match self {
            AnyValue::Scalar(ScalarValue::Error(e)) => Some(*e),
            _ => None,
        }
    }
}

impl From<ScalarValue> for AnyValue {
    fn from(v: ScalarValue) -> Self {
        AnyValue::Scalar(v)
    }
}

impl From<ArrayValue> for AnyValue {
    fn from(a: ArrayValue) -> Self {
        AnyValue::Array(a)
    }
}

impl From<ReferenceValue> for AnyValue {
    fn from(r: ReferenceValue) -> Self {
        AnyValue::Reference(r)
    }
}
