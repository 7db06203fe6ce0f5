//! Abstract Syntax Tree for formulas
//!
//! The tree is origin-independent: relative R1C1 coordinates stay as
//! offsets and are resolved against the calling cell at evaluation time, so
//! one parsed formula can be shared by every cell holding the same text.

use crate::structured::StructuredRef;
use crate::value::ArrayValue;
use gridcalc_core::{CellOrigin, CellRange, ScalarValue, MAX_COLS, MAX_ROWS};

/// Reference notation of formula text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReferenceStyle {
    /// `A1`, `$B$2`, `C:C`, `3:3`
    #[default]
    A1,
    /// `R1C1`, `R[-1]C`, `C[2]`, `R3`
    R1C1,
}

/// One coordinate (row or column) of a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coord {
    /// A fixed 0-based index. `abs` records the `$` marker of A1 text;
    /// absolute R1C1 coordinates always carry `abs: true`.
    A1 { index: u32, abs: bool },
    /// Offset from the calling cell (relative R1C1)
    Offset(i32),
}

impl Coord {
    pub fn absolute(index: u32) -> Self {
        Coord::A1 { index, abs: true }
    }

    pub fn relative(index: u32) -> Self {
        Coord::A1 { index, abs: false }
    }

    /// Resolve against the origin's row or column; `None` if the result
    /// falls outside `0..limit`
    pub fn resolve(&self, origin: u32, limit: u32) -> Option<u32> {
        let index = match *self {
            Coord::A1 { index, .. } => index as i64,
            Coord::Offset(offset) => origin as i64 + offset as i64,
        };
        (0..limit as i64).contains(&index).then_some(index as u32)
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, Coord::A1 { abs: true, .. })
    }
}

/// A single cell reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: Coord,
    pub col: Coord,
}

impl CellRef {
    pub fn new(row: Coord, col: Coord) -> Self {
        Self { row, col }
    }

    /// Resolve to 0-based (row, col)
    pub fn resolve(&self, origin: &CellOrigin) -> Option<(u32, u16)> {
        let row = self.row.resolve(origin.row, MAX_ROWS)?;
        let col = self.col.resolve(origin.col as u32, MAX_COLS as u32)?;
        Some((row, col as u16))
    }
}

/// The reference part of a reference node, without any sheet prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    /// `A1`
    Cell(CellRef),
    /// `A1:B2`
    Area { start: CellRef, end: CellRef },
    /// `1:3`, `R2`, `R[1]:R[2]`
    Rows { first: Coord, last: Coord },
    /// `A:C`, `C2`, `C[-1]`
    Columns { first: Coord, last: Coord },
}

impl Reference {
    /// Resolve to a normalized area; `None` if any corner leaves the grid
    pub fn resolve(&self, origin: &CellOrigin) -> Option<CellRange> {
        match self {
            Reference::Cell(cell) => {
                let (row, col) = cell.resolve(origin)?;
                Some(CellRange::from_indices(row, col, row, col))
            }
            Reference::Area { start, end } => {
                let (r1, c1) = start.resolve(origin)?;
                let (r2, c2) = end.resolve(origin)?;
                Some(CellRange::from_indices(r1, c1, r2, c2))
            }
            Reference::Rows { first, last } => {
                let a = first.resolve(origin.row, MAX_ROWS)?;
                let b = last.resolve(origin.row, MAX_ROWS)?;
                Some(CellRange::rows(a.min(b), a.max(b)))
            }
            Reference::Columns { first, last } => {
                let a = first.resolve(origin.col as u32, MAX_COLS as u32)? as u16;
                let b = last.resolve(origin.col as u32, MAX_COLS as u32)? as u16;
                Some(CellRange::columns(a.min(b), a.max(b)))
            }
        }
    }
}

/// Sheet part of a prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SheetRef {
    /// `Sheet1!`
    Single(String),
    /// `Sheet1:Sheet3!`
    Span { first: String, last: String },
}

/// Sheet and external-file qualification shared by references, names,
/// structured references and function calls
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Prefix {
    /// External workbook index from `[n]`
    pub file: Option<u32>,
    pub sheet: Option<SheetRef>,
}

impl Prefix {
    pub fn sheet(name: impl Into<String>) -> Self {
        Self {
            file: None,
            sheet: Some(SheetRef::Single(name.into())),
        }
    }

    pub fn span(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            file: None,
            sheet: Some(SheetRef::Span {
                first: first.into(),
                last: last.into(),
            }),
        }
    }

    /// Whether the prefix names a span of sheets
    pub fn is_3d(&self) -> bool {
        matches!(self.sheet, Some(SheetRef::Span { .. }))
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Text
    Concat,

    // Reference
    Range,
    Union,
    Intersect,
}

impl BinaryOperator {
    /// Source text of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Concat => "&",
            BinaryOperator::Range => ":",
            BinaryOperator::Union => ",",
            BinaryOperator::Intersect => " ",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Union => 0,
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqual => 1,
            BinaryOperator::Concat => 2,
            BinaryOperator::Add | BinaryOperator::Subtract => 3,
            BinaryOperator::Multiply | BinaryOperator::Divide => 4,
            BinaryOperator::Power => 5,
            BinaryOperator::Intersect => 9,
            BinaryOperator::Range => 10,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 1
    }

    /// Operators whose operands must be references
    pub fn is_reference_operator(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Range | BinaryOperator::Union | BinaryOperator::Intersect
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Prefix `+`
    Plus,
    /// Prefix `-`
    Negate,
    /// Postfix `%`
    Percent,
    /// Prefix `@`
    ImplicitIntersection,
    /// Postfix `#`
    SpillRange,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Negate => "-",
            UnaryOperator::Percent => "%",
            UnaryOperator::ImplicitIntersection => "@",
            UnaryOperator::SpillRange => "#",
        }
    }

    pub fn is_postfix(&self) -> bool {
        matches!(self, UnaryOperator::Percent | UnaryOperator::SpillRange)
    }

    pub fn precedence(&self) -> u8 {
        match self {
            UnaryOperator::Plus | UnaryOperator::Negate => 6,
            UnaryOperator::Percent => 7,
            UnaryOperator::ImplicitIntersection => 8,
            UnaryOperator::SpillRange => 11,
        }
    }
}

/// How a function-call node was resolved at parse time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionId {
    /// Registered; holds the registry's canonical name
    Known(&'static str),
    /// Not registered; evaluates to `#NAME?`
    Unknown,
    /// A cell-reference-shaped name that is not registered; evaluates to `#REF!`
    InvalidCellTarget,
}

/// Formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    /// Literal number, text, logical or error; `Blank` for an omitted argument
    Scalar(ScalarValue),

    /// Array constant `{1,2;3,4}`
    Array(ArrayValue),

    Unary {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    Binary {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },

    /// Cell, area, row or column reference, optionally sheet/file qualified
    Reference {
        prefix: Option<Prefix>,
        reference: Reference,
    },

    /// Reference through a span of sheets (`Sheet1:Sheet3!A1`)
    Reference3D {
        prefix: Prefix,
        reference: Reference,
    },

    /// Table reference (`Sales[Amount]`, `[@Qty]`)
    Structured {
        prefix: Option<Prefix>,
        reference: StructuredRef,
    },

    /// Defined name
    Name {
        prefix: Option<Prefix>,
        name: String,
    },

    /// Function call
    Function {
        prefix: Option<Prefix>,
        /// Name as written in the formula
        name: String,
        id: FunctionId,
        args: Vec<FormulaExpr>,
    },

    /// Grammar production without evaluation semantics; holds its source text
    Unsupported(String),
}

impl FormulaExpr {
    pub fn number(n: f64) -> Self {
        FormulaExpr::Scalar(ScalarValue::Number(n))
    }

    pub fn text<S: Into<String>>(s: S) -> Self {
        FormulaExpr::Scalar(ScalarValue::Text(s.into()))
    }

    pub fn unary(op: UnaryOperator, operand: FormulaExpr) -> Self {
        FormulaExpr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> Self {
        FormulaExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Unqualified reference
    pub fn reference(reference: Reference) -> Self {
        FormulaExpr::Reference {
            prefix: None,
            reference,
        }
    }

    /// Visit this node and all descendants, parents first
    pub fn walk(&self, f: &mut impl FnMut(&FormulaExpr)) {
        f(self);
        match self {
            FormulaExpr::Unary { operand, .. } => operand.walk(f),
            FormulaExpr::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            FormulaExpr::Function { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            FormulaExpr::Scalar(_)
            | FormulaExpr::Array(_)
            | FormulaExpr::Reference { .. }
            | FormulaExpr::Reference3D { .. }
            | FormulaExpr::Structured { .. }
            | FormulaExpr::Name { .. }
            | FormulaExpr::Unsupported(_) => {}
        }
    }

    /// Whether the expression can produce a reference rather than a value
    pub fn is_reference_like(&self) -> bool {
        match self {
            FormulaExpr::Reference { .. }
            | FormulaExpr::Reference3D { .. }
            | FormulaExpr::Structured { .. }
            | FormulaExpr::Name { .. }
            | FormulaExpr::Function { .. } => true,
            FormulaExpr::Binary { op, .. } => op.is_reference_operator(),
            FormulaExpr::Unary { op, .. } => matches!(
                op,
                UnaryOperator::SpillRange | UnaryOperator::ImplicitIntersection
            ),
            _ => false,
        }
    }
}

/// A parsed formula: its text (without the leading `=`) and the tree
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFormula {
    text: String,
    style: ReferenceStyle,
    root: FormulaExpr,
}

impl ParsedFormula {
    pub(crate) fn new(text: String, style: ReferenceStyle, root: FormulaExpr) -> Self {
        Self { text, style, root }
    }

    /// Formula text as written, without the leading `=`
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> ReferenceStyle {
        self.style
    }

    pub fn root(&self) -> &FormulaExpr {
        &self.root
    }

    pub fn into_root(self) -> FormulaExpr {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_resolution() {
        assert_eq!(Coord::Offset(-1).resolve(5, 10), Some(4));
        assert_eq!(Coord::Offset(-6).resolve(5, 10), None);
        assert_eq!(Coord::Offset(5).resolve(5, 10), None);
        assert_eq!(Coord::absolute(3).resolve(99, 10), Some(3));
    }

    #[test]
    fn test_reference_resolution() {
        let origin = CellOrigin::new(0, 4, 2);
        let r = Reference::Area {
            start: CellRef::new(Coord::Offset(-1), Coord::Offset(0)),
            end: CellRef::new(Coord::absolute(0), Coord::relative(0)),
        };
        assert_eq!(r.resolve(&origin), Some(CellRange::parse("A1:C4").unwrap()));

        let cols = Reference::Columns {
            first: Coord::Offset(1),
            last: Coord::Offset(1),
        };
        assert_eq!(
            cols.resolve(&origin),
            Some(CellRange::columns(3, 3))
        );

        let off_grid = Reference::Cell(CellRef::new(Coord::Offset(-5), Coord::Offset(0)));
        assert_eq!(off_grid.resolve(&origin), None);
    }

    #[test]
    fn test_operator_precedence_order() {
        assert!(BinaryOperator::Power.precedence() > BinaryOperator::Multiply.precedence());
        assert!(BinaryOperator::Concat.precedence() > BinaryOperator::Equal.precedence());
        assert!(UnaryOperator::Negate.precedence() > BinaryOperator::Power.precedence());
        assert!(BinaryOperator::Range.precedence() > BinaryOperator::Intersect.precedence());
    }
}
