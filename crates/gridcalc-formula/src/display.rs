//! Writing an AST back to formula text
//!
//! Parentheses are emitted only where the precedence table requires them.
//! Relative coordinates are converted between notations against the origin
//! cell, so the same tree can be written as A1 or R1C1.

use crate::ast::*;
use gridcalc_core::{format_number, CellAddress, CellOrigin, ScalarValue, MAX_COLS, MAX_ROWS};
use lazy_regex::regex_is_match;
use std::fmt;

/// Binding strength of operands that never need parentheses
const ATOM: u8 = u8::MAX;

impl FormulaExpr {
    /// Formula text (without a leading `=`) in the given notation
    ///
    /// A1 offsets that resolve outside the grid are written as `#REF!`.
    pub fn to_formula(&self, style: ReferenceStyle, origin: &CellOrigin) -> String {
        let mut writer = Writer {
            style,
            origin: *origin,
            out: String::new(),
        };
        writer.expr(self);
        writer.out
    }
}

impl ParsedFormula {
    /// Formula text in the notation it was parsed in
    pub fn to_formula(&self, origin: &CellOrigin) -> String {
        self.root().to_formula(self.style(), origin)
    }
}

impl fmt::Display for FormulaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_formula(ReferenceStyle::A1, &CellOrigin::default()))
    }
}

fn precedence(expr: &FormulaExpr) -> u8 {
    match expr {
        // Unions always carry their own parentheses
        FormulaExpr::Binary {
            op: BinaryOperator::Union,
            ..
        } => ATOM,
        FormulaExpr::Binary { op, .. } => op.precedence(),
        FormulaExpr::Unary { op, .. } => op.precedence(),
        FormulaExpr::Scalar(ScalarValue::Number(n)) if *n < 0.0 => UnaryOperator::Negate.precedence(),
        _ => ATOM,
    }
}

/// Whether a sheet name must be quoted to read back as one sheet name
pub(crate) fn sheet_needs_quotes(name: &str) -> bool {
    !regex_is_match!(r"^[A-Za-z_\\][A-Za-z0-9_.]*$", name)
        || regex_is_match!(r"^\$?[A-Za-z]{1,3}\$?\d+$", name)
        || regex_is_match!(r"^(?i:r\d*c?\d*|c\d*)$", name)
        || name.eq_ignore_ascii_case("TRUE")
        || name.eq_ignore_ascii_case("FALSE")
}

/// Write a sheet name (or `first:last` span) quoted when needed
pub(crate) fn write_prefix(out: &mut String, prefix: &Prefix) {
    let sheets = match &prefix.sheet {
        Some(SheetRef::Single(name)) => Some((name.clone(), sheet_needs_quotes(name))),
        Some(SheetRef::Span { first, last }) => Some((
            format!("{}:{}", first, last),
            sheet_needs_quotes(first) || sheet_needs_quotes(last),
        )),
        None => None,
    };
    let file = prefix.file.map(|f| format!("[{}]", f)).unwrap_or_default();

    match sheets {
        Some((text, true)) => {
            out.push('\'');
            out.push_str(&file);
            out.push_str(&text.replace('\'', "''"));
            out.push('\'');
        }
        Some((text, false)) => {
            out.push_str(&file);
            out.push_str(&text);
        }
        None => out.push_str(&file),
    }
    out.push('!');
}

/// A reference without prefix in `style`; `None` if an A1 corner leaves the grid
pub(crate) fn reference_text(
    reference: &Reference,
    style: ReferenceStyle,
    origin: &CellOrigin,
) -> Option<String> {
    let writer = Writer {
        style,
        origin: *origin,
        out: String::new(),
    };
    match style {
        ReferenceStyle::A1 => writer.a1_reference(reference),
        ReferenceStyle::R1C1 => Some(writer.r1c1_reference(reference)),
    }
}

struct Writer {
    style: ReferenceStyle,
    origin: CellOrigin,
    out: String,
}

impl Writer {
    fn expr(&mut self, expr: &FormulaExpr) {
        match expr {
            FormulaExpr::Scalar(value) => self.scalar(value),
            FormulaExpr::Array(array) => {
                self.out.push('{');
                for (r, row) in array.row_slices().enumerate() {
                    if r > 0 {
                        self.out.push(';');
                    }
                    for (c, value) in row.iter().enumerate() {
                        if c > 0 {
                            self.out.push(',');
                        }
                        self.scalar(value);
                    }
                }
                self.out.push('}');
            }
            FormulaExpr::Unary { op, operand } => {
                let wrap = precedence(operand) < op.precedence();
                if !op.is_postfix() {
                    self.out.push_str(op.as_str());
                }
                self.operand(operand, wrap);
                if op.is_postfix() {
                    self.out.push_str(op.as_str());
                }
            }
            FormulaExpr::Binary {
                op: BinaryOperator::Union,
                ..
            } => {
                let mut operands = Vec::new();
                collect_union(expr, &mut operands);
                self.out.push('(');
                for (i, operand) in operands.into_iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.expr(operand);
                }
                self.out.push(')');
            }
            FormulaExpr::Binary { op, left, right } => {
                let p = op.precedence();
                self.operand(left, precedence(left) < p);
                self.out.push_str(op.as_str());
                self.operand(right, precedence(right) <= p);
            }
            FormulaExpr::Reference { prefix, reference } => {
                self.reference(prefix.as_ref(), reference)
            }
            FormulaExpr::Reference3D { prefix, reference } => {
                self.reference(Some(prefix), reference)
            }
            FormulaExpr::Structured { prefix, reference } => {
                if let Some(prefix) = prefix {
                    write_prefix(&mut self.out, prefix);
                }
                self.out.push_str(&reference.to_formula());
            }
            FormulaExpr::Name { prefix, name } => {
                if let Some(prefix) = prefix {
                    write_prefix(&mut self.out, prefix);
                }
                self.out.push_str(name);
            }
            FormulaExpr::Function {
                prefix, name, args, ..
            } => {
                if let Some(prefix) = prefix {
                    write_prefix(&mut self.out, prefix);
                }
                self.out.push_str(name);
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.expr(arg);
                }
                self.out.push(')');
            }
            FormulaExpr::Unsupported(text) => self.out.push_str(text),
        }
    }

    fn operand(&mut self, expr: &FormulaExpr, wrap: bool) {
        if wrap {
            self.out.push('(');
        }
        self.expr(expr);
        if wrap {
            self.out.push(')');
        }
    }

    fn scalar(&mut self, value: &ScalarValue) {
        match value {
            ScalarValue::Blank => {}
            ScalarValue::Number(n) => self.out.push_str(&format_number(*n)),
            ScalarValue::Text(s) => {
                self.out.push('"');
                self.out.push_str(&s.replace('"', "\"\""));
                self.out.push('"');
            }
            ScalarValue::Logical(true) => self.out.push_str("TRUE"),
            ScalarValue::Logical(false) => self.out.push_str("FALSE"),
            ScalarValue::Error(e) => self.out.push_str(e.as_str()),
        }
    }

    fn reference(&mut self, prefix: Option<&Prefix>, reference: &Reference) {
        let text = match self.style {
            ReferenceStyle::A1 => self.a1_reference(reference),
            ReferenceStyle::R1C1 => Some(self.r1c1_reference(reference)),
        };
        match text {
            Some(text) => {
                if let Some(prefix) = prefix {
                    write_prefix(&mut self.out, prefix);
                }
                self.out.push_str(&text);
            }
            None => self.out.push_str("#REF!"),
        }
    }

    // === A1 ===

    fn a1_row(&self, coord: &Coord) -> Option<String> {
        let abs = coord.is_absolute();
        let row = coord.resolve(self.origin.row, MAX_ROWS)?;
        Some(format!("{}{}", if abs { "$" } else { "" }, row + 1))
    }

    fn a1_col(&self, coord: &Coord) -> Option<String> {
        let abs = coord.is_absolute();
        let col = coord.resolve(self.origin.col as u32, MAX_COLS as u32)?;
        Some(format!(
            "{}{}",
            if abs { "$" } else { "" },
            CellAddress::column_to_letters(col as u16)
        ))
    }

    fn a1_cell(&self, cell: &CellRef) -> Option<String> {
        Some(format!("{}{}", self.a1_col(&cell.col)?, self.a1_row(&cell.row)?))
    }

    fn a1_reference(&self, reference: &Reference) -> Option<String> {
        Some(match reference {
            Reference::Cell(cell) => self.a1_cell(cell)?,
            Reference::Area { start, end } => {
                format!("{}:{}", self.a1_cell(start)?, self.a1_cell(end)?)
            }
            Reference::Rows { first, last } => {
                format!("{}:{}", self.a1_row(first)?, self.a1_row(last)?)
            }
            Reference::Columns { first, last } => {
                format!("{}:{}", self.a1_col(first)?, self.a1_col(last)?)
            }
        })
    }

    // === R1C1 ===

    fn r1c1_coord(&self, letter: char, coord: &Coord, origin: u32) -> String {
        let offset = match *coord {
            Coord::A1 { index, abs: true } => return format!("{}{}", letter, index + 1),
            Coord::A1 { index, abs: false } => index as i64 - origin as i64,
            Coord::Offset(offset) => offset as i64,
        };
        if offset == 0 {
            letter.to_string()
        } else {
            format!("{}[{}]", letter, offset)
        }
    }

    fn r1c1_cell(&self, cell: &CellRef) -> String {
        format!(
            "{}{}",
            self.r1c1_coord('R', &cell.row, self.origin.row),
            self.r1c1_coord('C', &cell.col, self.origin.col as u32)
        )
    }

    fn r1c1_reference(&self, reference: &Reference) -> String {
        let row = |c: &Coord| self.r1c1_coord('R', c, self.origin.row);
        let col = |c: &Coord| self.r1c1_coord('C', c, self.origin.col as u32);
        match reference {
            Reference::Cell(cell) => self.r1c1_cell(cell),
            Reference::Area { start, end } => {
                format!("{}:{}", self.r1c1_cell(start), self.r1c1_cell(end))
            }
            Reference::Rows { first, last } if first == last => row(first),
            Reference::Rows { first, last } => format!("{}:{}", row(first), row(last)),
            Reference::Columns { first, last } if first == last => col(first),
            Reference::Columns { first, last } => format!("{}:{}", col(first), col(last)),
        }
    }
}

fn collect_union<'e>(expr: &'e FormulaExpr, out: &mut Vec<&'e FormulaExpr>) {
    match expr {
        FormulaExpr::Binary {
            op: BinaryOperator::Union,
            left,
            right,
        } => {
            collect_union(left, out);
            collect_union(right, out);
        }
        other => out.push(other),
    }
}
