//! Reference-aware formula text rewriting
//!
//! [`rewrite_formula`] tokenizes formula text and hands each function name,
//! reference and sheet prefix to a [`FormulaVisitor`]. Only the spans a hook
//! replaces change; everything between them, whitespace included, is copied
//! through as written.

use crate::ast::{CellRef, Coord, Prefix, Reference, ReferenceStyle};
use crate::display::reference_text;
use crate::error::FormulaResult;
use crate::lexer::{tokenize, Token, TokenKind};
use ahash::AHashMap;
use gridcalc_core::{CellOrigin, MAX_COLS, MAX_ROWS};

/// Where the formula being rewritten lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewriteContext {
    /// Notation of the input text
    pub style: ReferenceStyle,
    /// Sheet and cell the formula belongs to
    pub origin: CellOrigin,
}

impl RewriteContext {
    pub fn new(style: ReferenceStyle, origin: CellOrigin) -> Self {
        Self { style, origin }
    }
}

/// Hooks called while walking formula text
///
/// Each hook returns replacement text for the construct, or `None` to keep
/// it. Every hook defaults to `None`.
pub trait FormulaVisitor {
    /// An identifier directly followed by `(`
    fn function_name(&mut self, _name: &str, _ctx: &RewriteContext) -> Option<String> {
        None
    }

    /// A cell (`end` is `None`) or a `start:end` area
    fn cell_reference(
        &mut self,
        _start: &CellRef,
        _end: Option<&CellRef>,
        _ctx: &RewriteContext,
    ) -> Option<String> {
        None
    }

    /// A row span; a lone R1C1 row has `first == last`
    fn row_reference(
        &mut self,
        _first: &Coord,
        _last: &Coord,
        _ctx: &RewriteContext,
    ) -> Option<String> {
        None
    }

    /// A column span; a lone R1C1 column has `first == last`
    fn column_reference(
        &mut self,
        _first: &Coord,
        _last: &Coord,
        _ctx: &RewriteContext,
    ) -> Option<String> {
        None
    }

    /// A sheet or file prefix, including its `!`
    fn sheet_prefix(&mut self, _prefix: &Prefix, _ctx: &RewriteContext) -> Option<String> {
        None
    }
}

/// Result of a rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    /// Whether any replacement differed from the original text
    pub changed: bool,
}

/// Walk `text` and apply the visitor's replacements
///
/// A leading `=` is kept. Fails only when the text cannot be tokenized.
pub fn rewrite_formula(
    text: &str,
    ctx: &RewriteContext,
    visitor: &mut impl FormulaVisitor,
) -> FormulaResult<Rewritten> {
    let (lead, body) = match text.strip_prefix('=') {
        Some(body) => ("=", body),
        None => ("", text),
    };
    let tokens = tokenize(body, ctx.style)?;

    let mut out = String::with_capacity(text.len() + 16);
    out.push_str(lead);
    let mut copied = 0;
    let mut changed = false;
    let mut i = 0;

    while i < tokens.len() {
        let (replacement, consumed) = visit(&tokens, i, ctx, visitor);
        if let Some(replacement) = replacement {
            let start = tokens[i].span.start;
            let end = tokens[i + consumed - 1].span.end;
            out.push_str(&body[copied..start]);
            changed |= replacement != body[start..end];
            out.push_str(&replacement);
            copied = end;
        }
        i += consumed;
    }
    out.push_str(&body[copied..]);

    Ok(Rewritten { text: out, changed })
}

/// Offer the construct starting at token `i` to the visitor
///
/// Returns the replacement and how many tokens the construct covers.
fn visit(
    tokens: &[Token],
    i: usize,
    ctx: &RewriteContext,
    visitor: &mut impl FormulaVisitor,
) -> (Option<String>, usize) {
    let kind_at = |n: usize| tokens.get(n).map(|t| &t.kind);
    let ranged = kind_at(i + 1) == Some(&TokenKind::Colon);

    match &tokens[i].kind {
        TokenKind::Ident(name) | TokenKind::CellFunction(name)
            if kind_at(i + 1) == Some(&TokenKind::LeftParen) =>
        {
            (visitor.function_name(name, ctx), 1)
        }
        TokenKind::Cell(start) => match kind_at(i + 2) {
            Some(TokenKind::Cell(end)) if ranged => {
                (visitor.cell_reference(start, Some(end), ctx), 3)
            }
            _ => (visitor.cell_reference(start, None, ctx), 1),
        },
        TokenKind::Row(first) => match kind_at(i + 2) {
            Some(TokenKind::Row(last)) if ranged => (visitor.row_reference(first, last, ctx), 3),
            _ => (visitor.row_reference(first, first, ctx), 1),
        },
        TokenKind::Column(first) => match kind_at(i + 2) {
            Some(TokenKind::Column(last)) if ranged => {
                (visitor.column_reference(first, last, ctx), 3)
            }
            _ => (visitor.column_reference(first, first, ctx), 1),
        },
        TokenKind::Prefix(prefix) => (visitor.sheet_prefix(prefix, ctx), 1),
        _ => (None, 1),
    }
}

fn cell_or_area(start: &CellRef, end: Option<&CellRef>) -> Reference {
    match end {
        Some(end) => Reference::Area {
            start: *start,
            end: *end,
        },
        None => Reference::Cell(*start),
    }
}

/// Renames function calls through a case-insensitive map
#[derive(Debug, Clone, Default)]
pub struct NameRewriteVisitor {
    names: AHashMap<String, String>,
}

impl NameRewriteVisitor {
    pub fn new<I, F, T>(mapping: I) -> Self
    where
        I: IntoIterator<Item = (F, T)>,
        F: AsRef<str>,
        T: Into<String>,
    {
        Self {
            names: mapping
                .into_iter()
                .map(|(from, to)| (from.as_ref().to_uppercase(), to.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, from: &str, to: impl Into<String>) {
        self.names.insert(from.to_uppercase(), to.into());
    }

    /// The replacement for `name`, if mapped
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.names.get(&name.to_uppercase()).map(String::as_str)
    }
}

impl FormulaVisitor for NameRewriteVisitor {
    fn function_name(&mut self, name: &str, _ctx: &RewriteContext) -> Option<String> {
        self.lookup(name).map(str::to_string)
    }
}

impl FormulaVisitor for &NameRewriteVisitor {
    fn function_name(&mut self, name: &str, _ctx: &RewriteContext) -> Option<String> {
        self.lookup(name).map(str::to_string)
    }
}

/// Rewrites every reference into another notation
#[derive(Debug, Clone, Copy)]
pub struct ReferenceStyleVisitor {
    pub target: ReferenceStyle,
}

impl ReferenceStyleVisitor {
    fn write(&self, reference: &Reference, ctx: &RewriteContext) -> Option<String> {
        if ctx.style == self.target {
            return None;
        }
        Some(
            reference_text(reference, self.target, &ctx.origin)
                .unwrap_or_else(|| "#REF!".to_string()),
        )
    }
}

impl FormulaVisitor for ReferenceStyleVisitor {
    fn cell_reference(
        &mut self,
        start: &CellRef,
        end: Option<&CellRef>,
        ctx: &RewriteContext,
    ) -> Option<String> {
        self.write(&cell_or_area(start, end), ctx)
    }

    fn row_reference(&mut self, first: &Coord, last: &Coord, ctx: &RewriteContext) -> Option<String> {
        self.write(
            &Reference::Rows {
                first: *first,
                last: *last,
            },
            ctx,
        )
    }

    fn column_reference(
        &mut self,
        first: &Coord,
        last: &Coord,
        ctx: &RewriteContext,
    ) -> Option<String> {
        self.write(
            &Reference::Columns {
                first: *first,
                last: *last,
            },
            ctx,
        )
    }
}

/// Convert formula text between A1 and R1C1 relative to `origin`
///
/// A1 results that would leave the grid are written as `#REF!`.
pub fn convert_reference_style(
    text: &str,
    from: ReferenceStyle,
    to: ReferenceStyle,
    origin: CellOrigin,
) -> FormulaResult<String> {
    let ctx = RewriteContext::new(from, origin);
    let mut visitor = ReferenceStyleVisitor { target: to };
    Ok(rewrite_formula(text, &ctx, &mut visitor)?.text)
}

/// Moves relative A1 coordinates as a copy/paste by `rows` x `cols` would
///
/// Absolute coordinates stay put. A reference with any corner pushed off the
/// grid becomes `#REF!`. R1C1 text is position independent and never changes.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceShiftVisitor {
    pub rows: i64,
    pub cols: i64,
}

impl ReferenceShiftVisitor {
    fn shift(coord: &Coord, delta: i64, limit: u32) -> Option<Coord> {
        match *coord {
            Coord::A1 { index, abs: false } => {
                let moved = index as i64 + delta;
                (0..limit as i64)
                    .contains(&moved)
                    .then(|| Coord::relative(moved as u32))
            }
            other => Some(other),
        }
    }

    fn shift_cell(&self, cell: &CellRef) -> Option<CellRef> {
        Some(CellRef::new(
            Self::shift(&cell.row, self.rows, MAX_ROWS)?,
            Self::shift(&cell.col, self.cols, MAX_COLS as u32)?,
        ))
    }

    fn write(&self, shifted: Option<Reference>, ctx: &RewriteContext) -> Option<String> {
        if ctx.style == ReferenceStyle::R1C1 || (self.rows == 0 && self.cols == 0) {
            return None;
        }
        Some(
            shifted
                .and_then(|r| reference_text(&r, ReferenceStyle::A1, &ctx.origin))
                .unwrap_or_else(|| "#REF!".to_string()),
        )
    }
}

impl FormulaVisitor for ReferenceShiftVisitor {
    fn cell_reference(
        &mut self,
        start: &CellRef,
        end: Option<&CellRef>,
        ctx: &RewriteContext,
    ) -> Option<String> {
        let shifted = match end {
            Some(end) => self
                .shift_cell(start)
                .zip(self.shift_cell(end))
                .map(|(start, end)| Reference::Area { start, end }),
            None => self.shift_cell(start).map(Reference::Cell),
        };
        self.write(shifted, ctx)
    }

    fn row_reference(&mut self, first: &Coord, last: &Coord, ctx: &RewriteContext) -> Option<String> {
        let shifted = Self::shift(first, self.rows, MAX_ROWS)
            .zip(Self::shift(last, self.rows, MAX_ROWS))
            .map(|(first, last)| Reference::Rows { first, last });
        self.write(shifted, ctx)
    }

    fn column_reference(
        &mut self,
        first: &Coord,
        last: &Coord,
        ctx: &RewriteContext,
    ) -> Option<String> {
        let limit = MAX_COLS as u32;
        let shifted = Self::shift(first, self.cols, limit)
            .zip(Self::shift(last, self.cols, limit))
            .map(|(first, last)| Reference::Columns { first, last });
        self.write(shifted, ctx)
    }
}

/// Adjust A1 formula text for a copy by `rows` x `cols`
pub fn shift_formula(text: &str, rows: i64, cols: i64) -> FormulaResult<String> {
    let ctx = RewriteContext::default();
    let mut visitor = ReferenceShiftVisitor { rows, cols };
    Ok(rewrite_formula(text, &ctx, &mut visitor)?.text)
}
