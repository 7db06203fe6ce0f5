//! Formula parser
//!
//! Parses formula text into an AST using recursive descent over the tokens
//! produced by [`crate::lexer`].

use crate::ast::*;
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::registry::{FunctionDef, FunctionRegistry};
use crate::structured::StructuredRef;
use crate::value::ArrayValue;
use gridcalc_core::ScalarValue;

/// Parser options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    /// Reference notation of the input text
    pub style: ReferenceStyle,
}

/// Parse an A1 formula string into an AST against the built-in functions
///
/// The formula may or may not start with '='.
pub fn parse_formula(formula: &str) -> FormulaResult<ParsedFormula> {
    parse(formula, ReferenceStyle::A1)
}

/// Parse a formula in the given notation against the built-in functions
pub fn parse(formula: &str, style: ReferenceStyle) -> FormulaResult<ParsedFormula> {
    FormulaParser::new(FunctionRegistry::builtin(), ParseOptions { style }).parse(formula)
}

/// Formula parser bound to a function registry
#[derive(Debug, Clone, Copy)]
pub struct FormulaParser<'r> {
    registry: &'r FunctionRegistry,
    options: ParseOptions,
}

impl<'r> FormulaParser<'r> {
    pub fn new(registry: &'r FunctionRegistry, options: ParseOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// Parse formula text, with or without a leading `=`
    pub fn parse(&self, formula: &str) -> FormulaResult<ParsedFormula> {
        let text = formula.strip_prefix('=').unwrap_or(formula);
        let tokens = tokenize(text, self.options.style)?;
        if tokens.is_empty() {
            return Err(FormulaError::parse("Empty formula"));
        }

        let mut parser = Parser {
            text,
            tokens,
            pos: 0,
            registry: self.registry,
        };
        let root = parser.parse_expression()?;
        if let Some(token) = parser.tokens.get(parser.pos) {
            return Err(FormulaError::parse(format!(
                "Unexpected '{}' at position {}",
                &text[token.span.clone()],
                token.span.start
            )));
        }
        Ok(ParsedFormula::new(text.to_string(), self.options.style, root))
    }
}

/// Strip the `_xlfn.` (and `_xlws.`) storage prefixes, ignoring case
pub(crate) fn strip_future_prefix(name: &str) -> Option<&str> {
    let rest = strip_prefix_ignore_case(name, "_xlfn.")?;
    Some(strip_prefix_ignore_case(rest, "_xlws.").unwrap_or(rest))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn binary_operator(kind: &TokenKind) -> BinaryOperator {
    match kind {
        TokenKind::Equal => BinaryOperator::Equal,
        TokenKind::NotEqual => BinaryOperator::NotEqual,
        TokenKind::LessThan => BinaryOperator::LessThan,
        TokenKind::LessEqual => BinaryOperator::LessEqual,
        TokenKind::GreaterThan => BinaryOperator::GreaterThan,
        TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Subtract,
        TokenKind::Star => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        TokenKind::Caret => BinaryOperator::Power,
        TokenKind::Ampersand => BinaryOperator::Concat,
        TokenKind::Colon => BinaryOperator::Range,
        TokenKind::Comma => BinaryOperator::Union,
        TokenKind::Space => BinaryOperator::Intersect,
        other => unreachable!("{:?} is not a binary operator", other),
    }
}

fn unary_operator(kind: &TokenKind) -> UnaryOperator {
    match kind {
        TokenKind::Plus => UnaryOperator::Plus,
        TokenKind::Minus => UnaryOperator::Negate,
        TokenKind::Percent => UnaryOperator::Percent,
        TokenKind::At => UnaryOperator::ImplicitIntersection,
        TokenKind::Hash => UnaryOperator::SpillRange,
        other => unreachable!("{:?} is not a unary operator", other),
    }
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    registry: &'a FunctionRegistry,
}

impl<'a> Parser<'a> {
    fn current(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current() == Some(kind)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> FormulaResult<()> {
        if self.check(&kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &str) -> FormulaError {
        match self.tokens.get(self.pos) {
            Some(token) => FormulaError::parse(format!(
                "Expected {} but found '{}' at position {}",
                expected,
                &self.text[token.span.clone()],
                token.span.start
            )),
            None => FormulaError::parse(format!(
                "Expected {} but reached the end of the formula",
                expected
            )),
        }
    }

    /// Source text from the start of token `from` to the end of the last consumed token
    fn source_since(&self, from: usize) -> String {
        let start = self.tokens[from].span.start;
        let end = self.tokens[self.pos.saturating_sub(1).max(from)].span.end;
        self.text[start..end].to_string()
    }

    fn binary_loop(
        &mut self,
        ops: &[TokenKind],
        next: fn(&mut Self) -> FormulaResult<FormulaExpr>,
    ) -> FormulaResult<FormulaExpr> {
        let mut left = next(self)?;
        while let Some(kind) = self.current().filter(|k| ops.contains(*k)) {
            let op = binary_operator(kind);
            self.pos += 1;
            let right = next(self)?;
            left = FormulaExpr::binary(op, left, right);
        }
        Ok(left)
    }

    // === Grammar, lowest precedence first ===

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary_loop(
            &[
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::LessThan,
                TokenKind::LessEqual,
                TokenKind::GreaterThan,
                TokenKind::GreaterEqual,
            ],
            Self::parse_concatenation,
        )
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary_loop(&[TokenKind::Ampersand], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary_loop(&[TokenKind::Plus, TokenKind::Minus], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary_loop(&[TokenKind::Star, TokenKind::Slash], Self::parse_exponent)
    }

    /// Left associative: `2^3^2` is `(2^3)^2`
    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary_loop(&[TokenKind::Caret], Self::parse_unary)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        if let Some(kind) = self
            .current()
            .filter(|k| matches!(k, TokenKind::Plus | TokenKind::Minus))
        {
            let op = unary_operator(kind);
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(FormulaExpr::unary(op, operand));
        }
        self.parse_percent()
    }

    fn parse_percent(&mut self) -> FormulaResult<FormulaExpr> {
        let mut expr = self.parse_at()?;
        while self.check(&TokenKind::Percent) {
            self.pos += 1;
            expr = FormulaExpr::unary(UnaryOperator::Percent, expr);
        }
        Ok(expr)
    }

    fn parse_at(&mut self) -> FormulaResult<FormulaExpr> {
        if self.check(&TokenKind::At) {
            self.pos += 1;
            let operand = self.parse_at()?;
            return Ok(FormulaExpr::unary(UnaryOperator::ImplicitIntersection, operand));
        }
        self.parse_intersection()
    }

    fn parse_intersection(&mut self) -> FormulaResult<FormulaExpr> {
        self.binary_loop(&[TokenKind::Space], Self::parse_range)
    }

    fn parse_range(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_spill()?;
        while self.check(&TokenKind::Colon) {
            self.pos += 1;
            let right = self.parse_spill()?;
            left = combine_range(left, right);
        }
        Ok(left)
    }

    fn parse_spill(&mut self) -> FormulaResult<FormulaExpr> {
        let mut expr = self.parse_primary()?;
        while self.check(&TokenKind::Hash) {
            self.pos += 1;
            expr = FormulaExpr::unary(UnaryOperator::SpillRange, expr);
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        let start = self.pos;
        let Some(token) = self.consume() else {
            return Err(self.unexpected("an operand"));
        };

        match token.kind {
            TokenKind::Number(n) => Ok(FormulaExpr::number(n)),
            TokenKind::Text(s) => Ok(FormulaExpr::text(s)),
            TokenKind::Logical(b) => Ok(FormulaExpr::Scalar(ScalarValue::Logical(b))),
            TokenKind::Error(e) => Ok(FormulaExpr::Scalar(ScalarValue::Error(e))),
            TokenKind::LeftParen => self.parse_parenthesized(),
            TokenKind::LeftBrace => self.parse_array(),
            TokenKind::Prefix(prefix) => {
                if matches!(self.current(), Some(TokenKind::Prefix(_))) {
                    // Sheet1!Sheet2!A1
                    while matches!(self.current(), Some(TokenKind::Prefix(_))) {
                        self.pos += 1;
                    }
                    self.parse_qualified(None)?;
                    return Ok(FormulaExpr::Unsupported(self.source_since(start)));
                }
                self.parse_qualified(Some(prefix))
            }
            _ => {
                self.pos = start;
                self.parse_qualified(None)
            }
        }
    }

    /// An operand that may carry a sheet or file prefix
    fn parse_qualified(&mut self, prefix: Option<Prefix>) -> FormulaResult<FormulaExpr> {
        let Some(token) = self.consume() else {
            return Err(self.unexpected("a reference after the sheet prefix"));
        };

        let reference = match token.kind {
            TokenKind::Cell(cell) => Reference::Cell(cell),
            TokenKind::Row(row) => Reference::Rows {
                first: row,
                last: self.take_partner(row_coord).unwrap_or(row),
            },
            TokenKind::Column(col) => Reference::Columns {
                first: col,
                last: self.take_partner(column_coord).unwrap_or(col),
            },
            TokenKind::Ident(name) => {
                if self.check(&TokenKind::LeftParen) {
                    return self.parse_function_call(prefix, name, false);
                }
                return Ok(FormulaExpr::Name { prefix, name });
            }
            TokenKind::CellFunction(name) => {
                return self.parse_function_call(prefix, name, true);
            }
            TokenKind::Structured { table, inner } => {
                let reference = StructuredRef::parse(table, &inner)?;
                return Ok(FormulaExpr::Structured { prefix, reference });
            }
            // Sheet1!#REF!
            TokenKind::Error(e) if prefix.is_some() => {
                return Ok(FormulaExpr::Scalar(ScalarValue::Error(e)));
            }
            _ => {
                self.pos -= 1;
                return Err(self.unexpected(if prefix.is_some() {
                    "a reference after the sheet prefix"
                } else {
                    "an operand"
                }));
            }
        };

        Ok(match prefix {
            Some(prefix) if prefix.is_3d() => FormulaExpr::Reference3D { prefix, reference },
            prefix => FormulaExpr::Reference { prefix, reference },
        })
    }

    /// The `:last` half of a row or column pair, consumed only when the
    /// token after the colon is of the same kind
    fn take_partner(&mut self, pick: fn(&TokenKind) -> Option<Coord>) -> Option<Coord> {
        if !self.check(&TokenKind::Colon) {
            return None;
        }
        let last = self.tokens.get(self.pos + 1).and_then(|t| pick(&t.kind))?;
        self.pos += 2;
        Some(last)
    }

    /// After `(`: a nested expression, or a union when commas separate operands
    fn parse_parenthesized(&mut self) -> FormulaResult<FormulaExpr> {
        let mut expr = self.parse_expression()?;
        while self.check(&TokenKind::Comma) {
            self.pos += 1;
            let right = self.parse_expression()?;
            expr = FormulaExpr::binary(BinaryOperator::Union, expr, right);
        }
        self.expect(TokenKind::RightParen, "')'")?;
        Ok(expr)
    }

    /// After `{`: rows separated by `;`, columns by `,`
    fn parse_array(&mut self) -> FormulaResult<FormulaExpr> {
        let mut rows = Vec::new();
        let mut row = Vec::new();
        loop {
            row.push(self.parse_array_constant()?);
            match self.current() {
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                }
                Some(TokenKind::Semicolon) => {
                    self.pos += 1;
                    rows.push(std::mem::take(&mut row));
                }
                Some(TokenKind::RightBrace) => {
                    self.pos += 1;
                    rows.push(row);
                    break;
                }
                _ => return Err(self.unexpected("',', ';' or '}' in array constant")),
            }
        }
        ArrayValue::from_rows(rows)
            .map(FormulaExpr::Array)
            .ok_or_else(|| FormulaError::parse("Array constant rows must have the same length"))
    }

    fn parse_array_constant(&mut self) -> FormulaResult<ScalarValue> {
        let negative = match self.current() {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                true
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                false
            }
            _ => false,
        };
        let value = match self.current() {
            Some(TokenKind::Number(n)) => ScalarValue::Number(if negative { -n } else { *n }),
            Some(TokenKind::Text(s)) if !negative => ScalarValue::Text(s.clone()),
            Some(TokenKind::Logical(b)) if !negative => ScalarValue::Logical(*b),
            Some(TokenKind::Error(e)) if !negative => ScalarValue::Error(*e),
            _ => return Err(self.unexpected("a constant in array")),
        };
        self.pos += 1;
        Ok(value)
    }

    fn parse_function_call(
        &mut self,
        prefix: Option<Prefix>,
        name: String,
        cell_shaped: bool,
    ) -> FormulaResult<FormulaExpr> {
        self.expect(TokenKind::LeftParen, "'('")?;
        let args = self.parse_arguments()?;

        let id = if cell_shaped {
            match self.registry.get(&name) {
                Some(def) => Self::known(def, args.len())?,
                None => {
                    log::trace!("{} is not a function, call evaluates to #REF!", name);
                    FunctionId::InvalidCellTarget
                }
            }
        } else {
            let def = self.registry.get(&name).or_else(|| {
                strip_future_prefix(&name).and_then(|bare| self.registry.get(bare))
            });
            match def {
                Some(def) => Self::known(def, args.len())?,
                None => {
                    log::trace!("unknown function {}", name);
                    FunctionId::Unknown
                }
            }
        };

        Ok(FormulaExpr::Function {
            prefix,
            name,
            id,
            args,
        })
    }

    fn known(def: &FunctionDef, count: usize) -> FormulaResult<FunctionId> {
        if !def.accepts_arg_count(count) {
            return Err(FormulaError::argument_count(
                def.name,
                def.min_args,
                def.max_args,
                count,
            ));
        }
        Ok(FunctionId::Known(def.name))
    }

    /// Arguments up to and including `)`; an empty slot is a blank argument
    fn parse_arguments(&mut self) -> FormulaResult<Vec<FormulaExpr>> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RightParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            if matches!(
                self.current(),
                Some(TokenKind::Comma | TokenKind::RightParen)
            ) {
                args.push(FormulaExpr::Scalar(ScalarValue::Blank));
            } else {
                args.push(self.parse_expression()?);
            }
            match self.current() {
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                }
                Some(TokenKind::RightParen) => {
                    self.pos += 1;
                    return Ok(args);
                }
                _ => return Err(self.unexpected("',' or ')' in argument list")),
            }
        }
    }
}

fn row_coord(kind: &TokenKind) -> Option<Coord> {
    match kind {
        TokenKind::Row(coord) => Some(*coord),
        _ => None,
    }
}

fn column_coord(kind: &TokenKind) -> Option<Coord> {
    match kind {
        TokenKind::Column(coord) => Some(*coord),
        _ => None,
    }
}

/// `left:right`, folding two plain references into one area
fn combine_range(left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
    let merged = match (&left, &right) {
        (
            FormulaExpr::Reference {
                reference: l, ..
            }
            | FormulaExpr::Reference3D {
                reference: l, ..
            },
            FormulaExpr::Reference {
                prefix: None,
                reference: r,
            },
        ) => merge_references(l, r),
        _ => None,
    };

    match (merged, left) {
        (Some(reference), FormulaExpr::Reference { prefix, .. }) => {
            FormulaExpr::Reference { prefix, reference }
        }
        (Some(reference), FormulaExpr::Reference3D { prefix, .. }) => {
            FormulaExpr::Reference3D { prefix, reference }
        }
        (_, left) => FormulaExpr::binary(BinaryOperator::Range, left, right),
    }
}

fn merge_references(left: &Reference, right: &Reference) -> Option<Reference> {
    match (*left, *right) {
        (Reference::Cell(start), Reference::Cell(end)) => Some(Reference::Area { start, end }),
        (
            Reference::Rows { first, last },
            Reference::Rows {
                first: next,
                last: end,
            },
        ) if first == last && next == end => Some(Reference::Rows { first, last: end }),
        (
            Reference::Columns { first, last },
            Reference::Columns {
                first: next,
                last: end,
            },
        ) if first == last && next == end => Some(Reference::Columns { first, last: end }),
        _ => None,
    }
}
