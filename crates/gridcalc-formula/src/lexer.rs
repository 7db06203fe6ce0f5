//! Formula tokenizer
//!
//! Produces spanned tokens for both reference notations. Significant
//! whitespace (the intersection operator) is emitted as [`TokenKind::Space`]
//! only between two reference operands; all other whitespace is dropped, but
//! the spans let callers copy it back verbatim.

use crate::ast::{CellRef, Coord, Prefix, ReferenceStyle, SheetRef};
use crate::error::{FormulaError, FormulaResult};
use gridcalc_core::{CellAddress, ErrorCode, MAX_COLS, MAX_ROWS};
use lazy_regex::regex_find;
use std::ops::Range;

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Text(String),
    Logical(bool),
    Error(ErrorCode),

    // Names and references
    /// Function or defined name
    Ident(String),
    /// A cell-reference-shaped name directly followed by `(`, e.g. `LOG10(`
    CellFunction(String),
    Cell(CellRef),
    /// Whole row (`3` of `3:5`, or R1C1 `R3`)
    Row(Coord),
    /// Whole column (`B` of `B:D`, or R1C1 `C2`)
    Column(Coord),
    /// `Sheet1!`, `'My Sheet'!`, `Jan:Mar!`, `[1]Sheet1!`
    Prefix(Prefix),
    /// `Table1[...]` or `[...]`; `inner` is the text between the outer brackets
    Structured {
        table: Option<String>,
        inner: String,
    },

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,
    /// Intersection operator
    Space,
    At,
    /// Spilled-range postfix
    Hash,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
}

impl TokenKind {
    /// Tokens after which whitespace may mean intersection
    fn ends_reference(&self) -> bool {
        matches!(
            self,
            TokenKind::Cell(_)
                | TokenKind::Row(_)
                | TokenKind::Column(_)
                | TokenKind::Ident(_)
                | TokenKind::Structured { .. }
                | TokenKind::RightParen
                | TokenKind::Hash
        )
    }

    /// Tokens before which whitespace may mean intersection
    fn starts_reference(&self) -> bool {
        matches!(
            self,
            TokenKind::Cell(_)
                | TokenKind::Row(_)
                | TokenKind::Column(_)
                | TokenKind::Ident(_)
                | TokenKind::CellFunction(_)
                | TokenKind::Prefix(_)
                | TokenKind::Structured { .. }
                | TokenKind::LeftParen
        )
    }
}

/// A token and the byte range of source text it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// Tokenize formula text (without the leading `=`)
pub fn tokenize(input: &str, style: ReferenceStyle) -> FormulaResult<Vec<Token>> {
    Lexer::new(input, style).tokenize()
}

/// Formula tokenizer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    style: ReferenceStyle,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, style: ReferenceStyle) -> Self {
        Self {
            input,
            pos: 0,
            style,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> FormulaResult<Vec<Token>> {
        loop {
            let space_start = self.pos;
            self.skip_whitespace();
            let had_space = self.pos > space_start;
            if self.is_at_end() {
                break;
            }

            let start = self.pos;
            let before = self.tokens.len();
            // Row and column ranges push their three tokens directly
            let kind = self.scan_token()?;
            if let Some(kind) = kind {
                self.push_scanned(kind, start);
            }

            let prev_ends = before > 0 && self.tokens[before - 1].kind.ends_reference();
            let starts = self
                .tokens
                .get(before)
                .map_or(false, |t| t.kind.starts_reference());
            if had_space && prev_ends && starts {
                self.tokens.insert(
                    before,
                    Token {
                        kind: TokenKind::Space,
                        span: space_start..start,
                    },
                );
            }
        }
        Ok(self.tokens)
    }

    fn push_scanned(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: start..self.pos,
        });
    }

    // === Token scanning ===

    fn scan_token(&mut self) -> FormulaResult<Option<TokenKind>> {
        if self.style == ReferenceStyle::A1 && self.try_scan_a1_row_or_column_range() {
            return Ok(None);
        }
        self.scan_single().map(Some)
    }

    fn scan_single(&mut self) -> FormulaResult<TokenKind> {
        let c = self
            .peek_char()
            .ok_or_else(|| FormulaError::parse("Unexpected end of formula"))?;

        // Single-character tokens
        let single = match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '^' => Some(TokenKind::Caret),
            '%' => Some(TokenKind::Percent),
            '&' => Some(TokenKind::Ampersand),
            ':' => Some(TokenKind::Colon),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semicolon),
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            '{' => Some(TokenKind::LeftBrace),
            '}' => Some(TokenKind::RightBrace),
            '@' => Some(TokenKind::At),
            '=' => Some(TokenKind::Equal),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(kind);
        }

        match c {
            '<' => {
                self.advance();
                Ok(match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        TokenKind::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::NotEqual
                    }
                    _ => TokenKind::LessThan,
                })
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(TokenKind::GreaterEqual);
                }
                Ok(TokenKind::GreaterThan)
            }
            '"' => self.scan_string(),
            '#' => self.scan_hash(),
            '\'' => self.scan_quoted_prefix(),
            '[' => self.scan_bracket(),
            _ => {
                if c.is_ascii_digit()
                    || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
                {
                    return self.scan_number();
                }
                if is_word_start(c) {
                    return self.scan_word();
                }
                Err(FormulaError::parse(format!(
                    "Unexpected character '{}' at position {}",
                    c, self.pos
                )))
            }
        }
    }

    fn scan_string(&mut self) -> FormulaResult<TokenKind> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Ok(TokenKind::Text(s));
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => {
                    return Err(FormulaError::parse(format!(
                        "Unterminated string starting at position {}",
                        start
                    )))
                }
            }
        }
    }

    fn scan_number(&mut self) -> FormulaResult<TokenKind> {
        let start = self.pos;
        self.take_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') {
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }

        // Exponent part, only when digits follow
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let digits_at = match self.peek_char_at(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self
                .peek_char_at(digits_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digits_at {
                    self.advance();
                }
                self.take_while(|c| c.is_ascii_digit());
            }
        }

        let text = &self.input[start..self.pos];
        text.parse()
            .map(TokenKind::Number)
            .map_err(|_| FormulaError::parse(format!("Invalid number '{}'", text)))
    }

    /// `#REF!` and friends, or the spill postfix right after a reference
    fn scan_hash(&mut self) -> FormulaResult<TokenKind> {
        let follows_reference = self
            .tokens
            .last()
            .map_or(false, |t| t.span.end == self.pos && t.kind.ends_reference());
        if follows_reference {
            self.advance();
            return Ok(TokenKind::Hash);
        }

        let rest = &self.input[self.pos..];
        let found = ErrorCode::ALL.into_iter().find(|code| {
            rest.get(..code.as_str().len())
                .map_or(false, |head| head.eq_ignore_ascii_case(code.as_str()))
        });
        match found {
            Some(code) => {
                self.pos += code.as_str().len();
                Ok(TokenKind::Error(code))
            }
            None => Err(FormulaError::parse(format!(
                "Unknown error literal at position {}",
                self.pos
            ))),
        }
    }

    /// `'Sheet name'!`, `'Jan:Mar'!`, `'[1]Sheet 1'!`
    fn scan_quoted_prefix(&mut self) -> FormulaResult<TokenKind> {
        let start = self.pos;
        self.advance();
        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    name.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => {
                    return Err(FormulaError::parse(format!(
                        "Unterminated sheet name starting at position {}",
                        start
                    )))
                }
            }
        }
        if self.peek_char() != Some('!') {
            return Err(FormulaError::parse(format!(
                "Expected '!' after quoted sheet name '{}'",
                name
            )));
        }
        self.advance();

        let mut file = None;
        let mut sheet_text = name.as_str();
        if let Some(found) = regex_find!(r"^\[\d+\]", sheet_text) {
            file = found[1..found.len() - 1].parse().ok();
            sheet_text = &sheet_text[found.len()..];
        }
        if sheet_text.is_empty() {
            return Err(FormulaError::parse("Empty sheet name"));
        }
        let sheet = match sheet_text.split_once(':') {
            Some((first, last)) => SheetRef::Span {
                first: first.to_string(),
                last: last.to_string(),
            },
            None => SheetRef::Single(sheet_text.to_string()),
        };
        Ok(TokenKind::Prefix(Prefix {
            file,
            sheet: Some(sheet),
        }))
    }

    /// `[1]Sheet1!`, `[1]!`, or a structured reference without a table name
    fn scan_bracket(&mut self) -> FormulaResult<TokenKind> {
        let rest = &self.input[self.pos..];
        if let Some(found) = regex_find!(r"^\[\d+\]", rest) {
            let after = rest[found.len()..].chars().next();
            if after == Some('!') || after.map_or(false, is_word_start) {
                let file: u32 = found[1..found.len() - 1]
                    .parse()
                    .map_err(|_| FormulaError::parse(format!("Invalid file index {}", found)))?;
                self.pos += found.len();
                if self.peek_char() == Some('!') {
                    self.advance();
                    return Ok(TokenKind::Prefix(Prefix {
                        file: Some(file),
                        sheet: None,
                    }));
                }
                let word = self.take_word();
                return match self.try_scan_sheet_prefix(&word) {
                    Some(Prefix { sheet, .. }) => Ok(TokenKind::Prefix(Prefix {
                        file: Some(file),
                        sheet,
                    })),
                    None => Err(FormulaError::parse(format!(
                        "Expected '!' after external sheet name '{}'",
                        word
                    ))),
                };
            }
        }
        let inner = self.scan_bracket_body()?;
        Ok(TokenKind::Structured { table: None, inner })
    }

    /// Balanced `[...]`, returning the text between the outer brackets.
    /// `'` escapes the next character.
    fn scan_bracket_body(&mut self) -> FormulaResult<String> {
        let start = self.pos;
        self.advance(); // '['
        let body_start = self.pos;
        let mut depth = 1;
        while let Some(c) = self.peek_char() {
            match c {
                '\'' => {
                    self.advance();
                }
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        let body = self.input[body_start..self.pos].to_string();
                        self.advance();
                        return Ok(body);
                    }
                }
                _ => {}
            }
            self.advance();
        }
        Err(FormulaError::parse(format!(
            "Unterminated '[' at position {}",
            start
        )))
    }

    /// A1 `1:3` and `B:D` ranges, emitted as three tokens
    fn try_scan_a1_row_or_column_range(&mut self) -> bool {
        let rest = &self.input[self.pos..];
        let (found, is_rows) = if let Some(m) = regex_find!(r"^\$?\d+:\$?\d+", rest) {
            (m, true)
        } else if let Some(m) = regex_find!(r"^\$?[A-Za-z]{1,3}:\$?[A-Za-z]{1,3}", rest) {
            (m, false)
        } else {
            return false;
        };
        let next = rest[found.len()..].chars().next();
        if next.map_or(false, |c| is_word_continue(c) || matches!(c, '(' | '!' | '[')) {
            return false;
        }

        let Some((left, right)) = found.split_once(':') else {
            return false;
        };
        let parsed = if is_rows {
            parse_a1_row(left).zip(parse_a1_row(right))
        } else {
            parse_a1_column(left).zip(parse_a1_column(right))
        };
        let Some((first, last)) = parsed else {
            return false;
        };
        let make = |coord| {
            if is_rows {
                TokenKind::Row(coord)
            } else {
                TokenKind::Column(coord)
            }
        };

        let start = self.pos;
        let colon = start + left.len();
        self.tokens.push(Token {
            kind: make(first),
            span: start..colon,
        });
        self.tokens.push(Token {
            kind: TokenKind::Colon,
            span: colon..colon + 1,
        });
        self.tokens.push(Token {
            kind: make(last),
            span: colon + 1..colon + 1 + right.len(),
        });
        self.pos = colon + 1 + right.len();
        true
    }

    fn scan_word(&mut self) -> FormulaResult<TokenKind> {
        if self.style == ReferenceStyle::R1C1 {
            if let Some(kind) = self.try_scan_r1c1()? {
                return Ok(kind);
            }
        }

        let word = self.take_word();

        if let Some(prefix) = self.try_scan_sheet_prefix(&word) {
            return Ok(TokenKind::Prefix(prefix));
        }

        if self.peek_char() == Some('[') && !word.contains('$') {
            let inner = self.scan_bracket_body()?;
            return Ok(TokenKind::Structured {
                table: Some(word),
                inner,
            });
        }

        let followed_by_paren = self.peek_char() == Some('(');
        if !followed_by_paren {
            if word.eq_ignore_ascii_case("TRUE") {
                return Ok(TokenKind::Logical(true));
            }
            if word.eq_ignore_ascii_case("FALSE") {
                return Ok(TokenKind::Logical(false));
            }
        }

        if self.style == ReferenceStyle::A1 && is_a1_cell(&word) {
            if followed_by_paren {
                return Ok(TokenKind::CellFunction(word));
            }
            let addr = CellAddress::parse(&word)
                .map_err(|e| FormulaError::parse(format!("Invalid reference '{}': {}", word, e)))?;
            return Ok(TokenKind::Cell(CellRef::new(
                Coord::A1 {
                    index: addr.row,
                    abs: addr.row_absolute,
                },
                Coord::A1 {
                    index: addr.col as u32,
                    abs: addr.col_absolute,
                },
            )));
        }

        if word.contains('$') {
            return Err(FormulaError::parse(format!("Invalid reference '{}'", word)));
        }
        Ok(TokenKind::Ident(word))
    }

    /// After a word: `!` makes it a sheet prefix, `:Other!` a sheet span
    fn try_scan_sheet_prefix(&mut self, word: &str) -> Option<Prefix> {
        if word.contains('$') {
            return None;
        }
        match self.peek_char() {
            Some('!') => {
                self.advance();
                Some(Prefix::sheet(word))
            }
            Some(':') => {
                let save = self.pos;
                self.advance();
                if self.peek_char().map_or(false, is_word_start) {
                    let last = self.take_word();
                    if self.peek_char() == Some('!') && !last.contains('$') {
                        self.advance();
                        return Some(Prefix::span(word, last));
                    }
                }
                self.pos = save;
                None
            }
            _ => None,
        }
    }

    /// R1C1 cell, row or column reference starting at the cursor
    fn try_scan_r1c1(&mut self) -> FormulaResult<Option<TokenKind>> {
        let save = self.pos;
        match self.peek_char() {
            Some('R' | 'r') => {
                self.advance();
                let row = self.scan_r1c1_coord(MAX_ROWS);
                if let Some(row) = row {
                    if matches!(self.peek_char(), Some('C' | 'c')) {
                        self.advance();
                        if let Some(col) = self.scan_r1c1_coord(MAX_COLS as u32) {
                            if self.peek_char() == Some('(') {
                                let name = self.input[save..self.pos].to_string();
                                return Ok(Some(TokenKind::CellFunction(name)));
                            }
                            if !self.continues_word() {
                                return Ok(Some(TokenKind::Cell(CellRef::new(row, col))));
                            }
                        }
                    } else if !self.continues_word() && self.peek_char() != Some('(') {
                        return Ok(Some(TokenKind::Row(row)));
                    }
                }
            }
            Some('C' | 'c') => {
                self.advance();
                if let Some(col) = self.scan_r1c1_coord(MAX_COLS as u32) {
                    if !self.continues_word() && self.peek_char() != Some('(') {
                        return Ok(Some(TokenKind::Column(col)));
                    }
                }
            }
            _ => {}
        }
        self.pos = save;
        Ok(None)
    }

    /// Digits after R/C (absolute), `[n]` (offset), or nothing (offset 0)
    fn scan_r1c1_coord(&mut self, limit: u32) -> Option<Coord> {
        match self.peek_char() {
            Some('[') => {
                let rest = &self.input[self.pos..];
                let found = regex_find!(r"^\[[+-]?\d+\]", rest)?;
                let offset: i32 = found[1..found.len() - 1]
                    .trim_start_matches('+')
                    .parse()
                    .ok()?;
                self.pos += found.len();
                Some(Coord::Offset(offset))
            }
            Some(c) if c.is_ascii_digit() => {
                let digits = self.take_while(|c| c.is_ascii_digit());
                let n: u32 = digits.parse().ok()?;
                (1..=limit).contains(&n).then(|| Coord::absolute(n - 1))
            }
            _ => Some(Coord::Offset(0)),
        }
    }

    fn continues_word(&self) -> bool {
        self.peek_char()
            .map_or(false, |c| is_word_continue(c) && c != '.')
    }

    // === Helper methods ===

    fn take_word(&mut self) -> String {
        let start = self.pos;
        if self.peek_char().map_or(false, is_word_start) {
            self.advance();
            self.take_while(is_word_continue);
        }
        self.input[start..self.pos].to_string()
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek_char().map_or(false, &pred) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

fn is_word_start(c: char) -> bool {
    matches!(c, '$' | '_' | '\\' | 'A'..='Z' | 'a'..='z') || (!c.is_ascii() && c.is_alphabetic())
}

fn is_word_continue(c: char) -> bool {
    matches!(c, '$' | '_' | '\\' | '.' | '?' | 'A'..='Z' | 'a'..='z' | '0'..='9')
        || (!c.is_ascii() && c.is_alphanumeric())
}

/// Whether a word has the exact shape of an A1 cell reference
fn is_a1_cell(word: &str) -> bool {
    lazy_regex::regex_is_match!(r"^\$?[A-Za-z]{1,3}\$?\d+$", word) && CellAddress::parse(word).is_ok()
}

fn parse_a1_row(text: &str) -> Option<Coord> {
    let (abs, digits) = match text.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let n: u32 = digits.parse().ok()?;
    (1..=MAX_ROWS).contains(&n).then(|| Coord::A1 { index: n - 1, abs })
}

fn parse_a1_column(text: &str) -> Option<Coord> {
    let (abs, letters) = match text.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let index = CellAddress::letters_to_column(letters).ok()?;
    Some(Coord::A1 {
        index: index as u32,
        abs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text, ReferenceStyle::A1)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn r1c1_kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text, ReferenceStyle::R1C1)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn cell(row: u32, col: u32) -> TokenKind {
        TokenKind::Cell(CellRef::new(Coord::relative(row), Coord::relative(col)))
    }

    #[test]
    fn test_lex_operators_and_literals() {
        assert_eq!(
            kinds("1.5e2<>\"a\"\"b\"&TRUE"),
            vec![
                TokenKind::Number(150.0),
                TokenKind::NotEqual,
                TokenKind::Text("a\"b".into()),
                TokenKind::Ampersand,
                TokenKind::Logical(true),
            ]
        );
        assert_eq!(
            kinds("#n/a+#DIV/0!"),
            vec![
                TokenKind::Error(ErrorCode::Na),
                TokenKind::Plus,
                TokenKind::Error(ErrorCode::Div0),
            ]
        );
    }

    #[test]
    fn test_lex_cells_and_functions() {
        assert_eq!(
            kinds("SUM(A1:$B$2)"),
            vec![
                TokenKind::Ident("SUM".into()),
                TokenKind::LeftParen,
                cell(0, 0),
                TokenKind::Colon,
                TokenKind::Cell(CellRef::new(Coord::absolute(1), Coord::absolute(1))),
                TokenKind::RightParen,
            ]
        );
        assert_eq!(
            kinds("LOG10(5)"),
            vec![
                TokenKind::CellFunction("LOG10".into()),
                TokenKind::LeftParen,
                TokenKind::Number(5.0),
                TokenKind::RightParen,
            ]
        );
    }

    #[test]
    fn test_lex_row_and_column_ranges() {
        assert_eq!(
            kinds("A:$C"),
            vec![
                TokenKind::Column(Coord::relative(0)),
                TokenKind::Colon,
                TokenKind::Column(Coord::absolute(2)),
            ]
        );
        assert_eq!(
            kinds("2:$5"),
            vec![
                TokenKind::Row(Coord::relative(1)),
                TokenKind::Colon,
                TokenKind::Row(Coord::absolute(4)),
            ]
        );
    }

    #[test]
    fn test_lex_prefixes() {
        assert_eq!(
            kinds("Sheet1!A1+'My Sheet'!B2"),
            vec![
                TokenKind::Prefix(Prefix::sheet("Sheet1")),
                cell(0, 0),
                TokenKind::Plus,
                TokenKind::Prefix(Prefix::sheet("My Sheet")),
                cell(1, 1),
            ]
        );
        assert_eq!(
            kinds("Jan:Mar!C3"),
            vec![TokenKind::Prefix(Prefix::span("Jan", "Mar")), cell(2, 2)]
        );
        assert_eq!(
            kinds("[2]Data!A1"),
            vec![
                TokenKind::Prefix(Prefix {
                    file: Some(2),
                    sheet: Some(SheetRef::Single("Data".into())),
                }),
                cell(0, 0),
            ]
        );
        assert_eq!(
            kinds("'It''s'!A1"),
            vec![TokenKind::Prefix(Prefix::sheet("It's")), cell(0, 0)]
        );
    }

    #[test]
    fn test_lex_structured() {
        assert_eq!(
            kinds("Sales[[#Headers],[Qty]]"),
            vec![TokenKind::Structured {
                table: Some("Sales".into()),
                inner: "[#Headers],[Qty]".into(),
            }]
        );
        assert_eq!(
            kinds("[@Qty]*2"),
            vec![
                TokenKind::Structured {
                    table: None,
                    inner: "@Qty".into(),
                },
                TokenKind::Star,
                TokenKind::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_lex_intersection_space() {
        assert_eq!(
            kinds("A1:B2 B1"),
            vec![
                cell(0, 0),
                TokenKind::Colon,
                cell(1, 1),
                TokenKind::Space,
                cell(0, 1),
            ]
        );
        assert_eq!(
            kinds(" 1 + A1 "),
            vec![TokenKind::Number(1.0), TokenKind::Plus, cell(0, 0)]
        );
    }

    #[test]
    fn test_lex_spill_and_at() {
        assert_eq!(kinds("A1#"), vec![cell(0, 0), TokenKind::Hash]);
        assert_eq!(
            kinds("@A1:A3"),
            vec![TokenKind::At, cell(0, 0), TokenKind::Colon, cell(2, 0)]
        );
    }

    #[test]
    fn test_lex_r1c1() {
        assert_eq!(
            r1c1_kinds("R1C1+R[-1]C[2]"),
            vec![
                TokenKind::Cell(CellRef::new(Coord::absolute(0), Coord::absolute(0))),
                TokenKind::Plus,
                TokenKind::Cell(CellRef::new(Coord::Offset(-1), Coord::Offset(2))),
            ]
        );
        assert_eq!(
            r1c1_kinds("RC"),
            vec![TokenKind::Cell(CellRef::new(
                Coord::Offset(0),
                Coord::Offset(0)
            ))]
        );
        assert_eq!(
            r1c1_kinds("R2:R[1]"),
            vec![
                TokenKind::Row(Coord::absolute(1)),
                TokenKind::Colon,
                TokenKind::Row(Coord::Offset(1)),
            ]
        );
        assert_eq!(r1c1_kinds("C[-3]"), vec![TokenKind::Column(Coord::Offset(-3))]);
        assert_eq!(r1c1_kinds("RATE"), vec![TokenKind::Ident("RATE".into())]);
        assert_eq!(r1c1_kinds("ROUND(1)")[0], TokenKind::Ident("ROUND".into()));
    }

    #[test]
    fn test_lex_spans() {
        let tokens = tokenize("SUM( A1 )", ReferenceStyle::A1).unwrap();
        assert_eq!(tokens[0].span, 0..3);
        assert_eq!(tokens[2].span, 5..7);
        assert_eq!(tokens[3].span, 8..9);
    }

    #[test]
    fn test_lex_errors() {
        assert!(tokenize("\"abc", ReferenceStyle::A1).is_err());
        assert!(tokenize("1+`", ReferenceStyle::A1).is_err());
        assert!(tokenize("#BOGUS", ReferenceStyle::A1).is_err());
        assert!(tokenize("'Sheet1", ReferenceStyle::A1).is_err());
        assert!(tokenize("[Qty", ReferenceStyle::A1).is_err());
        assert!(tokenize("$X", ReferenceStyle::A1).is_err());
    }
}
