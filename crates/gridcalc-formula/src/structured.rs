//! Structured (table) references: `Sales[Amount]`, `[@Qty]`,
//! `Sales[[#Headers],[Region]:[Amount]]`

use crate::error::{FormulaError, FormulaResult};
use gridcalc_core::{CellRange, ErrorCode, TableInfo};

/// Row selector of a structured reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableItem {
    All,
    Data,
    Headers,
    Totals,
    ThisRow,
}

impl TableItem {
    fn keyword(&self) -> &'static str {
        match self {
            TableItem::All => "#All",
            TableItem::Data => "#Data",
            TableItem::Headers => "#Headers",
            TableItem::Totals => "#Totals",
            TableItem::ThisRow => "#This Row",
        }
    }

    fn from_keyword(s: &str) -> Option<Self> {
        let s = s.trim();
        [
            TableItem::All,
            TableItem::Data,
            TableItem::Headers,
            TableItem::Totals,
            TableItem::ThisRow,
        ]
        .into_iter()
        .find(|item| item.keyword().eq_ignore_ascii_case(s))
    }
}

/// One column or a `[First]:[Last]` run of columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnSpan {
    pub first: String,
    pub last: Option<String>,
}

/// A parsed structured reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructuredRef {
    /// Table name; `None` means the table containing the calling cell
    pub table: Option<String>,
    /// Row selectors; empty selects the data rows
    pub items: Vec<TableItem>,
    /// Column selector; `None` selects every column
    pub columns: Option<ColumnSpan>,
}

impl StructuredRef {
    /// Parse the text between the outer brackets
    pub fn parse(table: Option<String>, inner: &str) -> FormulaResult<Self> {
        let mut reference = StructuredRef {
            table,
            items: Vec::new(),
            columns: None,
        };
        let inner = inner.trim();

        if let Some(rest) = inner.strip_prefix('@') {
            reference.items.push(TableItem::ThisRow);
            let rest = rest.trim();
            if rest.starts_with('[') {
                let parts = split_bracketed(rest)?;
                reference.columns = Some(column_span(&parts, inner)?);
            } else if !rest.is_empty() {
                reference.columns = Some(ColumnSpan {
                    first: unescape(rest),
                    last: None,
                });
            }
        } else if inner.starts_with('[') {
            let parts = split_bracketed(inner)?;
            let mut columns = Vec::new();
            for part in parts {
                match part {
                    Part::Item(text) => {
                        let item = TableItem::from_keyword(&text).ok_or_else(|| {
                            FormulaError::Parse(format!("Unknown table item '{}'", text))
                        })?;
                        if !columns.is_empty() {
                            return Err(FormulaError::Parse(format!(
                                "Table item '{}' after column selector",
                                text
                            )));
                        }
                        reference.items.push(item);
                    }
                    other => columns.push(other),
                }
            }
            if !columns.is_empty() {
                reference.columns = Some(column_span(&columns, inner)?);
            }
        } else if inner.starts_with('#') {
            let item = TableItem::from_keyword(inner)
                .ok_or_else(|| FormulaError::Parse(format!("Unknown table item '{}'", inner)))?;
            reference.items.push(item);
        } else if !inner.is_empty() {
            reference.columns = Some(ColumnSpan {
                first: unescape(inner),
                last: None,
            });
        }

        Ok(reference)
    }

    /// Formula text for this reference
    pub fn to_formula(&self) -> String {
        let mut out = self.table.clone().unwrap_or_default();
        out.push('[');
        match (self.items.as_slice(), &self.columns) {
            ([TableItem::ThisRow], None) => out.push('@'),
            ([TableItem::ThisRow], Some(ColumnSpan { first, last: None })) => {
                out.push('@');
                if is_simple_column(first) {
                    out.push_str(first);
                } else {
                    out.push('[');
                    out.push_str(&escape(first));
                    out.push(']');
                }
            }
            ([], Some(ColumnSpan { first, last: None })) if is_simple_column(first) => {
                out.push_str(&escape(first));
            }
            ([item], None) => out.push_str(item.keyword()),
            (items, columns) => {
                let mut parts: Vec<String> = items
                    .iter()
                    .map(|i| format!("[{}]", i.keyword()))
                    .collect();
                if let Some(span) = columns {
                    let mut col = format!("[{}]", escape(&span.first));
                    if let Some(last) = &span.last {
                        col.push_str(&format!(":[{}]", escape(last)));
                    }
                    parts.push(col);
                }
                out.push_str(&parts.join(","));
            }
        }
        out.push(']');
        out
    }

    /// Resolve to a cell area of `table`
    ///
    /// `origin_row` is the calling cell's row, used by `#This Row`.
    pub fn resolve(&self, table: &TableInfo, origin_row: u32) -> Result<CellRange, ErrorCode> {
        let (left, right) = match &self.columns {
            None => (table.range.start.col, table.range.end.col),
            Some(span) => {
                let first = table.column_index(&span.first).ok_or(ErrorCode::Ref)?;
                let last = match &span.last {
                    Some(last) => table.column_index(last).ok_or(ErrorCode::Ref)?,
                    None => first,
                };
                let base = table.range.start.col;
                (base + first.min(last), base + first.max(last))
            }
        };

        let mut rows: Option<(u32, u32)> = None;
        let items: &[TableItem] = if self.items.is_empty() {
            &[TableItem::Data]
        } else {
            &self.items
        };
        for item in items {
            let span = match item {
                TableItem::All => Some(table.range),
                TableItem::Data => table.data_range(),
                TableItem::Headers => table.header_range(),
                TableItem::Totals => table.totals_range(),
                TableItem::ThisRow => {
                    let data = table.data_range().ok_or(ErrorCode::Value)?;
                    if origin_row < data.start.row || origin_row > data.end.row {
                        return Err(ErrorCode::Value);
                    }
                    Some(CellRange::from_indices(origin_row, 0, origin_row, 0))
                }
            }
            .ok_or(ErrorCode::Ref)?;
            rows = Some(match rows {
                None => (span.start.row, span.end.row),
                Some((top, bottom)) => (top.min(span.start.row), bottom.max(span.end.row)),
            });
        }
        let (top, bottom) = rows.ok_or(ErrorCode::Ref)?;
        Ok(CellRange::from_indices(top, left, bottom, right))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Item(String),
    Column(String),
    /// `[A]:[B]`
    ColumnRun(String, String),
}

/// Split `[a],[b]:[c]` into parts. `'` escapes the next character.
fn split_bracketed(text: &str) -> FormulaResult<Vec<Part>> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut i = 0;
    // Returns the unescaped text and whether it opened with a bare `#`.
    let read_one = |i: &mut usize| -> FormulaResult<(String, bool)> {
        if chars.get(*i) != Some(&'[') {
            return Err(FormulaError::Parse(format!(
                "Expected '[' in structured reference '{}'",
                text
            )));
        }
        *i += 1;
        let mut name = String::new();
        let mut is_item = false;
        loop {
            match chars.get(*i) {
                Some('\'') => {
                    let escaped = chars.get(*i + 1).ok_or_else(|| {
                        FormulaError::Parse(format!("Dangling escape in '{}'", text))
                    })?;
                    name.push(*escaped);
                    *i += 2;
                }
                Some(']') => {
                    *i += 1;
                    return Ok((name, is_item));
                }
                Some(c) => {
                    if *c == '#' && name.trim().is_empty() {
                        is_item = true;
                    }
                    name.push(*c);
                    *i += 1;
                }
                None => {
                    return Err(FormulaError::Parse(format!(
                        "Unterminated structured reference '{}'",
                        text
                    )))
                }
            }
        }
    };

    while i < chars.len() {
        let (first, is_item) = read_one(&mut i)?;
        skip_spaces(&chars, &mut i);
        if is_item {
            parts.push(Part::Item(first));
        } else if chars.get(i) == Some(&':') {
            i += 1;
            skip_spaces(&chars, &mut i);
            let (last, _) = read_one(&mut i)?;
            parts.push(Part::ColumnRun(first, last));
            skip_spaces(&chars, &mut i);
        } else {
            parts.push(Part::Column(first));
        }
        match chars.get(i) {
            Some(',') => {
                i += 1;
                skip_spaces(&chars, &mut i);
            }
            None => {}
            Some(c) => {
                return Err(FormulaError::Parse(format!(
                    "Unexpected '{}' in structured reference '{}'",
                    c, text
                )))
            }
        }
    }
    Ok(parts)
}

fn skip_spaces(chars: &[char], i: &mut usize) {
    while chars.get(*i) == Some(&' ') {
        *i += 1;
    }
}

fn column_span(parts: &[Part], text: &str) -> FormulaResult<ColumnSpan> {
    match parts {
        [Part::Column(name)] => Ok(ColumnSpan {
            first: name.clone(),
            last: None,
        }),
        [Part::ColumnRun(first, last)] => Ok(ColumnSpan {
            first: first.clone(),
            last: Some(last.clone()),
        }),
        _ => Err(FormulaError::Parse(format!(
            "Invalid column selector in structured reference '{}'",
            text
        ))),
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '[' | ']' | '#' | '\'') {
            out.push('\'');
        }
        out.push(c);
    }
    out
}

fn is_simple_column(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('#')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sales() -> TableInfo {
        TableInfo {
            name: "Sales".into(),
            sheet: 0,
            range: CellRange::parse("B2:D7").unwrap(),
            has_header: true,
            has_totals: true,
            columns: vec!["Region".into(), "Qty".into(), "Unit Price".into()],
        }
    }

    #[test]
    fn test_parse_simple_column() {
        let r = StructuredRef::parse(Some("Sales".into()), "Qty").unwrap();
        assert_eq!(r.items, vec![]);
        assert_eq!(
            r.columns,
            Some(ColumnSpan {
                first: "Qty".into(),
                last: None
            })
        );
        assert_eq!(r.to_formula(), "Sales[Qty]");
    }

    #[test]
    fn test_parse_this_row() {
        let r = StructuredRef::parse(None, "@[Unit Price]").unwrap();
        assert_eq!(r.items, vec![TableItem::ThisRow]);
        assert_eq!(r.columns.as_ref().unwrap().first, "Unit Price");
        assert_eq!(r.to_formula(), "[@[Unit Price]]");

        let r = StructuredRef::parse(None, "@Qty").unwrap();
        assert_eq!(r.to_formula(), "[@Qty]");
    }

    #[test]
    fn test_parse_items_and_column_run() {
        let r = StructuredRef::parse(Some("Sales".into()), "[#Headers],[#Data],[Region]:[Qty]")
            .unwrap();
        assert_eq!(r.items, vec![TableItem::Headers, TableItem::Data]);
        assert_eq!(
            r.columns,
            Some(ColumnSpan {
                first: "Region".into(),
                last: Some("Qty".into())
            })
        );
        assert_eq!(
            r.to_formula(),
            "Sales[[#Headers],[#Data],[Region]:[Qty]]"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(StructuredRef::parse(None, "#Bogus").is_err());
        assert!(StructuredRef::parse(None, "[Qty],[#Data]").is_err());
        assert!(StructuredRef::parse(None, "[Qty").is_err());
    }

    #[test]
    fn test_escaped_column_names() {
        let r = StructuredRef::parse(None, "['#Items]").unwrap();
        assert_eq!(r.columns.as_ref().unwrap().first, "#Items");
        assert_eq!(r.to_formula(), "[['#Items]]");
    }

    #[test]
    fn test_resolve() {
        let t = sales();
        let data_qty = StructuredRef::parse(None, "Qty").unwrap();
        assert_eq!(
            data_qty.resolve(&t, 0),
            Ok(CellRange::parse("C3:C6").unwrap())
        );

        let all = StructuredRef::parse(None, "#All").unwrap();
        assert_eq!(all.resolve(&t, 0), Ok(CellRange::parse("B2:D7").unwrap()));

        let headers = StructuredRef::parse(None, "[#Headers],[#Data],[Qty]:[Region]").unwrap();
        assert_eq!(
            headers.resolve(&t, 0),
            Ok(CellRange::parse("B2:C6").unwrap())
        );

        let this_row = StructuredRef::parse(None, "@[Unit Price]").unwrap();
        assert_eq!(this_row.resolve(&t, 3), Ok(CellRange::parse("D4").unwrap()));
        assert_eq!(this_row.resolve(&t, 1), Err(ErrorCode::Value));

        let missing = StructuredRef::parse(None, "Nope").unwrap();
        assert_eq!(missing.resolve(&t, 0), Err(ErrorCode::Ref));
    }
}
