//! Lookup and reference functions

use super::{optional_number, scalar_arg};
use crate::evaluator::compare_values;
use crate::invoke::CallContext;
use crate::value::{AnyValue, ArrayValue, ReferenceValue};
use crate::wildcard::Wildcard;
use gridcalc_core::{CellRange, ErrorCode, ScalarValue, MAX_COLS, MAX_ROWS};
use std::cmp::Ordering;

/// ROWS(array)
pub fn fn_rows(_ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    match args.first() {
        Some(AnyValue::Reference(r)) if r.single_area().is_none() => Err(ErrorCode::Ref),
        Some(arg) => Ok(AnyValue::number(arg.rows() as f64)),
        None => Err(ErrorCode::Value),
    }
}

/// COLUMNS(array)
pub fn fn_columns(_ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    match args.first() {
        Some(AnyValue::Reference(r)) if r.single_area().is_none() => Err(ErrorCode::Ref),
        Some(arg) => Ok(AnyValue::number(arg.cols() as f64)),
        None => Err(ErrorCode::Value),
    }
}

/// Validate a 1-based INDEX position; 0 selects the whole dimension
fn index_position(n: f64, extent: usize) -> Result<Option<usize>, ErrorCode> {
    let n = n.trunc();
    if n < 0.0 {
        Err(ErrorCode::Value)
    } else if n == 0.0 {
        Ok(None)
    } else if n > extent as f64 {
        Err(ErrorCode::Ref)
    } else {
        Ok(Some(n as usize - 1))
    }
}

/// INDEX(array, row_num, [column_num])
///
/// A reference argument gives a reference back, so the result can take part
/// in `:` or be passed on to range-accepting functions. A row or column
/// number of 0 selects the whole column or row.
pub fn fn_index(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let source = args.first().ok_or(ErrorCode::Value)?;
    if let AnyValue::Reference(r) = source {
        if r.single_area().is_none() {
            return Err(ErrorCode::Ref);
        }
    }
    let (rows, cols) = (source.rows(), source.cols());

    let first = optional_number(ctx, args, 1, 0.0)?;
    let second = optional_number(ctx, args, 2, 0.0)?;
    // A single row indexed by one number is indexed by column
    let (row_num, col_num) = if rows == 1 && args.len() < 3 {
        (0.0, first)
    } else {
        (first, second)
    };
    let row = index_position(row_num, rows)?;
    let col = index_position(col_num, cols)?;

    let (r0, r1) = row.map_or((0, rows - 1), |r| (r, r));
    let (c0, c1) = col.map_or((0, cols - 1), |c| (c, c));

    match source {
        AnyValue::Reference(r) => {
            let area = r.single_area().ok_or(ErrorCode::Ref)?;
            let start = area.range.start;
            let range = CellRange::from_indices(
                start.row + r0 as u32,
                start.col + c0 as u16,
                start.row + r1 as u32,
                start.col + c1 as u16,
            );
            Ok(AnyValue::Reference(ReferenceValue::area(area.sheet, range)))
        }
        other => {
            let array = ctx.array(other);
            if r0 == r1 && c0 == c1 {
                return Ok(AnyValue::Scalar(
                    array.get(r0, c0).cloned().unwrap_or(ScalarValue::Blank),
                ));
            }
            let slice = ArrayValue::from_fn(r1 - r0 + 1, c1 - c0 + 1, |r, c| {
                array
                    .get(r0 + r, c0 + c)
                    .cloned()
                    .unwrap_or(ScalarValue::Blank)
            });
            Ok(AnyValue::Array(slice))
        }
    }
}

/// Non-blank entries of a one-row or one-column lookup vector, with their
/// 0-based positions
///
/// References are read only within the used range.
fn lookup_vector(
    ctx: &CallContext,
    arg: &AnyValue,
) -> Result<Vec<(usize, ScalarValue)>, ErrorCode> {
    if arg.rows() != 1 && arg.cols() != 1 {
        return Err(ErrorCode::Na);
    }
    let by_row = arg.cols() == 1;

    match arg {
        AnyValue::Reference(r) => {
            let area = r.single_area().ok_or(ErrorCode::Na)?;
            let start = area.range.start;
            let clipped = ctx
                .model
                .used_range(area.sheet)
                .and_then(|used| area.range.intersect(&used));
            let mut entries = Vec::new();
            if let Some(clipped) = clipped {
                for addr in clipped.cells() {
                    let value = ctx.model.cell_value(area.sheet, addr.row, addr.col);
                    if value.is_blank() {
                        continue;
                    }
                    let pos = if by_row {
                        (addr.row - start.row) as usize
                    } else {
                        (addr.col - start.col) as usize
                    };
                    entries.push((pos, value));
                }
            }
            Ok(entries)
        }
        other => Ok(ctx
            .array(other)
            .into_values()
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_blank())
            .collect()),
    }
}

fn same_kind(a: &ScalarValue, b: &ScalarValue) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// MATCH(lookup_value, lookup_array, [match_type])
///
/// `match_type` 0 finds the first equal value (text with wildcards), 1 the
/// last value not above `lookup_value` in ascending data, -1 the last value
/// not below it in descending data. The result is 1-based.
pub fn fn_match(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let lookup = scalar_arg(ctx, args, 0);
    if let ScalarValue::Error(e) = lookup {
        return Err(e);
    }
    let vector = args.get(1).ok_or(ErrorCode::Na)?;
    let match_type = optional_number(ctx, args, 2, 1.0)?;
    let entries = lookup_vector(ctx, vector)?;

    let found = if match_type == 0.0 {
        match &lookup {
            ScalarValue::Text(pattern) => {
                let pattern = Wildcard::new(pattern);
                entries
                    .iter()
                    .find(|(_, v)| matches!(v, ScalarValue::Text(s) if pattern.matches(s)))
            }
            _ => entries.iter().find(|(_, v)| {
                same_kind(v, &lookup) && compare_values(v, &lookup) == Ordering::Equal
            }),
        }
    } else {
        let stop = if match_type > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Less
        };
        entries
            .iter()
            .filter(|(_, v)| same_kind(v, &lookup))
            .take_while(|(_, v)| compare_values(v, &lookup) != stop)
            .last()
    };

    match found {
        Some((pos, _)) => Ok(AnyValue::number((pos + 1) as f64)),
        None => Err(ErrorCode::Na),
    }
}

/// TRANSPOSE(array)
pub fn fn_transpose(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let source = args.first().ok_or(ErrorCode::Value)?;
    Ok(AnyValue::Array(ctx.array(source).transpose()))
}

/// SEQUENCE(rows, [columns], [start], [step])
pub fn fn_sequence(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let rows = optional_number(ctx, args, 0, 1.0)?.trunc();
    let cols = optional_number(ctx, args, 1, 1.0)?.trunc();
    let start = optional_number(ctx, args, 2, 1.0)?;
    let step = optional_number(ctx, args, 3, 1.0)?;

    if rows < 1.0 || cols < 1.0 || rows > MAX_ROWS as f64 || cols > MAX_COLS as f64 {
        return Err(ErrorCode::Value);
    }
    let (rows, cols) = (rows as usize, cols as usize);
    if !ArrayValue::fits(rows, cols) {
        return Err(ErrorCode::Num);
    }

    Ok(AnyValue::Array(ArrayValue::from_fn(rows, cols, |r, c| {
        ScalarValue::Number(start + step * (r * cols + c) as f64)
    })))
}
