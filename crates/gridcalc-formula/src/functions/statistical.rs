//! Conditional aggregates

use super::criteria::CriteriaMatcher;
use super::scalar_arg;
use crate::invoke::CallContext;
use crate::value::AnyValue;
use gridcalc_core::{ErrorCode, ScalarValue, MAX_COLS, MAX_ROWS};

/// Visit the stored cells of a criteria range with their offsets
///
/// Returns the total number of cells the range covers, stored or not, so
/// callers can account for blanks that were never visited.
fn for_each_offset(
    ctx: &CallContext,
    arg: &AnyValue,
    mut f: impl FnMut(usize, usize, &ScalarValue) -> Result<(), ErrorCode>,
) -> Result<u64, ErrorCode> {
    match arg {
        AnyValue::Scalar(v) => {
            f(0, 0, v)?;
            Ok(1)
        }
        AnyValue::Array(a) => {
            for (r, row) in a.row_slices().enumerate() {
                for (c, v) in row.iter().enumerate() {
                    f(r, c, v)?;
                }
            }
            Ok((a.rows() * a.cols()) as u64)
        }
        AnyValue::Reference(reference) => {
            let area = reference.single_area().ok_or(ErrorCode::Value)?;
            let start = area.range.start;
            let clipped = ctx
                .model
                .used_range(area.sheet)
                .and_then(|used| area.range.intersect(&used));
            if let Some(clipped) = clipped {
                for addr in clipped.cells() {
                    let value = ctx.model.cell_value(area.sheet, addr.row, addr.col);
                    f(
                        (addr.row - start.row) as usize,
                        (addr.col - start.col) as usize,
                        &value,
                    )?;
                }
            }
            Ok(area.range.cell_count())
        }
    }
}

/// Value of the sum range at an offset from its top-left cell
///
/// The sum range takes the shape of the criteria range, so offsets past its
/// own extent still read the sheet.
fn value_at(ctx: &CallContext, sum: &AnyValue, row: usize, col: usize) -> ScalarValue {
    match sum {
        AnyValue::Scalar(v) if row == 0 && col == 0 => v.clone(),
        AnyValue::Scalar(_) => ScalarValue::Blank,
        AnyValue::Array(a) => a.get(row, col).cloned().unwrap_or(ScalarValue::Blank),
        AnyValue::Reference(reference) => match reference.single_area() {
            Some(area) => {
                let r = area.range.start.row as u64 + row as u64;
                let c = area.range.start.col as u64 + col as u64;
                if r < MAX_ROWS as u64 && c < MAX_COLS as u64 {
                    ctx.model.cell_value(area.sheet, r as u32, c as u16)
                } else {
                    ScalarValue::Blank
                }
            }
            None => ScalarValue::Error(ErrorCode::Value),
        },
    }
}

/// COUNTIF(range, criteria)
pub fn fn_countif(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let range = args.first().ok_or(ErrorCode::Value)?;
    let matcher = CriteriaMatcher::new(&scalar_arg(ctx, args, 1));

    let mut count: u64 = 0;
    let mut visited: u64 = 0;
    let total = for_each_offset(ctx, range, |_, _, v| {
        visited += 1;
        if matcher.matches(v) {
            count += 1;
        }
        Ok(())
    })?;

    // Cells outside the used range are blank
    if matcher.matches(&ScalarValue::Blank) {
        count += total - visited;
    }

    Ok(AnyValue::number(count as f64))
}

/// SUMIF(range, criteria, [sum_range])
pub fn fn_sumif(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let range = args.first().ok_or(ErrorCode::Value)?;
    let matcher = CriteriaMatcher::new(&scalar_arg(ctx, args, 1));
    let sum_range = match args.get(2) {
        None | Some(AnyValue::Scalar(ScalarValue::Blank)) => range,
        Some(other) => other,
    };

    let mut sum = 0.0;
    for_each_offset(ctx, range, |r, c, v| {
        if matcher.matches(v) {
            match value_at(ctx, sum_range, r, c) {
                ScalarValue::Number(n) => sum += n,
                ScalarValue::Error(e) => return Err(e),
                _ => {} // Non-numeric values are ignored
            }
        }
        Ok(())
    })?;

    Ok(AnyValue::number(sum))
}
