//! Text functions

use super::{optional_number, scalar_arg};
use crate::invoke::CallContext;
use crate::value::{AnyValue, ReferenceValue};
use crate::wildcard::Wildcard;
use gridcalc_core::{ErrorCode, ScalarValue};

/// Text of a scalar, propagating errors
fn text_of(value: &ScalarValue) -> Result<String, ErrorCode> {
    match value {
        ScalarValue::Error(e) => Err(*e),
        other => Ok(other.as_text()),
    }
}

/// LEN(text) - number of characters
pub fn fn_len(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let text = text_of(&scalar_arg(ctx, args, 0))?;
    Ok(AnyValue::number(text.chars().count() as f64))
}

/// UPPER(text)
pub fn fn_upper(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    Ok(AnyValue::text(text_of(&scalar_arg(ctx, args, 0))?.to_uppercase()))
}

/// CONCATENATE(text1, ...) - one value per argument
pub fn fn_concatenate(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let mut out = String::new();
    for i in 0..args.len() {
        out.push_str(&text_of(&scalar_arg(ctx, args, i))?);
    }
    Ok(AnyValue::text(out))
}

/// CONCAT(text1, ...) - like CONCATENATE but ranges contribute every cell
pub fn fn_concat(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let mut out = String::new();
    for arg in args {
        arg.for_each_value(ctx.model, |v| {
            out.push_str(&text_of(&v)?);
            Ok(())
        })?;
    }
    Ok(AnyValue::text(out))
}

/// Every value of an argument in row-major order, blanks included
fn all_values(
    ctx: &CallContext,
    arg: &AnyValue,
    mut f: impl FnMut(ScalarValue) -> Result<(), ErrorCode>,
) -> Result<(), ErrorCode> {
    match arg {
        AnyValue::Reference(r) => {
            for area in r.areas() {
                let single = ReferenceValue::area(area.sheet, area.range);
                for v in single.to_array(ctx.model).into_values() {
                    f(v)?;
                }
            }
            Ok(())
        }
        other => other.for_each_value(ctx.model, f),
    }
}

/// TEXTJOIN(delimiter, ignore_empty, text1, ...)
pub fn fn_textjoin(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let delimiter = text_of(&scalar_arg(ctx, args, 0))?;
    let ignore_empty = scalar_arg(ctx, args, 1).to_logical()?;

    let mut parts: Vec<String> = Vec::new();
    let mut push = |v: ScalarValue| -> Result<(), ErrorCode> {
        let text = text_of(&v)?;
        if !(ignore_empty && text.is_empty()) {
            parts.push(text);
        }
        Ok(())
    };
    for arg in args.iter().skip(2) {
        if ignore_empty {
            // Blank cells outside the used range would be dropped anyway
            arg.for_each_value(ctx.model, &mut push)?;
        } else {
            all_values(ctx, arg, &mut push)?;
        }
    }

    Ok(AnyValue::text(parts.join(&delimiter)))
}

/// SEARCH(find_text, within_text, [start_num])
///
/// Case-insensitive, with `*`, `?` and `~` wildcards in `find_text`.
pub fn fn_search(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let find = text_of(&scalar_arg(ctx, args, 0))?;
    let within = text_of(&scalar_arg(ctx, args, 1))?;
    let start = optional_number(ctx, args, 2, 1.0)?.trunc();

    let len = within.chars().count();
    if start < 1.0 || start > len as f64 + 1.0 {
        return Err(ErrorCode::Value);
    }
    let skip = start as usize - 1;
    let tail: String = within.chars().skip(skip).collect();

    match Wildcard::new(&find).search(&tail) {
        Some(offset) => Ok(AnyValue::number((skip + offset + 1) as f64)),
        None => Err(ErrorCode::Value),
    }
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::{eval, eval_in};
    use crate::value::AnyValue;
    use gridcalc_core::{ErrorCode, MemoryWorkbook};

    fn workbook() -> MemoryWorkbook {
        let mut wb = MemoryWorkbook::new();
        wb.set_value(0, "A1", "a").unwrap();
        wb.set_value(0, "A3", "c").unwrap();
        wb.set_value(0, "B1", 1.5).unwrap();
        wb
    }

    #[test]
    fn test_len_upper() {
        assert_eq!(eval("=LEN(\"héllo\")"), AnyValue::number(5.0));
        assert_eq!(eval("=LEN(12.5)"), AnyValue::number(4.0));
        assert_eq!(eval("=UPPER(\"abc\")"), AnyValue::text("ABC"));
        assert_eq!(eval("=UPPER(#N/A)"), AnyValue::error(ErrorCode::Na));
    }

    #[test]
    fn test_concatenate_and_concat() {
        let wb = workbook();
        assert_eq!(
            eval_in(&wb, "=CONCATENATE(\"x\",B1,TRUE)"),
            AnyValue::text("x1.5TRUE")
        );
        assert_eq!(eval_in(&wb, "=CONCAT(A1:A3,\"!\")"), AnyValue::text("ac!"));
        // The whole range would need implicit intersection outside column A
        assert_eq!(
            eval_in(&wb, "=CONCATENATE(A1:A3)"),
            AnyValue::error(ErrorCode::Value)
        );
    }

    #[test]
    fn test_textjoin() {
        let wb = workbook();
        assert_eq!(
            eval_in(&wb, "=TEXTJOIN(\",\",TRUE,A1:A3,\"d\")"),
            AnyValue::text("a,c,d")
        );
        assert_eq!(
            eval_in(&wb, "=TEXTJOIN(\"-\",FALSE,A1:A3)"),
            AnyValue::text("a--c")
        );
    }

    #[test]
    fn test_search() {
        assert_eq!(eval("=SEARCH(\"B\",\"abcb\")"), AnyValue::number(2.0));
        assert_eq!(eval("=SEARCH(\"b\",\"abcb\",3)"), AnyValue::number(4.0));
        assert_eq!(eval("=SEARCH(\"x*y\",\"zzzxaybzz\")"), AnyValue::number(4.0));
        assert_eq!(eval("=SEARCH(\"c?b\",\"abcab\")"), AnyValue::number(3.0));
        assert_eq!(eval("=SEARCH(\"q\",\"abc\")"), AnyValue::error(ErrorCode::Value));
        assert_eq!(eval("=SEARCH(\"a\",\"abc\",0)"), AnyValue::error(ErrorCode::Value));
    }
}
