//! Logical functions

use super::scalar_arg;
use crate::invoke::CallContext;
use crate::value::AnyValue;
use gridcalc_core::{ErrorCode, ScalarValue};

/// IF(condition, value_if_true, [value_if_false])
///
/// The chosen branch is returned as-is, so `IF(x, A1:A3, B1:B3)` yields a
/// reference.
pub fn fn_if(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let condition = scalar_arg(ctx, args, 0).to_logical()?;
    let branch = if condition { args.get(1) } else { args.get(2) };

    Ok(match branch {
        None => AnyValue::logical(false),
        Some(AnyValue::Scalar(ScalarValue::Blank)) => AnyValue::number(0.0),
        Some(value) => value.clone(),
    })
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let pick = if scalar_arg(ctx, args, 0).is_error() { 1 } else { 0 };
    Ok(args
        .get(pick)
        .cloned()
        .unwrap_or(AnyValue::Scalar(ScalarValue::Blank)))
}

/// AND(logical1, ...)
///
/// Text inside ranges is skipped; text given directly must read as a logical.
pub fn fn_and(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let mut result = true;
    let mut seen = false;

    for arg in args {
        match arg {
            AnyValue::Scalar(ScalarValue::Blank) => {}
            AnyValue::Scalar(v) => {
                result &= v.to_logical()?;
                seen = true;
            }
            other => other.for_each_value(ctx.model, |v| {
                match v {
                    ScalarValue::Logical(b) => {
                        result &= b;
                        seen = true;
                    }
                    ScalarValue::Number(n) => {
                        result &= n != 0.0;
                        seen = true;
                    }
                    ScalarValue::Error(e) => return Err(e),
                    _ => {}
                }
                Ok(())
            })?,
        }
    }

    if seen {
        Ok(AnyValue::logical(result))
    } else {
        Err(ErrorCode::Value)
    }
}

/// NOT(logical)
pub fn fn_not(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    Ok(AnyValue::logical(!scalar_arg(ctx, args, 0).to_logical()?))
}
