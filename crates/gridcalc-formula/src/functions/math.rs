//! Math functions

use super::{number_arg, optional_number};
use crate::invoke::CallContext;
use crate::value::AnyValue;
use gridcalc_core::{ErrorCode, ScalarValue};

/// SUM function
///
/// Values typed directly as arguments are coerced; cells and array elements
/// count only when they hold numbers.
pub fn fn_sum(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let mut sum = 0.0;

    for arg in args {
        match arg {
            AnyValue::Scalar(v) => sum += v.to_number()?,
            other => other.for_each_value(ctx.model, |v| {
                match v {
                    ScalarValue::Number(n) => sum += n,
                    ScalarValue::Error(e) => return Err(e),
                    _ => {} // Ignore non-numeric
                }
                Ok(())
            })?,
        }
    }

    Ok(AnyValue::number(sum))
}

/// COUNT function
pub fn fn_count(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let mut count = 0;

    for arg in args {
        match arg {
            AnyValue::Scalar(ScalarValue::Blank | ScalarValue::Error(_)) => {}
            AnyValue::Scalar(v) => {
                if v.as_number().is_some() {
                    count += 1;
                }
            }
            other => other.for_each_value(ctx.model, |v| {
                if matches!(v, ScalarValue::Number(_)) {
                    count += 1;
                }
                Ok(())
            })?,
        }
    }

    Ok(AnyValue::number(count as f64))
}

/// RAND() - Returns a random number between 0 and 1
pub fn fn_rand(_ctx: &CallContext, _args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    Ok(AnyValue::number(rng.gen::<f64>()))
}

/// ABS(number)
pub fn fn_abs(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    Ok(AnyValue::number(number_arg(ctx, args, 0)?.abs()))
}

/// ROUND(number, [num_digits]) - half away from zero
pub fn fn_round(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let number = number_arg(ctx, args, 0)?;
    let num_digits = optional_number(ctx, args, 1, 0.0)?.trunc() as i32;

    // For negative digits, we round to the left of the decimal point
    let multiplier = 10_f64.powi(num_digits);
    let result = if number >= 0.0 {
        (number * multiplier + 0.5).floor() / multiplier
    } else {
        (number * multiplier - 0.5).ceil() / multiplier
    };

    if result.is_finite() {
        Ok(AnyValue::number(result))
    } else {
        Err(ErrorCode::Num)
    }
}

/// PI()
pub fn fn_pi(_ctx: &CallContext, _args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    Ok(AnyValue::number(std::f64::consts::PI))
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::{eval, eval_in};
    use crate::value::AnyValue;
    use gridcalc_core::{ErrorCode, MemoryWorkbook};

    #[test]
    fn test_sum() {
        let mut wb = MemoryWorkbook::new();
        wb.set_value(0, "A1", 1.0).unwrap();
        wb.set_value(0, "A2", "2").unwrap();
        wb.set_value(0, "A3", 3.0).unwrap();
        assert_eq!(eval_in(&wb, "=SUM(A1:A3)"), AnyValue::number(4.0));
        assert_eq!(eval_in(&wb, "=SUM(A:A,10)"), AnyValue::number(14.0));
        assert_eq!(eval_in(&wb, "=SUM(\"2\",TRUE)"), AnyValue::number(3.0));
        assert_eq!(eval_in(&wb, "=SUM({1,2;3,4})"), AnyValue::number(10.0));
        assert_eq!(eval_in(&wb, "=SUM(1,)"), AnyValue::number(1.0));

        wb.set_value(0, "A2", ErrorCode::Div0).unwrap();
        assert_eq!(eval_in(&wb, "=SUM(A1:A3)"), AnyValue::error(ErrorCode::Div0));
    }

    #[test]
    fn test_count() {
        let mut wb = MemoryWorkbook::new();
        wb.set_value(0, "A1", 1.0).unwrap();
        wb.set_value(0, "A2", "x").unwrap();
        wb.set_value(0, "A3", true).unwrap();
        assert_eq!(eval_in(&wb, "=COUNT(A1:A5)"), AnyValue::number(1.0));
        assert_eq!(eval_in(&wb, "=COUNT(A1:A5,\"7\",\"x\")"), AnyValue::number(2.0));
    }

    #[test]
    fn test_math_scalars() {
        assert_eq!(eval("=ABS(-3)"), AnyValue::number(3.0));
        assert_eq!(eval("=ABS(\"x\")"), AnyValue::error(ErrorCode::Value));
        assert_eq!(eval("=ROUND(2.5)"), AnyValue::number(3.0));
        assert_eq!(eval("=ROUND(-2.5,0)"), AnyValue::number(-3.0));
        assert_eq!(eval("=ROUND(1234,-2)"), AnyValue::number(1200.0));
        assert_eq!(eval("=PI()"), AnyValue::number(std::f64::consts::PI));
    }

    #[test]
    fn test_rand_range() {
        for _ in 0..20 {
            let AnyValue::Scalar(gridcalc_core::ScalarValue::Number(n)) = eval("=RAND()") else {
                panic!("expected a number");
            };
            assert!((0.0..1.0).contains(&n));
        }
    }
}
