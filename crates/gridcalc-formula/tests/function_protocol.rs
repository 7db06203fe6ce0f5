//! Registry, arity and invocation behavior seen through the parser and
//! evaluator

use gridcalc_core::{CellOrigin, ErrorCode, MemoryWorkbook, ScalarValue};
use gridcalc_formula::{
    AnyValue, CallContext, EvaluationContext, EvaluationOptions, FormulaParser, FunctionDef,
    FunctionFlags, FunctionRegistry, ParseOptions, RangeParams,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Adds every scalar argument and 1000 x the row count of every other one
fn describe_args(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let mut total = 0.0;
    for arg in args {
        match arg {
            AnyValue::Scalar(v) => total += v.to_number()?,
            other => total += 1000.0 * ctx.array(other).rows() as f64,
        }
    }
    Ok(AnyValue::number(total))
}

/// Describes each argument: `s:<value>` for scalars, `RxC` otherwise
fn shape(_ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
    let parts: Vec<String> = args
        .iter()
        .map(|arg| match arg {
            AnyValue::Scalar(v) => format!("s:{}", v.as_text()),
            other => format!("{}x{}", other.rows(), other.cols()),
        })
        .collect();
    Ok(AnyValue::text(parts.join(",")))
}

fn custom(name: &'static str, ranges: RangeParams, body: gridcalc_formula::FunctionImpl) -> FunctionDef {
    FunctionDef {
        name,
        min_args: 1,
        max_args: None,
        flags: FunctionFlags::empty(),
        ranges,
        implementation: Some(body),
    }
}

fn registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::with_builtins();
    registry.register(custom("DESCRIBE", RangeParams::except(&[1]), describe_args));
    registry.register(custom("DESCRIBE3", RangeParams::except(&[2]), describe_args));
    registry.register(custom("SHAPE_EXCEPT", RangeParams::except(&[1]), shape));
    registry.register(custom("SHAPE_NONE", RangeParams::None, shape));
    registry
}

fn workbook() -> MemoryWorkbook {
    let mut wb = MemoryWorkbook::new();
    for row in 0..5 {
        wb.set_value_at(0, row, 0, (row + 1) as f64).unwrap();
    }
    wb
}

fn evaluate(registry: &FunctionRegistry, wb: &MemoryWorkbook, text: &str, array: bool) -> AnyValue {
    let parsed = FormulaParser::new(registry, ParseOptions::default())
        .parse(text)
        .unwrap();
    let options = EvaluationOptions {
        array_formula: array,
        ..EvaluationOptions::default()
    };
    let ctx = EvaluationContext::new(wb, CellOrigin::new(0, 1, 3))
        .with_registry(registry)
        .with_options(options);
    parsed.evaluate(&ctx)
}

fn grid(value: AnyValue) -> Vec<Vec<f64>> {
    let AnyValue::Array(array) = value else {
        panic!("expected an array, got {:?}", value);
    };
    array
        .row_slices()
        .map(|row| {
            row.iter()
                .map(|v| match v {
                    ScalarValue::Number(n) => *n,
                    other => panic!("expected a number, got {:?}", other),
                })
                .collect()
        })
        .collect()
}

/// Test that range-classified arguments do not widen the output and are
/// passed whole to every call
#[test]
fn test_broadcast_passes_ranges_whole() {
    let registry = registry();
    let wb = workbook();

    let out = evaluate(&registry, &wb, "=DESCRIBE({1,2,3},A1:A5)", true);
    assert_eq!(grid(out), vec![vec![5001.0, 5002.0, 5003.0]]);

    // A 5x1 scalar-classified argument supplies the rows
    let out = evaluate(&registry, &wb, "=DESCRIBE3({1,2,3},{10;20;30;40;50},A1:A5)", true);
    let expected: Vec<Vec<f64>> = (1..=5)
        .map(|r| (1..=3).map(|c| (5000 + 10 * r + c) as f64).collect())
        .collect();
    assert_eq!(grid(out), expected);
}

/// Test that scalar invocation intersects exactly the scalar-classified
/// positions
#[test]
fn test_intersection_follows_classification() {
    let registry = registry();
    let wb = workbook();

    assert_eq!(
        evaluate(&registry, &wb, "=SHAPE_EXCEPT(A1:A5,A1:A5)", false),
        AnyValue::text("s:2,5x1")
    );
    assert_eq!(
        evaluate(&registry, &wb, "=SHAPE_NONE(A1:A5,A1:A5)", false),
        AnyValue::text("s:2,s:2")
    );
    // A 2D area must contain the calling cell (D2)
    assert_eq!(
        evaluate(&registry, &wb, "=SHAPE_NONE(A1:B5)", false),
        AnyValue::text("s:#VALUE!")
    );
}

/// Test that built-in array functions are called once in array formulas
#[test]
fn test_array_returning_fast_path() {
    let registry = registry();
    let wb = workbook();
    assert_eq!(
        grid(evaluate(&registry, &wb, "=TRANSPOSE(A1:A3)", true)),
        vec![vec![1.0, 2.0, 3.0]]
    );
    assert_eq!(
        grid(evaluate(&registry, &wb, "=SEQUENCE(2,2,0,5)", true)),
        vec![vec![0.0, 5.0], vec![10.0, 15.0]]
    );
}

/// Test that array formulas broadcast built-in scalar functions
#[test]
fn test_array_formula_broadcasts_builtins() {
    let registry = registry();
    let wb = workbook();
    assert_eq!(
        grid(evaluate(&registry, &wb, "=ABS({-1,2;-3,4})", true)),
        vec![vec![1.0, 2.0], vec![3.0, 4.0]]
    );
    assert_eq!(
        grid(evaluate(&registry, &wb, "=ROUND(A1:A3/4,1)", true)),
        vec![vec![0.3], vec![0.5], vec![0.8]]
    );
}

fn arity_registry(min: usize, max: Option<usize>) -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register(FunctionDef {
        min_args: min,
        max_args: max,
        ..custom("ARITY", RangeParams::None, describe_args)
    });
    registry
}

proptest! {
    #[test]
    fn test_arity_is_checked_at_parse_time(
        min in 0usize..4,
        extra in proptest::option::of(0usize..4),
        count in 0usize..9,
    ) {
        let max = extra.map(|e| min + e);
        let registry = arity_registry(min, max);
        let args = vec!["1"; count].join(",");
        let text = format!("=ARITY({})", args);
        let result = FormulaParser::new(&registry, ParseOptions::default()).parse(&text);

        let allowed = count >= min && max.map_or(true, |max| count <= max);
        prop_assert_eq!(result.is_ok(), allowed, "{} with {}..{:?}", text, min, max);
        if let Err(e) = result {
            prop_assert!(e.message().contains("Wrong number of arguments for ARITY"));
        }
    }
}
