//! Calling function bodies
//!
//! Two entry points exist: [`invoke`] for ordinary (scalar) evaluation and
//! [`invoke_as_array`] for array formulas, which broadcasts the body over
//! every cell of the argument shape.

use crate::registry::FunctionDef;
use crate::value::{AnyValue, ArrayValue};
use gridcalc_core::{CellOrigin, DataModel, ErrorCode, ScalarValue};

/// Function implementation signature
///
/// `Err(code)` is turned into an error value by the caller.
pub type FunctionImpl = fn(&CallContext, &[AnyValue]) -> Result<AnyValue, ErrorCode>;

/// What a function body can see of the surrounding evaluation
#[derive(Clone, Copy)]
pub struct CallContext<'a> {
    pub model: &'a dyn DataModel,
    /// The cell the formula is evaluated in
    pub origin: CellOrigin,
    /// Apply implicit intersection to scalar-classified arguments
    pub implicit_intersection: bool,
}

impl<'a> CallContext<'a> {
    pub fn new(model: &'a dyn DataModel, origin: CellOrigin) -> Self {
        Self {
            model,
            origin,
            implicit_intersection: true,
        }
    }

    /// Reduce a value to one scalar (no intersection)
    pub fn single(&self, value: &AnyValue) -> ScalarValue {
        value.to_single(self.model)
    }

    /// Expand a value to an array
    pub fn array(&self, value: &AnyValue) -> ArrayValue {
        value.to_array(self.model)
    }
}

/// Reduce a value to the single cell that lines up with the calling cell
///
/// A one-column reference yields the cell on the origin's row, a one-row
/// reference the cell in the origin's column, and a 2D area the cell at the
/// origin's row and column. Misses and multi-area references are
/// `#VALUE!`. Arrays yield their top-left element.
pub fn implicit_intersect(value: &AnyValue, ctx: &CallContext) -> ScalarValue {
    let reference = match value {
        AnyValue::Scalar(v) => return v.clone(),
        AnyValue::Array(a) => return a.top_left().clone(),
        AnyValue::Reference(r) => r,
    };
    let Some(area) = reference.single_area() else {
        return ScalarValue::Error(ErrorCode::Value);
    };
    let range = area.range;
    let origin = ctx.origin;

    if range.is_single_cell() {
        return ctx
            .model
            .cell_value(area.sheet, range.start.row, range.start.col);
    }

    let target = if range.col_count() == 1 {
        (range.start.row..=range.end.row)
            .contains(&origin.row)
            .then_some((origin.row, range.start.col))
    } else if range.row_count() == 1 {
        (range.start.col..=range.end.col)
            .contains(&origin.col)
            .then_some((range.start.row, origin.col))
    } else {
        range
            .contains(origin.row, origin.col)
            .then_some((origin.row, origin.col))
    };

    match target {
        Some((row, col)) => ctx.model.cell_value(area.sheet, row, col),
        None => ScalarValue::Error(ErrorCode::Value),
    }
}

fn call(body: FunctionImpl, ctx: &CallContext, args: &[AnyValue]) -> AnyValue {
    body(ctx, args).unwrap_or_else(AnyValue::error)
}

/// Invoke for an ordinary (non-array) formula
///
/// With implicit intersection enabled, every argument whose position does
/// not accept ranges is intersected against the calling cell first.
pub fn invoke(def: &FunctionDef, ctx: &CallContext, args: &[AnyValue]) -> AnyValue {
    let Some(body) = def.implementation else {
        log::debug!("function {} has no implementation", def.name);
        return AnyValue::error(ErrorCode::Name);
    };

    let needs_intersection = ctx.implicit_intersection
        && args
            .iter()
            .enumerate()
            .any(|(i, arg)| !def.ranges.accepts_range(i) && !matches!(arg, AnyValue::Scalar(_)));
    if !needs_intersection {
        return call(body, ctx, args);
    }

    let args: Vec<AnyValue> = args
        .iter()
        .enumerate()
        .map(|(i, arg)| {
            if def.ranges.accepts_range(i) {
                arg.clone()
            } else {
                AnyValue::Scalar(implicit_intersect(arg, ctx))
            }
        })
        .collect();
    call(body, ctx, &args)
}

/// One argument prepared for element-wise calls
enum Prepared {
    /// Passed to every call unchanged
    Whole(AnyValue),
    /// The same scalar for every output cell
    Uniform(ScalarValue),
    /// One element per output cell
    Grid(ArrayValue),
}

/// Invoke for an array formula
///
/// Functions that return arrays and take ranges everywhere are called once.
/// Otherwise the output shape is the largest shape among scalar-classified
/// arguments and the body is called once per output cell, keeping only the
/// top-left of any array it returns.
pub fn invoke_as_array(def: &FunctionDef, ctx: &CallContext, args: &[AnyValue]) -> AnyValue {
    let Some(body) = def.implementation else {
        log::debug!("function {} has no implementation", def.name);
        return AnyValue::error(ErrorCode::Name);
    };

    if def.is_array_returning() && def.ranges == crate::registry::RangeParams::All {
        return call(body, ctx, args);
    }

    let mut rows = 1;
    let mut cols = 1;
    for (i, arg) in args.iter().enumerate() {
        if !def.ranges.accepts_range(i) {
            rows = rows.max(arg.rows());
            cols = cols.max(arg.cols());
        }
    }

    if !ArrayValue::fits(rows, cols) {
        log::debug!("{} over {}x{} cells is too large", def.name, rows, cols);
        return AnyValue::error(ErrorCode::Num);
    }

    let prepared: Vec<Prepared> = args
        .iter()
        .enumerate()
        .map(|(i, arg)| match (def.ranges.accepts_range(i), arg.is_multi()) {
            (false, false) => Prepared::Uniform(ctx.single(arg)),
            (false, true) => Prepared::Grid(ctx.array(arg).broadcast_to(rows, cols)),
            (true, false) => Prepared::Whole(AnyValue::Array(ArrayValue::single(ctx.single(arg)))),
            (true, true) => Prepared::Whole(arg.clone()),
        })
        .collect();

    let mut call_args = Vec::with_capacity(prepared.len());
    let result = ArrayValue::from_fn(rows, cols, |r, c| {
        call_args.clear();
        call_args.extend(prepared.iter().map(|p| match p {
            Prepared::Whole(v) => v.clone(),
            Prepared::Uniform(v) => AnyValue::Scalar(v.clone()),
            Prepared::Grid(a) => AnyValue::Scalar(
                a.get(r, c)
                    .cloned()
                    .unwrap_or(ScalarValue::Error(ErrorCode::Na)),
            ),
        }));
        ctx.single(&call(body, ctx, &call_args))
    });
    AnyValue::Array(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FunctionFlags, RangeParams};
    use crate::value::ReferenceValue;
    use gridcalc_core::{CellRange, MemoryWorkbook};
    use pretty_assertions::assert_eq;

    fn workbook() -> MemoryWorkbook {
        let mut wb = MemoryWorkbook::new();
        for (i, addr) in ["A1", "A2", "A3", "B1", "C1"].iter().enumerate() {
            wb.set_value(0, addr, (i + 1) as f64).unwrap();
        }
        wb
    }

    fn reference(range: &str) -> AnyValue {
        AnyValue::Reference(ReferenceValue::area(0, CellRange::parse(range).unwrap()))
    }

    /// Returns its arguments' shapes as "RxC" text, joined by commas
    fn shapes(_ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
        let text: Vec<String> = args
            .iter()
            .map(|a| match a {
                AnyValue::Scalar(v) => format!("s:{}", v),
                other => format!("{}x{}", other.rows(), other.cols()),
            })
            .collect();
        Ok(AnyValue::text(text.join(",")))
    }

    fn def(ranges: RangeParams) -> FunctionDef {
        FunctionDef {
            name: "SHAPES",
            min_args: 0,
            max_args: None,
            flags: FunctionFlags::empty(),
            ranges,
            implementation: Some(shapes),
        }
    }

    #[test]
    fn test_implicit_intersection_shapes() {
        let wb = workbook();
        let ctx = CallContext::new(&wb, CellOrigin::new(0, 1, 4));
        // Column A on the origin's row
        assert_eq!(
            implicit_intersect(&reference("A1:A3"), &ctx),
            ScalarValue::Number(2.0)
        );
        // Row 1 does not contain column E
        assert_eq!(
            implicit_intersect(&reference("A1:C1"), &ctx),
            ScalarValue::Error(ErrorCode::Value)
        );
        assert_eq!(
            implicit_intersect(&reference("B1"), &ctx),
            ScalarValue::Number(4.0)
        );

        let ctx = CallContext::new(&wb, CellOrigin::new(0, 0, 1));
        assert_eq!(
            implicit_intersect(&reference("A1:C1"), &ctx),
            ScalarValue::Number(4.0)
        );
        assert_eq!(
            implicit_intersect(&reference("A1:C3"), &ctx),
            ScalarValue::Number(4.0)
        );
    }

    #[test]
    fn test_invoke_intersects_scalar_params_only() {
        let wb = workbook();
        let ctx = CallContext::new(&wb, CellOrigin::new(0, 0, 3));
        let args = [reference("A1:A3"), reference("A1:A3")];

        assert_eq!(
            invoke(&def(RangeParams::except(&[1])), &ctx, &args),
            AnyValue::text("s:1,3x1")
        );
        assert_eq!(
            invoke(&def(RangeParams::None), &ctx, &args),
            AnyValue::text("s:1,s:1")
        );

        let mut no_intersection = ctx;
        no_intersection.implicit_intersection = false;
        assert_eq!(
            invoke(&def(RangeParams::None), &no_intersection, &args),
            AnyValue::text("3x1,3x1")
        );
    }

    #[test]
    fn test_invoke_without_body_is_name_error() {
        let wb = workbook();
        let ctx = CallContext::new(&wb, CellOrigin::default());
        let mut d = def(RangeParams::None);
        d.implementation = None;
        assert_eq!(invoke(&d, &ctx, &[]), AnyValue::error(ErrorCode::Name));
        assert_eq!(
            invoke_as_array(&d, &ctx, &[]),
            AnyValue::error(ErrorCode::Name)
        );
    }

    #[test]
    fn test_invoke_as_array_rejects_oversized_shapes() {
        let wb = workbook();
        let ctx = CallContext::new(&wb, CellOrigin::default());
        let whole_row = reference("A1:XFD1");
        let whole_column = reference("A1:A1048576");
        assert_eq!(
            invoke_as_array(&def(RangeParams::None), &ctx, &[whole_row.clone(), whole_column]),
            AnyValue::error(ErrorCode::Num)
        );
        // Range parameters do not set the output shape
        assert_eq!(
            invoke_as_array(&def(RangeParams::All), &ctx, &[reference("A1:XFD1048576")]),
            AnyValue::Array(ArrayValue::single(ScalarValue::text("1048576x16384")))
        );
        let AnyValue::Array(out) = invoke_as_array(&def(RangeParams::None), &ctx, &[whole_row])
        else {
            panic!("expected an array");
        };
        assert_eq!((out.rows(), out.cols()), (1, 16_384));
    }

    #[test]
    fn test_invoke_as_array_pads_with_na() {
        fn add(ctx: &CallContext, args: &[AnyValue]) -> Result<AnyValue, ErrorCode> {
            let a = ctx.single(&args[0]).to_number()?;
            let b = ctx.single(&args[1]).to_number()?;
            Ok(AnyValue::number(a + b))
        }
        let wb = workbook();
        let ctx = CallContext::new(&wb, CellOrigin::default());
        let d = FunctionDef {
            implementation: Some(add),
            ..def(RangeParams::None)
        };
        let left = AnyValue::Array(ArrayValue::new(
            1,
            2,
            vec![ScalarValue::Number(1.0), ScalarValue::Number(2.0)],
        ));
        let right = AnyValue::Array(ArrayValue::new(
            3,
            1,
            vec![
                ScalarValue::Number(10.0),
                ScalarValue::Number(20.0),
                ScalarValue::Number(30.0),
            ],
        ));
        let AnyValue::Array(out) = invoke_as_array(&d, &ctx, &[left, right]) else {
            panic!("expected an array");
        };
        assert_eq!((out.rows(), out.cols()), (3, 2));
        assert_eq!(out.get(2, 1), Some(&ScalarValue::Number(32.0)));

        let three = AnyValue::Array(ArrayValue::new(
            1,
            3,
            vec![ScalarValue::Number(1.0); 3],
        ));
        let two = AnyValue::Array(ArrayValue::new(1, 2, vec![ScalarValue::Number(1.0); 2]));
        let AnyValue::Array(out) = invoke_as_array(&d, &ctx, &[three, two]) else {
            panic!("expected an array");
        };
        assert_eq!(out.get(0, 2), Some(&ScalarValue::Error(ErrorCode::Na)));
    }

    #[test]
    fn test_range_param_single_value_becomes_array() {
        let wb = workbook();
        let ctx = CallContext::new(&wb, CellOrigin::default());
        let out = invoke_as_array(
            &def(RangeParams::All),
            &ctx,
            &[AnyValue::error(ErrorCode::Div0)],
        );
        assert_eq!(
            out,
            AnyValue::Array(ArrayValue::single(ScalarValue::text("1048576x16384")))
        );
    }
}
