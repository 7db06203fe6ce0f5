//! Formula evaluator
//!
//! Walks the AST against a [`DataModel`]. Evaluation never fails as a Rust
//! error: problems become spreadsheet error values.

use crate::ast::*;
use crate::invoke::{implicit_intersect, invoke, invoke_as_array, CallContext};
use crate::parser::{FormulaParser, ParseOptions};
use crate::registry::FunctionRegistry;
use crate::value::{AnyValue, ArrayValue, ReferenceValue, SheetArea};
use gridcalc_core::{CellOrigin, DataModel, ErrorCode, ScalarValue};
use std::cmp::Ordering;

/// Evaluation options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Reduce multi-cell operands of scalar positions to the cell in line
    /// with the calling cell
    pub implicit_intersection: bool,
    /// Evaluate as an array formula (functions broadcast over their arguments)
    pub array_formula: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            implicit_intersection: true,
            array_formula: false,
        }
    }
}

/// Evaluation context
pub struct EvaluationContext<'a> {
    /// Cells, sheets, names and tables
    pub model: &'a dyn DataModel,
    /// Functions available to calls
    pub registry: &'a FunctionRegistry,
    /// The cell being calculated
    pub origin: CellOrigin,
    pub options: EvaluationOptions,
}

impl<'a> EvaluationContext<'a> {
    /// Context using the built-in functions and default options
    pub fn new(model: &'a dyn DataModel, origin: CellOrigin) -> Self {
        Self {
            model,
            registry: FunctionRegistry::builtin(),
            origin,
            options: EvaluationOptions::default(),
        }
    }

    pub fn with_registry(mut self, registry: &'a FunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    fn call_context(&self) -> CallContext<'a> {
        CallContext {
            model: self.model,
            origin: self.origin,
            implicit_intersection: self.options.implicit_intersection,
        }
    }

    fn sheet_of(&self, prefix: Option<&Prefix>) -> Result<usize, ErrorCode> {
        match prefix {
            None => Ok(self.origin.sheet),
            Some(Prefix { file: Some(_), .. }) => Err(ErrorCode::Ref),
            Some(Prefix { sheet: None, .. }) => Ok(self.origin.sheet),
            Some(Prefix {
                sheet: Some(SheetRef::Single(name)),
                ..
            }) => self.model.sheet_index(name).ok_or(ErrorCode::Ref),
            Some(Prefix {
                sheet: Some(SheetRef::Span { .. }),
                ..
            }) => Err(ErrorCode::Value),
        }
    }
}

impl ParsedFormula {
    /// Evaluate the formula
    pub fn evaluate(&self, ctx: &EvaluationContext) -> AnyValue {
        evaluate(self.root(), ctx)
    }
}

impl FormulaExpr {
    /// Whether any call in the expression is to a volatile function
    pub fn is_volatile(&self, registry: &FunctionRegistry) -> bool {
        let mut volatile = false;
        self.walk(&mut |expr| {
            if let FormulaExpr::Function {
                id: FunctionId::Known(name),
                ..
            } = expr
            {
                volatile |= registry.get(name).map_or(false, |def| def.is_volatile());
            }
        });
        volatile
    }
}

/// Evaluate an expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> AnyValue {
    match expr {
        // === Literals ===
        FormulaExpr::Scalar(v) => AnyValue::Scalar(v.clone()),
        FormulaExpr::Array(a) => AnyValue::Array(a.clone()),

        // === References ===
        FormulaExpr::Reference { prefix, reference } => {
            evaluate_reference(prefix.as_ref(), reference, ctx).unwrap_or_else(AnyValue::error)
        }
        FormulaExpr::Reference3D { prefix, reference } => {
            evaluate_reference_3d(prefix, reference, ctx).unwrap_or_else(AnyValue::error)
        }
        FormulaExpr::Structured { prefix, reference } => {
            evaluate_structured(prefix.as_ref(), reference, ctx).unwrap_or_else(AnyValue::error)
        }
        FormulaExpr::Name { prefix, name } => {
            evaluate_name(prefix.as_ref(), name, ctx).unwrap_or_else(AnyValue::error)
        }

        // === Operators ===
        FormulaExpr::Unary { op, operand } => evaluate_unary_op(*op, operand, ctx),
        FormulaExpr::Binary { op, left, right } => evaluate_binary_op(*op, left, right, ctx),

        // === Functions ===
        FormulaExpr::Function {
            prefix, id, args, ..
        } => evaluate_function(prefix.as_ref(), id, args, ctx),

        FormulaExpr::Unsupported(_) => AnyValue::error(ErrorCode::Value),
    }
}

fn evaluate_reference(
    prefix: Option<&Prefix>,
    reference: &Reference,
    ctx: &EvaluationContext,
) -> Result<AnyValue, ErrorCode> {
    let sheet = ctx.sheet_of(prefix)?;
    let range = reference.resolve(&ctx.origin).ok_or(ErrorCode::Ref)?;
    Ok(AnyValue::Reference(ReferenceValue::area(sheet, range)))
}

fn evaluate_reference_3d(
    prefix: &Prefix,
    reference: &Reference,
    ctx: &EvaluationContext,
) -> Result<AnyValue, ErrorCode> {
    let (first, last) = match prefix {
        Prefix { file: Some(_), .. } => return Err(ErrorCode::Ref),
        Prefix {
            sheet: Some(SheetRef::Span { first, last }),
            ..
        } => (first, last),
        other => return evaluate_reference(Some(other), reference, ctx),
    };
    let a = ctx.model.sheet_index(first).ok_or(ErrorCode::Ref)?;
    let b = ctx.model.sheet_index(last).ok_or(ErrorCode::Ref)?;
    let range = reference.resolve(&ctx.origin).ok_or(ErrorCode::Ref)?;
    let areas = (a.min(b)..=a.max(b))
        .map(|sheet| SheetArea::new(sheet, range))
        .collect();
    ReferenceValue::from_areas(areas)
        .map(AnyValue::Reference)
        .ok_or(ErrorCode::Ref)
}

fn evaluate_structured(
    prefix: Option<&Prefix>,
    reference: &crate::structured::StructuredRef,
    ctx: &EvaluationContext,
) -> Result<AnyValue, ErrorCode> {
    if prefix.map_or(false, |p| p.file.is_some()) {
        return Err(ErrorCode::Ref);
    }
    let origin = ctx.origin;
    let table = match &reference.table {
        Some(name) => ctx.model.table(name),
        None => ctx.model.table_at(origin.sheet, origin.row, origin.col),
    }
    .ok_or(ErrorCode::Ref)?;
    let range = reference.resolve(table, origin.row)?;
    Ok(AnyValue::Reference(ReferenceValue::area(table.sheet, range)))
}

fn evaluate_name(
    prefix: Option<&Prefix>,
    name: &str,
    ctx: &EvaluationContext,
) -> Result<AnyValue, ErrorCode> {
    let sheet = ctx.sheet_of(prefix)?;
    let refers_to = ctx.model.defined_name(name, sheet).ok_or(ErrorCode::Name)?;
    log::debug!("resolved name {} to {}", name, refers_to);

    let parser = FormulaParser::new(ctx.registry, ParseOptions::default());
    let parsed = parser.parse(refers_to).map_err(|e| {
        log::debug!("definition of {} does not parse: {}", name, e);
        ErrorCode::Name
    })?;
    // The definition is evaluated on the sheet it is scoped to
    let inner = EvaluationContext {
        model: ctx.model,
        registry: ctx.registry,
        origin: CellOrigin { sheet, ..ctx.origin },
        options: ctx.options,
    };
    Ok(evaluate(parsed.root(), &inner))
}

fn evaluate_function(
    prefix: Option<&Prefix>,
    id: &FunctionId,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> AnyValue {
    if prefix.map_or(false, |p| p.file.is_some()) {
        return AnyValue::error(ErrorCode::Ref);
    }
    let def = match id {
        FunctionId::Known(name) => match ctx.registry.get(name) {
            Some(def) => def,
            None => return AnyValue::error(ErrorCode::Name),
        },
        FunctionId::Unknown => return AnyValue::error(ErrorCode::Name),
        FunctionId::InvalidCellTarget => return AnyValue::error(ErrorCode::Ref),
    };

    let values: Vec<AnyValue> = args.iter().map(|arg| evaluate(arg, ctx)).collect();
    let call_ctx = ctx.call_context();
    if ctx.options.array_formula {
        invoke_as_array(def, &call_ctx, &values)
    } else {
        invoke(def, &call_ctx, &values)
    }
}

/// An operator operand: intersected or materialized
fn operand_value(value: AnyValue, ctx: &EvaluationContext) -> AnyValue {
    match value {
        AnyValue::Reference(_) if ctx.options.implicit_intersection && !ctx.options.array_formula => {
            AnyValue::Scalar(implicit_intersect(&value, &ctx.call_context()))
        }
        other => other.deref(ctx.model),
    }
}

/// Apply `f` element by element, broadcasting arrays to a common shape
fn elementwise(
    left: AnyValue,
    right: AnyValue,
    f: impl Fn(&ScalarValue, &ScalarValue) -> ScalarValue,
) -> AnyValue {
    match (left, right) {
        (AnyValue::Scalar(a), AnyValue::Scalar(b)) => AnyValue::Scalar(f(&a, &b)),
        (left, right) => {
            let (a, b) = (as_array(left), as_array(right));
            let rows = a.rows().max(b.rows());
            let cols = a.cols().max(b.cols());
            if !ArrayValue::fits(rows, cols) {
                return AnyValue::error(ErrorCode::Num);
            }
            let (a, b) = (a.broadcast_to(rows, cols), b.broadcast_to(rows, cols));
            AnyValue::Array(ArrayValue::from_fn(rows, cols, |r, c| {
                match (a.get(r, c), b.get(r, c)) {
                    (Some(x), Some(y)) => f(x, y),
                    _ => ScalarValue::Error(ErrorCode::Na),
                }
            }))
        }
    }
}

fn as_array(value: AnyValue) -> ArrayValue {
    match value {
        AnyValue::Scalar(v) => ArrayValue::single(v),
        AnyValue::Array(a) => a,
        // Operands are dereferenced before reaching here
        AnyValue::Reference(_) => ArrayValue::single(ScalarValue::Error(ErrorCode::Value)),
    }
}

fn map_value(value: AnyValue, f: impl Fn(&ScalarValue) -> ScalarValue) -> AnyValue {
    match value {
        AnyValue::Scalar(v) => AnyValue::Scalar(f(&v)),
        AnyValue::Array(a) => AnyValue::Array(a.map(f)),
        AnyValue::Reference(_) => AnyValue::error(ErrorCode::Value),
    }
}

fn numeric(
    a: &ScalarValue,
    b: &ScalarValue,
    f: impl Fn(f64, f64) -> Result<f64, ErrorCode>,
) -> ScalarValue {
    let result = a
        .to_number()
        .and_then(|x| b.to_number().and_then(|y| f(x, y)));
    match result {
        Ok(n) if n.is_finite() => ScalarValue::Number(n),
        Ok(_) => ScalarValue::Error(ErrorCode::Num),
        Err(e) => ScalarValue::Error(e),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> AnyValue {
    let left_val = evaluate(left, ctx);
    let right_val = evaluate(right, ctx);

    if op.is_reference_operator() {
        return reference_operation(op, left_val, right_val).unwrap_or_else(AnyValue::error);
    }

    let left_val = operand_value(left_val, ctx);
    let right_val = operand_value(right_val, ctx);

    match op {
        // Arithmetic operators
        BinaryOperator::Add => elementwise(left_val, right_val, |a, b| numeric(a, b, |x, y| Ok(x + y))),
        BinaryOperator::Subtract => {
            elementwise(left_val, right_val, |a, b| numeric(a, b, |x, y| Ok(x - y)))
        }
        BinaryOperator::Multiply => {
            elementwise(left_val, right_val, |a, b| numeric(a, b, |x, y| Ok(x * y)))
        }
        BinaryOperator::Divide => elementwise(left_val, right_val, |a, b| {
            numeric(a, b, |x, y| if y == 0.0 { Err(ErrorCode::Div0) } else { Ok(x / y) })
        }),
        BinaryOperator::Power => elementwise(left_val, right_val, |a, b| {
            numeric(a, b, |x, y| {
                if x == 0.0 && y == 0.0 {
                    Err(ErrorCode::Num)
                } else if x == 0.0 && y < 0.0 {
                    Err(ErrorCode::Div0)
                } else {
                    Ok(x.powf(y))
                }
            })
        }),

        // Concatenation
        BinaryOperator::Concat => elementwise(left_val, right_val, |a, b| {
            match (a.error(), b.error()) {
                (Some(e), _) | (None, Some(e)) => ScalarValue::Error(e),
                _ => ScalarValue::Text(a.as_text() + &b.as_text()),
            }
        }),

        // Comparison operators
        _ => elementwise(left_val, right_val, |a, b| match (a.error(), b.error()) {
            (Some(e), _) | (None, Some(e)) => ScalarValue::Error(e),
            _ => {
                let ord = compare_values(a, b);
                ScalarValue::Logical(match op {
                    BinaryOperator::Equal => ord == Ordering::Equal,
                    BinaryOperator::NotEqual => ord != Ordering::Equal,
                    BinaryOperator::LessThan => ord == Ordering::Less,
                    BinaryOperator::LessEqual => ord != Ordering::Greater,
                    BinaryOperator::GreaterThan => ord == Ordering::Greater,
                    BinaryOperator::GreaterEqual => ord != Ordering::Less,
                    other => unreachable!("{:?} is not a comparison", other),
                })
            }
        }),
    }
}

/// `:`, `,` and ` ` on references
fn reference_operation(
    op: BinaryOperator,
    left: AnyValue,
    right: AnyValue,
) -> Result<AnyValue, ErrorCode> {
    let (left, right) = match (left, right) {
        (AnyValue::Reference(l), AnyValue::Reference(r)) => (l, r),
        (l, r) => return Err(l.as_error().or(r.as_error()).unwrap_or(ErrorCode::Value)),
    };

    let areas = match op {
        BinaryOperator::Range => {
            let (Some(a), Some(b)) = (left.single_area(), right.single_area()) else {
                return Err(ErrorCode::Value);
            };
            if a.sheet != b.sheet {
                return Err(ErrorCode::Value);
            }
            vec![SheetArea::new(a.sheet, a.range.bounding(&b.range))]
        }
        BinaryOperator::Union => left
            .areas()
            .iter()
            .chain(right.areas())
            .copied()
            .collect(),
        BinaryOperator::Intersect => {
            let mut areas = Vec::new();
            for a in left.areas() {
                for b in right.areas().iter().filter(|b| b.sheet == a.sheet) {
                    if let Some(range) = a.range.intersect(&b.range) {
                        areas.push(SheetArea::new(a.sheet, range));
                    }
                }
            }
            areas
        }
        other => unreachable!("{:?} is not a reference operator", other),
    };
    ReferenceValue::from_areas(areas)
        .map(AnyValue::Reference)
        .ok_or(ErrorCode::Null)
}

/// Evaluate a unary operation
fn evaluate_unary_op(op: UnaryOperator, operand: &FormulaExpr, ctx: &EvaluationContext) -> AnyValue {
    let val = evaluate(operand, ctx);

    match op {
        UnaryOperator::ImplicitIntersection => {
            AnyValue::Scalar(implicit_intersect(&val, &ctx.call_context()))
        }
        UnaryOperator::SpillRange => spill_range(val, ctx).unwrap_or_else(AnyValue::error),
        UnaryOperator::Plus => operand_value(val, ctx),
        UnaryOperator::Negate => map_value(operand_value(val, ctx), |v| match v.to_number() {
            Ok(n) => ScalarValue::Number(-n),
            Err(e) => ScalarValue::Error(e),
        }),
        UnaryOperator::Percent => map_value(operand_value(val, ctx), |v| match v.to_number() {
            Ok(n) => ScalarValue::Number(n / 100.0),
            Err(e) => ScalarValue::Error(e),
        }),
    }
}

fn spill_range(value: AnyValue, ctx: &EvaluationContext) -> Result<AnyValue, ErrorCode> {
    let reference = match value {
        AnyValue::Reference(reference) => reference,
        other => return Err(other.as_error().unwrap_or(ErrorCode::Ref)),
    };
    let area = reference.single_area().ok_or(ErrorCode::Ref)?;
    if !area.range.is_single_cell() {
        return Err(ErrorCode::Ref);
    }
    let extent = ctx
        .model
        .spill_extent(area.sheet, area.range.start.row, area.range.start.col)
        .ok_or(ErrorCode::Ref)?;
    Ok(AnyValue::Reference(ReferenceValue::area(area.sheet, extent)))
}

/// Compare two values for ordering (spreadsheet-style comparison)
///
/// Blanks compare as 0, empty text or FALSE depending on the other side.
/// Across types: number < text < logical. Text compares case-insensitively.
pub(crate) fn compare_values(left: &ScalarValue, right: &ScalarValue) -> Ordering {
    use ScalarValue::*;

    let blank_as = |other: &ScalarValue| match other {
        Text(_) => Text(String::new()),
        Logical(_) => Logical(false),
        _ => Number(0.0),
    };
    let left_owned;
    let right_owned;
    let (left, right) = match (left, right) {
        (Blank, Blank) => return Ordering::Equal,
        (Blank, r) => {
            left_owned = blank_as(r);
            (&left_owned, r)
        }
        (l, Blank) => {
            right_owned = blank_as(l);
            (l, &right_owned)
        }
        pair => pair,
    };

    match (left, right) {
        // Numbers compare numerically
        (Number(l), Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),

        // Strings compare case-insensitively
        (Text(l), Text(r)) => l.to_lowercase().cmp(&r.to_lowercase()),

        // Booleans: FALSE < TRUE
        (Logical(l), Logical(r)) => l.cmp(r),

        // Mixed types: number < string < boolean
        (Number(_), Text(_) | Logical(_)) => Ordering::Less,
        (Text(_), Number(_)) => Ordering::Greater,
        (Text(_), Logical(_)) => Ordering::Less,
        (Logical(_), Number(_) | Text(_)) => Ordering::Greater,

        // Errors order by code
        (Error(l), Error(r)) => l.code().cmp(&r.code()),
        (Error(_), _) => Ordering::Greater,
        (_, Error(_)) => Ordering::Less,

        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, parse_formula};
    use gridcalc_core::{CellRange, MemoryWorkbook, NameScope, TableInfo};
    use pretty_assertions::assert_eq;

    fn workbook() -> MemoryWorkbook {
        let mut wb = MemoryWorkbook::new();
        wb.set_value(0, "A1", 1.0).unwrap();
        wb.set_value(0, "A2", 2.0).unwrap();
        wb.set_value(0, "A3", 3.0).unwrap();
        wb.set_value(0, "B1", "text").unwrap();
        wb.set_value(0, "B2", 0.0).unwrap();
        wb
    }

    fn eval_at(wb: &MemoryWorkbook, formula: &str, origin: CellOrigin) -> AnyValue {
        let parsed = parse_formula(formula).unwrap();
        parsed.evaluate(&EvaluationContext::new(wb, origin))
    }

    fn eval(formula: &str) -> AnyValue {
        eval_at(&workbook(), formula, CellOrigin::new(0, 9, 9))
    }

    #[test]
    fn test_elementwise_caps_broadcast_shape() {
        let column = AnyValue::Array(ArrayValue::filled(4096, 1, ScalarValue::Number(1.0)));
        let row = |cols| AnyValue::Array(ArrayValue::filled(1, cols, ScalarValue::Number(2.0)));
        let add = |a: &ScalarValue, b: &ScalarValue| numeric(a, b, |x, y| Ok(x + y));

        let AnyValue::Array(out) = elementwise(column.clone(), row(8), add) else {
            panic!("expected an array");
        };
        assert_eq!((out.rows(), out.cols()), (4096, 8));
        assert_eq!(out.get(4095, 7), Some(&ScalarValue::Number(3.0)));

        assert_eq!(elementwise(column, row(4097), add), AnyValue::error(ErrorCode::Num));
    }

    #[test]
    fn test_evaluate_literals() {
        assert_eq!(eval("=42"), AnyValue::number(42.0));
        assert_eq!(eval("=\"Hi\""), AnyValue::text("Hi"));
        assert_eq!(eval("=TRUE"), AnyValue::logical(true));
        assert_eq!(eval("=#N/A"), AnyValue::error(ErrorCode::Na));
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("=1+2*3"), AnyValue::number(7.0));
        assert_eq!(eval("=(1+2)*3"), AnyValue::number(9.0));
        assert_eq!(eval("=2^3^2"), AnyValue::number(64.0));
        assert_eq!(eval("=-2^2"), AnyValue::number(4.0));
        assert_eq!(eval("=50%"), AnyValue::number(0.5));
        assert_eq!(eval("=\"3\"+1"), AnyValue::number(4.0));
        assert_eq!(eval("=1/0"), AnyValue::error(ErrorCode::Div0));
        assert_eq!(eval("=\"x\"+1"), AnyValue::error(ErrorCode::Value));
        assert_eq!(eval("=#REF!+1"), AnyValue::error(ErrorCode::Ref));
    }

    #[test]
    fn test_evaluate_comparison_and_concat() {
        assert_eq!(eval("=1<2"), AnyValue::logical(true));
        assert_eq!(eval("=\"abc\"=\"ABC\""), AnyValue::logical(true));
        assert_eq!(eval("=1<\"a\""), AnyValue::logical(true));
        assert_eq!(eval("=\"a\"&1&TRUE"), AnyValue::text("a1TRUE"));
    }

    #[test]
    fn test_evaluate_references() {
        let wb = workbook();
        // Row 2 of column A lines up with the origin on row 2
        assert_eq!(
            eval_at(&wb, "=A1:A3*10", CellOrigin::new(0, 1, 3)),
            AnyValue::number(20.0)
        );
        assert_eq!(
            eval_at(&wb, "=A1:A3*10", CellOrigin::new(0, 7, 3)),
            AnyValue::error(ErrorCode::Value)
        );
        assert_eq!(eval("=A1+A2"), AnyValue::number(3.0));
        assert_eq!(eval("=Z99"), reference_to("Z99"));
        assert_eq!(eval("=Missing!A1"), AnyValue::error(ErrorCode::Ref));
        assert_eq!(eval("=[1]Sheet1!A1"), AnyValue::error(ErrorCode::Ref));
    }

    fn reference_to(range: &str) -> AnyValue {
        AnyValue::Reference(ReferenceValue::area(0, CellRange::parse(range).unwrap()))
    }

    #[test]
    fn test_evaluate_relative_r1c1_off_grid() {
        let wb = workbook();
        let parsed = parse("=R[-1]C", ReferenceStyle::R1C1).unwrap();
        let ctx = EvaluationContext::new(&wb, CellOrigin::new(0, 0, 0));
        assert_eq!(parsed.evaluate(&ctx), AnyValue::error(ErrorCode::Ref));
        let ctx = EvaluationContext::new(&wb, CellOrigin::new(0, 1, 0));
        assert_eq!(parsed.evaluate(&ctx), reference_to("A1"));
    }

    #[test]
    fn test_evaluate_array_arithmetic() {
        let AnyValue::Array(out) = eval("={1,2,3}*{10;20}") else {
            panic!("expected an array");
        };
        assert_eq!((out.rows(), out.cols()), (2, 3));
        assert_eq!(out.get(1, 2), Some(&ScalarValue::Number(60.0)));

        let wb = workbook();
        let ctx = EvaluationContext::new(&wb, CellOrigin::new(0, 9, 9)).with_options(
            EvaluationOptions {
                implicit_intersection: true,
                array_formula: true,
            },
        );
        let AnyValue::Array(out) = parse_formula("=A1:A3+1").unwrap().evaluate(&ctx) else {
            panic!("expected an array");
        };
        assert_eq!(
            out.values().cloned().collect::<Vec<_>>(),
            vec![
                ScalarValue::Number(2.0),
                ScalarValue::Number(3.0),
                ScalarValue::Number(4.0)
            ]
        );
    }

    #[test]
    fn test_evaluate_reference_operators() {
        assert_eq!(eval("=A1:A2:A3"), reference_to("A1:A3"));
        assert_eq!(eval("=A1:B2 B1:C3"), reference_to("B1:B2"));
        assert_eq!(eval("=A1 B2"), AnyValue::error(ErrorCode::Null));
        assert_eq!(eval("=SUM((A1,A3))"), AnyValue::number(4.0));
        assert_eq!(eval("=A1:INDEX(A1:A3,3)"), reference_to("A1:A3"));
        assert_eq!(eval("=@A1:A3"), AnyValue::error(ErrorCode::Value));
    }

    #[test]
    fn test_evaluate_3d_reference() {
        let mut wb = workbook();
        let s2 = wb.add_sheet("Sheet2").unwrap();
        let s3 = wb.add_sheet("Sheet3").unwrap();
        wb.set_value(s2, "A1", 10.0).unwrap();
        wb.set_value(s3, "A1", 100.0).unwrap();
        assert_eq!(
            eval_at(&wb, "=SUM(Sheet1:Sheet3!A1)", CellOrigin::default()),
            AnyValue::number(111.0)
        );
        assert_eq!(
            eval_at(&wb, "=SUM(Sheet3:Sheet2!A1)", CellOrigin::default()),
            AnyValue::number(110.0)
        );
    }

    #[test]
    fn test_evaluate_names() {
        let mut wb = workbook();
        wb.define_name("Rate", NameScope::Workbook, "=0.5").unwrap();
        wb.define_name("Values", NameScope::Workbook, "Sheet1!$A$1:$A$3")
            .unwrap();
        assert_eq!(
            eval_at(&wb, "=Rate*4", CellOrigin::default()),
            AnyValue::number(2.0)
        );
        assert_eq!(
            eval_at(&wb, "=SUM(Values)", CellOrigin::default()),
            AnyValue::number(6.0)
        );
        assert_eq!(
            eval_at(&wb, "=Nope", CellOrigin::default()),
            AnyValue::error(ErrorCode::Name)
        );
    }

    #[test]
    fn test_evaluate_structured() {
        let mut wb = MemoryWorkbook::new();
        let rows: [(&str, f64); 3] = [("a", 1.0), ("b", 2.0), ("c", 3.0)];
        wb.set_value(0, "A1", "Item").unwrap();
        wb.set_value(0, "B1", "Qty").unwrap();
        for (i, (item, qty)) in rows.iter().enumerate() {
            wb.set_value_at(0, i as u32 + 1, 0, *item).unwrap();
            wb.set_value_at(0, i as u32 + 1, 1, *qty).unwrap();
        }
        wb.add_table(TableInfo {
            name: "Orders".into(),
            sheet: 0,
            range: CellRange::parse("A1:B4").unwrap(),
            has_header: true,
            has_totals: false,
            columns: vec!["Item".into(), "Qty".into()],
        })
        .unwrap();

        assert_eq!(
            eval_at(&wb, "=SUM(Orders[Qty])", CellOrigin::default()),
            AnyValue::number(6.0)
        );
        assert_eq!(
            eval_at(&wb, "=[@Qty]*2", CellOrigin::new(0, 2, 2)),
            AnyValue::error(ErrorCode::Ref)
        );
        assert_eq!(
            eval_at(&wb, "=Orders[@Qty]*2", CellOrigin::new(0, 2, 2)),
            AnyValue::number(4.0)
        );
        assert_eq!(
            eval_at(&wb, "=Orders[Price]", CellOrigin::default()),
            AnyValue::error(ErrorCode::Ref)
        );
    }

    #[test]
    fn test_evaluate_spill() {
        let mut wb = workbook();
        wb.set_spill(0, "A1", "A1:A3").unwrap();
        assert_eq!(eval_at(&wb, "=SUM(A1#)", CellOrigin::default()), AnyValue::number(6.0));
        assert_eq!(
            eval_at(&wb, "=A2#", CellOrigin::default()),
            AnyValue::error(ErrorCode::Ref)
        );
    }

    #[test]
    fn test_evaluate_function_identities() {
        assert_eq!(eval("=NOSUCH(1)"), AnyValue::error(ErrorCode::Name));
        assert_eq!(eval("=LOG10(100)"), AnyValue::error(ErrorCode::Ref));
        assert_eq!(eval("=Sheet1!Sheet2!A1"), AnyValue::error(ErrorCode::Value));
    }

    #[test]
    fn test_is_volatile() {
        let registry = FunctionRegistry::builtin();
        assert!(parse_formula("=1+RAND()").unwrap().root().is_volatile(registry));
        assert!(parse_formula("=IF(A1,TODAY(),0)")
            .unwrap()
            .root()
            .is_volatile(registry));
        assert!(!parse_formula("=SUM(A1:A3)").unwrap().root().is_volatile(registry));
    }

    #[test]
    fn test_compare_values() {
        use ScalarValue::*;
        assert_eq!(compare_values(&Blank, &Number(0.0)), Ordering::Equal);
        assert_eq!(compare_values(&Blank, &Text(String::new())), Ordering::Equal);
        assert_eq!(compare_values(&Logical(false), &Blank), Ordering::Equal);
        assert_eq!(compare_values(&Number(5.0), &Text("1".into())), Ordering::Less);
        assert_eq!(compare_values(&Text("z".into()), &Logical(false)), Ordering::Less);
    }
}
