//! Built-in functions

pub mod criteria;
pub mod date;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;

use crate::invoke::CallContext;
use crate::registry::{FunctionDef, FunctionFlags, FunctionRegistry, RangeParams};
use crate::value::AnyValue;
use gridcalc_core::{ErrorCode, ScalarValue};

/// Argument `index` reduced to a scalar; omitted trailing arguments are blank
pub(crate) fn scalar_arg(ctx: &CallContext, args: &[AnyValue], index: usize) -> ScalarValue {
    args.get(index)
        .map(|arg| ctx.single(arg))
        .unwrap_or(ScalarValue::Blank)
}

/// Argument `index` as a number
pub(crate) fn number_arg(
    ctx: &CallContext,
    args: &[AnyValue],
    index: usize,
) -> Result<f64, ErrorCode> {
    scalar_arg(ctx, args, index).to_number()
}

/// Optional numeric argument; blank or omitted gives `default`
pub(crate) fn optional_number(
    ctx: &CallContext,
    args: &[AnyValue],
    index: usize,
    default: f64,
) -> Result<f64, ErrorCode> {
    match scalar_arg(ctx, args, index) {
        ScalarValue::Blank => Ok(default),
        other => other.to_number(),
    }
}

impl FunctionRegistry {
    pub(crate) fn register_math_functions(&mut self) {
        // SUM
        self.register(FunctionDef {
            name: "SUM",
            min_args: 1,
            max_args: None,
            flags: FunctionFlags::empty(),
            ranges: RangeParams::All,
            implementation: Some(math::fn_sum),
        });

        // COUNT
        self.register(FunctionDef {
            name: "COUNT",
            min_args: 1,
            max_args: None,
            flags: FunctionFlags::empty(),
            ranges: RangeParams::All,
            implementation: Some(math::fn_count),
        });

        // ABS
        self.register(FunctionDef {
            name: "ABS",
            min_args: 1,
            max_args: Some(1),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::None,
            implementation: Some(math::fn_abs),
        });

        // ROUND
        self.register(FunctionDef {
            name: "ROUND",
            min_args: 1,
            max_args: Some(2),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::None,
            implementation: Some(math::fn_round),
        });

        // PI
        self.register(FunctionDef {
            name: "PI",
            min_args: 0,
            max_args: Some(0),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::None,
            implementation: Some(math::fn_pi),
        });

        // RAND
        self.register(FunctionDef {
            name: "RAND",
            min_args: 0,
            max_args: Some(0),
            flags: FunctionFlags::VOLATILE,
            ranges: RangeParams::None,
            implementation: Some(math::fn_rand),
        });
    }

    pub(crate) fn register_logical_functions(&mut self) {
        // IF
        self.register(FunctionDef {
            name: "IF",
            min_args: 2,
            max_args: Some(3),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::except(&[1, 2]),
            implementation: Some(logical::fn_if),
        });

        // IFERROR
        self.register(FunctionDef {
            name: "IFERROR",
            min_args: 2,
            max_args: Some(2),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::None,
            implementation: Some(logical::fn_iferror),
        });

        // AND
        self.register(FunctionDef {
            name: "AND",
            min_args: 1,
            max_args: None,
            flags: FunctionFlags::empty(),
            ranges: RangeParams::All,
            implementation: Some(logical::fn_and),
        });

        // NOT
        self.register(FunctionDef {
            name: "NOT",
            min_args: 1,
            max_args: Some(1),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::None,
            implementation: Some(logical::fn_not),
        });
    }

    pub(crate) fn register_text_functions(&mut self) {
        // LEN
        self.register(FunctionDef {
            name: "LEN",
            min_args: 1,
            max_args: Some(1),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::None,
            implementation: Some(text::fn_len),
        });

        // UPPER
        self.register(FunctionDef {
            name: "UPPER",
            min_args: 1,
            max_args: Some(1),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::None,
            implementation: Some(text::fn_upper),
        });

        // CONCATENATE
        self.register(FunctionDef {
            name: "CONCATENATE",
            min_args: 1,
            max_args: None,
            flags: FunctionFlags::empty(),
            ranges: RangeParams::None,
            implementation: Some(text::fn_concatenate),
        });

        // CONCAT
        self.register(FunctionDef {
            name: "CONCAT",
            min_args: 1,
            max_args: None,
            flags: FunctionFlags::FUTURE,
            ranges: RangeParams::All,
            implementation: Some(text::fn_concat),
        });

        // TEXTJOIN
        self.register(FunctionDef {
            name: "TEXTJOIN",
            min_args: 3,
            max_args: None,
            flags: FunctionFlags::FUTURE,
            ranges: RangeParams::only(&[0, 1]),
            implementation: Some(text::fn_textjoin),
        });

        // SEARCH
        self.register(FunctionDef {
            name: "SEARCH",
            min_args: 2,
            max_args: Some(3),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::None,
            implementation: Some(text::fn_search),
        });
    }

    pub(crate) fn register_statistical_functions(&mut self) {
        // COUNTIF
        self.register(FunctionDef {
            name: "COUNTIF",
            min_args: 2,
            max_args: Some(2),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::except(&[0]),
            implementation: Some(statistical::fn_countif),
        });

        // SUMIF
        self.register(FunctionDef {
            name: "SUMIF",
            min_args: 2,
            max_args: Some(3),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::except(&[0, 2]),
            implementation: Some(statistical::fn_sumif),
        });
    }

    pub(crate) fn register_lookup_functions(&mut self) {
        // ROWS
        self.register(FunctionDef {
            name: "ROWS",
            min_args: 1,
            max_args: Some(1),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::All,
            implementation: Some(lookup::fn_rows),
        });

        // COLUMNS
        self.register(FunctionDef {
            name: "COLUMNS",
            min_args: 1,
            max_args: Some(1),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::All,
            implementation: Some(lookup::fn_columns),
        });

        // INDEX
        self.register(FunctionDef {
            name: "INDEX",
            min_args: 2,
            max_args: Some(3),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::except(&[0]),
            implementation: Some(lookup::fn_index),
        });

        // MATCH
        self.register(FunctionDef {
            name: "MATCH",
            min_args: 2,
            max_args: Some(3),
            flags: FunctionFlags::empty(),
            ranges: RangeParams::except(&[1]),
            implementation: Some(lookup::fn_match),
        });

        // TRANSPOSE
        self.register(FunctionDef {
            name: "TRANSPOSE",
            min_args: 1,
            max_args: Some(1),
            flags: FunctionFlags::ARRAY_RETURNING,
            ranges: RangeParams::All,
            implementation: Some(lookup::fn_transpose),
        });

        // SEQUENCE
        self.register(FunctionDef {
            name: "SEQUENCE",
            min_args: 1,
            max_args: Some(4),
            flags: FunctionFlags::ARRAY_RETURNING | FunctionFlags::FUTURE,
            ranges: RangeParams::All,
            implementation: Some(lookup::fn_sequence),
        });
    }

    pub(crate) fn register_date_functions(&mut self) {
        // TODAY
        self.register(FunctionDef {
            name: "TODAY",
            min_args: 0,
            max_args: Some(0),
            flags: FunctionFlags::VOLATILE,
            ranges: RangeParams::None,
            implementation: Some(date::fn_today),
        });
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::evaluator::EvaluationContext;
    use crate::parser::parse_formula;
    use crate::value::AnyValue;
    use gridcalc_core::{CellOrigin, MemoryWorkbook};

    /// Evaluate `formula` in K10 of the first sheet, reading any reference
    /// result
    pub fn eval_in(wb: &MemoryWorkbook, formula: &str) -> AnyValue {
        let parsed = parse_formula(formula).unwrap();
        parsed
            .evaluate(&EvaluationContext::new(wb, CellOrigin::new(0, 9, 10)))
            .deref(wb)
    }

    pub fn eval(formula: &str) -> AnyValue {
        eval_in(&MemoryWorkbook::new(), formula)
    }
}
