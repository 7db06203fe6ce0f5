//! # gridcalc-formula
//!
//! Formula parser, function registry and evaluator for gridcalc.
//!
//! This crate provides:
//! - Formula parsing in A1 and R1C1 notation (text → AST) and serialization
//!   back to text
//! - A function registry describing arity, range handling and flags, with an
//!   invocation engine for implicit intersection and array broadcast
//! - Formula evaluation against a [`gridcalc_core::DataModel`]
//! - A reference-aware rewrite walker, future-function (`_xlfn.`)
//!   normalization on top of it, a wildcard matcher and a parse cache
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::{CellOrigin, MemoryWorkbook};
//! use gridcalc_formula::{parse_formula, AnyValue, EvaluationContext};
//!
//! let mut workbook = MemoryWorkbook::new();
//! workbook.set_value(0, "A1", 2.0).unwrap();
//! workbook.set_value(0, "A2", 3.0).unwrap();
//!
//! let formula = parse_formula("=SUM(A1:A2)*2").unwrap();
//! let result = formula.evaluate(&EvaluationContext::new(&workbook, CellOrigin::default()));
//! assert_eq!(result, AnyValue::number(10.0));
//! ```

pub mod ast;
pub mod cache;
mod display;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod future;
pub mod invoke;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod rewrite;
pub mod structured;
pub mod trie;
pub mod value;
pub mod wildcard;

pub use ast::{
    BinaryOperator, CellRef, Coord, FormulaExpr, FunctionId, ParsedFormula, Prefix, Reference,
    ReferenceStyle, SheetRef, UnaryOperator,
};
pub use cache::FormulaCache;
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, EvaluationContext, EvaluationOptions};
pub use future::{normalize_future_functions, FutureFunctions};
pub use invoke::{implicit_intersect, invoke, invoke_as_array, CallContext, FunctionImpl};
pub use parser::{parse, parse_formula, FormulaParser, ParseOptions};
pub use registry::{
    FunctionDef, FunctionFlags, FunctionRegistry, ParamSet, RangeClass, RangeParams,
};
pub use rewrite::{
    convert_reference_style, rewrite_formula, shift_formula, FormulaVisitor,
    NameRewriteVisitor, ReferenceShiftVisitor, ReferenceStyleVisitor, RewriteContext, Rewritten,
};
pub use structured::{ColumnSpan, StructuredRef, TableItem};
pub use trie::PrefixTrie;
pub use value::{AnyValue, ArrayValue, ReferenceValue, SheetArea};
pub use wildcard::Wildcard;
