//! Future-function normalization, reference rewriting and wildcard
//! properties

use gridcalc_core::CellOrigin;
use gridcalc_formula::{
    convert_reference_style, normalize_future_functions, parse_formula, shift_formula,
    FutureFunctions, ReferenceStyle, Wildcard,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::borrow::Cow;

/// Formula fragments built only from names outside the future list
fn plain_fragment() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "SUM(", "A1", "B2:C3", "1", ",", ")", "+", "*", "\"text\"", "Sheet2!D4", "MAX(",
    ])
}

/// Fragments that include future calls, prefixed calls and mentions
fn mixed_fragment() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "SUM(",
        "concat(",
        "XLOOKUP(",
        "_xlfn.IFS(",
        "Filter(",
        "\"CONCAT(\"",
        "A1",
        "1",
        ",",
        ")",
        "&",
    ])
}

proptest! {
    #[test]
    fn test_text_without_future_names_is_borrowed(parts in prop::collection::vec(plain_fragment(), 0..12)) {
        let text = format!("={}", parts.concat());
        let out = normalize_future_functions(&text, &CellOrigin::default());
        prop_assert!(matches!(out, Cow::Borrowed(t) if t == text));
    }

    #[test]
    fn test_normalize_is_idempotent(parts in prop::collection::vec(mixed_fragment(), 0..12)) {
        let text = format!("={}", parts.concat());
        let origin = CellOrigin::default();
        let once = normalize_future_functions(&text, &origin).into_owned();
        let twice = normalize_future_functions(&once, &origin);
        prop_assert_eq!(twice.as_ref(), once.as_str());
    }

    #[test]
    fn test_star_matches_everything(text in ".{0,40}") {
        prop_assert!(Wildcard::new("*").matches(&text));
    }

    #[test]
    fn test_literal_pattern_matches_itself_ignoring_case(text in "[a-zA-Z0-9 ]{0,40}") {
        let pattern = Wildcard::new(&text);
        prop_assert!(pattern.matches(&text.to_uppercase()));
        prop_assert!(pattern.matches(&text.to_lowercase()));
    }

    #[test]
    fn test_question_marks_match_by_length(len in 0usize..30, text in "[a-z]{0,30}") {
        let pattern = Wildcard::new(&"?".repeat(len));
        prop_assert_eq!(pattern.matches(&text), text.chars().count() == len);
    }
}

/// Test that a normalized formula still parses and strips back
#[test]
fn test_normalized_text_parses_and_strips_back() {
    let origin = CellOrigin::default();
    let authored = "=TEXTJOIN(\",\",TRUE,A1:A3)&CONCAT(B1,B2)";
    let stored = normalize_future_functions(authored, &origin);
    assert_eq!(stored, "=_xlfn.TEXTJOIN(\",\",TRUE,A1:A3)&_xlfn.CONCAT(B1,B2)");

    let parsed = parse_formula(&stored).unwrap();
    assert_eq!(
        parsed.to_formula(&origin),
        "_xlfn.TEXTJOIN(\",\",TRUE,A1:A3)&_xlfn.CONCAT(B1,B2)"
    );
    assert_eq!(
        FutureFunctions::builtin().strip_prefixes(&stored, &origin),
        authored
    );
}

/// Test converting notation and shifting references on raw text
#[test]
fn test_reference_rewrites() {
    let origin = CellOrigin::new(0, 4, 2);
    let r1c1 =
        convert_reference_style("=C5*$A$1", ReferenceStyle::A1, ReferenceStyle::R1C1, origin)
            .unwrap();
    assert_eq!(r1c1, "=RC*R1C1");
    assert_eq!(
        convert_reference_style(&r1c1, ReferenceStyle::R1C1, ReferenceStyle::A1, origin).unwrap(),
        "=C5*$A$1"
    );

    assert_eq!(shift_formula("=A1+$B$2+B$3", 1, 1).unwrap(), "=B2+$B$2+C$3");
}
