//! Criteria matching for SUMIF and COUNTIF
//!
//! Criteria can be:
//! - A number: exact numeric match (e.g., 5)
//! - A text string: case-insensitive match with wildcards (e.g., "app*")
//! - A comparison expression: ">5", ">=10", "<>0", "=x", "<b"
//! - Empty string: matches empty cells

use crate::evaluator::compare_values;
use crate::wildcard::Wildcard;
use gridcalc_core::ScalarValue;
use std::cmp::Ordering;

/// Criteria matcher for the conditional aggregate functions
#[derive(Debug)]
pub struct CriteriaMatcher {
    criteria_type: CriteriaType,
}

#[derive(Debug)]
enum CriteriaType {
    /// Exact number match
    Number(f64),
    /// Comparison with number (operator, value)
    Comparison(ComparisonOp, f64),
    /// Ordering comparison against text
    TextComparison(ComparisonOp, String),
    /// Text match (`negate` for `<>`)
    Text { pattern: Wildcard, negate: bool },
    /// Match an error value
    Error(gridcalc_core::ErrorCode),
    /// Match empty values
    Empty,
    /// Match anything that is not empty (`<>`)
    NotEmpty,
}

#[derive(Debug, Clone, Copy)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl ComparisonOp {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ord == Ordering::Equal,
            ComparisonOp::NotEqual => ord != Ordering::Equal,
            ComparisonOp::LessThan => ord == Ordering::Less,
            ComparisonOp::LessEqual => ord != Ordering::Greater,
            ComparisonOp::GreaterThan => ord == Ordering::Greater,
            ComparisonOp::GreaterEqual => ord != Ordering::Less,
        }
    }
}

fn numeric(value: &ScalarValue) -> Option<f64> {
    match value {
        ScalarValue::Number(n) => Some(*n),
        ScalarValue::Logical(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

impl CriteriaMatcher {
    /// Create a matcher from a criteria value
    pub fn new(criteria: &ScalarValue) -> Self {
        let criteria_type = match criteria {
            ScalarValue::Number(n) => CriteriaType::Number(*n),
            ScalarValue::Logical(b) => CriteriaType::Number(if *b { 1.0 } else { 0.0 }),
            ScalarValue::Text(s) => Self::parse_string_criteria(s),
            ScalarValue::Blank => CriteriaType::Empty,
            ScalarValue::Error(e) => CriteriaType::Error(*e),
        };

        Self { criteria_type }
    }

    fn parse_string_criteria(s: &str) -> CriteriaType {
        if s.is_empty() {
            return CriteriaType::Empty;
        }

        // Check for comparison operators (longer ones first)
        let (op, rest) = if let Some(rest) = s.strip_prefix(">=") {
            (Some(ComparisonOp::GreaterEqual), rest)
        } else if let Some(rest) = s.strip_prefix("<=") {
            (Some(ComparisonOp::LessEqual), rest)
        } else if let Some(rest) = s.strip_prefix("<>") {
            (Some(ComparisonOp::NotEqual), rest)
        } else if let Some(rest) = s.strip_prefix('>') {
            (Some(ComparisonOp::GreaterThan), rest)
        } else if let Some(rest) = s.strip_prefix('<') {
            (Some(ComparisonOp::LessThan), rest)
        } else if let Some(rest) = s.strip_prefix('=') {
            (Some(ComparisonOp::Equal), rest)
        } else {
            (None, s)
        };

        if let Ok(n) = rest.trim().parse::<f64>() {
            return match op {
                Some(op) => CriteriaType::Comparison(op, n),
                None => CriteriaType::Number(n),
            };
        }

        match op {
            Some(ComparisonOp::Equal) if rest.is_empty() => CriteriaType::Empty,
            Some(ComparisonOp::NotEqual) if rest.is_empty() => CriteriaType::NotEmpty,
            None | Some(ComparisonOp::Equal) => CriteriaType::Text {
                pattern: Wildcard::new(rest),
                negate: false,
            },
            Some(ComparisonOp::NotEqual) => CriteriaType::Text {
                pattern: Wildcard::new(rest),
                negate: true,
            },
            Some(op) => CriteriaType::TextComparison(op, rest.to_string()),
        }
    }

    /// Check if a value matches the criteria
    pub fn matches(&self, value: &ScalarValue) -> bool {
        match &self.criteria_type {
            // Only actual numbers match, not text that looks like one
            CriteriaType::Number(criteria_num) => {
                numeric(value).map_or(false, |n| (n - criteria_num).abs() < 1e-10)
            }

            CriteriaType::Comparison(op, criteria_num) => match numeric(value) {
                Some(n) => op.holds(n.partial_cmp(criteria_num).unwrap_or(Ordering::Equal)),
                // Anything not numeric is "not equal" to a number
                None => matches!(op, ComparisonOp::NotEqual),
            },

            CriteriaType::TextComparison(op, text) => match value {
                ScalarValue::Text(s) => op.holds(compare_values(
                    &ScalarValue::Text(s.clone()),
                    &ScalarValue::Text(text.clone()),
                )),
                _ => false,
            },

            CriteriaType::Text { pattern, negate } => {
                let hit = match value {
                    ScalarValue::Text(s) => pattern.matches(s),
                    ScalarValue::Blank => pattern.matches(""),
                    _ => false,
                };
                hit != *negate
            }

            CriteriaType::Error(e) => value.error() == Some(*e),

            CriteriaType::Empty => {
                matches!(value, ScalarValue::Blank)
                    || matches!(value, ScalarValue::Text(s) if s.is_empty())
            }

            CriteriaType::NotEmpty => !matches!(value, ScalarValue::Blank),
        }
    }
}
