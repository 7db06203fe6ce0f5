//! Formula error types
//!
//! Only parse-time failures are Rust errors. Evaluation problems are
//! spreadsheet error values ([`gridcalc_core::ErrorCode`]) carried inside
//! [`crate::AnyValue`].

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while reading formula text
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormulaError {
    /// Malformed syntax or a static arity violation
    #[error("Parse error: {0}")]
    Parse(String),
}

impl FormulaError {
    pub(crate) fn parse<S: Into<String>>(msg: S) -> Self {
        FormulaError::Parse(msg.into())
    }

    /// Arity violation for `function`
    pub(crate) fn argument_count(
        function: &str,
        min: usize,
        max: Option<usize>,
        actual: usize,
    ) -> Self {
        let expected = match max {
            Some(max) if max == min => format!("exactly {}", min),
            Some(max) if actual > max => format!("at most {}", max),
            _ => format!("at least {}", min),
        };
        FormulaError::Parse(format!(
            "Wrong number of arguments for {}: expected {}, got {}",
            function, expected, actual
        ))
    }

    /// The human-readable message
    pub fn message(&self) -> &str {
        match self {
            FormulaError::Parse(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_count_messages() {
        assert_eq!(
            FormulaError::argument_count("ABS", 1, Some(1), 2).to_string(),
            "Parse error: Wrong number of arguments for ABS: expected exactly 1, got 2"
        );
        assert_eq!(
            FormulaError::argument_count("ROUND", 1, Some(2), 3).message(),
            "Wrong number of arguments for ROUND: expected at most 2, got 3"
        );
        assert_eq!(
            FormulaError::argument_count("SUM", 1, None, 0).message(),
            "Wrong number of arguments for SUM: expected at least 1, got 0"
        );
    }
}
