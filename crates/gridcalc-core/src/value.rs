//! Scalar values and spreadsheet error codes

use std::fmt;

/// Spreadsheet error values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    /// #NULL! - Empty intersection of two ranges
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized function or name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
    /// #GETTING_DATA - External data is loading
    GettingData,
    /// #SPILL! - Dynamic array cannot spill
    Spill,
    /// #CALC! - Calculation error
    Calc,
}

impl ErrorCode {
    /// All error codes, in BIFF code order
    pub const ALL: [ErrorCode; 10] = [
        ErrorCode::Null,
        ErrorCode::Div0,
        ErrorCode::Value,
        ErrorCode::Ref,
        ErrorCode::Name,
        ErrorCode::Num,
        ErrorCode::Na,
        ErrorCode::GettingData,
        ErrorCode::Spill,
        ErrorCode::Calc,
    ];

    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Null => "#NULL!",
            ErrorCode::Div0 => "#DIV/0!",
            ErrorCode::Value => "#VALUE!",
            ErrorCode::Ref => "#REF!",
            ErrorCode::Name => "#NAME?",
            ErrorCode::Num => "#NUM!",
            ErrorCode::Na => "#N/A",
            ErrorCode::GettingData => "#GETTING_DATA",
            ErrorCode::Spill => "#SPILL!",
            ErrorCode::Calc => "#CALC!",
        }
    }

    /// Parse an error string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
    }

    /// Get the numeric error code (for BIFF format)
    pub fn code(&self) -> u8 {
        match self {
            ErrorCode::Null => 0x00,
            ErrorCode::Div0 => 0x07,
            ErrorCode::Value => 0x0F,
            ErrorCode::Ref => 0x17,
            ErrorCode::Name => 0x1D,
            ErrorCode::Num => 0x24,
            ErrorCode::Na => 0x2A,
            ErrorCode::GettingData => 0x2B,
            ErrorCode::Spill => 0x2C,
            ErrorCode::Calc => 0x2D,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single (non-array) spreadsheet value
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarValue {
    /// Empty cell or omitted argument
    #[default]
    Blank,
    /// Numeric value (dates are serial numbers)
    Number(f64),
    /// Text value
    Text(String),
    /// Boolean value (TRUE/FALSE)
    Logical(bool),
    /// Error value
    Error(ErrorCode),
}

impl ScalarValue {
    /// Create a text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        ScalarValue::Text(s.into())
    }

    /// Check if the value is blank
    pub fn is_blank(&self) -> bool {
        matches!(self, ScalarValue::Blank)
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, ScalarValue::Error(_))
    }

    /// Get the error if this is one
    pub fn error(&self) -> Option<ErrorCode> {
        match self {
            ScalarValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Try to get the value as a number
    ///
    /// Blank is 0, logicals are 1/0 and numeric text is parsed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(n) => Some(*n),
            ScalarValue::Logical(true) => Some(1.0),
            ScalarValue::Logical(false) => Some(0.0),
            ScalarValue::Blank => Some(0.0),
            ScalarValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse().ok()
                }
            }
            ScalarValue::Error(_) => None,
        }
    }

    /// Convert to a number for arithmetic, propagating error values
    pub fn to_number(&self) -> std::result::Result<f64, ErrorCode> {
        match self {
            ScalarValue::Error(e) => Err(*e),
            other => other.as_number().ok_or(ErrorCode::Value),
        }
    }

    /// Try to get the value as a boolean
    pub fn as_logical(&self) -> Option<bool> {
        match self {
            ScalarValue::Logical(b) => Some(*b),
            ScalarValue::Number(n) => Some(*n != 0.0),
            ScalarValue::Blank => Some(false),
            ScalarValue::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            ScalarValue::Error(_) => None,
        }
    }

    /// Convert to a boolean, propagating error values
    pub fn to_logical(&self) -> std::result::Result<bool, ErrorCode> {
        match self {
            ScalarValue::Error(e) => Err(*e),
            other => other.as_logical().ok_or(ErrorCode::Value),
        }
    }

    /// Convert to text
    pub fn as_text(&self) -> String {
        match self {
            ScalarValue::Number(n) => format_number(*n),
            ScalarValue::Text(s) => s.clone(),
            ScalarValue::Logical(true) => "TRUE".to_string(),
            ScalarValue::Logical(false) => "FALSE".to_string(),
            ScalarValue::Error(e) => e.as_str().to_string(),
            ScalarValue::Blank => String::new(),
        }
    }

    /// Get the type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Blank => "blank",
            ScalarValue::Number(_) => "number",
            ScalarValue::Text(_) => "text",
            ScalarValue::Logical(_) => "logical",
            ScalarValue::Error(_) => "error",
        }
    }
}

/// Format a number the way a cell displays it in the General format
///
/// Magnitudes of `1e15` and above, or below `1e-9`, use exponent form
/// (`1E+20`, `2.5E-10`).
pub fn format_number(n: f64) -> String {
    let magnitude = n.abs();
    if !n.is_finite() {
        format!("{}", n)
    } else if magnitude >= 1e15 || (magnitude > 0.0 && magnitude < 1e-9) {
        let text = format!("{:E}", n);
        match text.split_once('E') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}E+{}", mantissa, exp),
            _ => text,
        }
    } else if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Logical(b)
    }
}

impl From<i32> for ScalarValue {
    fn from(n: i32) -> Self {
        ScalarValue::Number(n as f64)
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::Number(n)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Text(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Text(s)
    }
}

impl From<ErrorCode> for ScalarValue {
    fn from(e: ErrorCode) -> Self {
        ScalarValue::Error(e)
    }
}
