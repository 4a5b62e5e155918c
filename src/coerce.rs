//! Command-line argument coercion helpers.
//!
//! CLIs hand over every argument as text; these helpers turn the common
//! boolean and numeric spellings into typed values before a request is
//! validated. They sit outside the core descriptor/validator path.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static FLOAT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+$").expect("static pattern"));
static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("static pattern"));

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoerceError {
    #[error("'{0}' does not look like a boolean")]
    NotABoolean(String),

    #[error("'{0}' does not look like a number")]
    NotANumber(String),
}

/// Accepts the usual boolean spellings, case-insensitively.
pub fn string_to_boolean(text: &str) -> Result<bool, CoerceError> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => Err(CoerceError::NotABoolean(text.to_string())),
    }
}

/// Parses a numeric literal: digits-dot-digits is a float, bare digits an
/// integer, anything else is rejected.
pub fn string_to_number(text: &str) -> Result<Value, CoerceError> {
    if FLOAT_RE.is_match(text) {
        text.parse::<f64>()
            .map(Value::from)
            .map_err(|_| CoerceError::NotANumber(text.to_string()))
    } else if INTEGER_RE.is_match(text) {
        text.parse::<i64>()
            .map(Value::from)
            .map_err(|_| CoerceError::NotANumber(text.to_string()))
    } else {
        Err(CoerceError::NotANumber(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_spellings() {
        for text in ["true", "t", "yes", "y", "1", "TRUE", "Yes", "T"] {
            assert_eq!(string_to_boolean(text), Ok(true), "{text}");
        }
        for text in ["false", "f", "no", "n", "0", "FALSE", "No", "F"] {
            assert_eq!(string_to_boolean(text), Ok(false), "{text}");
        }
        assert_eq!(
            string_to_boolean("maybe"),
            Err(CoerceError::NotABoolean("maybe".to_string()))
        );
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(string_to_number("42"), Ok(json!(42)));
        assert_eq!(string_to_number("1.5"), Ok(json!(1.5)));
        assert_eq!(
            string_to_number("1.5.0"),
            Err(CoerceError::NotANumber("1.5.0".to_string()))
        );
        assert_eq!(
            string_to_number("-1"),
            Err(CoerceError::NotANumber("-1".to_string()))
        );
        assert_eq!(
            string_to_number(".5"),
            Err(CoerceError::NotANumber(".5".to_string()))
        );
        assert_eq!(
            string_to_number("nginx"),
            Err(CoerceError::NotANumber("nginx".to_string()))
        );
    }
}
