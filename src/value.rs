//! Query-time value coercion
//!
//! Every stored field value is raw text; interpretation happens on read. A
//! token that parses as an integer becomes [`Value::Int`]; one that parses as
//! a non-integer number stays as its original text inside [`Value::Float`]
//! (so the caller's spelling round-trips exactly) while remaining comparable
//! as a float; the literals `true`/`false` become [`Value::Bool`]; everything
//! else is a string.
//!
//! # Example
//!
//! ```rust
//! use streamts::value::Value;
//!
//! assert_eq!(Value::coerce("42"), Value::Int(42));
//! assert_eq!(Value::coerce("3.140"), Value::Float("3.140".to_string()));
//! assert_eq!(Value::coerce("true"), Value::Bool(true));
//! assert_eq!(Value::coerce("high"), Value::Str("high".to_string()));
//!
//! // Float spelling is preserved on display
//! assert_eq!(Value::coerce("3.140").to_string(), "3.140");
//! ```

use std::fmt;

/// A dynamically typed view of a raw field value.
///
/// `Float` carries the original text rather than a lossy native double in the
/// hot path; the parse happens only where a numeric comparison needs it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer token
    Int(i64),
    /// Non-integer numeric token, original text preserved
    Float(String),
    /// The literals `true` / `false`
    Bool(bool),
    /// Anything else
    Str(String),
}

impl Value {
    /// Coerce a raw text token.
    pub fn coerce(raw: &str) -> Value {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
        if parse_numeric(raw).is_some() {
            return Value::Float(raw.to_string());
        }
        match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Str(raw.to_string()),
        }
    }

    /// Build a value from a computed float, collapsing integral results so
    /// integer display carries no trailing `.0`.
    pub fn from_f64(x: f64) -> Value {
        const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
        if x.is_finite() && x.fract() == 0.0 && x.abs() < EXACT {
            Value::Int(x as i64)
        } else {
            Value::Float(x.to_string())
        }
    }

    /// Numeric interpretation, when one exists
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(text) => parse_numeric(text),
            Value::Bool(_) | Value::Str(_) => None,
        }
    }

    /// Convert to a JSON value for `FORMAT json` output
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(text) => match parse_numeric(text).and_then(serde_json::Number::from_f64)
            {
                Some(n) => serde_json::Value::Number(n),
                None => serde_json::Value::String(text.clone()),
            },
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(text) => write!(f, "{}", text),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Parse a token as a finite number.
///
/// Rejects the `inf`/`nan` spellings Rust's float parser would otherwise
/// accept; those are strings in this data model.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_integers() {
        assert_eq!(Value::coerce("0"), Value::Int(0));
        assert_eq!(Value::coerce("-17"), Value::Int(-17));
        assert_eq!(Value::coerce("9000"), Value::Int(9000));
    }

    #[test]
    fn test_coerce_floats_keep_text() {
        let v = Value::coerce("156.50");
        assert_eq!(v, Value::Float("156.50".to_string()));
        assert_eq!(v.to_string(), "156.50");
        assert_eq!(v.as_f64(), Some(156.5));

        // exponent forms are numeric but not integer tokens
        assert_eq!(Value::coerce("1e3"), Value::Float("1e3".to_string()));
    }

    #[test]
    fn test_coerce_bools_are_exact_literals() {
        assert_eq!(Value::coerce("true"), Value::Bool(true));
        assert_eq!(Value::coerce("false"), Value::Bool(false));
        assert_eq!(Value::coerce("True"), Value::Str("True".to_string()));
        assert_eq!(Value::coerce("FALSE"), Value::Str("FALSE".to_string()));
    }

    #[test]
    fn test_coerce_strings() {
        assert_eq!(Value::coerce("april"), Value::Str("april".to_string()));
        assert_eq!(Value::coerce(""), Value::Str(String::new()));
    }

    #[test]
    fn test_inf_and_nan_are_strings() {
        assert_eq!(Value::coerce("inf"), Value::Str("inf".to_string()));
        assert_eq!(Value::coerce("NaN"), Value::Str("NaN".to_string()));
        assert!(parse_numeric("infinity").is_none());
        assert!(parse_numeric("nan").is_none());
    }

    #[test]
    fn test_from_f64_collapses_integral() {
        assert_eq!(Value::from_f64(1565.0), Value::Int(1565));
        assert_eq!(Value::from_f64(156.5), Value::Float("156.5".to_string()));
        assert_eq!(Value::from_f64(-0.0), Value::Int(0));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::coerce("42").to_json(), serde_json::json!(42));
        assert_eq!(Value::coerce("1.5").to_json(), serde_json::json!(1.5));
        assert_eq!(Value::coerce("true").to_json(), serde_json::json!(true));
        assert_eq!(Value::coerce("hi").to_json(), serde_json::json!("hi"));
    }
}
