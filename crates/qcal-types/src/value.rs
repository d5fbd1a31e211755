//! Stored parameter values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stored form of the "being recalibrated" placeholder.
pub const NAN_SENTINEL: &str = "nan";

/// A calibration parameter value.
///
/// Values are persisted in string form, the way a Redis hash holds them.
/// [`ParamValue::parse`] recovers the typed value: integers first, then
/// floats, anything else is kept as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer value (loop counts, flags).
    Int(i64),
    /// Floating point value (frequencies, amplitudes, durations).
    Float(f64),
    /// Free-form text.
    Text(String),
}

impl ParamValue {
    /// The NaN sentinel marking a field as under recalibration.
    pub fn nan() -> Self {
        ParamValue::Float(f64::NAN)
    }

    /// Parse the stored string form.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return ParamValue::Int(i);
        }
        if trimmed.eq_ignore_ascii_case(NAN_SENTINEL) {
            return ParamValue::nan();
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return ParamValue::Float(f);
        }
        ParamValue::Text(raw.to_string())
    }

    /// String form used by the stores.
    pub fn to_stored(&self) -> String {
        self.to_string()
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            ParamValue::Text(_) => None,
        }
    }

    /// Check if this is the NaN sentinel.
    pub fn is_nan_sentinel(&self) -> bool {
        matches!(self, ParamValue::Float(f) if f.is_nan())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) if x.is_nan() => f.write_str(NAN_SENTINEL),
            // `{:?}` keeps a decimal point or exponent so the value parses back as a float.
            ParamValue::Float(x) => write!(f, "{x:?}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ParamValue::Float(a), ParamValue::Float(b)) => {
                (a.is_nan() && b.is_nan()) || a == b
            }
            (ParamValue::Int(a), ParamValue::Int(b)) => a == b,
            (ParamValue::Text(a), ParamValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_nan_sentinel_display() {
        assert_eq!(ParamValue::nan().to_stored(), "nan");
        assert!(ParamValue::parse("nan").is_nan_sentinel());
        assert!(ParamValue::parse("NaN").is_nan_sentinel());
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(ParamValue::parse("42"), ParamValue::Int(42));
        assert_eq!(ParamValue::parse("5e-06"), ParamValue::Float(5e-6));
        assert_eq!(ParamValue::parse("0.25"), ParamValue::Float(0.25));
        assert_eq!(
            ParamValue::parse("ro_2st"),
            ParamValue::Text("ro_2st".to_string())
        );
    }

    #[test]
    fn test_float_keeps_float_form() {
        assert_eq!(ParamValue::Float(3.0).to_stored(), "3.0");
        assert_eq!(ParamValue::parse("3.0"), ParamValue::Float(3.0));
    }

    proptest! {
        #[test]
        fn prop_float_stored_form_parses_back(x in proptest::num::f64::NORMAL) {
            let value = ParamValue::Float(x);
            prop_assert_eq!(ParamValue::parse(&value.to_stored()), value);
        }
    }
}
