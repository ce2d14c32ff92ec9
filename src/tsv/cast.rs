//! Field conversions between feed text and stored values.
//!
//! Every mapped column carries one [`Cast`]. The import direction turns the
//! trimmed feed text into a SQLite value and can fail; the export direction
//! renders a stored value back into feed text and cannot.

use rusqlite::types::Value;
use std::num::{ParseFloatError, ParseIntError};

/// The feed's literal null sentinel.
pub const NULL_SENTINEL: &str = "\\N";

/// Conversion applied to one mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cast {
    /// Free text, stored as-is.
    Text,
    /// Signed integer (years, counts, ordering).
    Integer,
    /// Floating point (average rating).
    Float,
    /// `0`/`1` flag stored as an integer.
    Boolean,
}

/// A feed value that does not parse as its declared type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CastError {
    #[error("not an integer: {0}")]
    Integer(#[from] ParseIntError),

    #[error("not a number: {0}")]
    Float(#[from] ParseFloatError),

    #[error("not a 0/1 flag: {0}")]
    Boolean(ParseIntError),

    #[error("{value} is before {lower_field} {lower}")]
    OutOfOrder {
        lower_field: &'static str,
        lower: i64,
        value: i64,
    },
}

impl Cast {
    /// Convert a present feed value into its stored form.
    ///
    /// # Errors
    ///
    /// Returns a [`CastError`] when the text is not a valid value of the
    /// declared type.
    pub fn import(self, raw: &str) -> Result<Value, CastError> {
        match self {
            Self::Text => Ok(Value::Text(raw.to_string())),
            Self::Integer => Ok(Value::Integer(raw.parse()?)),
            Self::Float => Ok(Value::Real(raw.parse()?)),
            Self::Boolean => {
                let flag: i64 = raw.parse().map_err(CastError::Boolean)?;
                Ok(Value::Integer(i64::from(flag != 0)))
            }
        }
    }

    /// Stored form of a value that is absent in the feed.
    ///
    /// Plain text columns hold an empty string; everything else, including
    /// text columns that reference a dimension row, holds NULL.
    #[must_use]
    pub fn absent(self, is_reference: bool) -> Value {
        if self == Self::Text && !is_reference {
            Value::Text(String::new())
        } else {
            Value::Null
        }
    }

    /// Render a stored value as feed text. `None` means the null sentinel.
    #[must_use]
    pub fn export(self, value: &Value) -> Option<String> {
        match (self, value) {
            (_, Value::Null) => None,
            (Self::Text, Value::Text(s)) if s.is_empty() => None,
            (Self::Boolean, Value::Integer(i)) => Some(if *i == 0 { "0" } else { "1" }.to_string()),
            #[allow(clippy::cast_precision_loss)]
            (Self::Float, Value::Integer(i)) => Some(format_float(*i as f64)),
            (_, Value::Real(f)) => Some(format_float(*f)),
            (_, Value::Integer(i)) => Some(i.to_string()),
            (_, Value::Text(s)) => Some(s.clone()),
            (_, Value::Blob(b)) => Some(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

/// Shortest round-trip representation, always with a fractional part.
///
/// The ratings feed writes `7.0`, not `7`.
#[must_use]
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{text}.0")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_integer() {
        assert_eq!(Cast::Integer.import("1894").unwrap(), Value::Integer(1894));
        assert!(matches!(
            Cast::Integer.import("18x4"),
            Err(CastError::Integer(_))
        ));
    }

    #[test]
    fn test_import_boolean() {
        assert_eq!(Cast::Boolean.import("0").unwrap(), Value::Integer(0));
        assert_eq!(Cast::Boolean.import("1").unwrap(), Value::Integer(1));
        assert_eq!(Cast::Boolean.import("2").unwrap(), Value::Integer(1));
        assert!(matches!(
            Cast::Boolean.import("yes"),
            Err(CastError::Boolean(_))
        ));
    }

    #[test]
    fn test_import_float() {
        assert_eq!(Cast::Float.import("5.7").unwrap(), Value::Real(5.7));
        assert!(Cast::Float.import("five").is_err());
    }

    #[test]
    fn test_absent_values() {
        assert_eq!(Cast::Text.absent(false), Value::Text(String::new()));
        assert_eq!(Cast::Text.absent(true), Value::Null);
        assert_eq!(Cast::Integer.absent(false), Value::Null);
        assert_eq!(Cast::Boolean.absent(false), Value::Null);
    }

    #[test]
    fn test_export_values() {
        assert_eq!(Cast::Integer.export(&Value::Null), None);
        assert_eq!(Cast::Text.export(&Value::Text(String::new())), None);
        assert_eq!(
            Cast::Text.export(&Value::Text("Short".into())).as_deref(),
            Some("Short")
        );
        assert_eq!(Cast::Boolean.export(&Value::Integer(1)).as_deref(), Some("1"));
        assert_eq!(Cast::Integer.export(&Value::Integer(1894)).as_deref(), Some("1894"));
        assert_eq!(Cast::Float.export(&Value::Real(5.7)).as_deref(), Some("5.7"));
        assert_eq!(Cast::Float.export(&Value::Integer(7)).as_deref(), Some("7.0"));
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(10.0), "10.0");
        assert_eq!(format_float(6.25), "6.25");
        assert_eq!(format_float(0.1), "0.1");
    }
}
