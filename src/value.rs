//! The tagged value union flowing through validator chains.
//!
//! Every field value is one of a small set of shapes: absent/null, raw
//! text, or a typed scalar. Checks pattern-match on the shape they expect
//! instead of relying on implicit truthiness, but the original truthiness
//! contract survives as [`Value::is_falsy`]: null, empty text, zero
//! numbers, and `false` are all "falsy" and skip casts and bound checks
//! so that null handling later in the chain can deal with them.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::{ParseError, ParseResult};

/// Render format for datetime values that reach output without an
/// explicit conversion.
pub const DATETIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Declared type of a schema column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// No cast; values pass through with their input shape
    Untyped,
    /// UTF-8 string
    Text,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// Naive datetime parsed from configured formats
    DateTime,
    /// Hard-coded value; the chain always yields the configured constant
    Constant,
}

impl FieldType {
    /// Returns the type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Untyped => "untyped",
            FieldType::Text => "str",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
            FieldType::Constant => "constant",
        }
    }
}

/// A single field value at some point in a validator chain
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or JSON null
    Null,
    /// Raw or validated text
    Text(String),
    /// Typed integer
    Int(i64),
    /// Typed float
    Float(f64),
    /// Typed boolean
    Bool(bool),
    /// Typed datetime
    DateTime(NaiveDateTime),
}

impl Value {
    /// Returns the value's type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Truthiness contract: null, empty text, numeric zero, and `false`
    /// are falsy. Whitespace-only text is not.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::Bool(b) => !b,
            Value::DateTime(_) => false,
        }
    }

    /// Whether this value is acceptable as a bound/default/allowed value
    /// for a column of the given declared type. Exact match only; no
    /// implicit widening.
    pub(crate) fn matches_type(&self, ty: FieldType) -> bool {
        match ty {
            FieldType::Untyped | FieldType::Constant => true,
            FieldType::Text => matches!(self, Value::Text(_)),
            FieldType::Int => matches!(self, Value::Int(_)),
            FieldType::Float => matches!(self, Value::Float(_)),
            FieldType::Bool => matches!(self, Value::Bool(_)),
            FieldType::DateTime => matches!(self, Value::DateTime(_)),
        }
    }

    /// Compares two values for bound checks. Numeric variants compare
    /// across int/float; text compares lexicographically against text and
    /// numerically against numeric bounds (covers `enforce_type = false`
    /// chains where the value kept its raw shape).
    pub(crate) fn compare(&self, other: &Value) -> ParseResult<Ordering> {
        fn numeric(v: &Value) -> Option<f64> {
            match v {
                Value::Int(i) => Some(*i as f64),
                Value::Float(f) => Some(*f),
                Value::Text(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
        }

        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Ok(a.cmp(b)),
            _ => {
                let a = numeric(self);
                let b = numeric(other);
                match (a, b) {
                    (Some(a), Some(b)) => a.partial_cmp(&b).ok_or(ParseError::TypeCast {
                        value: self.to_string(),
                        target: "float",
                    }),
                    _ => Err(ParseError::TypeCast {
                        value: self.to_string(),
                        target: other.type_name(),
                    }),
                }
            }
        }
    }

    /// Converts a decoded JSON value into a field value. Nested arrays
    /// and objects stringify to their JSON text.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Converts a validated field value back into a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::DateTime(d) => {
                serde_json::Value::String(d.format(DATETIME_DISPLAY_FORMAT).to_string())
            }
        }
    }
}

/// Stringification used by slicing and delimited output. Null renders as
/// the empty string; datetimes use [`DATETIME_DISPLAY_FORMAT`].
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::DateTime(d) => write!(f, "{}", d.format(DATETIME_DISPLAY_FORMAT)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::DateTime(d)
    }
}
