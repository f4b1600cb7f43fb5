//! Runtime value model and coercions
//!
//! Every operand evaluates to a [`Value`]. Binary operators require both
//! sides in the same kind; the compiler converts the secondary operand to
//! the primary operand's kind before applying the operator, and a failed
//! conversion is an error rather than a silent false.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};

/// Accepted culture-invariant date literal formats, tried in order
const DATE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y",
];

/// A runtime value produced by evaluating an expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDateTime),
    List(Vec<Value>),
}

/// The kind tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Date,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::Str => "string",
            ValueKind::Date => "date",
            ValueKind::List => "list",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Date(_) => ValueKind::Date,
            Value::List(_) => ValueKind::List,
        }
    }

    /// Require a boolean, the result type of every predicate
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(conversion_error(other, ValueKind::Bool)),
        }
    }
}

fn conversion_error(value: &Value, target: ValueKind) -> FilterError {
    FilterError::ConversionFailed {
        value: value.to_string(),
        target: target.to_string(),
    }
}

/// Parse a date literal body (markers already stripped)
pub(crate) fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in DATE_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime);
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Convert `value` to `target`, failing loudly when the conversion has no
/// meaning.
pub fn convert(value: &Value, target: ValueKind) -> Result<Value> {
    if value.kind() == target {
        return Ok(value.clone());
    }
    let converted = match (value, target) {
        (Value::Float(x), ValueKind::Int) => Some(Value::Int(*x as i64)),
        (Value::Bool(b), ValueKind::Int) => Some(Value::Int(i64::from(*b))),
        (Value::Str(s), ValueKind::Int) => s.trim().parse::<i64>().ok().map(Value::Int),
        (Value::Int(i), ValueKind::Float) => Some(Value::Float(*i as f64)),
        (Value::Str(s), ValueKind::Float) => s.trim().parse::<f64>().ok().map(Value::Float),
        (Value::Int(i), ValueKind::Bool) => Some(Value::Bool(*i != 0)),
        (Value::Str(s), ValueKind::Bool) => match s.trim() {
            t if t.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
            t if t.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
            _ => None,
        },
        (Value::Str(s), ValueKind::Date) => parse_date(s).map(Value::Date),
        (Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Date(_), ValueKind::Str) => {
            Some(Value::Str(value.to_string()))
        }
        _ => None,
    };
    converted.ok_or_else(|| conversion_error(value, target))
}

/// Native ordering between two values of the same kind
pub fn ordering(left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).ok_or_else(|| {
            FilterError::NotSupported("Cannot order incomparable float values".to_string())
        }),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        _ => Err(FilterError::NotSupported(format!(
            "Cannot order {} against {}",
            left.kind(),
            right.kind()
        ))),
    }
}
