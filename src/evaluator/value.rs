use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{Result, VimsynError, VimsynErrorKind};

/// A value of the script expression language.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Value {
    /// The value of undefined variables.
    #[default]
    Null,
    /// A boolean, the result of comparisons and logical operators.
    Bool(bool),
    /// An integer number.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
}

/// Numbers after coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

/// Parses the leading integer of a string the way Vim does, "12abc" is 12, "abc" is 0.
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end].parse::<i64>().unwrap_or(0);
    if negative {
        -value
    } else {
        value
    }
}

impl Value {
    /// The truth value.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => leading_int(s) != 0,
        }
    }

    fn number(&self) -> Number {
        match self {
            Value::Null => Number::Int(0),
            Value::Bool(b) => Number::Int(*b as i64),
            Value::Int(i) => Number::Int(*i),
            Value::Float(f) => Number::Float(*f),
            Value::Str(s) => Number::Int(leading_int(s)),
        }
    }

    /// The value as integer. Floats are truncated.
    pub fn as_int(&self) -> i64 {
        match self.number() {
            Number::Int(i) => i,
            Number::Float(f) => f as i64,
        }
    }

    /// The value as float.
    pub fn as_float(&self) -> f64 {
        self.number().as_f64()
    }

    /// Returns true for string values.
    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    fn arithmetic(
        &self,
        rhs: &Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
        operator: char,
    ) -> Result<Value> {
        match (self.number(), rhs.number()) {
            (Number::Int(a), Number::Int(b)) => int_op(a, b).map(Value::Int).ok_or_else(|| {
                VimsynError::new(VimsynErrorKind::Evaluation(format!(
                    "Invalid integer operation {a} {operator} {b}"
                )))
            }),
            (a, b) => Ok(Value::Float(float_op(a.as_f64(), b.as_f64()))),
        }
    }

    /// `self + rhs`
    pub fn plus(&self, rhs: &Value) -> Result<Value> {
        self.arithmetic(rhs, i64::checked_add, |a, b| a + b, '+')
    }

    /// `self - rhs`
    pub fn minus(&self, rhs: &Value) -> Result<Value> {
        self.arithmetic(rhs, i64::checked_sub, |a, b| a - b, '-')
    }

    /// `self * rhs`
    pub fn times(&self, rhs: &Value) -> Result<Value> {
        self.arithmetic(rhs, i64::checked_mul, |a, b| a * b, '*')
    }

    /// `self / rhs`, integer division by zero is an error.
    pub fn divided_by(&self, rhs: &Value) -> Result<Value> {
        self.arithmetic(rhs, i64::checked_div, |a, b| a / b, '/')
    }

    /// `self % rhs`
    pub fn modulo(&self, rhs: &Value) -> Result<Value> {
        self.arithmetic(rhs, i64::checked_rem, |a, b| a % b, '%')
    }

    /// `-self`
    pub fn negated(&self) -> Result<Value> {
        Value::Int(0).minus(self)
    }

    /// String concatenation `self . rhs`.
    pub fn concat(&self, rhs: &Value) -> Value {
        Value::Str(format!("{self}{rhs}"))
    }

    /// Compares two values. Two strings compare as strings, anything else numerically.
    pub fn compare(&self, rhs: &Value, ignore_case: bool) -> Option<Ordering> {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) if ignore_case => {
                Some(a.to_lowercase().cmp(&b.to_lowercase()))
            }
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => match (self.number(), rhs.number()) {
                (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
                (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", *b as i64),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}
