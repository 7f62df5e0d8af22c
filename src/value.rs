use std::cmp::Ordering;
use std::fmt;

use crate::evaluator::EvalError;

/// A runtime value held by a symbol or produced by an expression.
///
/// Values are plain data: they are copied with [`Clone`] and never shared.
/// Two values are equal only if they have the same variant and equal
/// contents, so `Int(1)` and `Double(1.0)` are different symbol states.
///
/// # Examples
///
/// ```
/// use loglang::Value;
///
/// let load = Value::Double(0.75);
/// let count = Value::Int(3);
/// let host = Value::String("db-1".to_string());
/// let samples = Value::List(vec![Value::Int(1), Value::Int(2)]);
///
/// assert_eq!(count.to_double().unwrap(), 3.0);
/// assert!(host.to_int().is_err());
/// assert_ne!(Value::Int(1), Value::Double(1.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer number
    Int(i64),

    /// Floating-point number
    Double(f64),

    /// UTF-8 string
    String(String),

    /// Boolean (result of comparisons and logical operators)
    Bool(bool),

    /// Ordered sequence of values (result of glob reads)
    List(Vec<Value>),
}

impl Value {
    /// Result of a stateful form that did not fire, of an empty block, and of
    /// an `if` without `else` whose condition is false.
    pub fn neutral() -> Value {
        Value::Bool(false)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
        }
    }

    fn conversion_error(&self, expected: &'static str) -> EvalError {
        EvalError::InvalidConversion {
            expected,
            found: self.to_string(),
        }
    }

    pub fn to_int(&self) -> Result<i64, EvalError> {
        match self {
            Value::Int(n) => Ok(*n),
            _ => Err(self.conversion_error("int")),
        }
    }

    /// Numeric value as a double; integers widen.
    pub fn to_double(&self) -> Result<f64, EvalError> {
        match self {
            Value::Int(n) => Ok(*n as f64),
            Value::Double(n) => Ok(*n),
            _ => Err(self.conversion_error("double")),
        }
    }

    /// Truth value of a condition. Numbers are true when non-zero.
    pub fn to_bool(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(n) => Ok(*n != 0),
            Value::Double(n) => Ok(*n != 0.0),
            _ => Err(self.conversion_error("bool")),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Double(_))
    }

    /// Orders two values of compatible kinds.
    ///
    /// Numbers compare as doubles, strings lexicographically, booleans with
    /// `false < true`, and lists element by element with the shorter list
    /// first on a common prefix. Anything else is an invalid conversion.
    pub fn compare(&self, other: &Value) -> Result<Ordering, EvalError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (a, b) = (a.to_double()?, b.to_double()?);
                Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
            }
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        unequal => return Ok(unequal),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (a, b) => Err(EvalError::InvalidConversion {
                expected: a.type_name(),
                found: b.to_string(),
            }),
        }
    }

    /// Parses a numeric literal: integers have no `.`, anything else with a
    /// `.` is a double.
    pub fn parse_number(text: &str) -> Option<Value> {
        if text.contains('.') {
            text.parse::<f64>().ok().map(Value::Double)
        } else {
            text.parse::<i64>().ok().map(Value::Int)
        }
    }

    /// Interprets raw text from a data line or a regex capture: a number when
    /// it looks like one, otherwise the text itself.
    pub fn parse_scalar(text: &str) -> Value {
        let numeric_start = text
            .trim_start_matches(['-', '+'])
            .starts_with(|c: char| c.is_ascii_digit() || c == '.');
        if numeric_start {
            if let Ok(n) = text.parse::<i64>() {
                return Value::Int(n);
            }
            if let Ok(n) = text.parse::<f64>() {
                return Value::Double(n);
            }
        }
        Value::String(text.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}
