use std::fmt::{self, Display};

use crate::{ErrorCode, ErrorInfo, ErrorValue};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The literal a formula argument resolves to.
///
/// This is distinct from what a cell can *store*: the pipeline only ever
/// sees fully resolved values, including the two error shapes the
/// taxonomy distinguishes (a bare code vs. a rich [`ErrorInfo`]).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Number(f64),
    Bool(bool),
    Text(String),
    /// Empty cell or omitted optional argument.
    Empty,
    /// A bare taxonomy code.
    Error(ErrorCode),
    /// A rich error with attribution.
    ErrorInfo(Box<ErrorInfo>),
}

impl Value {
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_) | Value::ErrorInfo(_))
    }

    /// Classify this value as an error, if it is one.
    pub fn as_error(&self) -> Option<ErrorValue<'_>> {
        match self {
            Value::Error(code) => Some(ErrorValue::Code(*code)),
            Value::ErrorInfo(info) => Some(ErrorValue::Info(info)),
            _ => None,
        }
    }

    /// Numeric coercion: ints and numbers as-is, booleans as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Text(s) => write!(f, "{s}"),
            Value::Empty => Ok(()),
            Value::Error(code) => write!(f, "{code}"),
            Value::ErrorInfo(info) => write!(f, "{}", info.code),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(Value::Error(ErrorCode::Div0).is_error());
        assert!(Value::from(ErrorInfo::new(ErrorCode::Na)).is_error());
        assert!(!Value::Empty.is_error());

        match Value::Error(ErrorCode::Div0).as_error() {
            Some(ErrorValue::Code(code)) => assert_eq!(code, ErrorCode::Div0),
            other => panic!("unexpected classification: {other:?}"),
        }
        let rich = Value::from(ErrorInfo::new(ErrorCode::Na).with_param_index(1));
        match rich.as_error() {
            Some(ErrorValue::Info(info)) => assert_eq!(info.param_index, Some(1)),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
        assert_eq!(Value::Bool(true).as_f64(), Some(1.0));
        assert_eq!(Value::Text("2".into()).as_f64(), None);
        assert_eq!(Value::Empty.as_f64(), None);
    }
}
