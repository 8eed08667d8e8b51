//! Terms and term-to-value mapping helpers.
//!
//! A [`Term`] is an unevaluated function argument as received by a
//! formula invocation. The pipeline treats terms opaquely; the mapping
//! helpers here are the common coercions built-in functions reach for
//! inside their `map_next_arg` closures.

use fluxsheet_common::{ErrorCode, Value};

/// An unevaluated function argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    value: Value,
}

impl Term {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Map a possibly-missing term to a number: errors pass through,
/// non-numerics become `#VALUE!`, a missing term becomes `#ARG_NUM`.
pub fn to_number(term: Option<&Term>) -> Value {
    let Some(term) = term else {
        return Value::Error(ErrorCode::Args);
    };
    let value = term.value();
    if value.is_error() {
        return value.clone();
    }
    value
        .as_f64()
        .map(Value::Number)
        .unwrap_or(Value::Error(ErrorCode::Value))
}

/// Map a possibly-missing term to a boolean, same error rules as
/// [`to_number`].
pub fn to_bool(term: Option<&Term>) -> Value {
    let Some(term) = term else {
        return Value::Error(ErrorCode::Args);
    };
    let value = term.value();
    if value.is_error() {
        return value.clone();
    }
    value
        .as_bool()
        .map(Value::Bool)
        .unwrap_or(Value::Error(ErrorCode::Value))
}

/// Map a possibly-missing term to text. Any non-error value converts
/// via its display form.
pub fn to_text(term: Option<&Term>) -> Value {
    let Some(term) = term else {
        return Value::Error(ErrorCode::Args);
    };
    let value = term.value();
    if value.is_error() {
        return value.clone();
    }
    Value::Text(value.to_string())
}
