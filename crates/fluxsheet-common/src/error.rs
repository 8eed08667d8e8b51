//! Streamsheet error taxonomy.
//!
//! - **`ErrorCode`**  : the canonical set of function error codes
//! - **`ErrorInfo`**  : a rich error carrying a code plus optional
//!   parameter index and function name
//! - **`ErrorValue`** : borrowed classification of a raw [`Value`]
//!
//! Errors here are *soft*: they travel as sentinel values through the
//! evaluation pipeline and are never raised as faults. The codes are an
//! opaque set — callers match on them, nothing in the core interprets
//! them beyond equality.

use std::{error::Error, fmt};

use crate::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// All recognised function error codes.
///
/// **Note:** names are CamelCase (idiomatic Rust) while `Display`
/// renders the wire form shown in a cell (`#ARG_NUM`, `#DIV0`, …).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Args,
    Div0,
    Invalid,
    Limit,
    Na,
    Name,
    NoSheet,
    Num,
    Ref,
    Value,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Args => "#ARG_NUM",
            Self::Div0 => "#DIV0",
            Self::Invalid => "#INVALID",
            Self::Limit => "#LIMIT",
            Self::Na => "#NA!",
            Self::Name => "#NAME?",
            Self::NoSheet => "#NO_SHEET",
            Self::Num => "#NUM!",
            Self::Ref => "#REF!",
            Self::Value => "#VALUE!",
        })
    }
}

impl ErrorCode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "#ARG_NUM" => Some(Self::Args),
            "#DIV0" => Some(Self::Div0),
            "#INVALID" => Some(Self::Invalid),
            "#LIMIT" => Some(Self::Limit),
            "#NA!" => Some(Self::Na),
            "#NAME?" => Some(Self::Name),
            "#NO_SHEET" => Some(Self::NoSheet),
            "#NUM!" => Some(Self::Num),
            "#REF!" => Some(Self::Ref),
            "#VALUE!" => Some(Self::Value),
            _ => None,
        }
    }

    /// `Some(code)` when `cond` holds, `None` otherwise.
    pub fn if_true(cond: bool, code: ErrorCode) -> Option<ErrorCode> {
        if cond { Some(code) } else { None }
    }

    /// `Some(code)` when `cond` does *not* hold.
    pub fn if_not(cond: bool, code: ErrorCode) -> Option<ErrorCode> {
        Self::if_true(!cond, code)
    }
}

/// The rich error the pipeline hands back to a cell.
///
/// Combines the mandatory taxonomy code with optional diagnostics:
/// the 1-based parameter index the error is attributed to, the name of
/// the function it originated in and a human explanation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub param_index: Option<u32>,
    pub function_name: Option<String>,
    pub message: Option<String>,
}

impl From<ErrorCode> for ErrorInfo {
    fn from(code: ErrorCode) -> Self {
        Self {
            code,
            param_index: None,
            function_name: None,
            message: None,
        }
    }
}

impl ErrorInfo {
    pub fn new(code: ErrorCode) -> Self {
        code.into()
    }

    /// Attribute the error to a parameter position (1-based).
    pub fn with_param_index(mut self, index: u32) -> Self {
        self.param_index = Some(index);
        self
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Record the originating function. Only the innermost function in a
    /// chain of nested calls tags the error, so a name that is already
    /// present is kept.
    pub fn set_function_name(&mut self, name: &str) {
        if self.function_name.is_none() {
            self.function_name = Some(name.to_string());
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        if let Some(idx) = self.param_index {
            write!(f, " (param {idx})")?;
        }
        if let Some(ref name) = self.function_name {
            write!(f, " [in {name}]")?;
        }
        Ok(())
    }
}

impl Error for ErrorInfo {}

impl From<ErrorInfo> for Value {
    fn from(info: ErrorInfo) -> Self {
        Value::ErrorInfo(Box::new(info))
    }
}

impl From<ErrorCode> for Value {
    fn from(code: ErrorCode) -> Self {
        Value::Error(code)
    }
}

impl PartialEq<str> for ErrorCode {
    fn eq(&self, other: &str) -> bool {
        self.to_string() == other
    }
}

/// Borrowed view of an error carried by a raw [`Value`]: either a bare
/// taxonomy code or a rich [`ErrorInfo`]. The split mirrors the
/// taxonomy's `isError` / `isErrorInfo` distinction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ErrorValue<'a> {
    Code(ErrorCode),
    Info(&'a ErrorInfo),
}

impl ErrorValue<'_> {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Code(code) => *code,
            Self::Info(info) => info.code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_wire_form() {
        assert_eq!(ErrorCode::Args.to_string(), "#ARG_NUM");
        assert_eq!(ErrorCode::Div0.to_string(), "#DIV0");
        assert_eq!(ErrorCode::parse("#arg_num"), Some(ErrorCode::Args));
        assert_eq!(ErrorCode::parse("#NOPE"), None);
    }

    #[test]
    fn predicates() {
        assert_eq!(
            ErrorCode::if_true(true, ErrorCode::Args),
            Some(ErrorCode::Args)
        );
        assert_eq!(ErrorCode::if_true(false, ErrorCode::Args), None);
        assert_eq!(
            ErrorCode::if_not(false, ErrorCode::NoSheet),
            Some(ErrorCode::NoSheet)
        );
        assert_eq!(ErrorCode::if_not(true, ErrorCode::NoSheet), None);
    }

    #[test]
    fn function_name_is_set_once() {
        let mut info = ErrorInfo::new(ErrorCode::Value);
        info.set_function_name("INNER");
        info.set_function_name("OUTER");
        assert_eq!(info.function_name.as_deref(), Some("INNER"));
    }

    #[test]
    fn display_carries_diagnostics() {
        let mut info = ErrorInfo::new(ErrorCode::Args).with_param_index(2);
        info.set_function_name("ADD");
        assert_eq!(info.to_string(), "#ARG_NUM (param 2) [in ADD]");
    }
}
