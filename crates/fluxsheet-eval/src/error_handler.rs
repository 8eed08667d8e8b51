//! Sticky-first-error accumulator used by the argument pipeline.

use fluxsheet_common::{ErrorCode, ErrorInfo, ErrorValue, Value};

/// Accumulates at most one error (bare code or rich info) together with
/// the argument index it occurred at. Once either error field is set,
/// later updates are no-ops.
#[derive(Debug, Default)]
pub struct ErrorHandler {
    code: Option<ErrorCode>,
    info: Option<ErrorInfo>,
    index: Option<usize>,
    ignore: bool,
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ignore(&mut self, ignore: bool) {
        self.ignore = ignore;
    }

    pub fn ignores_error(&self) -> bool {
        self.ignore
    }

    fn is_set(&self) -> bool {
        self.code.is_some() || self.info.is_some()
    }

    /// Record `raw` if it classifies as an error and none is recorded
    /// yet. `index` is the 0-based argument position, `None` meaning
    /// "no specific argument".
    pub fn update(&mut self, raw: &Value, index: Option<usize>) {
        if self.is_set() {
            return;
        }
        match raw.as_error() {
            Some(ErrorValue::Info(info)) => {
                self.info = Some(info.clone());
                self.index = index;
            }
            Some(ErrorValue::Code(code)) => {
                self.code = Some(code);
                self.index = index;
            }
            None => {}
        }
    }

    /// Record a predicate result (`if_true` / `if_not` outcome).
    pub fn update_code(&mut self, code: Option<ErrorCode>, index: Option<usize>) {
        if self.is_set() {
            return;
        }
        if let Some(code) = code {
            self.code = Some(code);
            self.index = index;
        }
    }

    /// True iff an error is recorded and not ignored.
    pub fn has_error(&self) -> bool {
        self.is_set() && !self.ignore
    }

    /// The recorded error as rich info: a rich error verbatim, a bare
    /// code synthesized with its 1-based parameter index attached.
    pub fn get_error(&self) -> Option<ErrorInfo> {
        if let Some(info) = &self.info {
            return Some(info.clone());
        }
        let code = self.code?;
        let info = ErrorInfo::new(code);
        match self.index {
            Some(index) => Some(info.with_param_index(index as u32 + 1)),
            None => Some(info),
        }
    }
}
