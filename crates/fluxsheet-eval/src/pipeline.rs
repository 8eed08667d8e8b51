//! The argument pipeline every built-in function runs through.
//!
//! A [`Runner`] consumes an ordered list of unevaluated terms, applies a
//! sequence of mapping/validation stages and terminates by either
//! invoking the wrapped function body or returning the first recorded
//! error. Stages take and return the pipeline by value, so the state
//! threads explicitly through each transition and short-circuiting is a
//! plain early return at the top of every stage.

use std::collections::VecDeque;

use smallvec::SmallVec;

use fluxsheet_common::{ErrorCode, ErrorInfo, Value};
use fluxsheet_machine::Sheet;

use crate::error_handler::ErrorHandler;
use crate::term::Term;

pub struct Runner<'a> {
    sheet: Option<&'a dyn Sheet>,
    function_name: Option<&'a str>,
    /// Remaining unevaluated terms; shrinks as stages consume them.
    args: VecDeque<Term>,
    /// Mapped values; append-only except `remap_prev_arg` and `reduce`.
    mapped: SmallVec<[Value; 4]>,
    index: usize,
    prev_arg: Option<Term>,
    prev_index: Option<usize>,
    enabled: bool,
    default_return: Value,
    handler: ErrorHandler,
}

impl<'a> Runner<'a> {
    /// Build a pipeline over an owned copy of `terms`. A missing sheet
    /// is recorded as an `#ARG_NUM` candidate error right away.
    pub fn new(sheet: Option<&'a dyn Sheet>, terms: Vec<Term>, function_name: Option<&'a str>) -> Self {
        let mut handler = ErrorHandler::new();
        handler.update_code(ErrorCode::if_not(sheet.is_some(), ErrorCode::Args), None);
        Self {
            sheet,
            function_name,
            args: terms.into(),
            mapped: SmallVec::new(),
            index: 0,
            prev_arg: None,
            prev_index: None,
            enabled: true,
            default_return: Value::Bool(true),
            handler,
        }
    }

    /// A recorded error no longer aborts `run`; the wrapped function
    /// receives it as its trailing parameter instead. Call this before
    /// the mapping stages, otherwise a recorded error has already
    /// short-circuited them.
    pub fn ignore_error(mut self) -> Self {
        self.handler.set_ignore(true);
        self
    }

    /// Disable execution unless the sheet is actively processing; used
    /// by functions that must be no-ops outside of a recalculation.
    pub fn on_sheet_calculation(mut self) -> Self {
        self.enabled =
            !self.handler.has_error() && self.sheet.is_some_and(|sheet| sheet.is_processing());
        self
    }

    pub fn with_arg_count(mut self, count: usize) -> Self {
        self.handler
            .update_code(ErrorCode::if_true(self.args.len() != count, ErrorCode::Args), None);
        self
    }

    pub fn with_min_args(mut self, min: usize) -> Self {
        self.handler
            .update_code(ErrorCode::if_true(self.args.len() < min, ErrorCode::Args), None);
        self
    }

    pub fn with_max_args(mut self, max: usize) -> Self {
        self.handler
            .update_code(ErrorCode::if_true(self.args.len() > max, ErrorCode::Args), None);
        self
    }

    /// Append a derived value without consuming an argument, e.g. a
    /// piece of implicit sheet context. Errors record without an index.
    pub fn add_mapped_arg<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&[Value]) -> Value,
    {
        if self.handler.has_error() {
            return self;
        }
        let res = f(&self.mapped);
        self.handler.update(&res, None);
        self.mapped.push(res);
        self
    }

    /// Pop the next term from the front of the remaining queue and map
    /// it. A failure is attributed to the current argument position.
    pub fn map_next_arg<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Option<&Term>, &[Value]) -> Value,
    {
        if self.handler.has_error() {
            return self;
        }
        let term = self.args.pop_front();
        let res = f(term.as_ref(), &self.mapped);
        self.handler.update(&res, Some(self.index));
        self.mapped.push(res);
        self.prev_arg = term;
        self.prev_index = Some(self.index);
        self.index += 1;
        self
    }

    /// Re-derive the most recently mapped value from the last consumed
    /// term, replacing it in place. No-op before any `map_next_arg`.
    pub fn remap_prev_arg<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Term, Value, &[Value]) -> Value,
    {
        if self.handler.has_error() {
            return self;
        }
        let Some(term) = self.prev_arg.take() else {
            return self;
        };
        // the term's own position, not the running counter: map_arg_at
        // may have reset the counter since the term was consumed
        let last = self.mapped.pop().unwrap_or(Value::Empty);
        let res = f(&term, last, &self.mapped);
        self.handler.update(&res, self.prev_index);
        self.mapped.push(res);
        self.prev_arg = Some(term);
        self
    }

    /// Remove the term at `index` (not necessarily the front) and map
    /// it. The error index is set to `index` directly; this does not
    /// advance the counter `map_next_arg` uses, the caller owns the
    /// bookkeeping when mixing both.
    pub fn map_arg_at<F>(mut self, index: usize, f: F) -> Self
    where
        F: FnOnce(Option<&Term>, &[Value]) -> Value,
    {
        if self.handler.has_error() {
            return self;
        }
        let term = self.args.remove(index);
        let res = f(term.as_ref(), &self.mapped);
        self.handler.update(&res, Some(index));
        self.mapped.push(res);
        self.index = index;
        self
    }

    /// Hand the whole remaining queue plus the mapped values to `f` and
    /// append its result. The queue itself is left untouched.
    pub fn map_remaining_args<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&[Term], &[Value]) -> Value,
    {
        if self.handler.has_error() {
            return self;
        }
        let res = f(self.args.make_contiguous(), &self.mapped);
        self.handler.update(&res, None);
        self.mapped.push(res);
        self
    }

    /// Collapse the mapped values to a single aggregate. Terminates the
    /// mapping phase; later consuming stages see a one-element sequence.
    pub fn reduce<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&[Value]) -> Value,
    {
        if self.handler.has_error() {
            return self;
        }
        let res = f(&self.mapped);
        self.handler.update(&res, None);
        self.mapped.clear();
        self.mapped.push(res);
        self
    }

    /// Side-effect-free check over the mapped values; an error result is
    /// recorded, the values stay as they are.
    pub fn before_run<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&[Value]) -> Option<Value>,
    {
        if self.handler.has_error() {
            return self;
        }
        if let Some(res) = f(&self.mapped) {
            self.handler.update(&res, None);
        }
        self
    }

    /// Alias of [`Runner::before_run`].
    pub fn validate<F>(self, f: F) -> Self
    where
        F: FnOnce(&[Value]) -> Option<Value>,
    {
        self.before_run(f)
    }

    /// The value `run` returns when execution is disabled. `None` from
    /// the closure defaults to `TRUE`.
    pub fn default_return_value<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&[Value]) -> Option<Value>,
    {
        self.default_return = f(&self.mapped).unwrap_or(Value::Bool(true));
        self
    }

    /// Terminal operation: surface the first recorded error tagged with
    /// the function name, or invoke `f` with the mapped values and the
    /// (possibly ignored) error.
    pub fn run<F>(self, f: F) -> Value
    where
        F: FnOnce(&[Value], Option<&ErrorInfo>) -> Value,
    {
        let error = self.handler.get_error();
        if let Some(error) = &error {
            if !self.handler.ignores_error() {
                return self.tagged(error.clone());
            }
        }
        if self.enabled {
            return match f(&self.mapped, error.as_ref()) {
                Value::ErrorInfo(info) => self.tagged(*info),
                res => res,
            };
        }
        self.default_return
    }

    fn tagged(&self, mut error: ErrorInfo) -> Value {
        if let Some(name) = self.function_name {
            error.set_function_name(name);
        }
        Value::from(error)
    }
}
