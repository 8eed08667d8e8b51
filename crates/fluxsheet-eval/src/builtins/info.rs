use fluxsheet_common::Value;
use fluxsheet_machine::Sheet;

use crate::pipeline::Runner;
use crate::term::Term;

/// IFERROR(value, value_on_error) — `value` unless it is an error, the
/// fallback otherwise. `ignore_error` comes first so the mapping stages
/// still run after the error argument is recorded.
pub fn iferror(sheet: &dyn Sheet, terms: &[Term]) -> Value {
    Runner::new(Some(sheet), terms.to_vec(), Some("IFERROR"))
        .ignore_error()
        .with_arg_count(2)
        .map_next_arg(|t, _| t.map(|t| t.value().clone()).unwrap_or(Value::Empty))
        .map_next_arg(|t, _| t.map(|t| t.value().clone()).unwrap_or(Value::Empty))
        .run(|args, error| {
            if error.is_some() || args[0].is_error() {
                args[1].clone()
            } else {
                args[0].clone()
            }
        })
}
