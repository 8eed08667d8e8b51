use fluxsheet_common::Value;
use fluxsheet_machine::Sheet;

use crate::pipeline::Runner;
use crate::term::{self, Term};

/// ADD(a, b) — strict two-argument addition.
pub fn add(sheet: &dyn Sheet, terms: &[Term]) -> Value {
    Runner::new(Some(sheet), terms.to_vec(), Some("ADD"))
        .with_arg_count(2)
        .map_next_arg(|t, _| term::to_number(t))
        .map_next_arg(|t, _| term::to_number(t))
        .run(|args, _| {
            let a = args[0].as_f64().unwrap_or(0.0);
            let b = args[1].as_f64().unwrap_or(0.0);
            Value::Number(a + b)
        })
}

/// SUM(v1, v2, …) — folds all arguments into one number; the first
/// non-numeric argument aborts the fold.
pub fn sum(sheet: &dyn Sheet, terms: &[Term]) -> Value {
    Runner::new(Some(sheet), terms.to_vec(), Some("SUM"))
        .with_min_args(1)
        .map_remaining_args(|rest, _| {
            let mut total = 0.0;
            for t in rest {
                match term::to_number(Some(t)) {
                    Value::Number(n) => total += n,
                    err => return err,
                }
            }
            Value::Number(total)
        })
        .run(|args, _| args[0].clone())
}
