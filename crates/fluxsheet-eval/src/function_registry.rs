//! Global registry of built-in sheet functions.

use dashmap::DashMap;
use once_cell::sync::Lazy;

use fluxsheet_common::Value;
use fluxsheet_machine::Sheet;

use crate::term::Term;

/// A built-in sheet function: raw terms in, value-or-error out.
pub type SheetFunction = fn(&dyn Sheet, &[Term]) -> Value;

static REG: Lazy<DashMap<String, SheetFunction>> = Lazy::new(DashMap::new);

/// Names are stored uppercased, so registration is case-insensitive too.
pub fn register(name: &str, f: SheetFunction) {
    REG.insert(name.to_ascii_uppercase(), f);
}

/// Case-insensitive lookup by function name.
pub fn get(name: &str) -> Option<SheetFunction> {
    let key = name.to_ascii_uppercase();
    REG.get(key.as_str()).map(|f| *f.value())
}
