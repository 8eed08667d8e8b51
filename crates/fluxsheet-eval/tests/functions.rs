//! Registered built-ins driven end to end against a test streamsheet.

use fluxsheet_common::{ErrorCode, Value};
use fluxsheet_eval::{Term, builtins, function_registry};
use fluxsheet_machine::Streamsheet;
use fluxsheet_machine::test_streamsheet::TestStreamsheet;

fn terms(values: &[Value]) -> Vec<Term> {
    values.iter().cloned().map(Term::from).collect()
}

#[test]
fn registered_builtins_resolve_and_run() {
    builtins::install();
    let ss = TestStreamsheet::new();

    let add = function_registry::get("add").expect("ADD registered");
    assert_eq!(
        add(ss.sheet(), &terms(&[Value::Int(2), Value::Int(3)])),
        Value::Number(5.0)
    );

    let sum = function_registry::get("SUM").expect("SUM registered");
    assert_eq!(
        sum(
            ss.sheet(),
            &terms(&[Value::Int(1), Value::Int(2), Value::Int(3)])
        ),
        Value::Number(6.0)
    );

    assert!(function_registry::get("NOSUCHFN").is_none());
}

#[test]
fn failed_evaluation_yields_tagged_error_value() {
    builtins::install();
    let ss = TestStreamsheet::new();

    let add = function_registry::get("ADD").expect("ADD registered");
    let result = add(ss.sheet(), &terms(&[Value::Int(1)]));
    match result {
        Value::ErrorInfo(info) => {
            assert_eq!(info.code, ErrorCode::Args);
            assert_eq!(info.param_index, None);
            assert_eq!(info.function_name.as_deref(), Some("ADD"));
        }
        other => panic!("expected an error value, got {other:?}"),
    }
}

#[test]
fn iferror_degrades_instead_of_propagating() {
    builtins::install();
    let ss = TestStreamsheet::new();

    let iferror = function_registry::get("IFERROR").expect("IFERROR registered");
    let result = iferror(
        ss.sheet(),
        &terms(&[Value::Error(ErrorCode::Na), Value::Int(0)]),
    );
    assert_eq!(result, Value::Int(0));
}
