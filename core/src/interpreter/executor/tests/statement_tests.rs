//! Tests for const, exit, delay and multiple assignment

use super::helpers::{int, marks, quick_settings, run, run_in, scope_with};
use crate::interpreter::executor::{NullResolver, ScopeSettings, ScriptError, Val};
use std::rc::Rc;
use std::time::{Duration, Instant};

fn list(items: &[i64]) -> Option<Val> {
    Some(Val::List(items.iter().map(|&n| Val::Int(n)).collect()))
}

/* ===================== Multiple assignment ===================== */

#[test]
fn test_multi_assignment_swaps() {
    assert_eq!(
        marks("a, b = 1, 2;\na, b = b, a;"),
        vec![(1, list(&[1, 2]), 2), (2, list(&[2, 1]), 2)]
    );

    let (scope, result) = run("a, b = 1, 2;\na, b = b, a;");
    assert!(result.is_ok());
    assert_eq!(scope.get("a"), Val::Int(2));
    assert_eq!(scope.get("b"), Val::Int(1));
}

#[test]
fn test_multi_assignment_into_paths() {
    let (scope, result) = run("row = [0, 0];\nrow[0], row[1] = 3, 4;\nvar p, q;");
    assert!(result.is_ok());
    assert_eq!(scope.get("row"), Val::List(vec![Val::Int(3), Val::Int(4)]));
    assert_eq!(scope.lookup("p"), Some(Val::Null));
    assert_eq!(scope.lookup("q"), Some(Val::Null));
}

/* ===================== Constants ===================== */

#[test]
fn test_const_defines_values() {
    assert_eq!(
        marks("const a = 1, b = 2;\nconst c = a + b;"),
        vec![(1, list(&[1, 2]), 2), (2, int(3), 2)]
    );
}

#[test]
fn test_assigning_a_constant_fails() {
    let (scope, result) = run("const limit = 3;\nlimit = 4;");
    assert_eq!(
        result.unwrap_err(),
        ScriptError::runtime(2, "cannot assign to constant 'limit'")
    );
    assert_eq!(scope.get("limit"), Val::Int(3));

    let (_, result) = run("const xs = [1];\nxs[0] = 2;");
    assert_eq!(
        result.unwrap_err(),
        ScriptError::runtime(2, "cannot assign to constant 'xs'")
    );
}

#[test]
fn test_redefining_a_constant_fails() {
    let (_, result) = run("const a = 1;\nconst a = 2;");
    assert_eq!(
        result.unwrap_err(),
        ScriptError::runtime(2, "constant 'a' is already defined")
    );
}

#[test]
fn test_function_locals_may_shadow_a_constant() {
    let source = r#"const n = 1;
function f() {
    n = 2;
    return n;
}
r = f();"#;

    let (scope, result) = run(source);
    assert!(result.is_ok());
    assert_eq!(scope.get("r"), Val::Int(2));
    assert_eq!(scope.get("n"), Val::Int(1));
}

/* ===================== Exit ===================== */

#[test]
fn test_exit_stops_the_program() {
    assert_eq!(
        marks("a = 1;\nexit;\nb = 2;"),
        vec![(1, int(1), 2), (2, None, 2)]
    );
}

#[test]
fn test_exit_inside_a_function_ends_the_caller() {
    let source = r#"a = 1;
function stop() {
    exit;
}
stop();
b = 2;"#;

    let (scope, result) = run(source);
    assert_eq!(result, Ok(Val::Null));
    assert_eq!(scope.get("a"), Val::Int(1));
    assert_eq!(scope.lookup("b"), None);
}

#[test]
fn test_exit_is_not_caught() {
    let source = r#"function stop() { exit; }
try {
    exit;
} catch {
    caught = 1;
}
after = 1;"#;
    let (scope, result) = run(source);
    assert!(result.is_ok());
    assert_eq!(scope.lookup("caught"), None);
    assert_eq!(scope.lookup("after"), None);

    let source = r#"function stop() { exit; }
retry 3 {
    tries = 1;
    stop();
} while true;
after = 1;"#;
    let (scope, result) = run(source);
    assert!(result.is_ok());
    assert_eq!(scope.get("tries"), Val::Int(1));
    assert_eq!(scope.lookup("after"), None);
}

/* ===================== Delay ===================== */

#[test]
fn test_delay_sleeps_for_the_scaled_time() {
    let settings = ScopeSettings {
        delay_scale: 0.5,
        ..quick_settings()
    };
    let mut scope = scope_with(Rc::new(NullResolver), settings);

    let started = Instant::now();
    run_in("delay 0.1;\nafter = 1;", &mut scope).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(scope.get("after"), Val::Int(1));
}

#[test]
fn test_delay_marker_reports_the_seconds() {
    let settings = ScopeSettings {
        delay_scale: 0.0,
        ..quick_settings()
    };
    let mut scope = scope_with(Rc::new(NullResolver), settings);
    let (markers, err) = super::helpers::collect_in("delay 30;\nx = 1;", &mut scope);
    assert_eq!(err, None);
    assert_eq!(markers[0].line, 1);
    assert_eq!(markers[0].value, Some(Val::Int(30)));
    assert_eq!(markers[0].next_line, 2);
}

#[test]
fn test_delay_needs_a_non_negative_number() {
    let (_, result) = run("delay -1;");
    assert_eq!(
        result.unwrap_err(),
        ScriptError::runtime(1, "delay needs a non-negative number of seconds, got -1")
    );

    let (_, result) = run("delay \"soon\";");
    assert_eq!(result.unwrap_err().line(), Some(1));
}
