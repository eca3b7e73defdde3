//! Tests for include

use super::helpers::{collect_in, int, quick_settings, run, run_in, scope_with, string, Mark};
use crate::interpreter::executor::{
    NullResolver, Scope, ScopeSettings, ScriptError, StaticResolver, Val,
};
use std::rc::Rc;

fn served(modules: &[(&str, &str)]) -> Scope {
    let resolver = modules
        .iter()
        .fold(StaticResolver::new(), |r, (name, source)| r.module(name, source));
    scope_with(Rc::new(resolver), quick_settings())
}

#[test]
fn test_included_variables_are_visible() {
    let source = "include \"lib\";\ny = x + 1;";
    let mut scope = served(&[("lib", "x = 1;")]);

    let (markers, err) = collect_in(source, &mut scope);
    assert_eq!(err, None);
    let marks: Vec<Mark> = markers
        .into_iter()
        .map(|m| (m.line, m.value, m.next_line))
        .collect();
    assert_eq!(
        marks,
        vec![(1, string("lib"), 1), (1, int(1), 1), (1, None, 2), (2, int(2), 2)]
    );
    assert_eq!(scope.get("x"), Val::Int(1));
    assert_eq!(scope.get("y"), Val::Int(2));
}

#[test]
fn test_included_functions_are_callable() {
    let module = r#"
function twice(v) {
    return v * 2;
}
"#;
    let mut scope = served(&[("helpers", module)]);

    run_in("include \"helpers\";\nr = twice(21);", &mut scope).unwrap();
    assert_eq!(scope.get("r"), Val::Int(42));
}

#[test]
fn test_include_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("common.wf"), "greeting = \"hello\";\n").unwrap();

    let settings = ScopeSettings {
        include_dir: dir.path().to_path_buf(),
        ..quick_settings()
    };
    let mut scope = scope_with(Rc::new(NullResolver), settings);

    run_in("include \"common\";\nmessage = greeting + \" world\";", &mut scope).unwrap();
    assert_eq!(scope.get("message"), Val::Str("hello world".to_string()));
}

#[test]
fn test_include_extension_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("shared.flow"), "n = 7;").unwrap();

    let settings = ScopeSettings {
        include_dir: dir.path().to_path_buf(),
        include_extension: "flow".to_string(),
        ..quick_settings()
    };
    let mut scope = scope_with(Rc::new(NullResolver), settings);

    run_in("include \"shared\";", &mut scope).unwrap();
    assert_eq!(scope.get("n"), Val::Int(7));
}

#[test]
fn test_missing_module_raises_include_error() {
    let (_, result) = run("include \"does_not_exist_anywhere\";");
    match result {
        Err(ScriptError::Include(err)) => assert_eq!(err.module, "does_not_exist_anywhere"),
        other => panic!("expected an include error, got {:?}", other),
    }
}

#[test]
fn test_include_errors_are_catchable() {
    let source = r#"
try {
    include "does_not_exist_anywhere";
} catch {
    failed = true;
    message = __error;
}
"#;

    let (scope, result) = run(source);
    assert!(result.is_ok());
    assert_eq!(scope.get("failed"), Val::Bool(true));
    let Val::Str(message) = scope.get("message") else {
        panic!("message should be a string");
    };
    assert!(message.starts_with("cannot include module `does_not_exist_anywhere`"));
}

#[test]
fn test_module_parse_error_raised_at_include_site() {
    let mut scope = served(&[("broken", "x = ;")]);

    let err = run_in("a = 1;\ninclude \"broken\";", &mut scope).unwrap_err();
    assert!(matches!(err, ScriptError::Parse(_)));
    assert_eq!(scope.get("a"), Val::Int(1));
}

#[test]
fn test_resolver_takes_priority_over_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("lib.wf"), "source = \"disk\";").unwrap();

    let settings = ScopeSettings {
        include_dir: dir.path().to_path_buf(),
        ..quick_settings()
    };
    let resolver = StaticResolver::new().module("lib", "source = \"resolver\";");
    let mut scope = scope_with(Rc::new(resolver), settings);

    run_in("include \"lib\";", &mut scope).unwrap();
    assert_eq!(scope.get("source"), Val::Str("resolver".to_string()));
}

#[test]
fn test_self_include_hits_the_depth_limit() {
    let settings = ScopeSettings {
        max_call_depth: 16,
        ..quick_settings()
    };
    let resolver = StaticResolver::new().module("loop", "include \"loop\";");
    let mut scope = scope_with(Rc::new(resolver), settings);

    let err = run_in("include \"loop\";", &mut scope).unwrap_err();
    let ScriptError::Include(err) = err else {
        panic!("Expected include error, got {:?}", err);
    };
    assert_eq!(err.module, "loop");
    assert_eq!(err.cause, "include depth limit (16) reached");
}

#[test]
fn test_include_depth_error_is_catchable() {
    let mut scope = served(&[("loop", "include \"loop\";")]);

    let source = "try {\n    include \"loop\";\n} catch {\n    caught = true;\n}";
    run_in(source, &mut scope).unwrap();
    assert_eq!(scope.get("caught"), Val::Bool(true));
}

#[test]
fn test_recursive_include_that_terminates() {
    let module = "n = n - 1;\nif n > 0 { include \"countdown\"; }";
    let mut scope = served(&[("countdown", module)]);

    run_in("n = 5;\ninclude \"countdown\";", &mut scope).unwrap();
    assert_eq!(scope.get("n"), Val::Int(0));
}
