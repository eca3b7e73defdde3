//! Test helpers for executor tests
//!
//! Common utilities for loading scripts, building scopes and collecting markers

use crate::interpreter::executor::{
    NullResolver, Resolver, Scope, ScopeSettings, ScriptError, StepMarker, Val, Vm,
};
use crate::interpreter::parser::{self, Program};
use std::rc::Rc;
use std::time::Duration;

/// A marker as a plain tuple, for compact assertions
pub type Mark = (usize, Option<Val>, usize);

/// Settings with no pause between retry attempts
pub fn quick_settings() -> ScopeSettings {
    ScopeSettings {
        retry_delay: Duration::ZERO,
        ..ScopeSettings::default()
    }
}

pub fn new_scope() -> Scope {
    Scope::new(Rc::new(NullResolver), quick_settings())
}

pub fn scope_with(resolver: Rc<dyn Resolver>, settings: ScopeSettings) -> Scope {
    Scope::new(resolver, settings)
}

/// Parse and link, serializing the program through JSON on the way
///
/// The round trip checks the AST stays serializable for every test script.
pub fn load(source: &str) -> Program {
    let program = parser::load("test", source).expect("Load script failed");
    let json = serde_json::to_string(&program).expect("Program serialization failed");
    serde_json::from_str(&json).expect("Program deserialization failed")
}

/// Run a script to completion in `scope`
pub fn run_in(source: &str, scope: &mut Scope) -> Result<Val, ScriptError> {
    let program = load(source);
    Vm::from_program(&program, scope).run()
}

/// Run a script in a fresh scope, returning the scope and the outcome
pub fn run(source: &str) -> (Scope, Result<Val, ScriptError>) {
    let mut scope = new_scope();
    let result = run_in(source, &mut scope);
    (scope, result)
}

/// Every marker the script yields, plus the uncaught error if any
pub fn collect_in(source: &str, scope: &mut Scope) -> (Vec<StepMarker>, Option<ScriptError>) {
    let program = load(source);
    let mut markers = Vec::new();
    for item in Vm::from_program(&program, scope) {
        match item {
            Ok(marker) => markers.push(marker),
            Err(err) => return (markers, Some(err)),
        }
    }
    (markers, None)
}

/// Markers of a script that must not fail, as tuples
pub fn marks(source: &str) -> Vec<Mark> {
    let mut scope = new_scope();
    let (markers, err) = collect_in(source, &mut scope);
    assert_eq!(err, None, "script raised");
    markers
        .into_iter()
        .map(|m| (m.line, m.value, m.next_line))
        .collect()
}

pub fn int(n: i64) -> Option<Val> {
    Some(Val::Int(n))
}

pub fn boolean(b: bool) -> Option<Val> {
    Some(Val::Bool(b))
}

pub fn string(s: &str) -> Option<Val> {
    Some(Val::Str(s.to_string()))
}
