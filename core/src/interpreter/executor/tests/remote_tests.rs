//! Tests for remote calls through the resolver

use super::helpers::{quick_settings, run, run_in, scope_with};
use crate::interpreter::executor::{
    MockResolver, NativeFn, Resolver, StaticResolver, Val,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[test]
fn test_remote_call_goes_through_resolver() {
    let resolver = StaticResolver::new().service("billing", "Invoices", "total", |args| {
        let sum = args.iter().filter_map(|a| a.as_f64()).sum::<f64>();
        Ok(Val::Float(sum))
    });
    let mut scope = scope_with(Rc::new(resolver), quick_settings());

    run_in("t = total(1.5, 2) @ \"billing/Invoices\";", &mut scope).unwrap();
    assert_eq!(scope.get("t"), Val::Float(3.5));
}

#[test]
fn test_target_without_slash_has_empty_interface() {
    let resolver = StaticResolver::new().service("clock", "", "tick", |_| Ok(Val::Int(1)));
    let mut scope = scope_with(Rc::new(resolver), quick_settings());

    run_in("t = tick() @ \"clock\";", &mut scope).unwrap();
    assert_eq!(scope.get("t"), Val::Int(1));
}

#[test]
fn test_target_splits_at_last_slash() {
    let resolver =
        StaticResolver::new().service("org/billing", "Invoices", "open", |_| Ok(Val::Bool(true)));
    let mut scope = scope_with(Rc::new(resolver), quick_settings());

    run_in("svc = \"org/billing\";\nok = open() @ (svc + \"/Invoices\");", &mut scope).unwrap();
    assert_eq!(scope.get("ok"), Val::Bool(true));
}

#[test]
fn test_unresolved_remote_call_fails() {
    let (_, result) = run("t = total() @ \"billing/Invoices\";");
    let err = result.unwrap_err();
    assert_eq!(err.line(), Some(1));
    assert_eq!(err.message(), "no resolver configured for billing/Invoices/total");
}

#[test]
fn test_remote_errors_propagate_unchanged() {
    let resolver = StaticResolver::new().service("billing", "Invoices", "charge", |_| {
        Err("card declined".to_string())
    });
    let mut scope = scope_with(Rc::new(resolver), quick_settings());

    let source = r#"
try {
    charge(100) @ "billing/Invoices";
} catch {
    reason = __error;
}
"#;
    run_in(source, &mut scope).unwrap();
    assert_eq!(scope.get("reason"), Val::Str("card declined".to_string()));
}

/// Counts resolutions and records the arguments of every call
struct CountingResolver {
    resolved: Cell<usize>,
    calls: Rc<RefCell<Vec<Vec<Val>>>>,
}

impl Resolver for CountingResolver {
    fn resolve_callable(
        &self,
        _service: &str,
        _interface: &str,
        _method: &str,
    ) -> Result<NativeFn, String> {
        self.resolved.set(self.resolved.get() + 1);
        let calls = Rc::clone(&self.calls);
        Ok(Rc::new(move |args: &[Val]| -> Result<Val, String> {
            calls.borrow_mut().push(args.to_vec());
            Ok(Val::Null)
        }))
    }
}

#[test]
fn test_remote_callables_are_cached() {
    let resolver = Rc::new(CountingResolver {
        resolved: Cell::new(0),
        calls: Rc::new(RefCell::new(Vec::new())),
    });
    let mut scope = scope_with(resolver.clone(), quick_settings());

    let source = r#"
i = 0;
while i < 3 {
    notify(i, [i, "x"]) @ "mail/Outbox";
    i = i + 1;
}
"#;
    run_in(source, &mut scope).unwrap();

    assert_eq!(resolver.resolved.get(), 1);
    let calls = resolver.calls.borrow();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[2],
        vec![
            Val::Int(2),
            Val::List(vec![Val::Int(2), Val::Str("x".to_string())])
        ]
    );
}

#[test]
fn test_mock_resolver_answers_remote_calls() {
    let resolver = MockResolver::from_json_str(
        r#"{
            "inventory/Stock/count": 12,
            "lookup": {"sku": "A-1"},
            "modules": {"setup": "ready = true;"}
        }"#,
    )
    .unwrap();
    let mut scope = scope_with(Rc::new(resolver), quick_settings());

    let source = r#"
include "setup";
n = count("A-1") @ "inventory/Stock";
item = lookup() @ "catalog/Items";
"#;
    run_in(source, &mut scope).unwrap();
    assert_eq!(scope.get("ready"), Val::Bool(true));
    assert_eq!(scope.get("n"), Val::Int(12));
    assert_eq!(scope.get("item").to_json(), serde_json::json!({"sku": "A-1"}));
}
