//! Post-parse linking
//!
//! Checks every local call of a unit against the functions it declares and the
//! builtin table. Calls with an `@` target are remote and resolved at run
//! time. Names that are neither declared nor builtin may still arrive through
//! an `include`, so they are left dynamic.

use std::rc::Rc;

use super::{ParseError, Program};
use crate::interpreter::executor::stdlib;
use crate::interpreter::executor::types::ast::{
    Accessor, Call, Expr, FunctionDef, Stmt, StmtRef,
};

/// Check local call arities across the whole unit
pub fn link(program: &Program) -> Result<(), ParseError> {
    let mut stmts = Vec::new();
    each_stmt(&program.body, &mut |s| stmts.push(Rc::clone(s)));

    let mut calls = Vec::new();
    for stmt in &stmts {
        for expr in stmt_exprs(stmt) {
            each_call(expr, &mut |call| calls.push(call.clone()));
        }
    }

    for call in &calls {
        if call.target.is_some() {
            continue;
        }
        let found = call.args.len();
        if let Some(sig) = program.symbols.get(&call.name) {
            if sig.arity != found {
                return Err(arity_error(call, sig.arity.to_string(), found));
            }
        } else if let Some(arity) = stdlib::arity(&call.name) {
            if !arity.accepts(found) {
                return Err(arity_error(call, arity.to_string(), found));
            }
        } else {
            tracing::debug!(
                unit = %program.name,
                function = %call.name,
                line = call.line,
                "call left dynamic, not declared in this unit"
            );
        }
    }

    tracing::debug!(
        unit = %program.name,
        functions = program.symbols.names().count(),
        calls = calls.len(),
        "linked"
    );
    Ok(())
}

fn arity_error(call: &Call, expected: String, found: usize) -> ParseError {
    ParseError {
        line: call.line,
        expected: format!("{} argument(s) for '{}'", expected, call.name),
        found: found.to_string(),
    }
}

/// Every function declaration under `body`, in source order
pub fn declarations(body: &StmtRef) -> Vec<Rc<FunctionDef>> {
    let mut defs = Vec::new();
    each_stmt(body, &mut |s| {
        if let Stmt::Function { def, .. } = s.as_ref() {
            defs.push(Rc::clone(def));
        }
    });
    defs
}

/* ===================== Tree walking ===================== */

/// Visit `stmt` and every statement nested in it, function bodies included
fn each_stmt(stmt: &StmtRef, f: &mut impl FnMut(&StmtRef)) {
    f(stmt);
    match stmt.as_ref() {
        Stmt::Block { body, .. } => {
            for child in body {
                each_stmt(child, f);
            }
        }
        Stmt::Function { def, .. } => each_stmt(&def.body, f),
        Stmt::Condition {
            branches,
            else_branch,
            ..
        } => {
            for branch in branches {
                each_stmt(&branch.body, f);
            }
            if let Some(else_branch) = else_branch {
                each_stmt(&else_branch.body, f);
            }
        }
        Stmt::Cycle { body, .. } | Stmt::DoCycle { body, .. } | Stmt::Retry { body, .. } => {
            each_stmt(body, f)
        }
        Stmt::TryCatch { body, handler, .. } => {
            each_stmt(body, f);
            each_stmt(handler, f);
        }
        Stmt::Assign { .. }
        | Stmt::Const { .. }
        | Stmt::Expr { .. }
        | Stmt::Return { .. }
        | Stmt::Throw { .. }
        | Stmt::Exit { .. }
        | Stmt::Delay { .. }
        | Stmt::Include { .. } => {}
    }
}

/// Expressions owned directly by a statement (not by its children)
fn stmt_exprs(stmt: &Stmt) -> Vec<&Expr> {
    match stmt {
        Stmt::Assign {
            targets, values, ..
        } => {
            let mut exprs: Vec<&Expr> = targets
                .iter()
                .flat_map(|target| &target.path)
                .filter_map(|acc| match acc {
                    Accessor::Index { index } => Some(index),
                    Accessor::Field { .. } => None,
                })
                .collect();
            exprs.extend(values.iter());
            exprs
        }
        Stmt::Const { bindings, .. } => bindings.iter().map(|b| &b.value).collect(),
        Stmt::Delay { seconds, .. } => vec![seconds],
        Stmt::Expr { expr, .. } => vec![expr],
        Stmt::Return { value, .. } => value.iter().collect(),
        Stmt::Throw { value, .. } => vec![value],
        Stmt::Condition { branches, .. } => branches.iter().map(|b| &b.cond).collect(),
        Stmt::Cycle { cond, .. } | Stmt::DoCycle { cond, .. } => vec![cond],
        Stmt::Retry { tries, cond, .. } => vec![tries, cond],
        Stmt::Block { .. }
        | Stmt::Function { .. }
        | Stmt::TryCatch { .. }
        | Stmt::Include { .. }
        | Stmt::Exit { .. } => vec![],
    }
}

fn each_call(expr: &Expr, f: &mut impl FnMut(&Call)) {
    match expr {
        Expr::Ident { .. } | Expr::Lit { .. } => {}
        Expr::Array { items, .. } => {
            for item in items {
                each_call(item, f);
            }
        }
        Expr::Unary { operand, .. } => each_call(operand, f),
        Expr::Binary { left, right, .. } => {
            each_call(left, f);
            each_call(right, f);
        }
        Expr::Index { object, index, .. } => {
            each_call(object, f);
            each_call(index, f);
        }
        Expr::Member { object, .. } => each_call(object, f),
        Expr::Call(call) => {
            f(call);
            for arg in &call.args {
                each_call(arg, f);
            }
            if let Some(target) = &call.target {
                each_call(target, f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::executor::errors::ScriptError;
    use crate::interpreter::parser::{load, parse};

    #[test]
    fn test_forward_and_recursive_calls_link() {
        let source = r#"
            x = twice(2);
            function twice(n) { return n * 2; }
            function fact(n) { if n <= 1 { return 1; } return n * fact(n - 1); }
        "#;
        assert!(load("unit", source).is_ok());
    }

    #[test]
    fn test_arity_mismatch_is_a_parse_error() {
        let source = "function f(a, b) { return a; }\ny = f(1);";
        let Err(ScriptError::Parse(err)) = load("unit", source) else {
            panic!("Expected arity error");
        };
        assert_eq!(err.line, 2);
        assert_eq!(err.expected, "2 argument(s) for 'f'");
        assert_eq!(err.found, "1");
    }

    #[test]
    fn test_builtin_arity_is_checked() {
        let Err(ScriptError::Parse(err)) = load("unit", "n = len(1, 2);") else {
            panic!("Expected arity error");
        };
        assert_eq!(err.expected, "1 argument(s) for 'len'");
        assert!(load("unit", "s = substr('abc', 1); t = substr('abc', 0, 2);").is_ok());
    }

    #[test]
    fn test_remote_and_unknown_calls_are_left_dynamic() {
        assert!(load("unit", r#"a = fetch(1, 2, 3) @ "svc/api"; b = from_lib(1);"#).is_ok());
    }

    #[test]
    fn test_calls_in_new_statement_forms_are_checked() {
        let source = "function f(a) { return a; }\nconst c = f(1, 2);";
        let Err(ScriptError::Parse(err)) = load("unit", source) else {
            panic!("Expected arity error in const");
        };
        assert_eq!(err.line, 2);

        let Err(ScriptError::Parse(err)) = load("unit", "delay len();") else {
            panic!("Expected arity error in delay");
        };
        assert_eq!(err.expected, "1 argument(s) for 'len'");

        let source = "function f(a) { return a; }\nrows = [0];\nx, rows[f()] = 1, 2;";
        assert!(matches!(load("unit", source), Err(ScriptError::Parse(_))));
    }

    #[test]
    fn test_redeclaring_with_another_arity_fails() {
        let source = "function f(a) { return a; }\nfunction f(a, b) { return b; }";
        let Err(ScriptError::Parse(err)) = load("unit", source) else {
            panic!("Expected redeclaration error");
        };
        assert_eq!(err.line, 2);
        assert_eq!(err.expected, "1 parameter(s) for 'f' as declared on line 1");
        assert_eq!(err.found, "2");

        // Same arity: the later body wins
        let source = "function f(a) { return a; }\nfunction f(a) { return a + 1; }\nx = f(1);";
        assert!(load("unit", source).is_ok());
    }

    #[test]
    fn test_declarations_include_nested_functions() {
        let program = parse("if true { function inner() { return 1; } }\nfunction outer() {}")
            .unwrap();
        let names: Vec<String> = program
            .functions()
            .iter()
            .map(|def| def.name.clone())
            .collect();
        assert_eq!(names, vec!["inner", "outer"]);
    }
}
