//! Expression evaluation
//!
//! Expressions evaluate to a value in one go. Calls to user functions run the
//! function body to completion on a nested VM, so an expression never
//! suspends halfway.

use super::errors::ScriptError;
use super::exec_loop::run_until_done;
use super::registry::{Callable, NativeFn, RemoteKey};
use super::scope::{Scope, RETURN_SLOT};
use super::stdlib;
use super::types::{BinaryOp, Call, CastKind, Expr, FunctionDef, Node, UnaryOp, Val};
use super::vm::Vm;
use std::rc::Rc;

/* ===================== Visiting ===================== */

/// Result of visiting a node
///
/// Expressions produce a value; statements produce a step sequence.
pub enum EvalResult<'s> {
    Value(Val),
    Steps(Vm<'s>),
}

/// Visit any node against `scope`
pub fn visit<'s>(node: &Node, scope: &'s mut Scope) -> Result<EvalResult<'s>, ScriptError> {
    match node {
        Node::Expr(expr) => eval_expr(expr, scope).map(EvalResult::Value),
        Node::Stmt(stmt) => Ok(EvalResult::Steps(Vm::new(Rc::clone(stmt), scope))),
    }
}

/* ===================== Expressions ===================== */

/// Evaluate an expression to a value
pub fn eval_expr(expr: &Expr, scope: &mut Scope) -> Result<Val, ScriptError> {
    match expr {
        Expr::Ident { name, .. } => Ok(scope.get(name)),

        Expr::Lit { value, .. } => Ok(value.clone()),

        Expr::Array { items, .. } => {
            let vals = items
                .iter()
                .map(|item| eval_expr(item, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Val::List(vals))
        }

        Expr::Unary { op, operand, line } => {
            let val = eval_expr(operand, scope)?;
            eval_unary(*op, val, *line)
        }

        // Short-circuit: the right side runs only when it decides the result
        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
            ..
        } => {
            let lhs = eval_expr(left, scope)?;
            if !lhs.is_truthy() {
                return Ok(Val::Bool(false));
            }
            Ok(Val::Bool(eval_expr(right, scope)?.is_truthy()))
        }

        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
            ..
        } => {
            let lhs = eval_expr(left, scope)?;
            if lhs.is_truthy() {
                return Ok(Val::Bool(true));
            }
            Ok(Val::Bool(eval_expr(right, scope)?.is_truthy()))
        }

        Expr::Binary {
            op,
            left,
            right,
            line,
        } => {
            let lhs = eval_expr(left, scope)?;
            let rhs = eval_expr(right, scope)?;
            eval_binary(*op, lhs, rhs, *line)
        }

        Expr::Index {
            object,
            index,
            line,
        } => {
            let obj = eval_expr(object, scope)?;
            let idx = eval_expr(index, scope)?;
            index_value(&obj, &idx, *line)
        }

        Expr::Member {
            object,
            property,
            line,
        } => match eval_expr(object, scope)? {
            Val::Obj(map) => Ok(map.get(property).cloned().unwrap_or(Val::Null)),
            Val::Null => Ok(Val::Null),
            other => Err(ScriptError::runtime(
                *line,
                format!("cannot read field '{}' of {}", property, other.type_name()),
            )),
        },

        Expr::Call(call) => eval_call(call, scope),
    }
}

fn eval_unary(op: UnaryOp, val: Val, line: usize) -> Result<Val, ScriptError> {
    match (op, val) {
        (UnaryOp::Not, val) => Ok(Val::Bool(!val.is_truthy())),
        (UnaryOp::Neg, Val::Int(i)) => i
            .checked_neg()
            .map(Val::Int)
            .ok_or_else(|| ScriptError::runtime(line, "integer overflow")),
        (UnaryOp::Neg, Val::Float(x)) => Ok(Val::Float(-x)),
        (UnaryOp::Plus, val @ (Val::Int(_) | Val::Float(_))) => Ok(val),
        (UnaryOp::Neg | UnaryOp::Plus, other) => Err(ScriptError::runtime(
            line,
            format!("unary operator needs a number, got {}", other.type_name()),
        )),
        (UnaryOp::Cast(kind), val) => cast(kind, val, line),
    }
}

/// `(int) x`, `(float) x`, `(string) x`, `(bool) x`
fn cast(kind: CastKind, val: Val, line: usize) -> Result<Val, ScriptError> {
    let fail = |val: &Val, to: &str| {
        ScriptError::runtime(line, format!("cannot convert {} '{}' to {}", val.type_name(), val, to))
    };
    match kind {
        CastKind::Str => Ok(Val::Str(val.to_string())),
        CastKind::Bool => Ok(Val::Bool(val.is_truthy())),
        CastKind::Int => match &val {
            Val::Null => Ok(Val::Int(0)),
            Val::Bool(b) => Ok(Val::Int(i64::from(*b))),
            Val::Int(i) => Ok(Val::Int(*i)),
            Val::Float(x) if x.is_finite() => Ok(Val::Int(x.trunc() as i64)),
            Val::Str(s) => s.trim().parse().map(Val::Int).map_err(|_| fail(&val, "int")),
            _ => Err(fail(&val, "int")),
        },
        CastKind::Float => match &val {
            Val::Null => Ok(Val::Float(0.0)),
            Val::Bool(b) => Ok(Val::Float(if *b { 1.0 } else { 0.0 })),
            Val::Int(i) => Ok(Val::Float(*i as f64)),
            Val::Float(x) => Ok(Val::Float(*x)),
            Val::Str(s) => s
                .trim()
                .parse()
                .map(Val::Float)
                .map_err(|_| fail(&val, "float")),
            _ => Err(fail(&val, "float")),
        },
    }
}

fn eval_binary(op: BinaryOp, lhs: Val, rhs: Val, line: usize) -> Result<Val, ScriptError> {
    let type_error = |lhs: &Val, rhs: &Val| {
        ScriptError::runtime(
            line,
            format!(
                "cannot apply '{}' to {} and {}",
                op.symbol(),
                lhs.type_name(),
                rhs.type_name()
            ),
        )
    };
    let overflow = || ScriptError::runtime(line, "integer overflow");

    match op {
        BinaryOp::Eq => Ok(Val::Bool(lhs.loose_eq(&rhs))),
        BinaryOp::Ne => Ok(Val::Bool(!lhs.loose_eq(&rhs))),

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ord = lhs.compare(&rhs).ok_or_else(|| type_error(&lhs, &rhs))?;
            let result = match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Le => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            };
            Ok(Val::Bool(result))
        }

        BinaryOp::Add => match (&lhs, &rhs) {
            (Val::Int(a), Val::Int(b)) => a.checked_add(*b).map(Val::Int).ok_or_else(overflow),
            (Val::Str(_), _) | (_, Val::Str(_)) => Ok(Val::Str(format!("{}{}", lhs, rhs))),
            (Val::List(a), Val::List(b)) => {
                Ok(Val::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => float_op(&lhs, &rhs, |a, b| a + b).ok_or_else(|| type_error(&lhs, &rhs)),
        },

        BinaryOp::Sub => match (&lhs, &rhs) {
            (Val::Int(a), Val::Int(b)) => a.checked_sub(*b).map(Val::Int).ok_or_else(overflow),
            _ => float_op(&lhs, &rhs, |a, b| a - b).ok_or_else(|| type_error(&lhs, &rhs)),
        },

        BinaryOp::Mul => match (&lhs, &rhs) {
            (Val::Int(a), Val::Int(b)) => a.checked_mul(*b).map(Val::Int).ok_or_else(overflow),
            _ => float_op(&lhs, &rhs, |a, b| a * b).ok_or_else(|| type_error(&lhs, &rhs)),
        },

        BinaryOp::Div => {
            if rhs.is_number() && rhs.as_f64() == Some(0.0) {
                return Err(ScriptError::runtime(line, "division by zero"));
            }
            match (&lhs, &rhs) {
                (Val::Int(a), Val::Int(b)) if a.checked_rem(*b) == Some(0) => {
                    a.checked_div(*b).map(Val::Int).ok_or_else(overflow)
                }
                _ => float_op(&lhs, &rhs, |a, b| a / b).ok_or_else(|| type_error(&lhs, &rhs)),
            }
        }

        BinaryOp::Mod => {
            if rhs.is_number() && rhs.as_f64() == Some(0.0) {
                return Err(ScriptError::runtime(line, "modulo by zero"));
            }
            match (&lhs, &rhs) {
                (Val::Int(a), Val::Int(b)) => a.checked_rem(*b).map(Val::Int).ok_or_else(overflow),
                _ => float_op(&lhs, &rhs, |a, b| a % b).ok_or_else(|| type_error(&lhs, &rhs)),
            }
        }

        BinaryOp::And | BinaryOp::Or => Ok(Val::Bool(match op {
            BinaryOp::And => lhs.is_truthy() && rhs.is_truthy(),
            _ => lhs.is_truthy() || rhs.is_truthy(),
        })),
    }
}

/// Apply a numeric operator in floating point; `None` if either side is not a number
fn float_op(lhs: &Val, rhs: &Val, f: impl Fn(f64, f64) -> f64) -> Option<Val> {
    Some(Val::Float(f(lhs.as_f64()?, rhs.as_f64()?)))
}

/// Position of list index `i` (negative counts from the end), if in range
pub(crate) fn list_index(i: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let idx = if i < 0 { len + i } else { i };
    if (0..len).contains(&idx) {
        usize::try_from(idx).ok()
    } else {
        None
    }
}

fn index_value(obj: &Val, idx: &Val, line: usize) -> Result<Val, ScriptError> {
    match (obj, idx) {
        (Val::List(items), Val::Int(i)) => Ok(list_index(*i, items.len())
            .map(|n| items[n].clone())
            .unwrap_or(Val::Null)),
        (Val::Obj(map), Val::Str(key)) => Ok(map.get(key).cloned().unwrap_or(Val::Null)),
        (Val::Str(s), Val::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(list_index(*i, chars.len())
                .map(|n| Val::Str(chars[n].to_string()))
                .unwrap_or(Val::Null))
        }
        (Val::Null, _) => Ok(Val::Null),
        (obj, idx) => Err(ScriptError::runtime(
            line,
            format!("cannot index {} with {}", obj.type_name(), idx.type_name()),
        )),
    }
}

/* ===================== Calls ===================== */

fn eval_call(call: &Call, scope: &mut Scope) -> Result<Val, ScriptError> {
    let args = call
        .args
        .iter()
        .map(|arg| eval_expr(arg, scope))
        .collect::<Result<Vec<_>, _>>()?;
    let line = call.line;

    if let Some(target) = &call.target {
        let func = resolve_remote(&call.name, target, scope, line)?;
        return func(&args).map_err(|message| ScriptError::runtime(line, message));
    }

    let callable = scope.callable(&call.name).ok_or_else(|| {
        ScriptError::runtime(line, format!("undefined function '{}'", call.name))
    })?;

    match callable {
        Callable::Builtin(builtin) => stdlib::call_builtin(builtin, &args)
            .map_err(|message| ScriptError::runtime(line, message)),
        Callable::User(def) => call_function(&def, args, scope, line),
        Callable::Native(func) => func(&args).map_err(|message| ScriptError::runtime(line, message)),
    }
}

/// Resolve `name(...) @ "service/interface"` through the resolver, cached per key
fn resolve_remote(
    name: &str,
    target: &Expr,
    scope: &mut Scope,
    line: usize,
) -> Result<NativeFn, ScriptError> {
    let address = match eval_expr(target, scope)? {
        Val::Str(s) => s,
        other => {
            return Err(ScriptError::runtime(
                line,
                format!("remote target must be a string, got {}", other.type_name()),
            ))
        }
    };
    let (service, interface) = address.rsplit_once('/').unwrap_or((address.as_str(), ""));
    let key = RemoteKey {
        service: service.to_string(),
        interface: interface.to_string(),
        method: name.to_string(),
    };

    if let Some(func) = scope.registry().cached_remote(&key) {
        return Ok(func);
    }

    tracing::debug!(service, interface, method = name, "resolving remote callable");
    let func = scope
        .resolver()
        .resolve_callable(service, interface, name)
        .map_err(|message| ScriptError::runtime(line, message))?;
    scope.registry_mut().cache_remote(key, Rc::clone(&func));
    Ok(func)
}

/// Invoke a user function
///
/// The body runs to completion on a nested VM inside its own call-scope. The
/// call-scope is popped whether the body returns, falls off the end or raises.
/// An `exit` in the body comes back as `ScriptError::Exit`.
pub fn call_function(
    def: &FunctionDef,
    args: Vec<Val>,
    scope: &mut Scope,
    line: usize,
) -> Result<Val, ScriptError> {
    if args.len() != def.params.len() {
        return Err(ScriptError::runtime(
            line,
            format!(
                "'{}' takes {} argument(s), got {}",
                def.name,
                def.params.len(),
                args.len()
            ),
        ));
    }
    let limit = scope.settings().max_call_depth;
    if scope.active_calls() >= limit {
        return Err(ScriptError::runtime(
            line,
            format!("maximum call depth ({}) exceeded calling '{}'", limit, def.name),
        ));
    }

    let locals = scope.push_call_scope(&def.name);
    for (param, arg) in def.params.iter().zip(args) {
        locals.insert(param.clone(), arg);
    }

    let error = {
        let mut vm = Vm::new(Rc::clone(&def.body), scope);
        run_until_done(&mut vm);
        if vm.exited() {
            Some(ScriptError::Exit { line })
        } else {
            vm.take_error()
        }
    };

    let mut locals = scope.pop_call_scope(&def.name).unwrap_or_default();
    match error {
        Some(err) => Err(err),
        None => Ok(locals.remove(RETURN_SLOT).unwrap_or(Val::Null)),
    }
}
