//! Statement execution handlers
//!
//! Each statement type has its own handler function that processes the
//! statement based on its current execution phase. A handler either makes
//! internal progress (`Step::Continue`) or reports a marker (`Step::Yield`).
//! Child statements are pushed as frames with the line execution continues
//! at once they finish.

use super::errors::{IncludeError, ScriptError};
use super::expressions::{eval_expr, list_index};
use super::include;
use super::scope::{Scope, RETURN_SLOT};
use super::types::{
    Accessor, Control, DoWhilePhase, FrameKind, IfPhase, IncludePhase, RetryPhase, Stmt, StmtRef,
    Target, TryPhase, Val, WhilePhase,
};
use super::vm::{push_stmt, set_kind, Step, StepMarker, Vm};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

/* ===================== Helpers ===================== */

fn marker(line: usize, value: Option<Val>, next_line: usize) -> Step {
    Step::Yield(StepMarker::new(line, value, next_line))
}

/// Start propagating an error; the frames are unwound on the next step
fn raise(vm: &mut Vm, err: ScriptError) -> Step {
    vm.control = Control::Throw(err);
    Step::Continue
}

/// Value reported for a statement that stores several values at once
fn stored_value(mut vals: Vec<Val>) -> Val {
    if vals.len() == 1 {
        vals.pop().unwrap_or(Val::Null)
    } else {
        Val::List(vals)
    }
}

/// First line `stmt` reports, or `fallback` when it reports none
fn entry(stmt: &StmtRef, fallback: usize) -> usize {
    stmt.entry_line().unwrap_or(fallback)
}

/* ===================== Statement Handlers ===================== */

/// Execute Block statement
pub fn execute_block(vm: &mut Vm, idx: usize, body: &[StmtRef], after: usize) -> Step {
    // Check if we've finished all statements in the block
    let Some(child) = body.get(idx) else {
        vm.frames.pop();
        return Step::Continue;
    };

    set_kind(vm, FrameKind::Block { idx: idx + 1 });

    // Each child continues at its next sibling, the last one at the block's own continuation
    let next = body.get(idx + 1).map_or(after, |sibling| entry(sibling, after));
    push_stmt(vm, Rc::clone(child), next);

    Step::Continue
}

/// Execute a statement that reports exactly one marker
/// (assign, const, expression, return, throw, exit, delay, function declaration)
pub fn execute_simple(vm: &mut Vm, stmt: &Stmt, after: usize) -> Step {
    vm.frames.pop();
    match run_simple(vm, stmt, after) {
        Ok(step) => step,
        Err(err) => raise(vm, err),
    }
}

fn run_simple(vm: &mut Vm, stmt: &Stmt, after: usize) -> Result<Step, ScriptError> {
    match stmt {
        Stmt::Assign {
            targets,
            values,
            line,
        } => {
            // Every value is evaluated before any target is written, so `a, b = b, a` swaps
            let vals = if values.is_empty() {
                vec![Val::Null; targets.len()]
            } else {
                values
                    .iter()
                    .map(|expr| eval_expr(expr, vm.scope))
                    .collect::<Result<Vec<_>, _>>()?
            };
            for (target, val) in targets.iter().zip(&vals) {
                assign(target, val.clone(), vm.scope, *line)?;
            }
            Ok(marker(*line, Some(stored_value(vals)), after))
        }

        Stmt::Const { bindings, line } => {
            let mut vals = Vec::with_capacity(bindings.len());
            for binding in bindings {
                let val = eval_expr(&binding.value, vm.scope)?;
                vm.scope
                    .define_const(&binding.name, val.clone())
                    .map_err(|message| ScriptError::runtime(*line, message))?;
                vals.push(val);
            }
            Ok(marker(*line, Some(stored_value(vals)), after))
        }

        Stmt::Expr { expr, line } => {
            let val = eval_expr(expr, vm.scope)?;
            Ok(marker(*line, Some(val), after))
        }

        Stmt::Return { value, line } => {
            let val = match value {
                Some(expr) => eval_expr(expr, vm.scope)?,
                None => Val::Null,
            };
            vm.scope.set(RETURN_SLOT, val.clone());
            vm.control = Control::Return(val.clone());
            Ok(marker(*line, Some(val), after))
        }

        Stmt::Throw { value, line } => {
            let val = eval_expr(value, vm.scope)?;
            Err(ScriptError::runtime(*line, val.to_string()))
        }

        Stmt::Function { def, line } => {
            vm.scope.define_function(Rc::clone(def));
            Ok(marker(*line, None, after))
        }

        // Nothing runs after exit, so the marker points at itself
        Stmt::Exit { line } => {
            vm.control = Control::Exit;
            Ok(marker(*line, None, *line))
        }

        Stmt::Delay { seconds, line } => {
            let val = eval_expr(seconds, vm.scope)?;
            pause(&val, vm.scope.settings().delay_scale, *line)?;
            Ok(marker(*line, Some(val), after))
        }

        other => unreachable!("not a simple statement: {:?}", other),
    }
}

/// Sleep for `seconds` (a non-negative number) times `scale`
fn pause(seconds: &Val, scale: f64, line: usize) -> Result<(), ScriptError> {
    let secs = seconds
        .as_f64()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .ok_or_else(|| {
            ScriptError::runtime(
                line,
                format!("delay needs a non-negative number of seconds, got {}", seconds),
            )
        })?;
    let delay = Duration::try_from_secs_f64(secs * scale)
        .map_err(|_| ScriptError::runtime(line, format!("delay of {} seconds is too long", secs)))?;
    if !delay.is_zero() {
        tracing::debug!(line, seconds = secs, scale, "delaying");
        std::thread::sleep(delay);
    }
    Ok(())
}

/// Execute Condition statement (if / else if / else)
///
/// Conditions are evaluated one per marker. A false condition points at the
/// next `else if`, the `else` or the end of the statement.
pub fn execute_if(vm: &mut Vm, phase: IfPhase, branch: usize, stmt: &Stmt, after: usize) -> Step {
    let Stmt::Condition {
        branches,
        else_branch,
        end_line,
        ..
    } = stmt
    else {
        unreachable!("execute_if on {:?}", stmt);
    };

    match phase {
        IfPhase::Eval => {
            let Some(current) = branches.get(branch) else {
                set_kind(vm, FrameKind::If { phase: IfPhase::Close, branch });
                return Step::Continue;
            };
            let cond = match eval_expr(&current.cond, vm.scope) {
                Ok(val) => val,
                Err(err) => return raise(vm, err),
            };

            if cond.is_truthy() {
                set_kind(vm, FrameKind::If { phase: IfPhase::Close, branch });
                push_stmt(vm, Rc::clone(&current.body), *end_line);
                return marker(
                    current.line,
                    Some(Val::Bool(true)),
                    entry(&current.body, *end_line),
                );
            }

            let (phase, branch, next) = match (branches.get(branch + 1), else_branch) {
                (Some(next), _) => (IfPhase::Eval, branch + 1, next.line),
                (None, Some(else_branch)) => (IfPhase::Else, branch, else_branch.line),
                (None, None) => (IfPhase::Close, branch, *end_line),
            };
            set_kind(vm, FrameKind::If { phase, branch });
            marker(current.line, Some(Val::Bool(false)), next)
        }

        IfPhase::Else => {
            set_kind(vm, FrameKind::If { phase: IfPhase::Close, branch });
            match else_branch {
                Some(else_branch) => {
                    push_stmt(vm, Rc::clone(&else_branch.body), *end_line);
                    marker(else_branch.line, None, entry(&else_branch.body, *end_line))
                }
                None => Step::Continue,
            }
        }

        IfPhase::Close => {
            vm.frames.pop();
            marker(*end_line, None, after)
        }
    }
}

/// Execute Cycle statement (while)
pub fn execute_while(vm: &mut Vm, phase: WhilePhase, stmt: &Stmt, after: usize) -> Step {
    let Stmt::Cycle {
        cond,
        body,
        line,
        end_line,
    } = stmt
    else {
        unreachable!("execute_while on {:?}", stmt);
    };

    match phase {
        WhilePhase::Check => {
            let val = match eval_expr(cond, vm.scope) {
                Ok(val) => val,
                Err(err) => return raise(vm, err),
            };
            if val.is_truthy() {
                // Frame stays in Check; the body's last marker points back here
                push_stmt(vm, Rc::clone(body), *line);
                marker(*line, Some(Val::Bool(true)), entry(body, *line))
            } else {
                set_kind(vm, FrameKind::While { phase: WhilePhase::Close });
                marker(*line, Some(Val::Bool(false)), *end_line)
            }
        }

        WhilePhase::Close => {
            vm.frames.pop();
            marker(*end_line, None, after)
        }
    }
}

/// Execute DoCycle statement (do { } while cond;)
pub fn execute_do_while(vm: &mut Vm, phase: DoWhilePhase, stmt: &Stmt, after: usize) -> Step {
    let Stmt::DoCycle {
        body,
        cond,
        cond_line,
        line,
        end_line,
    } = stmt
    else {
        unreachable!("execute_do_while on {:?}", stmt);
    };

    match phase {
        DoWhilePhase::Enter => {
            set_kind(vm, FrameKind::DoWhile { phase: DoWhilePhase::Check });
            push_stmt(vm, Rc::clone(body), *cond_line);
            marker(*line, None, entry(body, *cond_line))
        }

        DoWhilePhase::Check => {
            let val = match eval_expr(cond, vm.scope) {
                Ok(val) => val,
                Err(err) => return raise(vm, err),
            };
            if val.is_truthy() {
                push_stmt(vm, Rc::clone(body), *cond_line);
                marker(*cond_line, Some(Val::Bool(true)), entry(body, *cond_line))
            } else {
                set_kind(vm, FrameKind::DoWhile { phase: DoWhilePhase::Close });
                marker(*cond_line, Some(Val::Bool(false)), *end_line)
            }
        }

        DoWhilePhase::Close => {
            vm.frames.pop();
            marker(*end_line, None, after)
        }
    }
}

/// Execute Retry statement (retry N { } while cond;)
///
/// An attempt that raises is retried while attempts remain (see `unwind`).
/// An attempt that completes evaluates the condition: false ends the retry,
/// true retries while attempts remain and ends it quietly otherwise.
pub fn execute_retry(
    vm: &mut Vm,
    phase: RetryPhase,
    attempt: i64,
    tries: i64,
    stmt: &Stmt,
    after: usize,
) -> Step {
    let Stmt::Retry {
        tries: tries_expr,
        body,
        cond,
        cond_line,
        line,
        end_line,
    } = stmt
    else {
        unreachable!("execute_retry on {:?}", stmt);
    };

    match phase {
        RetryPhase::Start => {
            let tries = match eval_expr(tries_expr, vm.scope) {
                Ok(Val::Int(n)) => n,
                Ok(Val::Float(x)) if x.is_finite() => x as i64,
                Ok(other) => {
                    return raise(
                        vm,
                        ScriptError::runtime(
                            *line,
                            format!("retry count must be a number, got {}", other.type_name()),
                        ),
                    )
                }
                Err(err) => return raise(vm, err),
            };
            let phase = if tries > 0 {
                RetryPhase::Attempt
            } else {
                RetryPhase::Close
            };
            set_kind(vm, FrameKind::Retry { phase, attempt: 0, tries });
            Step::Continue
        }

        RetryPhase::Attempt => {
            if attempt > 0 {
                let delay = vm.scope.settings().retry_delay;
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
            let attempt = attempt + 1;
            set_kind(
                vm,
                FrameKind::Retry {
                    phase: RetryPhase::AfterBody,
                    attempt,
                    tries,
                },
            );
            push_stmt(vm, Rc::clone(body), *cond_line);
            marker(*line, Some(Val::Int(attempt)), entry(body, *cond_line))
        }

        RetryPhase::AfterBody => {
            let close = FrameKind::Retry {
                phase: RetryPhase::Close,
                attempt,
                tries,
            };
            let val = match eval_expr(cond, vm.scope) {
                Ok(val) => val,
                Err(err) => {
                    // A failing condition is not a failed attempt
                    set_kind(vm, close);
                    return raise(vm, err);
                }
            };

            if !val.is_truthy() {
                set_kind(vm, close);
                marker(*cond_line, Some(Val::Bool(false)), *end_line)
            } else if attempt < tries {
                tracing::warn!(line = *line, attempt, tries, "retry condition holds, trying again");
                set_kind(
                    vm,
                    FrameKind::Retry {
                        phase: RetryPhase::Attempt,
                        attempt,
                        tries,
                    },
                );
                marker(*cond_line, Some(Val::Bool(true)), *line)
            } else {
                tracing::warn!(line = *line, tries, "retry attempts exhausted");
                set_kind(vm, close);
                marker(*cond_line, Some(Val::Bool(true)), *end_line)
            }
        }

        RetryPhase::Close => {
            vm.frames.pop();
            marker(*end_line, None, after)
        }
    }
}

/// Execute TryCatch statement
pub fn execute_try(
    vm: &mut Vm,
    phase: TryPhase,
    error: Option<String>,
    stmt: &Stmt,
    after: usize,
) -> Step {
    let Stmt::TryCatch {
        body,
        handler,
        catch_line,
        line,
        end_line,
    } = stmt
    else {
        unreachable!("execute_try on {:?}", stmt);
    };

    match phase {
        TryPhase::Enter => {
            set_kind(
                vm,
                FrameKind::Try {
                    phase: TryPhase::Body,
                    error: None,
                },
            );
            push_stmt(vm, Rc::clone(body), *end_line);
            marker(*line, None, entry(body, *end_line))
        }

        // Reached by unwind: the message is already in `__error`
        TryPhase::Catch => {
            set_kind(
                vm,
                FrameKind::Try {
                    phase: TryPhase::Handler,
                    error: None,
                },
            );
            push_stmt(vm, Rc::clone(handler), *end_line);
            marker(
                *catch_line,
                Some(Val::Str(error.unwrap_or_default())),
                entry(handler, *end_line),
            )
        }

        // The try block or the catch block finished normally
        TryPhase::Body | TryPhase::Handler => {
            vm.frames.pop();
            marker(*end_line, None, after)
        }
    }
}

/// Execute Include statement
///
/// The module runs in the current scope, spliced into this VM's frames.
/// Nested includes are limited to `max_call_depth` levels, which stops a
/// module that includes itself.
pub fn execute_include(vm: &mut Vm, phase: IncludePhase, stmt: &Stmt, after: usize) -> Step {
    let Stmt::Include { module, line } = stmt else {
        unreachable!("execute_include on {:?}", stmt);
    };

    match phase {
        IncludePhase::Load => {
            let limit = vm.scope.settings().max_call_depth;
            let depth = vm
                .frames
                .iter()
                .filter(|frame| {
                    matches!(frame.kind, FrameKind::Include { phase: IncludePhase::Close })
                })
                .count();
            if depth >= limit {
                let err = IncludeError {
                    module: module.clone(),
                    cause: format!("include depth limit ({}) reached", limit),
                };
                return raise(vm, err.into());
            }

            let program = match include::load_module(module, vm.scope) {
                Ok(program) => program,
                Err(err) => return raise(vm, err),
            };
            for def in program.functions() {
                vm.scope.define_function(def);
            }

            set_kind(vm, FrameKind::Include { phase: IncludePhase::Close });
            let next = entry(&program.body, *line);
            push_stmt(vm, program.body, *line);
            marker(*line, Some(Val::Str(module.clone())), next)
        }

        IncludePhase::Close => {
            vm.frames.pop();
            marker(*line, None, after)
        }
    }
}

/* ===================== Assignment ===================== */

/// Store `value` into the target, updating nested lists/objects in place
fn assign(target: &Target, value: Val, scope: &mut Scope, line: usize) -> Result<(), ScriptError> {
    if scope.is_const(&target.name) {
        return Err(ScriptError::runtime(
            line,
            format!("cannot assign to constant '{}'", target.name),
        ));
    }
    if target.path.is_empty() {
        scope.set(&target.name, value);
        return Ok(());
    }

    let keys = target
        .path
        .iter()
        .map(|acc| match acc {
            Accessor::Index { index } => eval_expr(index, scope),
            Accessor::Field { name } => Ok(Val::Str(name.clone())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut root = scope.get(&target.name);
    store(&mut root, &keys, value, line)?;
    scope.set(&target.name, root);
    Ok(())
}

fn store(slot: &mut Val, keys: &[Val], value: Val, line: usize) -> Result<(), ScriptError> {
    let Some((key, rest)) = keys.split_first() else {
        *slot = value;
        return Ok(());
    };

    // Writing a field of an unset variable creates the object
    if matches!(slot, Val::Null) && matches!(key, Val::Str(_)) {
        *slot = Val::Obj(BTreeMap::new());
    }

    match (slot, key) {
        (Val::Obj(map), Val::Str(field)) => {
            let child = map.entry(field.clone()).or_insert(Val::Null);
            store(child, rest, value, line)
        }
        (Val::List(items), Val::Int(i)) => {
            let idx = list_index(*i, items.len()).ok_or_else(|| {
                ScriptError::runtime(
                    line,
                    format!("index {} out of range for list of length {}", i, items.len()),
                )
            })?;
            store(&mut items[idx], rest, value, line)
        }
        (slot, key) => Err(ScriptError::runtime(
            line,
            format!(
                "cannot assign into {} with a {} key",
                slot.type_name(),
                key.type_name()
            ),
        )),
    }
}
