//! Core execution loop
//!
//! This module contains the step() function - the heart of the interpreter.
//! It processes one frame at a time, advancing execution phases and managing the frame stack.
//!
//! ## Function Organization
//! Functions are ordered by importance/call hierarchy:
//! 1. run_until_done() - Top-level driver (calls step repeatedly)
//! 2. step() - Main execution loop (dispatches to statement handlers)
//! 3. unwind() - Return/throw propagation

use super::errors::ScriptError;
use super::scope::ERROR_SLOT;
use super::statements::{
    execute_block, execute_do_while, execute_if, execute_include, execute_retry, execute_simple,
    execute_try, execute_while,
};
use super::types::{Control, FrameKind, RetryPhase, Stmt, TryPhase, Val};
use super::vm::{Step, Vm};
use std::rc::Rc;

/* ===================== Public API ===================== */

/// Run the VM until it completes
///
/// After completion, inspect `vm.control` for the final state.
pub fn run_until_done(vm: &mut Vm) {
    loop {
        match step(vm) {
            Step::Continue | Step::Yield(_) => continue,
            Step::Done => break,
        }
    }
}

/// Execute one step of the VM
///
/// 1. Checks for active control flow and unwinds if needed
/// 2. Gets the top frame
/// 3. Dispatches on frame kind and phase
pub fn step(vm: &mut Vm) -> Step {
    if !matches!(vm.control, Control::None) {
        return unwind(vm);
    }

    let Some(frame) = vm.frames.last() else {
        return Step::Done;
    };

    // Clone frame data we need (to avoid borrow checker issues)
    let (kind, node, after) = (frame.kind.clone(), Rc::clone(&frame.node), frame.after);

    let result = match (kind, node.as_ref()) {
        (FrameKind::Block { idx }, Stmt::Block { body, .. }) => execute_block(vm, idx, body, after),
        (FrameKind::Simple { .. }, stmt) => execute_simple(vm, stmt, after),
        (FrameKind::If { phase, branch }, stmt @ Stmt::Condition { .. }) => {
            execute_if(vm, phase, branch, stmt, after)
        }
        (FrameKind::While { phase }, stmt @ Stmt::Cycle { .. }) => {
            execute_while(vm, phase, stmt, after)
        }
        (FrameKind::DoWhile { phase }, stmt @ Stmt::DoCycle { .. }) => {
            execute_do_while(vm, phase, stmt, after)
        }
        (
            FrameKind::Retry {
                phase,
                attempt,
                tries,
            },
            stmt @ Stmt::Retry { .. },
        ) => execute_retry(vm, phase, attempt, tries, stmt, after),
        (FrameKind::Try { phase, error }, stmt @ Stmt::TryCatch { .. }) => {
            execute_try(vm, phase, error, stmt, after)
        }
        (FrameKind::Include { phase }, stmt @ Stmt::Include { .. }) => {
            execute_include(vm, phase, stmt, after)
        }

        // Shouldn't happen - push_stmt pairs every node with its frame kind
        (kind, _) => unreachable!("frame kind {:?} does not match statement node", kind),
    };

    if let Step::Yield(marker) = &result {
        tracing::trace!(
            line = marker.line,
            next_line = marker.next_line,
            value = ?marker.value,
            "step"
        );
    }
    result
}

/* ===================== Control Flow ===================== */

/// What the frame on top of the stack does with a propagating error
enum Handling {
    /// Not a handler, pop it
    Pass,
    /// The error is recovered and execution resumes in this frame
    Recover,
    /// A retry with no attempts left; records the error but keeps propagating
    Exhausted,
}

/// Unwind the stack when control flow is active
///
/// Return exits the whole statement tree, and so does exit (also when it
/// arrives as an error from a function call). Throw pops frames until a try
/// block or a retry body with attempts left takes it.
fn unwind(vm: &mut Vm) -> Step {
    let err = match &vm.control {
        Control::Return(val) => {
            vm.result = Some(val.clone());
            vm.frames.clear();
            return Step::Done;
        }
        Control::Exit | Control::Throw(ScriptError::Exit { .. }) => {
            vm.control = Control::Exit;
            vm.frames.clear();
            return Step::Done;
        }
        Control::Throw(err) => err.clone(),
        Control::None => unreachable!("unwind() called with Control::None"),
    };
    let message = err.message();

    while let Some(frame) = vm.frames.last_mut() {
        let handling = match &mut frame.kind {
            FrameKind::Try { phase, error } if *phase == TryPhase::Body => {
                *phase = TryPhase::Catch;
                *error = Some(message.clone());
                Handling::Recover
            }
            FrameKind::Retry {
                phase,
                attempt,
                tries,
            } if *phase == RetryPhase::AfterBody => {
                if *attempt < *tries {
                    tracing::warn!(
                        line = frame.node.line(),
                        attempt = *attempt,
                        tries = *tries,
                        error = %message,
                        "retry attempt failed, trying again"
                    );
                    *phase = RetryPhase::Attempt;
                    Handling::Recover
                } else {
                    Handling::Exhausted
                }
            }
            _ => Handling::Pass,
        };

        match handling {
            Handling::Recover => {
                vm.scope.set(ERROR_SLOT, Val::Str(message));
                vm.control = Control::None;
                return Step::Continue;
            }
            Handling::Exhausted => {
                vm.scope.set(ERROR_SLOT, Val::Str(message.clone()));
                vm.frames.pop();
            }
            Handling::Pass => {
                vm.frames.pop();
            }
        }
    }

    // Uncaught: control stays Throw for the driver
    Step::Done
}
