//! Virtual Machine state
//!
//! The VM holds all execution state:
//! - frames: Stack of active statements
//! - control: Current control flow state (return, throw)
//! - scope: The environment the program reads and writes

use super::exec_loop::{run_until_done, step};
use super::scope::Scope;
use super::errors::ScriptError;
use super::types::{
    Control, DoWhilePhase, Frame, FrameKind, IfPhase, IncludePhase, RetryPhase, SimplePhase, Stmt,
    StmtRef, TryPhase, Val, WhilePhase,
};
use crate::interpreter::parser::Program;
use serde::Serialize;
use std::rc::Rc;

/* ===================== Step Markers ===================== */

/// One observable step: the line just executed, its value (if any) and the
/// line execution continues at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepMarker {
    pub line: usize,
    pub value: Option<Val>,
    pub next_line: usize,
}

impl StepMarker {
    pub fn new(line: usize, value: Option<Val>, next_line: usize) -> Self {
        StepMarker {
            line,
            value,
            next_line,
        }
    }
}

/* ===================== Step Result ===================== */

/// Result of executing one step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Internal progress, nothing to report
    Continue,
    /// A marker for the driver
    Yield(StepMarker),
    /// Execution complete (inspect `control` for an uncaught error)
    Done,
}

/* ===================== VM ===================== */

/// Resumable executor for one statement tree
///
/// Iterating the VM yields one marker per observable step and, if the program
/// raised an error nobody caught, that error once at the end.
pub struct Vm<'s> {
    /// Stack of execution frames
    pub frames: Vec<Frame>,

    /// Current control flow state
    pub control: Control,

    pub scope: &'s mut Scope,

    /// Value of a top-level `return`
    pub(crate) result: Option<Val>,
}

impl<'s> Vm<'s> {
    /// Create a VM for a statement
    ///
    /// The statement's last marker continues at its own last line.
    pub fn new(program: StmtRef, scope: &'s mut Scope) -> Self {
        let after = program.end_line();
        let mut vm = Vm {
            frames: vec![],
            control: Control::None,
            scope,
            result: None,
        };

        // Push initial frame for the program
        push_stmt(&mut vm, program, after);

        vm
    }

    /// Install every function the program declares, then create its VM
    pub fn from_program(program: &Program, scope: &'s mut Scope) -> Self {
        for def in program.functions() {
            scope.define_function(def);
        }
        Vm::new(Rc::clone(&program.body), scope)
    }

    /// Drain the VM; the top-level return value, or `Null`
    pub fn run(mut self) -> Result<Val, ScriptError> {
        run_until_done(&mut self);
        match self.take_error() {
            Some(err) => Err(err),
            None => Ok(self.result.take().unwrap_or(Val::Null)),
        }
    }

    /// Value of a top-level `return`, once the program has ended on one
    pub fn result(&self) -> Option<&Val> {
        self.result.as_ref()
    }

    /// Whether the program ended on `exit`
    pub fn exited(&self) -> bool {
        matches!(self.control, Control::Exit)
    }

    pub fn is_done(&self) -> bool {
        self.frames.is_empty()
    }

    /// Remove and return the uncaught error, if the program ended on one
    pub fn take_error(&mut self) -> Option<ScriptError> {
        if !matches!(self.control, Control::Throw(_)) {
            return None;
        }
        match std::mem::replace(&mut self.control, Control::None) {
            Control::Throw(err) => Some(err),
            _ => None,
        }
    }
}

impl Iterator for Vm<'_> {
    type Item = Result<StepMarker, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match step(self) {
                Step::Continue => continue,
                Step::Yield(marker) => return Some(Ok(marker)),
                Step::Done => return self.take_error().map(Err),
            }
        }
    }
}

/* ===================== Frame Management ===================== */

/// Push a new frame for a statement onto the stack
///
/// This determines the initial phase based on the statement type.
pub fn push_stmt(vm: &mut Vm, stmt: StmtRef, after: usize) {
    let kind = match stmt.as_ref() {
        Stmt::Block { .. } => FrameKind::Block { idx: 0 },

        Stmt::Assign { .. }
        | Stmt::Const { .. }
        | Stmt::Exit { .. }
        | Stmt::Delay { .. }
        | Stmt::Expr { .. }
        | Stmt::Return { .. }
        | Stmt::Throw { .. }
        | Stmt::Function { .. } => FrameKind::Simple {
            phase: SimplePhase::Exec,
        },

        Stmt::Condition { .. } => FrameKind::If {
            phase: IfPhase::Eval,
            branch: 0,
        },

        Stmt::Cycle { .. } => FrameKind::While {
            phase: WhilePhase::Check,
        },

        Stmt::DoCycle { .. } => FrameKind::DoWhile {
            phase: DoWhilePhase::Enter,
        },

        Stmt::Retry { .. } => FrameKind::Retry {
            phase: RetryPhase::Start,
            attempt: 0,
            tries: 0,
        },

        Stmt::TryCatch { .. } => FrameKind::Try {
            phase: TryPhase::Enter,
            error: None,
        },

        Stmt::Include { .. } => FrameKind::Include {
            phase: IncludePhase::Load,
        },
    };

    vm.frames.push(Frame {
        kind,
        node: stmt,
        after,
    });
}

/// Replace the state of the top frame
pub fn set_kind(vm: &mut Vm, kind: FrameKind) {
    if let Some(frame) = vm.frames.last_mut() {
        frame.kind = kind;
    }
}
