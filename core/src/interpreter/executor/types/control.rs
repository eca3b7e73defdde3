//! Control flow and execution frame types

use super::ast::StmtRef;
use super::phase::{
    DoWhilePhase, IfPhase, IncludePhase, RetryPhase, SimplePhase, TryPhase, WhilePhase,
};
use super::values::Val;
use crate::interpreter::executor::errors::ScriptError;

/* ===================== Control Flow ===================== */

/// Control flow state
///
/// When control != None, the VM unwinds the stack to find the appropriate handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    None,
    Return(Val),
    Throw(ScriptError),
    /// `exit` ran; every frame is dropped
    Exit,
}

/* ===================== Frames ===================== */

/// Frame kind - the type and state of a statement being executed
#[derive(Debug, Clone, PartialEq)]
pub enum FrameKind {
    Simple { phase: SimplePhase },
    Block { idx: usize },
    If { phase: IfPhase, branch: usize },
    While { phase: WhilePhase },
    DoWhile { phase: DoWhilePhase },
    Retry { phase: RetryPhase, attempt: i64, tries: i64 },
    Try { phase: TryPhase, error: Option<String> },
    Include { phase: IncludePhase },
}

/// Execution frame - one per active statement
///
/// The frame stack replaces the system call stack, so execution can stop
/// after any marker and pick up again on the next call to `step`.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The kind and state of this frame
    pub kind: FrameKind,

    /// The AST node (statement) this frame represents
    pub node: StmtRef,

    /// Line execution continues at once this statement is finished
    pub after: usize,
}
