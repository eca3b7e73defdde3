//! # Executor - Resumable Stack-Driven Interpreter
//!
//! ## Core Principles
//!
//! 1. **Stack-driven execution**: All statement state in `frames: Vec<Frame>`
//! 2. **Statement-level execution**: Each frame has a phase tracking micro-steps
//! 3. **Centralized control flow**: `Control` enum manages return/throw
//! 4. **Observable steps**: every executed line is reported as a `StepMarker`
//!    the driver can stop at
//!
//! Expressions (including calls to user functions) are evaluated in one go;
//! only statements are broken into steps.

pub mod errors;
pub mod exec_loop;
pub mod expressions;
pub mod include;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod statements;
pub mod stdlib;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use errors::{IncludeError, ScriptError};
pub use exec_loop::{run_until_done, step};
pub use expressions::{call_function, eval_expr, visit, EvalResult};
pub use registry::{Callable, NativeFn, Registry};
pub use resolver::{MockResolver, NullResolver, Resolver, StaticResolver};
pub use scope::{Scope, ScopeSettings, ERROR_SLOT, RETURN_SLOT};
pub use types::{Control, Expr, Node, Stmt, Val};
pub use vm::{Step, StepMarker, Vm};
