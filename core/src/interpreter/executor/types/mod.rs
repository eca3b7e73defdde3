//! Type definitions for the executor
//!
//! This module contains all the core types used by the executor:
//! - AST nodes (Stmt, Expr, Node)
//! - Runtime values (Val)
//! - Control flow (Control, Frame, FrameKind)
//! - Execution phases (one enum per statement type)

pub mod ast;
pub mod control;
pub mod phase;
pub mod values;

// Re-export all types for convenient access
pub use ast::{
    Accessor, BinaryOp, Binding, Branch, Call, CastKind, ElseBranch, Expr, FunctionDef, Node, Stmt,
    StmtRef, Target, UnaryOp,
};
pub use control::{Control, Frame, FrameKind};
pub use phase::*;
pub use values::Val;
