//! Workflow script interpreter
//!
//! Source text goes through the lexer and parser into a linked [`Program`];
//! the executor runs it as a resumable sequence of step markers.

pub mod executor;
pub mod lexer;
pub mod parser;
pub mod runner;

pub use executor::{Scope, ScriptError, StepMarker, Val, Vm};
pub use parser::{load, parse, ParseError, Program};
