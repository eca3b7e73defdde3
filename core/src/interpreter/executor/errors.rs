//! Error types raised while loading or running a program

use crate::interpreter::lexer::LexError;
use crate::interpreter::parser::ParseError;
use thiserror::Error;

/// A module named by `include` could not be loaded
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot include module `{module}`: {cause}")]
pub struct IncludeError {
    pub module: String,
    pub cause: String,
}

/// Any error that ends or interrupts a run
///
/// Runtime errors are catchable by `try`/`retry`; lex and parse errors are
/// fatal at load time but become catchable when an included module fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Include(#[from] IncludeError),

    #[error("line {line}: {message}")]
    Runtime { line: usize, message: String },

    /// `exit` ran inside a function call; unwinds to the top and is never caught
    #[error("line {line}: exit")]
    Exit { line: usize },
}

impl ScriptError {
    pub fn runtime(line: usize, message: impl Into<String>) -> Self {
        ScriptError::Runtime {
            line,
            message: message.into(),
        }
    }

    /// Text written to `__error` when the error is recovered
    pub fn message(&self) -> String {
        match self {
            ScriptError::Runtime { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            ScriptError::Lex(e) => Some(e.line()),
            ScriptError::Parse(e) => Some(e.line),
            ScriptError::Include(_) => None,
            ScriptError::Runtime { line, .. } | ScriptError::Exit { line } => Some(*line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_bare_for_runtime_errors() {
        let err = ScriptError::runtime(7, "boom");
        assert_eq!(err.message(), "boom");
        assert_eq!(err.to_string(), "line 7: boom");
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn test_message_of_include_error_is_display_text() {
        let err = ScriptError::from(IncludeError {
            module: "lib".into(),
            cause: "not found".into(),
        });
        assert_eq!(err.message(), "cannot include module `lib`: not found");
        assert_eq!(err.line(), None);
    }
}
