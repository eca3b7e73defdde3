//! Execution phase enums for each statement type
//!
//! Each statement type has its own Phase enum that tracks which execution step
//! it's currently at.

/// Execution phase for simple statements (assign, expression, return, throw,
/// function declaration)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SimplePhase {
    Exec = 0,
}

/// Execution phase for Condition statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IfPhase {
    /// Evaluate the condition of the current branch
    Eval = 0,
    /// Every condition was false, enter the else block
    Else = 1,
    /// The chosen branch (if any) has finished
    Close = 2,
}

/// Execution phase for Cycle statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WhilePhase {
    /// Evaluate the loop condition
    Check = 0,
    Close = 1,
}

/// Execution phase for DoCycle statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DoWhilePhase {
    /// Run the body once unconditionally
    Enter = 0,
    /// Body finished, evaluate the trailing condition
    Check = 1,
    Close = 2,
}

/// Execution phase for Retry statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RetryPhase {
    /// Evaluate the number of tries
    Start = 0,
    /// Begin the next attempt
    Attempt = 1,
    /// An attempt is running or has just completed
    AfterBody = 2,
    Close = 3,
}

/// Execution phase for TryCatch statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TryPhase {
    Enter = 0,
    /// Executing the try block; a throw here is caught
    Body = 1,
    /// An error was caught, start the catch block
    Catch = 2,
    /// Executing the catch block; a throw here propagates
    Handler = 3,
}

/// Execution phase for Include statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IncludePhase {
    /// Fetch, parse and link the module
    Load = 0,
    Close = 1,
}
