//! Tests for the executor
//!
//! Organized by statement kind and feature area

mod helpers;

mod include_tests;
mod remote_tests;
mod statement_tests;
mod step_tests;
