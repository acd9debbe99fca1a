//! Checker Process Management
//!
//! Spawning the interpreter in check-only mode against a transient copy of
//! the buffer, and cleaning up after it.

pub mod runner;
pub mod transient;

pub use runner::{CheckError, CheckOutput, Interpreter, ProcessRunner, RunnerOptions};
pub use transient::TransientInput;
