//! Perl Syntax Validator
//!
//! Background syntax checking for an editable buffer, driven by the Perl
//! interpreter in compile-only mode.
//!
//! This library provides:
//! - A polling validation worker with input and output deduplication
//! - Checker process management with guaranteed cleanup
//! - Parsing and reconciliation of the interpreter's diagnostics
//! - Marker sinks for the console and the Language Server Protocol

pub mod config;
pub mod lsp;
pub mod process;
pub mod scheduler;
pub mod sink;
pub mod validation;

// Re-exports for clean public API
pub use config::{init_logging, Config, ConfigArgs};
pub use process::{Interpreter, ProcessRunner};
pub use scheduler::{SchedulerSettings, ValidationScheduler, WorkerState};
pub use sink::{CollectingSink, ConsoleSink, MarkerSink};
pub use validation::{validate_once, Diagnostic, Severity, Validator};
