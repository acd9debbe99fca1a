//! Validation Engine
//!
//! Parsing, classification and reconciliation of checker diagnostics,
//! separated from process handling and scheduling.

pub mod dedup;
pub mod diagnostic;
pub mod engine;
pub mod parser;
pub mod position;
pub mod severity;

pub use dedup::CycleCache;
pub use diagnostic::{
    ByteRange, Diagnostic, DiagnosticSetExt, RawDiagnosticLine, Severity, ValidationRequest,
};
pub use engine::{diagnose, validate_once, CycleOutcome, Validator};
pub use parser::parse_output;
pub use position::{line_range, PositionError};
pub use severity::{classify, resolve_diagnostics, SeverityResolver};
