//! Diagnostic data model
//!
//! Types flowing through a validation cycle, from the snapshot taken at the
//! start of a cycle to the diagnostics handed to a marker sink.

use std::time::SystemTime;

use serde::Serialize;

/// Severity of a diagnostic reported by the checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Byte span inside the checked text, `end` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A single reported issue, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// 1-based source line
    pub line: usize,
    pub message: String,
    pub severity: Severity,
    /// Highlight span; at most one diagnostic per line carries one
    pub range: Option<ByteRange>,
}

/// One checker output line that references the checked file
#[derive(Debug, Clone, PartialEq)]
pub struct RawDiagnosticLine {
    /// 1-based source line the checker points at
    pub line: usize,
    /// Full message with the file path stripped, continuation appended
    pub message: String,
    /// Primary sentence, cut at the first `.` or `,` after the line marker
    pub summary: String,
    pub has_continuation: bool,
}

/// Immutable snapshot of the buffer for one cycle
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub text: String,
    pub taken_at: SystemTime,
}

impl ValidationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            taken_at: SystemTime::now(),
        }
    }
}

/// Convenience predicates over a diagnostic set
pub trait DiagnosticSetExt {
    fn has_errors(&self) -> bool;
    fn count(&self, severity: Severity) -> usize;
}

impl DiagnosticSetExt for [Diagnostic] {
    fn has_errors(&self) -> bool {
        self.iter().any(|d| d.severity == Severity::Error)
    }

    fn count(&self, severity: Severity) -> usize {
        self.iter().filter(|d| d.severity == severity).count()
    }
}
