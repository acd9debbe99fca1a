//! Severity classification and per-line reconciliation.

use std::collections::HashMap;

use super::diagnostic::{ByteRange, Diagnostic, RawDiagnosticLine, Severity};
use super::position::line_range;

/// Phrases the interpreter uses for warnings rather than hard errors
pub const WARNING_MARKERS: &[&str] = &["possible", "Useless", "may", "better written as"];

/// Classify a candidate by its primary sentence
pub fn classify(summary: &str) -> Severity {
    if WARNING_MARKERS.iter().any(|marker| summary.contains(marker)) {
        Severity::Warning
    } else {
        Severity::Error
    }
}

/// Per-line bookkeeping while reconciling one cycle's candidates
#[derive(Debug, Default)]
pub struct SeverityResolver {
    /// Severity of the range-bearing diagnostic, keyed by source line
    assigned: HashMap<usize, Severity>,
    /// Index in the output of the diagnostic currently holding the line's range
    range_holder: HashMap<usize, usize>,
}

impl SeverityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a newly seen diagnostic for `line` may compute a range
    fn grants_range(&self, line: usize) -> bool {
        !matches!(self.assigned.get(&line), Some(Severity::Error))
    }

    /// Reconcile candidates in reverse output order against `text`
    ///
    /// Every candidate yields a diagnostic. A line's first diagnostic gets a
    /// range; a later one takes the range over only while the line holds a
    /// warning, so an error's range is never replaced.
    pub fn resolve(mut self, candidates: &[RawDiagnosticLine], text: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::with_capacity(candidates.len());

        for candidate in candidates.iter().rev() {
            let severity = classify(&candidate.summary);
            let range = if self.grants_range(candidate.line) {
                self.assigned.insert(candidate.line, severity);
                self.take_range(candidate.line, text, &mut diagnostics)
            } else {
                None
            };

            if range.is_some() {
                self.range_holder.insert(candidate.line, diagnostics.len());
            }

            diagnostics.push(Diagnostic {
                line: candidate.line,
                message: candidate.message.clone(),
                severity,
                range,
            });
        }

        diagnostics
    }

    fn take_range(
        &mut self,
        line: usize,
        text: &str,
        diagnostics: &mut [Diagnostic],
    ) -> Option<ByteRange> {
        let range = match line_range(text, line) {
            Ok(range) => range,
            Err(e) => {
                log::debug!("No highlight range for diagnostic: {}", e);
                return None;
            }
        };

        if let Some(previous) = self.range_holder.remove(&line) {
            diagnostics[previous].range = None;
        }

        Some(range)
    }
}

/// Classify and reconcile a cycle's candidates
pub fn resolve_diagnostics(candidates: &[RawDiagnosticLine], text: &str) -> Vec<Diagnostic> {
    SeverityResolver::new().resolve(candidates, text)
}
