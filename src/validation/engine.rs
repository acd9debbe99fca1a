//! Validation Engine
//!
//! One validation cycle: snapshot, invoke the checker, parse, reconcile,
//! emit. Scheduling lives in [`crate::scheduler`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::process::{CheckError, CheckOutput, ProcessRunner};
use crate::sink::MarkerSink;

use super::dedup::CycleCache;
use super::diagnostic::{Diagnostic, ValidationRequest};
use super::parser::parse_output;
use super::severity::resolve_diagnostics;

/// Stand-in for the per-cycle input path when fingerprinting output
const INPUT_PLACEHOLDER: &str = "<input>";

/// What a cycle ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Text identical to the previous cycle, checker not run
    UnchangedInput,
    /// Checker output identical to the previous cycle, nothing emitted
    UnchangedOutput,
    /// A new set was handed to the sink
    Published { diagnostics: usize },
    /// Stop was requested while the checker ran; nothing emitted
    Cancelled,
}

/// Turn captured checker output into the diagnostic set for `text`
pub fn diagnose(output: &CheckOutput, text: &str, max_diagnostics: usize) -> Vec<Diagnostic> {
    let candidates = parse_output(&output.stderr, &output.input_path, max_diagnostics);
    resolve_diagnostics(&candidates, text)
}

/// Run the checker once against `text`, without any deduplication
pub async fn validate_once(
    runner: &ProcessRunner,
    text: &str,
    max_diagnostics: usize,
) -> Result<Vec<Diagnostic>, CheckError> {
    let output = runner.run(text).await?;
    Ok(diagnose(&output, text, max_diagnostics))
}

/// Cycle executor for one resource, holding the state carried between cycles
pub struct Validator {
    runner: ProcessRunner,
    sink: Arc<dyn MarkerSink>,
    resource: String,
    cache: CycleCache,
}

impl Validator {
    pub fn new(runner: ProcessRunner, sink: Arc<dyn MarkerSink>, resource: impl Into<String>) -> Self {
        Self {
            runner,
            sink,
            resource: resource.into(),
            cache: CycleCache::new(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Make the next cycle run in full regardless of cached state
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Run one cycle
    ///
    /// On error nothing is emitted and the cache is left as it was, so the
    /// previous diagnostics stay displayed and the next cycle retries.
    /// `stop` is checked once the checker returns; when set, the result is
    /// discarded.
    pub async fn run_cycle(
        &mut self,
        request: &ValidationRequest,
        max_diagnostics: usize,
        stop: &AtomicBool,
    ) -> Result<CycleOutcome, CheckError> {
        if self.cache.input_unchanged(&request.text) {
            return Ok(CycleOutcome::UnchangedInput);
        }

        let output = self.runner.run(&request.text).await?;
        if stop.load(Ordering::Acquire) {
            return Ok(CycleOutcome::Cancelled);
        }
        self.cache.record_input(&request.text);
        log::trace!("Checker output for {}:\n{}", self.resource, output.stderr);

        // The input path differs every cycle; fingerprint without it
        let fingerprint = output.stderr.replace(&output.input_path, INPUT_PLACEHOLDER);
        if self.cache.output_unchanged(&fingerprint) {
            return Ok(CycleOutcome::UnchangedOutput);
        }

        let diagnostics = diagnose(&output, &request.text, max_diagnostics);
        let count = diagnostics.len();
        self.sink
            .replace_markers(&self.resource, &request.text, diagnostics)
            .await;

        Ok(CycleOutcome::Published { diagnostics: count })
    }
}
