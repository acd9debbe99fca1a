//! Marker Sinks
//!
//! Consumers of a cycle's diagnostic set. A sink always replaces whatever
//! it showed before for the resource; sets are never merged.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::validation::{Diagnostic, Severity};

/// Receiver of the final diagnostic set of a cycle
///
/// Called from the validation worker; implementations synchronise with
/// their own display side.
#[async_trait]
pub trait MarkerSink: Send + Sync {
    /// Atomically replace all markers on `resource` with `diagnostics`
    ///
    /// `source` is the snapshot the set was computed against; ranges are
    /// byte offsets into it.
    async fn replace_markers(&self, resource: &str, source: &str, diagnostics: Vec<Diagnostic>);
}

/// Sink that records every published set
#[derive(Debug)]
pub struct CollectingSink {
    published: Mutex<Vec<(String, Vec<Diagnostic>)>>,
    count: watch::Sender<usize>,
}

impl Default for CollectingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            count: watch::Sender::new(0),
        }
    }

    /// Number of `replace_markers` calls so far
    pub fn calls(&self) -> usize {
        *self.count.borrow()
    }

    /// Most recently published set, if any
    pub async fn latest(&self) -> Option<Vec<Diagnostic>> {
        self.published
            .lock()
            .await
            .last()
            .map(|(_, diagnostics)| diagnostics.clone())
    }

    pub async fn published(&self) -> Vec<(String, Vec<Diagnostic>)> {
        self.published.lock().await.clone()
    }

    /// Wait until at least `calls` sets were published, up to `limit`
    pub async fn wait_for_calls(&self, calls: usize, limit: Duration) -> bool {
        let mut rx = self.count.subscribe();
        tokio::time::timeout(limit, rx.wait_for(|n| *n >= calls))
            .await
            .is_ok_and(|res| res.is_ok())
    }
}

#[async_trait]
impl MarkerSink for CollectingSink {
    async fn replace_markers(&self, resource: &str, _source: &str, diagnostics: Vec<Diagnostic>) {
        self.published
            .lock()
            .await
            .push((resource.to_string(), diagnostics));
        self.count.send_modify(|n| *n += 1);
    }
}

/// Output style of [`ConsoleSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleFormat {
    Human,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    resource: &'a str,
    diagnostics: &'a [Diagnostic],
}

/// Sink printing each set to standard output
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    format: ConsoleFormat,
}

impl ConsoleSink {
    pub fn new(format: ConsoleFormat) -> Self {
        Self { format }
    }

    /// Render one set the way it is printed
    pub fn render(&self, resource: &str, diagnostics: &[Diagnostic]) -> String {
        match self.format {
            ConsoleFormat::Human => {
                if diagnostics.is_empty() {
                    return format!("{}: syntax OK\n", resource);
                }
                let mut sorted: Vec<&Diagnostic> = diagnostics.iter().collect();
                sorted.sort_by_key(|d| d.line);
                sorted
                    .into_iter()
                    .map(|d| format_diagnostic(resource, d) + "\n")
                    .collect()
            }
            ConsoleFormat::Json => {
                let report = JsonReport {
                    resource,
                    diagnostics,
                };
                match serde_json::to_string(&report) {
                    Ok(json) => json + "\n",
                    Err(e) => {
                        log::error!("Failed to serialize diagnostics: {}", e);
                        String::new()
                    }
                }
            }
        }
    }
}

#[async_trait]
impl MarkerSink for ConsoleSink {
    async fn replace_markers(&self, resource: &str, _source: &str, diagnostics: Vec<Diagnostic>) {
        let rendered = self.render(resource, &diagnostics);
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(rendered.as_bytes()).and_then(|_| stdout.flush()) {
            log::warn!("Failed to print diagnostics: {}", e);
        }
    }
}

/// `resource:line: severity: message`
pub fn format_diagnostic(resource: &str, diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    format!(
        "{}:{}: {}: {}",
        resource, diagnostic.line, severity, diagnostic.message
    )
}
