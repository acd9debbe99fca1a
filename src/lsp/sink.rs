use async_trait::async_trait;
use tower_lsp::lsp_types::{self, DiagnosticSeverity, Position, Range, Url};
use tower_lsp::Client;

use crate::lsp::document::DocumentStore;
use crate::sink::MarkerSink;
use crate::validation::{Diagnostic, Severity};

pub const DIAGNOSTIC_SOURCE: &str = "perl -c";

/// Publishes each cycle's set through the LSP client
pub struct LspSink {
    client: Client,
    documents: DocumentStore,
}

impl LspSink {
    pub fn new(client: Client, documents: DocumentStore) -> Self {
        Self { client, documents }
    }
}

#[async_trait]
impl MarkerSink for LspSink {
    async fn replace_markers(&self, resource: &str, source: &str, diagnostics: Vec<Diagnostic>) {
        let uri = match Url::parse(resource) {
            Ok(uri) => uri,
            Err(e) => {
                log::warn!("Cannot publish diagnostics for '{}': {}", resource, e);
                return;
            }
        };

        // Closed while the cycle was running
        if self.documents.get(&uri).await.is_none() {
            log::debug!("Dropping diagnostics for closed document {}", uri);
            return;
        }

        let diagnostics = to_lsp_diagnostics(source, &diagnostics);
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }
}

/// Convert a set whose ranges are byte offsets into `snapshot`
pub fn to_lsp_diagnostics(snapshot: &str, diagnostics: &[Diagnostic]) -> Vec<lsp_types::Diagnostic> {
    diagnostics
        .iter()
        .map(|d| to_lsp_diagnostic(snapshot, d))
        .collect()
}

pub fn to_lsp_diagnostic(text: &str, diagnostic: &Diagnostic) -> lsp_types::Diagnostic {
    let severity = match diagnostic.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    };

    let range = diagnostic
        .range
        .and_then(|r| Some(Range::new(position_at(text, r.start)?, position_at(text, r.end)?)))
        .unwrap_or_else(|| whole_line(diagnostic.line));

    lsp_types::Diagnostic::new(
        range,
        Some(severity),
        None,
        Some(DIAGNOSTIC_SOURCE.to_string()),
        diagnostic.message.clone(),
        None,
        None,
    )
}

/// LSP position (UTF-16 columns) of a byte offset
pub fn position_at(text: &str, offset: usize) -> Option<Position> {
    let before = text.get(..offset)?;
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let character = before[line_start..].encode_utf16().count();

    Some(Position::new(
        u32::try_from(line).ok()?,
        u32::try_from(character).ok()?,
    ))
}

fn whole_line(line: usize) -> Range {
    let zero_based = u32::try_from(line.saturating_sub(1)).unwrap_or(u32::MAX);
    Range::new(
        Position::new(zero_based, 0),
        Position::new(zero_based.saturating_add(1), 0),
    )
}
