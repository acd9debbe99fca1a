//! Checker Output Parser
//!
//! Turns the interpreter's free-text diagnostic stream into structured
//! candidate lines. Each step is a small boundary function so the
//! truncation rules can be tested on their own.

use super::diagnostic::RawDiagnosticLine;

/// Substring that introduces the referenced source line number
pub const LINE_MARKER: &str = " line ";

/// Parse raw checker output into candidate diagnostics, in output order
///
/// Only the first `max_diagnostics` non-empty lines are considered. Lines
/// that do not mention `input_path` or carry no usable line reference are
/// dropped.
pub fn parse_output(
    raw: &str,
    input_path: &str,
    max_diagnostics: usize,
) -> Vec<RawDiagnosticLine> {
    let lines = retain_lines(raw, max_diagnostics);

    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let continuation = lines
                .get(i + 1)
                .copied()
                .filter(|next| is_continuation(next));
            parse_line(line, input_path, continuation)
        })
        .collect()
}

/// Split output into lines, dropping empty ones and anything after a `\r`,
/// keeping at most `max` of them
pub fn retain_lines(raw: &str, max: usize) -> Vec<&str> {
    raw.split('\n')
        .filter(|line| !line.is_empty())
        .map(strip_carriage_return)
        .take(max)
        .collect()
}

/// Parse one retained output line
pub fn parse_line(
    line: &str,
    input_path: &str,
    continuation: Option<&str>,
) -> Option<RawDiagnosticLine> {
    if input_path.is_empty() || !line.contains(input_path) {
        return None;
    }

    let stripped = strip_path(line, input_path);
    let marker = stripped.find(LINE_MARKER)?;
    let digits_start = marker + LINE_MARKER.len();

    let clause = truncate_after_line_number(&stripped, digits_start);
    let end = sentence_end(clause, marker)?;
    let line_number = clause.get(digits_start..end)?.parse::<usize>().ok()?;

    let mut message = stripped.clone();
    if let Some(next) = continuation {
        message.push(' ');
        message.push_str(next.trim_start());
    }

    Some(RawDiagnosticLine {
        line: line_number,
        message,
        summary: clause[..end].to_string(),
        has_continuation: continuation.is_some(),
    })
}

fn strip_carriage_return(line: &str) -> &str {
    match line.find('\r') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Remove every `"<path> "` occurrence; a path not followed by a space stays
fn strip_path(line: &str, input_path: &str) -> String {
    line.replace(&format!("{input_path} "), "")
}

/// Cut at the first space after the line-number region
///
/// The search starts one character past the marker so that at least one
/// digit is always kept.
fn truncate_after_line_number(line: &str, digits_start: usize) -> &str {
    let search_from = digits_start + 1;
    line.get(search_from..)
        .and_then(|rest| rest.find(' '))
        .map(|pos| &line[..search_from + pos])
        .unwrap_or(line)
}

/// Position of the first `.` at or after `from`, falling back to the first `,`
fn sentence_end(clause: &str, from: usize) -> Option<usize> {
    let tail = clause.get(from..)?;
    tail.find('.').or_else(|| tail.find(',')).map(|pos| from + pos)
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}
