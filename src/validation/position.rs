//! Line number to byte range mapping.

use thiserror::Error;

use super::diagnostic::ByteRange;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("line numbers are 1-based, got 0")]
    ZeroLine,
    #[error("line {line} is out of range, text has {available} lines")]
    OutOfRange { line: usize, available: usize },
}

/// Byte offset where 1-based `line` starts
pub fn line_start_offset(text: &str, line: usize) -> Result<usize, PositionError> {
    if line == 0 {
        return Err(PositionError::ZeroLine);
    }
    if line == 1 {
        return Ok(0);
    }

    text.match_indices('\n')
        .nth(line - 2)
        .map(|(idx, _)| idx + 1)
        .ok_or_else(|| PositionError::OutOfRange {
            line,
            available: line_count(text),
        })
}

/// Number of lines, counting the empty one after a trailing newline
pub fn line_count(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count() + 1
}

/// Highlight range of a line: leading tabs and spaces skipped, length of the
/// trimmed content
pub fn line_range(text: &str, line: usize) -> Result<ByteRange, PositionError> {
    let line_start = line_start_offset(text, line)?;
    let rest = &text[line_start..];
    let content = match rest.find('\n') {
        Some(end) => &rest[..end],
        None => rest,
    };

    let indent = content
        .bytes()
        .take_while(|b| *b == b' ' || *b == b'\t')
        .count();
    let start = line_start + indent;

    Ok(ByteRange::new(start, start + content.trim().len()))
}
