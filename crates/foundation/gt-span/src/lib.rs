//! Source files, byte spans and line-tagged positions

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A unique identifier for a source file
#[derive(Copy, Clone, Debug, Default, Display, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[display("file#{_0}")]
pub struct FileId(pub u32);

impl FileId {
    /// Create a file id
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A byte offset span in a source file
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// First byte
    pub start: u32,
    /// One past the last byte
    pub end: u32,
}

impl Span {
    /// Create a span from byte offsets
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Byte range covered by this span
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Length in bytes
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no bytes
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Smallest span covering both `self` and `other`
    #[must_use]
    pub fn to(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Where a syntax or executable node came from.
///
/// Lines are 1-based and already include the unit's starting line offset,
/// so eval'd code reports the caller-supplied line numbers.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Source file
    pub file: FileId,
    /// 1-based line
    pub line: u32,
    /// Byte span inside the file
    pub span: Span,
}

impl Position {
    /// Create a position
    pub fn new(file: FileId, line: u32, span: Span) -> Self {
        Self { file, line, span }
    }

    /// Position that starts at `self` and ends where `other` ends
    #[must_use]
    pub fn extend_to(self, other: Self) -> Self {
        Self {
            file: self.file,
            line: self.line,
            span: self.span.to(other.span),
        }
    }
}

/// Maps byte offsets back to line numbers
#[derive(Clone, Debug)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    first_line: u32,
}

impl LineIndex {
    /// Index `source`, numbering its first line `first_line`
    pub fn new(source: &[u8], first_line: u32) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in source.iter().enumerate() {
            if *byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        Self {
            line_starts,
            first_line,
        }
    }

    /// Line containing `offset`
    pub fn line_of(&self, offset: u32) -> u32 {
        let index = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(insert_at) => insert_at - 1,
        };
        self.first_line + index as u32
    }

    /// Number of lines in the indexed source
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_counts_from_first_line() {
        let index = LineIndex::new(b"a\nbb\n\nc", 10);
        assert_eq!(index.line_of(0), 10);
        assert_eq!(index.line_of(2), 11);
        assert_eq!(index.line_of(5), 12);
        assert_eq!(index.line_of(6), 13);
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn test_span_join() {
        let joined = Span::new(4, 6).to(Span::new(1, 5));
        assert_eq!(joined, Span::new(1, 6));
        assert_eq!(joined.len(), 5);
        assert!(Span::new(3, 3).is_empty());
    }
}
