//! Diagnostic events emitted while parsing and translating
//!
//! Warnings never abort a unit; they are collected here so tools can read
//! them back after the fact. Every event is also mirrored to `tracing`.

use codespan_reporting::diagnostic::{Diagnostic as CodespanDiagnostic, Label};
use gt_span::{FileId, Position};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Only reported in verbose mode
    Verbose,
    /// Advisory, never fatal
    Warning,
    /// Fatal for the unit
    Error,
}

/// Stable category of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticId {
    /// Statement whose value is discarded and has no side effect
    UselessStatement,
    /// `=` with a literal right-hand side used as a condition
    AssignmentInCondition,
    /// Same literal key twice in a hash literal
    DuplicateHashKey,
    /// Regexp literal used directly as a condition
    RegexpLiteralInCondition,
    /// Block parameter hides an outer local
    ShadowingOuterLocal,
    /// `foo -1` style call with an ambiguous argument
    AmbiguousFirstArgument,
    /// `else` in a `begin` with no `rescue`
    ElseWithoutRescue,
    /// `END {}` inside a method
    EndInMethod,
    /// Optional parameter whose default reads the parameter itself
    CircularArgumentReference,
    /// Named regexp group reuses a name that is already a local
    NamedCaptureConflict,
    /// Construct the translator cannot lower
    UnsupportedNode,
    /// Variable the translator could not resolve
    UnresolvedVariable,
    /// Multiple assignment whose shape is not understood
    UnknownMultipleAssignment,
    /// Anything the lexer or parser rejects
    SyntaxError,
    /// Follow-on error after the first syntax error
    CascadingSyntaxError,
}

impl DiagnosticId {
    /// Short stable code, e.g. `W0003`
    pub fn code(self) -> &'static str {
        match self {
            Self::UselessStatement => "W0001",
            Self::AssignmentInCondition => "W0002",
            Self::DuplicateHashKey => "W0003",
            Self::RegexpLiteralInCondition => "W0004",
            Self::ShadowingOuterLocal => "W0006",
            Self::AmbiguousFirstArgument => "W0007",
            Self::ElseWithoutRescue => "W0008",
            Self::EndInMethod => "W0009",
            Self::CircularArgumentReference => "W0010",
            Self::NamedCaptureConflict => "W0011",
            Self::UnsupportedNode => "W0100",
            Self::UnresolvedVariable => "W0101",
            Self::UnknownMultipleAssignment => "W0102",
            Self::SyntaxError => "E0001",
            Self::CascadingSyntaxError => "E0002",
        }
    }
}

impl fmt::Display for DiagnosticId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.code())
    }
}

/// One reported event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Stable category
    pub id: DiagnosticId,
    /// File name as given by the caller
    pub file: String,
    /// 1-based line
    pub line: u32,
    /// Human-readable message
    pub message: String,
    /// Source location
    pub position: Position,
}

impl Diagnostic {
    /// Convert to a codespan diagnostic for terminal rendering
    pub fn to_codespan(&self, file_id: usize) -> CodespanDiagnostic<usize> {
        let base = match self.severity {
            Severity::Error => CodespanDiagnostic::error(),
            Severity::Warning | Severity::Verbose => CodespanDiagnostic::warning(),
        };
        base.with_message(&self.message)
            .with_code(self.id.code())
            .with_labels(vec![Label::primary(file_id, self.position.span.range())])
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning | Severity::Verbose => "warning",
        };
        write!(
            formatter,
            "{}:{}: {level}[{}]: {}",
            self.file, self.line, self.id, self.message
        )
    }
}

/// Collects diagnostics for one unit
#[derive(Debug, Clone)]
pub struct DiagnosticSink {
    file: String,
    file_id: FileId,
    verbose: bool,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    /// Create a sink for `file`
    pub fn new(file: impl Into<String>, file_id: FileId, verbose: bool) -> Self {
        Self {
            file: file.into(),
            file_id,
            verbose,
            diagnostics: Vec::new(),
        }
    }

    /// File name diagnostics are attributed to
    pub fn file(&self) -> &str {
        &self.file
    }

    /// File id of the unit
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// Whether verbose-only warnings are recorded
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Record an advisory warning
    pub fn warn(&mut self, id: DiagnosticId, position: Position, message: impl Into<String>) {
        self.report(Severity::Warning, id, position, message.into());
    }

    /// Record a warning that only shows in verbose mode
    pub fn warn_verbose(&mut self, id: DiagnosticId, position: Position, message: impl Into<String>) {
        if self.verbose {
            self.report(Severity::Verbose, id, position, message.into());
        }
    }

    /// Record an error
    pub fn error(&mut self, id: DiagnosticId, position: Position, message: impl Into<String>) {
        self.report(Severity::Error, id, position, message.into());
    }

    fn report(&mut self, severity: Severity, id: DiagnosticId, position: Position, message: String) {
        match severity {
            Severity::Error => {
                tracing::error!(file = %self.file, line = position.line, id = %id, "{message}");
            }
            Severity::Warning | Severity::Verbose => {
                tracing::warn!(file = %self.file, line = position.line, id = %id, "{message}");
            }
        }
        self.diagnostics.push(Diagnostic {
            severity,
            id,
            file: self.file.clone(),
            line: position.line,
            message,
            position,
        });
    }

    /// All diagnostics so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Diagnostics with the given id
    pub fn with_id(&self, id: DiagnosticId) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |diagnostic| diagnostic.id == id)
    }

    /// Whether any error was recorded
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == Severity::Error)
    }

    /// Take all diagnostics
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Serialize the collected diagnostics as a JSON array
    ///
    /// # Errors
    /// Returns an error if serialization fails
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_span::Span;

    fn pos(line: u32) -> Position {
        Position::new(FileId(0), line, Span::new(0, 1))
    }

    #[test]
    fn test_verbose_warnings_are_gated() {
        let mut sink = DiagnosticSink::new("t.rb", FileId(0), false);
        sink.warn_verbose(DiagnosticId::UselessStatement, pos(1), "possibly useless use of + in void context");
        sink.warn(DiagnosticId::DuplicateHashKey, pos(2), "key :a is duplicated and overwritten on line 2");
        assert_eq!(sink.diagnostics().len(), 1);
        assert_eq!(sink.diagnostics()[0].line, 2);
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_display_and_json() {
        let mut sink = DiagnosticSink::new("t.rb", FileId(0), true);
        sink.error(DiagnosticId::SyntaxError, pos(3), "unterminated string meets end of file");
        assert!(sink.has_errors());
        assert_eq!(
            sink.diagnostics()[0].to_string(),
            "t.rb:3: error[E0001]: unterminated string meets end of file"
        );
        let json = sink.to_json().expect("serializable");
        assert!(json.contains("\"syntax_error\""));
        assert!(json.contains("\"line\": 3"));
    }
}
