//! Errors raised by the lexer and parser
//!
//! While parsing, failures are carried as the lightweight [`Failure`];
//! source context is attached once when the unit is abandoned.

use gt_span::Span;
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::fmt;
use thiserror::Error;

pub use codespan_reporting;

/// A syntax error in the user's program
#[derive(Error, Debug, Clone, Diagnostic)]
#[error("{file}:{line}: {message}")]
#[diagnostic(code(parser::syntax_error))]
pub struct SyntaxError {
    /// File name as given by the caller
    pub file: String,
    /// 1-based line
    pub line: u32,
    /// What went wrong
    pub message: String,
    /// Offending source
    #[label("{message}")]
    pub span: SourceSpan,
    /// Source code for context
    #[source_code]
    pub src: NamedSource<String>,
}

impl SyntaxError {
    /// Convert to codespan diagnostic for rustc-style output
    pub fn to_codespan_diagnostic(
        &self,
        file_id: usize,
    ) -> codespan_reporting::diagnostic::Diagnostic<usize> {
        use codespan_reporting::diagnostic::{Diagnostic, Label};

        let start = self.span.offset();
        Diagnostic::error()
            .with_message(&self.message)
            .with_code("E0001")
            .with_labels(vec![
                Label::primary(file_id, start..start + self.span.len()).with_message(&self.message),
            ])
    }
}

/// A broken invariant in the parser's own bookkeeping
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum InternalError {
    /// More scopes popped than pushed
    #[error("static scope stack underflow")]
    #[diagnostic(code(parser::scope_underflow))]
    ScopeUnderflow,

    /// Lexer mode stack out of step with the token stream
    #[error("lexer string stack out of balance")]
    #[diagnostic(code(parser::string_stack))]
    StringStack,
}

/// Everything `parse` can fail with
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum ParseError {
    /// The program is malformed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(SyntaxError),

    /// The parser is broken
    #[error("internal parser error: {0}")]
    #[diagnostic(code(parser::internal))]
    Internal(InternalError),
}

impl ParseError {
    /// The syntax error, if this is one
    pub fn as_syntax(&self) -> Option<&SyntaxError> {
        match self {
            Self::Syntax(error) => Some(error),
            Self::Internal(_) => None,
        }
    }
}

/// Failure raised while the parse is still running
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Failure {
    /// Malformed input at `span`
    Syntax {
        /// Message
        message: String,
        /// Offending bytes
        span: Span,
    },
    /// Broken bookkeeping
    Internal(InternalError),
}

impl Failure {
    pub(crate) fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::Syntax {
            message: message.into(),
            span,
        }
    }
}

impl From<InternalError> for Failure {
    fn from(error: InternalError) -> Self {
        Self::Internal(error)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { message, .. } => formatter.write_str(message),
            Self::Internal(error) => write!(formatter, "{error}"),
        }
    }
}

pub(crate) type PResult<T> = Result<T, Failure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display_and_codespan() {
        let error = SyntaxError {
            file: "t.rb".to_string(),
            line: 2,
            message: "unterminated string meets end of file".to_string(),
            span: (4, 3).into(),
            src: NamedSource::new("t.rb", "x = 1\n\"abc".to_string()),
        };
        assert_eq!(error.to_string(), "t.rb:2: unterminated string meets end of file");
        let diagnostic = error.to_codespan_diagnostic(0);
        assert_eq!(diagnostic.labels[0].range, 4..7);
        assert_eq!(diagnostic.code.as_deref(), Some("E0001"));
    }

    #[test]
    fn test_internal_errors_are_distinct() {
        let error = ParseError::Internal(InternalError::ScopeUnderflow);
        assert!(error.as_syntax().is_none());
        assert_eq!(error.to_string(), "internal parser error: static scope stack underflow");
    }
}
