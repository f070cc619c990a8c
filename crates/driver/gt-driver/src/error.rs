use gt_parser::{InternalError, SyntaxError};
use gt_translate::TranslateError;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Why a unit produced no executable graph
#[derive(Error, Debug, Diagnostic)]
pub enum CompileError {
    /// The program is malformed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    /// The parser's bookkeeping broke
    #[error("internal parser error: {0}")]
    #[diagnostic(code(driver::parser_internal))]
    Internal(#[from] InternalError),

    /// The translator's bookkeeping broke
    #[error(transparent)]
    #[diagnostic(transparent)]
    Translate(#[from] TranslateError),

    /// The source file could not be read
    #[error("cannot read {}: {source}", path.display())]
    #[diagnostic(code(driver::io))]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },

    /// A configuration file could not be understood
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(driver::config))]
    Config(#[from] toml::de::Error),
}

impl CompileError {
    /// Whether the user's program is at fault rather than the tooling
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }
}

impl From<gt_parser::ParseError> for CompileError {
    fn from(error: gt_parser::ParseError) -> Self {
        match error {
            gt_parser::ParseError::Syntax(error) => Self::Syntax(error),
            gt_parser::ParseError::Internal(error) => Self::Internal(error),
        }
    }
}
