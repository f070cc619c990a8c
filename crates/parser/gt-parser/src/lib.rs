//! Lexer and recursive-descent parser for Garnet source
//!
//! [`parse`] turns one unit of source text into a [`gt_syntax::Node`] tree.
//! Warnings go to the caller's [`DiagnosticSink`]; a malformed program
//! yields a [`ParseError`] carrying the first syntax error, with every later
//! error recorded in the sink.

pub mod error;
pub mod lexer;
mod parser;
mod support;

pub use error::{InternalError, ParseError, SyntaxError};
pub use support::capture_local_names;

use error::Failure;
use gt_diagnostics::DiagnosticSink;
use gt_span::LineIndex;
use gt_syntax::Node;
use miette::NamedSource;
use serde::{Deserialize, Serialize};

/// Options for one parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// File name used in `__FILE__` and messages
    pub filename: String,
    /// Line number of the first line
    pub line: u32,
    /// Source came from `-e`
    pub inline_source: bool,
    /// Source is an `eval` string
    pub eval: bool,
    /// Encoding when no magic comment names one
    pub default_encoding: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            filename: "-".to_string(),
            line: 1,
            inline_source: false,
            eval: false,
            default_encoding: "UTF-8".to_string(),
        }
    }
}

/// A parsed unit
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Root of the tree
    pub root: Node,
    /// Top-level local names in slot order
    pub locals: Vec<String>,
    /// Source encoding, from a magic comment or the default
    pub encoding: String,
    /// Bytes after `__END__`
    pub data: Option<Vec<u8>>,
}

/// Parse one unit of source
///
/// # Errors
///
/// Returns the first syntax error, or an internal error when the parser's
/// own bookkeeping breaks.
pub fn parse(source: &[u8], config: &ParserConfig, sink: &mut DiagnosticSink) -> Result<ParseResult, ParseError> {
    let encoding = magic_encoding(source).unwrap_or_else(|| config.default_encoding.clone());
    let utf8 = encoding.eq_ignore_ascii_case("utf-8");
    tracing::debug!(file = %config.filename, bytes = source.len(), %encoding, "parsing");

    let support = support::ParserSupport::new(sink, &config.filename, &encoding, config.inline_source, config.eval);
    let parser = parser::Parser::new(source, config.line, utf8, support);
    match parser.parse_program() {
        Ok(program) => Ok(ParseResult {
            root: program.root,
            locals: program.locals,
            encoding,
            data: program.data_start.and_then(|start| source.get(start..)).map(<[u8]>::to_vec),
        }),
        Err(Failure::Internal(error)) => Err(ParseError::Internal(error)),
        Err(Failure::Syntax { message, span }) => {
            let line = LineIndex::new(source, config.line).line_of(span.start);
            let text = String::from_utf8_lossy(source).into_owned();
            let length = (span.end - span.start).max(1) as usize;
            Err(ParseError::Syntax(SyntaxError {
                file: config.filename.clone(),
                line,
                message,
                span: (span.start as usize, length).into(),
                src: NamedSource::new(config.filename.clone(), text),
            }))
        }
    }
}

/// Encoding named by a `coding:` comment on the first two lines
fn magic_encoding(source: &[u8]) -> Option<String> {
    source
        .split(|byte| *byte == b'\n')
        .take(2)
        .filter(|line| line.first() == Some(&b'#'))
        .find_map(|line| {
            let text = String::from_utf8_lossy(line);
            let at = text.find("coding")?;
            let rest = text[at + "coding".len()..].strip_prefix([':', '='])?;
            let name: String = rest
                .trim_start()
                .chars()
                .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_')
                .collect();
            (!name.is_empty()).then_some(name)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_comment_sets_encoding() {
        assert_eq!(magic_encoding(b"# -*- coding: binary -*-\nx = 1").as_deref(), Some("binary"));
        assert_eq!(magic_encoding(b"#!/usr/bin/env ruby\n# encoding=EUC-JP\n").as_deref(), Some("EUC-JP"));
        assert_eq!(magic_encoding(b"x = 1\n\n# coding: utf-8"), None);
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: ParserConfig = serde_json::from_str(r#"{"filename": "a.rb"}"#).expect("valid config");
        assert_eq!(config.filename, "a.rb");
        assert_eq!(config.line, 1);
        assert_eq!(config.default_encoding, "UTF-8");
    }
}
