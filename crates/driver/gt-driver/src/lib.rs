//! Translation driver and high-level APIs
//!
//! This crate runs the whole pipeline for one unit of source: parse into a
//! syntax tree, lower it into an executable graph, and hand back the graph
//! together with every diagnostic recorded on the way.

mod config;
mod error;

pub use config::TranslateConfig;
pub use error::CompileError;

use gt_diagnostics::{Diagnostic, DiagnosticSink};
use gt_exec::{ExecGraph, ExecId, FrameId, MethodId};
use gt_intern::Interner;
use gt_span::FileId;
use gt_translate::Translator;
use std::path::Path;

/// A fully translated unit, ready for an evaluator
#[derive(Debug, Clone)]
pub struct ExecUnit {
    /// Nodes, frames and callables
    pub graph: ExecGraph,
    /// Entry node of the top-level body
    pub root: ExecId,
    /// Top-level frame layout
    pub root_frame: FrameId,
    /// Top-level callable info
    pub root_method: MethodId,
    /// Warnings recorded while parsing and translating
    pub diagnostics: Vec<Diagnostic>,
    /// Source encoding
    pub encoding: String,
    /// Bytes after `__END__`, when kept
    pub data_segment: Option<Vec<u8>>,
}

impl ExecUnit {
    /// The top-level body as an s-expression
    pub fn render(&self) -> String {
        self.graph.render(self.root)
    }
}

/// Parse and translate one unit of source
///
/// # Errors
///
/// Returns [`CompileError::Syntax`] for a malformed program and
/// [`CompileError::Internal`] or [`CompileError::Translate`] when the
/// tooling itself breaks. No partial unit is returned.
pub fn translate_source(source: &[u8], config: &TranslateConfig) -> Result<ExecUnit, CompileError> {
    let mut sink = DiagnosticSink::new(config.filename.clone(), FileId(0), config.verbose);
    let parsed = gt_parser::parse(source, &config.parser_config(), &mut sink)?;
    let translated = Translator::new(&mut sink, Interner::new()).translate_root(&parsed)?;
    tracing::debug!(
        file = %config.filename,
        nodes = translated.graph.len(),
        warnings = sink.diagnostics().len(),
        "translated unit"
    );

    Ok(ExecUnit {
        graph: translated.graph,
        root: translated.root,
        root_frame: translated.root_frame,
        root_method: translated.root_method,
        diagnostics: sink.into_diagnostics(),
        encoding: parsed.encoding,
        data_segment: if config.save_data { parsed.data } else { None },
    })
}

/// Read and translate a source file
///
/// The file name in `config` is replaced by `path`.
///
/// # Errors
///
/// Returns [`CompileError::Io`] when the file cannot be read, otherwise the
/// same errors as [`translate_source`].
pub fn translate_file(path: impl AsRef<Path>, config: &TranslateConfig) -> Result<ExecUnit, CompileError> {
    let path = path.as_ref();
    let source = std::fs::read(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = TranslateConfig {
        filename: path.display().to_string(),
        ..config.clone()
    };
    translate_source(&source, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_diagnostics::DiagnosticId;
    use std::io::Write;

    #[test]
    fn test_translate_source() {
        let unit = translate_source(b"x = 1\nx", &TranslateConfig::default()).expect("translates");
        assert_eq!(unit.render(), "(catch-retry (catch-next (catch-return#1 (seq (lasgn x@0 1) x@0))))");
        assert_eq!(unit.encoding, "UTF-8");
        assert_eq!(unit.graph.frame(unit.root_frame).slot_count(), 1);
        assert_eq!(unit.graph.method(unit.root_method).name, "<main>");
        assert!(unit.diagnostics.is_empty());
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let error = translate_source(b"def m(a, a)\nend", &TranslateConfig::default()).expect_err("rejected");
        assert!(error.is_user_error());
        assert!(error.to_string().ends_with("duplicated argument name"));
    }

    #[test]
    fn test_data_segment_kept_on_request() {
        let source = b"p 1\n__END__\nraw\n";
        let unit = translate_source(source, &TranslateConfig::default()).expect("translates");
        assert_eq!(unit.data_segment, None);

        let config = TranslateConfig {
            save_data: true,
            ..TranslateConfig::default()
        };
        let unit = translate_source(source, &config).expect("translates");
        assert_eq!(unit.data_segment.as_deref(), Some(&b"raw\n"[..]));
    }

    #[test]
    fn test_verbose_warnings_are_gated() {
        let quiet = translate_source(b"1\n2", &TranslateConfig::default()).expect("translates");
        assert_eq!(
            quiet.diagnostics.iter().filter(|diagnostic| diagnostic.id == DiagnosticId::UselessStatement).count(),
            0
        );

        let config = TranslateConfig {
            verbose: true,
            ..TranslateConfig::default()
        };
        let verbose = translate_source(b"1\n2", &config).expect("translates");
        assert_eq!(
            verbose.diagnostics.iter().filter(|diagnostic| diagnostic.id == DiagnosticId::UselessStatement).count(),
            1
        );
    }

    #[test]
    fn test_translator_warnings_reach_the_unit() {
        let unit = translate_source(b"END { 1 }", &TranslateConfig::default()).expect("translates");
        assert_eq!(unit.diagnostics.len(), 1);
        assert_eq!(unit.diagnostics[0].id, DiagnosticId::UnsupportedNode);
    }

    #[test]
    fn test_translate_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"def greet(name)\n  \"hi #{name}\"\nend\n").expect("write");
        let unit = translate_file(file.path(), &TranslateConfig::default()).expect("translates");
        assert!(unit.render().contains("(def greet/1 [name]"));
        assert!(unit.render().contains("(dstr \"hi \" name@0"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = translate_file(dir.path().join("absent.rb"), &TranslateConfig::default()).expect_err("missing");
        assert!(matches!(error, CompileError::Io { .. }));
        assert!(!error.is_user_error());
    }
}
