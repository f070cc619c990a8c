//! Options for translating one unit

use crate::CompileError;
use gt_parser::ParserConfig;
use serde::{Deserialize, Serialize};

/// How a unit of source is read and what is kept from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// File name reported in positions and messages
    pub filename: String,
    /// Line number of the first line
    pub line: u32,
    /// Source is an `eval` string
    pub eval: bool,
    /// Source came from `-e`
    pub inline_source: bool,
    /// Keep the bytes after `__END__`
    pub save_data: bool,
    /// Report verbose-only warnings
    pub verbose: bool,
    /// Encoding when no magic comment names one
    pub default_encoding: String,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        let parser = ParserConfig::default();
        Self {
            filename: parser.filename,
            line: parser.line,
            eval: parser.eval,
            inline_source: parser.inline_source,
            save_data: false,
            verbose: false,
            default_encoding: parser.default_encoding,
        }
    }
}

impl TranslateConfig {
    /// Configuration for the file `filename`, everything else default
    pub fn for_file(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Read a configuration from TOML; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Config`] when the text is not valid TOML or a
    /// key has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, CompileError> {
        Ok(toml::from_str(text)?)
    }

    /// The parser's share of the options
    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            filename: self.filename.clone(),
            line: self.line,
            inline_source: self.inline_source,
            eval: self.eval,
            default_encoding: self.default_encoding.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_parser() {
        let config = TranslateConfig::default();
        assert_eq!(config.parser_config(), ParserConfig::default());
        assert!(!config.save_data);
        assert!(!config.verbose);
    }

    #[test]
    fn test_partial_toml() {
        let config = TranslateConfig::from_toml_str("filename = \"app.rb\"\nline = 10\nsave_data = true\n")
            .expect("valid config");
        assert_eq!(config.filename, "app.rb");
        assert_eq!(config.line, 10);
        assert!(config.save_data);
        assert_eq!(config.default_encoding, "UTF-8");
    }

    #[test]
    fn test_bad_toml_is_a_config_error() {
        let error = TranslateConfig::from_toml_str("line = \"ten\"").expect_err("wrong type");
        assert!(matches!(error, CompileError::Config(_)));
    }
}
