use std::path::Path;

use crate::{EvaluatorDefaults, Result, ScriptParser, VimsynError, VimsynErrorKind};

/// A builder for creating a script parser.
#[derive(Debug, Clone)]
pub struct ScriptParserBuilder {
    verify_regexes: bool,
    evaluator_defaults: EvaluatorDefaults,
}

impl Default for ScriptParserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptParserBuilder {
    /// Creates a builder with the Vim evaluator defaults and without regex verification.
    pub fn new() -> Self {
        Self {
            verify_regexes: false,
            evaluator_defaults: EvaluatorDefaults::vim(),
        }
    }

    /// Compile every converted regex while parsing. Regexes the `fancy-regex` crate rejects
    /// fail the parse.
    pub fn verify_regexes(mut self, verify_regexes: bool) -> Self {
        self.verify_regexes = verify_regexes;
        self
    }

    /// Replaces the variables and functions the scripts see.
    pub fn evaluator_defaults(mut self, evaluator_defaults: EvaluatorDefaults) -> Self {
        self.evaluator_defaults = evaluator_defaults;
        self
    }

    /// Builds a parser for the given root script.
    pub fn build(&self, path: impl AsRef<Path>) -> Result<ScriptParser> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(VimsynError::new(VimsynErrorKind::SyntaxFileNotFound(
                path.to_path_buf(),
            )));
        }
        ScriptParser::new(
            path.to_path_buf(),
            &self.evaluator_defaults,
            self.verify_regexes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn test_missing_root_script() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScriptParserBuilder::new()
            .build(dir.path().join("nothere.vim"))
            .unwrap_err();
        assert!(matches!(*err.source, VimsynErrorKind::SyntaxFileNotFound(_)));
        let err = ScriptParserBuilder::new().build(dir.path()).unwrap_err();
        assert!(matches!(*err.source, VimsynErrorKind::SyntaxFileNotFound(_)));
    }

    #[test]
    fn test_evaluator_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sh.vim");
        std::fs::write(
            &path,
            "if exists(\"b:is_kornshell\")\n syn keyword shStatement print\nendif\n",
        )
        .unwrap();
        let builder = ScriptParserBuilder::new();
        let parser = builder.build(&path).unwrap();
        assert_eq!(Value::Int(700), parser.evaluator().get_variable("version"));
        assert!(parser.parse().unwrap().group("shStatement").is_none());

        let parser = builder
            .clone()
            .evaluator_defaults(EvaluatorDefaults::vim().with_variable("b:is_kornshell", Value::Int(1)))
            .build(&path)
            .unwrap();
        let definition = parser.parse().unwrap();
        assert_eq!("sh", definition.syntax_id());
        assert_eq!(1, definition.group("shStatement").unwrap().items().len());
    }
}
