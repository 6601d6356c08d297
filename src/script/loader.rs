use std::path::{Path, PathBuf};

use log::info;

use crate::{Result, ScriptParserBuilder, SyntaxDefinition, VimsynError, VimsynErrorKind};

/// Finds syntax scripts by syntax id in a directory like `$VIMRUNTIME/syntax`.
#[derive(Debug, Clone)]
pub struct SyntaxLoader {
    syntax_dir: PathBuf,
    builder: ScriptParserBuilder,
}

impl SyntaxLoader {
    /// Creates a loader with the default parser configuration.
    pub fn new(syntax_dir: impl Into<PathBuf>) -> Self {
        Self {
            syntax_dir: syntax_dir.into(),
            builder: ScriptParserBuilder::new(),
        }
    }

    /// Uses the given builder for the parsers.
    pub fn with_builder(mut self, builder: ScriptParserBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// The directory the scripts are searched in.
    pub fn syntax_dir(&self) -> &Path {
        &self.syntax_dir
    }

    /// The script of a syntax id, `<syntax_dir>/<id>.vim`.
    pub fn file_for_syntax_id(&self, syntax_id: &str) -> Result<PathBuf> {
        let path = self.syntax_dir.join(format!("{syntax_id}.vim"));
        if path.is_file() {
            Ok(path)
        } else {
            Err(VimsynError::new(VimsynErrorKind::SyntaxFileNotFound(path)))
        }
    }

    /// Parses the script of a syntax id.
    pub fn build_syntax_definition(&self, syntax_id: &str) -> Result<SyntaxDefinition> {
        let path = self.file_for_syntax_id(syntax_id)?;
        info!("Loading syntax '{syntax_id}' from {}", path.display());
        self.builder.build(path)?.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_for_syntax_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("c.vim"), "syn keyword cType int\n").unwrap();
        let loader = SyntaxLoader::new(dir.path());
        assert_eq!(dir.path().join("c.vim"), loader.file_for_syntax_id("c").unwrap());
        let err = loader.file_for_syntax_id("cpp").unwrap_err();
        assert!(matches!(*err.source, VimsynErrorKind::SyntaxFileNotFound(_)));

        let definition = loader.build_syntax_definition("c").unwrap();
        assert_eq!("c", definition.syntax_id());
        assert!(definition.is_finished());
    }
}
