use std::path::PathBuf;

use thiserror::Error;

/// The result type for the `vimsyn` crate.
pub type Result<T> = std::result::Result<T, VimsynError>;

/// The error type for the `vimsyn` crate.
#[derive(Error, Debug)]
pub struct VimsynError {
    /// The source of the error.
    pub source: Box<VimsynErrorKind>,
}

impl VimsynError {
    /// Create a new `VimsynError`.
    pub fn new(kind: VimsynErrorKind) -> Self {
        VimsynError {
            source: Box::new(kind),
        }
    }

    /// Returns true if the error is an engine fault.
    /// Engine faults indicate a broken rule table or input the grammar does not cover at all.
    /// They are never wrapped with file and line context by the script parser.
    pub fn is_engine_fault(&self) -> bool {
        matches!(
            *self.source,
            VimsynErrorKind::NoMatchingRule { .. }
                | VimsynErrorKind::EmptyStateStack
                | VimsynErrorKind::EmptyIfStack
                | VimsynErrorKind::UnknownOffsetCode(_)
        )
    }

    /// Returns the kind of the error.
    pub fn kind(&self) -> &VimsynErrorKind {
        &self.source
    }
}

impl std::fmt::Display for VimsynError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// The error kind type.
#[derive(Error, Debug)]
pub enum VimsynErrorKind {
    /// No lex rule matched at the given position.
    #[error("No rule matches at offset {offset} (line {line}, column {column}): '{vicinity}'")]
    NoMatchingRule {
        /// Byte offset of the failing character
        offset: usize,
        /// One-based line
        line: usize,
        /// One-based column
        column: usize,
        /// The text around the failing character with the character itself delimited
        vicinity: String,
    },

    /// The lexical state stack was popped while empty.
    #[error("Attempt to pop an empty lex state stack")]
    EmptyStateStack,

    /// The if-statement stack was popped while empty.
    #[error("':endif' without matching ':if'")]
    EmptyIfStack,

    /// An offset code that the offset grammar should never deliver.
    #[error("Unknown pattern offset code '{0}'")]
    UnknownOffsetCode(String),

    /// Placeholder substitution did not reach a fixed point.
    #[error("Placeholder substitution does not terminate for '{0}'")]
    CyclicSubstitution(String),

    /// A rule regex could not be compiled.
    #[error("'{1}' {0}")]
    RegexBuild(Box<regex_automata::meta::BuildError>, String),

    /// A parse rule or pattern regex could not be compiled.
    #[error(transparent)]
    RegexError(#[from] regex::Error),

    /// A malformed offset specification.
    #[error("Invalid pattern offset: {0}")]
    InvalidOffset(String),

    /// An expression could not be evaluated.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// An expression could not be parsed.
    #[error("Syntax error in expression '{expression}': {message}")]
    ExpressionSyntax {
        /// The expression text
        expression: String,
        /// What went wrong
        message: String,
    },

    /// A Vim regex could not be converted.
    #[error("Cannot convert Vim regex '{vim_regex}': {message}")]
    RegexConversion {
        /// The Vim regex
        vim_regex: String,
        /// What went wrong
        message: String,
    },

    /// A converted regex failed to compile in verification mode.
    #[error("Converted regex '{converted}' of Vim regex '{vim_regex}' is invalid: {source}")]
    RegexVerification {
        /// The Vim regex
        vim_regex: String,
        /// The converted regex
        converted: String,
        /// The compiler error
        source: Box<fancy_regex::Error>,
    },

    /// A region without start or end pattern.
    #[error("Region of group '{0}' needs at least one start and one end pattern")]
    InvalidRegion(String),

    /// A script command that is recognized but malformed.
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    /// Cluster names must start with '@'.
    #[error("Invalid cluster name '{0}', cluster names start with '@'")]
    InvalidClusterName(String),

    /// A syntax file was not found.
    #[error("Syntax file not found: {}", .0.display())]
    SyntaxFileNotFound(PathBuf),

    /// Imports nest too deeply, most probably a cyclic `runtime` chain.
    #[error("Maximum include depth of {0} exceeded")]
    MaxIncludeDepth(usize),

    /// A line of a script could not be processed.
    #[error("{}:{line}: {source}", .file.display())]
    ParsingFailed {
        /// The script file
        file: PathBuf,
        /// The line number of the first physical line of the logical line
        line: usize,
        /// The underlying error
        source: VimsynError,
    },

    /// A std::io error occurred.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// The definition could not be serialized.
    #[cfg(feature = "serde")]
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl From<std::io::Error> for VimsynError {
    fn from(error: std::io::Error) -> Self {
        VimsynError::new(VimsynErrorKind::IoError(error))
    }
}

impl From<regex::Error> for VimsynError {
    fn from(error: regex::Error) -> Self {
        VimsynError::new(VimsynErrorKind::RegexError(error))
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for VimsynError {
    fn from(error: serde_json::Error) -> Self {
        VimsynError::new(VimsynErrorKind::SerdeJson(error))
    }
}

impl From<VimsynErrorKind> for VimsynError {
    fn from(kind: VimsynErrorKind) -> Self {
        VimsynError::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_fault_classification() {
        assert!(VimsynError::new(VimsynErrorKind::EmptyStateStack).is_engine_fault());
        assert!(VimsynError::new(VimsynErrorKind::EmptyIfStack).is_engine_fault());
        assert!(!VimsynError::new(VimsynErrorKind::InvalidOffset("lc=".into())).is_engine_fault());
    }

    #[test]
    fn test_parsing_failed_display() {
        let inner = VimsynError::new(VimsynErrorKind::MalformedCommand("syn match".into()));
        let err = VimsynError::new(VimsynErrorKind::ParsingFailed {
            file: PathBuf::from("c.vim"),
            line: 12,
            source: inner,
        });
        assert_eq!("c.vim:12: Malformed command: syn match", err.to_string());
    }
}
