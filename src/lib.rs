#![forbid(missing_docs)]
//! # `vimsyn`
//! The `vimsyn` crate reads Vim syntax scripts and turns them into a rule model that can drive a
//! syntax highlighter outside of Vim.
//! A syntax script is a sequence of `syn keyword`, `syn match`, `syn region` and `syn cluster`
//! commands, wrapped into `if` chains and `let` statements and spread over several files with
//! `syn include` and `runtime`. The crate evaluates the conditions, follows the imports and
//! converts the Vim regexes into regexes of the `fancy-regex` dialect.
//!
//! The building blocks are usable on their own:
//! - [EasyLex] is a small rule driven lexer with lexical states, used for the expression
//!   evaluator and the Vim regex converter.
//! - [ParseRule] dispatches whole lines to callbacks.
//! - [VimRegexConverter] converts a Vim regex.
//! - [ScriptParser] puts everything together and builds a [SyntaxDefinition].
//!
//! # Example
//! ```rust
//! use vimsyn::{ItemKind, ScriptParserBuilder};
//!
//! const SCRIPT: &str = r#"
//! if exists("b:current_syntax")
//!   finish
//! endif
//! syn keyword cStatement goto break return continue
//! syn match cNumber "\<\d\+\>"
//! syn region cString start=+"+ skip=+\\\\\|\\"+ end=+"+ contains=@Spell
//! hi def link cStatement Statement
//! let b:current_syntax = "c"
//! "#;
//!
//! fn main() {
//!     let dir = tempfile::tempdir().expect("temporary directory");
//!     let path = dir.path().join("c.vim");
//!     std::fs::write(&path, SCRIPT).expect("script written");
//!
//!     let definition = ScriptParserBuilder::new()
//!         .verify_regexes(true)
//!         .build(&path)
//!         .and_then(|parser| parser.parse())
//!         .expect("script parsed");
//!
//!     assert_eq!(4, definition.group("cStatement").unwrap().items().len());
//!     assert_eq!("Statement", definition.resolve_highlight("cStatement"));
//!     let number = definition.group("cNumber").unwrap().items()[0];
//!     match &definition.item(number).kind {
//!         ItemKind::Match { pattern, .. } => println!("cNumber: {}", pattern.regex),
//!         _ => unreachable!(),
//!     }
//! }
//! ```
//!
//! # Crate features
//! - `serde`: enabled by default. Derives `Serialize` for the syntax model and provides
//!   [SyntaxDefinition::to_json].

/// Module that provides the lexer
mod easy_lex;
pub use easy_lex::{EasyLex, LexControl};

/// Module with error definitions
mod errors;
pub use errors::{Result, VimsynError, VimsynErrorKind};

/// Module that provides the expression evaluator
mod evaluator;
pub use evaluator::{Builtin, BuiltinFn, Evaluator, EvaluatorDefaults, Value};

/// Module that provides lex rules
mod lex_rule;
pub use lex_rule::{substitute_placeholders, Action, LexMatch, LexRule, PreCondition, YyText};

/// Module that provides lexical states
mod lex_state;
pub use lex_state::{LexState, StateSet};

/// Module that provides line rules
mod parse_rule;
pub use parse_rule::{ParseCallback, ParseRule, ParseRuleSet};

/// The module with the Vim regex converter.
mod regex_conversion;
pub use regex_conversion::{
    has_magic_regex_chars, ConversionOptions, ConvertedRegex, Magicness, VimRegexConverter,
};

/// The module with the syntax script parser.
mod script;
pub use script::{DelimitedPattern, ScriptParser, ScriptParserBuilder, SyntaxLoader, SyntaxOption};

/// The module with the syntax model.
mod syntax;
pub use syntax::{
    Cluster, ClusterId, ClusterType, ContextId, HighlightGroup, ItemFlags, ItemId, ItemKind,
    KeywordChars, OffsetType, Pattern, PatternOffset, SyntaxContext, SyntaxDefinition,
    SyntaxItem, Whence, DEFAULT_KEYWORD_CHARS,
};
