mod builder;
pub use builder::ScriptParserBuilder;

mod commands;

mod conditional;
use conditional::{strip_comment, IfStatement};

mod delimited;
use delimited::DelimitedPatterns;
pub use delimited::DelimitedPattern;

mod loader;
pub use loader::SyntaxLoader;

mod options;
use options::{LineKind, OptionScanner};
pub use options::SyntaxOption;

mod parser;
pub use parser::ScriptParser;

pub(crate) mod rules;
use rules::ScriptRules;
