use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;

use super::{OptionScanner, ScriptParser};
use crate::{ParseRuleSet, Result};

/// The placeholders of the script rules.
pub(crate) fn substitutions() -> FxHashMap<String, String> {
    [
        ("SyntaxCommand", r"sy(?:n(?:t(?:a(?:x)?)?)?)?"),
        (
            "KeywordOptions",
            r"contained|transparent|skipwhite|skipnl|skipempty",
        ),
        (
            "AllOptions",
            r"{KeywordOptions}|oneline|fold|display|extend|excludenl|keepend",
        ),
        (
            "ArgumentOptions",
            r"containedin|nextgroup|contains|matchgroup",
        ),
        ("OptionArgument", r"\s*=\s*(?P<argument>\S+)"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

/// The line rules of the script parser.
///
/// Conditionals are dispatched for every line, commands only while the current branch is
/// taken.
#[derive(Debug)]
pub(crate) struct ScriptRules {
    pub(crate) conditionals: ParseRuleSet<ScriptParser>,
    pub(crate) commands: ParseRuleSet<ScriptParser>,
    pub(crate) options: OptionScanner,
    pub(crate) cluster_arguments: Regex,
}

impl ScriptRules {
    pub(crate) fn new() -> Result<Self> {
        let substitutions = substitutions();

        let mut conditionals: ParseRuleSet<ScriptParser> = ParseRuleSet::new(substitutions.clone());
        conditionals
            .add(r#"^ \s* (?:" | $)"#, |_, _| Ok(()))?
            .add(
                r"^ \s* :? \s* if \b \s* (?P<condition>.*) $",
                ScriptParser::on_if,
            )?
            .add(
                r"^ \s* :? \s* elsei(?:f)? \b \s* (?P<condition>.*) $",
                ScriptParser::on_else_if,
            )?
            .add(r"^ \s* :? \s* el(?:s(?:e)?)? \b", ScriptParser::on_else)?
            .add(
                r"^ \s* :? \s* en(?:d(?:i(?:f)?)?)? \b",
                ScriptParser::on_end_if,
            )?;

        let mut commands: ParseRuleSet<ScriptParser> = ParseRuleSet::new(substitutions.clone());
        commands
            .add(
                r"^ \s* :? \s* {SyntaxCommand} \s+ case \s+ (?P<case>ignore|match) \b",
                ScriptParser::on_case,
            )?
            .add(
                r"^ \s* :? \s* {SyntaxCommand} \s+ keyword \s+ (?P<group>\S+) (?P<rest>.*) $",
                ScriptParser::on_keyword,
            )?
            .add(
                r"^ \s* :? \s* {SyntaxCommand} \s+ match \s+ (?P<group>\S+) (?P<rest>.*) $",
                ScriptParser::on_match,
            )?
            .add(
                r"^ \s* :? \s* {SyntaxCommand} \s+ region \s+ (?P<group>\S+) (?P<rest>.*) $",
                ScriptParser::on_region,
            )?
            .add(
                r"^ \s* :? \s* {SyntaxCommand} \s+ cluster \s+ (?P<name>\S+) (?P<rest>.*) $",
                ScriptParser::on_cluster,
            )?
            .add(
                r"^ \s* :? \s* {SyntaxCommand} \s+ include \s+ (?:(?P<cluster>@\S+) \s+)?
                  .*/ (?P<id>[^/\s]+) \.vim \b",
                ScriptParser::on_include,
            )?
            .add(
                r"^ \s* :? \s*
                  (?: runtime!? | so(?:u(?:r(?:c(?:e)?)?)?)? | (?:do)?au(?:t(?:o(?:c(?:m(?:d)?)?)?)?)? \s+ Syntax )
                  \s .*/ (?P<id>[^/\s]+) \.vim \b",
                ScriptParser::on_runtime,
            )?
            .add(r"^ \s* :? \s* fini(?:s(?:h)?)? \b", ScriptParser::on_finish)?
            .add(
                r"^ \s* :? \s* (?P<statement> (?:let|unl(?:e(?:t)?)?) \b .*) $",
                ScriptParser::on_let,
            )?
            .add(
                r"^ \s* :? \s*
                  (?: HiLink
                    | hi(?:g(?:h(?:l(?:i(?:g(?:h(?:t)?)?)?)?)?)?)? !? \s+ (?:def(?:a(?:u(?:l(?:t)?)?)?)? \s+)? link
                    | SynLink
                    | \w+HiLink
                    | hi\w+ \s+ link )
                  \s+ (?P<from>\w+) \s+ (?P<to>\w+)",
                ScriptParser::on_highlight_link,
            )?
            .add(
                r"^ \s* :? \s* (?:set|setl(?:o(?:c(?:a(?:l)?)?)?)?) \s+ isk(?:eyword)? (?P<plus>\+)? = (?P<list>\S+)",
                ScriptParser::on_iskeyword,
            )?
            .add(r"^ \s* SetIsk \s+ (?P<list>\S+)", ScriptParser::on_iskeyword)?;

        Ok(Self {
            conditionals,
            commands,
            options: OptionScanner::new(&substitutions)?,
            cluster_arguments: RegexBuilder::new(
                r"(?P<command>add|remove|contains) \s*=\s* (?P<list>\S+)",
            )
            .ignore_whitespace(true)
            .build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn matching_rule(rules: &ParseRuleSet<ScriptParser>, line: &str) -> Option<usize> {
        rules.rules().iter().position(|r| r.regex().is_match(line))
    }

    #[rstest]
    #[case::comment(r#"  " syn keyword X y"#, Some(0))]
    #[case::blank("   ", Some(0))]
    #[case::if_call("if exists(\"b:current_syntax\")", Some(1))]
    #[case::elseif("elseif version < 600", Some(2))]
    #[case::abbreviated_else(":el", Some(3))]
    #[case::endif("  endif", Some(4))]
    #[case::abbreviated_endif("en", Some(4))]
    #[case::endfunction("endfunction", None)]
    #[case::ifdef("ifdef", None)]
    fn test_conditional_rules(#[case] line: &str, #[case] expected: Option<usize>) {
        let rules = ScriptRules::new().unwrap();
        assert_eq!(expected, matching_rule(&rules.conditionals, line));
    }

    #[rstest]
    #[case::case("syn case ignore", Some(0))]
    #[case::keyword("syntax keyword cType int long", Some(1))]
    #[case::matches("sy match cNumber /\\d\\+/", Some(2))]
    #[case::region("syn region cString start=+\"+ end=+\"+", Some(3))]
    #[case::cluster("syn cluster cParenGroup contains=cNumber", Some(4))]
    #[case::include("syn include @cppTop syntax/cpp.vim", Some(5))]
    #[case::include_sfile("syntax include <sfile>:p:h/doxygen.vim", Some(5))]
    #[case::runtime("runtime! syntax/c.vim", Some(6))]
    #[case::source("so <sfile>:p:h/c.vim", Some(6))]
    #[case::autocmd("au Syntax * source $VIMRUNTIME/syntax/html.vim", Some(6))]
    #[case::finish("finish", Some(7))]
    #[case::let_statement("let b:current_syntax = \"c\"", Some(8))]
    #[case::unlet("unlet b:current_syntax", Some(8))]
    #[case::hi_def_link("hi def link cType Type", Some(9))]
    #[case::hilink("  HiLink cString String", Some(9))]
    #[case::prefixed_hilink("CHiLink cString String", Some(9))]
    #[case::highlight_default_link("highlight! default link cType Type", Some(9))]
    #[case::setlocal_iskeyword("setlocal iskeyword+=-", Some(10))]
    #[case::set_isk("set isk=@,48-57,_", Some(10))]
    #[case::set_isk_command("SetIsk @,48-57,_,192-255", Some(11))]
    #[case::unknown("syn sync minlines=50", None)]
    #[case::highlight_colors("hi cType guifg=Red", None)]
    fn test_command_rules(#[case] line: &str, #[case] expected: Option<usize>) {
        let rules = ScriptRules::new().unwrap();
        assert_eq!(expected, matching_rule(&rules.commands, line));
    }
}
