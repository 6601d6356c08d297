use log::debug;
use regex::{Captures, Regex, RegexBuilder};
use rustc_hash::FxHashMap;

use super::{DelimitedPattern, DelimitedPatterns};
use crate::{substitute_placeholders, Result, VimsynError, VimsynErrorKind};

/// An option of a `syn keyword`, `syn match` or `syn region` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxOption {
    /// `contained`
    Contained,
    /// `transparent`
    Transparent,
    /// `skipwhite`
    SkipWhite,
    /// `skipnl`
    SkipNl,
    /// `skipempty`
    SkipEmpty,
    /// `oneline`
    OneLine,
    /// `fold`
    Fold,
    /// `display`
    Display,
    /// `extend`
    Extend,
    /// `excludenl`
    ExcludeNl,
    /// `keepend`
    KeepEnd,
    /// `containedin=`
    ContainedIn(Vec<String>),
    /// `nextgroup=`
    NextGroup(Vec<String>),
    /// `contains=`
    Contains(Vec<String>),
    /// `matchgroup=`, `None` for `matchgroup=NONE`.
    MatchGroup(Option<String>),
    /// `start=`
    Start(DelimitedPattern),
    /// `skip=`
    Skip(DelimitedPattern),
    /// `end=`
    End(DelimitedPattern),
}

impl SyntaxOption {
    fn flag(name: &str) -> Option<Self> {
        Some(match name {
            "contained" => SyntaxOption::Contained,
            "transparent" => SyntaxOption::Transparent,
            "skipwhite" => SyntaxOption::SkipWhite,
            "skipnl" => SyntaxOption::SkipNl,
            "skipempty" => SyntaxOption::SkipEmpty,
            "oneline" => SyntaxOption::OneLine,
            "fold" => SyntaxOption::Fold,
            "display" => SyntaxOption::Display,
            "extend" => SyntaxOption::Extend,
            "excludenl" => SyntaxOption::ExcludeNl,
            "keepend" => SyntaxOption::KeepEnd,
            _ => return None,
        })
    }

    fn with_argument(name: &str, argument: &str) -> Option<Self> {
        let list = || split_list(argument);
        Some(match name {
            "containedin" => SyntaxOption::ContainedIn(list()),
            "nextgroup" => SyntaxOption::NextGroup(list()),
            "contains" => SyntaxOption::Contains(list()),
            "matchgroup" => {
                SyntaxOption::MatchGroup((argument != "NONE").then(|| argument.to_string()))
            }
            _ => return None,
        })
    }

    fn pattern(name: &str, pattern: DelimitedPattern) -> Self {
        match name {
            "start" => SyntaxOption::Start(pattern),
            "skip" => SyntaxOption::Skip(pattern),
            _ => SyntaxOption::End(pattern),
        }
    }
}

/// The kind of definition line whose tail is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    Keyword,
    Match,
    Region,
}

/// The tail of a definition line after the group name.
#[derive(Debug, Default)]
pub(crate) struct ScannedLine {
    pub(crate) options: Vec<SyntaxOption>,
    pub(crate) keywords: Vec<String>,
    pub(crate) pattern: Option<DelimitedPattern>,
}

/// Splits the tail of a definition line into options, keywords and patterns.
#[derive(Debug)]
pub(crate) struct OptionScanner {
    keyword_flag: Regex,
    keyword_argument: Regex,
    flag: Regex,
    argument: Regex,
    region_pattern: Regex,
    word: Regex,
}

impl OptionScanner {
    pub(crate) fn new(substitutions: &FxHashMap<String, String>) -> Result<Self> {
        let compile = |raw: &str| -> Result<Regex> {
            let pattern = substitute_placeholders(raw, substitutions)?;
            Ok(RegexBuilder::new(&pattern)
                .ignore_whitespace(true)
                .build()?)
        };
        Ok(Self {
            keyword_flag: compile(r"^ (?P<name>{KeywordOptions}) (?:\s+|$)")?,
            keyword_argument: compile(
                r"^ (?P<name>containedin|nextgroup) {OptionArgument} (?:\s+|$)",
            )?,
            flag: compile(r"^ (?P<name>{AllOptions}) (?:\s+|$)")?,
            argument: compile(r"^ (?P<name>{ArgumentOptions}) {OptionArgument} (?:\s+|$)")?,
            region_pattern: compile(r"^ (?P<name>start|skip|end) \s*=\s*")?,
            word: compile(r"^ (?P<word>\S+) \s*")?,
        })
    }

    /// Scans the text after the group name. Options keep their order.
    pub(crate) fn scan(
        &self,
        text: &str,
        kind: LineKind,
        patterns: &mut DelimitedPatterns,
    ) -> Result<ScannedLine> {
        let mut line = ScannedLine::default();
        let (flag, argument) = match kind {
            LineKind::Keyword => (&self.keyword_flag, &self.keyword_argument),
            _ => (&self.flag, &self.argument),
        };
        let mut rest = text.trim_start();
        while !rest.is_empty() {
            if let Some(captures) = flag.captures(rest) {
                line.options.extend(SyntaxOption::flag(&captures["name"]));
                rest = &rest[end_of(&captures)..];
                continue;
            }
            if let Some(captures) = argument.captures(rest) {
                line.options.extend(SyntaxOption::with_argument(
                    &captures["name"],
                    &captures["argument"],
                ));
                rest = &rest[end_of(&captures)..];
                continue;
            }
            if kind == LineKind::Region {
                if let Some(captures) = self.region_pattern.captures(rest) {
                    let name = &captures["name"];
                    let after = &rest[end_of(&captures)..];
                    let (pattern, len) = patterns
                        .read(after)?
                        .ok_or_else(|| unterminated(&format!("{name} pattern"), after))?;
                    line.options.push(SyntaxOption::pattern(name, pattern));
                    rest = &after[len..];
                    continue;
                }
            }
            if kind == LineKind::Match && line.pattern.is_none() {
                let (pattern, len) = patterns
                    .read(rest)?
                    .ok_or_else(|| unterminated("pattern", rest))?;
                line.pattern = Some(pattern);
                rest = &rest[len..];
                continue;
            }
            let Some(captures) = self.word.captures(rest) else {
                break;
            };
            if kind == LineKind::Keyword {
                line.keywords.push(captures["word"].to_string());
            } else {
                debug!("Skipping unknown option '{}'", &captures["word"]);
            }
            rest = &rest[end_of(&captures)..];
        }
        Ok(line)
    }
}

/// Splits a comma separated list of group and cluster names.
pub(crate) fn split_list(argument: &str) -> Vec<String> {
    argument
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn end_of(captures: &Captures<'_>) -> usize {
    captures.get(0).map_or(0, |m| m.end())
}

fn unterminated(what: &str, text: &str) -> VimsynError {
    VimsynError::new(VimsynErrorKind::MalformedCommand(format!(
        "Missing or unterminated {what} at '{text}'"
    )))
}
