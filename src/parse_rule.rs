use log::trace;
use regex::{Captures, Regex, RegexBuilder};
use rustc_hash::FxHashMap;

use crate::{substitute_placeholders, Result};

/// Callback of a parse rule.
pub type ParseCallback<C> = fn(&mut C, &Captures<'_>) -> Result<()>;

/// A line rule: a regex searched anywhere in a line and a callback run on a match.
///
/// The regex is compiled case-sensitive with insignificant whitespace, so literal blanks have to
/// be escaped or written as `\s`.
pub struct ParseRule<C> {
    regex: Regex,
    callback: ParseCallback<C>,
}

impl<C> ParseRule<C> {
    /// Compiles the rule.
    pub fn new(pattern: &str, callback: ParseCallback<C>) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .ignore_whitespace(true)
            .build()?;
        Ok(Self { regex, callback })
    }

    /// The compiled regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Runs the callback and returns true if the regex matches the line.
    pub fn try_match(&self, context: &mut C, line: &str) -> Result<bool> {
        match self.regex.captures(line) {
            Some(captures) => {
                trace!("Parse rule {} matches '{line}'", self.regex.as_str());
                (self.callback)(context, &captures)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<C> std::fmt::Debug for ParseRule<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ParseRule").field(&self.regex.as_str()).finish()
    }
}

/// An ordered set of parse rules sharing one placeholder map.
#[derive(Debug)]
pub struct ParseRuleSet<C> {
    substitutions: FxHashMap<String, String>,
    rules: Vec<ParseRule<C>>,
}

impl<C> ParseRuleSet<C> {
    /// Creates an empty set.
    pub fn new(substitutions: FxHashMap<String, String>) -> Self {
        Self {
            substitutions,
            rules: Vec::new(),
        }
    }

    /// Substitutes the placeholders of the raw pattern and appends the rule.
    pub fn add(&mut self, raw_pattern: &str, callback: ParseCallback<C>) -> Result<&mut Self> {
        let pattern = substitute_placeholders(raw_pattern, &self.substitutions)?;
        self.rules.push(ParseRule::new(&pattern, callback)?);
        Ok(self)
    }

    /// Runs the first matching rule. Returns false if no rule matches.
    pub fn dispatch(&self, context: &mut C, line: &str) -> Result<bool> {
        for rule in &self.rules {
            if rule.try_match(context, line)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The rules in registration order.
    pub fn rules(&self) -> &[ParseRule<C>] {
        &self.rules
    }
}
