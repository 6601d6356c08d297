use std::sync::OnceLock;

use log::trace;
use regex_automata::{
    meta::Regex,
    util::{captures::Captures, syntax},
    Anchored, Input,
};
use rustc_hash::FxHashMap;

use crate::{LexControl, Result, StateSet, VimsynError, VimsynErrorKind};

/// Guard over the scanner. The rule is only tried if it returns true.
pub type PreCondition<S> = fn(&S) -> bool;

/// Produces the semantic value of the token of a rule.
pub type YyText<S, V> = fn(&LexMatch<'_>, &S) -> Result<V>;

/// Side effect of a rule on the scanner and on the lexer.
pub type Action<S, T, V> = fn(&LexMatch<'_>, &mut S, &mut LexControl<T, V>) -> Result<()>;

/// Replaces `{name}` placeholders with the mapped values until nothing changes anymore.
///
/// Values may contain placeholders themselves. The number of passes is bounded by the size of the
/// map, a cyclic map results in [VimsynErrorKind::CyclicSubstitution].
pub fn substitute_placeholders(
    raw: &str,
    substitutions: &FxHashMap<String, String>,
) -> Result<String> {
    let mut cooked = raw.to_string();
    if substitutions.is_empty() {
        return Ok(cooked);
    }
    for _ in 0..=substitutions.len() {
        let mut changed = false;
        for (name, value) in substitutions {
            let placeholder = format!("{{{name}}}");
            if cooked.contains(&placeholder) {
                cooked = cooked.replace(&placeholder, value);
                changed = true;
            }
        }
        if !changed {
            return Ok(cooked);
        }
    }
    Err(VimsynError::new(VimsynErrorKind::CyclicSubstitution(
        raw.to_string(),
    )))
}

/// A successful match of a rule at the scan cursor.
#[derive(Debug)]
pub struct LexMatch<'h> {
    haystack: &'h str,
    start: usize,
    end: usize,
    captures: Captures,
}

impl<'h> LexMatch<'h> {
    /// The matched text.
    #[inline]
    pub fn as_str(&self) -> &'h str {
        &self.haystack[self.start..self.end]
    }

    /// The byte offset where the match starts.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// The byte offset after the match.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// The length of the match in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true for an empty match.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The text of a named capture group, if it participated in the match.
    pub fn group(&self, name: &str) -> Option<&'h str> {
        self.captures
            .get_group_by_name(name)
            .map(|span| &self.haystack[span.start..span.end])
    }
}

/// A single scan rule.
///
/// The regex is compiled on first use and cached. It always matches anchored at the scan cursor.
pub struct LexRule<S, T, V> {
    raw_regex: String,
    regex: OnceLock<Regex>,
    token: Option<T>,
    continue_matching: bool,
    states: StateSet,
    pre_condition: PreCondition<S>,
    yytext: YyText<S, V>,
    action: Action<S, T, V>,
}

fn always<S>(_: &S) -> bool {
    true
}

fn default_text<S, V: Default>(_: &LexMatch<'_>, _: &S) -> Result<V> {
    Ok(V::default())
}

fn no_action<S, T, V>(_: &LexMatch<'_>, _: &mut S, _: &mut LexControl<T, V>) -> Result<()> {
    Ok(())
}

impl<S, T, V: Default> LexRule<S, T, V> {
    /// Creates a rule that produces no token, has no action and applies in all inclusive states.
    pub fn new(raw_regex: impl Into<String>) -> Self {
        Self {
            raw_regex: raw_regex.into(),
            regex: OnceLock::new(),
            token: None,
            continue_matching: false,
            states: StateSet::default(),
            pre_condition: always::<S>,
            yytext: default_text::<S, V>,
            action: no_action::<S, T, V>,
        }
    }
}

impl<S, T: Copy, V> LexRule<S, T, V> {
    /// Sets the token the rule produces.
    pub fn token(mut self, token: T) -> Self {
        self.token = Some(token);
        self
    }

    /// Lets subsequent rules fire at the same position after this one.
    pub fn continue_matching(mut self) -> Self {
        self.continue_matching = true;
        self
    }

    /// Sets the states the rule applies in.
    pub fn states(mut self, states: StateSet) -> Self {
        self.states = states;
        self
    }

    /// Sets the precondition.
    pub fn pre_condition(mut self, pre_condition: PreCondition<S>) -> Self {
        self.pre_condition = pre_condition;
        self
    }

    /// Sets the function that produces the token value.
    pub fn yytext(mut self, yytext: YyText<S, V>) -> Self {
        self.yytext = yytext;
        self
    }

    /// Sets the side effect.
    pub fn action(mut self, action: Action<S, T, V>) -> Self {
        self.action = action;
        self
    }

    /// Replaces the raw regex. The compiled regex is discarded.
    pub fn set_raw_regex(&mut self, raw_regex: impl Into<String>) {
        self.raw_regex = raw_regex.into();
        self.regex = OnceLock::new();
    }

    /// The raw regex template.
    pub fn raw_regex(&self) -> &str {
        &self.raw_regex
    }

    /// The token, if the rule produces one.
    pub fn get_token(&self) -> Option<T> {
        self.token
    }

    /// Returns true if subsequent rules may fire at the same position.
    pub fn is_continue_matching(&self) -> bool {
        self.continue_matching
    }

    /// The states the rule applies in.
    pub fn get_states(&self) -> &StateSet {
        &self.states
    }

    /// The compiled regex, substituting nothing.
    pub fn regex(&self) -> Result<&Regex> {
        self.cook_regex(&FxHashMap::default())
    }

    /// The compiled regex. The substitutions are only applied on the first call.
    pub fn cook_regex(&self, substitutions: &FxHashMap<String, String>) -> Result<&Regex> {
        if let Some(regex) = self.regex.get() {
            return Ok(regex);
        }
        let pattern = substitute_placeholders(&self.raw_regex, substitutions)?;
        trace!("Compiling lex rule regex {pattern}");
        let regex = Regex::builder()
            .syntax(
                syntax::Config::new()
                    .multi_line(true)
                    .ignore_whitespace(true),
            )
            .build(&pattern)
            .map_err(|e| VimsynError::new(VimsynErrorKind::RegexBuild(Box::new(e), pattern)))?;
        Ok(self.regex.get_or_init(|| regex))
    }

    pub(crate) fn applies(&self, control: &LexControl<T, V>, scanner: &S) -> bool {
        control.state().is_in(&self.states) && (self.pre_condition)(scanner)
    }

    pub(crate) fn match_at<'h>(
        &self,
        haystack: &'h str,
        pos: usize,
        substitutions: &FxHashMap<String, String>,
    ) -> Result<Option<LexMatch<'h>>> {
        let regex = self.cook_regex(substitutions)?;
        let input = Input::new(haystack).range(pos..).anchored(Anchored::Yes);
        let mut captures = regex.create_captures();
        regex.search_captures(&input, &mut captures);
        Ok(captures.get_match().map(|m| LexMatch {
            haystack,
            start: m.start(),
            end: m.end(),
            captures,
        }))
    }

    pub(crate) fn text(&self, m: &LexMatch<'_>, scanner: &S) -> Result<V> {
        (self.yytext)(m, scanner)
    }

    pub(crate) fn run_action(
        &self,
        m: &LexMatch<'_>,
        scanner: &mut S,
        control: &mut LexControl<T, V>,
    ) -> Result<()> {
        (self.action)(m, scanner, control)
    }
}

impl<S, T: Copy + Into<usize>, V> LexRule<S, T, V> {
    /// The token as integer, for fast comparisons.
    pub fn token_id(&self) -> Option<usize> {
        self.token.map(Into::into)
    }
}

impl<S, T: std::fmt::Debug, V> std::fmt::Debug for LexRule<S, T, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexRule")
            .field("raw_regex", &self.raw_regex)
            .field("token", &self.token)
            .field("continue_matching", &self.continue_matching)
            .field("states", &self.states)
            .finish()
    }
}
