use std::collections::VecDeque;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::{LexRule, LexState, Result, VimsynError, VimsynErrorKind};

/// Number of characters shown on each side of a failing position.
const VICINITY: usize = 30;

/// The mutable part of the lexer that rule actions may change.
#[derive(Debug)]
pub struct LexControl<T, V> {
    state: LexState,
    state_stack: Vec<LexState>,
    tokens: VecDeque<(T, V)>,
}

impl<T, V> LexControl<T, V> {
    fn new() -> Self {
        Self {
            state: LexState::INITIAL,
            state_stack: Vec::new(),
            tokens: VecDeque::new(),
        }
    }

    /// The current lexical state.
    #[inline]
    pub fn state(&self) -> LexState {
        self.state
    }

    /// Switches to the given state without remembering the current one.
    pub fn begin(&mut self, state: LexState) {
        debug!("Lex state {} -> {}", self.state, state);
        self.state = state;
    }

    /// Remembers the current state and switches to the given one.
    pub fn push_current_and_begin(&mut self, state: LexState) {
        self.state_stack.push(self.state);
        self.begin(state);
    }

    /// Returns to the most recently pushed state.
    pub fn pop_state(&mut self) -> Result<()> {
        let state = self
            .state_stack
            .pop()
            .ok_or_else(|| VimsynError::new(VimsynErrorKind::EmptyStateStack))?;
        self.begin(state);
        Ok(())
    }

    /// Appends a token to the output queue.
    pub fn enqueue_token(&mut self, token: T, value: V) {
        self.tokens.push_back((token, value));
    }

    /// The depth of the state stack.
    pub fn stack_depth(&self) -> usize {
        self.state_stack.len()
    }
}

/// The scan loop driver.
///
/// At each position the rules are tried in declaration order. The first rule whose states and
/// precondition apply and whose regex matches at the cursor wins. Rules marked with
/// `continue_matching` let the following rules fire at the same position as well.
#[derive(Debug)]
pub struct EasyLex<'r, S, T, V> {
    input: String,
    pos: usize,
    rules: &'r [LexRule<S, T, V>],
    substitutions: FxHashMap<String, String>,
    control: LexControl<T, V>,
}

impl<'r, S, T: Copy + std::fmt::Debug, V> EasyLex<'r, S, T, V> {
    /// Creates a lexer over the given input. Line endings are normalized to `\n`.
    pub fn new(input: &str, rules: &'r [LexRule<S, T, V>]) -> Self {
        Self {
            input: input.replace("\r\n", "\n").replace('\r', "\n"),
            pos: 0,
            rules,
            substitutions: FxHashMap::default(),
            control: LexControl::new(),
        }
    }

    /// Sets the placeholder substitutions used when the rule regexes are compiled.
    pub fn with_substitutions(mut self, substitutions: FxHashMap<String, String>) -> Self {
        self.substitutions = substitutions;
        self
    }

    /// The normalized input.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The scan cursor.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns true if the whole input has been consumed.
    pub fn is_done(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// The current lexical state.
    pub fn state(&self) -> LexState {
        self.control.state()
    }

    /// See [LexControl::begin].
    pub fn begin(&mut self, state: LexState) {
        self.control.begin(state);
    }

    /// See [LexControl::push_current_and_begin].
    pub fn push_current_and_begin(&mut self, state: LexState) {
        self.control.push_current_and_begin(state);
    }

    /// See [LexControl::pop_state].
    pub fn pop_state(&mut self) -> Result<()> {
        self.control.pop_state()
    }

    /// Scans the remaining input.
    pub fn scan(&mut self, scanner: &mut S) -> Result<()> {
        let rules = self.rules;
        while self.pos < self.input.len() {
            let mut advance_to: Option<usize> = None;
            for (index, rule) in rules.iter().enumerate() {
                if !rule.applies(&self.control, scanner) {
                    continue;
                }
                let Some(m) = rule.match_at(&self.input, self.pos, &self.substitutions)? else {
                    continue;
                };
                if m.is_empty() {
                    continue;
                }
                trace!("Rule {index} matched '{}' at {}", m.as_str(), self.pos);
                if let Some(token) = rule.get_token() {
                    let value = rule.text(&m, scanner)?;
                    self.control.enqueue_token(token, value);
                }
                advance_to = Some(advance_to.map_or(m.end(), |end| end.max(m.end())));
                rule.run_action(&m, scanner, &mut self.control)?;
                if !rule.is_continue_matching() {
                    break;
                }
            }
            match advance_to {
                Some(end) => self.pos = end,
                None => return Err(self.no_matching_rule()),
            }
        }
        Ok(())
    }

    /// Returns true if tokens are waiting in the queue.
    pub fn has_tokens(&self) -> bool {
        !self.control.tokens.is_empty()
    }

    /// Takes the next token from the queue.
    pub fn next_token(&mut self) -> Option<(T, V)> {
        self.control.tokens.pop_front()
    }

    /// Takes all queued tokens.
    pub fn drain_tokens(&mut self) -> impl Iterator<Item = (T, V)> + '_ {
        self.control.tokens.drain(..)
    }

    fn no_matching_rule(&self) -> VimsynError {
        let before = &self.input[..self.pos];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
            + 1;
        let prefix: String = {
            let chars: Vec<char> = before.chars().rev().take(VICINITY).collect();
            chars.into_iter().rev().collect()
        };
        let mut rest = self.input[self.pos..].chars();
        let offending = rest.next().map(String::from).unwrap_or_default();
        let suffix: String = rest.take(VICINITY).collect();
        VimsynError::new(VimsynErrorKind::NoMatchingRule {
            offset: self.pos,
            line,
            column,
            vicinity: format!("{prefix}>>{offending}<<{suffix}"),
        })
    }
}
