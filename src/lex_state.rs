/// A lexical state, also known as start condition.
///
/// States are compared by their id only. An exclusive state only activates rules that name it
/// explicitly (or the [StateSet::All] sentinel), an inclusive state additionally activates all
/// rules with an empty state set.
#[derive(Debug, Clone, Copy, Eq)]
pub struct LexState {
    id: u32,
    exclusive: bool,
}

impl LexState {
    /// The state every scan starts in.
    pub const INITIAL: LexState = LexState::new(0, false);

    /// Creates a new state.
    pub const fn new(id: u32, exclusive: bool) -> Self {
        Self { id, exclusive }
    }

    /// The id of the state.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns true if the state is exclusive.
    #[inline]
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// Sets the exclusivity. Only meant for grammar setup.
    pub fn set_exclusive(&mut self, exclusive: bool) {
        self.exclusive = exclusive;
    }

    /// Checks whether a rule with the given state set applies in this state.
    pub fn is_in(&self, states: &StateSet) -> bool {
        match states {
            StateSet::All => true,
            StateSet::Only(states) => {
                (states.is_empty() && !self.exclusive) || states.contains(self)
            }
        }
    }
}

impl PartialEq for LexState {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::hash::Hash for LexState {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for LexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.id, if self.exclusive { "x" } else { "" })
    }
}

/// The set of states a rule applies in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateSet {
    /// The rule applies regardless of the current state.
    All,
    /// The rule applies in the listed states. An empty list means all inclusive states.
    Only(Vec<LexState>),
}

impl Default for StateSet {
    fn default() -> Self {
        StateSet::Only(Vec::new())
    }
}

impl StateSet {
    /// A set containing exactly the given states.
    pub fn of(states: &[LexState]) -> Self {
        StateSet::Only(states.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INCLUSIVE: LexState = LexState::new(1, false);
    const EXCLUSIVE: LexState = LexState::new(2, true);

    #[test]
    fn test_empty_set_applies_to_inclusive_states_only() {
        let empty = StateSet::default();
        assert!(LexState::INITIAL.is_in(&empty));
        assert!(INCLUSIVE.is_in(&empty));
        assert!(!EXCLUSIVE.is_in(&empty));
    }

    #[test]
    fn test_explicit_and_sentinel_sets() {
        assert!(EXCLUSIVE.is_in(&StateSet::All));
        assert!(EXCLUSIVE.is_in(&StateSet::of(&[EXCLUSIVE])));
        assert!(!INCLUSIVE.is_in(&StateSet::of(&[EXCLUSIVE])));
        assert!(!LexState::INITIAL.is_in(&StateSet::of(&[INCLUSIVE])));
    }

    #[test]
    fn test_identity_ignores_exclusivity() {
        let mut state = LexState::new(7, false);
        state.set_exclusive(true);
        assert_eq!(LexState::new(7, false), state);
        assert!(state.is_in(&StateSet::of(&[LexState::new(7, false)])));
    }
}
