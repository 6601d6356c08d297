#[cfg(feature = "serde")]
use serde::Serialize;

use super::{ClusterId, ContextId, Pattern};

/// Flags every kind of syntax item supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ItemFlags {
    /// Only recognized inside other items.
    pub contained: bool,
    /// Takes the highlighting of the containing item.
    pub transparent: bool,
    /// White space is skipped before looking for the next group.
    pub skip_white: bool,
    /// Line breaks are skipped before looking for the next group.
    pub skip_nl: bool,
    /// Empty lines are skipped before looking for the next group.
    pub skip_empty: bool,
    /// Folding was requested.
    pub fold: bool,
    /// The item is only displayed, i.e. it can be skipped when syncing.
    pub display: bool,
}

/// The kind specific data of an item.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ItemKind {
    /// `syn keyword`
    Keyword {
        /// The full keyword.
        name: String,
        /// Compare ignoring case.
        ignore_case: bool,
        /// The shortest accepted abbreviation, `fu[nction]` accepts `fu` and longer prefixes.
        required_len: usize,
    },
    /// `syn match`
    Match {
        /// The pattern.
        pattern: Pattern,
        /// Items that may appear inside the match.
        contains: Option<ClusterId>,
        /// Containing items are extended.
        extend: bool,
    },
    /// `syn region`
    Region {
        /// Start patterns, at least one.
        start: Vec<Pattern>,
        /// Skip patterns in the order they were given.
        skip: Vec<Pattern>,
        /// End patterns, at least one.
        end: Vec<Pattern>,
        /// Items that may appear inside the region.
        contains: Option<ClusterId>,
        /// Containing items are extended.
        extend: bool,
        /// The region does not cross line ends.
        one_line: bool,
        /// A match of the end pattern ends contained items too.
        keep_end: bool,
    },
}

/// A keyword, match or region.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SyntaxItem {
    /// The highlight group.
    pub group_name: String,
    /// The owning context.
    pub context: ContextId,
    /// The line in the script that defined the item.
    pub line: usize,
    /// The flags.
    pub flags: ItemFlags,
    /// `containedin=`
    pub contained_in: Option<ClusterId>,
    /// `nextgroup=`
    pub next_group: Option<ClusterId>,
    /// The kind.
    pub kind: ItemKind,
}

impl SyntaxItem {
    /// Creates an item without flags.
    pub fn new(group_name: &str, context: ContextId, line: usize, kind: ItemKind) -> Self {
        Self {
            group_name: group_name.to_string(),
            context,
            line,
            flags: ItemFlags::default(),
            contained_in: None,
            next_group: None,
            kind,
        }
    }

    /// Creates a keyword item. `word[tail]` abbreviations are split here.
    pub fn keyword(
        group_name: &str,
        context: ContextId,
        line: usize,
        word: &str,
        ignore_case: bool,
    ) -> Self {
        let (name, required_len) = match word.split_once('[') {
            Some((head, tail)) if !head.is_empty() && tail.ends_with(']') => {
                let tail = &tail[..tail.len() - 1];
                (format!("{head}{tail}"), head.chars().count())
            }
            _ => (word.to_string(), word.chars().count()),
        };
        Self::new(
            group_name,
            context,
            line,
            ItemKind::Keyword {
                name,
                ignore_case,
                required_len,
            },
        )
    }

    /// Returns true for keywords.
    pub fn is_keyword(&self) -> bool {
        matches!(self.kind, ItemKind::Keyword { .. })
    }

    /// The cluster of contained items of a match or a region.
    pub fn contains(&self) -> Option<ClusterId> {
        match &self.kind {
            ItemKind::Keyword { .. } => None,
            ItemKind::Match { contains, .. } | ItemKind::Region { contains, .. } => *contains,
        }
    }

    /// The spellings a keyword is found by, from the shortest abbreviation to the full name.
    pub fn keyword_spellings(&self) -> Vec<String> {
        match &self.kind {
            ItemKind::Keyword {
                name,
                ignore_case,
                required_len,
            } => {
                let chars: Vec<char> = name.chars().collect();
                (*required_len..=chars.len())
                    .map(|len| {
                        let spelling: String = chars[..len].iter().collect();
                        if *ignore_case {
                            spelling.to_lowercase()
                        } else {
                            spelling
                        }
                    })
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_abbreviation() {
        let item = SyntaxItem::keyword("vimCommand", ContextId::MAIN, 1, "fu[nction]", false);
        match &item.kind {
            ItemKind::Keyword {
                name, required_len, ..
            } => {
                assert_eq!("function", name);
                assert_eq!(2, *required_len);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        let spellings = item.keyword_spellings();
        assert_eq!(7, spellings.len());
        assert_eq!("fu", spellings[0]);
        assert_eq!("function", spellings[6]);
    }

    #[test]
    fn test_plain_and_case_insensitive_keyword() {
        let item = SyntaxItem::keyword("sqlKeyword", ContextId::MAIN, 1, "SELECT", true);
        assert!(item.is_keyword());
        assert_eq!(vec!["select".to_string()], item.keyword_spellings());
        assert_eq!(None, item.contains());
    }
}
