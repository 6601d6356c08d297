#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{Result, VimsynError, VimsynErrorKind};

/// The `'iskeyword'` default of Vim.
pub const DEFAULT_KEYWORD_CHARS: &str = "@,48-57,_,192-255";

/// The set of characters of the Latin-1 range that form keywords.
///
/// The set is modified with Vim character lists: comma separated entries that are either `@`
/// (all alphabetic characters), a single character, a character code, or a range of characters
/// or codes like `a-z` or `48-57`. `@-@` stands for the character `@` itself, a leading `^`
/// excludes the entry instead of including it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct KeywordChars {
    table: Vec<bool>,
}

impl Default for KeywordChars {
    fn default() -> Self {
        let mut chars = Self::empty();
        // The default list is well formed.
        let _ = chars.add(DEFAULT_KEYWORD_CHARS);
        chars
    }
}

impl KeywordChars {
    /// A table without any keyword character.
    pub fn empty() -> Self {
        Self {
            table: vec![false; 256],
        }
    }

    /// Applies a character list on top of the current set, like `:set iskeyword+=`.
    pub fn add(&mut self, char_list: &str) -> Result<()> {
        for (include, from, to) in parse_char_list(char_list)? {
            for code in from..=to {
                self.table[code as usize] = include;
            }
        }
        Ok(())
    }

    /// Replaces the set with the given character list, like `:set iskeyword=`.
    pub fn set(&mut self, char_list: &str) -> Result<()> {
        let mut chars = Self::empty();
        chars.add(char_list)?;
        *self = chars;
        Ok(())
    }

    /// Returns true if the character is a keyword character.
    /// Characters beyond Latin-1 are keyword characters if they are alphanumeric.
    pub fn contains(&self, c: char) -> bool {
        match u32::from(c) {
            code @ 0..=255 => self.table[code as usize],
            _ => c.is_alphanumeric(),
        }
    }

    /// The set as contents of a regex bracket expression, digits excluded.
    pub fn class_contents(&self) -> String {
        let mut contents = String::new();
        let mut code = 0usize;
        while code < 256 {
            if !self.table[code] || (b'0' as usize..=b'9' as usize).contains(&code) {
                code += 1;
                continue;
            }
            let start = code;
            while code + 1 < 256
                && self.table[code + 1]
                && !(b'0' as usize..=b'9' as usize).contains(&(code + 1))
            {
                code += 1;
            }
            contents.push_str(&class_char(start));
            if code > start {
                contents.push('-');
                contents.push_str(&class_char(code));
            }
            code += 1;
        }
        contents
    }
}

fn class_char(code: usize) -> String {
    match code as u8 {
        c @ (b'A'..=b'Z' | b'a'..=b'z' | b'_') => (c as char).to_string(),
        c @ 0x21..=0x7E => format!("\\{}", c as char),
        c => format!("\\x{c:02X}"),
    }
}

/// Parses a character list into `(include, from, to)` code ranges.
fn parse_char_list(char_list: &str) -> Result<Vec<(bool, u8, u8)>> {
    let malformed =
        || VimsynError::new(VimsynErrorKind::MalformedCommand(format!("iskeyword={char_list}")));
    let chars: Vec<char> = char_list.trim().chars().collect();
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let mut include = true;
        if chars[i] == '^' && i + 1 < chars.len() && chars[i + 1] != ',' {
            include = false;
            i += 1;
        }
        if chars[i] == '@' && chars.get(i + 1).is_none_or(|c| *c == ',') {
            ranges.extend(
                (0..=255u8)
                    .filter(|c| (*c as char).is_alphabetic())
                    .map(|c| (include, c, c)),
            );
            i += 1;
        } else {
            let (from, next) = parse_bound(&chars, i).ok_or_else(malformed)?;
            i = next;
            let mut to = from;
            if chars.get(i) == Some(&'-') && chars.get(i + 1).is_some_and(|c| *c != ',') {
                let (bound, next) = parse_bound(&chars, i + 1).ok_or_else(malformed)?;
                to = bound;
                i = next;
            }
            if to < from {
                return Err(malformed());
            }
            ranges.push((include, from, to));
        }
        match chars.get(i) {
            None => {}
            Some(',') => i += 1,
            Some(_) => return Err(malformed()),
        }
    }
    Ok(ranges)
}

/// A character code or a single character.
fn parse_bound(chars: &[char], start: usize) -> Option<(u8, usize)> {
    let first = *chars.get(start)?;
    if first.is_ascii_digit() {
        let end = chars[start..]
            .iter()
            .position(|c| !c.is_ascii_digit())
            .map_or(chars.len(), |len| start + len);
        let code: String = chars[start..end].iter().collect();
        code.parse::<u8>().ok().map(|code| (code, end))
    } else {
        u8::try_from(u32::from(first))
            .ok()
            .map(|code| (code, start + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_set() {
        let chars = KeywordChars::default();
        assert!(chars.contains('a'));
        assert!(chars.contains('Z'));
        assert!(chars.contains('5'));
        assert!(chars.contains('_'));
        assert!(chars.contains('é'));
        assert!(!chars.contains('-'));
        assert!(!chars.contains(' '));
        assert_eq!(r"A-Z_a-z\xAA\xB5\xBA\xC0-\xFF", chars.class_contents());
    }

    #[test]
    fn test_add_versus_set() {
        let mut chars = KeywordChars::default();
        chars.add("-,.").unwrap();
        assert!(chars.contains('-'));
        assert!(chars.contains('.'));
        assert!(chars.contains('a'));

        chars.set("a-c,48-49").unwrap();
        assert!(chars.contains('b'));
        assert!(chars.contains('1'));
        assert!(!chars.contains('d'));
        assert!(!chars.contains('-'));
        assert_eq!("a-c", chars.class_contents());
    }

    #[rstest]
    #[case::at_sign_itself("@-@", '@', true)]
    #[case::exclusion("@,^x", 'x', false)]
    #[case::exclusion_keeps_others("@,^x", 'y', true)]
    #[case::caret_itself("^", '^', true)]
    #[case::code_range("45-46", '.', true)]
    fn test_char_list_grammar(#[case] list: &str, #[case] c: char, #[case] expected: bool) {
        let mut chars = KeywordChars::empty();
        chars.set(list).unwrap();
        assert_eq!(expected, chars.contains(c), "{list} {c}");
    }

    #[rstest]
    #[case::reversed_range("z-a")]
    #[case::code_too_large("300")]
    #[case::garbage("ab")]
    fn test_malformed_lists(#[case] list: &str) {
        assert!(KeywordChars::default().add(list).is_err(), "{list}");
    }
}
