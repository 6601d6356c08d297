use std::collections::hash_map::Entry;

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::Result;

/// A pattern of a `syn match` or `syn region` line as written, e.g. `+\s*"+me=e-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedPattern {
    /// The character that encloses the body.
    pub delimiter: char,
    /// The Vim regex with `\<delimiter>` already unescaped.
    pub body: String,
    /// The offsets after the closing delimiter.
    pub offsets: Option<String>,
}

impl DelimitedPattern {
    /// Creates a pattern from the raw body. `\<delimiter>` becomes `<delimiter>` unless the
    /// delimiter is `+`, where `\+` stays the quantifier.
    pub fn new(delimiter: char, raw_body: &str, offsets: Option<&str>) -> Self {
        let body = if delimiter == '+' {
            raw_body.to_string()
        } else {
            raw_body.replace(&format!("\\{delimiter}"), &delimiter.to_string())
        };
        Self {
            delimiter,
            body,
            offsets: offsets.map(str::to_string),
        }
    }
}

/// Recognizes delimited patterns. The closing delimiter has to be the opening one, so one regex
/// per delimiter character is compiled on first use.
#[derive(Debug, Default)]
pub(crate) struct DelimitedPatterns {
    regexes: FxHashMap<char, Regex>,
}

impl DelimitedPatterns {
    /// Reads a delimited pattern at the start of `text`. Returns the pattern and the number of
    /// bytes consumed including trailing white space.
    pub(crate) fn read(&mut self, text: &str) -> Result<Option<(DelimitedPattern, usize)>> {
        let Some(delimiter) = text.chars().next() else {
            return Ok(None);
        };
        if delimiter.is_whitespace() {
            return Ok(None);
        }
        let regex = match self.regexes.entry(delimiter) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Regex::new(&template(delimiter))?),
        };
        Ok(regex.captures(text).map(|captures| {
            let consumed = captures.get(0).map_or(0, |m| m.end());
            let pattern = DelimitedPattern::new(
                delimiter,
                captures.name("pattern").map_or("", |m| m.as_str()),
                captures.name("offsets").map(|m| m.as_str()),
            );
            (pattern, consumed)
        }))
    }
}

/// The body consists of collections, escapes and any other character but the delimiter.
/// A `]` right after `[` or `[^` is a literal.
fn template(delimiter: char) -> String {
    let d = regex::escape(&delimiter.to_string());
    format!(
        r"^{d}(?P<pattern>(?:\[\^?(?:\]|\]?(?:\\.|[^\]\\])+)\]|\\.|[^{d}\\])*){d}(?P<offsets>[mhrl][a-z]=\S*)?(?:\s+|$)"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::quoted(r#""ab\"cd" contained"#, '"', r#"ab"cd"#, None, 9)]
    #[case::slashes(r"/\d\+/", '/', r"\d\+", None, 6)]
    #[case::plus_keeps_escape(r"+a\+b+", '+', r"a\+b", None, 6)]
    #[case::collection_with_delimiter(r"/[/]x/ ", '/', r"[/]x", None, 7)]
    #[case::literal_bracket(r"/[]a]/", '/', r"[]a]", None, 6)]
    #[case::offsets(r#""^\s*"me=e-1 end="#, '"', r"^\s*", Some("me=e-1"), 13)]
    fn test_read(
        #[case] text: &str,
        #[case] delimiter: char,
        #[case] body: &str,
        #[case] offsets: Option<&str>,
        #[case] consumed: usize,
    ) {
        let mut patterns = DelimitedPatterns::default();
        let (pattern, len) = patterns.read(text).unwrap().unwrap();
        assert_eq!(delimiter, pattern.delimiter);
        assert_eq!(body, pattern.body);
        assert_eq!(offsets, pattern.offsets.as_deref());
        assert_eq!(consumed, len);
    }

    #[test]
    fn test_unterminated_pattern() {
        let mut patterns = DelimitedPatterns::default();
        assert!(patterns.read("/abc").unwrap().is_none());
        assert!(patterns.read("/abc/def").unwrap().is_none());
        assert!(patterns.read("").unwrap().is_none());
        assert_eq!(1, patterns.regexes.len());
    }
}
