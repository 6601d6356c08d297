use log::trace;

use crate::{EasyLex, Result, VimsynError, VimsynErrorKind};

mod assembler;
use assembler::Assembler;

mod rules;
use rules::{ConverterState, CONVERTER_RULES, QUANTIFIER_SUBSTITUTIONS};

/// The magic level of a Vim regex, switched inside a pattern with `\v`, `\m`, `\M` and `\V`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Magicness {
    /// `\v`: all ASCII characters except `0-9a-zA-Z_` have a special meaning.
    VeryMagic,
    /// `\m`: the default of Vim with `'magic'` set.
    #[default]
    Magic,
    /// `\M`: only `$` and `^` are special.
    NonMagic,
    /// `\V`: only the backslash and the terminating delimiter are special.
    VeryNonMagic,
}

/// Options of a conversion.
///
/// The character class fields hold the contents of a bracket expression without the digits,
/// the lower case class escapes (`\i`, `\k`, `\f`, `\p`) add `0-9` themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    /// The magic level at the start of a pattern.
    pub magicness: Magicness,
    /// Ignore case unless the pattern contains `\C`.
    pub ignore_case: bool,
    /// Identifier characters, `'isident'`.
    pub ident_chars: String,
    /// Keyword characters, `'iskeyword'`.
    pub keyword_chars: String,
    /// File name characters, `'isfname'`.
    pub file_name_chars: String,
    /// Printable characters, `'isprint'`.
    pub printable_chars: String,
    /// What `\n` and the `\_x` classes match as line break.
    pub new_line: String,
    /// Emit `^` and `$` as `(?m:^)` and `(?m:$)`.
    pub force_multiline_mode: bool,
}

impl ConversionOptions {
    /// Case sensitive, magic, multi-line.
    pub fn default_multiline() -> Self {
        Self {
            magicness: Magicness::Magic,
            ignore_case: false,
            ident_chars: r"A-Za-z_\xC0-\xFF".to_string(),
            keyword_chars: r"A-Za-z_\xC0-\xFF".to_string(),
            file_name_chars: r"A-Za-z/.\-_+,#$%~=".to_string(),
            printable_chars: r"\x20-\x2F\x3A-\x7E\xA0-\xFF".to_string(),
            new_line: r"\n".to_string(),
            force_multiline_mode: true,
        }
    }

    /// Like [Self::default_multiline] but ignoring case.
    pub fn case_insensitive_multiline() -> Self {
        Self {
            ignore_case: true,
            ..Self::default_multiline()
        }
    }

    /// Replaces the keyword characters, usually with [crate::KeywordChars::class_contents].
    pub fn with_keyword_chars(mut self, keyword_chars: impl Into<String>) -> Self {
        self.keyword_chars = keyword_chars.into();
        self
    }

    /// Sets the case sensitivity.
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self::default_multiline()
    }
}

/// The result of a conversion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConvertedRegex {
    /// The regex in the syntax of backtracking engines like `fancy-regex`.
    pub regex: String,
    /// The pattern refers back to one of its own groups.
    pub has_back_reference: bool,
    /// The pattern contains `\zs`, converted to the empty group `zs`.
    pub has_match_start_group: bool,
    /// The pattern contains `\ze`, converted to the empty group `ze`.
    pub has_match_end_group: bool,
    /// Number of `\z(` groups other patterns may refer to.
    pub external_groups: usize,
    /// The highest `\z1`..`\z9` reference.
    pub last_external_match: usize,
    /// The pattern ends with a magic `$`.
    pub matches_magic_dollar: bool,
    /// The regex ignores case.
    pub ignore_case: bool,
}

/// Converts Vim regexes.
#[derive(Debug, Clone, Default)]
pub struct VimRegexConverter {
    options: ConversionOptions,
}

impl VimRegexConverter {
    /// Creates a converter.
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    /// The options.
    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Converts a Vim regex.
    pub fn convert(&self, vim_regex: &str) -> Result<ConvertedRegex> {
        let mut state = ConverterState::new(&self.options);
        let mut lex = EasyLex::new(vim_regex, &CONVERTER_RULES)
            .with_substitutions(QUANTIFIER_SUBSTITUTIONS.clone());
        lex.scan(&mut state)?;
        if lex.state() != crate::LexState::INITIAL {
            return Err(VimsynError::new(VimsynErrorKind::RegexConversion {
                vim_regex: vim_regex.to_string(),
                message: "unterminated collection or optional sequence".to_string(),
            }));
        }
        let tokens: Vec<_> = lex.drain_tokens().collect();
        let (regex, matches_magic_dollar) = Assembler::new(vim_regex, &tokens).assemble()?;
        let ignore_case = case_override(vim_regex).unwrap_or(self.options.ignore_case);
        let regex = if ignore_case {
            format!("(?i:{regex})")
        } else {
            regex
        };
        trace!("Converted '{vim_regex}' to '{regex}'");
        Ok(ConvertedRegex {
            regex,
            has_back_reference: state.has_back_reference,
            has_match_start_group: state.has_match_start_group,
            has_match_end_group: state.has_match_end_group,
            external_groups: state.external_groups,
            last_external_match: state.last_external_match,
            matches_magic_dollar,
            ignore_case,
        })
    }
}

/// `\c` anywhere in a pattern forces ignoring case, `\C` forces matching case.
fn case_override(vim_regex: &str) -> Option<bool> {
    let mut chars = vim_regex.chars();
    let mut result = None;
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('c') => return Some(true),
                Some('C') => result = Some(false),
                _ => {}
            }
        }
    }
    result
}

/// Returns true if a name contains characters with a special meaning in a Vim regex, i.e. a
/// group name list entry is a pattern rather than a plain name.
pub fn has_magic_regex_chars(name: &str) -> bool {
    name.chars()
        .any(|c| matches!(c, '*' | '.' | '[' | ']' | '\\' | '^' | '$' | '~'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn plain() -> ConversionOptions {
        ConversionOptions {
            force_multiline_mode: false,
            ..ConversionOptions::default_multiline()
        }
    }

    #[rstest]
    #[case::literal("abc", "abc")]
    #[case::dot_star("a.*b", "a.*b")]
    #[case::plus_and_optional(r"a\+b\=c\?", "a+b?c?")]
    #[case::group(r"\(ab\)\|c", "(ab)|c")]
    #[case::non_capturing(r"\%(ab\)", "(?:ab)")]
    #[case::braces_are_literal("a{b}", r"a\{b\}")]
    #[case::counted(r"a\{2,3}", "a{2,3}")]
    #[case::lazy(r"a\{-}", "a*?")]
    #[case::lazy_min(r"a\{-1,}", "a{1,}?")]
    #[case::at_most(r"a\{,4}", "a{0,4}")]
    #[case::exact(r"a\{3}", "a{3}")]
    #[case::lookahead(r"foo\(bar\)\@=", "foo(?=(bar))")]
    #[case::negative_lookbehind(r"\(x\)\@<!y", "(?<!(x))y")]
    #[case::atomic(r"a*\@>", "(?>a*)")]
    #[case::match_start(r"foo\zsbar", "foo(?<zs>)bar")]
    #[case::word_bounds(r"\<if\>", r"\b(?=\w)if\b(?<=\w)")]
    #[case::anchors("^a$", "^a$")]
    #[case::inner_anchors("a^b$c", r"a\^b\$c")]
    #[case::anchors_per_branch(r"^a\|b$", "^a|b$")]
    #[case::character_classes(r"\s\d\a", r"[ \t][0-9][A-Za-z]")]
    #[case::newline_class(r"\_s", r"(?:\n|[ \t])")]
    #[case::any_with_newline(r"\_.", "(?s:.)")]
    #[case::collection("[abc]x", "[abc]x")]
    #[case::negated_collection("[^]a]", r"[^\]a]")]
    #[case::named_collection("[[:digit:]x]", "[0-9x]")]
    #[case::collection_with_newline(r"\_[ab]", r"(?:\n|[ab])")]
    #[case::optional_sequence(r"fu\%[nction]", "fu(?:n(?:c(?:t(?:i(?:o(?:n)?)?)?)?)?)?")]
    #[case::very_magic(r"\v(a|b)+", "(a|b)+")]
    #[case::very_magic_braces(r"\va{2}", "a{2}")]
    #[case::non_magic(r"\Ma*.", r"a\*\.")]
    #[case::very_non_magic(r"\Va.b", r"a\.b")]
    #[case::decimal_code(r"\%d65", r"\x{41}")]
    #[case::hex_code(r"\%x41", r"\x{41}")]
    #[case::escaped_slash(r"a\/b", r"a/b")]
    #[case::escaped_tab(r"a\tb", r"a\tb")]
    #[case::leading_star("*a", r"\*a")]
    #[case::concat_and(r".*foo\&.*bar", "(?=.*foo).*bar")]
    fn test_conversions(#[case] vim_regex: &str, #[case] expected: &str) {
        init();
        let converter = VimRegexConverter::new(plain());
        assert_eq!(
            expected,
            converter.convert(vim_regex).unwrap().regex,
            "{vim_regex}"
        );
    }

    #[test]
    fn test_multiline_mode_anchors() {
        init();
        let converted = VimRegexConverter::default().convert("^x$").unwrap();
        assert_eq!("(?m:^)x(?m:$)", converted.regex);
        assert!(converted.matches_magic_dollar);
    }

    #[test]
    fn test_flags() {
        init();
        let converter = VimRegexConverter::new(plain());
        let converted = converter.convert(r"\z(\w\+\)\zs.\{-}\ze\z1\1").unwrap();
        assert_eq!(1, converted.external_groups);
        assert_eq!(1, converted.last_external_match);
        assert!(converted.has_match_start_group);
        assert!(converted.has_match_end_group);
        assert!(converted.has_back_reference);
        assert!(!converted.matches_magic_dollar);
    }

    #[test]
    fn test_case_switches() {
        init();
        let converter = VimRegexConverter::new(plain());
        let converted = converter.convert(r"\cabc").unwrap();
        assert!(converted.ignore_case);
        assert_eq!("(?i:abc)", converted.regex);

        let converter = VimRegexConverter::new(plain().with_ignore_case(true));
        assert_eq!("(?i:ab)", converter.convert("ab").unwrap().regex);
        let converted = converter.convert(r"\Cab").unwrap();
        assert!(!converted.ignore_case);
        assert_eq!("ab", converted.regex);
    }

    #[test]
    fn test_keyword_class_follows_options() {
        init();
        let converter = VimRegexConverter::new(plain().with_keyword_chars("a-z"));
        assert_eq!("[a-z0-9]+", converter.convert(r"\k\+").unwrap().regex);
        assert_eq!("[a-z]", converter.convert(r"\K").unwrap().regex);
    }

    #[rstest]
    #[case::unbalanced_close(r"a\)")]
    #[case::unbalanced_open(r"\(a")]
    #[case::unterminated_collection("[ab")]
    #[case::dangling_quantifier(r"\+a")]
    fn test_conversion_errors(#[case] vim_regex: &str) {
        init();
        let err = VimRegexConverter::new(plain())
            .convert(vim_regex)
            .unwrap_err();
        assert!(
            matches!(*err.source, VimsynErrorKind::RegexConversion { .. }),
            "{vim_regex}: {err}"
        );
    }

    #[test]
    fn test_has_magic_regex_chars() {
        assert!(has_magic_regex_chars("cComment.*"));
        assert!(has_magic_regex_chars("x[ab]"));
        assert!(!has_magic_regex_chars("cComment"));
    }
}
