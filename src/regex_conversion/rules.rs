use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use super::{ConversionOptions, Magicness};
use crate::{LexControl, LexMatch, LexRule, LexState, Result, StateSet, VimsynError, VimsynErrorKind};

/// Inside `[...]`.
pub(crate) const COLLECTION: LexState = LexState::new(1, true);
/// Inside `\%[...]`.
pub(crate) const OPTIONAL_MATCH: LexState = LexState::new(2, false);

/// Tokens of the Vim regex dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegexToken {
    Literal,
    Dollar,
    Caret,
    And,
    Or,
    StartGroup,
    EndGroup,
    Quantifier,
    ZeroWidth,
    StartCollection,
    EndCollection,
    StartOptionalMatch,
    EndOptionalMatch,
}

/// The scanner side of the conversion.
#[derive(Debug, Clone)]
pub(crate) struct ConverterState {
    pub(crate) magicness: Magicness,
    pub(crate) options: ConversionOptions,
    pub(crate) newline_collection: bool,
    pub(crate) has_back_reference: bool,
    pub(crate) has_match_start_group: bool,
    pub(crate) has_match_end_group: bool,
    pub(crate) external_groups: usize,
    pub(crate) last_external_match: usize,
}

impl ConverterState {
    pub(crate) fn new(options: &ConversionOptions) -> Self {
        Self {
            magicness: options.magicness,
            options: options.clone(),
            newline_collection: false,
            has_back_reference: false,
            has_match_start_group: false,
            has_match_end_group: false,
            external_groups: 0,
            last_external_match: 0,
        }
    }

    fn magic_caret(&self) -> &'static str {
        if self.options.force_multiline_mode {
            "(?m:^)"
        } else {
            "^"
        }
    }

    fn magic_dollar(&self) -> &'static str {
        if self.options.force_multiline_mode {
            "(?m:$)"
        } else {
            "$"
        }
    }
}

type ConverterRule = LexRule<ConverterState, RegexToken, String>;
type Control = LexControl<RegexToken, String>;

fn very_magic(s: &ConverterState) -> bool {
    s.magicness == Magicness::VeryMagic
}

fn not_very_magic(s: &ConverterState) -> bool {
    s.magicness != Magicness::VeryMagic
}

fn magic_or_very_magic(s: &ConverterState) -> bool {
    matches!(s.magicness, Magicness::Magic | Magicness::VeryMagic)
}

fn non_magic(s: &ConverterState) -> bool {
    matches!(s.magicness, Magicness::NonMagic | Magicness::VeryNonMagic)
}

fn verbatim(m: &LexMatch<'_>, _: &ConverterState) -> Result<String> {
    Ok(m.as_str().to_string())
}

fn conversion_error(m: &LexMatch<'_>, message: &str) -> VimsynError {
    VimsynError::new(VimsynErrorKind::RegexConversion {
        vim_regex: m.as_str().to_string(),
        message: message.to_string(),
    })
}

/// `\s`, `\d`, `\k` and friends. The lower case variants of `\i \k \f \p` include digits.
fn character_class(m: &LexMatch<'_>, s: &ConverterState) -> Result<String> {
    let class = m
        .group("class")
        .and_then(|c| c.chars().next())
        .ok_or_else(|| conversion_error(m, "missing character class"))?;
    let with_digits = |chars: &str| format!("[{chars}0-9]");
    let without_digits = |chars: &str| format!("[{chars}]");
    let text = match class {
        's' => "[ \\t]".to_string(),
        'S' => "[^ \\t]".to_string(),
        'd' => "[0-9]".to_string(),
        'D' => "[^0-9]".to_string(),
        'x' => "[0-9A-Fa-f]".to_string(),
        'X' => "[^0-9A-Fa-f]".to_string(),
        'o' => "[0-7]".to_string(),
        'O' => "[^0-7]".to_string(),
        'w' => "[0-9A-Za-z_]".to_string(),
        'W' => "[^0-9A-Za-z_]".to_string(),
        'h' => "[A-Za-z_]".to_string(),
        'H' => "[^A-Za-z_]".to_string(),
        'a' => "[A-Za-z]".to_string(),
        'A' => "[^A-Za-z]".to_string(),
        'l' => "[a-z]".to_string(),
        'L' => "[^a-z]".to_string(),
        'u' => "[A-Z]".to_string(),
        'U' => "[^A-Z]".to_string(),
        'i' => with_digits(&s.options.ident_chars),
        'I' => without_digits(&s.options.ident_chars),
        'k' => with_digits(&s.options.keyword_chars),
        'K' => without_digits(&s.options.keyword_chars),
        'f' => with_digits(&s.options.file_name_chars),
        'F' => without_digits(&s.options.file_name_chars),
        'p' => with_digits(&s.options.printable_chars),
        'P' => without_digits(&s.options.printable_chars),
        _ => return Err(conversion_error(m, "unknown character class")),
    };
    Ok(if m.group("newline").is_some() {
        format!("(?:{}|{text})", s.options.new_line)
    } else {
        text
    })
}

/// `[:alpha:]` and friends inside collections.
fn named_collection(m: &LexMatch<'_>, _: &ConverterState) -> Result<String> {
    let text = match m.group("name").unwrap_or_default() {
        "alnum" => "0-9A-Za-z",
        "alpha" => "A-Za-z",
        "blank" => " \\t",
        "cntrl" => "\\x00-\\x1F\\x7F",
        "digit" => "0-9",
        "graph" => "\\x21-\\x7E",
        "lower" => "a-z",
        "print" => "\\x20-\\x7E",
        "punct" => "!-/:-@\\[-`\\{-\\~",
        "space" => " \\t\\n\\r\\x0B\\x0C",
        "upper" => "A-Z",
        "xdigit" => "0-9A-Fa-f",
        "return" => "\\r",
        "tab" => "\\t",
        "escape" => "\\x1B",
        "backspace" => "\\x08",
        _ => return Err(conversion_error(m, "unknown collection class name")),
    };
    Ok(text.to_string())
}

fn collection_start(m: &LexMatch<'_>, _: &ConverterState) -> Result<String> {
    let mut text = String::new();
    if m.group("newline").is_some() {
        text.push_str("(?:\\n|");
    }
    text.push('[');
    if m.group("caret").is_some() {
        text.push('^');
    }
    if m.group("bracket").is_some() {
        text.push_str("\\]");
    }
    Ok(text)
}

fn enter_collection(m: &LexMatch<'_>, s: &mut ConverterState, c: &mut Control) -> Result<()> {
    s.newline_collection = m.group("newline").is_some();
    c.push_current_and_begin(COLLECTION);
    Ok(())
}

fn code_point(m: &LexMatch<'_>, radix: u32) -> Result<String> {
    let digits = m.group("number").unwrap_or_default();
    u32::from_str_radix(digits, radix)
        .ok()
        .and_then(char::from_u32)
        .map(|c| format!("\\x{{{:X}}}", c as u32))
        .ok_or_else(|| conversion_error(m, "invalid character code"))
}

/// `\{n,m}` becomes `{n,m}`, a leading `-` makes the quantifier lazy.
fn quantifier(m: &LexMatch<'_>, _: &ConverterState) -> Result<String> {
    let body = m.group("body").unwrap_or_default();
    let (lazy, body) = match body.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, body),
    };
    let text = match body.split_once(',') {
        None if body.is_empty() => "*".to_string(),
        None => return Ok(format!("{{{body}}}")),
        Some(("", "")) => "*".to_string(),
        Some(("", max)) => format!("{{0,{max}}}"),
        Some((min, max)) => format!("{{{min},{max}}}"),
    };
    Ok(if lazy { text + "?" } else { text })
}

fn zero_width(m: &LexMatch<'_>, _: &ConverterState) -> Result<String> {
    let text = m.as_str();
    let text = if text.ends_with("<=") {
        "(?<="
    } else if text.ends_with("<!") {
        "(?<!"
    } else if text.ends_with('=') {
        "(?="
    } else if text.ends_with('!') {
        "(?!"
    } else {
        "(?>"
    };
    Ok(text.to_string())
}

fn escaped_char(m: &LexMatch<'_>, _: &ConverterState) -> Result<String> {
    let c = m.as_str().chars().nth(1).unwrap_or('\\');
    Ok(match c {
        'e' => "\\x1B".to_string(),
        'b' => "\\x08".to_string(),
        't' => "\\t".to_string(),
        'r' => "\\r".to_string(),
        'n' => "\\n".to_string(),
        c if c.is_alphanumeric() => c.to_string(),
        c => regex_syntax::escape(c.encode_utf8(&mut [0; 4])),
    })
}

fn collection_char(m: &LexMatch<'_>, _: &ConverterState) -> Result<String> {
    Ok(match m.as_str() {
        "\n" => "\\n".to_string(),
        c @ ("[" | "&" | "~") => format!("\\{c}"),
        c => c.to_string(),
    })
}

pub(crate) static QUANTIFIER_SUBSTITUTIONS: LazyLock<FxHashMap<String, String>> =
    LazyLock::new(|| {
        [("QuantifierBody", r"-?\d*(?:,\d*)?")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    });

pub(crate) static CONVERTER_RULES: LazyLock<Vec<ConverterRule>> = LazyLock::new(|| {
    let initial = StateSet::of(&[LexState::INITIAL]);
    let mut rules = vec![
        ConverterRule::new(r"\\v")
            .states(initial.clone())
            .action(|_, s, _| {
                s.magicness = Magicness::VeryMagic;
                Ok(())
            }),
        ConverterRule::new(r"\\m")
            .states(initial.clone())
            .action(|_, s, _| {
                s.magicness = Magicness::Magic;
                Ok(())
            }),
        ConverterRule::new(r"\\M")
            .states(initial.clone())
            .action(|_, s, _| {
                s.magicness = Magicness::NonMagic;
                Ok(())
            }),
        ConverterRule::new(r"\\V")
            .states(initial)
            .action(|_, s, _| {
                s.magicness = Magicness::VeryNonMagic;
                Ok(())
            }),
    ];

    // Characters that only very magic patterns treat as operators.
    rules.extend([
        ConverterRule::new(r"<")
            .pre_condition(very_magic)
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok(r"\b(?=\w)".to_string())),
        ConverterRule::new(r">")
            .pre_condition(very_magic)
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok(r"\b(?<=\w)".to_string())),
        ConverterRule::new(r"=")
            .pre_condition(very_magic)
            .token(RegexToken::Quantifier)
            .yytext(|_, _| Ok("?".to_string())),
        ConverterRule::new(r"&")
            .pre_condition(very_magic)
            .token(RegexToken::And),
        ConverterRule::new(r"%\(")
            .pre_condition(very_magic)
            .token(RegexToken::StartGroup)
            .yytext(|_, _| Ok("(?:".to_string())),
        ConverterRule::new(r"%\[")
            .pre_condition(very_magic)
            .token(RegexToken::StartOptionalMatch)
            .action(|_, _, c| {
                c.push_current_and_begin(OPTIONAL_MATCH);
                Ok(())
            }),
        ConverterRule::new(r"@\d*(?:<?[=!]|>)")
            .pre_condition(very_magic)
            .token(RegexToken::ZeroWidth)
            .yytext(zero_width),
        ConverterRule::new(r"\{(?P<body>{QuantifierBody})\}")
            .pre_condition(very_magic)
            .token(RegexToken::Quantifier)
            .yytext(quantifier),
        ConverterRule::new(r"\(")
            .pre_condition(very_magic)
            .token(RegexToken::StartGroup)
            .yytext(|_, _| Ok("(".to_string())),
        ConverterRule::new(r"\)")
            .pre_condition(very_magic)
            .token(RegexToken::EndGroup)
            .yytext(|_, _| Ok(")".to_string())),
        ConverterRule::new(r"\|")
            .pre_condition(very_magic)
            .token(RegexToken::Or),
        ConverterRule::new(r"\+")
            .pre_condition(very_magic)
            .token(RegexToken::Quantifier)
            .yytext(|_, _| Ok("+".to_string())),
        ConverterRule::new(r"\?")
            .pre_condition(very_magic)
            .token(RegexToken::Quantifier)
            .yytext(|_, _| Ok("?".to_string())),
    ]);

    rules.extend([
        ConverterRule::new(r"[\x00-\x1F]")
            .token(RegexToken::Literal)
            .yytext(|m, _| {
                Ok(format!(
                    "\\x{:02X}",
                    m.as_str().chars().next().map_or(0, |c| c as u32)
                ))
            }),
        ConverterRule::new(r"[^\^$.(){\\\[\]?+*|@]")
            .token(RegexToken::Literal)
            .yytext(|m, _| {
                Ok(match m.as_str() {
                    "}" => "\\}".to_string(),
                    c => c.to_string(),
                })
            }),
        ConverterRule::new(r"@")
            .token(RegexToken::Literal)
            .yytext(verbatim),
        ConverterRule::new(r"[(){]")
            .pre_condition(not_very_magic)
            .token(RegexToken::Literal)
            .yytext(|m, _| Ok(format!("\\{}", m.as_str()))),
        ConverterRule::new(r"\\\.")
            .pre_condition(non_magic)
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok(".".to_string())),
        ConverterRule::new(r"\.")
            .pre_condition(non_magic)
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("\\.".to_string())),
        ConverterRule::new(r"\.")
            .token(RegexToken::Literal)
            .yytext(verbatim),
        ConverterRule::new(r"\*")
            .pre_condition(non_magic)
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("\\*".to_string())),
        ConverterRule::new(r"\|")
            .pre_condition(not_very_magic)
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("\\|".to_string())),
        ConverterRule::new(r"\$")
            .token(RegexToken::Dollar)
            .yytext(|_, s| Ok(s.magic_dollar().to_string())),
        ConverterRule::new(r"\^")
            .token(RegexToken::Caret)
            .yytext(|_, s| Ok(s.magic_caret().to_string())),
        ConverterRule::new(r"\\[$^]")
            .token(RegexToken::Literal)
            .yytext(verbatim),
        ConverterRule::new(r"\\_\^")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("(?m:^)".to_string())),
        ConverterRule::new(r"\\_\$")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("(?m:$)".to_string())),
        ConverterRule::new(r"\\_\.")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("(?s:.)".to_string())),
        ConverterRule::new(r"\\<")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok(r"\b(?=\w)".to_string())),
        ConverterRule::new(r"\\>")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok(r"\b(?<=\w)".to_string())),
        ConverterRule::new(r"\\zs")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("(?<zs>)".to_string()))
            .action(|_, s, _| {
                s.has_match_start_group = true;
                Ok(())
            }),
        ConverterRule::new(r"\\ze")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("(?<ze>)".to_string()))
            .action(|_, s, _| {
                s.has_match_end_group = true;
                Ok(())
            }),
        ConverterRule::new(r"\\%\^")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("\\A".to_string())),
        ConverterRule::new(r"\\%\$")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("\\z".to_string())),
        // Cursor, mark, line and column positions have no meaning outside an editor.
        ConverterRule::new(r"\\%(?:V|\#|[<>]?'.|[<>]?\d+[lcv])"),
        ConverterRule::new(r"\\Z"),
        ConverterRule::new(r"\\[Cc]"),
        ConverterRule::new(r"\\(?P<newline>_)?(?P<class>[iIkKfFpPsSdDxXoOwWhHaAlLuU])")
            .token(RegexToken::Literal)
            .yytext(character_class),
    ]);

    // Character codes, also valid inside collections where `\d123` is a decimal code.
    rules.extend([
        ConverterRule::new(r"\\%?d(?P<number>\d+)")
            .states(StateSet::All)
            .token(RegexToken::Literal)
            .yytext(|m, _| code_point(m, 10)),
        ConverterRule::new(r"\\%?o(?P<number>[0-7]{1,4})")
            .states(StateSet::All)
            .token(RegexToken::Literal)
            .yytext(|m, _| code_point(m, 8)),
        ConverterRule::new(r"\\%?x(?P<number>[0-9a-fA-F]{1,2})")
            .states(StateSet::All)
            .token(RegexToken::Literal)
            .yytext(|m, _| code_point(m, 16)),
        ConverterRule::new(r"\\%?u(?P<number>[0-9a-fA-F]{1,4})")
            .states(StateSet::All)
            .token(RegexToken::Literal)
            .yytext(|m, _| code_point(m, 16)),
        ConverterRule::new(r"\\%?U(?P<number>[0-9a-fA-F]{1,8})")
            .states(StateSet::All)
            .token(RegexToken::Literal)
            .yytext(|m, _| code_point(m, 16)),
    ]);

    rules.extend([
        ConverterRule::new(r"\\&")
            .pre_condition(not_very_magic)
            .token(RegexToken::And),
        ConverterRule::new(r"\\\|")
            .pre_condition(not_very_magic)
            .token(RegexToken::Or),
        ConverterRule::new(r"\\\(")
            .pre_condition(not_very_magic)
            .token(RegexToken::StartGroup)
            .yytext(|_, _| Ok("(".to_string())),
        ConverterRule::new(r"\\%\(")
            .token(RegexToken::StartGroup)
            .yytext(|_, _| Ok("(?:".to_string())),
        ConverterRule::new(r"\\z\(")
            .token(RegexToken::StartGroup)
            .yytext(|_, s| Ok(format!("(?<z{}>", s.external_groups + 1)))
            .action(|_, s, _| {
                s.external_groups += 1;
                Ok(())
            }),
        ConverterRule::new(r"\\\)")
            .pre_condition(not_very_magic)
            .token(RegexToken::EndGroup)
            .yytext(|_, _| Ok(")".to_string())),
        ConverterRule::new(r"\A\*")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("\\*".to_string())),
        ConverterRule::new(r"\*")
            .pre_condition(magic_or_very_magic)
            .token(RegexToken::Quantifier)
            .yytext(verbatim),
        ConverterRule::new(r"\\\*")
            .pre_condition(non_magic)
            .token(RegexToken::Quantifier)
            .yytext(|_, _| Ok("*".to_string())),
        ConverterRule::new(r"\\\+")
            .pre_condition(not_very_magic)
            .token(RegexToken::Quantifier)
            .yytext(|_, _| Ok("+".to_string())),
        ConverterRule::new(r"\\[?=]")
            .pre_condition(not_very_magic)
            .token(RegexToken::Quantifier)
            .yytext(|_, _| Ok("?".to_string())),
        ConverterRule::new(r"\\\{(?P<body>{QuantifierBody})\\?\}")
            .pre_condition(not_very_magic)
            .token(RegexToken::Quantifier)
            .yytext(quantifier),
        ConverterRule::new(r"\\@\d*(?:<?[=!]|>)")
            .pre_condition(not_very_magic)
            .token(RegexToken::ZeroWidth)
            .yytext(zero_width),
    ]);

    // Collections
    rules.extend([
        ConverterRule::new(r"(?P<newline>\\_)?\[(?P<caret>\^)?(?P<bracket>\])?")
            .pre_condition(magic_or_very_magic)
            .token(RegexToken::StartCollection)
            .yytext(collection_start)
            .action(enter_collection),
        ConverterRule::new(r"\\(?P<newline>_)?\[(?P<caret>\^)?(?P<bracket>\])?")
            .pre_condition(non_magic)
            .token(RegexToken::StartCollection)
            .yytext(collection_start)
            .action(enter_collection),
        ConverterRule::new(r"\]")
            .states(StateSet::of(&[COLLECTION]))
            .token(RegexToken::EndCollection)
            .yytext(|_, s| Ok(if s.newline_collection { "])" } else { "]" }.to_string()))
            .action(|_, s, c| {
                s.newline_collection = false;
                c.pop_state()
            }),
        ConverterRule::new(r"\[:(?P<name>\w+):\]")
            .states(StateSet::of(&[COLLECTION]))
            .token(RegexToken::Literal)
            .yytext(named_collection),
        ConverterRule::new(r"\[[=.](?P<char>[^\]])[=.]\]")
            .states(StateSet::of(&[COLLECTION]))
            .token(RegexToken::Literal)
            .yytext(|m, _| {
                Ok(regex_syntax::escape(m.group("char").unwrap_or_default()))
            }),
        ConverterRule::new(r"\\[bertn\^\\\-\]]")
            .states(StateSet::of(&[COLLECTION]))
            .token(RegexToken::Literal)
            .yytext(|m, _| {
                Ok(match m.as_str() {
                    r"\e" => "\\x1B".to_string(),
                    r"\b" => "\\x08".to_string(),
                    other => other.to_string(),
                })
            }),
        ConverterRule::new(r"\\")
            .states(StateSet::of(&[COLLECTION]))
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("\\\\".to_string())),
        ConverterRule::new(r"(?s:.)")
            .states(StateSet::of(&[COLLECTION]))
            .token(RegexToken::Literal)
            .yytext(collection_char),
    ]);

    // Optional sequences and the remaining escapes
    rules.extend([
        ConverterRule::new(r"\\%\[")
            .token(RegexToken::StartOptionalMatch)
            .action(|_, _, c| {
                c.push_current_and_begin(OPTIONAL_MATCH);
                Ok(())
            }),
        ConverterRule::new(r"\]")
            .states(StateSet::of(&[OPTIONAL_MATCH]))
            .token(RegexToken::EndOptionalMatch)
            .action(|_, _, c| c.pop_state()),
        ConverterRule::new(r"[\[\]?+]")
            .token(RegexToken::Literal)
            .yytext(|m, _| Ok(format!("\\{}", m.as_str()))),
        ConverterRule::new(r"\\z(?P<external>[1-9])")
            .token(RegexToken::Literal)
            .yytext(verbatim)
            .action(|m, s, _| {
                let index = m
                    .group("external")
                    .and_then(|d| d.parse::<usize>().ok())
                    .unwrap_or_default();
                s.last_external_match = s.last_external_match.max(index);
                Ok(())
            }),
        ConverterRule::new(r"\\[1-9]")
            .token(RegexToken::Literal)
            .yytext(verbatim)
            .action(|_, s, _| {
                s.has_back_reference = true;
                Ok(())
            }),
        ConverterRule::new(r"\\(?s:.)")
            .token(RegexToken::Literal)
            .yytext(escaped_char),
        ConverterRule::new(r"\\\z")
            .token(RegexToken::Literal)
            .yytext(|_, _| Ok("\\\\".to_string())),
    ]);
    rules
});
