use std::sync::LazyLock;

use crate::{LexControl, LexMatch, LexRule, LexState, Result, StateSet, Value, VimsynError};

/// Entered by `let`, left by the assignment operator.
pub(crate) const ASSIGNMENT: LexState = LexState::new(1, true);

/// The tokens of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EvalToken {
    Constant,
    FunctionCall,
    Unlet,
    Assign,
    And,
    Or,
    Equals,
    NotEquals,
    LessOrEqual,
    GreaterOrEqual,
    LessThan,
    GreaterThan,
    Variable,
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Dot,
}

impl From<EvalToken> for usize {
    fn from(token: EvalToken) -> Self {
        token as usize
    }
}

type EvalRule = LexRule<(), EvalToken, Value>;

fn text(m: &LexMatch<'_>, _: &()) -> Result<Value> {
    Ok(Value::Str(m.as_str().to_string()))
}

fn group_text(m: &LexMatch<'_>, group: &str) -> Value {
    Value::Str(m.group(group).unwrap_or_default().to_string())
}

/// The value of comparison tokens tells whether to ignore case (`==?`).
fn case_flag(m: &LexMatch<'_>, _: &()) -> Result<Value> {
    Ok(Value::Bool(m.group("case") == Some("?")))
}

fn number_error(m: &LexMatch<'_>, e: impl std::fmt::Display) -> VimsynError {
    VimsynError::new(crate::VimsynErrorKind::Evaluation(format!(
        "Invalid number '{}': {e}",
        m.as_str()
    )))
}

fn punctuation(m: &LexMatch<'_>, _: &mut (), c: &mut LexControl<EvalToken, Value>) -> Result<()> {
    let token = match m.as_str() {
        "(" => EvalToken::LParen,
        ")" => EvalToken::RParen,
        "," => EvalToken::Comma,
        "+" => EvalToken::Plus,
        "-" => EvalToken::Minus,
        "*" => EvalToken::Star,
        "/" => EvalToken::Slash,
        "%" => EvalToken::Percent,
        "!" => EvalToken::Bang,
        _ => EvalToken::Dot,
    };
    c.enqueue_token(token, Value::Null);
    Ok(())
}

pub(crate) static EVALUATOR_RULES: LazyLock<Vec<EvalRule>> = LazyLock::new(|| {
    vec![
        EvalRule::new(r"\d+\.\d+")
            .token(EvalToken::Constant)
            .yytext(|m, _| {
                m.as_str()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| number_error(m, e))
            }),
        EvalRule::new(r"0[xX](?P<hex>[0-9a-fA-F]+)")
            .token(EvalToken::Constant)
            .yytext(|m, _| {
                i64::from_str_radix(m.group("hex").unwrap_or_default(), 16)
                    .map(Value::Int)
                    .map_err(|e| number_error(m, e))
            }),
        EvalRule::new(r"\d+")
            .token(EvalToken::Constant)
            .yytext(|m, _| {
                m.as_str()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| number_error(m, e))
            }),
        EvalRule::new(r"(?P<name>[A-Za-z_][\w:\#]*) \s* \(")
            .token(EvalToken::FunctionCall)
            .yytext(|m, _| Ok(group_text(m, "name")))
            .action(|_, _, c| {
                c.enqueue_token(EvalToken::LParen, Value::Null);
                Ok(())
            }),
        EvalRule::new(r"let\b").action(|_, _, c| {
            c.begin(ASSIGNMENT);
            Ok(())
        }),
        EvalRule::new(r"unl(?:et|e)?\b!?").token(EvalToken::Unlet),
        EvalRule::new(r"(?P<op>[-+.])?=")
            .states(StateSet::of(&[ASSIGNMENT]))
            .token(EvalToken::Assign)
            .yytext(|m, _| Ok(group_text(m, "op")))
            .action(|_, _, c| {
                c.begin(LexState::INITIAL);
                Ok(())
            }),
        EvalRule::new(r"true\b")
            .token(EvalToken::Constant)
            .yytext(|_, _| Ok(Value::Bool(true))),
        EvalRule::new(r"false\b")
            .token(EvalToken::Constant)
            .yytext(|_, _| Ok(Value::Bool(false))),
        EvalRule::new(r"null\b").token(EvalToken::Constant),
        EvalRule::new(r"&&").token(EvalToken::And),
        EvalRule::new(r"\|\|").token(EvalToken::Or),
        EvalRule::new(r"==(?P<case>[\#?])?")
            .token(EvalToken::Equals)
            .yytext(case_flag),
        EvalRule::new(r"!=(?P<case>[\#?])?")
            .token(EvalToken::NotEquals)
            .yytext(case_flag),
        EvalRule::new(r"<=(?P<case>[\#?])?")
            .token(EvalToken::LessOrEqual)
            .yytext(case_flag),
        EvalRule::new(r">=(?P<case>[\#?])?")
            .token(EvalToken::GreaterOrEqual)
            .yytext(case_flag),
        EvalRule::new(r"<(?P<case>[\#?])?")
            .token(EvalToken::LessThan)
            .yytext(case_flag),
        EvalRule::new(r">(?P<case>[\#?])?")
            .token(EvalToken::GreaterThan)
            .yytext(case_flag),
        EvalRule::new(r"(?:[bglstvw]:|&(?:[lg]:)?)?[A-Za-z_]\w*")
            .states(StateSet::All)
            .token(EvalToken::Variable)
            .yytext(text),
        EvalRule::new(r"'(?P<string>(?:''|[^'])*)'")
            .token(EvalToken::Constant)
            .yytext(|m, _| {
                Ok(Value::Str(
                    m.group("string").unwrap_or_default().replace("''", "'"),
                ))
            }),
        EvalRule::new(r#""(?P<string>(?:\\.|[^"\\])*)""#)
            .token(EvalToken::Constant)
            .yytext(|m, _| Ok(Value::Str(unescape(m.group("string").unwrap_or_default())))),
        EvalRule::new(r"[-()*/%+!,.]").action(punctuation),
        EvalRule::new(r"\s+").states(StateSet::All),
    ]
});

/// Resolves the backslash escapes of double quoted strings.
fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('e') => result.push('\x1b'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EasyLex;

    fn tokens(input: &str) -> Vec<(EvalToken, Value)> {
        let mut lex = EasyLex::new(input, &EVALUATOR_RULES);
        lex.scan(&mut ()).unwrap();
        lex.drain_tokens().collect()
    }

    #[test]
    fn test_let_switches_to_assignment_state() {
        assert_eq!(
            vec![
                (EvalToken::Variable, Value::from("b:is_sh")),
                (EvalToken::Assign, Value::from("")),
                (EvalToken::Constant, Value::Int(1)),
            ],
            tokens("let b:is_sh = 1")
        );
    }

    #[test]
    fn test_function_call_enqueues_parenthesis() {
        let toks: Vec<EvalToken> = tokens("exists('g:x') && v:version >= 600")
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            vec![
                EvalToken::FunctionCall,
                EvalToken::LParen,
                EvalToken::Constant,
                EvalToken::RParen,
                EvalToken::And,
                EvalToken::Variable,
                EvalToken::GreaterOrEqual,
                EvalToken::Constant,
            ],
            toks
        );
    }

    #[test]
    fn test_numbers_and_strings() {
        assert_eq!(
            vec![
                (EvalToken::Constant, Value::Float(1.5)),
                (EvalToken::Dot, Value::Null),
                (EvalToken::Constant, Value::from("it's")),
                (EvalToken::Dot, Value::Null),
                (EvalToken::Constant, Value::from("a\"b")),
            ],
            tokens(r#"1.5 . 'it''s' . "a\"b""#)
        );
    }

    #[test]
    fn test_unknown_character_is_a_fault() {
        let mut lex = EasyLex::new("a | b", &EVALUATOR_RULES);
        assert!(lex.scan(&mut ()).unwrap_err().is_engine_fault());
    }
}
