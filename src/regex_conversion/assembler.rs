use super::rules::RegexToken;
use crate::{Result, VimsynError, VimsynErrorKind};

/// Puts the converted tokens together.
///
/// Anchors are only magic at the borders of a branch, quantifiers and look-around operators are
/// postfix operators of the preceding atom, `\&` turns all but the last concat into look-aheads.
pub(crate) struct Assembler<'t> {
    vim_regex: &'t str,
    tokens: &'t [(RegexToken, String)],
    pos: usize,
    pub(crate) matches_magic_dollar: bool,
}

impl<'t> Assembler<'t> {
    pub(crate) fn new(vim_regex: &'t str, tokens: &'t [(RegexToken, String)]) -> Self {
        Self {
            vim_regex,
            tokens,
            pos: 0,
            matches_magic_dollar: false,
        }
    }

    fn error(&self, message: impl Into<String>) -> VimsynError {
        VimsynError::new(VimsynErrorKind::RegexConversion {
            vim_regex: self.vim_regex.to_string(),
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<RegexToken> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn next(&mut self) -> Option<&'t (RegexToken, String)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: RegexToken, message: &str) -> Result<&'t str> {
        match self.next() {
            Some((token, text)) if *token == expected => Ok(text),
            _ => Err(self.error(message)),
        }
    }

    pub(crate) fn assemble(mut self) -> Result<(String, bool)> {
        let regex = self.alternation()?;
        match self.peek() {
            None => Ok((regex, self.matches_magic_dollar)),
            Some(RegexToken::EndGroup) => Err(self.error("unmatched \\)")),
            Some(token) => Err(self.error(format!("unexpected {token:?}"))),
        }
    }

    fn alternation(&mut self) -> Result<String> {
        let mut regex = self.branch()?;
        while self.peek() == Some(RegexToken::Or) {
            self.next();
            regex.push('|');
            regex.push_str(&self.branch()?);
        }
        Ok(regex)
    }

    fn branch(&mut self) -> Result<String> {
        let mut concats = vec![self.concat()?];
        while self.peek() == Some(RegexToken::And) {
            self.next();
            concats.push(self.concat()?);
        }
        let last = concats.pop().unwrap_or_default();
        let mut regex: String = concats.iter().map(|c| format!("(?={c})")).collect();
        regex.push_str(&last);
        Ok(regex)
    }

    fn at_concat_end(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(RegexToken::Or)
                | Some(RegexToken::And)
                | Some(RegexToken::EndGroup)
                | Some(RegexToken::EndOptionalMatch)
        )
    }

    fn concat(&mut self) -> Result<String> {
        let mut regex = String::new();
        let mut first = true;
        while !self.at_concat_end() {
            let atom = self.atom(first)?;
            regex.push_str(&self.postfix(atom)?);
            first = false;
        }
        Ok(regex)
    }

    fn postfix(&mut self, mut atom: String) -> Result<String> {
        loop {
            match self.peek() {
                Some(RegexToken::Quantifier) => {
                    let quantifier = self.expect(RegexToken::Quantifier, "quantifier")?;
                    atom.push_str(quantifier);
                }
                Some(RegexToken::ZeroWidth) => {
                    let open = self.expect(RegexToken::ZeroWidth, "look-around")?;
                    atom = format!("{open}{atom})");
                }
                _ => return Ok(atom),
            }
        }
    }

    fn atom(&mut self, first_in_concat: bool) -> Result<String> {
        let Some((token, text)) = self.next() else {
            return Err(self.error("unexpected end of pattern"));
        };
        match token {
            RegexToken::Literal => Ok(text.clone()),
            RegexToken::Caret if first_in_concat => Ok(text.clone()),
            RegexToken::Caret => Ok("\\^".to_string()),
            RegexToken::Dollar if self.at_concat_end() => {
                self.matches_magic_dollar = true;
                Ok(text.clone())
            }
            RegexToken::Dollar => Ok("\\$".to_string()),
            RegexToken::StartGroup => {
                let inner = self.alternation()?;
                let close = self.expect(RegexToken::EndGroup, "missing \\)")?;
                Ok(format!("{text}{inner}{close}"))
            }
            RegexToken::StartCollection => {
                let mut collection = text.clone();
                loop {
                    match self.next() {
                        Some((RegexToken::Literal, item)) => collection.push_str(item),
                        Some((RegexToken::EndCollection, close)) => {
                            collection.push_str(close);
                            return Ok(collection);
                        }
                        _ => return Err(self.error("missing ]")),
                    }
                }
            }
            RegexToken::StartOptionalMatch => {
                let mut atoms = Vec::new();
                while self.peek() != Some(RegexToken::EndOptionalMatch) {
                    if self.peek().is_none() {
                        return Err(self.error("missing ] of \\%["));
                    }
                    let atom = self.atom(false)?;
                    atoms.push(self.postfix(atom)?);
                }
                self.next();
                Ok(atoms
                    .iter()
                    .rev()
                    .fold(String::new(), |inner, atom| format!("(?:{atom}{inner})?")))
            }
            RegexToken::Quantifier | RegexToken::ZeroWidth => {
                Err(self.error(format!("'{text}' follows nothing")))
            }
            other => Err(self.error(format!("unexpected {other:?}"))),
        }
    }
}
