use crate::{Evaluator, Result};

/// A frame of the `if` stack.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct IfStatement {
    /// The condition of the `if`, comment already stripped.
    pub(crate) condition: String,
    /// One of the branches of the chain was taken already.
    pub(crate) has_taken_branch: bool,
    /// The current branch is taken.
    pub(crate) taking_branch: bool,
    /// The whole chain sits in a branch that is not taken.
    pub(crate) suppress_all_branches: bool,
}

impl IfStatement {
    /// Starts a chain. In an inactive context the condition is not even evaluated.
    pub(crate) fn new(condition: &str, active: bool, evaluator: &mut Evaluator) -> Result<Self> {
        let mut statement = Self {
            condition: condition.to_string(),
            suppress_all_branches: !active,
            ..Default::default()
        };
        if active && evaluator.evaluate_condition(condition)? {
            statement.take_branch();
        }
        Ok(statement)
    }

    /// `elseif`: the first branch whose condition holds wins.
    pub(crate) fn else_if(&mut self, condition: &str, evaluator: &mut Evaluator) -> Result<()> {
        if self.suppress_all_branches {
            return Ok(());
        }
        self.taking_branch = false;
        if !self.has_taken_branch && evaluator.evaluate_condition(condition)? {
            self.take_branch();
        }
        Ok(())
    }

    /// `else`
    pub(crate) fn otherwise(&mut self) {
        if self.suppress_all_branches {
            return;
        }
        self.taking_branch = !self.has_taken_branch;
        self.has_taken_branch = true;
    }

    fn take_branch(&mut self) {
        self.taking_branch = true;
        self.has_taken_branch = true;
    }
}

/// Cuts a trailing `"` comment off a command line.
///
/// Backslashes escape the next character. The line is cut at the last unescaped quote if the
/// number of unescaped quotes is odd, so quoted strings survive.
pub(crate) fn strip_comment(line: &str) -> &str {
    let mut quotes = 0;
    let mut last_quote = None;
    let mut chars = line.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' => {
                quotes += 1;
                last_quote = Some(index);
            }
            _ => {}
        }
    }
    match last_quote {
        Some(index) if quotes % 2 == 1 => &line[..index],
        _ => line,
    }
}

/// Splits a line at `|` command separators. Bars inside quoted strings, escaped bars and `||`
/// do not separate.
pub(crate) fn split_commands(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let bytes = line.as_bytes();
    let mut index = 0;
    while index < bytes.len() {
        let c = bytes[index];
        match (quote, c) {
            (_, b'\\') => index += 1,
            (Some(q), _) if c == q as u8 => quote = None,
            (None, b'"') | (None, b'\'') => quote = Some(c as char),
            (None, b'|') => {
                if bytes.get(index + 1) == Some(&b'|') {
                    index += 1;
                } else {
                    segments.push(&line[start..index]);
                    start = index + 1;
                }
            }
            _ => {}
        }
        index += 1;
    }
    segments.push(&line[start..]);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EvaluatorDefaults;
    use rstest::rstest;

    #[rstest]
    #[case::no_comment(r#"let x = 1"#, r#"let x = 1"#)]
    #[case::trailing_comment(r#"let x = 1 " one"#, r#"let x = 1 "#)]
    #[case::string_survives(r#"let x = "a""#, r#"let x = "a""#)]
    #[case::string_then_comment(r#"let x = "a" " comment"#, r#"let x = "a" "#)]
    #[case::escaped_quote(r#"let x = \" y"#, r#"let x = \" y"#)]
    fn test_strip_comment(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(expected, strip_comment(line));
    }

    #[test]
    fn test_split_commands() {
        assert_eq!(
            vec!["if 1 ", " syn keyword X y ", " endif"],
            split_commands("if 1 | syn keyword X y | endif")
        );
        assert_eq!(vec!["if a || b"], split_commands("if a || b"));
        assert_eq!(vec![r#"let s = "a|b""#], split_commands(r#"let s = "a|b""#));
        assert_eq!(vec![r"syn match X /a\|b/"], split_commands(r"syn match X /a\|b/"));
    }

    #[test]
    fn test_branches() {
        let mut evaluator = Evaluator::with_defaults(&EvaluatorDefaults::vim());
        let mut statement = IfStatement::new("version < 600", true, &mut evaluator).unwrap();
        assert!(!statement.taking_branch);
        statement.else_if("version >= 700", &mut evaluator).unwrap();
        assert!(statement.taking_branch);
        statement.else_if("1", &mut evaluator).unwrap();
        assert!(!statement.taking_branch);
        statement.otherwise();
        assert!(!statement.taking_branch);
    }

    #[test]
    fn test_suppressed_chain_evaluates_nothing() {
        let mut evaluator = Evaluator::new();
        // An undefined function would fail if it was evaluated.
        let mut statement = IfStatement::new("nosuchfunction()", false, &mut evaluator).unwrap();
        statement.else_if("nosuchfunction()", &mut evaluator).unwrap();
        statement.otherwise();
        assert!(!statement.taking_branch);
        assert!(statement.suppress_all_branches);
    }
}
