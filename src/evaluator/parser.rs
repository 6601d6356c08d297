use std::cmp::Ordering;
use std::collections::VecDeque;

use log::trace;

use super::lexer::EvalToken;
use crate::{Evaluator, Result, Value, VimsynError, VimsynErrorKind};

/// Recursive descent over the token queue. Evaluation happens while parsing.
///
/// ```text
/// statement  := 'unlet' Variable+ | Variable Assign or_expr | or_expr
/// or_expr    := and_expr ('||' and_expr)*
/// and_expr   := comparison ('&&' comparison)*
/// comparison := additive (CmpOp additive)?
/// additive   := term (('+' | '-' | '.') term)*
/// term       := unary (('*' | '/' | '%') unary)*
/// unary      := ('!' | '-' | '+') unary | primary
/// primary    := Constant | Variable | FunctionCall '(' args? ')' | '(' or_expr ')'
/// ```
pub(crate) struct ExpressionParser<'a> {
    expression: &'a str,
    tokens: VecDeque<(EvalToken, Value)>,
    evaluator: &'a mut Evaluator,
}

impl<'a> ExpressionParser<'a> {
    pub(crate) fn new(
        expression: &'a str,
        tokens: VecDeque<(EvalToken, Value)>,
        evaluator: &'a mut Evaluator,
    ) -> Self {
        Self {
            expression,
            tokens,
            evaluator,
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> VimsynError {
        VimsynError::new(VimsynErrorKind::ExpressionSyntax {
            expression: self.expression.to_string(),
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<EvalToken> {
        self.tokens.front().map(|(t, _)| *t)
    }

    fn next(&mut self) -> Result<(EvalToken, Value)> {
        self.tokens
            .pop_front()
            .ok_or_else(|| self.syntax_error("unexpected end of expression"))
    }

    fn expect(&mut self, expected: EvalToken) -> Result<Value> {
        match self.next()? {
            (token, value) if token == expected => Ok(value),
            (token, _) => Err(self.syntax_error(format!("expected {expected:?}, found {token:?}"))),
        }
    }

    pub(crate) fn statement(mut self) -> Result<Value> {
        let result = match (self.peek(), self.tokens.get(1).map(|(t, _)| *t)) {
            (Some(EvalToken::Unlet), _) => self.unlet()?,
            (Some(EvalToken::Variable), Some(EvalToken::Assign)) => self.assignment()?,
            (None, _) => return Err(self.syntax_error("empty expression")),
            _ => self.or_expr()?,
        };
        match self.peek() {
            None => Ok(result),
            Some(token) => Err(self.syntax_error(format!("unexpected {token:?}"))),
        }
    }

    fn unlet(&mut self) -> Result<Value> {
        self.next()?;
        if self.peek() != Some(EvalToken::Variable) {
            return Err(self.syntax_error("'unlet' needs a variable name"));
        }
        while self.peek() == Some(EvalToken::Variable) {
            let name = self.next()?.1.to_string();
            trace!("unlet {name}");
            self.evaluator.kill_variable(&name);
        }
        Ok(Value::Null)
    }

    fn assignment(&mut self) -> Result<Value> {
        let name = self.next()?.1.to_string();
        let operator = self.expect(EvalToken::Assign)?.to_string();
        let rhs = self.or_expr()?;
        let value = match operator.as_str() {
            "+" => self.evaluator.get_variable(&name).plus(&rhs)?,
            "-" => self.evaluator.get_variable(&name).minus(&rhs)?,
            "." => self.evaluator.get_variable(&name).concat(&rhs),
            _ => rhs,
        };
        trace!("let {name} = {value:?}");
        self.evaluator.set_variable(&name, value.clone());
        Ok(value)
    }

    fn or_expr(&mut self) -> Result<Value> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(EvalToken::Or) {
            self.next()?;
            let rhs = self.and_expr()?;
            lhs = Value::Bool(lhs.is_true() || rhs.is_true());
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Value> {
        let mut lhs = self.comparison()?;
        while self.peek() == Some(EvalToken::And) {
            self.next()?;
            let rhs = self.comparison()?;
            lhs = Value::Bool(lhs.is_true() && rhs.is_true());
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Value> {
        let lhs = self.additive()?;
        let accepted: fn(Ordering) -> bool = match self.peek() {
            Some(EvalToken::Equals) => Ordering::is_eq,
            Some(EvalToken::NotEquals) => Ordering::is_ne,
            Some(EvalToken::LessThan) => Ordering::is_lt,
            Some(EvalToken::LessOrEqual) => Ordering::is_le,
            Some(EvalToken::GreaterThan) => Ordering::is_gt,
            Some(EvalToken::GreaterOrEqual) => Ordering::is_ge,
            _ => return Ok(lhs),
        };
        let ignore_case = self.next()?.1.is_true();
        let rhs = self.additive()?;
        Ok(Value::Bool(
            lhs.compare(&rhs, ignore_case).is_some_and(accepted),
        ))
    }

    fn additive(&mut self) -> Result<Value> {
        let mut lhs = self.term()?;
        loop {
            lhs = match self.peek() {
                Some(EvalToken::Plus) => {
                    self.next()?;
                    lhs.plus(&self.term()?)?
                }
                Some(EvalToken::Minus) => {
                    self.next()?;
                    lhs.minus(&self.term()?)?
                }
                Some(EvalToken::Dot) => {
                    self.next()?;
                    lhs.concat(&self.term()?)
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<Value> {
        let mut lhs = self.unary()?;
        loop {
            let operation: fn(&Value, &Value) -> Result<Value> = match self.peek() {
                Some(EvalToken::Star) => Value::times,
                Some(EvalToken::Slash) => Value::divided_by,
                Some(EvalToken::Percent) => Value::modulo,
                _ => return Ok(lhs),
            };
            self.next()?;
            let rhs = self.unary()?;
            lhs = operation(&lhs, &rhs)?;
        }
    }

    fn unary(&mut self) -> Result<Value> {
        match self.peek() {
            Some(EvalToken::Bang) => {
                self.next()?;
                Ok(Value::Bool(!self.unary()?.is_true()))
            }
            Some(EvalToken::Minus) => {
                self.next()?;
                self.unary()?.negated()
            }
            Some(EvalToken::Plus) => {
                self.next()?;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Value> {
        match self.next()? {
            (EvalToken::Constant, value) => Ok(value),
            (EvalToken::Variable, name) => Ok(self.evaluator.get_variable(&name.to_string())),
            (EvalToken::FunctionCall, name) => {
                self.expect(EvalToken::LParen)?;
                let mut args = Vec::new();
                if self.peek() != Some(EvalToken::RParen) {
                    args.push(self.or_expr()?);
                    while self.peek() == Some(EvalToken::Comma) {
                        self.next()?;
                        args.push(self.or_expr()?);
                    }
                }
                self.expect(EvalToken::RParen)?;
                self.evaluator.call_function(&name.to_string(), &args)
            }
            (EvalToken::LParen, _) => {
                let value = self.or_expr()?;
                self.expect(EvalToken::RParen)?;
                Ok(value)
            }
            (token, _) => Err(self.syntax_error(format!("unexpected {token:?}"))),
        }
    }
}
