use log::trace;
use rustc_hash::FxHashMap;

use crate::{EasyLex, Result, VimsynError, VimsynErrorKind};

mod functions;
pub use functions::{Builtin, BuiltinFn, EvaluatorDefaults};

mod lexer;
use lexer::EVALUATOR_RULES;

mod parser;
use parser::ExpressionParser;

mod value;
pub use value::Value;

/// Evaluates the expressions of `if`, `elseif`, `let` and `unlet` commands.
///
/// Variable and function names are case-insensitive. Undefined variables evaluate to
/// [Value::Null].
#[derive(Debug, Clone)]
pub struct Evaluator {
    variables: FxHashMap<String, Value>,
    functions: Vec<Builtin>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Creates an evaluator that only knows its own builtins.
    pub fn new() -> Self {
        Self {
            variables: FxHashMap::default(),
            functions: functions::own_builtins(),
        }
    }

    /// Creates an evaluator seeded with the given defaults.
    pub fn with_defaults(defaults: &EvaluatorDefaults) -> Self {
        let mut evaluator = Self::new();
        for (name, value) in &defaults.variables {
            evaluator.set_variable(name, value.clone());
        }
        for function in &defaults.functions {
            evaluator.add_function(function.clone());
        }
        evaluator
    }

    /// Evaluates a statement: an expression, a `let` assignment or an `unlet`.
    pub fn evaluate(&mut self, expression: &str) -> Result<Value> {
        trace!("Evaluating '{expression}'");
        let mut lex = EasyLex::new(expression, &EVALUATOR_RULES);
        lex.scan(&mut ())?;
        let tokens = lex.drain_tokens().collect();
        ExpressionParser::new(expression, tokens, self).statement()
    }

    /// Evaluates an expression to its truth value.
    pub fn evaluate_condition(&mut self, expression: &str) -> Result<bool> {
        self.evaluate(expression).map(|value| value.is_true())
    }

    /// The value of a variable, [Value::Null] if it is not defined.
    pub fn get_variable(&self, name: &str) -> Value {
        self.variables
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Defines or overwrites a variable.
    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_lowercase(), value);
    }

    /// Removes a variable.
    pub fn kill_variable(&mut self, name: &str) {
        self.variables.remove(&name.to_lowercase());
    }

    /// Returns true if the variable is defined.
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(&name.to_lowercase())
    }

    /// Adds a function. A function with the same name and arity is replaced.
    pub fn add_function(&mut self, function: Builtin) {
        self.functions.retain(|f| {
            !(f.name().eq_ignore_ascii_case(function.name()) && f.arity() == function.arity())
        });
        self.functions.push(function);
    }

    /// Returns true if a function with that name exists.
    pub fn has_function(&self, name: &str) -> bool {
        self.functions
            .iter()
            .any(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Calls a function, resolved by name and number of arguments.
    pub fn call_function(&self, name: &str, args: &[Value]) -> Result<Value> {
        let mut candidates = self
            .functions
            .iter()
            .filter(|f| f.name().eq_ignore_ascii_case(name))
            .peekable();
        if candidates.peek().is_none() {
            return Err(VimsynError::new(VimsynErrorKind::Evaluation(format!(
                "Cannot find a function named '{name}'"
            ))));
        }
        match candidates.find(|f| f.arity() == args.len()) {
            Some(function) => function.call(self, args),
            None => Err(VimsynError::new(VimsynErrorKind::Evaluation(format!(
                "Incorrect number of arguments ({}) for function '{name}'",
                args.len()
            )))),
        }
    }
}
