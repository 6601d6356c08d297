use std::fmt;

use crate::{Evaluator, Result, Value};

/// Signature of builtin functions.
pub type BuiltinFn = fn(&Evaluator, &[Value]) -> Result<Value>;

/// A builtin function of the expression language.
#[derive(Clone)]
pub struct Builtin {
    name: String,
    arity: usize,
    function: BuiltinFn,
}

impl Builtin {
    /// Creates a builtin.
    pub fn new(name: impl Into<String>, arity: usize, function: BuiltinFn) -> Self {
        Self {
            name: name.into(),
            arity,
            function,
        }
    }

    /// The name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of arguments.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub(crate) fn call(&self, evaluator: &Evaluator, args: &[Value]) -> Result<Value> {
        (self.function)(evaluator, args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Variables and functions an [Evaluator] is seeded with.
#[derive(Debug, Clone, Default)]
pub struct EvaluatorDefaults {
    /// Predefined variables
    pub variables: Vec<(String, Value)>,
    /// Additional builtin functions
    pub functions: Vec<Builtin>,
}

impl EvaluatorDefaults {
    /// No variables and no additional functions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The defaults used for syntax scripts. They mimic a Vim 7 without GUI and switch on the
    /// optional parts of some popular syntax files.
    pub fn vim() -> Self {
        let variables = [
            ("version", Value::Int(700)),
            ("v:version", Value::Int(700)),
            ("&cpo", Value::from("aABceFs")),
            ("*AntSyntaxScript", Value::Int(1)),
            ("pascal_delphi", Value::Int(1)),
            ("g:mapleversion", Value::Int(10)),
            ("b:is_bash", Value::Int(1)),
            ("c_gnu", Value::Int(1)),
            ("g:vimsyntax_noerror", Value::Int(1)),
            ("g:vimembedscript", Value::Int(0)),
            ("php_htmlInstrings", Value::Int(1)),
            ("php_baselib", Value::Int(1)),
            ("php_asp_tags", Value::Int(1)),
            ("php_folding", Value::Int(0)),
            ("php_sync_method", Value::Int(100)),
        ];
        Self {
            variables: variables
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            functions: vec![
                Builtin::new("filereadable", 1, file_readable),
                Builtin::new("expand", 1, |_, args| Ok(args[0].clone())),
                Builtin::new("has", 1, |_, _| Ok(Value::Int(0))),
            ],
        }
    }

    /// Adds a variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    /// Adds a function.
    pub fn with_function(mut self, function: Builtin) -> Self {
        self.functions.push(function);
        self
    }
}

fn file_readable(_: &Evaluator, args: &[Value]) -> Result<Value> {
    let readable = std::fs::File::open(args[0].to_string()).is_ok();
    Ok(Value::Int(readable as i64))
}

fn exists(evaluator: &Evaluator, args: &[Value]) -> Result<Value> {
    let name = args[0].to_string();
    let found = evaluator.has_variable(&name)
        || name
            .strip_prefix('*')
            .is_some_and(|function| evaluator.has_function(function));
    Ok(Value::Int(found as i64))
}

fn abs(_: &Evaluator, args: &[Value]) -> Result<Value> {
    Ok(match &args[0] {
        Value::Float(f) => Value::Float(f.abs()),
        other => Value::Int(other.as_int().wrapping_abs()),
    })
}

fn max(_: &Evaluator, args: &[Value]) -> Result<Value> {
    Ok(match args[0].compare(&args[1], false) {
        Some(std::cmp::Ordering::Less) => args[1].clone(),
        _ => args[0].clone(),
    })
}

/// The functions every evaluator knows.
pub(crate) fn own_builtins() -> Vec<Builtin> {
    vec![
        Builtin::new("exists", 1, exists),
        Builtin::new("abs", 1, abs),
        Builtin::new("floor", 1, |_, args| Ok(Value::Float(args[0].as_float().floor()))),
        Builtin::new("ceil", 1, |_, args| Ok(Value::Float(args[0].as_float().ceil()))),
        Builtin::new("ceiling", 1, |_, args| Ok(Value::Float(args[0].as_float().ceil()))),
        Builtin::new("round", 1, |_, args| Ok(Value::Float(args[0].as_float().round()))),
        Builtin::new("max", 2, max),
    ]
}
