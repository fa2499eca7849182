use std::{collections::HashMap, fmt};

use miette::Diagnostic;
use thiserror::Error;

use crate::tree::Node;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum EvalError {
    #[error("undefined variable: {name}")]
    #[diagnostic(
        code(eval::undefined_variable),
        help("bind `{name}` in the variable environment before evaluating")
    )]
    UndefinedVariable { name: String },

    #[error("could not resolve variable `{name}`: {message}")]
    #[diagnostic(code(eval::resolve))]
    Resolve { name: String, message: String },

    #[error("function `{name}` has no argument")]
    #[diagnostic(
        code(eval::missing_argument),
        help("`{name}` was registered as a function after the tree was built")
    )]
    MissingArgument { name: String },

    #[error("`{name}` is called but is not a registered function")]
    #[diagnostic(
        code(eval::not_a_function),
        help("`{name}` was removed from the function registry after the tree was built")
    )]
    NotAFunction { name: String },
}

pub type Function = Box<dyn Fn(f64) -> f64>;

/// Named unary functions.
#[derive(Default)]
pub struct Functions {
    functions: HashMap<String, Function>,
}

impl Functions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, function: impl Fn(f64) -> f64 + 'static) {
        self.functions.insert(name.into(), Box::new(function));
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.functions.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl fmt::Debug for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}

/// Variables and functions an expression is evaluated against.
#[derive(Debug, Default)]
pub struct Environment {
    pub variables: HashMap<String, f64>,
    pub functions: Functions,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment with `sin`, `cos`, `tan` and `ln` registered.
    pub fn with_builtins() -> Self {
        Environment {
            variables: HashMap::new(),
            functions: Functions::builtin(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.variables.get(name).copied()
    }

    pub fn define(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.variables.insert(name.into(), value)
    }
}

/// Supplies a value for a variable that is not bound in the environment.
///
/// `Ok(None)` means the variable stays unresolved and evaluation fails with
/// [`EvalError::UndefinedVariable`].
pub trait Resolver {
    fn resolve(&mut self, name: &str) -> Result<Option<f64>, EvalError>;
}

/// Never resolves anything. Unbound variables are hard errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolve;

impl Resolver for NoResolve {
    fn resolve(&mut self, _: &str) -> Result<Option<f64>, EvalError> {
        Ok(None)
    }
}

impl<F> Resolver for F
where
    F: FnMut(&str) -> Option<f64>,
{
    fn resolve(&mut self, name: &str) -> Result<Option<f64>, EvalError> {
        Ok(self(name))
    }
}

pub struct Evaluator<'env, R> {
    environment: &'env mut Environment,
    resolver: R,
}

impl<'env, R: Resolver> Evaluator<'env, R> {
    pub fn new(environment: &'env mut Environment, resolver: R) -> Self {
        Self {
            environment,
            resolver,
        }
    }

    /// Evaluates `node`, left operand before right.
    ///
    /// A variable missing from the environment is handed to the resolver, and a
    /// value it returns is defined in the environment before evaluation goes on.
    /// That insert is the only mutation this performs.
    pub fn evaluate(&mut self, node: &Node) -> Result<f64, EvalError> {
        match node {
            Node::Number(n) => Ok(*n),
            Node::VariableOrFunction { name, argument } => {
                match (self.environment.functions.contains(name), argument) {
                    (true, Some(argument)) => {
                        let value = self.evaluate(argument)?;
                        let Some(function) = self.environment.functions.get(name) else {
                            return Err(EvalError::NotAFunction { name: name.clone() });
                        };
                        let result = function(value);
                        log::trace!("{name}({value}) = {result}");
                        Ok(result)
                    }
                    (true, None) => Err(EvalError::MissingArgument { name: name.clone() }),
                    (false, Some(_)) => Err(EvalError::NotAFunction { name: name.clone() }),
                    (false, None) => self.variable(name),
                }
            }
            Node::Operator { op, lhs, rhs } => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                Ok(op.apply(lhs, rhs))
            }
        }
    }

    fn variable(&mut self, name: &str) -> Result<f64, EvalError> {
        if let Some(value) = self.environment.get(name) {
            return Ok(value);
        }

        log::debug!("variable `{name}` is unbound, asking the resolver");
        match self.resolver.resolve(name)? {
            Some(value) => {
                self.environment.define(name, value);
                Ok(value)
            }
            None => Err(EvalError::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }
}

/// Evaluates `node` without a resolver.
pub fn evaluate(node: &Node, environment: &mut Environment) -> Result<f64, EvalError> {
    Evaluator::new(environment, NoResolve).evaluate(node)
}
