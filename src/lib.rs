use miette::Diagnostic;
use thiserror::Error;

pub mod eval;
pub mod lex;
pub mod parse;
pub mod system;
pub mod tree;

pub use eval::{Environment, EvalError, Evaluator, Functions, NoResolve, Resolver, evaluate};
pub use lex::{LexError, Lexer, Token, TokenKind};
pub use parse::{ParseError, Parser};
pub use system::Prompt;
pub use tree::{Node, NodeKind, Op};

/// The first failure of any stage, kept distinguishable by stage.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),
}

pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(None, text).tokenize()
}

/// Tokenizes and parses `text`. Names in `functions` must be called with
/// parentheses, every other name is a variable.
pub fn build_expression_tree(text: &str, functions: &Functions) -> Result<Node, Error> {
    build_named_expression_tree(None, text, functions)
}

/// Like [`build_expression_tree`], with `filename` shown in error reports.
pub fn build_named_expression_tree(
    filename: Option<&str>,
    text: &str,
    functions: &Functions,
) -> Result<Node, Error> {
    let tokens = Lexer::new(filename, text).tokenize()?;
    let tree = Parser::new(&tokens, functions)
        .with_source(filename, text)
        .parse()?;
    Ok(tree)
}

/// Builds and evaluates `text`. Unbound variables are errors.
pub fn build_and_evaluate(text: &str, environment: &mut Environment) -> Result<f64, Error> {
    build_and_evaluate_with(text, environment, NoResolve)
}

/// Builds and evaluates `text`, asking `resolver` for unbound variables.
/// Resolved values are defined in `environment`.
pub fn build_and_evaluate_with(
    text: &str,
    environment: &mut Environment,
    resolver: impl Resolver,
) -> Result<f64, Error> {
    build_and_evaluate_named(None, text, environment, resolver)
}

/// Like [`build_and_evaluate_with`], with `filename` shown in error reports.
pub fn build_and_evaluate_named(
    filename: Option<&str>,
    text: &str,
    environment: &mut Environment,
    resolver: impl Resolver,
) -> Result<f64, Error> {
    let tree = build_named_expression_tree(filename, text, &environment.functions)?;
    let value = Evaluator::new(environment, resolver).evaluate(&tree)?;
    Ok(value)
}
