use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::{
    eval::Functions,
    lex::{Token, TokenKind, line_of, named_source},
    tree::{Node, Op},
};

#[derive(Error, Debug, Diagnostic)]
pub enum ParseError {
    #[error("expected '(' after function name: {name}")]
    #[diagnostic(
        code(parse::missing_call_paren),
        help("`{name}` is a function, call it as `{name}(...)`")
    )]
    MissingCallParen {
        #[source_code]
        src: NamedSource<String>,

        #[label("expected `(` here")]
        bad_bit: SourceSpan,

        name: String,
    },

    #[error("expected ')' after function argument")]
    #[diagnostic(code(parse::unclosed_call))]
    UnclosedCall {
        #[source_code]
        src: NamedSource<String>,

        #[label("expected `)` here")]
        bad_bit: SourceSpan,

        #[label("call starts here")]
        open: SourceSpan,
    },

    #[error("expected ')'")]
    #[diagnostic(code(parse::unclosed_group))]
    UnclosedGroup {
        #[source_code]
        src: NamedSource<String>,

        #[label("expected `)` here")]
        bad_bit: SourceSpan,

        #[label("group opened here")]
        open: SourceSpan,
    },

    #[error("unexpected token: {found}")]
    #[diagnostic(
        code(parse::unexpected_token),
        help("expected a number, a name or `(`")
    )]
    UnexpectedToken {
        #[source_code]
        src: NamedSource<String>,

        #[label("here")]
        bad_bit: SourceSpan,

        found: String,
    },

    #[error("unexpected end of input")]
    #[diagnostic(
        code(parse::unexpected_eof),
        help("the expression ended early, possibly missing an operand or a closing parenthesis")
    )]
    UnexpectedEof {
        #[source_code]
        src: NamedSource<String>,

        #[label("input ends here")]
        bad_bit: SourceSpan,
    },

    #[error("unexpected trailing input: {found}")]
    #[diagnostic(
        code(parse::trailing_input),
        help("everything after a complete expression must be removed")
    )]
    TrailingInput {
        #[source_code]
        src: NamedSource<String>,

        #[label("expression already ended")]
        bad_bit: SourceSpan,

        found: String,
    },
}

impl ParseError {
    pub fn offset(&self) -> usize {
        match self {
            ParseError::MissingCallParen { bad_bit, .. }
            | ParseError::UnclosedCall { bad_bit, .. }
            | ParseError::UnclosedGroup { bad_bit, .. }
            | ParseError::UnexpectedToken { bad_bit, .. }
            | ParseError::UnexpectedEof { bad_bit, .. }
            | ParseError::TrailingInput { bad_bit, .. } => bad_bit.offset(),
        }
    }

    pub fn line(&self) -> usize {
        let src = match self {
            ParseError::MissingCallParen { src, .. }
            | ParseError::UnclosedCall { src, .. }
            | ParseError::UnclosedGroup { src, .. }
            | ParseError::UnexpectedToken { src, .. }
            | ParseError::UnexpectedEof { src, .. }
            | ParseError::TrailingInput { src, .. } => src,
        };
        line_of(src, self.offset())
    }
}

/// Recursive-descent parser over an already tokenized expression.
///
/// ```text
/// expression := term ( ('+' | '-') term )*
/// term       := power ( ('*' | '/') power )*
/// power      := factor ( '^' factor )*
/// factor     := NUMBER | IDENTIFIER | IDENTIFIER '(' expression ')' | '(' expression ')'
/// ```
///
/// Every binary level folds to the left, `^` included, so `2^3^2` is `(2^3)^2`.
/// An identifier is a call only when it names a registered function.
pub struct Parser<'a, 'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    tokens: &'a [Token<'de>],
    current: usize,
    functions: &'a Functions,
}

impl<'a, 'de> Parser<'a, 'de> {
    pub fn new(tokens: &'a [Token<'de>], functions: &'a Functions) -> Self {
        Parser {
            filename: None,
            whole: "",
            tokens,
            current: 0,
            functions,
        }
    }

    /// Attaches the text the tokens came from, for error reports.
    pub fn with_source(mut self, filename: Option<&'de str>, whole: &'de str) -> Self {
        self.filename = filename;
        self.whole = whole;
        self
    }

    /// Parses a whole expression. Anything but end of input after it is an error.
    pub fn parse(mut self) -> Result<Node, ParseError> {
        let root = self.parse_expression()?;
        let token = self.peek()?;
        if token.kind != TokenKind::Eof {
            return Err(ParseError::TrailingInput {
                src: self.source(),
                bad_bit: token.span(),
                found: token.text().into_owned(),
            });
        }
        log::debug!("parsed expression of depth {}", root.depth());
        Ok(root)
    }

    pub fn parse_expression(&mut self) -> Result<Node, ParseError> {
        self.fold(&[Op::Plus, Op::Minus], Self::parse_term)
    }

    fn parse_term(&mut self) -> Result<Node, ParseError> {
        self.fold(&[Op::Star, Op::Slash], Self::parse_power)
    }

    fn parse_power(&mut self) -> Result<Node, ParseError> {
        self.fold(&[Op::Caret], Self::parse_factor)
    }

    fn fold(
        &mut self,
        ops: &[Op],
        mut operand: impl FnMut(&mut Self) -> Result<Node, ParseError>,
    ) -> Result<Node, ParseError> {
        let mut lhs = operand(self)?;
        loop {
            let op = match self.peek()?.kind {
                TokenKind::Operator(op) if ops.contains(&op) => op,
                _ => break,
            };
            self.current += 1;
            log::trace!("folding `{op}` at token {}", self.current - 1);
            let rhs = operand(self)?;
            lhs = Node::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Node, ParseError> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Number(n) => Ok(Node::Number(n)),
            TokenKind::Ident if self.functions.contains(token.literal) => {
                let open = self.expect(TokenKind::LeftParen, |parser, found| {
                    ParseError::MissingCallParen {
                        src: parser.source(),
                        bad_bit: found.span(),
                        name: token.literal.to_string(),
                    }
                })?;
                let argument = self.parse_expression()?;
                self.expect(TokenKind::RightParen, |parser, found| ParseError::UnclosedCall {
                    src: parser.source(),
                    bad_bit: found.span(),
                    open: open.span(),
                })?;
                Ok(Node::call(token.literal, argument))
            }
            TokenKind::Ident => Ok(Node::variable(token.literal)),
            TokenKind::LeftParen => {
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen, |parser, found| ParseError::UnclosedGroup {
                    src: parser.source(),
                    bad_bit: found.span(),
                    open: token.span(),
                })?;
                Ok(inner)
            }
            TokenKind::Eof => Err(self.eof(token.offset)),
            TokenKind::Operator(_) | TokenKind::RightParen | TokenKind::Comma => {
                Err(ParseError::UnexpectedToken {
                    src: self.source(),
                    bad_bit: token.span(),
                    found: token.text().into_owned(),
                })
            }
        }
    }

    fn peek(&self) -> Result<&'a Token<'de>, ParseError> {
        self.tokens
            .get(self.current)
            .ok_or_else(|| self.eof(self.whole.len()))
    }

    /// Consumes the current token if it is of kind `expected`. Otherwise, end
    /// of input included, reports `error` built from the token found instead.
    fn expect(
        &mut self,
        expected: TokenKind,
        error: impl FnOnce(&Self, &Token<'de>) -> ParseError,
    ) -> Result<&'a Token<'de>, ParseError> {
        let token = self.peek()?;
        if token.kind != expected {
            return Err(error(&*self, token));
        }
        self.current += 1;
        Ok(token)
    }

    /// Consumes the current token. The end of input token is never stepped over.
    fn advance(&mut self) -> Result<&'a Token<'de>, ParseError> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::Eof => Err(self.eof(token.offset)),
            _ => {
                self.current += 1;
                Ok(token)
            }
        }
    }

    fn eof(&self, offset: usize) -> ParseError {
        ParseError::UnexpectedEof {
            src: self.source(),
            bad_bit: SourceSpan::from(offset..offset),
        }
    }

    fn source(&self) -> NamedSource<String> {
        named_source(self.filename, self.whole)
    }
}
