use std::{borrow::Cow, fmt::Display, num::ParseFloatError};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::tree::Op;

#[derive(Error, Debug, Diagnostic)]
pub enum LexError {
    #[error("unexpected character: {token}")]
    #[diagnostic(
        code(lex::unexpected_character),
        help("remove or correct the character: `{token}`")
    )]
    UnexpectedCharacter {
        #[source_code]
        src: NamedSource<String>,

        #[label("this character")]
        bad_bit: SourceSpan,

        token: char,
    },

    #[error("invalid number literal")]
    #[diagnostic(
        code(lex::invalid_number),
        url("https://doc.rust-lang.org/std/num/struct.ParseFloatError.html")
    )]
    InvalidNumber {
        #[source_code]
        src: NamedSource<String>,

        #[label("this numeric literal")]
        bad_bit: SourceSpan,

        #[source]
        source: ParseFloatError,
    },
}

impl LexError {
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { bad_bit, .. } | LexError::InvalidNumber { bad_bit, .. } => {
                bad_bit.offset()
            }
        }
    }

    pub fn line(&self) -> usize {
        let src = match self {
            LexError::UnexpectedCharacter { src, .. } | LexError::InvalidNumber { src, .. } => src,
        };
        line_of(src, self.offset())
    }
}

/// 1-based line of `offset` in `src`.
pub(crate) fn line_of(src: &NamedSource<String>, offset: usize) -> usize {
    let text = src.inner();
    text.get(..offset).unwrap_or(text).matches('\n').count() + 1
}

pub(crate) fn named_source(filename: Option<&str>, whole: &str) -> NamedSource<String> {
    NamedSource::new(filename.unwrap_or("<input>"), whole.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Operator(Op),
    Ident,
    LeftParen,
    RightParen,
    Comma,
    Eof,
}

impl<'de> Token<'de> {
    /// The token's text. Numbers are rendered canonically (`2` becomes `2.0`),
    /// everything else is the lexeme as written.
    pub fn text(&self) -> Cow<'de, str> {
        match self.kind {
            TokenKind::Number(n) => Cow::Owned(format!("{n:?}")),
            _ => Cow::Borrowed(self.literal),
        }
    }

    pub fn span(&self) -> SourceSpan {
        SourceSpan::from(self.offset..self.offset + self.literal.len())
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::Number(n) => write!(f, "NUMBER {lit} {n:?}"),
            TokenKind::Operator(_) => write!(f, "OPERATOR {lit} null"),
            TokenKind::Ident => write!(f, "IDENTIFIER {lit} null"),
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit} null"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit} null"),
            TokenKind::Comma => write!(f, "COMMA {lit} null"),
            TokenKind::Eof => write!(f, "EOF {lit} null"),
        }
    }
}

/// Splits expression text into tokens. Yields exactly one [`TokenKind::Eof`]
/// token once the input is exhausted.
pub struct Lexer<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    rest: &'de str,
    byte: usize,
    finished: bool,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: Option<&'de str>, input: &'de str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
            finished: false,
        }
    }

    /// Runs the lexer to completion, stopping at the first error.
    pub fn tokenize(self) -> Result<Vec<Token<'de>>, LexError> {
        let tokens = self.collect::<Result<Vec<_>, _>>()?;
        log::debug!("tokenized input into {} tokens", tokens.len());
        Ok(tokens)
    }

    fn source(&self) -> NamedSource<String> {
        named_source(self.filename, self.whole)
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut chars = self.rest.chars();
            let Some(c) = chars.next() else {
                if self.finished {
                    return None;
                }
                self.finished = true;
                return Some(Ok(Token {
                    kind: TokenKind::Eof,
                    literal: "",
                    offset: self.byte,
                }));
            };
            let literal = &self.rest[..c.len_utf8()];
            let offset = self.byte;
            let cur = self.rest;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            enum Start {
                Ident,
                Number,
            }

            let process = |kind: TokenKind| {
                Some(Ok(Token {
                    kind,
                    literal,
                    offset,
                }))
            };

            let started = match c {
                '(' => return process(TokenKind::LeftParen),
                ')' => return process(TokenKind::RightParen),
                ',' => return process(TokenKind::Comma),
                '+' => return process(TokenKind::Operator(Op::Plus)),
                '-' => return process(TokenKind::Operator(Op::Minus)),
                '*' => return process(TokenKind::Operator(Op::Star)),
                '/' => return process(TokenKind::Operator(Op::Slash)),
                '^' => return process(TokenKind::Operator(Op::Caret)),
                '0'..='9' => Start::Number,
                c if c.is_alphabetic() => Start::Ident,
                c if c.is_whitespace() => continue,
                c => {
                    return Some(Err(LexError::UnexpectedCharacter {
                        src: self.source(),
                        bad_bit: SourceSpan::from(offset..self.byte),
                        token: c,
                    }));
                }
            };

            let end = match started {
                Start::Ident => cur.find(|c: char| !c.is_alphabetic()).unwrap_or(cur.len()),
                Start::Number => {
                    let whole_part = cur
                        .find(|c: char| !c.is_ascii_digit())
                        .unwrap_or(cur.len());
                    match cur[whole_part..].strip_prefix('.') {
                        Some(fraction) => {
                            whole_part
                                + 1
                                + fraction
                                    .find(|c: char| !c.is_ascii_digit())
                                    .unwrap_or(fraction.len())
                        }
                        None => whole_part,
                    }
                }
            };

            let literal = &cur[..end];
            let extra_bytes = literal.len() - c.len_utf8();
            self.byte += extra_bytes;
            self.rest = &self.rest[extra_bytes..];

            let kind = match started {
                Start::Ident => TokenKind::Ident,
                Start::Number => match literal.parse() {
                    Ok(n) => TokenKind::Number(n),
                    Err(source) => {
                        return Some(Err(LexError::InvalidNumber {
                            src: self.source(),
                            bad_bit: SourceSpan::from(offset..self.byte),
                            source,
                        }));
                    }
                },
            };

            return Some(Ok(Token {
                kind,
                literal,
                offset,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(None, input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn operators_and_groups() {
        assert_eq!(
            kinds("(1+x)*2^y/3-z,"),
            vec![
                TokenKind::LeftParen,
                TokenKind::Number(1.0),
                TokenKind::Operator(Op::Plus),
                TokenKind::Ident,
                TokenKind::RightParen,
                TokenKind::Operator(Op::Star),
                TokenKind::Number(2.0),
                TokenKind::Operator(Op::Caret),
                TokenKind::Ident,
                TokenKind::Operator(Op::Slash),
                TokenKind::Number(3.0),
                TokenKind::Operator(Op::Minus),
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn whitespace_is_skipped() {
        assert_eq!(
            kinds(" \t2 \n+\r 3 "),
            vec![
                TokenKind::Number(2.0),
                TokenKind::Operator(Op::Plus),
                TokenKind::Number(3.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn empty_input_is_just_eof() {
        let tokens = Lexer::new(None, "").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![Token {
                kind: TokenKind::Eof,
                literal: "",
                offset: 0
            }]
        );
    }

    #[test]
    fn number_text_is_canonical() {
        let tokens = Lexer::new(None, "2 3.25 7.").tokenize().unwrap();
        let texts: Vec<_> = tokens.iter().map(|token| token.text().into_owned()).collect();
        assert_eq!(texts, vec!["2.0", "3.25", "7.0", ""]);
        assert_eq!(tokens[2].literal, "7.");
    }

    #[test]
    fn identifiers_stop_at_digits() {
        let tokens = Lexer::new(None, "sin2x").tokenize().unwrap();
        let literals: Vec<_> = tokens.iter().map(|token| token.literal).collect();
        assert_eq!(literals, vec!["sin", "2", "x", ""]);
        assert_eq!(tokens[1].offset, 3);
    }

    #[test]
    fn second_dot_is_not_part_of_the_number() {
        let err = Lexer::new(None, "1.2.3").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnexpectedCharacter { token: '.', .. }));
        assert_eq!(err.offset(), 3);
    }

    #[test]
    fn unexpected_character() {
        let err = Lexer::new(None, "2 $ 3").tokenize().unwrap_err();
        assert_eq!(err.to_string(), "unexpected character: $");
        assert_eq!(err.offset(), 2);
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn underscore_is_rejected() {
        let err = Lexer::new(None, "my_var").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnexpectedCharacter { token: '_', .. }));
    }

    #[test]
    fn error_line_counts_newlines() {
        let err = Lexer::new(None, "1 +\n2 +\n#").tokenize().unwrap_err();
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn eof_is_yielded_once() {
        let mut lexer = Lexer::new(None, "1");
        assert!(matches!(lexer.next(), Some(Ok(Token { kind: TokenKind::Number(_), .. }))));
        assert!(matches!(lexer.next(), Some(Ok(Token { kind: TokenKind::Eof, .. }))));
        assert!(lexer.next().is_none());
    }

    #[test]
    fn token_display() {
        let tokens = Lexer::new(None, "ln(4)").tokenize().unwrap();
        let lines: Vec<_> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "IDENTIFIER ln null",
                "LEFT_PAREN ( null",
                "NUMBER 4 4.0",
                "RIGHT_PAREN ) null",
                "EOF  null",
            ]
        );
    }
}
