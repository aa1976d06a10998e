use crate::Span;
use crate::lexer::{LexerError, Token, TokenKind};
use crate::types::{Node, Value};
use logos::Logos;
use std::iter::Peekable;
use std::vec::IntoIter; // To iterate over Vec<Token>
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected end of input: expected ')' to close '(' at {0}")]
    UnexpectedEndOfInput(Span), // Span of the unclosed '('
    #[error("Syntax error: mismatched parenthesis at {0}")]
    MismatchedParenthesis(Span), // Span of the stray ')'
    #[error(transparent)]
    LexerError(#[from] LexerError),
}

// Result type alias for convenience
type ParseResult<T> = Result<T, ParseError>;

/// Classifies a single atom. Anything that isn't a number, a string, `t` or
/// `nil` falls through to a symbol.
#[derive(Logos, Debug, Clone, PartialEq)]
enum AtomKind {
    #[regex(r"[-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    // Non-finite numbers, spelled the way they print
    #[token("inf", |_| f64::INFINITY)]
    #[token("+inf", |_| f64::INFINITY)]
    #[token("-inf", |_| f64::NEG_INFINITY)]
    #[token("nan", |_| f64::NAN)]
    Number(f64),
    #[regex(r#""[^"'\r\n]*""#, |lex| { let slice = lex.slice(); slice[1..slice.len() - 1].to_string() })]
    Text(String),
    #[token("t", |_| true)]
    #[token("nil", |_| false)]
    Boolean(bool),
}

fn classify_atom(text: &str) -> Value {
    let mut lexer = AtomKind::lexer(text);
    // The whole atom has to match a single literal, so "1-2" stays a symbol.
    match (lexer.next(), lexer.span().end == text.len()) {
        (Some(Ok(AtomKind::Number(n))), true) => Value::Number(n),
        (Some(Ok(AtomKind::Text(s))), true) => Value::Text(s),
        (Some(Ok(AtomKind::Boolean(b))), true) => Value::Boolean(b),
        _ => Value::Symbol(text.to_string()),
    }
}

pub struct Parser {
    // We iterate over owned Tokens, consuming them.
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
        }
    }

    pub fn is_exhausted(&mut self) -> bool {
        self.tokens.peek().is_none()
    }

    /// Parses a single expression from the front of the token stream.
    /// Tokens after it are left for the caller.
    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        match self.tokens.next() {
            Some(Token {
                kind: TokenKind::LParen,
                span,
            }) => self.parse_list(span),
            Some(Token {
                kind: TokenKind::RParen,
                span,
            }) => Err(ParseError::MismatchedParenthesis(span)),
            Some(Token {
                kind: TokenKind::Atom(text),
                span,
            }) => Ok(Node::new(classify_atom(&text), span)),
            None => Err(ParseError::UnexpectedEndOfInput(Span::default())),
        }
    }

    /// Parses the elements of a list whose `(` has already been consumed.
    fn parse_list(&mut self, lparen_span: Span) -> ParseResult<Node> {
        let mut elements = Vec::new();
        loop {
            match self.tokens.peek() {
                Some(Token {
                    kind: TokenKind::RParen,
                    span,
                }) => {
                    let span = lparen_span.merge(*span);
                    self.tokens.next();
                    return Ok(Node::new_list(elements, span));
                }
                Some(_) => elements.push(self.parse_expr()?),
                None => return Err(ParseError::UnexpectedEndOfInput(lparen_span)),
            }
        }
    }
}

/// Lexes and parses every expression in `input`, in order.
pub fn parse_program(input: &str) -> ParseResult<Vec<Node>> {
    let tokens = crate::lexer::tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let mut expressions = Vec::new();
    while !parser.is_exhausted() {
        expressions.push(parser.parse_expr()?);
    }
    Ok(expressions)
}

/// Lexes and parses one line, returning its first expression. The rest of
/// the line must still be well formed.
pub fn parse_str(input: &str) -> ParseResult<Node> {
    let mut expressions = parse_program(input)?;
    if expressions.len() > 1 {
        log::debug!(
            "ignoring {} trailing expression(s) in {:?}",
            expressions.len() - 1,
            input
        );
    }
    // tokenize rejects blank input, so there is always a first expression
    Ok(expressions.swap_remove(0))
}
