use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

/// Parentheses are always tokens of their own; everything else is a
/// whitespace-delimited atom whose meaning is decided by the parser.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"\s+")] // Skip whitespace
#[logos(error = LexerErrorKind)]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r"[^\s()]+", |lex| lex.slice().to_string())]
    Atom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Atom(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Error, Default, Debug, Clone, PartialEq)]
pub enum LexerErrorKind {
    #[error("Invalid command: input is empty")]
    EmptyInput,
    #[default]
    #[error("Invalid token")]
    InvalidToken,
}

/// A `SyntaxError`: the input could not be split into tokens.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

// Result type alias for convenience
type LexerRangedResult<T> = Result<T, LexerError>;

// Helper function to tokenize a string directly (useful for tests and parser)
pub fn tokenize(input: &str) -> LexerRangedResult<Vec<Token>> {
    if input.trim().is_empty() {
        return Err(LexerError {
            error: LexerErrorKind::EmptyInput,
            span: Span::new(0, input.len()),
        });
    }

    TokenKind::lexer(input)
        .spanned() // This yields Result<(TokenKind, Range<usize>), LexerErrorKind>
        .map(|(result, range)| {
            let span = Span::new(range.start, range.end);
            match result {
                Ok(kind) => Ok(Token { kind, span }),
                Err(error) => Err(LexerError { error, span }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to simplify testing token sequences
    fn assert_tokens(input: &str, expected: Vec<TokenKind>) {
        match tokenize(input) {
            Ok(tokens) => {
                let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
                assert_eq!(kinds, expected, "Input: '{}'", input);
            }
            Err(e) => panic!("Lexing failed for input '{}': {}", input, e.error),
        }
    }

    fn atom(s: &str) -> TokenKind {
        TokenKind::Atom(s.to_string())
    }

    #[test]
    fn test_empty_input() {
        for input in ["", "   ", "\n\t  "] {
            let err = tokenize(input).unwrap_err();
            assert_eq!(err.error, LexerErrorKind::EmptyInput, "Input: '{}'", input);
        }
    }

    #[test]
    fn test_parentheses() {
        assert_tokens("()", vec![TokenKind::LParen, TokenKind::RParen]);
        assert_tokens("( )", vec![TokenKind::LParen, TokenKind::RParen]);
        assert_tokens(
            "(()",
            vec![TokenKind::LParen, TokenKind::LParen, TokenKind::RParen],
        );
    }

    #[test]
    fn test_parentheses_isolated_without_whitespace() {
        assert_tokens(
            "(+ (/ 10 2)(* 3 4))",
            vec![
                TokenKind::LParen,
                atom("+"),
                TokenKind::LParen,
                atom("/"),
                atom("10"),
                atom("2"),
                TokenKind::RParen,
                TokenKind::LParen,
                atom("*"),
                atom("3"),
                atom("4"),
                TokenKind::RParen,
                TokenKind::RParen,
            ],
        );
        assert_tokens("a)b", vec![atom("a"), TokenKind::RParen, atom("b")]);
    }

    #[test]
    fn test_atoms_are_unclassified() {
        assert_tokens(
            "foo 123 -4.5 t nil \"hello\"",
            vec![
                atom("foo"),
                atom("123"),
                atom("-4.5"),
                atom("t"),
                atom("nil"),
                atom("\"hello\""),
            ],
        );
        assert_tokens("let*", vec![atom("let*")]);
    }

    #[test]
    fn test_strings_split_on_whitespace() {
        // No string-level grouping at this stage
        assert_tokens(
            "\"with space\"",
            vec![atom("\"with"), atom("space\"")],
        );
    }

    #[test]
    fn test_sequences_and_whitespace() {
        assert_tokens(
            "  ( define x\t10 )\n",
            vec![
                TokenKind::LParen,
                atom("define"),
                atom("x"),
                atom("10"),
                TokenKind::RParen,
            ],
        );
    }

    #[test]
    fn test_tokenize_spans() {
        let input = "(+ 1)";
        let tokens = tokenize(input).expect("Should tokenize successfully");

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].span, Span { start: 0, end: 1 });
        assert_eq!(tokens[1].span, Span { start: 1, end: 2 });
        assert_eq!(tokens[2].span, Span { start: 3, end: 4 });
        assert_eq!(tokens[3].span, Span { start: 4, end: 5 });
    }

    #[test]
    fn test_display_round_trip() {
        let tokens = tokenize("(car (\"a\" \"b\"))").unwrap();
        let text: Vec<String> = tokens.iter().map(|t| t.kind.to_string()).collect();
        assert_eq!(text, vec!["(", "car", "(", "\"a\"", "\"b\"", ")", ")"]);
    }
}
