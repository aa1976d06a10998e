use crate::environment::EnvError;
use crate::evaluator::EvalError;
use crate::lexer::LexerError;
use crate::parser::ParseError;
use crate::source::Span;
use thiserror::Error;

/// Any failure from reading or evaluating one line of input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<LexerError> for Error {
    fn from(err: LexerError) -> Self {
        Error::Parse(ParseError::LexerError(err))
    }
}

impl From<EnvError> for Error {
    fn from(err: EnvError) -> Self {
        Error::Eval(EvalError::EnvError(err))
    }
}

/// The user-facing category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SyntaxError,
    UnexpectedEndOfInput,
    MismatchedParenthesis,
    NameError,
    ApplicationError,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(ParseError::LexerError(_)) => ErrorKind::SyntaxError,
            Error::Parse(ParseError::UnexpectedEndOfInput(_)) => ErrorKind::UnexpectedEndOfInput,
            Error::Parse(ParseError::MismatchedParenthesis(_)) => ErrorKind::MismatchedParenthesis,
            Error::Eval(EvalError::EnvError(EnvError::NameError { .. })) => ErrorKind::NameError,
            Error::Eval(
                EvalError::Application(..)
                | EvalError::NotASymbol(..)
                | EvalError::InvalidSpecialForm(..),
            ) => ErrorKind::ApplicationError,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Error::Parse(err) => err.span(),
            Error::Eval(err) => err.span(),
        }
    }
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedEndOfInput(span) | ParseError::MismatchedParenthesis(span) => {
                *span
            }
            ParseError::LexerError(lex_err) => lex_err.span,
        }
    }
}
