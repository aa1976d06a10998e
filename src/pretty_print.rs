use crate::lexer::LexerErrorKind;
use crate::{EnvError, Error, EvalError, ParseError};
use ariadne::{Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

type ReplReport = Report<'static, (&'static str, Range<usize>)>;

fn print_report(report: ReplReport, input: &str) -> io::Result<()> {
    report.eprint(("REPL", Source::from(input)))
}

impl EvalError {
    fn report(&self) -> ReplReport {
        let report = match self {
            EvalError::EnvError(EnvError::NameError { name, span }) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message(format!("NameError: `{}` is not bound", name))
                    .with_label(
                        Label::new(("REPL", span.to_range()))
                            .with_message("No enclosing let*, lambda or define binds this name"),
                    )
            }
            EvalError::Application(message, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message("ApplicationError")
                    .with_label(Label::new(("REPL", span.to_range())).with_message(message))
            }
            EvalError::NotASymbol(value, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message(format!("ApplicationError: cannot bind to {}", value))
                    .with_label(Label::new(("REPL", span.to_range())).with_message(format!(
                        "Names in let*, define and lambda must be symbols, not a {}",
                        value.type_name()
                    )))
            }
            EvalError::InvalidSpecialForm(message, span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message("ApplicationError: malformed special form")
                    .with_label(Label::new(("REPL", span.to_range())).with_message(message))
            }
        };
        report.finish()
    }

    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        print_report(self.report(), input)
    }
}

impl ParseError {
    fn report(&self, input: &str) -> ReplReport {
        let report = match self {
            ParseError::UnexpectedEndOfInput(span) => {
                let idx = input.len();
                Report::build(ReportKind::Error, ("REPL", idx..idx))
                    .with_message("UnexpectedEndOfInput")
                    .with_label(
                        Label::new(("REPL", span.to_range()))
                            .with_message("This '(' is never closed"),
                    )
            }
            ParseError::MismatchedParenthesis(span) => {
                Report::build(ReportKind::Error, ("REPL", span.to_range()))
                    .with_message("MismatchedParenthesis")
                    .with_label(
                        Label::new(("REPL", span.to_range()))
                            .with_message("This ')' has no matching '('"),
                    )
            }
            ParseError::LexerError(lex_err) => {
                let message = match lex_err.error {
                    LexerErrorKind::EmptyInput => "Nothing to evaluate",
                    LexerErrorKind::InvalidToken => "Invalid token",
                };
                Report::build(ReportKind::Error, ("REPL", lex_err.span.to_range()))
                    .with_message("SyntaxError")
                    .with_label(Label::new(("REPL", lex_err.span.to_range())).with_message(message))
            }
        };
        report.finish()
    }

    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        print_report(self.report(input), input)
    }
}

impl Error {
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        match self {
            Error::Parse(err) => err.pretty_print(input),
            Error::Eval(err) => err.pretty_print(input),
        }
    }
}
