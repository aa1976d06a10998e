use std::borrow::Cow;
use std::path::PathBuf;

use clap::Parser;
use log::{LevelFilter, debug};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};
use tinylisp::evaluator::special_form_identifiers;
use tinylisp::{EnvRef, Error, Interpreter, TokenKind, parse_program, tokenize};

/// Interactive tinylisp interpreter.
#[derive(Parser, Debug)]
#[command(name = "tinylisp", version, about)]
struct Args {
    /// Use emacs key bindings instead of vi
    #[arg(long)]
    emacs: bool,

    /// File the line history is loaded from and saved to
    #[arg(long, default_value = "tinylisp_history.txt")]
    history: PathBuf,

    /// Don't load or save line history
    #[arg(long)]
    no_history: bool,

    /// Evaluate one line, print the result and exit
    #[arg(short, long, value_name = "EXPR")]
    eval: Option<String>,
}

struct LispCompleter {
    env: EnvRef,
}

impl rustyline::completion::Completer for LispCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let prefix = match tokenize(&line[..pos]).map(|tokens| tokens.last().cloned()) {
            Ok(Some(token)) if token.span.end == pos => match token.kind {
                TokenKind::Atom(prefix) => prefix,
                _ => return Ok((pos, vec![])),
            },
            _ => return Ok((pos, vec![])),
        };
        let mut candidates: Vec<String> = self
            .env
            .borrow()
            .get_identifiers()
            .union(&special_form_identifiers())
            .filter_map(|id| id.strip_prefix(prefix.as_str()).map(str::to_string))
            .collect();
        candidates.sort();
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: LispValidator,
    #[rustyline(Highlighter)]
    highlighter: LispHighlighter,
    #[rustyline(Completer)]
    completer: LispCompleter,
}

struct LispValidator;

impl Validator for LispValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        if has_open_paren(ctx.input()) {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// True while some '(' is still waiting for its ')'. Quotes carry no
/// meaning here: atoms end at whitespace whether or not a '"' closed them.
fn has_open_paren(input: &str) -> bool {
    let mut depth: usize = 0;
    for c in input.chars() {
        match c {
            '(' => depth += 1,
            // A stray ')' is reported by the parser
            ')' if depth == 0 => return false,
            ')' => depth -= 1,
            _ => {}
        }
    }
    depth > 0
}

struct LispHighlighter;

impl Highlighter for LispHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        // (offset in `highlighted`, offset in `line`) of each open paren
        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut highlighted = String::new();
        let cursor = pos.checked_sub(1);

        for (i, c) in line.char_indices() {
            match c {
                '"' => highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c)), // Green for quotes
                '(' => {
                    stack.push((highlighted.len(), i));
                    highlighted.push(c);
                }
                ')' => {
                    if let Some((matching_pos, open_idx)) = stack.pop() {
                        if cursor == Some(i) || cursor == Some(open_idx) {
                            highlighted.push_str(&format!("\x1b[34m{}\x1b[0m", c)); // Blue for matching brackets
                            highlighted.replace_range(
                                matching_pos..=matching_pos,
                                "\x1b[1;34m(\x1b[0m",
                            );
                        } else {
                            highlighted.push(c);
                        }
                    } else {
                        highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)); // Red for unmatched closing brackets
                    }
                }
                _ => highlighted.push(c),
            }
        }

        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

/// Evaluates every expression on the line, printing results or diagnostics.
/// Returns false if anything failed.
fn evaluate_line(lisp: &Interpreter, line: &str) -> bool {
    let result = parse_program(line)
        .map_err(Error::from)
        .and_then(|nodes| {
            nodes.iter().try_for_each(|node| -> Result<(), Error> {
                let value = lisp.evaluate(node, None)?;
                println!("{}", value);
                Ok(())
            })
        });
    match result {
        Ok(()) => true,
        Err(err) => {
            debug!("{:?}", err);
            if err.pretty_print(line).is_err() {
                eprintln!("Error: {}", err);
            }
            false
        }
    }
}

fn main() -> rustyline::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_module("rustyline", LevelFilter::Warn)
        .init();
    let args = Args::parse();
    let lisp = Interpreter::new();

    if let Some(line) = args.eval {
        if !evaluate_line(&lisp, &line) {
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("tinylisp REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let h = InputValidator {
        highlighter: LispHighlighter,
        validator: LispValidator,
        completer: LispCompleter {
            env: lisp.global_env(),
        },
    };
    let edit_mode = if args.emacs {
        rustyline::EditMode::Emacs
    } else {
        rustyline::EditMode::Vi
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(edit_mode)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if !args.no_history && rl.load_history(&args.history).is_err() {
        println!("No previous history.");
    }

    loop {
        match rl.readline("lisp> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }
                evaluate_line(&lisp, trimmed_input);
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    if args.no_history {
        Ok(())
    } else {
        rl.save_history(&args.history)
    }
}
