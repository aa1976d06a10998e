use crate::environment::{EnvError, EnvRef, Environment};
use crate::source::Span;
use crate::types::{Lambda, Node, Procedure, Value};
use log::{debug, trace};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    EnvError(#[from] EnvError), // Errors from environment lookup
    #[error("Evaluation Error: {0}")]
    Application(String, Span), // Bad arity or argument types when applying a procedure
    #[error("Evaluation Error: Expected a symbol, but got: {0}")]
    NotASymbol(Value, Span), // Expected a symbol (e.g., for define/let*)
    #[error("Evaluation Error: Invalid special form - {0}")]
    InvalidSpecialForm(String, Span), // Malformed special form (e.g., (if cond))
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::EnvError(EnvError::NameError { span, .. }) => *span,
            EvalError::Application(_, span)
            | EvalError::NotASymbol(_, span)
            | EvalError::InvalidSpecialForm(_, span) => *span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Node> = Result<T, EvalError>;

// --- Special Forms ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    LetStar,
    Define,
    If,
    Lambda,
    Quote,
}

impl Keyword {
    pub const ALL: [Keyword; 5] = [
        Keyword::LetStar,
        Keyword::Define,
        Keyword::If,
        Keyword::Lambda,
        Keyword::Quote,
    ];

    pub fn from_name(name: &str) -> Option<Keyword> {
        match name {
            "let*" => Some(Keyword::LetStar),
            "define" => Some(Keyword::Define),
            "if" => Some(Keyword::If),
            "lambda" => Some(Keyword::Lambda),
            "quote" => Some(Keyword::Quote),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Keyword::LetStar => "let*",
            Keyword::Define => "define",
            Keyword::If => "if",
            Keyword::Lambda => "lambda",
            Keyword::Quote => "quote",
        }
    }
}

/// Names that are dispatched as special forms rather than looked up.
pub fn special_form_identifiers() -> HashSet<String> {
    Keyword::ALL.iter().map(|k| k.name().to_string()).collect()
}

/// A special form with its operands checked and pulled out of the raw list.
#[derive(Debug)]
enum SpecialForm<'a> {
    LetStar {
        bindings: Vec<(&'a str, &'a Node)>,
        body: &'a Node,
    },
    Define {
        name: &'a str,
        expr: &'a Node,
    },
    If {
        condition: &'a Node,
        consequent: &'a Node,
        alternate: Option<&'a Node>,
    },
    Lambda {
        params: Vec<String>,
        body: &'a [Node],
    },
    Quote {
        datum: &'a Node,
    },
}

fn expect_symbol(node: &Node) -> EvalResult<&str> {
    match &node.kind {
        Value::Symbol(name) => Ok(name),
        other => Err(EvalError::NotASymbol(other.clone(), node.span)),
    }
}

impl<'a> SpecialForm<'a> {
    fn build(keyword: Keyword, operands: &'a [Node], span: Span) -> EvalResult<SpecialForm<'a>> {
        let invalid = |msg: &str| Err(EvalError::InvalidSpecialForm(msg.to_string(), span));
        match keyword {
            Keyword::LetStar => {
                let [binding_list, body] = operands else {
                    return invalid("let* expects a binding list and a body");
                };
                let Value::List(pairs) = &binding_list.kind else {
                    return invalid("let* bindings must be a list of name/expression pairs");
                };
                if pairs.len() % 2 != 0 {
                    return invalid("let* bindings must come in name/expression pairs");
                }
                let bindings = pairs
                    .chunks_exact(2)
                    .map(|pair| -> EvalResult<(&'a str, &'a Node)> {
                        Ok((expect_symbol(&pair[0])?, &pair[1]))
                    })
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(SpecialForm::LetStar { bindings, body })
            }
            Keyword::Define => {
                let [name, expr] = operands else {
                    return invalid("define expects a name and an expression");
                };
                Ok(SpecialForm::Define {
                    name: expect_symbol(name)?,
                    expr,
                })
            }
            Keyword::If => match operands {
                [condition, consequent] => Ok(SpecialForm::If {
                    condition,
                    consequent,
                    alternate: None,
                }),
                [condition, consequent, alternate] => Ok(SpecialForm::If {
                    condition,
                    consequent,
                    alternate: Some(alternate),
                }),
                _ => invalid("if expects condition, consequent, and optional alternate"),
            },
            Keyword::Lambda => {
                let [param_list, body @ ..] = operands else {
                    return invalid("lambda expects a parameter list and a body");
                };
                if body.is_empty() {
                    return invalid("lambda expects at least one body expression");
                }
                let Value::List(params) = &param_list.kind else {
                    return invalid("lambda parameters must be a list of symbols");
                };
                let params = params
                    .iter()
                    .map(|p| expect_symbol(p).map(str::to_string))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(SpecialForm::Lambda { params, body })
            }
            Keyword::Quote => match operands {
                [datum] => Ok(SpecialForm::Quote { datum }),
                _ => invalid("quote expects exactly one argument"),
            },
        }
    }

    fn evaluate(self, env: EnvRef, span: Span) -> EvalResult {
        match self {
            SpecialForm::LetStar { bindings, body } => {
                let let_env = Environment::new_enclosed(env);
                let result = evaluate_let_star(&bindings, body, &let_env);
                release_frame(&let_env, &result);
                result
            }
            SpecialForm::Define { name, expr } => {
                let value = evaluate(expr, env.clone())?;
                Ok(env.borrow_mut().set(name, value))
            }
            SpecialForm::If {
                condition,
                consequent,
                alternate,
            } => {
                if evaluate(condition, env.clone())?.kind.is_truthy() {
                    evaluate(consequent, env)
                } else if let Some(alternate) = alternate {
                    evaluate(alternate, env)
                } else {
                    Ok(Node::new_bool(false, span))
                }
            }
            SpecialForm::Lambda { params, body } => {
                let lambda = Lambda {
                    params,
                    body: body.to_vec(),
                    env,
                };
                Ok(Node::new(
                    Value::Callable(Procedure::Lambda(Rc::new(lambda))),
                    span,
                ))
            }
            SpecialForm::Quote { datum } => Ok(datum.clone()),
        }
    }
}

// --- Evaluate Function ---

/// Evaluates a given AST Node within the specified environment.
pub fn evaluate(node: &Node, env: EnvRef) -> EvalResult {
    trace!("eval {}", node);
    match &node.kind {
        // Self-evaluating atoms
        Value::Number(_) | Value::Text(_) | Value::Boolean(_) | Value::Callable(_) => {
            Ok(node.clone())
        }

        // Symbols: look up in the environment, reporting at the reference
        Value::Symbol(name) => {
            let value = Environment::get(&env, name, node.span)?;
            Ok(Node::new(value.kind, node.span))
        }

        Value::List(elements) => match &elements[..] {
            [] => Ok(Node::new_list(vec![], node.span)),
            [first, rest @ ..] => {
                let keyword = match &first.kind {
                    Value::Symbol(name) => Keyword::from_name(name),
                    _ => None,
                };
                match keyword {
                    Some(keyword) => {
                        debug!("special form {} at {}", keyword.name(), node.span);
                        SpecialForm::build(keyword, rest, node.span)?.evaluate(env, node.span)
                    }
                    None => evaluate_application(elements, env, node.span),
                }
            }
        },
    }
}

/// Evaluates every element left to right. A callable head is applied to the
/// rest; otherwise the evaluated elements are returned as a list.
fn evaluate_application(elements: &[Node], env: EnvRef, span: Span) -> EvalResult {
    let mut evaluated: Vec<Node> = Vec::with_capacity(elements.len());
    for element in elements {
        evaluated.push(evaluate(element, env.clone())?);
    }

    let procedure = match evaluated.first().map(|head| &head.kind) {
        Some(Value::Callable(procedure)) => procedure.clone(),
        _ => return Ok(Node::new_list(evaluated, span)),
    };
    let args = evaluated.split_off(1);
    apply(&procedure, args, span)
}

/// Applies a procedure to already evaluated arguments.
pub fn apply(procedure: &Procedure, args: Vec<Node>, span: Span) -> EvalResult {
    match procedure {
        // Call the Rust function with evaluated args and original call span
        Procedure::Primitive(func, _) => func(args, span),
        Procedure::Lambda(lambda) => {
            if args.len() != lambda.params.len() {
                return Err(EvalError::Application(
                    format!(
                        "lambda expects exactly {} arguments, got {}",
                        lambda.params.len(),
                        args.len()
                    ),
                    span,
                ));
            }
            debug!("calling lambda ({})", lambda.params.join(" "));
            let call_env = Environment::new_enclosed(lambda.env.clone());
            {
                let mut frame = call_env.borrow_mut();
                for (param, arg) in lambda.params.iter().zip(args) {
                    frame.set(param, arg);
                }
            }
            let result = evaluate_body(&lambda.body, &call_env, span);
            release_frame(&call_env, &result);
            result
        }
    }
}

fn evaluate_let_star(bindings: &[(&str, &Node)], body: &Node, let_env: &EnvRef) -> EvalResult {
    for (name, expr) in bindings {
        // Each binding sees the ones before it
        let value = evaluate(expr, let_env.clone())?;
        let_env.borrow_mut().set(name, value);
    }
    evaluate(body, let_env.clone())
}

fn evaluate_body(body: &[Node], env: &EnvRef, span: Span) -> EvalResult {
    let mut result = Node::new_bool(false, span);
    for expr in body {
        result = evaluate(expr, env.clone())?;
    }
    Ok(result)
}

/// Empties a finished `let*` or call frame unless the result carries a
/// closure out of it. A closure bound in the frame it captures is a
/// reference cycle, and clearing the bindings is what breaks it.
fn release_frame(frame: &EnvRef, result: &EvalResult) {
    let escapes = matches!(result, Ok(node) if holds_closure(&node.kind));
    if !escapes {
        frame.borrow_mut().clear();
    }
}

fn holds_closure(value: &Value) -> bool {
    match value {
        Value::Callable(Procedure::Lambda(_)) => true,
        Value::List(elements) => elements.iter().any(|e| holds_closure(&e.kind)),
        _ => false,
    }
}
