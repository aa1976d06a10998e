use crate::environment::Environment;
use crate::{evaluator::EvalResult, source::Span};
use std::cell::RefCell;
use std::fmt; // For custom display formatting
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: Value, // The actual datum
    pub span: Span,  // The source span it covers
}

impl Node {
    pub fn new(kind: Value, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_number(n: f64, span: Span) -> Self {
        Node::new(Value::Number(n), span)
    }

    pub fn new_text(s: &str, span: Span) -> Self {
        Node::new(Value::Text(s.to_string()), span)
    }

    pub fn new_bool(b: bool, span: Span) -> Self {
        Node::new(Value::Boolean(b), span)
    }

    pub fn new_symbol(s: String, span: Span) -> Self {
        Node::new(Value::Symbol(s), span)
    }

    pub fn new_list(elements: Vec<Node>, span: Span) -> Self {
        Node::new(Value::List(elements), span)
    }

    pub fn new_primitive(func: PrimitiveFunc, name: &str, span: Span) -> Self {
        Node::new(
            Value::Callable(Procedure::Primitive(func, name.to_string())),
            span,
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegate to Value's Display implementation
        write!(f, "{}", self.kind)
    }
}

/// The universal datum: both the AST produced by the parser and the
/// results produced by evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),    // "hello"
    Boolean(bool),   // t or nil
    Symbol(String),  // e.g., +, let*, variable-name
    List(Vec<Node>), // e.g., (+ 1 2), ("a" "b"), ()
    Callable(Procedure),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Callable(_) => "procedure",
        }
    }

    /// Only `nil` is false. Zero, the empty string and the empty list are all true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Symbol(s) => write!(f, "{}", s),
            // f64 already prints infinities as inf/-inf
            Value::Number(n) if n.is_nan() => write!(f, "nan"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", if *b { "t" } else { "nil" }),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::List(list) => {
                write!(f, "(")?;
                let mut first = true;
                for expr in list {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", expr)?;
                    first = false;
                }
                write!(f, ")")
            }
            Value::Callable(procedure) => match procedure {
                Procedure::Primitive(_, name) => write!(f, "#<primitive:{}>", name),
                Procedure::Lambda(lambda) => {
                    write!(f, "#<lambda:({})>", lambda.params.join(" "))
                }
            },
        }
    }
}

pub type PrimitiveFunc = fn(Vec<Node>, Span) -> EvalResult;

/// A user-defined function closing over the environment it was created in.
/// The strong `env` link makes a closure bound in its own defining frame a
/// cycle; finished frames and dropped interpreters clear their bindings to
/// break it. A closure that escapes while also bound in its frame, as in
/// `(let* (f (lambda () 1)) f)`, still keeps that frame alive.
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Vec<Node>,
    pub env: Rc<RefCell<Environment>>,
}

#[derive(Clone)] // Need Clone for Value::Callable
pub enum Procedure {
    Primitive(PrimitiveFunc, String), // The function pointer and its name (for display/debug)
    Lambda(Rc<Lambda>),
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Primitive(_, name) => write!(f, "Primitive({})", name),
            // The captured environment may contain this lambda; don't walk it.
            Procedure::Lambda(lambda) => write!(f, "Lambda({:?})", lambda.params),
        }
    }
}

// Primitives are identified by the name they were registered under, so an
// alias (`first` for `car`) compares equal to its original. Lambdas compare
// by identity.
impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Procedure::Primitive(_, n1), Procedure::Primitive(_, n2)) => n1 == n2,
            (Procedure::Lambda(l1), Procedure::Lambda(l2)) => Rc::ptr_eq(l1, l2),
            _ => false,
        }
    }
}
