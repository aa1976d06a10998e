use crate::{EvalError, EvalResult, Node, Span, Value};

// Checks the number of arguments
macro_rules! check_arity {
    ($args:expr, $expected:expr, $span:expr, $name:expr) => {
        if $args.len() != $expected {
            return Err(EvalError::Application(
                format!(
                    "Primitive '{}' expects exactly {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $span:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::Application(
                format!(
                    "Primitive '{}' expects at least {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
}

// Extracts a number from a Node or returns an application error
macro_rules! expect_number {
    ($node:expr, $name:expr, $arg_pos:expr) => {
        match $node.kind {
            Value::Number(n) => n,
            _ => {
                return Err(EvalError::Application(
                    format!(
                        "Primitive '{}' expects a number for argument {}, got {}",
                        $name,
                        $arg_pos,
                        $node.kind.type_name()
                    ),
                    $node.span,
                ));
            }
        }
    };
}

fn expect_list<'a>(node: &'a Node, name: &str) -> EvalResult<&'a [Node]> {
    match &node.kind {
        Value::List(elements) => Ok(elements.as_slice()),
        other => Err(EvalError::Application(
            format!(
                "Primitive '{}' expects a list, got {}",
                name,
                other.type_name()
            ),
            node.span,
        )),
    }
}

fn fold_numbers<F: Fn(f64, f64) -> f64>(
    args: &[Node],
    span: Span,
    start: f64,
    func: F,
    operator: &str,
) -> EvalResult {
    let mut acc = start;
    for (i, node) in args.iter().enumerate() {
        let num = expect_number!(node, operator, i + 1);
        acc = func(acc, num);
    }
    // Result needs to be a Node with a span. Let's use the call span.
    Ok(Node::new_number(acc, span))
}

pub fn prim_add(args: Vec<Node>, span: Span) -> EvalResult {
    // (+) -> 0
    // (+ 1 2 3) -> 6
    fold_numbers(&args, span, 0.0, |acc, val| acc + val, "+")
}

pub fn prim_sub(args: Vec<Node>, span: Span) -> EvalResult {
    // (- x) -> -x
    // (- x y z) -> x - y - z
    check_arity!(args, min 1, span, "-");
    let first_num = expect_number!(&args[0], "-", 1);
    if args.len() == 1 {
        return Ok(Node::new_number(-first_num, span));
    }
    let mut result = first_num;
    for (i, node) in args.iter().enumerate().skip(1) {
        result -= expect_number!(node, "-", i + 1);
    }
    Ok(Node::new_number(result, span))
}

pub fn prim_mul(args: Vec<Node>, span: Span) -> EvalResult {
    // (*) -> 1
    // (* 1 2 3) -> 6
    fold_numbers(&args, span, 1.0, |acc, val| acc * val, "*")
}

pub fn prim_div(args: Vec<Node>, span: Span) -> EvalResult {
    // (/ x) -> 1/x
    // (/ x y z) -> x / y / z
    check_arity!(args, min 1, span, "/");
    let first_num = expect_number!(&args[0], "/", 1);
    let (mut result, divisors) = if args.len() == 1 {
        (1.0, &args[..])
    } else {
        (first_num, &args[1..])
    };
    for (i, node) in divisors.iter().enumerate() {
        let num = expect_number!(node, "/", args.len() - divisors.len() + i + 1);
        if num == 0.0 {
            return Err(EvalError::Application(
                "Division by zero".to_string(),
                node.span,
            ));
        }
        result /= num;
    }
    Ok(Node::new_number(result, span))
}

fn compare_numbers<F: Fn(f64, f64) -> bool>(
    args: Vec<Node>,
    span: Span,
    compare: F,
    operator: &str,
) -> EvalResult {
    // (< n1 n2 ...) -> boolean
    check_arity!(args, min 2, span, operator);
    let mut last_val = expect_number!(&args[0], operator, 1);
    let mut result = true;
    for (index, arg) in args.iter().enumerate().skip(1) {
        let val = expect_number!(arg, operator, index + 1);
        result = result && compare(last_val, val);
        last_val = val;
    }
    Ok(Node::new_bool(result, span))
}

// Equality of values regardless of where they came from in the source
fn same_value(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::List(l), Value::List(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| same_value(&a.kind, &b.kind))
        }
        _ => left == right,
    }
}

pub fn prim_equals(args: Vec<Node>, span: Span) -> EvalResult {
    // (= a b ...) -> every neighbour equal; works for any type
    check_arity!(args, min 2, span, "=");
    let result = args
        .windows(2)
        .all(|pair| same_value(&pair[0].kind, &pair[1].kind));
    Ok(Node::new_bool(result, span))
}

pub fn prim_less_than(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left < right, "<")
}

pub fn prim_less_than_or_equals(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left <= right, "<=")
}

pub fn prim_greater_than(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left > right, ">")
}

pub fn prim_greater_than_or_equals(args: Vec<Node>, span: Span) -> EvalResult {
    compare_numbers(args, span, |left, right| left >= right, ">=")
}

// --- List Primitives ---

pub fn prim_car(args: Vec<Node>, span: Span) -> EvalResult {
    // (car list) -> first item
    check_arity!(args, 1, span, "car");
    match expect_list(&args[0], "car")? {
        [first, ..] => Ok(first.clone()),
        [] => Err(EvalError::Application(
            "car: Cannot take car of empty list".to_string(),
            args[0].span,
        )),
    }
}

pub fn prim_cdr(args: Vec<Node>, span: Span) -> EvalResult {
    // (cdr list) -> rest of list; the rest of () is ()
    check_arity!(args, 1, span, "cdr");
    let elements = expect_list(&args[0], "cdr")?;
    let rest = elements.get(1..).unwrap_or_default().to_vec();
    Ok(Node::new_list(rest, span))
}

pub fn prim_cons(args: Vec<Node>, span: Span) -> EvalResult {
    // (cons item list) -> (item ..list)
    check_arity!(args, 2, span, "cons");
    let tail = expect_list(&args[1], "cons")?;
    let mut elements = Vec::with_capacity(tail.len() + 1);
    elements.push(args[0].clone());
    elements.extend_from_slice(tail);
    Ok(Node::new_list(elements, span))
}

pub fn prim_list(args: Vec<Node>, span: Span) -> EvalResult {
    // (list item1 item2 ...) -> new list containing items
    // Args are already evaluated nodes
    Ok(Node::new_list(args, span))
}

// --- Type Predicates ---

macro_rules! is_type {
    ($args:expr, $type:pat, $name:expr, $span:expr) => {{
        check_arity!($args, 1, $span, $name);
        Ok(Node::new_bool(matches!($args[0].kind, $type), $span))
    }};
}

pub fn prim_is_null(args: Vec<Node>, span: Span) -> EvalResult {
    // (null? obj) -> boolean
    check_arity!(args, 1, span, "null?");
    let is_null = matches!(&args[0].kind, Value::List(elements) if elements.is_empty());
    Ok(Node::new_bool(is_null, span))
}

pub fn prim_is_number(args: Vec<Node>, span: Span) -> EvalResult {
    is_type!(args, Value::Number(_), "number?", span)
}

pub fn prim_is_boolean(args: Vec<Node>, span: Span) -> EvalResult {
    is_type!(args, Value::Boolean(_), "boolean?", span)
}

pub fn prim_is_symbol(args: Vec<Node>, span: Span) -> EvalResult {
    is_type!(args, Value::Symbol(_), "symbol?", span)
}

pub fn prim_is_string(args: Vec<Node>, span: Span) -> EvalResult {
    is_type!(args, Value::Text(_), "string?", span)
}

pub fn prim_is_procedure(args: Vec<Node>, span: Span) -> EvalResult {
    is_type!(args, Value::Callable(_), "procedure?", span)
}
