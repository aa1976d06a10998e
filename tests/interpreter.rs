use tinylisp::{Environment, ErrorKind, Interpreter, Span, Value, evaluate, parse_str};

fn run(lisp: &Interpreter, input: &str) -> Value {
    match lisp.run(input) {
        Ok(node) => node.kind,
        Err(e) => panic!("Evaluation failed for input '{}': {}", input, e),
    }
}

fn error_kind(lisp: &Interpreter, input: &str) -> ErrorKind {
    match lisp.run(input) {
        Ok(node) => panic!("Expected '{}' to fail, but got {}", input, node),
        Err(e) => e.kind(),
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn numeric_prefix_operations() {
    let lisp = Interpreter::new();
    assert_eq!(run(&lisp, "(+ 2 4)"), Value::Number(6.0));
    assert_eq!(run(&lisp, "(- 7 2)"), Value::Number(5.0));
    assert_eq!(run(&lisp, "(* 50 2)"), Value::Number(100.0));
    assert_eq!(run(&lisp, "(/ 50 2)"), Value::Number(25.0));
    assert_eq!(run(&lisp, "(+ (/ 10 2)(* 3 (- 8 4)))"), Value::Number(17.0));
}

#[test]
fn list_operations() {
    let lisp = Interpreter::new();
    assert_eq!(run(&lisp, "(first (\"a\" \"b\" \"c\"))"), text("a"));
    assert_eq!(run(&lisp, "(car (\"a\" \"b\" \"c\"))"), text("a"));
    assert_eq!(
        lisp.run("(rest (\"a\" \"b\" \"c\"))").unwrap().to_string(),
        "(\"b\" \"c\")"
    );
    assert_eq!(
        run(&lisp, "(+ (/ 10 (car (2 3 4))) (* 2 3))"),
        Value::Number(11.0)
    );
}

#[test]
fn special_forms() {
    let lisp = Interpreter::new();
    assert_eq!(run(&lisp, "(let* (x 25) x)"), Value::Number(25.0));
    assert_eq!(run(&lisp, "(let* (x 2 y (* x x)) y)"), Value::Number(4.0));
    assert_eq!(error_kind(&lisp, "x"), ErrorKind::NameError);

    assert_eq!(run(&lisp, "(if t \"Hello\" \"How_Low\")"), text("Hello"));
    assert_eq!(run(&lisp, "(if nil \"Hello\" \"Bye\")"), text("Bye"));

    lisp.run("(define be \"Happy\")").unwrap();
    assert_eq!(run(&lisp, "be"), text("Happy"));
}

#[test]
fn define_persists_in_explicit_root() {
    let root = Environment::new_global_populated();
    evaluate(&parse_str("(define be \"Happy\")").unwrap(), root.clone()).unwrap();
    let be = evaluate(&parse_str("be").unwrap(), root).unwrap();
    assert_eq!(be.kind, text("Happy"));
}

#[test]
fn untaken_branch_has_no_side_effects() {
    let lisp = Interpreter::new();
    assert_eq!(
        run(&lisp, "(if (< 1 2) \"taken\" (define side-effect t))"),
        text("taken")
    );
    assert_eq!(error_kind(&lisp, "side-effect"), ErrorKind::NameError);
}

#[test]
fn error_kinds_are_distinct() {
    let lisp = Interpreter::new();
    assert_eq!(error_kind(&lisp, ""), ErrorKind::SyntaxError);
    assert_eq!(error_kind(&lisp, "(+ 1 2"), ErrorKind::UnexpectedEndOfInput);
    assert_eq!(error_kind(&lisp, "+ 1 2)"), ErrorKind::MismatchedParenthesis);
    assert_eq!(error_kind(&lisp, "undefined_symbol"), ErrorKind::NameError);
    assert_eq!(error_kind(&lisp, "(/ 1 0)"), ErrorKind::ApplicationError);

    let err = lisp.run("undefined_symbol").unwrap_err();
    assert!(err.to_string().contains("undefined_symbol"));
    assert_eq!(err.span(), Span::new(0, 16));
}

#[test]
fn closures() {
    let lisp = Interpreter::new();
    lisp.run("(define compose (lambda (f g) (lambda (x) (f (g x)))))")
        .unwrap();
    lisp.run("(define inc (lambda (x) (+ x 1)))").unwrap();
    lisp.run("(define double (lambda (x) (* x 2)))").unwrap();
    assert_eq!(run(&lisp, "((compose inc double) 5)"), Value::Number(11.0));
}

#[test]
fn several_expressions_on_one_line() {
    let lisp = Interpreter::new();
    let results: Vec<String> = lisp
        .run_all("(define n 3) (* n n) (first (n 1))")
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(results, vec!["3", "9", "3"]);
}

#[test]
fn overflowing_results_read_back_as_numbers() {
    let lisp = Interpreter::new();
    let printed = lisp.run("(- 1e308 -1e308 -1e308)").unwrap().to_string();
    assert_eq!(printed, "inf");
    assert_eq!(run(&lisp, &printed), Value::Number(f64::INFINITY));
    assert_eq!(run(&lisp, "(* -1 1e400)"), Value::Number(f64::NEG_INFINITY));
    assert_eq!(run(&lisp, "(< 1e308 inf)"), Value::Boolean(true));
}
