use crate::environment::{EnvRef, Environment};
use crate::error::Error;
use crate::evaluator::evaluate;
use crate::parser::{parse_program, parse_str};
use crate::types::Node;

/// Owns the root environment that evaluations default to. Every
/// interpreter has its own root, so separate instances share nothing.
pub struct Interpreter {
    global_env: EnvRef,
}

impl Interpreter {
    /// An interpreter whose root holds the primitive library.
    pub fn new() -> Self {
        Interpreter::with_env(Environment::new_global_populated())
    }

    /// Uses `global_env` as the root. Its bindings are cleared when the
    /// interpreter is dropped.
    pub fn with_env(global_env: EnvRef) -> Self {
        Interpreter { global_env }
    }

    pub fn global_env(&self) -> EnvRef {
        self.global_env.clone()
    }

    pub fn parse(&self, input: &str) -> Result<Node, Error> {
        Ok(parse_str(input)?)
    }

    /// Evaluates `node` in `env`, or in the root environment when `env` is `None`.
    pub fn evaluate(&self, node: &Node, env: Option<EnvRef>) -> Result<Node, Error> {
        let env = env.unwrap_or_else(|| self.global_env());
        Ok(evaluate(node, env)?)
    }

    /// Parses one line and evaluates its first expression against the root.
    pub fn run(&self, input: &str) -> Result<Node, Error> {
        let node = self.parse(input)?;
        self.evaluate(&node, None)
    }

    /// Evaluates every expression of `input` in order, stopping at the first error.
    pub fn run_all(&self, input: &str) -> Result<Vec<Node>, Error> {
        parse_program(input)?
            .iter()
            .map(|node| self.evaluate(node, None))
            .collect()
    }
}

// Closures defined at the top level capture the root that binds them, so the
// root is emptied here or it would never be freed.
impl Drop for Interpreter {
    fn drop(&mut self) {
        self.global_env.borrow_mut().clear();
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}
