use crate::primitives;
use crate::source::Span;
use crate::types::{Node, PrimitiveFunc};
use log::trace;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

// --- Environment Error ---
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvError {
    #[error("Unbound variable: '{name}'")]
    NameError { name: String, span: Span }, // Symbol name, span where lookup happened
}

pub type EnvRef = Rc<RefCell<Environment>>;

// --- Environment Definition ---

#[derive(Debug)]
pub struct Environment {
    // Use Rc<RefCell<...>> to allow shared ownership and interior mutability.
    // Needed for closures capturing environments and for 'define'.
    outer: Option<EnvRef>,
    bindings: HashMap<String, Node>, // Maps variable names to Nodes
}

impl Environment {
    /// Creates a new, top-level (global) environment.
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Environment {
            outer: None,
            bindings: HashMap::new(),
        }))
    }

    /// Creates a root environment holding the primitive library.
    pub fn new_global_populated() -> EnvRef {
        let env_ptr = Environment::new(); // Create empty global env
        {
            // Borrow mutably only inside this scope
            let mut env = env_ptr.borrow_mut();
            env.add_primitive("+", primitives::prim_add);
            env.add_primitive("-", primitives::prim_sub);
            env.add_primitive("*", primitives::prim_mul);
            env.add_primitive("/", primitives::prim_div);
            env.add_primitive("=", primitives::prim_equals);
            env.add_primitive("<", primitives::prim_less_than);
            env.add_primitive("<=", primitives::prim_less_than_or_equals);
            env.add_primitive(">", primitives::prim_greater_than);
            env.add_primitive(">=", primitives::prim_greater_than_or_equals);

            // --- List Primitives ---
            env.add_primitive("car", primitives::prim_car);
            env.add_primitive("cdr", primitives::prim_cdr);
            env.alias("first", "car");
            env.alias("rest", "cdr");
            env.add_primitive("cons", primitives::prim_cons);
            env.add_primitive("list", primitives::prim_list);

            // --- Type Predicates ---
            env.add_primitive("null?", primitives::prim_is_null);
            env.add_primitive("number?", primitives::prim_is_number);
            env.add_primitive("boolean?", primitives::prim_is_boolean);
            env.add_primitive("symbol?", primitives::prim_is_symbol);
            env.add_primitive("string?", primitives::prim_is_string);
            env.add_primitive("procedure?", primitives::prim_is_procedure);
        }
        env_ptr
    }

    /// Creates a new environment enclosed within an outer one.
    pub fn new_enclosed(outer_env: EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer_env),
            bindings: HashMap::new(),
        }))
    }

    /// Binds `name` in *this* frame, replacing any existing binding here.
    /// Outer frames are never touched. Returns the stored value.
    pub fn set(&mut self, name: &str, value_node: Node) -> Node {
        trace!("env set {} = {}", name, value_node);
        self.bindings.insert(name.to_string(), value_node.clone());
        value_node
    }

    /// Drops every binding in this frame. The outer link is kept.
    pub fn clear(&mut self) {
        trace!("env clear {} bindings", self.bindings.len());
        self.bindings.clear();
    }

    /// Returns the nearest frame, starting at `env` and walking outward,
    /// whose own bindings contain `name`.
    pub fn find(env: &EnvRef, name: &str) -> Option<EnvRef> {
        let mut current = env.clone();
        loop {
            let outer = {
                let frame = current.borrow();
                if frame.bindings.contains_key(name) {
                    break;
                }
                frame.outer.clone()?
            };
            current = outer;
        }
        Some(current)
    }

    /// Looks up a variable's value.
    /// `lookup_span` is the location where the variable was referenced, used for error reporting.
    pub fn get(env: &EnvRef, name: &str, lookup_span: Span) -> Result<Node, EnvError> {
        Environment::find(env, name)
            .and_then(|frame| {
                let value_node = frame.borrow().bindings.get(name).cloned();
                value_node
            })
            .ok_or_else(|| EnvError::NameError {
                name: name.to_string(),
                span: lookup_span,
            })
    }

    /// Binds `name` to exactly the value currently bound to `existing` in this frame.
    fn alias(&mut self, name: &str, existing: &str) {
        if let Some(value_node) = self.bindings.get(existing).cloned() {
            self.set(name, value_node);
        }
    }

    /// Helper to add a primitive procedure to the environment.
    fn add_primitive(&mut self, name: &str, func: PrimitiveFunc) {
        let node = Node::new_primitive(func, name, Span::default());
        self.set(name, node);
    }

    /// Gets every identifier visible from this environment
    pub fn get_identifiers(&self) -> HashSet<String> {
        let mut identifiers: HashSet<String> = self.bindings.keys().cloned().collect();
        if let Some(ref outer_env_ptr) = self.outer {
            identifiers.extend(outer_env_ptr.borrow().get_identifiers());
        }
        identifiers
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    // Helper to create a dummy node with default span
    fn num_node(n: f64) -> Node {
        Node::new_number(n, Span::default())
    }

    fn text_node(s: &str) -> Node {
        Node::new_text(s, Span::default())
    }

    #[test]
    fn test_set_and_get_global() {
        let env = Environment::new();
        let stored = env.borrow_mut().set("x", num_node(10.0));
        assert_eq!(stored, num_node(10.0));

        let result = Environment::get(&env, "x", Span::default());
        assert_eq!(result.unwrap(), num_node(10.0));
    }

    #[test]
    fn test_set_overwrites() {
        let env = Environment::new();
        env.borrow_mut().set("t", text_node("This is true"));
        env.borrow_mut().set("nil", text_node("This is nil"));
        env.borrow_mut().set("t", text_node("overwritten"));
        assert_eq!(
            Environment::get(&env, "t", Span::default()).unwrap(),
            text_node("overwritten")
        );
        assert_eq!(
            Environment::get(&env, "nil", Span::default()).unwrap(),
            text_node("This is nil")
        );
    }

    #[test]
    fn test_clear_keeps_outer_link() {
        let global_env = Environment::new();
        global_env.borrow_mut().set("x", num_node(1.0));
        let local_env = Environment::new_enclosed(global_env);
        local_env.borrow_mut().set("y", num_node(2.0));

        local_env.borrow_mut().clear();
        assert!(Environment::get(&local_env, "y", Span::default()).is_err());
        assert_eq!(
            Environment::get(&local_env, "x", Span::default()).unwrap(),
            num_node(1.0)
        );
    }

    #[test]
    fn test_get_unbound_global() {
        let env = Environment::new();
        let result = Environment::get(&env, "y", Span::default());
        assert!(matches!(result, Err(EnvError::NameError { name, .. }) if name == "y"));
    }

    #[test]
    fn test_get_unbound_enclosed() {
        let global_env = Environment::new();
        let local_env = Environment::new_enclosed(global_env);

        let span = Span::new(11, 12);
        let result = Environment::get(&local_env, "z", span);
        assert_eq!(
            result,
            Err(EnvError::NameError {
                name: "z".to_string(),
                span
            })
        );
    }

    #[test]
    fn test_find_walks_parents() {
        let global_env = Environment::new();
        global_env.borrow_mut().set("x", text_node("This is true"));
        let middle = Environment::new_enclosed(global_env.clone());
        let inner = Environment::new_enclosed(middle.clone());

        let found = Environment::find(&inner, "x").expect("x should be found");
        assert!(Rc::ptr_eq(&found, &global_env));
        assert!(Environment::find(&inner, "missing").is_none());

        for env in [&global_env, &middle, &inner] {
            assert_eq!(
                Environment::get(env, "x", Span::default()).unwrap(),
                text_node("This is true")
            );
        }
    }

    #[test]
    fn test_set_only_touches_own_frame() {
        let global_env = Environment::new();
        global_env.borrow_mut().set("x", num_node(10.0));

        let local_env = Environment::new_enclosed(global_env.clone());
        local_env.borrow_mut().set("x", num_node(50.0)); // Shadow global x
        local_env.borrow_mut().set("y", num_node(20.0));

        assert_eq!(
            Environment::get(&local_env, "x", Span::default()).unwrap(),
            num_node(50.0)
        );
        assert_eq!(
            Environment::get(&global_env, "x", Span::default()).unwrap(),
            num_node(10.0)
        );
        assert!(Environment::get(&global_env, "y", Span::default()).is_err());
        assert!(Rc::ptr_eq(
            &Environment::find(&local_env, "x").unwrap(),
            &local_env
        ));
    }

    #[test]
    fn test_first_and_rest_are_exact_aliases() {
        let env = Environment::new_global_populated();
        let get = |name| Environment::get(&env, name, Span::default()).unwrap();
        assert_eq!(get("first"), get("car"));
        assert_eq!(get("rest"), get("cdr"));
        assert_ne!(get("first"), get("cdr"));
        match (get("first").kind, get("car").kind) {
            (
                Value::Callable(crate::types::Procedure::Primitive(f1, _)),
                Value::Callable(crate::types::Procedure::Primitive(f2, _)),
            ) => assert!(std::ptr::fn_addr_eq(f1, f2)),
            other => panic!("Expected two primitives, got {:?}", other),
        }
    }

    #[test]
    fn test_get_identifiers_includes_outer() {
        let global_env = Environment::new_global_populated();
        let local_env = Environment::new_enclosed(global_env);
        local_env.borrow_mut().set("local", num_node(1.0));
        let ids = local_env.borrow().get_identifiers();
        assert!(ids.contains("local"));
        assert!(ids.contains("car"));
        assert!(ids.contains("rest"));
    }
}
