//! Mutable scope frames chained toward the global scope.
//!
//! Frames are shared (`Rc<RefCell<_>>`) rather than tree-owned: a closure
//! keeps its defining frame alive after the call that created it returns, and
//! a frame may hold function values whose closures point back up the same
//! chain, so lifetimes here are genuinely shared, not hierarchical.

use crate::error::{LoxError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Insert or overwrite a binding in this frame only.  Redefinition at
    /// runtime is legal; static redeclaration checks belong to the resolver.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up in this frame, then each enclosing frame in order.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Mutate the first frame up the chain that already contains `name`.
    /// Assignment never creates a binding; an undeclared name is an error.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Walk exactly `distance` enclosing links from `this`.
    ///
    /// Trusts the resolver completely: a missing link means the static pass
    /// and the runtime environment chain disagree, which is a bug worth a
    /// loud failure rather than a silent fallback search.
    fn ancestor(this: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut environment: Rc<RefCell<Environment>> = Rc::clone(this);

        for _ in 0..distance {
            let next: Rc<RefCell<Environment>> = environment
                .borrow()
                .enclosing
                .as_ref()
                .expect("resolved scope distance exceeds environment chain")
                .clone();

            environment = next;
        }

        environment
    }

    /// Direct lookup in the frame exactly `distance` hops up.  No name search.
    pub fn get_at(
        this: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value> {
        Self::ancestor(this, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| LoxError::runtime(line, format!("Undefined variable '{}'.", name)))
    }

    /// Direct mutation in the frame exactly `distance` hops up.  No name search.
    pub fn assign_at(
        this: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<()> {
        let frame: Rc<RefCell<Environment>> = Self::ancestor(this, distance);
        let mut frame = frame.borrow_mut();

        if frame.values.contains_key(name) {
            frame.values.insert(name.to_string(), value);
            Ok(())
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }
}
