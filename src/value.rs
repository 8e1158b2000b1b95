use std::cell::RefCell;
use std::rc::Rc;

use crate::environment::Environment;
use crate::expr::FunctionBody;

/// A user-defined function value: the parsed declaration plus the environment
/// that was live when the `fun` was evaluated.  The closure link is what makes
/// free variables resolve against the definition site, not the call site.
#[derive(Debug)]
pub struct LoxFunction {
    /// Declared name, or `None` for anonymous `fun` expressions.
    pub name: Option<String>,

    /// Shared parameter list and body.
    pub declaration: Rc<FunctionBody>,

    /// Environment captured at definition time.
    pub closure: Rc<RefCell<Environment>>,
}

impl LoxFunction {
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }
}

/// A runtime value: the tagged union every expression evaluates to.
#[derive(Debug, Clone)]
pub enum Value {
    NativeFunction {
        name: String,
        arity: usize,
        func: fn(&[Value]) -> Result<Value, String>,
    },
    Function(Rc<LoxFunction>),
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl PartialEq for Value {
    /// Value equality across the union: values of different kinds are never
    /// equal, numbers/strings/bools compare structurally, and function values
    /// compare by identity (a closure only equals itself - structural
    /// comparison would chase the captured environment in circles).
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (
                Value::NativeFunction { name: a, .. },
                Value::NativeFunction { name: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(function) => match &function.name {
                Some(name) => write!(f, "<fn {}>", name),
                None => write!(f, "<fn>"),
            },

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}
