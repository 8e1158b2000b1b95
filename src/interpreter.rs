//! Tree-walking evaluator.
//!
//! Walks the parsed statement list against a chain of [`Environment`] frames,
//! consulting the resolver's side-table (`locals`) for every variable
//! occurrence it classified as local.  `return` and `break` are modelled as
//! an explicit [`Flow`] signal threaded back up through statement execution
//! rather than as errors: they are absorbed by the nearest function call or
//! loop and never reach the diagnostics collector.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::diagnostics::Diagnostics;
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::{LoxFunction, Value};

/// How a statement finished.  `Return` and `Break` are control transfers,
/// not failures; every statement-executing function propagates them until a
/// function call or loop absorbs them.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
}

pub struct Interpreter {
    /// The global frame.  Created once, lives for the whole session; never
    /// rebuilt between runs so an interactive loop keeps its definitions.
    globals: Rc<RefCell<Environment>>,

    /// The frame active right now.  Starts at `globals`.
    environment: Rc<RefCell<Environment>>,

    /// The resolver's side-table: expression id → lexical scope distance.
    /// Absence of an entry means "resolve dynamically against globals".
    locals: HashMap<ExprId, usize>,

    /// Sink for `print` output.  Stdout by default; injectable for tests.
    writer: Box<dyn Write>,
}

fn clock_native(_args: &[Value]) -> std::result::Result<Value, String> {
    debug!("Calling native function 'clock'");

    // Whole seconds since the Unix epoch, matching the reference interpreter.
    Ok(Value::Number(chrono::Utc::now().timestamp() as f64))
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter writing to stdout, and defines native
    /// functions such as `clock`.
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    /// Creates an Interpreter with a caller-supplied output sink.
    pub fn with_writer(writer: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: clock_native,
            },
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            writer,
        }
    }

    /// Record a resolved local: `id` refers to a binding `depth` scopes out.
    /// Called by the resolver; entries accumulate across runs.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Depth recorded for an expression, if the resolver classified it as a
    /// local.  `None` means global (or never resolved).
    pub fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// error is reported to `diagnostics` and abandons the remaining
    /// top-level statements; the process survives.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                // A stray Return/Break cannot occur at the top level: the
                // resolver rejects top-level `return` and the parser rejects
                // `break` outside a loop.
                Ok(_) => {}

                Err(e) => {
                    debug!("Runtime error: {}", e);
                    diagnostics.runtime_error(&e);
                    return;
                }
            }
        }

        info!("Interpretation completed successfully");
    }

    /// Executes a single statement, reporting how it finished.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Function { name, function } => {
                debug!("Defining function '{}'", name.lexeme);

                // The name is bound before any call, so the body may refer to
                // it recursively; the closure is the environment live *now*.
                let value = Value::Function(Rc::new(LoxFunction {
                    name: Some(name.lexeme.clone()),
                    declaration: Rc::clone(function),
                    closure: Rc::clone(&self.environment),
                }));

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::Expression(expr) => {
                let _ = self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.writer, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Variable '{}' defined with value: {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                debug!("Entering block with {} statements", statements.len());

                let child = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));

                self.execute_block(statements, child)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond_value = self.evaluate(condition)?;

                if is_truthy(&cond_value) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                debug!("Entering while loop");

                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body)? {
                        Flow::Normal => {}

                        // `break` terminates this loop and nothing beyond it.
                        Flow::Break => break,

                        // `return` keeps unwinding toward the enclosing call.
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }

                debug!("Exited while loop");
                Ok(Flow::Normal)
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }
        }
    }

    /// Runs `statements` with `environment` active, restoring the previous
    /// environment on *every* exit path - normal completion, control
    /// transfer, or error.
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Flow> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = self.run_sequence(statements);

        self.environment = previous;
        result
    }

    fn run_sequence(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                signal => return Ok(signal),
            }
        }

        Ok(Flow::Normal)
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        let value = match expr {
            Expr::Literal(literal) => match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            },

            Expr::Grouping(inner) => self.evaluate(inner)?,

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right)?,

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right)?,

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right)?,

            Expr::Variable { id, name } => self.lookup_variable(*id, name)?,

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,

                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(&name.lexeme, value.clone(), name.line)?
                    }
                }

                // Assignment is an expression: its value is the assigned one.
                value
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                debug!("Evaluating function call");

                let callee_val = self.evaluate(callee)?;

                let mut arg_values = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg)?);
                }

                self.invoke_callable(&callee_val, paren, &arg_values)?
            }

            Expr::Function(function) => Value::Function(Rc::new(LoxFunction {
                name: None,
                declaration: Rc::clone(function),
                closure: Rc::clone(&self.environment),
            })),
        };

        Ok(value)
    }

    /// Reads a variable through the side-table when the resolver classified
    /// it as local, else dynamically against the global frame.
    fn lookup_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        debug!("Looking up variable '{}'", name.lexeme);

        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, &name.lexeme, name.line)
            }

            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    /// Evaluates a unary expression.
    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => {
                if let Value::Number(n) = right_val {
                    Ok(Value::Number(-n))
                } else {
                    Err(LoxError::runtime(
                        operator.line,
                        "Operand must be a number.",
                    ))
                }
            }

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_val))),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator")),
        }
    }

    /// Evaluates `and` / `or`, short-circuiting: the right side only runs
    /// when the left side did not already decide the answer.
    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left_val = self.evaluate(left)?;

        if operator.token_type == TokenType::OR {
            if is_truthy(&left_val) {
                return Ok(left_val);
            }
        } else if !is_truthy(&left_val) {
            return Ok(left_val);
        }

        self.evaluate(right)
    }

    /// Evaluates a binary expression.
    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                // One string operand stringifies the other.
                (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b))),
                (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings, or one of each.",
                )),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::SLASH => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => {
                    // Checked before dividing - no IEEE infinities leak out.
                    if b == 0.0 {
                        Err(LoxError::runtime(operator.line, "Cannot divide by zero."))
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }
                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_val, &right_val))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_val, &right_val))),

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator")),
        }
    }

    /// Invokes a callable (native or user-defined function).
    fn invoke_callable(
        &mut self,
        callee_val: &Value,
        paren: &Token,
        arg_values: &[Value],
    ) -> Result<Value> {
        match callee_val {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                if arg_values.len() != *arity {
                    return Err(LoxError::runtime(
                        paren.line,
                        format!(
                            "Expected {} arguments but got {}.",
                            arity,
                            arg_values.len()
                        ),
                    ));
                }

                func(arg_values).map_err(|msg| LoxError::runtime(paren.line, msg))
            }

            Value::Function(function) => {
                debug!(
                    "Calling function '{}'",
                    function.name.as_deref().unwrap_or("<anonymous>")
                );

                if arg_values.len() != function.arity() {
                    return Err(LoxError::runtime(
                        paren.line,
                        format!(
                            "Expected {} arguments but got {}.",
                            function.arity(),
                            arg_values.len()
                        ),
                    ));
                }

                self.call_function(function, arg_values)
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Function invocation protocol: a fresh frame parented to the closure
    /// (never the caller's environment), parameters bound positionally, the
    /// body run as a block, and `Flow::Return` absorbed here.
    fn call_function(&mut self, function: &LoxFunction, arg_values: &[Value]) -> Result<Value> {
        let frame = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &function.closure,
        ))));

        for (param, arg) in function.declaration.params.iter().zip(arg_values) {
            debug!("Binding parameter '{}' to {}", param.lexeme, arg);
            frame.borrow_mut().define(&param.lexeme, arg.clone());
        }

        match self.execute_block(&function.declaration.body, frame)? {
            Flow::Return(value) => Ok(value),

            // Falling off the end of the body yields nil.  `Break` cannot
            // escape a body - the parser guarantees it.
            _ => Ok(Value::Nil),
        }
    }
}

/// The single source of truth for truthiness: `nil` and `false` are falsy,
/// everything else (including `0` and `""`) is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn is_equal(left: &Value, right: &Value) -> bool {
    left == right
}
