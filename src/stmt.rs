use std::rc::Rc;

use serde::Serialize;

use crate::expr::{Expr, FunctionBody};
use crate::token::Token;

/// **Abstract-Syntax-Tree node** for *statements* (complete executable
/// constructs).  A program is a sequence of these nodes returned by
/// [`Parser::parse`](crate::parser::Parser::parse).
///
/// There is no `for` variant: the parser desugars `for` loops into
/// `Block`/`While` nodes before the tree reaches the resolver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Stand-alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop.
    While { condition: Expr, body: Box<Stmt> },

    /// `break` out of the innermost enclosing loop.  The parser only accepts
    /// this inside a loop body, so the interpreter never sees a stray one.
    Break { keyword: Token },

    /// Function declaration - becomes a first-class callable value bound to
    /// `name` in the current environment.
    Function {
        name: Token,
        function: Rc<FunctionBody>,
    },

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Optional expression to return.
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },
}
