use std::rc::Rc;

use serde::Serialize;

use crate::stmt::Stmt;
use crate::token::Token;

/// Identity of an expression node, distinct from structural equality.
///
/// The resolver's side-table is keyed by these ids, so two syntactically
/// identical variable references at different source positions get separate
/// entries.  The parser hands them out from a monotonically increasing
/// counter; the interactive loop threads the counter across inputs so ids
/// from earlier lines are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExprId(pub u32);

/// A **literal constant** that appears directly in the source code.
///
/// These variants are the *terminal leaves* of the expression tree and
/// therefore do **not** retain a reference to the originating [`Token`].
/// The parser copies (or converts) the value at parse-time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal - stored as IEEE-754 `f64`.
    /// Integral lexemes such as `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal (Lox's `null`).
    Nil,
}

/// Parameter list and body shared by named function declarations and
/// anonymous `fun` expressions.  Reference-counted because a declaration is
/// parsed once but may back many closure values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionBody {
    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    /// Statements executed when the function is called.
    pub body: Vec<Stmt>,

    /// Line of the `fun` keyword, for error reporting.
    pub line: usize,
}

/// **Abstract-Syntax-Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator expression
    /// *Example:* `!isReady` or `-42`
    Unary {
        /// The operator token (`!` or `-`).
        operator: Token,
        /// Operand to which the operator is applied.
        right: Box<Expr>,
    },

    /// Infix binary operator expression
    /// *Example:* `a + b`, `x <= y`
    Binary {
        left: Box<Expr>,
        /// Operator token such as `+`, `*`, `==`, ...
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub-expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Short-circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token, // `AND` or `OR`
        right: Box<Expr>,
    },

    /// Variable access - resolves to the identifier's current value at
    /// runtime, through the resolver's side-table when the binding is local.
    Variable { id: ExprId, name: Token },

    /// Assignment expression: `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Function- or value-call expression
    /// *Example:* `clock()` or `add(1, 2)`
    Call {
        /// Expression that evaluates to a callable.
        callee: Box<Expr>,
        /// The closing `)` token - retained for error reporting.
        paren: Token,
        /// Argument list (may be empty).
        arguments: Vec<Expr>,
    },

    /// Anonymous function expression: `fun (params) { ... }`.
    /// Evaluates to a closure over the environment live at that moment.
    Function(Rc<FunctionBody>),
}
