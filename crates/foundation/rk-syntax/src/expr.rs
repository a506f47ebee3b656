//! Expressions

use crate::decl::ParamDecl;
use crate::stmt::Block;
use crate::ty::TypeRef;
use crate::{BinaryOp, UnaryOp};
use rk_intern::Symbol;
use rk_span::SourceLocation;

/// An expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Expression kind
    pub kind: ExprKind,
    /// Source location
    pub location: SourceLocation,
}

/// Expression kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value
    Literal(Literal),
    /// Bare identifier
    Name(Symbol),
    /// `A#B#C` or `global(Unit)#A`
    Scoped {
        /// Explicit unit prefix
        unit: Option<Symbol>,
        /// Path segments, never empty
        path: Vec<Symbol>,
    },
    /// Self reference
    This,
    /// Member access
    Member {
        /// Accessed object
        target: Box<Expr>,
        /// Member name
        name: Symbol,
    },
    /// Array indexing
    Index {
        /// Indexed array
        target: Box<Expr>,
        /// One index per dimension
        indices: Vec<Expr>,
    },
    /// Call
    Call {
        /// Callee
        callee: Box<Expr>,
        /// Explicit generic arguments
        generic_args: Vec<TypeRef>,
        /// Arguments
        args: Vec<Argument>,
    },
    /// Object construction
    New {
        /// Constructed class
        ty: TypeRef,
        /// Constructor arguments
        args: Vec<Argument>,
    },
    /// Array construction
    NewArray {
        /// Element type
        element: TypeRef,
        /// One length per dimension
        lengths: Vec<Expr>,
    },
    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Assignment; `op` is set for compound assignment
    Assign {
        /// Compound operator
        op: Option<BinaryOp>,
        /// Assigned storage
        target: Box<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },
    /// Explicit cast
    Cast {
        /// Target type
        ty: TypeRef,
        /// Cast operand
        expr: Box<Expr>,
    },
    /// Runtime type test
    Is {
        /// Tested value
        expr: Box<Expr>,
        /// Tested type
        ty: TypeRef,
    },
    /// `condition ? then : otherwise`
    Conditional {
        /// Condition
        condition: Box<Expr>,
        /// Value when true
        then: Box<Expr>,
        /// Value when false
        otherwise: Box<Expr>,
    },
    /// Anonymous function
    AnonymousFunction(Box<AnonymousFunction>),
}

/// Call argument
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// Argument value
    pub value: Expr,
    /// Passed by reference
    pub by_ref: bool,
}

/// Anonymous function literal
#[derive(Debug, Clone, PartialEq)]
pub struct AnonymousFunction {
    /// Parameters
    pub params: Vec<ParamDecl>,
    /// Return type
    pub return_type: Option<TypeRef>,
    /// Body
    pub body: Block,
}

/// Literal values as written
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Unsigned integer text; negation is a separate unary operator
    Integer(u64),
    /// Floating point literal
    Float(f64),
    /// String literal
    String(String),
    /// Character literal
    Char(char),
    /// Boolean literal
    Bool(bool),
    /// `null`
    Null,
}
