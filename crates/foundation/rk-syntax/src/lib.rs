//! Concrete syntax tree consumed by the semantic core
//!
//! The parser (not part of this workspace) produces one [`CompilationUnit`]
//! per source unit. Every declaration, statement, expression and type
//! reference carries a [`SourceLocation`] so that diagnostics can be reported
//! against the original text.
//!
//! Operator enums live here because the intermediate tree reuses them
//! unchanged after resolution.

pub mod builder;
pub mod decl;
pub mod expr;
pub mod stmt;
pub mod ty;

pub use builder::SyntaxBuilder;
pub use decl::{
    AccessorDecl, ClassDecl, CompilationUnit, Declaration, DeclarationKind, EnumDecl,
    EnumMemberDecl, FunctionDecl, GenericParamDecl, ParamDecl, PropertyDecl, VariableDecl,
};
pub use expr::{AnonymousFunction, Argument, Expr, ExprKind, Literal};
pub use stmt::{
    Block, CaseRange, CatchClause, CatchKind, ConditionalBranch, ForStmt, ForeachStmt, IfStmt,
    LocalVarDecl, Stmt, StmtKind, SwitchCase, SwitchStmt, TryStmt, WhileStmt,
};
pub use ty::{FnParamRef, TypeRef, TypeRefKind};

pub use rk_intern::Symbol;
pub use rk_span::SourceLocation;

use std::fmt;

/// Member and declaration visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Visibility {
    /// Visible only inside the declaring type (and its nested scopes)
    Private,
    /// Visible inside the declaring type and its subclasses
    Protected,
    /// Visible everywhere
    #[default]
    Public,
}

impl fmt::Display for Visibility {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(formatter, "private"),
            Self::Protected => write!(formatter, "protected"),
            Self::Public => write!(formatter, "public"),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Remainder (%)
    Mod,
    /// Bitwise AND
    BitAnd,
    /// Bitwise OR
    BitOr,
    /// Bitwise XOR
    BitXor,
    /// Left shift
    Shl,
    /// Right shift
    Shr,
    /// Logical AND
    And,
    /// Logical OR
    Or,
    /// Logical XOR
    Xor,
    /// Value equality
    Eq,
    /// Value inequality
    Ne,
    /// Reference identity
    RefEq,
    /// Reference non-identity
    RefNe,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// String or array concatenation
    Concat,
}

/// Operator families; each family has its own operand legality table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpFamily {
    /// `+ - * / %` and the bitwise/shift operators
    Arithmetic,
    /// `and or xor`
    Boolean,
    /// `== !=`
    Equality,
    /// `=== !==`
    ReferenceEquality,
    /// `< <= > >=`
    Comparison,
    /// String/array concatenation
    Concatenation,
}

impl BinaryOp {
    /// Operand-legality family
    pub fn family(self) -> OpFamily {
        match self {
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Mod
            | Self::BitAnd
            | Self::BitOr
            | Self::BitXor
            | Self::Shl
            | Self::Shr => OpFamily::Arithmetic,
            Self::And | Self::Or | Self::Xor => OpFamily::Boolean,
            Self::Eq | Self::Ne => OpFamily::Equality,
            Self::RefEq | Self::RefNe => OpFamily::ReferenceEquality,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => OpFamily::Comparison,
            Self::Concat => OpFamily::Concatenation,
        }
    }

    /// Bitwise and shift operators only accept integer operands
    pub fn is_integral_only(self) -> bool {
        matches!(
            self,
            Self::BitAnd | Self::BitOr | Self::BitXor | Self::Shl | Self::Shr | Self::Mod
        )
    }

    /// Source spelling
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::RefEq => "===",
            Self::RefNe => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Concat => "~",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Logical NOT
    Not,
    /// Bitwise NOT
    BitNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neg => write!(formatter, "-"),
            Self::Not => write!(formatter, "not"),
            Self::BitNot => write!(formatter, "~"),
        }
    }
}
