//! Statements and blocks

use crate::decl::Declaration;
use crate::expr::Expr;
use crate::ty::TypeRef;
use rk_intern::Symbol;
use rk_span::SourceLocation;

/// A statement block
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Optional name, targetable by `break`
    pub label: Option<Symbol>,
    /// Statements in order
    pub statements: Vec<Stmt>,
    /// Source location
    pub location: SourceLocation,
}

/// A statement
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// Statement kind
    pub kind: StmtKind,
    /// Source location
    pub location: SourceLocation,
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for effect
    Expr(Expr),
    /// Local variable or constant
    Var(LocalVarDecl),
    /// Nested block
    Block(Block),
    /// `if / elif / else`
    If(IfStmt),
    /// `while` and `do-while`
    While(WhileStmt),
    /// Counted loop
    For(ForStmt),
    /// Collection loop
    Foreach(ForeachStmt),
    /// Multi-way branch
    Switch(SwitchStmt),
    /// Exception handling
    Try(TryStmt),
    /// Leave a loop or named block
    Break(Option<Symbol>),
    /// Restart a loop
    Continue(Option<Symbol>),
    /// Return from the function
    Return(Option<Expr>),
    /// Raise an exception object or a numeric error code
    Throw(Expr),
    /// Debug assertion
    Assert {
        /// Asserted condition
        condition: Expr,
        /// Optional message
        message: Option<Expr>,
    },
    /// Conditional compilation on a build-mode symbol
    Ifdef {
        /// Tested symbol
        symbol: Symbol,
        /// Compiled when the symbol is defined
        then: Block,
        /// Compiled otherwise
        otherwise: Option<Block>,
    },
    /// Class, enum or function declared inside a block
    Declaration(Box<Declaration>),
}

/// Local variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarDecl {
    /// Variable name
    pub name: Symbol,
    /// Declared type
    pub ty: Option<TypeRef>,
    /// Initializer
    pub initializer: Option<Expr>,
    /// Declared `const`
    pub is_const: bool,
}

/// `if` statement with its `elif` chain
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    /// `if` followed by each `elif`
    pub branches: Vec<ConditionalBranch>,
    /// `else` block
    pub otherwise: Option<Block>,
}

/// Condition and body pair
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    /// Condition
    pub condition: Expr,
    /// Body executed when the condition holds
    pub body: Block,
}

/// `while` loop
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    /// Loop condition
    pub condition: Expr,
    /// Loop body
    pub body: Block,
    /// Execute the body once before the first test
    pub skip_first_check: bool,
    /// Loop name
    pub label: Option<Symbol>,
}

/// Counted `for` loop
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    /// Counter variable
    pub variable: Symbol,
    /// Initial counter value
    pub initial: Expr,
    /// Inclusive limit
    pub limit: Expr,
    /// Step; defaults to 1
    pub step: Option<Expr>,
    /// Loop body
    pub body: Block,
    /// Loop name
    pub label: Option<Symbol>,
}

/// `foreach` loop
#[derive(Debug, Clone, PartialEq)]
pub struct ForeachStmt {
    /// Element name
    pub variable: Symbol,
    /// Iterated collection
    pub collection: Expr,
    /// Loop body
    pub body: Block,
    /// Loop name
    pub label: Option<Symbol>,
}

/// `switch` statement
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    /// Switched value
    pub subject: Expr,
    /// Cases in source order
    pub cases: Vec<SwitchCase>,
    /// `default` block
    pub default: Option<Block>,
}

/// One `case` clause
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// Alternatives; the case matches if any range matches
    pub ranges: Vec<CaseRange>,
    /// Case body
    pub body: Block,
    /// Source location
    pub location: SourceLocation,
}

/// `lower` or `lower to upper`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRange {
    /// Lower bound, or the single value
    pub lower: Expr,
    /// Inclusive upper bound
    pub upper: Option<Expr>,
}

/// `try / catch / finally`
#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    /// Guarded block
    pub body: Block,
    /// Catch clauses in order
    pub catches: Vec<CatchClause>,
    /// `finally` block
    pub finally: Option<Block>,
}

/// One catch clause
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// What the clause matches
    pub kind: CatchKind,
    /// Name bound to the caught information
    pub info: Option<Symbol>,
    /// Handler body
    pub body: Block,
    /// Source location
    pub location: SourceLocation,
}

/// Catch clause matcher
#[derive(Debug, Clone, PartialEq)]
pub enum CatchKind {
    /// Numeric error codes in `lower` or `lower to upper`
    Range(CaseRange),
    /// Exceptions of a declared type
    Typed(TypeRef),
    /// Everything
    All,
}
