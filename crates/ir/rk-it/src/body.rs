//! Lowered function bodies: blocks, statements and typed expressions
//!
//! Structured control flow is gone at this level. A loop is a block with
//! `is_loop` set that restarts when control reaches its end; leaving any block
//! early is an [`Stmt::Exit`] naming the block.

use crate::entity::{BlockId, ClassId, FunctionId, PropertyId, ScopeId, VariableId};
use crate::ty::TyId;
use crate::value::Value;
use indexmap::IndexMap;
use rk_intern::Symbol;
use rk_span::SourceLocation;
use rk_syntax::{BinaryOp, UnaryOp};

/// A lowered block
#[derive(Debug, Clone)]
pub struct BlockData {
    /// Scope for hoisted declarations and local constants
    pub scope: ScopeId,
    /// Enclosing block, `None` for a function's root block
    pub parent: Option<BlockId>,
    /// Function the block belongs to; `None` for initializer contexts
    pub function: Option<FunctionId>,
    /// Statements in execution order
    pub statements: Vec<Stmt>,
    /// Real locals, unique by name within the block
    pub locals: IndexMap<Symbol, VariableId>,
    /// Aliases without storage, such as foreach elements
    pub virtuals: IndexMap<Symbol, Expr>,
    /// Control restarts the block on reaching its end
    pub is_loop: bool,
    /// Label used by `break`/`continue` targeting
    pub name: Option<Symbol>,
    /// Control may leave this block early
    pub transferable: bool,
    /// For loop blocks: the block `continue` exits
    pub continue_target: Option<BlockId>,
    /// For synthetic inner loops: the block `break` exits instead of this one
    pub break_target: Option<BlockId>,
    /// Where the block starts
    pub location: SourceLocation,
}

/// Which jump an exit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// `break`, or a loop test failing
    Break,
    /// `continue`
    Continue,
}

/// Lowered statement
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Expression evaluated for effect
    Expr(Expr),
    /// Nested block
    Block(BlockId),
    /// Two-way conditional
    Branch {
        /// `bool` condition
        condition: Expr,
        /// Runs when the condition holds
        then_block: BlockId,
        /// Runs otherwise
        else_block: Option<BlockId>,
    },
    /// Leave `block`, continuing after it
    Exit {
        /// Block left
        block: BlockId,
        /// Jump the exit was lowered from
        kind: ExitKind,
    },
    /// Leave the function
    Return(Option<Expr>),
    /// Raise an exception object
    Throw(Expr),
    /// Raise a numeric error code
    ThrowNumeric(Expr),
    /// Guarded block with handlers
    Try {
        /// Guarded statements
        body: BlockId,
        /// Handlers tried in order
        handlers: Vec<Handler>,
        /// Runs however `body` is left; never transferable
        finally: Option<BlockId>,
    },
}

/// Exception handler of a lowered `try`
///
/// A named catch variable is an ordinary local of `body`, assigned from
/// [`ExprKind::Caught`] by the first statement of the block.
#[derive(Debug, Clone)]
pub struct Handler {
    /// What the handler catches
    pub matcher: HandlerKind,
    /// Handler statements
    pub body: BlockId,
}

/// What a handler matches
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerKind {
    /// Numeric codes in `lower..=upper`
    Range {
        /// Lowest code caught
        lower: Value,
        /// Highest code caught
        upper: Value,
    },
    /// Exceptions assignable to the type
    Typed(TyId),
    /// Anything
    All,
}

/// Typed expression
#[derive(Debug, Clone)]
pub struct Expr {
    /// Node
    pub kind: ExprKind,
    /// Resolved type; the error type only after a reported error
    pub ty: TyId,
    /// Source position
    pub location: SourceLocation,
}

/// Conversion performed by a cast node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// Between numeric and char primitives
    Numeric,
    /// Enum to its underlying primitive
    EnumToUnderlying,
    /// Primitive to an enum
    UnderlyingToEnum,
    /// Primitive to `string`
    ToString,
    /// `string` to a primitive
    FromString,
    /// Subclass to superclass or interface
    Upcast,
    /// Checked at runtime
    Downcast,
    /// `null` to a reference type
    Null,
}

/// Expression kinds
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Constant value
    Literal(Value),
    /// Local of the current function
    Local(VariableId),
    /// Parameter of the current function
    Param(VariableId),
    /// Variable of an enclosing function, read through the surrogate chain
    Captured {
        /// Captured local or parameter
        variable: VariableId,
        /// Surrogate `outer` links to follow from the current receiver
        hops: u32,
    },
    /// Unit-level variable
    Global(VariableId),
    /// Instance field
    Field {
        /// Receiver
        target: Box<Expr>,
        /// Field variable
        field: VariableId,
    },
    /// Property read or write through its accessors
    Property {
        /// Receiver, `None` for static properties
        target: Option<Box<Expr>>,
        /// Accessed property
        property: PropertyId,
    },
    /// Element of an array
    ArrayElement {
        /// Indexed array
        array: Box<Expr>,
        /// One index per dimension
        indices: Vec<Expr>,
    },
    /// Length of a dimension, or total length when `dimension` is `None`
    ArrayLength {
        /// Measured array
        array: Box<Expr>,
        /// Zero-based dimension
        dimension: Option<u32>,
    },
    /// Receiver of the current method
    This,
    /// Instance of a function's surrogate class
    SurrogateInstance(ClassId),
    /// Direct call of a known function
    Call {
        /// Callee
        function: FunctionId,
        /// Receiver of a method call
        target: Option<Box<Expr>>,
        /// Arguments after coercion
        args: Vec<Expr>,
    },
    /// Call through a function-typed value
    CallValue {
        /// Function-typed value
        callee: Box<Expr>,
        /// Arguments after coercion
        args: Vec<Expr>,
    },
    /// Free function used as a value
    FunctionRef(FunctionId),
    /// Method bound to a receiver, used as a value
    BoundMethod {
        /// Receiver
        target: Box<Expr>,
        /// Bound method
        function: FunctionId,
    },
    /// Object creation; the type is the created class
    New {
        /// Constructor run, if the class declares one
        constructor: Option<FunctionId>,
        /// Constructor arguments
        args: Vec<Expr>,
    },
    /// Array creation; the type is the array type
    NewArray {
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
    /// Plain assignment
    Assign {
        /// Storage written
        target: Box<Expr>,
        /// Value, coerced to the target type
        value: Box<Expr>,
    },
    /// `target op= value`
    CompoundAssign {
        /// Arithmetic or concatenation operator
        op: BinaryOp,
        /// Storage read and written
        target: Box<Expr>,
        /// Right operand
        value: Box<Expr>,
    },
    /// Conversion to the node's type
    Cast {
        /// Conversion performed
        kind: CastKind,
        /// Converted value
        expr: Box<Expr>,
    },
    /// `expr is ty`
    TypeCheck {
        /// Tested value
        expr: Box<Expr>,
        /// Tested type
        ty: TyId,
    },
    /// `condition ? then : otherwise`
    Conditional {
        /// `bool` condition
        condition: Box<Expr>,
        /// Value when the condition holds
        then: Box<Expr>,
        /// Value otherwise
        otherwise: Box<Expr>,
    },
    /// Error code or exception being handled by the enclosing handler
    Caught,
    /// Placeholder after a reported error
    Error,
}

impl Expr {
    /// Node of `kind` typed `ty`
    pub fn new(kind: ExprKind, ty: TyId, location: SourceLocation) -> Self {
        Self { kind, ty, location }
    }

    /// Value of a literal node
    pub fn literal(&self) -> Option<&Value> {
        match &self.kind {
            ExprKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the node stands in for a reported error
    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error)
    }

    /// Assignable storage
    pub fn is_storage(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Local(_)
                | ExprKind::Param(_)
                | ExprKind::Captured { .. }
                | ExprKind::Global(_)
                | ExprKind::Field { .. }
                | ExprKind::Property { .. }
                | ExprKind::ArrayElement { .. }
        )
    }
}
