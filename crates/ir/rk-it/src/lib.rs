//! Intermediate tree
//!
//! The fully typed, fully lowered output of semantic analysis. Every entity
//! lives in an arena owned by [`Program`] and is addressed by index; every
//! expression carries a [`TyId`].

pub mod body;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod program;
pub mod ty;
pub mod value;
pub mod walk;

pub use body::{BlockData, CastKind, ExitKind, Expr, ExprKind, Handler, HandlerKind, Stmt};
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, Reporter, SemanticError};
pub use entity::{
    BlockId, ClassDef, ClassId, ClassKind, ConstantDef, ConstantId, ConstantState, Entity,
    FunctionDef, FunctionId, FunctionKind, GenericOwner, GenericParamDef, GenericParamId,
    LazyConstant, PropertyDef, PropertyId, ScopeData, ScopeId, ScopeKind, VariableDef,
    VariableId, VariableKind,
};
pub use error::InternalError;
pub use program::{Prelude, Program, WellKnownNames, PRELUDE_UNIT};
pub use ty::{FnParam, PrimitiveKind, TyId, TyKind, TypeTable};
pub use value::Value;
pub use walk::{BodyStats, Visitor};

pub use rk_syntax::{BinaryOp, UnaryOp, Visibility};
