//! Lazy constants and deferred variable initializers

use crate::LoweringContext;
use crate::context::PendingInitializer;
use rk_const_eval::{FoldError, fold_binary};
use rk_it::{
    BinaryOp, ConstantId, ConstantState, Expr, ExprKind, InternalError, LazyConstant, ScopeId,
    SemanticError, TyKind, Value, VariableId,
};
use rk_span::SourceLocation;
use std::mem;
use tracing::trace;

impl LoweringContext<'_> {
    /// Value of `constant`, resolving it on first use
    ///
    /// A constant reached again while it is being resolved is circular; the
    /// cycle is reported once and every constant on it fails.
    ///
    /// # Errors
    ///
    /// Propagates internal errors from lowering the initializer.
    pub fn resolve_constant(&mut self, constant: ConstantId) -> Result<Option<Value>, InternalError> {
        let state = mem::replace(&mut self.program.constants[constant].state, ConstantState::Resolving);
        let lazy = match state {
            ConstantState::Resolved(value) => {
                self.program.constants[constant].state = ConstantState::Resolved(value.clone());
                return Ok(Some(value));
            }
            ConstantState::Failed => {
                self.program.constants[constant].state = ConstantState::Failed;
                return Ok(None);
            }
            ConstantState::Resolving => {
                let def = &self.program.constants[constant];
                let (name, location) = (self.text(def.name), def.location);
                self.error(location, SemanticError::CircularConstant { name });
                self.program.constants[constant].state = ConstantState::Failed;
                return Ok(None);
            }
            ConstantState::Unresolved(lazy) => lazy,
        };
        let resolved = self.evaluate_constant(constant, lazy)?;
        let def = &mut self.program.constants[constant];
        if matches!(def.state, ConstantState::Resolving) {
            def.state = match &resolved {
                Some(value) => ConstantState::Resolved(value.clone()),
                None => ConstantState::Failed,
            };
        } else {
            return Ok(None);
        }
        trace!(constant = %self.text(self.program.constants[constant].name), ok = resolved.is_some(), "constant resolved");
        Ok(resolved)
    }

    fn evaluate_constant(&mut self, constant: ConstantId, lazy: LazyConstant) -> Result<Option<Value>, InternalError> {
        let def = &self.program.constants[constant];
        let (scope, location, declared, owner) = (def.scope, def.location, def.declared_ty, def.owner);
        let underlying = owner
            .and_then(|owner| self.program.classes[owner].enum_of)
            .filter(|_| declared.is_some_and(|ty| matches!(self.program.ty(ty), TyKind::Class(class) if Some(*class) == owner)));
        match (lazy.expr, underlying) {
            (Some(expr), _) => {
                let value = self.lower_constant_expr(&expr, scope)?;
                if value.is_error() {
                    return Ok(None);
                }
                let value = match (underlying, declared) {
                    (Some(_), Some(enum_ty)) if value.ty == enum_ty => value,
                    (Some(kind), _) => {
                        let target = self.program.primitive(kind);
                        self.coerce(value, target)
                    }
                    (None, Some(declared)) => self.coerce(value, declared),
                    (None, None) => {
                        self.program.constants[constant].ty = value.ty;
                        value
                    }
                };
                self.literal_of(constant, &value, location)
            }
            (None, Some(kind)) => match lazy.previous {
                Some(previous) => {
                    let Some(previous) = self.resolve_constant(previous)? else {
                        return Ok(None);
                    };
                    let Some(one) = Value::from_i128(kind, 1) else {
                        return Ok(None);
                    };
                    match fold_binary(BinaryOp::Add, &previous, &one) {
                        Ok(value) => Ok(value),
                        Err(FoldError::Overflow) => {
                            self.error(location, SemanticError::Overflow);
                            Ok(None)
                        }
                        Err(FoldError::DivisionByZero) => {
                            self.error(location, SemanticError::DivisionByZero);
                            Ok(None)
                        }
                    }
                }
                None => Ok(Value::zero(kind)),
            },
            (None, None) => {
                let name = self.text(self.program.constants[constant].name);
                self.error(location, SemanticError::NonConstantValue { name });
                Ok(None)
            }
        }
    }

    /// Lower an initializer in a constant context rooted at `scope`
    pub(crate) fn lower_constant_expr(&mut self, expr: &rk_syntax::Expr, scope: ScopeId) -> Result<Expr, InternalError> {
        self.with_detached_frame(scope, expr.location, |ctx| ctx.lower_folded(expr))
    }

    /// Lower `expr` with folding forced on
    pub(crate) fn lower_folded(&mut self, expr: &rk_syntax::Expr) -> Result<Expr, InternalError> {
        self.const_depth += 1;
        let result = self.lower_expr(expr);
        self.const_depth -= 1;
        result
    }

    fn literal_of(&mut self, constant: ConstantId, value: &Expr, location: SourceLocation) -> Result<Option<Value>, InternalError> {
        match &value.kind {
            ExprKind::Literal(literal) => Ok(Some(literal.clone())),
            ExprKind::Error => Ok(None),
            _ => {
                let name = self.text(self.program.constants[constant].name);
                self.error(location, SemanticError::NonConstantValue { name });
                Ok(None)
            }
        }
    }

    /// Reference to a constant: its literal value, or an error placeholder
    pub(crate) fn constant_expr(&mut self, constant: ConstantId, location: SourceLocation) -> Result<Expr, InternalError> {
        let value = self.resolve_constant(constant)?;
        let ty = self.program.constants[constant].ty;
        Ok(match value {
            Some(value) => Expr::new(ExprKind::Literal(value), ty, location),
            None => Expr::new(ExprKind::Error, ty, location),
        })
    }

    /// Queue the initializer of a global or field
    ///
    /// `declared` tells whether the variable has an explicit type; otherwise
    /// its type is taken from the initializer once lowered.
    pub fn register_initializer(&mut self, variable: VariableId, scope: ScopeId, expr: &rk_syntax::Expr, declared: bool) {
        self.initializers.insert(
            variable,
            PendingInitializer {
                expr: expr.clone(),
                scope,
                declared,
                active: false,
            },
        );
    }

    /// Lower a queued initializer now, if it has not been lowered yet
    ///
    /// # Errors
    ///
    /// Propagates internal errors from lowering the initializer.
    pub fn compile_initializer(&mut self, variable: VariableId) -> Result<(), InternalError> {
        self.ensure_variable_ready(variable)
    }

    /// Make sure the type (and initializer) of `variable` are known
    pub(crate) fn ensure_variable_ready(&mut self, variable: VariableId) -> Result<(), InternalError> {
        let Some(pending) = self.initializers.get_mut(&variable) else {
            return Ok(());
        };
        if pending.active {
            if !pending.declared {
                let def = &self.program.variables[variable];
                let (name, location) = (self.text(def.name), def.location);
                self.error(location, SemanticError::UntypedVariable { name });
                self.program.variables[variable].ty = self.program.error_ty();
            }
            return Ok(());
        }
        pending.active = true;
        let PendingInitializer { expr, scope, declared, .. } = pending.clone();
        let lowered = self.with_detached_frame(scope, expr.location, |ctx| ctx.lower_expr(&expr));
        self.initializers.remove(&variable);
        let lowered = lowered?;
        let lowered = if declared {
            let ty = self.program.variables[variable].ty;
            self.coerce(lowered, ty)
        } else if matches!(self.program.ty(lowered.ty), TyKind::Null | TyKind::Void) {
            let def = &self.program.variables[variable];
            let (name, location) = (self.text(def.name), def.location);
            self.error(location, SemanticError::UntypedVariable { name });
            let ty = self.program.error_ty();
            self.program.variables[variable].ty = ty;
            Expr { ty, ..lowered }
        } else {
            self.program.variables[variable].ty = lowered.ty;
            lowered
        };
        self.program.variables[variable].initializer = Some(lowered);
        Ok(())
    }
}
