//! Expression lowering

use crate::LoweringContext;
use crate::lookup::Resolved;
use rk_it::{Expr, ExprKind, InternalError, SemanticError, TyKind, Value};
use rk_span::SourceLocation;
use rk_syntax::{ExprKind as Syntax, Literal};

impl LoweringContext<'_> {
    /// Lower an expression read for its value
    ///
    /// # Errors
    ///
    /// Fails only on internal invariant violations; semantic problems are
    /// reported and replaced by error expressions.
    pub fn lower_expr(&mut self, expr: &rk_syntax::Expr) -> Result<Expr, InternalError> {
        let lowered = self.lower_expr_unchecked(expr)?;
        Ok(self.check_readable(lowered))
    }

    fn lower_expr_unchecked(&mut self, expr: &rk_syntax::Expr) -> Result<Expr, InternalError> {
        let location = expr.location;
        match &expr.kind {
            Syntax::Literal(literal) => Ok(self.lower_literal(literal, location)),
            Syntax::Name(_) | Syntax::Scoped { .. } | Syntax::Member { .. } => {
                let resolved = self.resolve_path(expr)?;
                self.resolved_value(resolved, location)
            }
            Syntax::This => match self.this_of(None, location)? {
                Some(this) => Ok(this),
                None => {
                    self.error(location, SemanticError::ThisOutsideMethod);
                    Ok(self.error_expr(location))
                }
            },
            Syntax::Index { target, indices } => self.lower_index(target, indices, location),
            Syntax::Call {
                callee,
                generic_args,
                args,
            } => self.lower_call(callee, generic_args, args, location),
            Syntax::New { ty, args } => self.lower_new(ty, args, location),
            Syntax::NewArray { element, lengths } => self.lower_new_array(element, lengths, location),
            Syntax::Unary { op, operand } => self.lower_unary(*op, operand, location),
            Syntax::Binary { op, left, right } => self.lower_binary(*op, left, right, location),
            Syntax::Assign { op, target, value } => self.lower_assign(*op, target, value, location),
            Syntax::Cast { ty, expr } => {
                let scope = self.current_scope()?;
                let to = self.resolve_type(scope, ty);
                let operand = self.lower_expr(expr)?;
                Ok(self.explicit_cast(operand, to, location))
            }
            Syntax::Is { expr, ty } => {
                let scope = self.current_scope()?;
                let tested = self.resolve_type(scope, ty);
                let operand = self.lower_expr(expr)?;
                let bool_ty = self.program.bool_ty();
                if !operand.is_error()
                    && !self.program.is_error(tested)
                    && !(self.program.is_reference(operand.ty) && self.program.is_reference(tested))
                {
                    let (from, to) = (self.describe(operand.ty), self.describe(tested));
                    self.error(location, SemanticError::InvalidCast { from, to });
                    return Ok(Expr::new(ExprKind::Error, bool_ty, location));
                }
                Ok(Expr::new(
                    ExprKind::TypeCheck {
                        expr: Box::new(operand),
                        ty: tested,
                    },
                    bool_ty,
                    location,
                ))
            }
            Syntax::Conditional {
                condition,
                then,
                otherwise,
            } => self.lower_conditional(condition, then, otherwise, location),
            Syntax::AnonymousFunction(function) => self.lower_anonymous_function(function, location),
        }
    }

    fn lower_literal(&mut self, literal: &Literal, location: SourceLocation) -> Expr {
        let (value, ty) = match literal {
            Literal::Integer(value) => match i64::try_from(*value) {
                Ok(value) => (Value::Int(value), self.program.int_ty()),
                Err(_) => (Value::U64(*value), self.program.primitive(rk_it::PrimitiveKind::U64)),
            },
            Literal::Float(value) => (Value::Double(*value), self.program.primitive(rk_it::PrimitiveKind::Double)),
            Literal::String(value) => (Value::String(value.clone()), self.program.string_ty()),
            Literal::Char(value) => (Value::Char(*value), self.program.primitive(rk_it::PrimitiveKind::Char)),
            Literal::Bool(value) => (Value::Bool(*value), self.program.bool_ty()),
            Literal::Null => (Value::Null, self.program.null_ty()),
        };
        Expr::new(ExprKind::Literal(value), ty, location)
    }

    fn lower_index(
        &mut self,
        target: &rk_syntax::Expr,
        indices: &[rk_syntax::Expr],
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let array = self.lower_expr(target)?;
        let int = self.program.int_ty();
        let mut lowered = Vec::with_capacity(indices.len());
        for index in indices {
            let index = self.lower_expr(index)?;
            lowered.push(self.coerce(index, int));
        }
        if array.is_error() {
            return Ok(Expr::new(ExprKind::Error, array.ty, location));
        }
        let TyKind::Array { element, dimensions } = *self.program.ty(array.ty) else {
            let ty = self.describe(array.ty);
            self.error(location, SemanticError::NotAnArray { ty });
            return Ok(self.error_expr(location));
        };
        if lowered.len() != dimensions as usize {
            self.error(
                location,
                SemanticError::IndexCount {
                    expected: dimensions,
                    found: lowered.len(),
                },
            );
            return Ok(Expr::new(ExprKind::Error, element, location));
        }
        Ok(Expr::new(
            ExprKind::ArrayElement {
                array: Box::new(array),
                indices: lowered,
            },
            element,
            location,
        ))
    }

    fn lower_new_array(
        &mut self,
        element: &rk_syntax::TypeRef,
        lengths: &[rk_syntax::Expr],
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let dimensions = u32::try_from(lengths.len())
            .ok()
            .filter(|&dimensions| dimensions > 0)
            .ok_or_else(|| InternalError::malformed(location, "array construction without lengths"))?;
        let scope = self.current_scope()?;
        let element = self.resolve_type(scope, element);
        let int = self.program.int_ty();
        let mut lowered = Vec::with_capacity(lengths.len());
        for length in lengths {
            let length = self.lower_expr(length)?;
            lowered.push(self.coerce(length, int));
        }
        if self.program.is_error(element) {
            return Ok(Expr::new(ExprKind::Error, element, location));
        }
        let ty = self.program.array_ty(element, dimensions);
        Ok(Expr::new(ExprKind::NewArray { lengths: lowered }, ty, location))
    }

    fn lower_conditional(
        &mut self,
        condition: &rk_syntax::Expr,
        then: &rk_syntax::Expr,
        otherwise: &rk_syntax::Expr,
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let condition = self.lower_condition(condition)?;
        let then = self.lower_expr(then)?;
        let otherwise = self.lower_expr(otherwise)?;
        let (then, otherwise) = self.unify_branches(then, otherwise, location);
        let ty = then.ty;
        if self.folding() {
            if let Some(&Value::Bool(taken)) = condition.literal() {
                return Ok(if taken { then } else { otherwise });
            }
        }
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            ty,
            location,
        ))
    }

    /// Bring both arms of a conditional to one type
    fn unify_branches(&mut self, then: Expr, otherwise: Expr, location: SourceLocation) -> (Expr, Expr) {
        if then.ty == otherwise.ty || then.is_error() || otherwise.is_error() {
            let ty = if then.is_error() { otherwise.ty } else { then.ty };
            return (Expr { ty, ..then }, Expr { ty, ..otherwise });
        }
        let both_numeric = [then.ty, otherwise.ty]
            .iter()
            .all(|&ty| self.program.ty(ty).primitive().is_some_and(rk_it::PrimitiveKind::is_numeric));
        if both_numeric {
            return match self.unify_numeric(then, otherwise) {
                Ok((then, otherwise, _)) => (then, otherwise),
                Err((then, otherwise)) => self.mismatched_branches(then, otherwise, location),
            };
        }
        let target = then.ty;
        let otherwise = match self.try_coerce(otherwise, target) {
            Ok(otherwise) => return (then, otherwise),
            Err(otherwise) => otherwise,
        };
        let target = otherwise.ty;
        match self.try_coerce(then, target) {
            Ok(then) => (then, otherwise),
            Err(then) => self.mismatched_branches(then, otherwise, location),
        }
    }

    fn mismatched_branches(&mut self, then: Expr, otherwise: Expr, location: SourceLocation) -> (Expr, Expr) {
        let (expected, found) = (self.describe(then.ty), self.describe(otherwise.ty));
        self.error(location, SemanticError::TypeMismatch { expected, found });
        let ty = then.ty;
        let placeholder = Expr::new(ExprKind::Error, ty, otherwise.location);
        (then, placeholder)
    }

    /// Lower a condition and convert it to `bool`
    pub(crate) fn lower_condition(&mut self, expr: &rk_syntax::Expr) -> Result<Expr, InternalError> {
        let condition = self.lower_expr(expr)?;
        let bool_ty = self.program.bool_ty();
        Ok(self.coerce(condition, bool_ty))
    }

    /// Lower the target of an assignment or by-ref argument
    ///
    /// Compound assignment reads the target as well, so its getter is
    /// required too.
    pub(crate) fn lower_place(&mut self, expr: &rk_syntax::Expr, compound: bool) -> Result<Expr, InternalError> {
        let location = expr.location;
        let place = match &expr.kind {
            Syntax::Name(_) | Syntax::Scoped { .. } | Syntax::Member { .. } => match self.resolve_path(expr)? {
                Resolved::Value(value) => value,
                Resolved::Constant(constant) => {
                    let name = self.text(self.program.constants[constant].name);
                    self.error(location, SemanticError::AssignToConstant { name });
                    return Ok(self.error_expr(location));
                }
                Resolved::Function { .. } | Resolved::Class(_) | Resolved::Generic(_) => {
                    self.error(location, SemanticError::NotAssignable);
                    return Ok(self.error_expr(location));
                }
            },
            Syntax::Index { .. } => self.lower_expr_unchecked(expr)?,
            _ => {
                let value = self.lower_expr(expr)?;
                if !value.is_error() {
                    self.error(location, SemanticError::NotAssignable);
                }
                return Ok(Expr::new(ExprKind::Error, value.ty, location));
            }
        };
        if place.is_error() {
            return Ok(place);
        }
        if !place.is_storage() {
            self.error(location, SemanticError::NotAssignable);
            return Ok(Expr::new(ExprKind::Error, place.ty, location));
        }
        if let ExprKind::Property { property, .. } = place.kind {
            if self.program.properties[property].setter.is_none() {
                let name = self.text(self.program.properties[property].name);
                self.error(location, SemanticError::NoSetter { name });
                return Ok(Expr::new(ExprKind::Error, place.ty, location));
            }
        }
        Ok(if compound { self.check_readable(place) } else { place })
    }
}
