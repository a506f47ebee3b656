//! Unary, binary and assignment operators
//!
//! Each operator family has its own operand table. Illegal operands are
//! reported once and the node still gets a plausible type so that checking
//! continues without cascading errors.

use crate::LoweringContext;
use crate::coerce::widens;
use rk_const_eval::{FoldError, fold_binary, fold_unary};
use rk_it::{
    BinaryOp, CastKind, Expr, ExprKind, InternalError, PrimitiveKind, SemanticError, TyId,
    TyKind, UnaryOp, Value,
};
use rk_span::SourceLocation;
use rk_syntax::OpFamily;
use std::mem;

/// Common kind two numeric operands are brought to
fn numeric_common(left: PrimitiveKind, right: PrimitiveKind) -> Option<PrimitiveKind> {
    if left == right {
        return Some(left);
    }
    if widens(left, right) {
        return Some(right);
    }
    if widens(right, left) {
        return Some(left);
    }
    if left.is_float() || right.is_float() {
        return Some(PrimitiveKind::Double);
    }
    (left != PrimitiveKind::U64 && right != PrimitiveKind::U64).then_some(PrimitiveKind::Int)
}

impl LoweringContext<'_> {
    pub(crate) fn lower_unary(
        &mut self,
        op: UnaryOp,
        operand: &rk_syntax::Expr,
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let operand = self.lower_expr(operand)?;
        if operand.is_error() {
            return Ok(Expr::new(ExprKind::Error, operand.ty, location));
        }
        if op == UnaryOp::Neg {
            if let Some(Value::U64(magnitude)) = operand.literal() {
                if *magnitude == i64::MIN.unsigned_abs() {
                    let ty = self.program.int_ty();
                    return Ok(Expr::new(ExprKind::Literal(Value::Int(i64::MIN)), ty, location));
                }
            }
        }
        let kind = self.program.primitive_of(operand.ty).filter(|_| !self.is_enum(operand.ty));
        let legal = kind.is_some_and(|kind| match op {
            UnaryOp::Neg => kind.is_numeric(),
            UnaryOp::Not => kind == PrimitiveKind::Bool,
            UnaryOp::BitNot => kind.is_integer(),
        });
        if !legal {
            let operand_ty = self.describe(operand.ty);
            self.error(
                location,
                SemanticError::InvalidOperand {
                    op: op.to_string(),
                    operand: operand_ty,
                },
            );
            let ty = if op == UnaryOp::Not { self.program.bool_ty() } else { operand.ty };
            return Ok(Expr::new(ExprKind::Error, ty, location));
        }
        Ok(self.unary_node(op, operand, location))
    }

    /// Unary node over an already checked operand, folded when possible
    pub(crate) fn unary_node(&mut self, op: UnaryOp, operand: Expr, location: SourceLocation) -> Expr {
        let ty = operand.ty;
        if self.folding() {
            if let Some(value) = operand.literal() {
                match fold_unary(op, value) {
                    Ok(Some(value)) => return Expr::new(ExprKind::Literal(value), ty, location),
                    Ok(None) => {}
                    Err(error) => return self.fold_failure(error, ty, location),
                }
            }
        }
        Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            location,
        )
    }

    /// `not condition`, for synthesized loop exits
    pub(crate) fn negate(&mut self, condition: Expr) -> Expr {
        let location = condition.location;
        self.unary_node(UnaryOp::Not, condition, location)
    }

    pub(crate) fn lower_binary(
        &mut self,
        op: BinaryOp,
        left: &rk_syntax::Expr,
        right: &rk_syntax::Expr,
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let left = self.lower_expr(left)?;
        let right = self.lower_expr(right)?;
        Ok(self.binary(op, left, right, location))
    }

    /// Type-check and build a binary node over lowered operands
    pub(crate) fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr, location: SourceLocation) -> Expr {
        if left.is_error() || right.is_error() {
            let ty = match op.family() {
                OpFamily::Arithmetic | OpFamily::Concatenation => {
                    if left.is_error() { right.ty } else { left.ty }
                }
                _ => self.program.bool_ty(),
            };
            return Expr::new(ExprKind::Error, ty, location);
        }
        let checked = match op.family() {
            OpFamily::Arithmetic => self.arithmetic_operands(op, left, right),
            OpFamily::Boolean => self.boolean_operands(left, right),
            OpFamily::Equality => self.equality_operands(left, right, false),
            OpFamily::ReferenceEquality => self.equality_operands(left, right, true),
            OpFamily::Comparison => self.comparison_operands(left, right),
            OpFamily::Concatenation => self.concat_operands(left, right),
        };
        match checked {
            Ok((left, right, ty)) => self.binary_node(op, left, right, ty, location),
            Err((left, right)) => {
                let (left_ty, right_ty) = (self.describe(left.ty), self.describe(right.ty));
                self.error(
                    location,
                    SemanticError::InvalidOperands {
                        op: op.to_string(),
                        left: left_ty,
                        right: right_ty,
                    },
                );
                let ty = match op.family() {
                    OpFamily::Arithmetic | OpFamily::Concatenation => left.ty,
                    _ => self.program.bool_ty(),
                };
                Expr::new(ExprKind::Error, ty, location)
            }
        }
    }

    fn binary_node(&mut self, op: BinaryOp, left: Expr, right: Expr, ty: TyId, location: SourceLocation) -> Expr {
        if self.folding() {
            if let (Some(lhs), Some(rhs)) = (left.literal(), right.literal()) {
                match fold_binary(op, lhs, rhs) {
                    Ok(Some(value)) => return Expr::new(ExprKind::Literal(value), ty, location),
                    Ok(None) => {}
                    Err(error) => return self.fold_failure(error, ty, location),
                }
            }
        }
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            location,
        )
    }

    fn fold_failure(&mut self, error: FoldError, ty: TyId, location: SourceLocation) -> Expr {
        let error = match error {
            FoldError::Overflow => SemanticError::Overflow,
            FoldError::DivisionByZero => SemanticError::DivisionByZero,
        };
        self.error(location, error);
        Expr::new(ExprKind::Error, ty, location)
    }

    fn is_enum(&self, ty: TyId) -> bool {
        self.program
            .class_of(ty)
            .is_some_and(|class| self.program.classes[class].is_enum())
    }

    /// Numeric kind of a non-enum primitive type
    fn numeric_kind(&self, ty: TyId) -> Option<PrimitiveKind> {
        self.program
            .ty(ty)
            .primitive()
            .filter(|kind| kind.is_numeric())
    }

    /// Bring two numeric operands to a common type, adapting literals first
    pub(crate) fn unify_numeric(&mut self, left: Expr, right: Expr) -> Result<(Expr, Expr, PrimitiveKind), (Expr, Expr)> {
        let (Some(left_kind), Some(right_kind)) = (self.numeric_kind(left.ty), self.numeric_kind(right.ty)) else {
            return Err((left, right));
        };
        if left_kind == right_kind {
            return Ok((left, right, left_kind));
        }
        if left.literal().is_some() && right.literal().is_none() {
            match self.try_coerce(left, right.ty) {
                Ok(left) => return Ok((left, right, right_kind)),
                Err(original) => return self.unify_by_rank(original, right, left_kind, right_kind),
            }
        }
        if right.literal().is_some() && left.literal().is_none() {
            match self.try_coerce(right, left.ty) {
                Ok(right) => return Ok((left, right, left_kind)),
                Err(original) => return self.unify_by_rank(left, original, left_kind, right_kind),
            }
        }
        self.unify_by_rank(left, right, left_kind, right_kind)
    }

    fn unify_by_rank(
        &mut self,
        left: Expr,
        right: Expr,
        left_kind: PrimitiveKind,
        right_kind: PrimitiveKind,
    ) -> Result<(Expr, Expr, PrimitiveKind), (Expr, Expr)> {
        let Some(common) = numeric_common(left_kind, right_kind) else {
            return Err((left, right));
        };
        let target = self.program.primitive(common);
        let left = self.widen_to(left, target, common);
        let right = self.widen_to(right, target, common);
        Ok((left, right, common))
    }

    fn widen_to(&mut self, expr: Expr, target: TyId, kind: PrimitiveKind) -> Expr {
        match self.try_coerce(expr, target) {
            Ok(expr) => expr,
            Err(expr) => {
                let location = expr.location;
                let cast = self.explicit_cast(expr, target, location);
                debug_assert_eq!(self.program.ty(cast.ty).primitive(), Some(kind));
                cast
            }
        }
    }

    fn arithmetic_operands(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Result<(Expr, Expr, TyId), (Expr, Expr)> {
        let (left, right, kind) = self.unify_numeric(left, right)?;
        if op.is_integral_only() && !kind.is_integer() {
            return Err((left, right));
        }
        let ty = left.ty;
        Ok((left, right, ty))
    }

    fn boolean_operands(&mut self, left: Expr, right: Expr) -> Result<(Expr, Expr, TyId), (Expr, Expr)> {
        let bool_ty = self.program.bool_ty();
        if left.ty == bool_ty && right.ty == bool_ty {
            return Ok((left, right, bool_ty));
        }
        Err((left, right))
    }

    fn equality_operands(&mut self, left: Expr, right: Expr, by_reference: bool) -> Result<(Expr, Expr, TyId), (Expr, Expr)> {
        let bool_ty = self.program.bool_ty();
        if by_reference {
            if !(self.program.is_reference(left.ty) && self.program.is_reference(right.ty)) {
                return Err((left, right));
            }
        } else if self.numeric_kind(left.ty).is_some() && self.numeric_kind(right.ty).is_some() {
            let (left, right, _) = self.unify_numeric(left, right)?;
            return Ok((left, right, bool_ty));
        }
        if left.ty == right.ty {
            return Ok((left, right, bool_ty));
        }
        let right = match self.try_coerce(right, left.ty) {
            Ok(right) => return Ok((left, right, bool_ty)),
            Err(right) => right,
        };
        match self.try_coerce(left, right.ty) {
            Ok(left) => Ok((left, right, bool_ty)),
            Err(left) => Err((left, right)),
        }
    }

    fn comparison_operands(&mut self, left: Expr, right: Expr) -> Result<(Expr, Expr, TyId), (Expr, Expr)> {
        let bool_ty = self.program.bool_ty();
        if self.numeric_kind(left.ty).is_some() && self.numeric_kind(right.ty).is_some() {
            let (left, right, _) = self.unify_numeric(left, right)?;
            return Ok((left, right, bool_ty));
        }
        let ordered = self.program.primitive_of(left.ty).is_some_and(|kind| {
            matches!(kind, PrimitiveKind::Char | PrimitiveKind::String) || self.is_enum(left.ty)
        });
        if ordered && left.ty == right.ty {
            return Ok((left, right, bool_ty));
        }
        Err((left, right))
    }

    fn concat_operands(&mut self, left: Expr, right: Expr) -> Result<(Expr, Expr, TyId), (Expr, Expr)> {
        let string = self.program.string_ty();
        if let TyKind::Array { element, dimensions: 1 } = *self.program.ty(left.ty) {
            if right.ty == left.ty {
                let ty = left.ty;
                return Ok((left, right, ty));
            }
            return match self.try_coerce(right, element) {
                Ok(right) => {
                    let ty = left.ty;
                    Ok((left, right, ty))
                }
                Err(right) => Err((left, right)),
            };
        }
        let stringable = |this: &Self, ty: TyId| this.program.ty(ty).primitive().is_some();
        if left.ty == string && stringable(self, right.ty) {
            let right = self.to_string_operand(right, string);
            return Ok((left, right, string));
        }
        if right.ty == string && stringable(self, left.ty) {
            let left = self.to_string_operand(left, string);
            return Ok((left, right, string));
        }
        Err((left, right))
    }

    fn to_string_operand(&mut self, expr: Expr, string: TyId) -> Expr {
        if expr.ty == string {
            return expr;
        }
        let location = expr.location;
        let converted = self.explicit_cast(expr, string, location);
        if converted.is_error() {
            return converted;
        }
        match converted.kind {
            ExprKind::Literal(_) | ExprKind::Cast { .. } => converted,
            _ => self.cast_node(CastKind::ToString, converted, string),
        }
    }

    /// `target = value` or `target op= value`
    pub(crate) fn lower_assign(
        &mut self,
        op: Option<BinaryOp>,
        target: &rk_syntax::Expr,
        value: &rk_syntax::Expr,
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let target = self.lower_place(target, op.is_some())?;
        let value = self.lower_expr(value)?;
        let ty = target.ty;
        if target.is_error() {
            return Ok(Expr::new(ExprKind::Error, ty, location));
        }
        let Some(op) = op else {
            let value = self.coerce(value, ty);
            return Ok(Expr::new(
                ExprKind::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                ty,
                location,
            ));
        };
        let folding = mem::replace(&mut self.options.fold_constants, false);
        let depth = mem::replace(&mut self.const_depth, 0);
        let combined = self.binary(op, target.clone(), value, location);
        self.options.fold_constants = folding;
        self.const_depth = depth;
        let value = match combined.kind {
            ExprKind::Binary { right, .. } if self.coercible(&typed_stand_in(combined.ty, location), ty) => *right,
            ExprKind::Binary { right, .. } => {
                let expected = self.describe(ty);
                let found = self.describe(combined.ty);
                self.error(location, SemanticError::TypeMismatch { expected, found });
                *right
            }
            _ => return Ok(Expr::new(ExprKind::Error, ty, location)),
        };
        Ok(Expr::new(
            ExprKind::CompoundAssign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            ty,
            location,
        ))
    }
}

/// Non-literal stand-in of type `ty`, for convertibility checks
fn typed_stand_in(ty: TyId, location: SourceLocation) -> Expr {
    Expr::new(ExprKind::Error, ty, location)
}
