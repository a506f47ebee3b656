//! Implicit conversions and explicit casts

use crate::LoweringContext;
use rk_const_eval::{FoldError, fold_cast};
use rk_it::{CastKind, Expr, ExprKind, PrimitiveKind, SemanticError, TyId, TyKind, Value};
use rk_span::SourceLocation;
use rk_subst::instantiate_ancestor;

/// Lossless primitive conversions applied without a cast
pub(crate) fn widens(from: PrimitiveKind, to: PrimitiveKind) -> bool {
    if from == to {
        return true;
    }
    match (from.is_integer(), to.is_integer()) {
        (true, true) => {
            if to == PrimitiveKind::Int {
                return from != PrimitiveKind::U64;
            }
            if from == PrimitiveKind::Int {
                return to == PrimitiveKind::I64;
            }
            !(from.is_signed() && !to.is_signed()) && to.bits() > from.bits()
        }
        (true, false) => to.is_float(),
        (false, false) => from == PrimitiveKind::Float && to == PrimitiveKind::Double,
        (false, true) => false,
    }
}

/// Re-type a literal to `to` when the value is representable there
pub(crate) fn adapt_literal(value: &Value, to: PrimitiveKind) -> Option<Value> {
    if let Some(integer) = value.as_i128() {
        if to.is_integer() {
            return Value::from_i128(to, integer);
        }
        return match to {
            PrimitiveKind::Float => Some(Value::Float(integer as f32)),
            PrimitiveKind::Double => Some(Value::Double(integer as f64)),
            _ => None,
        };
    }
    match (value, to) {
        (Value::Double(double), PrimitiveKind::Float) => Some(Value::Float(*double as f32)),
        (Value::Float(float), PrimitiveKind::Double) => Some(Value::Double(f64::from(*float))),
        _ => None,
    }
}

impl LoweringContext<'_> {
    /// Convert `expr` to `to` implicitly, reporting a mismatch when impossible
    ///
    /// Applying this to an expression that already has type `to` returns it
    /// unchanged.
    pub(crate) fn coerce(&mut self, expr: Expr, to: TyId) -> Expr {
        match self.try_coerce(expr, to) {
            Ok(expr) => expr,
            Err(expr) => {
                let expected = self.describe(to);
                let found = self.describe(expr.ty);
                self.error(expr.location, SemanticError::TypeMismatch { expected, found });
                let location = expr.location;
                Expr::new(ExprKind::Error, to, location)
            }
        }
    }

    /// Implicit conversion without reporting; the input comes back on failure
    pub(crate) fn try_coerce(&mut self, expr: Expr, to: TyId) -> Result<Expr, Expr> {
        if expr.ty == to || self.program.is_error(to) {
            return Ok(expr);
        }
        if self.program.is_error(expr.ty) {
            return Ok(Expr { ty: to, ..expr });
        }
        match (self.program.ty(expr.ty).clone(), self.program.ty(to).clone()) {
            (TyKind::Null, _) if self.program.is_reference(to) => {
                if matches!(expr.kind, ExprKind::Literal(Value::Null)) {
                    return Ok(Expr { ty: to, ..expr });
                }
                Ok(self.cast_node(CastKind::Null, expr, to))
            }
            (TyKind::Primitive(from), TyKind::Primitive(target)) => {
                if let Some(value) = expr.literal() {
                    if let Some(adapted) = adapt_literal(value, target) {
                        return Ok(Expr::new(ExprKind::Literal(adapted), to, expr.location));
                    }
                }
                if widens(from, target) {
                    return Ok(self.numeric_cast(expr, to, target));
                }
                Err(expr)
            }
            (TyKind::Class(_) | TyKind::Instance { .. }, TyKind::Class(target) | TyKind::Instance { class: target, .. }) => {
                if self.program.classes[target].is_enum() {
                    return Err(expr);
                }
                match instantiate_ancestor(self.program, expr.ty, target) {
                    Some(ancestor) if ancestor == to => Ok(self.cast_node(CastKind::Upcast, expr, to)),
                    _ => Err(expr),
                }
            }
            (TyKind::Param(_), TyKind::Class(target)) if target == self.program.prelude.object => {
                Ok(self.cast_node(CastKind::Upcast, expr, to))
            }
            _ => Err(expr),
        }
    }

    /// Whether `from` converts to `to` implicitly
    pub(crate) fn coercible(&mut self, expr: &Expr, to: TyId) -> bool {
        self.try_coerce(expr.clone(), to).is_ok()
    }

    /// Explicit `cast<to>(expr)`
    pub(crate) fn explicit_cast(&mut self, expr: Expr, to: TyId, location: SourceLocation) -> Expr {
        if expr.ty == to || self.program.is_error(to) {
            return expr;
        }
        if self.program.is_error(expr.ty) {
            return Expr { ty: to, ..expr };
        }
        let expr = match self.try_coerce(expr, to) {
            Ok(converted) => return converted,
            Err(expr) => expr,
        };
        let from_enum = self.enum_underlying(expr.ty);
        let to_enum = self.enum_underlying(to);
        let from_kind = self.program.primitive_of(expr.ty);
        let to_kind = self.program.primitive_of(to);
        if let (Some(from_kind), Some(to_kind)) = (from_kind, to_kind) {
            if let Some(converted) = self.primitive_cast(expr.clone(), to, from_kind, to_kind, from_enum.is_some(), to_enum.is_some()) {
                return converted;
            }
        } else if self.reference_cast_allowed(expr.ty, to) {
            return self.cast_node(CastKind::Downcast, expr, to);
        }
        let from = self.describe(expr.ty);
        let target = self.describe(to);
        self.error(location, SemanticError::InvalidCast { from, to: target });
        Expr::new(ExprKind::Error, to, location)
    }

    fn enum_underlying(&self, ty: TyId) -> Option<PrimitiveKind> {
        match self.program.ty(ty) {
            TyKind::Class(class) => self.program.classes[*class].enum_of,
            _ => None,
        }
    }

    /// Casts between primitives and enums; `None` when not allowed
    fn primitive_cast(
        &mut self,
        expr: Expr,
        to: TyId,
        from_kind: PrimitiveKind,
        to_kind: PrimitiveKind,
        from_enum: bool,
        to_enum: bool,
    ) -> Option<Expr> {
        let kind = match (from_enum, to_enum) {
            (true, true) => {
                let underlying = self.program.primitive(from_kind);
                let inner = self.cast_node(CastKind::EnumToUnderlying, expr, underlying);
                let inner = self.convert_primitive(inner, from_kind, to_kind)?;
                return Some(self.retype_or_cast(inner, CastKind::UnderlyingToEnum, to));
            }
            (true, false) => {
                let underlying = self.program.primitive(from_kind);
                let inner = self.retype_or_cast(expr, CastKind::EnumToUnderlying, underlying);
                if to_kind == from_kind {
                    return Some(inner);
                }
                return self.convert_primitive(inner, from_kind, to_kind).map(|inner| Expr { ty: to, ..inner });
            }
            (false, true) => {
                if !(from_kind.is_integer() || from_kind == to_kind) {
                    return None;
                }
                let underlying = self.program.primitive(to_kind);
                let inner = self.convert_primitive(expr, from_kind, to_kind)?;
                let inner = Expr { ty: underlying, ..inner };
                return Some(self.retype_or_cast(inner, CastKind::UnderlyingToEnum, to));
            }
            (false, false) => match (from_kind, to_kind) {
                (_, PrimitiveKind::String) => CastKind::ToString,
                (PrimitiveKind::String, _) => CastKind::FromString,
                (PrimitiveKind::Bool | PrimitiveKind::Char, _)
                | (_, PrimitiveKind::Bool | PrimitiveKind::Char) => CastKind::Numeric,
                _ if from_kind.is_numeric() && to_kind.is_numeric() => CastKind::Numeric,
                _ => return None,
            },
        };
        Some(self.folded_cast(kind, expr, to, to_kind))
    }

    /// Primitive conversion between underlying kinds, folded for literals
    fn convert_primitive(&mut self, expr: Expr, from: PrimitiveKind, to: PrimitiveKind) -> Option<Expr> {
        if from == to {
            return Some(expr);
        }
        let allowed = (from.is_numeric() || from == PrimitiveKind::Char)
            && (to.is_numeric() || to == PrimitiveKind::Char);
        if !allowed {
            return None;
        }
        let target = self.program.primitive(to);
        Some(self.folded_cast(CastKind::Numeric, expr, target, to))
    }

    /// Literals keep their value and take the new type; others get a cast node
    fn retype_or_cast(&mut self, expr: Expr, kind: CastKind, to: TyId) -> Expr {
        if expr.literal().is_some() {
            return Expr { ty: to, ..expr };
        }
        self.cast_node(kind, expr, to)
    }

    /// Cast node, folded when the operand is a literal and folding is on
    fn folded_cast(&mut self, kind: CastKind, expr: Expr, to: TyId, to_kind: PrimitiveKind) -> Expr {
        if self.folding() {
            if let Some(value) = expr.literal() {
                match fold_cast(value, to_kind) {
                    Ok(Some(value)) => return Expr::new(ExprKind::Literal(value), to, expr.location),
                    Ok(None) => {}
                    Err(FoldError::Overflow) => {
                        self.error(expr.location, SemanticError::Overflow);
                        return Expr::new(ExprKind::Error, to, expr.location);
                    }
                    Err(FoldError::DivisionByZero) => {
                        self.error(expr.location, SemanticError::DivisionByZero);
                        return Expr::new(ExprKind::Error, to, expr.location);
                    }
                }
            }
        }
        self.cast_node(kind, expr, to)
    }

    fn numeric_cast(&mut self, expr: Expr, to: TyId, to_kind: PrimitiveKind) -> Expr {
        self.folded_cast(CastKind::Numeric, expr, to, to_kind)
    }

    /// Downcasts and interface casts between reference types
    fn reference_cast_allowed(&mut self, from: TyId, to: TyId) -> bool {
        match (self.program.ty(from).clone(), self.program.ty(to).clone()) {
            (TyKind::Param(_), _) | (_, TyKind::Param(_)) => {
                self.program.is_reference(from) && self.program.is_reference(to)
            }
            (
                TyKind::Class(_) | TyKind::Instance { .. },
                TyKind::Class(target) | TyKind::Instance { class: target, .. },
            ) => {
                let Some(source) = self.program.class_of(from) else {
                    return false;
                };
                let (source_def, target_def) = (&self.program.classes[source], &self.program.classes[target]);
                if source_def.is_enum() || target_def.is_enum() {
                    return false;
                }
                if source_def.is_interface() || target_def.is_interface() {
                    return true;
                }
                instantiate_ancestor(self.program, to, source) == Some(from)
            }
            _ => false,
        }
    }

    pub(crate) fn cast_node(&mut self, kind: CastKind, expr: Expr, to: TyId) -> Expr {
        let location = expr.location;
        Expr::new(
            ExprKind::Cast {
                kind,
                expr: Box::new(expr),
            },
            to,
            location,
        )
    }
}
