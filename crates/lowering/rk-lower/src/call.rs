//! Calls and object construction

use crate::LoweringContext;
use crate::lookup::Resolved;
use rk_it::{
    ClassId, Expr, ExprKind, FnParam, FunctionId, FunctionKind, InternalError, SemanticError,
    TyId, TyKind,
};
use rk_span::SourceLocation;
use rk_subst::{Substitution, infer, member_view};
use rk_syntax::{Argument, TypeRef};
use tracing::trace;

/// Argument lowered before its parameter type is known
struct LoweredArg {
    value: Expr,
    by_ref: bool,
}

impl LoweringContext<'_> {
    pub(crate) fn lower_call(
        &mut self,
        callee: &rk_syntax::Expr,
        generic_args: &[TypeRef],
        args: &[Argument],
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let resolved = match callee.kind {
            rk_syntax::ExprKind::Name(_)
            | rk_syntax::ExprKind::Scoped { .. }
            | rk_syntax::ExprKind::Member { .. } => self.resolve_path(callee)?,
            _ => Resolved::Value(self.lower_expr(callee)?),
        };
        match resolved {
            Resolved::Function { function, target } => {
                self.call_function(function, target, generic_args, args, location)
            }
            Resolved::Value(value) => {
                let value = self.check_readable(value);
                self.call_value(value, generic_args, args, location)
            }
            Resolved::Constant(constant) => {
                let value = self.constant_expr(constant, callee.location)?;
                self.call_value(value, generic_args, args, location)
            }
            Resolved::Class(class) => {
                self.lower_arguments(args)?;
                let ty = self.program.class_name(class);
                self.error(location, SemanticError::NotCallable { ty });
                Ok(self.error_expr(location))
            }
            Resolved::Generic(param) => {
                self.lower_arguments(args)?;
                let ty = self.text(self.program.generic_params[param].name);
                self.error(location, SemanticError::NotCallable { ty });
                Ok(self.error_expr(location))
            }
        }
    }

    fn lower_arguments(&mut self, args: &[Argument]) -> Result<Vec<LoweredArg>, InternalError> {
        args.iter()
            .map(|arg| {
                Ok(LoweredArg {
                    value: self.lower_expr(&arg.value)?,
                    by_ref: arg.by_ref,
                })
            })
            .collect()
    }

    /// Direct call of a known function, method or closure
    fn call_function(
        &mut self,
        function: FunctionId,
        target: Option<Expr>,
        generic_args: &[TypeRef],
        args: &[Argument],
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let (owner, kind, generics) = {
            let def = &self.program.functions[function];
            (def.owner, def.kind, def.generics.clone())
        };
        let name = self.program.function_name(function);
        let target = match (target, owner) {
            (None, Some(owner)) if matches!(kind, FunctionKind::Method) => {
                match self.this_of(Some(owner), location)? {
                    Some(this) => Some(this),
                    None => {
                        self.lower_arguments(args)?;
                        self.error(location, SemanticError::ThisOutsideMethod);
                        return Ok(self.error_expr(location));
                    }
                }
            }
            (target, _) => target,
        };
        let lowered = self.lower_arguments(args)?;

        let mut subst = match (owner, &target) {
            (Some(owner), Some(target)) => member_view(self.program, target.ty, owner),
            _ => Substitution::new(),
        };
        let signature = self.program.signature_ty(function);
        let TyKind::Function { params, ret } = self.program.ty(signature).clone() else {
            return Err(InternalError::Invariant(format!("signature of `{name}` is not a function type")));
        };

        if !generic_args.is_empty() {
            if generic_args.len() != generics.len() {
                self.error(
                    location,
                    SemanticError::GenericArgumentCount {
                        ty: name,
                        expected: generics.len(),
                        found: generic_args.len(),
                    },
                );
                return Ok(self.error_expr(location));
            }
            let scope = self.current_scope()?;
            for (&param, arg) in generics.iter().zip(generic_args) {
                let ty = self.resolve_type(scope, arg);
                subst.insert(param, ty);
            }
        } else if !generics.is_empty() {
            for (param, arg) in params.iter().zip(&lowered) {
                let pattern = subst.apply(&mut self.program.types, param.ty);
                if infer(self.program, &generics, pattern, arg.value.ty, &mut subst).is_err() {
                    trace!(function = %name, "conflicting generic inference; argument check reports it");
                }
            }
            if let Some(&missing) = generics.iter().find(|&&param| !subst.contains(param)) {
                let param = self.text(self.program.generic_params[missing].name);
                self.error(location, SemanticError::CannotInferGeneric { name, param });
                return Ok(self.error_expr(location));
            }
        }

        let params: Vec<FnParam> = params
            .into_iter()
            .map(|param| FnParam {
                ty: subst.apply(&mut self.program.types, param.ty),
                by_ref: param.by_ref,
            })
            .collect();
        let ret = match ret {
            Some(ret) => subst.apply(&mut self.program.types, ret),
            None => self.program.void_ty(),
        };
        let Some(args) = self.check_arguments(&name, &params, lowered, location) else {
            return Ok(Expr::new(ExprKind::Error, ret, location));
        };
        Ok(Expr::new(
            ExprKind::Call {
                function,
                target: target.map(Box::new),
                args,
            },
            ret,
            location,
        ))
    }

    /// Call through a function-typed value
    fn call_value(
        &mut self,
        callee: Expr,
        generic_args: &[TypeRef],
        args: &[Argument],
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let lowered = self.lower_arguments(args)?;
        if callee.is_error() {
            return Ok(self.error_expr(location));
        }
        let TyKind::Function { params, ret } = self.program.ty(callee.ty).clone() else {
            let ty = self.describe(callee.ty);
            self.error(location, SemanticError::NotCallable { ty });
            return Ok(self.error_expr(location));
        };
        let name = self.describe(callee.ty);
        if !generic_args.is_empty() {
            self.error(
                location,
                SemanticError::GenericArgumentCount {
                    ty: name,
                    expected: 0,
                    found: generic_args.len(),
                },
            );
            return Ok(self.error_expr(location));
        }
        let ret = match ret {
            Some(ret) => ret,
            None => self.program.void_ty(),
        };
        let Some(args) = self.check_arguments(&name, &params, lowered, location) else {
            return Ok(Expr::new(ExprKind::Error, ret, location));
        };
        Ok(Expr::new(
            ExprKind::CallValue {
                callee: Box::new(callee),
                args,
            },
            ret,
            location,
        ))
    }

    /// Match arguments to parameters: count, by-ref agreement and types
    ///
    /// Returns `None` when the count is wrong; per-argument problems are
    /// reported and replaced by error expressions.
    fn check_arguments(
        &mut self,
        name: &str,
        params: &[FnParam],
        args: Vec<LoweredArg>,
        location: SourceLocation,
    ) -> Option<Vec<Expr>> {
        if params.len() != args.len() {
            self.error(
                location,
                SemanticError::ArgumentCount {
                    name: name.to_string(),
                    expected: params.len(),
                    found: args.len(),
                },
            );
            return None;
        }
        let mut checked = Vec::with_capacity(args.len());
        for (position, (param, arg)) in params.iter().zip(args).enumerate() {
            let index = position + 1;
            let arg_location = arg.value.location;
            if arg.value.is_error() {
                checked.push(Expr { ty: param.ty, ..arg.value });
                continue;
            }
            match (param.by_ref, arg.by_ref) {
                (true, false) => {
                    self.error(arg_location, SemanticError::ArgumentNotByRef { name: name.to_string(), index });
                    checked.push(Expr::new(ExprKind::Error, param.ty, arg_location));
                }
                (false, true) => {
                    self.error(arg_location, SemanticError::ArgumentByRef { name: name.to_string(), index });
                    checked.push(Expr::new(ExprKind::Error, param.ty, arg_location));
                }
                (true, true) => {
                    if !arg.value.is_storage() {
                        self.error(arg_location, SemanticError::ByRefNotStorage { name: name.to_string(), index });
                        checked.push(Expr::new(ExprKind::Error, param.ty, arg_location));
                    } else if arg.value.ty != param.ty && !self.program.is_error(param.ty) {
                        let expected = self.describe(param.ty);
                        let found = self.describe(arg.value.ty);
                        self.error(arg_location, SemanticError::TypeMismatch { expected, found });
                        checked.push(Expr::new(ExprKind::Error, param.ty, arg_location));
                    } else {
                        checked.push(arg.value);
                    }
                }
                (false, false) => checked.push(self.coerce(arg.value, param.ty)),
            }
        }
        Some(checked)
    }

    /// `new Class()`
    pub(crate) fn lower_new(
        &mut self,
        ty: &TypeRef,
        args: &[Argument],
        location: SourceLocation,
    ) -> Result<Expr, InternalError> {
        let scope = self.current_scope()?;
        let ty = self.resolve_type(scope, ty);
        let lowered = self.lower_arguments(args)?;
        if self.program.is_error(ty) {
            return Ok(Expr::new(ExprKind::Error, ty, location));
        }
        let Some(class) = self.program.class_of(ty).filter(|&class| !self.program.classes[class].is_enum()) else {
            let name = self.describe(ty);
            self.error(location, SemanticError::NotAClass { name });
            return Ok(Expr::new(ExprKind::Error, ty, location));
        };
        let def = &self.program.classes[class];
        if def.is_interface() || def.is_abstract {
            let class = self.program.class_name(class);
            self.error(location, SemanticError::AbstractInstantiation { class });
            return Ok(Expr::new(ExprKind::Error, ty, location));
        }
        if !lowered.is_empty() {
            self.error(
                location,
                SemanticError::ArgumentCount {
                    name: self.options.constructor_name.clone(),
                    expected: 0,
                    found: lowered.len(),
                },
            );
            return Ok(Expr::new(ExprKind::Error, ty, location));
        }
        let constructor = self.constructor_of(class);
        Ok(Expr::new(
            ExprKind::New {
                constructor,
                args: Vec::new(),
            },
            ty,
            location,
        ))
    }

    fn constructor_of(&self, class: ClassId) -> Option<FunctionId> {
        let name = self.program.interner.get(&self.options.constructor_name)?;
        self.program.classes[class]
            .methods
            .get(&name)
            .copied()
            .filter(|&function| self.program.functions[function].kind == FunctionKind::Constructor)
    }

    /// Void results may not be used as values
    pub(crate) fn require_value(&mut self, expr: Expr) -> Expr {
        if matches!(self.program.ty(expr.ty), TyKind::Void) {
            let found = self.describe(expr.ty);
            self.error(
                expr.location,
                SemanticError::TypeMismatch {
                    expected: "a value".to_string(),
                    found,
                },
            );
            let ty: TyId = self.program.error_ty();
            return Expr::new(ExprKind::Error, ty, expr.location);
        }
        expr
    }
}
