//! Type reference resolution

use crate::LoweringContext;
use rk_intern::Symbol;
use rk_it::{Entity, FnParam, PrimitiveKind, ScopeId, SemanticError, TyId, TyKind};
use rk_span::SourceLocation;
use rk_syntax::{TypeRef, TypeRefKind};

impl LoweringContext<'_> {
    /// Resolve a written type in `scope`
    ///
    /// Failures are reported and yield the error type.
    pub fn resolve_type(&mut self, scope: ScopeId, ty: &TypeRef) -> TyId {
        match &ty.kind {
            TypeRefKind::Named { unit, path, args } => {
                self.resolve_named_type(scope, *unit, path, args, ty.location)
            }
            TypeRefKind::Array {
                element,
                dimensions,
            } => {
                let element = self.resolve_type(scope, element);
                if self.program.is_error(element) {
                    return element;
                }
                self.program.array_ty(element, (*dimensions).max(1))
            }
            TypeRefKind::Function { params, ret } => {
                let params = params
                    .iter()
                    .map(|param| FnParam {
                        ty: self.resolve_type(scope, &param.ty),
                        by_ref: param.by_ref,
                    })
                    .collect();
                let ret = ret.as_ref().map(|ret| self.resolve_type(scope, ret));
                self.program.function_ty(params, ret)
            }
        }
    }

    /// Resolve an optional type, `None` staying `None`
    pub fn resolve_optional_type(&mut self, scope: ScopeId, ty: Option<&TypeRef>) -> Option<TyId> {
        ty.map(|ty| self.resolve_type(scope, ty))
    }

    fn resolve_named_type(
        &mut self,
        scope: ScopeId,
        unit: Option<Symbol>,
        path: &[Symbol],
        args: &[TypeRef],
        location: SourceLocation,
    ) -> TyId {
        if unit.is_none() && path.len() == 1 && args.is_empty() {
            if let Some(kind) = PrimitiveKind::from_name(&self.text(path[0])) {
                return self.program.primitive(kind);
            }
        }
        let Some(entity) = self.lookup_type_path(scope, unit, path) else {
            let name = self.path_text(unit, path);
            self.error(location, SemanticError::UndefinedType { name });
            return self.program.error_ty();
        };
        match entity {
            Entity::GenericParam(param) if args.is_empty() => self.program.intern(TyKind::Param(param)),
            Entity::GenericParam(_) => {
                let ty = self.path_text(unit, path);
                self.error(
                    location,
                    SemanticError::GenericArgumentCount {
                        ty,
                        expected: 0,
                        found: args.len(),
                    },
                );
                self.program.error_ty()
            }
            Entity::Class(class) => {
                let expected = self.program.classes[class].generics.len();
                if expected != args.len() {
                    let ty = self.program.class_name(class);
                    self.error(
                        location,
                        SemanticError::GenericArgumentCount {
                            ty,
                            expected,
                            found: args.len(),
                        },
                    );
                    return self.program.error_ty();
                }
                if expected == 0 {
                    return self.program.intern(TyKind::Class(class));
                }
                let args = args.iter().map(|arg| self.resolve_type(scope, arg)).collect();
                self.program.intern(TyKind::Instance { class, args })
            }
            _ => {
                let name = self.path_text(unit, path);
                self.error(location, SemanticError::NotAType { name });
                self.program.error_ty()
            }
        }
    }

    /// Entity named by a `#`-separated path, looked up lexically from `scope`
    /// or in the unit named by `unit`
    pub(crate) fn lookup_type_path(
        &self,
        scope: ScopeId,
        unit: Option<Symbol>,
        path: &[Symbol],
    ) -> Option<Entity> {
        let (&first, rest) = path.split_first()?;
        let mut entity = match unit {
            Some(unit) => self.program.lookup_in(*self.program.units.get(&unit)?, first)?,
            None => self.lookup_lexical(scope, first)?,
        };
        for &segment in rest {
            let Entity::Class(class) = entity else {
                return None;
            };
            let class_scope = self.program.classes[class].scope;
            entity = self.program.lookup_in(class_scope, segment)?;
        }
        Some(entity)
    }

    /// Scope entries from `scope` outwards, then the other units in order
    pub(crate) fn lookup_lexical(&self, scope: ScopeId, name: Symbol) -> Option<Entity> {
        if let Some(entity) = self
            .program
            .lineage(scope)
            .find_map(|current| self.program.lookup_in(current, name))
        {
            return Some(entity);
        }
        let own_unit = self.program.unit_of(scope);
        self.program
            .units
            .values()
            .filter(|&&unit| unit != own_unit)
            .find_map(|&unit| self.program.lookup_in(unit, name))
    }

    pub(crate) fn path_text(&self, unit: Option<Symbol>, path: &[Symbol]) -> String {
        let path: Vec<String> = path.iter().map(|&segment| self.text(segment)).collect();
        match unit {
            Some(unit) => format!("global({})#{}", self.text(unit), path.join("#")),
            None => path.join("#"),
        }
    }
}
