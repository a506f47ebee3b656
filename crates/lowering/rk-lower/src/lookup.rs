//! Name resolution and member lookup
//!
//! Unqualified names are searched from the current block outwards: foreach
//! aliases and locals of each block, parameters, then the members of every
//! enclosing class (through its hierarchy, with `this` as the receiver), then
//! unit-level entities of the current unit and finally every other unit.

use crate::LoweringContext;
use rk_intern::Symbol;
use rk_it::{
    ClassId, ConstantId, Entity, Expr, ExprKind, FunctionId, FunctionKind, GenericParamId,
    InternalError, Program, PropertyId, ScopeKind, SemanticError, TyId, TyKind, VariableId,
    VariableKind, Visibility,
};
use rk_span::SourceLocation;
use rk_subst::member_view;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// What a member lookup found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Instance field
    Field(VariableId),
    /// Property
    Property(PropertyId),
    /// Method
    Method(FunctionId),
    /// Constant or enum member
    Constant(ConstantId),
    /// Nested class or enum
    Class(ClassId),
}

/// A member together with the class declaring it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// What was found
    pub kind: MemberKind,
    /// Class declaring the member
    pub owner: ClassId,
}

impl Member {
    /// Declared visibility of the member
    pub fn visibility(&self, program: &Program) -> Visibility {
        match self.kind {
            MemberKind::Field(variable) => program.variables[variable].visibility,
            MemberKind::Property(property) => program.properties[property].visibility,
            MemberKind::Method(function) => program.functions[function].visibility,
            MemberKind::Constant(constant) => program.constants[constant].visibility,
            MemberKind::Class(class) => program.classes[class].visibility,
        }
    }

    /// Declared name of the member
    pub fn name(&self, program: &Program) -> Symbol {
        match self.kind {
            MemberKind::Field(variable) => program.variables[variable].name,
            MemberKind::Property(property) => program.properties[property].name,
            MemberKind::Method(function) => program.functions[function].name,
            MemberKind::Constant(constant) => program.constants[constant].name,
            MemberKind::Class(class) => program.classes[class].name,
        }
    }
}

/// Members declared directly in `class`
pub fn declared_member(program: &Program, class: ClassId, name: Symbol) -> Option<MemberKind> {
    let def = &program.classes[class];
    if let Some(&field) = def.fields.get(&name) {
        return Some(MemberKind::Field(field));
    }
    if let Some(&property) = def.properties.get(&name) {
        return Some(MemberKind::Property(property));
    }
    if let Some(&method) = def.methods.get(&name) {
        if !program.functions[method].is_special() {
            return Some(MemberKind::Method(method));
        }
    }
    if let Some(&constant) = def.constants.get(&name) {
        return Some(MemberKind::Constant(constant));
    }
    match program.lookup_in(def.scope, name) {
        Some(Entity::Class(nested)) => Some(MemberKind::Class(nested)),
        _ => None,
    }
}

/// Breadth-first search of `class`, its superclasses and its interfaces
pub fn search_member(program: &Program, class: ClassId, name: Symbol) -> Option<Member> {
    let mut pending = VecDeque::from([class]);
    let mut seen = FxHashSet::default();
    while let Some(current) = pending.pop_front() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(kind) = declared_member(program, current, name) {
            return Some(Member {
                kind,
                owner: current,
            });
        }
        let def = &program.classes[current];
        pending.extend(program.superclass(current));
        pending.extend(def.interfaces.iter().filter_map(|&ty| program.class_of(ty)));
    }
    None
}

/// Result of resolving a name or member path
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Value(Expr),
    Constant(ConstantId),
    /// Function, bound to `target` for methods
    Function {
        function: FunctionId,
        target: Option<Expr>,
    },
    Class(ClassId),
    Generic(GenericParamId),
}

impl LoweringContext<'_> {
    /// Class whose members a receiver of type `ty` exposes
    fn receiver_class(&self, ty: TyId) -> Option<ClassId> {
        match self.program.ty(ty) {
            TyKind::Class(class) | TyKind::Instance { class, .. } => Some(*class),
            TyKind::Param(_) => Some(self.program.prelude.object),
            _ => None,
        }
    }

    /// Member `name` visible on a receiver of type `receiver`
    pub fn find_member(&mut self, receiver: TyId, name: Symbol) -> Option<Member> {
        if let Some(frame) = self.frames.last() {
            if let Some(&cached) = frame.members.get(&(receiver, name)) {
                return cached;
            }
        }
        let found = self
            .receiver_class(receiver)
            .and_then(|class| search_member(self.program, class, name));
        if let Some(frame) = self.frames.last_mut() {
            frame.members.insert((receiver, name), found);
        }
        found
    }

    /// Report `member` if the current scope may not see it
    pub(crate) fn check_access(&mut self, member: &Member, location: SourceLocation) -> Result<(), InternalError> {
        let visibility = member.visibility(self.program);
        if visibility == Visibility::Public {
            return Ok(());
        }
        let scope = self.current_scope()?;
        let owner_scope = self.program.classes[member.owner].scope;
        let allowed = match visibility {
            Visibility::Private => self.program.lineage(scope).any(|current| current == owner_scope),
            Visibility::Protected => self.program.lineage(scope).any(|current| {
                matches!(self.program.scopes[current].kind,
                    ScopeKind::Class(class) if self.program.derives_from(class, member.owner))
            }),
            Visibility::Public => true,
        };
        if !allowed {
            let name = member.name(self.program);
            self.error(
                location,
                SemanticError::IllegalAccess {
                    member: self.text(name),
                    visibility: visibility.to_string(),
                },
            );
        }
        Ok(())
    }

    /// Resolve an unqualified name from the current block
    pub(crate) fn resolve_name(
        &mut self,
        name: Symbol,
        location: SourceLocation,
    ) -> Result<Option<Resolved>, InternalError> {
        let start = self.current_scope()?;
        let lineage: Vec<_> = self.program.lineage(start).collect();
        for scope in lineage {
            match self.program.scopes[scope].kind {
                ScopeKind::Block(block) => {
                    if let Some(alias) = self.program.blocks[block].virtuals.get(&name).cloned() {
                        return Ok(Some(Resolved::Value(self.rebase_alias(alias, location)?)));
                    }
                    if let Some(&local) = self.program.blocks[block].locals.get(&name) {
                        return Ok(Some(Resolved::Value(self.variable_expr(local, location)?)));
                    }
                    if let Some(entity) = self.program.lookup_in(scope, name) {
                        return self.entity_resolution(entity, location).map(Some);
                    }
                }
                ScopeKind::Function(_) | ScopeKind::Unit(_) => {
                    if let Some(entity) = self.program.lookup_in(scope, name) {
                        return self.entity_resolution(entity, location).map(Some);
                    }
                }
                ScopeKind::Class(class) => {
                    if let Some(
                        entity @ (Entity::GenericParam(_) | Entity::Class(_) | Entity::Constant(_)),
                    ) = self.program.lookup_in(scope, name)
                    {
                        return self.entity_resolution(entity, location).map(Some);
                    }
                    let self_ty = self.program.self_ty(class);
                    if let Some(member) = self.find_member(self_ty, name) {
                        return self.member_of_this(class, member, location).map(Some);
                    }
                }
            }
        }
        let own_unit = self.program.unit_of(start);
        let units: Vec<_> = self
            .program
            .units
            .values()
            .copied()
            .filter(|&unit| unit != own_unit)
            .collect();
        for unit in units {
            if let Some(entity) = self.program.lookup_in(unit, name) {
                return self.entity_resolution(entity, location).map(Some);
            }
        }
        Ok(None)
    }

    fn entity_resolution(&mut self, entity: Entity, location: SourceLocation) -> Result<Resolved, InternalError> {
        Ok(match entity {
            Entity::Variable(variable) => Resolved::Value(self.variable_expr(variable, location)?),
            Entity::Constant(constant) => Resolved::Constant(constant),
            Entity::Function(function) => Resolved::Function {
                function,
                target: None,
            },
            Entity::Property(property) => {
                let ty = self.program.properties[property].ty;
                Resolved::Value(Expr::new(
                    ExprKind::Property {
                        target: None,
                        property,
                    },
                    ty,
                    location,
                ))
            }
            Entity::Class(class) => Resolved::Class(class),
            Entity::GenericParam(param) => Resolved::Generic(param),
        })
    }

    /// Expression reading `variable`, capturing it when it belongs to an
    /// enclosing function
    pub(crate) fn variable_expr(&mut self, variable: VariableId, location: SourceLocation) -> Result<Expr, InternalError> {
        let def = &self.program.variables[variable];
        let (kind, owner, name) = (def.kind, def.function, def.name);
        match kind {
            VariableKind::Global => {
                self.ensure_variable_ready(variable)?;
                let ty = self.program.variables[variable].ty;
                return Ok(Expr::new(ExprKind::Global(variable), ty, location));
            }
            VariableKind::Field(_) => {
                return Err(InternalError::Invariant(format!(
                    "field `{}` reached without a receiver",
                    self.text(name)
                )));
            }
            VariableKind::Local(_) | VariableKind::Parameter { .. } | VariableKind::This => {}
        }
        let ty = self.program.variables[variable].ty;
        if owner.is_some() && self.frame()?.function == owner {
            let kind = match kind {
                VariableKind::Parameter { .. } => ExprKind::Param(variable),
                VariableKind::This => ExprKind::This,
                _ => ExprKind::Local(variable),
            };
            return Ok(Expr::new(kind, ty, location));
        }
        match self.capture_frame(owner) {
            Some(owner_index) => {
                let hops = self.record_capture(variable, owner_index)?;
                Ok(Expr::new(ExprKind::Captured { variable, hops }, ty, location))
            }
            None => {
                let name = self.text(name);
                self.error(location, SemanticError::UndefinedName { name });
                Ok(self.error_expr(location))
            }
        }
    }

    /// Index of the enclosing frame lowering `owner`, if reachable
    fn capture_frame(&self, owner: Option<FunctionId>) -> Option<usize> {
        let owner = owner?;
        let mut index = self.frames.len().checked_sub(1)?;
        while index > 0 {
            if self.frames[index].barrier {
                return None;
            }
            index -= 1;
            if self.frames[index].function == Some(owner) {
                return Some(index);
            }
        }
        None
    }

    /// Re-resolve the locals inside a foreach alias from the current frame
    fn rebase_alias(&mut self, alias: Expr, location: SourceLocation) -> Result<Expr, InternalError> {
        let Expr { kind, ty, .. } = alias;
        let kind = match kind {
            ExprKind::Local(variable) => return self.variable_expr(variable, location),
            ExprKind::ArrayElement { array, indices } => ExprKind::ArrayElement {
                array: Box::new(self.rebase_alias(*array, location)?),
                indices: indices
                    .into_iter()
                    .map(|index| self.rebase_alias(index, location))
                    .collect::<Result<_, _>>()?,
            },
            ExprKind::Property { target, property } => ExprKind::Property {
                target: match target {
                    Some(target) => Some(Box::new(self.rebase_alias(*target, location)?)),
                    None => None,
                },
                property,
            },
            other => other,
        };
        Ok(Expr::new(kind, ty, location))
    }

    /// Member of the lexically enclosing `class`, accessed through `this`
    fn member_of_this(&mut self, class: ClassId, member: Member, location: SourceLocation) -> Result<Resolved, InternalError> {
        match member.kind {
            MemberKind::Constant(constant) => {
                self.check_access(&member, location)?;
                return Ok(Resolved::Constant(constant));
            }
            MemberKind::Class(nested) => {
                self.check_access(&member, location)?;
                return Ok(Resolved::Class(nested));
            }
            _ => {}
        }
        match self.this_of(Some(class), location)? {
            Some(receiver) => self.member_access(receiver, member, location),
            None => {
                self.error(location, SemanticError::ThisOutsideMethod);
                Ok(Resolved::Value(self.error_expr(location)))
            }
        }
    }

    /// `this` of the innermost method (of `class`, when given)
    pub(crate) fn this_of(&mut self, class: Option<ClassId>, location: SourceLocation) -> Result<Option<Expr>, InternalError> {
        let Some(mut index) = self.frames.len().checked_sub(1) else {
            return Ok(None);
        };
        loop {
            if let Some(function) = self.frames[index].function {
                let def = &self.program.functions[function];
                let owner_matches = class.is_none_or(|class| def.owner == Some(class));
                if def.kind != FunctionKind::Closure && owner_matches {
                    return match def.this_var {
                        Some(this_var) => self.variable_expr(this_var, location).map(Some),
                        None => Ok(None),
                    };
                }
            }
            if self.frames[index].barrier || index == 0 {
                return Ok(None);
            }
            index -= 1;
        }
    }

    /// Access `member` on `target`, with the member's types seen through the
    /// receiver's generic arguments
    pub(crate) fn member_access(&mut self, target: Expr, member: Member, location: SourceLocation) -> Result<Resolved, InternalError> {
        self.check_access(&member, location)?;
        Ok(match member.kind {
            MemberKind::Field(field) => {
                self.ensure_variable_ready(field)?;
                let view = member_view(self.program, target.ty, member.owner);
                let ty = view.apply(&mut self.program.types, self.program.variables[field].ty);
                Resolved::Value(Expr::new(
                    ExprKind::Field {
                        target: Box::new(target),
                        field,
                    },
                    ty,
                    location,
                ))
            }
            MemberKind::Property(property) => {
                let view = member_view(self.program, target.ty, member.owner);
                let ty = view.apply(&mut self.program.types, self.program.properties[property].ty);
                Resolved::Value(Expr::new(
                    ExprKind::Property {
                        target: Some(Box::new(target)),
                        property,
                    },
                    ty,
                    location,
                ))
            }
            MemberKind::Method(function) => Resolved::Function {
                function,
                target: Some(target),
            },
            MemberKind::Constant(constant) => Resolved::Constant(constant),
            MemberKind::Class(class) => Resolved::Class(class),
        })
    }

    /// Resolve a name, scoped path or member access without reading it yet
    pub(crate) fn resolve_path(&mut self, expr: &rk_syntax::Expr) -> Result<Resolved, InternalError> {
        let location = expr.location;
        match &expr.kind {
            rk_syntax::ExprKind::Name(name) => match self.resolve_name(*name, location)? {
                Some(resolved) => Ok(resolved),
                None => {
                    let name = self.text(*name);
                    self.error(location, SemanticError::UndefinedName { name });
                    Ok(Resolved::Value(self.error_expr(location)))
                }
            },
            rk_syntax::ExprKind::Scoped { unit, path } => {
                let (&first, rest) = path
                    .split_first()
                    .ok_or_else(|| InternalError::malformed(location, "empty scoped name"))?;
                let head = match unit {
                    Some(unit) => match self.program.units.get(unit).copied() {
                        Some(scope) => match self.program.lookup_in(scope, first) {
                            Some(entity) => Some(self.entity_resolution(entity, location)?),
                            None => None,
                        },
                        None => None,
                    },
                    None => self.resolve_name(first, location)?,
                };
                let Some(mut resolved) = head else {
                    let name = self.path_text(*unit, &path[..1]);
                    self.error(location, SemanticError::UndefinedName { name });
                    return Ok(Resolved::Value(self.error_expr(location)));
                };
                for &segment in rest {
                    resolved = self.resolve_segment(resolved, segment, location)?;
                }
                Ok(resolved)
            }
            rk_syntax::ExprKind::Member { target, name } => {
                let head = match target.kind {
                    rk_syntax::ExprKind::Name(_)
                    | rk_syntax::ExprKind::Scoped { .. }
                    | rk_syntax::ExprKind::Member { .. } => self.resolve_path(target)?,
                    _ => Resolved::Value(self.lower_expr(target)?),
                };
                self.resolve_segment(head, *name, location)
            }
            _ => Ok(Resolved::Value(self.lower_expr(expr)?)),
        }
    }

    /// Look `name` up inside whatever `head` resolved to
    fn resolve_segment(&mut self, head: Resolved, name: Symbol, location: SourceLocation) -> Result<Resolved, InternalError> {
        let value = match head {
            Resolved::Class(class) => {
                let self_ty = self.program.self_ty(class);
                return match self.find_member(self_ty, name) {
                    Some(member @ Member {
                        kind: MemberKind::Constant(_) | MemberKind::Class(_),
                        ..
                    }) => {
                        self.check_access(&member, location)?;
                        Ok(match member.kind {
                            MemberKind::Constant(constant) => Resolved::Constant(constant),
                            MemberKind::Class(nested) => Resolved::Class(nested),
                            _ => Resolved::Value(self.error_expr(location)),
                        })
                    }
                    _ => {
                        let ty = self.program.class_name(class);
                        self.error(
                            location,
                            SemanticError::UndefinedMember {
                                ty,
                                name: self.text(name),
                            },
                        );
                        Ok(Resolved::Value(self.error_expr(location)))
                    }
                };
            }
            Resolved::Value(expr) => expr,
            Resolved::Constant(constant) => self.constant_expr(constant, location)?,
            Resolved::Function { .. } | Resolved::Generic(_) => {
                self.error(
                    location,
                    SemanticError::UndefinedMember {
                        ty: "function".to_string(),
                        name: self.text(name),
                    },
                );
                return Ok(Resolved::Value(self.error_expr(location)));
            }
        };
        if value.is_error() {
            return Ok(Resolved::Value(value));
        }
        let value = self.check_readable(value);
        if matches!(self.program.ty(value.ty), TyKind::Array { .. }) && self.text(name) == "Length" {
            let ty = self.program.int_ty();
            return Ok(Resolved::Value(Expr::new(
                ExprKind::ArrayLength {
                    array: Box::new(value),
                    dimension: None,
                },
                ty,
                location,
            )));
        }
        match self.find_member(value.ty, name) {
            Some(member) => self.member_access(value, member, location),
            None => {
                let ty = self.describe(value.ty);
                self.error(
                    location,
                    SemanticError::UndefinedMember {
                        ty,
                        name: self.text(name),
                    },
                );
                Ok(Resolved::Value(self.error_expr(location)))
            }
        }
    }

    /// Turn a resolution into a value expression
    pub(crate) fn resolved_value(&mut self, resolved: Resolved, location: SourceLocation) -> Result<Expr, InternalError> {
        match resolved {
            Resolved::Value(expr) => Ok(expr),
            Resolved::Constant(constant) => self.constant_expr(constant, location),
            Resolved::Function { function, target } => Ok(self.function_value(function, target, location)),
            Resolved::Class(class) => {
                let name = self.program.class_name(class);
                self.error(location, SemanticError::TypeUsedAsValue { name });
                Ok(self.error_expr(location))
            }
            Resolved::Generic(param) => {
                let name = self.text(self.program.generic_params[param].name);
                self.error(location, SemanticError::TypeUsedAsValue { name });
                Ok(self.error_expr(location))
            }
        }
    }

    /// A function used as a value: a reference, or a method bound to `target`
    fn function_value(&mut self, function: FunctionId, target: Option<Expr>, location: SourceLocation) -> Expr {
        if let Some(&param) = self.program.functions[function].generics.first() {
            let name = self.program.function_name(function);
            let param = self.text(self.program.generic_params[param].name);
            self.error(location, SemanticError::CannotInferGeneric { name, param });
            return self.error_expr(location);
        }
        let signature = self.program.signature_ty(function);
        match target {
            Some(target) => {
                let ty = match self.program.functions[function].owner {
                    Some(owner) => {
                        let view = member_view(self.program, target.ty, owner);
                        view.apply(&mut self.program.types, signature)
                    }
                    None => signature,
                };
                Expr::new(
                    ExprKind::BoundMethod {
                        target: Box::new(target),
                        function,
                    },
                    ty,
                    location,
                )
            }
            None => Expr::new(ExprKind::FunctionRef(function), signature, location),
        }
    }

    /// Report reads of properties without a getter
    pub(crate) fn check_readable(&mut self, expr: Expr) -> Expr {
        if let ExprKind::Property { property, .. } = expr.kind {
            if self.program.properties[property].getter.is_none() {
                let name = self.text(self.program.properties[property].name);
                self.error(expr.location, SemanticError::NoGetter { name });
            }
        }
        expr
    }
}
