//! Definition pass: members, free functions, variables and constants

use crate::unit::{PendingBody, UnitCollector, add_generics, check_reserved, report_duplicate};
use rk_it::{
    ClassId, ConstantDef, ConstantState, Entity, FunctionId, FunctionKind, GenericOwner,
    InternalError, LazyConstant, PropertyId, ScopeId, SemanticError, TyId, VariableDef,
    VariableKind, Visibility,
};
use rk_lower::LoweringContext;
use rk_syntax::{
    AccessorDecl, Declaration, DeclarationKind, EnumDecl, FunctionDecl, PropertyDecl, VariableDecl,
};
use tracing::trace;

/// Where a declaration is being defined
#[derive(Debug, Clone, Copy)]
struct Site {
    scope: ScopeId,
    owner: Option<ClassId>,
}

impl Site {
    fn in_interface(self, ctx: &LoweringContext<'_>) -> bool {
        self.owner
            .is_some_and(|class| ctx.program.classes[class].is_interface())
    }
}

impl<'a> UnitCollector<'a> {
    pub(crate) fn define_members(&mut self, ctx: &mut LoweringContext<'_>) -> Result<(), InternalError> {
        let root = Site {
            scope: self.scope(),
            owner: None,
        };
        let declarations = self.declarations();
        for declaration in declarations {
            self.define(ctx, root, declaration)?;
        }

        let classes: Vec<_> = self.classes.clone();
        for pending in classes {
            let site = Site {
                scope: ctx.program.classes[pending.class].scope,
                owner: Some(pending.class),
            };
            match &pending.declaration.kind {
                DeclarationKind::Class(class) => {
                    for member in &class.members {
                        self.define(ctx, site, member)?;
                    }
                }
                DeclarationKind::Enum(decl) => self.define_enum_members(ctx, pending.class, decl),
                _ => {}
            }
        }
        Ok(())
    }

    fn define(&mut self, ctx: &mut LoweringContext<'_>, site: Site, declaration: &'a Declaration) -> Result<(), InternalError> {
        match &declaration.kind {
            DeclarationKind::Class(_) | DeclarationKind::Enum(_) => {}
            DeclarationKind::Function(function) => self.define_function(ctx, site, declaration, function),
            DeclarationKind::Variable(variable) if variable.is_const => {
                self.define_constant(ctx, site, declaration, variable)?;
            }
            DeclarationKind::Variable(variable) => self.define_variable(ctx, site, declaration, variable),
            DeclarationKind::Property(property) => self.define_property(ctx, site, declaration, property),
        }
        Ok(())
    }

    /// Declared name is free in the site's scope; reports otherwise
    fn claim(ctx: &mut LoweringContext<'_>, site: Site, declaration: &Declaration) -> bool {
        if ctx.program.lookup_in(site.scope, declaration.name).is_some() {
            report_duplicate(ctx, declaration.name, declaration.location);
            return false;
        }
        true
    }

    fn define_function(
        &mut self,
        ctx: &mut LoweringContext<'_>,
        site: Site,
        declaration: &'a Declaration,
        decl: &'a FunctionDecl,
    ) {
        let name = declaration.name;
        let location = declaration.location;
        let interface = site.in_interface(ctx);
        let kind = match site.owner {
            Some(_) if interface => {
                check_reserved(ctx, name, location);
                FunctionKind::Method
            }
            Some(_) => {
                let text = ctx.program.name(name);
                if text == ctx.options().constructor_name {
                    FunctionKind::Constructor
                } else if text == ctx.options().destructor_name {
                    FunctionKind::Destructor
                } else {
                    FunctionKind::Method
                }
            }
            None => {
                check_reserved(ctx, name, location);
                FunctionKind::Free
            }
        };
        if !Self::claim(ctx, site, declaration) {
            return;
        }

        let function = match site.owner {
            Some(class) => ctx.program.new_method(class, name, location, kind),
            None => {
                let function = ctx.program.new_function(name, location, kind, site.scope);
                if ctx.program.declare(site.scope, name, Entity::Function(function)).is_err() {
                    report_duplicate(ctx, name, location);
                }
                function
            }
        };
        let abstract_member = site.owner.is_some() && (decl.is_abstract || interface);
        let def = &mut ctx.program.functions[function];
        def.visibility = declaration.visibility;
        def.is_override = decl.is_override;
        def.is_abstract = abstract_member;

        add_generics(ctx, GenericOwner::Function(function), &decl.generics);
        let scope = ctx.program.functions[function].scope;
        for param in &decl.params {
            let ty = ctx.resolve_type(scope, &param.ty);
            check_reserved(ctx, param.name, param.location);
            if ctx
                .program
                .add_param(function, param.name, ty, param.by_ref, param.location)
                .is_err()
            {
                report_duplicate(ctx, param.name, param.location);
            }
        }
        let return_type = ctx.resolve_optional_type(scope, decl.return_type.as_ref());
        ctx.program.functions[function].return_type = return_type;

        if ctx.program.functions[function].is_special()
            && (!decl.params.is_empty() || !decl.generics.is_empty() || decl.return_type.is_some())
        {
            let name = ctx.program.name(name);
            ctx.error(location, SemanticError::SpecialFunctionSignature { name });
        }
        self.expect_body(ctx, function, site, decl.body.as_ref(), location);
        trace!(function = %ctx.program.name(name), ?kind, "function defined");
    }

    /// Queue a body, or check that its absence is allowed
    fn expect_body(
        &mut self,
        ctx: &mut LoweringContext<'_>,
        function: FunctionId,
        site: Site,
        body: Option<&'a rk_syntax::Block>,
        location: rk_span::SourceLocation,
    ) {
        let is_abstract = ctx.program.functions[function].is_abstract;
        match body {
            Some(_) if site.in_interface(ctx) => {}
            Some(body) => self.bodies.push(PendingBody { function, body }),
            None if is_abstract => {
                let concrete = site
                    .owner
                    .filter(|&class| !ctx.program.classes[class].is_abstract && !ctx.program.classes[class].is_interface());
                if let Some(class) = concrete {
                    let class = ctx.program.class_name(class);
                    let member = ctx.program.function_name(function);
                    ctx.error(location, SemanticError::AbstractInConcrete { class, member });
                }
            }
            None => {
                let name = ctx.program.function_name(function);
                ctx.error(location, SemanticError::MissingBody { name });
            }
        }
    }

    fn define_variable(
        &mut self,
        ctx: &mut LoweringContext<'_>,
        site: Site,
        declaration: &'a Declaration,
        decl: &'a VariableDecl,
    ) {
        check_reserved(ctx, declaration.name, declaration.location);
        if !Self::claim(ctx, site, declaration) {
            return;
        }
        let declared = ctx.resolve_optional_type(site.scope, decl.ty.as_ref());
        let ty = match declared {
            Some(ty) => ty,
            None => ctx.program.error_ty(),
        };
        let kind = match site.owner {
            Some(class) => VariableKind::Field(class),
            None => VariableKind::Global,
        };
        let variable = ctx.program.variables.alloc(VariableDef {
            name: declaration.name,
            location: declaration.location,
            visibility: declaration.visibility,
            ty,
            kind,
            function: None,
            captured: false,
            initializer: None,
        });
        if ctx
            .program
            .declare(site.scope, declaration.name, Entity::Variable(variable))
            .is_err()
        {
            report_duplicate(ctx, declaration.name, declaration.location);
        }
        if let Some(class) = site.owner {
            ctx.program.classes[class].fields.insert(declaration.name, variable);
        }
        match (&decl.initializer, declared) {
            (Some(initializer), _) => {
                ctx.register_initializer(variable, site.scope, initializer, declared.is_some());
                self.initializers.push(variable);
            }
            (None, Some(_)) => {}
            (None, None) => {
                let name = ctx.program.name(declaration.name);
                ctx.error(declaration.location, SemanticError::UntypedVariable { name });
            }
        }
    }

    fn define_constant(
        &mut self,
        ctx: &mut LoweringContext<'_>,
        site: Site,
        declaration: &'a Declaration,
        decl: &'a VariableDecl,
    ) -> Result<(), InternalError> {
        let initializer = decl
            .initializer
            .as_ref()
            .ok_or_else(|| InternalError::malformed(declaration.location, "constant without an initializer"))?;
        check_reserved(ctx, declaration.name, declaration.location);
        if !Self::claim(ctx, site, declaration) {
            return Ok(());
        }
        let declared = ctx.resolve_optional_type(site.scope, decl.ty.as_ref());
        let ty = match declared {
            Some(ty) => ty,
            None => ctx.program.error_ty(),
        };
        let lazy = LazyConstant {
            expr: Some(initializer.clone()),
            previous: None,
        };
        self.new_constant(ctx, site, declaration.name, declaration.location, declaration.visibility, declared, ty, lazy);
        trace!(constant = %ctx.program.name(declaration.name), "constant deferred");
        Ok(())
    }

    /// Enum members default to zero, then to the previous member plus one
    fn define_enum_members(&mut self, ctx: &mut LoweringContext<'_>, class: ClassId, decl: &'a EnumDecl) {
        let site = Site {
            scope: ctx.program.classes[class].scope,
            owner: Some(class),
        };
        let enum_ty = ctx.program.self_ty(class);
        let mut previous = None;
        for member in &decl.members {
            check_reserved(ctx, member.name, member.location);
            if ctx.program.lookup_in(site.scope, member.name).is_some() {
                report_duplicate(ctx, member.name, member.location);
                continue;
            }
            let lazy = LazyConstant {
                expr: member.value.clone(),
                previous,
            };
            let constant = self.new_constant(ctx, site, member.name, member.location, Visibility::Public, Some(enum_ty), enum_ty, lazy);
            previous = Some(constant);
        }
    }

    fn new_constant(
        &mut self,
        ctx: &mut LoweringContext<'_>,
        site: Site,
        name: rk_intern::Symbol,
        location: rk_span::SourceLocation,
        visibility: Visibility,
        declared_ty: Option<TyId>,
        ty: TyId,
        lazy: LazyConstant,
    ) -> rk_it::ConstantId {
        let constant = ctx.program.constants.alloc(ConstantDef {
            name,
            location,
            visibility,
            scope: site.scope,
            owner: site.owner,
            declared_ty,
            ty,
            state: ConstantState::Unresolved(lazy),
        });
        if ctx.program.declare(site.scope, name, Entity::Constant(constant)).is_err() {
            report_duplicate(ctx, name, location);
        }
        if let Some(class) = site.owner {
            ctx.program.classes[class].constants.insert(name, constant);
        }
        self.constants.push(constant);
        constant
    }

    fn define_property(
        &mut self,
        ctx: &mut LoweringContext<'_>,
        site: Site,
        declaration: &'a Declaration,
        decl: &'a PropertyDecl,
    ) {
        check_reserved(ctx, declaration.name, declaration.location);
        if !Self::claim(ctx, site, declaration) {
            return;
        }
        let name = declaration.name;
        let ty = ctx.resolve_type(site.scope, &decl.ty);
        let property = ctx.program.new_property(site.owner, name, declaration.location, ty);
        if site.owner.is_none() && ctx.program.declare(site.scope, name, Entity::Property(property)).is_err() {
            report_duplicate(ctx, name, declaration.location);
        }
        let def = &mut ctx.program.properties[property];
        def.visibility = declaration.visibility;
        def.is_override = decl.is_override;

        if let Some(getter) = &decl.getter {
            let function = self.accessor(ctx, site, property, FunctionKind::Getter(property), declaration, getter);
            ctx.program.functions[function].return_type = Some(ty);
            ctx.program.properties[property].getter = Some(function);
        }
        if let Some(setter) = &decl.setter {
            let function = self.accessor(ctx, site, property, FunctionKind::Setter(property), declaration, setter);
            let value = ctx.program.names.value;
            if ctx.program.add_param(function, value, ty, false, setter.location).is_err() {
                report_duplicate(ctx, value, setter.location);
            }
            ctx.program.properties[property].setter = Some(function);
        }
    }

    /// Getter or setter function of `property`; the setter gets its `value`
    /// parameter from the caller
    fn accessor(
        &mut self,
        ctx: &mut LoweringContext<'_>,
        site: Site,
        property: PropertyId,
        kind: FunctionKind,
        declaration: &'a Declaration,
        accessor: &'a AccessorDecl,
    ) -> FunctionId {
        let name = declaration.name;
        let function = match site.owner {
            Some(class) => ctx.program.new_method(class, name, accessor.location, kind),
            None => ctx.program.new_function(name, accessor.location, kind, site.scope),
        };
        let is_override = ctx.program.properties[property].is_override;
        let is_abstract = site.in_interface(ctx);
        let def = &mut ctx.program.functions[function];
        def.visibility = declaration.visibility;
        def.is_override = is_override;
        def.is_abstract = is_abstract;
        self.expect_body(ctx, function, site, accessor.body.as_ref(), accessor.location);
        function
    }
}
