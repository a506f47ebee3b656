//! Per-unit collector state, type skeletons and hierarchy wiring

use crate::inheritance::InheritanceValidator;
use crate::Pass;
use rk_intern::Symbol;
use rk_it::{
    ClassId, ClassKind, ConstantId, FunctionId, GenericOwner, InternalError, PrimitiveKind,
    Program, ScopeId, SemanticError, TyId, TyKind, VariableId,
};
use rk_lower::LoweringContext;
use rk_span::SourceLocation;
use rk_syntax::{Block, ClassDecl, CompilationUnit, Declaration, DeclarationKind, EnumDecl, GenericParamDecl};
use tracing::{debug, trace};

/// A class, interface or enum created by the skeleton pass
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingClass<'a> {
    pub class: ClassId,
    pub declaration: &'a Declaration,
}

/// A body waiting for the final pass
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingBody<'a> {
    pub function: FunctionId,
    pub body: &'a Block,
}

/// Collector for one list of declarations sharing a root scope
///
/// Usually a whole compilation unit; for declarations hoisted out of a
/// function body, a single declaration rooted in the block's scope.
#[derive(Debug)]
pub struct UnitCollector<'a> {
    declarations: &'a [Declaration],
    scope: ScopeId,
    pub(crate) classes: Vec<PendingClass<'a>>,
    validator: InheritanceValidator,
    pub(crate) bodies: Vec<PendingBody<'a>>,
    pub(crate) constants: Vec<ConstantId>,
    pub(crate) initializers: Vec<VariableId>,
}

impl<'a> UnitCollector<'a> {
    /// Collector for `declarations` rooted at `scope`
    pub fn new(declarations: &'a [Declaration], scope: ScopeId) -> Self {
        Self {
            declarations,
            scope,
            classes: Vec::new(),
            validator: InheritanceValidator::new(),
            bodies: Vec::new(),
            constants: Vec::new(),
            initializers: Vec::new(),
        }
    }

    /// Collector for `unit`, registering its root scope
    pub fn for_unit(program: &mut Program, unit: &'a CompilationUnit) -> Self {
        let scope = program.add_unit(unit.name);
        Self::new(&unit.declarations, scope)
    }

    /// Root scope of the collected declarations
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub(crate) fn declarations(&self) -> &'a [Declaration] {
        self.declarations
    }

    /// Run one pass
    ///
    /// # Errors
    ///
    /// Fails on internal invariant violations only; semantic errors are
    /// reported through `ctx`.
    pub fn run(&mut self, pass: Pass, ctx: &mut LoweringContext<'_>) -> Result<(), InternalError> {
        match pass {
            Pass::Skeletons => {
                self.collect_types(ctx, self.scope, self.declarations);
                debug!(classes = self.classes.len(), "type skeletons collected");
            }
            Pass::Hierarchy => {
                self.wire_hierarchy(ctx);
                let broken = self.validator.validate(ctx);
                debug!(classes = self.validator.len(), cycles = broken, "hierarchy wired");
            }
            Pass::Definitions => {
                self.define_members(ctx)?;
                debug!(
                    bodies = self.bodies.len(),
                    constants = self.constants.len(),
                    initializers = self.initializers.len(),
                    "members defined"
                );
            }
            Pass::Verification => self.verify_hierarchy(ctx),
            Pass::Constants => {
                for &constant in &self.constants {
                    ctx.resolve_constant(constant)?;
                }
            }
            Pass::Bodies => {
                for &variable in &self.initializers {
                    ctx.compile_initializer(variable)?;
                }
                for pending in &self.bodies {
                    ctx.compile_function(pending.function, pending.body)?;
                }
                debug!(functions = self.bodies.len(), "bodies compiled");
            }
        }
        Ok(())
    }

    // ---- skeletons ----

    fn collect_types(&mut self, ctx: &mut LoweringContext<'_>, scope: ScopeId, declarations: &'a [Declaration]) {
        for declaration in declarations {
            match &declaration.kind {
                DeclarationKind::Class(class) => {
                    let kind = if class.is_interface {
                        ClassKind::Interface
                    } else {
                        ClassKind::Class
                    };
                    let id = self.new_type(ctx, scope, declaration, kind);
                    let def = &mut ctx.program.classes[id];
                    def.is_sealed = class.is_sealed;
                    def.is_abstract = class.is_abstract;
                    add_generics(ctx, GenericOwner::Class(id), &class.generics);
                    let members = ctx.program.classes[id].scope;
                    self.collect_types(ctx, members, &class.members);
                }
                DeclarationKind::Enum(_) => {
                    let id = self.new_type(ctx, scope, declaration, ClassKind::Class);
                    let def = &mut ctx.program.classes[id];
                    def.is_sealed = true;
                    def.enum_of = Some(PrimitiveKind::Int);
                }
                DeclarationKind::Function(_) | DeclarationKind::Variable(_) | DeclarationKind::Property(_) => {}
            }
        }
    }

    fn new_type(
        &mut self,
        ctx: &mut LoweringContext<'_>,
        scope: ScopeId,
        declaration: &'a Declaration,
        kind: ClassKind,
    ) -> ClassId {
        check_reserved(ctx, declaration.name, declaration.location);
        let class = ctx.program.new_class(declaration.name, declaration.location, scope, kind);
        ctx.program.classes[class].visibility = declaration.visibility;
        if !ctx.program.attach_class(class, scope) {
            report_duplicate(ctx, declaration.name, declaration.location);
        }
        self.validator.track(class);
        self.classes.push(PendingClass { class, declaration });
        trace!(class = %ctx.program.name(declaration.name), "skeleton created");
        class
    }

    // ---- hierarchy ----

    fn wire_hierarchy(&self, ctx: &mut LoweringContext<'_>) {
        for pending in &self.classes {
            let location = pending.declaration.location;
            match &pending.declaration.kind {
                DeclarationKind::Class(decl) if decl.is_interface => {
                    if !decl.bases.is_empty() {
                        let interface = ctx.program.class_name(pending.class);
                        ctx.error(location, SemanticError::InterfaceWithBase { interface });
                    }
                }
                DeclarationKind::Class(decl) => wire_class(ctx, pending.class, decl, location),
                DeclarationKind::Enum(decl) => wire_enum(ctx, pending.class, decl),
                _ => {}
            }
        }
    }
}

/// Resolve the base types of a class: at most one superclass, any number of
/// interfaces, the root class when no superclass is named
fn wire_class(ctx: &mut LoweringContext<'_>, class: ClassId, decl: &ClassDecl, location: SourceLocation) {
    let scope = ctx.program.classes[class].scope;
    let mut superclass: Option<TyId> = None;
    let mut interfaces: Vec<TyId> = Vec::new();
    for base in &decl.bases {
        let ty = ctx.resolve_type(scope, base);
        if ctx.program.is_error(ty) {
            continue;
        }
        let Some(base_class) = ctx
            .program
            .class_of(ty)
            .filter(|&base_class| !ctx.program.classes[base_class].is_enum())
        else {
            let name = ctx.program.display_ty(ty);
            ctx.error(base.location, SemanticError::NotAClass { name });
            continue;
        };
        let class_name = ctx.program.class_name(class);
        if base_class == class {
            ctx.error(base.location, SemanticError::SelfInheritance { class: class_name });
            continue;
        }
        let base_def = &ctx.program.classes[base_class];
        if base_def.is_interface() {
            if !interfaces.contains(&ty) {
                interfaces.push(ty);
            }
        } else if base_def.is_sealed {
            let base = ctx.program.class_name(base_class);
            ctx.error(
                location,
                SemanticError::SealedBase {
                    class: class_name,
                    base,
                },
            );
        } else if superclass.is_some() {
            ctx.error(location, SemanticError::MultipleInheritance { class: class_name });
        } else {
            superclass = Some(ty);
        }
    }
    let superclass = match superclass {
        Some(ty) => ty,
        None => ctx.program.root_ty(),
    };
    let def = &mut ctx.program.classes[class];
    def.superclass = Some(superclass);
    def.interfaces = interfaces;
}

/// Enums derive from the root class over an integer primitive, `int` by default
fn wire_enum(ctx: &mut LoweringContext<'_>, class: ClassId, decl: &EnumDecl) {
    let scope = ctx.program.classes[class].scope;
    if let Some(underlying) = &decl.underlying {
        let ty = ctx.resolve_type(scope, underlying);
        match ctx.program.ty(ty) {
            TyKind::Primitive(kind) if kind.is_integer() => {
                ctx.program.classes[class].enum_of = Some(*kind);
            }
            TyKind::Error => {}
            _ => {
                let ty = ctx.program.display_ty(ty);
                ctx.error(underlying.location, SemanticError::InvalidEnumType { ty });
            }
        }
    }
    let root = ctx.program.root_ty();
    ctx.program.classes[class].superclass = Some(root);
}

/// Register generic parameters, reporting repeated names
pub(crate) fn add_generics(ctx: &mut LoweringContext<'_>, owner: GenericOwner, generics: &[GenericParamDecl]) {
    let scope = match owner {
        GenericOwner::Class(class) => ctx.program.classes[class].scope,
        GenericOwner::Function(function) => ctx.program.functions[function].scope,
    };
    for generic in generics {
        if ctx.program.lookup_in(scope, generic.name).is_some() {
            report_duplicate(ctx, generic.name, generic.location);
            continue;
        }
        ctx.program.add_generic_param(owner, generic.name, generic.location);
    }
}

pub(crate) fn is_reserved(ctx: &LoweringContext<'_>, name: Symbol) -> bool {
    let text = ctx.program.name(name);
    let options = ctx.options();
    text == options.constructor_name || text == options.destructor_name
}

/// Report use of a constructor or destructor name for anything else
pub(crate) fn check_reserved(ctx: &mut LoweringContext<'_>, name: Symbol, location: SourceLocation) {
    if is_reserved(ctx, name) {
        let name = ctx.program.name(name);
        ctx.error(location, SemanticError::ReservedIdentifier { name });
    }
}

pub(crate) fn report_duplicate(ctx: &mut LoweringContext<'_>, name: Symbol, location: SourceLocation) {
    let name = ctx.program.name(name);
    ctx.error(location, SemanticError::DuplicateDeclaration { name });
}
