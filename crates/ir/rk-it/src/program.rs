//! The compilation root
//!
//! [`Program`] owns every arena of the intermediate tree. Parent and owner
//! links are plain indices into these arenas, so the logical graph may contain
//! cycles (a block scope reaching a surrogate class that points back at the
//! function declaring the block) while ownership stays flat.

use crate::body::BlockData;
use crate::entity::{
    BlockId, ClassDef, ClassId, ClassKind, ConstantDef, Entity, FunctionDef, FunctionId,
    FunctionKind, GenericOwner, GenericParamDef, GenericParamId, PropertyDef, PropertyId,
    ScopeData, ScopeId, ScopeKind, VariableDef, VariableId, VariableKind,
};
use crate::ty::{FnParam, PrimitiveKind, TyId, TyKind, TypeTable};
use indexmap::IndexMap;
use la_arena::Arena;
use rk_intern::{Interner, Symbol};
use rk_span::SourceLocation;
use rk_syntax::Visibility;
use rustc_hash::{FxHashMap, FxHashSet};
use std::iter;

/// Name of the built-in unit
pub const PRELUDE_UNIT: &str = "$prelude";

/// Built-in classes every program starts with
#[derive(Debug, Clone, Copy)]
pub struct Prelude {
    /// Root scope of the built-in unit
    pub unit: ScopeId,
    /// Root of the class hierarchy
    pub object: ClassId,
    /// `Iterator<T>`, the capability `foreach` looks for
    pub iterator: ClassId,
    /// `Iterator.MoveNext`
    pub iterator_move_next: FunctionId,
    /// `Iterator.Current`
    pub iterator_current: PropertyId,
    /// Base of everything a typed catch clause may name
    pub exception: ClassId,
}

/// Interned names the lowering passes look up
#[derive(Debug, Clone, Copy)]
pub struct WellKnownNames {
    /// `GetIterator`
    pub get_iterator: Symbol,
    /// `MoveNext`
    pub move_next: Symbol,
    /// `Current`
    pub current: Symbol,
    /// `value`, the setter parameter
    pub value: Symbol,
    /// `this`
    pub this: Symbol,
    /// `debug`, an `ifdef` condition
    pub debug: Symbol,
    /// `release`, an `ifdef` condition
    pub release: Symbol,
}

/// Compilation root: all entities, scopes, blocks and types
#[derive(Debug)]
pub struct Program {
    /// Interner shared with the syntax tree
    pub interner: Interner,
    /// Interned types
    pub types: TypeTable,
    /// Every scope
    pub scopes: Arena<ScopeData>,
    /// Every class, interface, enum and surrogate
    pub classes: Arena<ClassDef>,
    /// Every function, accessor and closure
    pub functions: Arena<FunctionDef>,
    /// Every global, field, local and parameter
    pub variables: Arena<VariableDef>,
    /// Every property
    pub properties: Arena<PropertyDef>,
    /// Every constant and enum member
    pub constants: Arena<ConstantDef>,
    /// Every generic parameter
    pub generic_params: Arena<GenericParamDef>,
    /// Every lowered block
    pub blocks: Arena<BlockData>,
    /// Root scope of every unit by name
    pub units: IndexMap<Symbol, ScopeId>,
    /// Built-in classes
    pub prelude: Prelude,
    /// Names looked up by the lowering passes
    pub names: WellKnownNames,
}

impl Program {
    /// Program holding only the prelude
    pub fn new(interner: &Interner) -> Self {
        let names = WellKnownNames {
            get_iterator: interner.intern("GetIterator"),
            move_next: interner.intern("MoveNext"),
            current: interner.intern("Current"),
            value: interner.intern("value"),
            this: interner.intern("this"),
            debug: interner.intern("debug"),
            release: interner.intern("release"),
        };
        let mut scopes = Arena::default();
        let prelude_name = interner.intern(PRELUDE_UNIT);
        let unit = scopes.alloc(ScopeData {
            parent: None,
            kind: ScopeKind::Unit(prelude_name),
            entries: FxHashMap::default(),
        });
        let mut program = Self {
            interner: interner.clone(),
            types: TypeTable::new(),
            scopes,
            classes: Arena::default(),
            functions: Arena::default(),
            variables: Arena::default(),
            properties: Arena::default(),
            constants: Arena::default(),
            generic_params: Arena::default(),
            blocks: Arena::default(),
            units: IndexMap::new(),
            prelude: Prelude {
                unit,
                object: ClassId::from_raw(la_arena::RawIdx::from(0_u32)),
                iterator: ClassId::from_raw(la_arena::RawIdx::from(0_u32)),
                iterator_move_next: FunctionId::from_raw(la_arena::RawIdx::from(0_u32)),
                iterator_current: PropertyId::from_raw(la_arena::RawIdx::from(0_u32)),
                exception: ClassId::from_raw(la_arena::RawIdx::from(0_u32)),
            },
            names,
        };
        program.units.insert(prelude_name, unit);
        program.build_prelude();
        program
    }

    fn build_prelude(&mut self) {
        let unit = self.prelude.unit;
        let builtin = SourceLocation::builtin();

        let object = self.new_class(self.sym("Object"), builtin, unit, ClassKind::Class);
        self.attach_class(object, unit);

        let iterator = self.new_class(self.sym("Iterator"), builtin, unit, ClassKind::Interface);
        self.attach_class(iterator, unit);
        let element = self.add_generic_param(GenericOwner::Class(iterator), self.sym("T"), builtin);
        let element_ty = self.intern(TyKind::Param(element));
        let bool_ty = self.primitive(PrimitiveKind::Bool);

        let move_next = self.new_method(iterator, self.names.move_next, builtin, FunctionKind::Method);
        self.functions[move_next].return_type = Some(bool_ty);
        self.functions[move_next].is_abstract = true;

        let current = self.new_property(Some(iterator), self.names.current, builtin, element_ty);
        let getter = self.new_method(iterator, self.names.current, builtin, FunctionKind::Getter(current));
        self.functions[getter].return_type = Some(element_ty);
        self.functions[getter].is_abstract = true;
        self.properties[current].getter = Some(getter);

        let exception = self.new_class(self.sym("Exception"), builtin, unit, ClassKind::Class);
        self.attach_class(exception, unit);
        let object_ty = self.self_ty(object);
        self.classes[exception].superclass = Some(object_ty);
        let string_ty = self.primitive(PrimitiveKind::String);
        let message = self.sym("Message");
        let field = self.variables.alloc(VariableDef {
            name: message,
            location: builtin,
            visibility: Visibility::Public,
            ty: string_ty,
            kind: VariableKind::Field(exception),
            function: None,
            captured: false,
            initializer: None,
        });
        self.classes[exception].fields.insert(message, field);
        let scope = self.classes[exception].scope;
        self.declare(scope, message, Entity::Variable(field)).ok();

        self.prelude = Prelude {
            unit,
            object,
            iterator,
            iterator_move_next: move_next,
            iterator_current: current,
            exception,
        };
    }

    /// Intern `text`
    pub fn sym(&self, text: &str) -> Symbol {
        self.interner.intern(text)
    }

    /// Text of `sym`
    pub fn name(&self, sym: Symbol) -> String {
        self.interner.resolve(&sym)
    }

    // ---- scopes ----

    /// Register a unit, returning its root scope
    pub fn add_unit(&mut self, name: Symbol) -> ScopeId {
        if let Some(&scope) = self.units.get(&name) {
            return scope;
        }
        let scope = self.alloc_scope(None, ScopeKind::Unit(name));
        self.units.insert(name, scope);
        scope
    }

    /// New empty scope under `parent`
    pub fn alloc_scope(&mut self, parent: Option<ScopeId>, kind: ScopeKind) -> ScopeId {
        self.scopes.alloc(ScopeData {
            parent,
            kind,
            entries: FxHashMap::default(),
        })
    }

    /// Declare `name` in `scope`; on conflict the existing entity is returned
    pub fn declare(&mut self, scope: ScopeId, name: Symbol, entity: Entity) -> Result<(), Entity> {
        let entries = &mut self.scopes[scope].entries;
        if let Some(&existing) = entries.get(&name) {
            return Err(existing);
        }
        entries.insert(name, entity);
        Ok(())
    }

    /// Direct child of `scope` named `name`
    pub fn lookup_in(&self, scope: ScopeId, name: Symbol) -> Option<Entity> {
        self.scopes[scope].entries.get(&name).copied()
    }

    /// `scope` followed by every enclosing scope up to the unit root
    pub fn lineage(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        iter::successors(Some(scope), |&current| self.scopes[current].parent)
    }

    /// Root scope of the unit `scope` is in
    pub fn unit_of(&self, scope: ScopeId) -> ScopeId {
        self.lineage(scope).last().unwrap_or(scope)
    }

    /// Innermost class whose member scope encloses `scope`
    pub fn enclosing_class(&self, scope: ScopeId) -> Option<ClassId> {
        self.lineage(scope).find_map(|current| match self.scopes[current].kind {
            ScopeKind::Class(class) => Some(class),
            _ => None,
        })
    }

    /// Innermost function whose scope encloses `scope`
    pub fn enclosing_function(&self, scope: ScopeId) -> Option<FunctionId> {
        self.lineage(scope).find_map(|current| match self.scopes[current].kind {
            ScopeKind::Function(function) => Some(function),
            _ => None,
        })
    }

    /// Generic parameters visible from `scope`, innermost owner first
    pub fn stacked_generics(&self, scope: ScopeId) -> Vec<GenericParamId> {
        let mut stacked = Vec::new();
        for current in self.lineage(scope) {
            match self.scopes[current].kind {
                ScopeKind::Class(class) => stacked.extend(&self.classes[class].generics),
                ScopeKind::Function(function) => stacked.extend(&self.functions[function].generics),
                _ => {}
            }
        }
        stacked
    }

    // ---- entities ----

    /// Create a class with its member scope; the caller attaches it
    pub fn new_class(
        &mut self,
        name: Symbol,
        location: SourceLocation,
        parent: ScopeId,
        kind: ClassKind,
    ) -> ClassId {
        let scope = self.alloc_scope(Some(parent), ScopeKind::Unit(name));
        let class = self.classes.alloc(ClassDef::new(name, location, scope, kind));
        self.scopes[scope].kind = ScopeKind::Class(class);
        class
    }

    /// Register a class in its declaring scope
    pub fn attach_class(&mut self, class: ClassId, scope: ScopeId) -> bool {
        let name = self.classes[class].name;
        let attached = self.declare(scope, name, Entity::Class(class)).is_ok();
        self.classes[class].attached = attached;
        attached
    }

    /// Add a generic parameter at the end of `owner`'s list
    pub fn add_generic_param(
        &mut self,
        owner: GenericOwner,
        name: Symbol,
        location: SourceLocation,
    ) -> GenericParamId {
        let (scope, index) = match owner {
            GenericOwner::Class(class) => (
                self.classes[class].scope,
                self.classes[class].generics.len(),
            ),
            GenericOwner::Function(function) => (
                self.functions[function].scope,
                self.functions[function].generics.len(),
            ),
        };
        let param = self.generic_params.alloc(GenericParamDef {
            name,
            location,
            owner,
            index,
        });
        match owner {
            GenericOwner::Class(class) => self.classes[class].generics.push(param),
            GenericOwner::Function(function) => self.functions[function].generics.push(param),
        }
        self.declare(scope, name, Entity::GenericParam(param)).ok();
        param
    }

    /// Create a function with its parameter scope nested in `parent`
    pub fn new_function(
        &mut self,
        name: Symbol,
        location: SourceLocation,
        kind: FunctionKind,
        parent: ScopeId,
    ) -> FunctionId {
        let scope = self.alloc_scope(Some(parent), ScopeKind::Unit(name));
        let function = self
            .functions
            .alloc(FunctionDef::new(name, location, kind, scope));
        self.scopes[scope].kind = ScopeKind::Function(function);
        function
    }

    /// Create a method of `class`, with its implicit `this`
    pub fn new_method(
        &mut self,
        class: ClassId,
        name: Symbol,
        location: SourceLocation,
        kind: FunctionKind,
    ) -> FunctionId {
        let class_scope = self.classes[class].scope;
        let function = self.new_function(name, location, kind, class_scope);
        self.functions[function].owner = Some(class);
        let this_ty = self.self_ty(class);
        let this_var = self.variables.alloc(VariableDef {
            name: self.names.this,
            location,
            visibility: Visibility::Private,
            ty: this_ty,
            kind: VariableKind::This,
            function: Some(function),
            captured: false,
            initializer: None,
        });
        self.functions[function].this_var = Some(this_var);
        if matches!(kind, FunctionKind::Method | FunctionKind::Constructor | FunctionKind::Destructor) {
            self.classes[class].methods.insert(name, function);
            self.declare(class_scope, name, Entity::Function(function)).ok();
        }
        function
    }

    /// Append a parameter and declare it in the function scope
    pub fn add_param(
        &mut self,
        function: FunctionId,
        name: Symbol,
        ty: TyId,
        by_ref: bool,
        location: SourceLocation,
    ) -> Result<VariableId, Entity> {
        let index = self.functions[function].params.len();
        let param = self.variables.alloc(VariableDef {
            name,
            location,
            visibility: Visibility::Public,
            ty,
            kind: VariableKind::Parameter { index, by_ref },
            function: Some(function),
            captured: false,
            initializer: None,
        });
        let scope = self.functions[function].scope;
        self.declare(scope, name, Entity::Variable(param))?;
        self.functions[function].params.push(param);
        Ok(param)
    }

    /// Register a property of `owner`, without accessors
    pub fn new_property(
        &mut self,
        owner: Option<ClassId>,
        name: Symbol,
        location: SourceLocation,
        ty: TyId,
    ) -> PropertyId {
        let property = self.properties.alloc(PropertyDef {
            name,
            location,
            visibility: Visibility::Public,
            owner,
            ty,
            getter: None,
            setter: None,
            is_override: false,
        });
        if let Some(class) = owner {
            self.classes[class].properties.insert(name, property);
            let scope = self.classes[class].scope;
            self.declare(scope, name, Entity::Property(property)).ok();
        }
        property
    }

    /// Create a block with its own scope
    pub fn new_block(
        &mut self,
        parent_scope: ScopeId,
        parent: Option<BlockId>,
        function: Option<FunctionId>,
        location: SourceLocation,
    ) -> BlockId {
        let scope = self.alloc_scope(Some(parent_scope), ScopeKind::Unit(self.names.this));
        let block = self.blocks.alloc(BlockData {
            scope,
            parent,
            function,
            statements: Vec::new(),
            locals: IndexMap::new(),
            virtuals: IndexMap::new(),
            is_loop: false,
            name: None,
            transferable: true,
            continue_target: None,
            break_target: None,
            location,
        });
        self.scopes[scope].kind = ScopeKind::Block(block);
        block
    }

    /// Blocks from `block` up to the function root
    pub fn block_chain(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        iter::successors(Some(block), |&current| self.blocks[current].parent)
    }

    // ---- types ----

    /// Intern a type
    pub fn intern(&mut self, kind: TyKind) -> TyId {
        self.types.intern(kind)
    }

    /// Structure of `ty`
    pub fn ty(&self, ty: TyId) -> &TyKind {
        self.types.get(ty)
    }

    /// Primitive type of `kind`
    pub fn primitive(&mut self, kind: PrimitiveKind) -> TyId {
        self.intern(TyKind::Primitive(kind))
    }

    /// `int`
    pub fn int_ty(&mut self) -> TyId {
        self.primitive(PrimitiveKind::Int)
    }

    /// `bool`
    pub fn bool_ty(&mut self) -> TyId {
        self.primitive(PrimitiveKind::Bool)
    }

    /// `string`
    pub fn string_ty(&mut self) -> TyId {
        self.primitive(PrimitiveKind::String)
    }

    /// Type of expressions that failed to resolve
    pub fn error_ty(&mut self) -> TyId {
        self.intern(TyKind::Error)
    }

    /// Type of `null`
    pub fn null_ty(&mut self) -> TyId {
        self.intern(TyKind::Null)
    }

    /// Type of calls to functions without a return type
    pub fn void_ty(&mut self) -> TyId {
        self.intern(TyKind::Void)
    }

    /// Array of `element` with `dimensions` dimensions
    pub fn array_ty(&mut self, element: TyId, dimensions: u32) -> TyId {
        self.intern(TyKind::Array {
            element,
            dimensions,
        })
    }

    /// Function signature type
    pub fn function_ty(&mut self, params: Vec<FnParam>, ret: Option<TyId>) -> TyId {
        self.intern(TyKind::Function { params, ret })
    }

    /// Type of `this` inside `class`: generic classes apply their own parameters
    pub fn self_ty(&mut self, class: ClassId) -> TyId {
        let generics = self.classes[class].generics.clone();
        if generics.is_empty() {
            return self.intern(TyKind::Class(class));
        }
        let args = generics
            .into_iter()
            .map(|param| self.intern(TyKind::Param(param)))
            .collect();
        self.intern(TyKind::Instance { class, args })
    }

    /// Type of the root class
    pub fn root_ty(&mut self) -> TyId {
        self.intern(TyKind::Class(self.prelude.object))
    }

    /// Signature of a function as a function type
    pub fn signature_ty(&mut self, function: FunctionId) -> TyId {
        let params = self.functions[function]
            .params
            .iter()
            .map(|&param| {
                let variable = &self.variables[param];
                FnParam {
                    ty: variable.ty,
                    by_ref: matches!(variable.kind, VariableKind::Parameter { by_ref: true, .. }),
                }
            })
            .collect();
        let ret = self.functions[function].return_type;
        self.function_ty(params, ret)
    }

    /// Whether `ty` is the error type
    pub fn is_error(&self, ty: TyId) -> bool {
        matches!(self.ty(ty), TyKind::Error)
    }

    /// Class an instance type refers to
    pub fn class_of(&self, ty: TyId) -> Option<ClassId> {
        self.ty(ty).class()
    }

    /// Generic arguments of an instance type; empty otherwise
    pub fn type_args(&self, ty: TyId) -> &[TyId] {
        match self.ty(ty) {
            TyKind::Instance { args, .. } => args,
            _ => &[],
        }
    }

    /// Direct superclass, following instantiations
    pub fn superclass(&self, class: ClassId) -> Option<ClassId> {
        self.classes[class]
            .superclass
            .and_then(|ty| self.class_of(ty))
    }

    /// `class` and its superclasses, stopping at the root or a repeated class
    pub fn superclass_chain(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain = vec![class];
        let mut seen = FxHashSet::default();
        seen.insert(class);
        let mut current = class;
        while let Some(base) = self.superclass(current) {
            if !seen.insert(base) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }

    /// Whether `class` is `ancestor` or derives from it through classes or interfaces
    pub fn derives_from(&self, class: ClassId, ancestor: ClassId) -> bool {
        let mut pending = vec![class];
        let mut seen = FxHashSet::default();
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            let def = &self.classes[current];
            pending.extend(def.superclass.and_then(|ty| self.class_of(ty)));
            pending.extend(def.interfaces.iter().filter_map(|&ty| self.class_of(ty)));
        }
        false
    }

    /// Types whose values may be `null`
    pub fn is_reference(&self, ty: TyId) -> bool {
        match self.ty(ty) {
            TyKind::Class(class) => !self.classes[*class].is_enum(),
            TyKind::Instance { .. }
            | TyKind::Array { .. }
            | TyKind::Function { .. }
            | TyKind::Param(_)
            | TyKind::Null
            | TyKind::Error
            | TyKind::Primitive(PrimitiveKind::String) => true,
            TyKind::Primitive(_) | TyKind::Void => false,
        }
    }

    /// Underlying primitive of a primitive or enum type
    pub fn primitive_of(&self, ty: TyId) -> Option<PrimitiveKind> {
        match self.ty(ty) {
            TyKind::Primitive(kind) => Some(*kind),
            TyKind::Class(class) => self.classes[*class].enum_of,
            _ => None,
        }
    }

    /// Human-readable type, as used in diagnostics
    pub fn display_ty(&self, ty: TyId) -> String {
        match self.ty(ty) {
            TyKind::Primitive(kind) => kind.name().to_string(),
            TyKind::Array {
                element,
                dimensions,
            } => {
                let commas = ",".repeat(dimensions.saturating_sub(1) as usize);
                format!("{}[{commas}]", self.display_ty(*element))
            }
            TyKind::Function { params, ret } => {
                let params: Vec<String> = params
                    .iter()
                    .map(|param| {
                        let prefix = if param.by_ref { "ref " } else { "" };
                        format!("{prefix}{}", self.display_ty(param.ty))
                    })
                    .collect();
                let ret = ret.map_or_else(String::new, |ret| format!(": {}", self.display_ty(ret)));
                format!("function({}){ret}", params.join(", "))
            }
            TyKind::Class(class) => self.class_name(*class),
            TyKind::Instance { class, args } => {
                let args: Vec<String> = args.iter().map(|&arg| self.display_ty(arg)).collect();
                format!("{}<{}>", self.class_name(*class), args.join(", "))
            }
            TyKind::Param(param) => self.name(self.generic_params[*param].name),
            TyKind::Null => "null".to_string(),
            TyKind::Void => "void".to_string(),
            TyKind::Error => "<error>".to_string(),
        }
    }

    /// Name of `class`
    pub fn class_name(&self, class: ClassId) -> String {
        self.name(self.classes[class].name)
    }

    /// Name of `function`
    pub fn function_name(&self, function: FunctionId) -> String {
        self.name(self.functions[function].name)
    }
}
