//! Named entities and the scopes that hold them

use crate::body::{BlockData, Expr};
use crate::ty::{PrimitiveKind, TyId};
use crate::value::Value;
use indexmap::IndexMap;
use la_arena::Idx;
use rk_intern::Symbol;
use rk_span::SourceLocation;
use rk_syntax::Visibility;
use rustc_hash::FxHashMap;

/// Scope in [`crate::Program::scopes`]
pub type ScopeId = Idx<ScopeData>;
/// Class in [`crate::Program::classes`]
pub type ClassId = Idx<ClassDef>;
/// Function in [`crate::Program::functions`]
pub type FunctionId = Idx<FunctionDef>;
/// Variable in [`crate::Program::variables`]
pub type VariableId = Idx<VariableDef>;
/// Property in [`crate::Program::properties`]
pub type PropertyId = Idx<PropertyDef>;
/// Constant in [`crate::Program::constants`]
pub type ConstantId = Idx<ConstantDef>;
/// Generic parameter in [`crate::Program::generic_params`]
pub type GenericParamId = Idx<GenericParamDef>;
/// Block in [`crate::Program::blocks`]
pub type BlockId = Idx<BlockData>;

/// Anything that can be found by name in a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// Class, interface or enum
    Class(ClassId),
    /// Function or method
    Function(FunctionId),
    /// Global, field, local or parameter
    Variable(VariableId),
    /// Constant or enum member
    Constant(ConstantId),
    /// Property
    Property(PropertyId),
    /// Generic type parameter
    GenericParam(GenericParamId),
}

/// What a scope belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Root scope of a compilation unit
    Unit(Symbol),
    /// Member scope of a class
    Class(ClassId),
    /// Parameter and generic scope of a function
    Function(FunctionId),
    /// Block scope (hoisted nested declarations and local constants)
    Block(BlockId),
}

/// A namespace with a parent link
#[derive(Debug, Clone)]
pub struct ScopeData {
    /// Enclosing scope; `None` only for unit roots
    pub parent: Option<ScopeId>,
    /// Owner of the scope
    pub kind: ScopeKind,
    /// Directly declared entities
    pub entries: FxHashMap<Symbol, Entity>,
}

/// Class or interface flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Class or enum
    Class,
    /// Interface
    Interface,
}

/// Class, interface, enum or surrogate class
#[derive(Debug, Clone)]
pub struct ClassDef {
    /// Declared name
    pub name: Symbol,
    /// Declaration site
    pub location: SourceLocation,
    /// Declared visibility
    pub visibility: Visibility,
    /// Member scope; its parent is the declaring scope
    pub scope: ScopeId,
    /// Class or interface
    pub kind: ClassKind,
    /// Cannot be inherited from
    pub is_sealed: bool,
    /// Cannot be instantiated
    pub is_abstract: bool,
    /// Set for enums: the underlying primitive type
    pub enum_of: Option<PrimitiveKind>,
    /// Generic parameters in declaration order
    pub generics: Vec<GenericParamId>,
    /// Base class; `None` only for the root class and interfaces
    pub superclass: Option<TyId>,
    /// Implemented interfaces in declaration order
    pub interfaces: Vec<TyId>,
    /// Instance fields
    pub fields: IndexMap<Symbol, VariableId>,
    /// Methods, constructors and destructors
    pub methods: IndexMap<Symbol, FunctionId>,
    /// Properties
    pub properties: IndexMap<Symbol, PropertyId>,
    /// Constants and enum members
    pub constants: IndexMap<Symbol, ConstantId>,
    /// Function whose captured variables this class hosts
    pub surrogate_of: Option<FunctionId>,
    /// Surrogate of the enclosing closure's function, for multi-level captures
    pub outer: Option<ClassId>,
    /// Variables hosted by a surrogate
    pub captures: Vec<VariableId>,
    /// Inheritance validator bookkeeping
    pub checking: bool,
    /// Registered in its declaring scope
    pub attached: bool,
}

impl ClassDef {
    /// Public class with no members or bases
    pub fn new(name: Symbol, location: SourceLocation, scope: ScopeId, kind: ClassKind) -> Self {
        Self {
            name,
            location,
            visibility: Visibility::Public,
            scope,
            kind,
            is_sealed: false,
            is_abstract: false,
            enum_of: None,
            generics: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            fields: IndexMap::new(),
            methods: IndexMap::new(),
            properties: IndexMap::new(),
            constants: IndexMap::new(),
            surrogate_of: None,
            outer: None,
            captures: Vec::new(),
            checking: false,
            attached: true,
        }
    }

    /// Whether this is an interface
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Whether this is an enum
    pub fn is_enum(&self) -> bool {
        self.enum_of.is_some()
    }

    /// Whether this hosts captured variables
    pub fn is_surrogate(&self) -> bool {
        self.surrogate_of.is_some()
    }
}

/// Role of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Unit-level or hoisted function
    Free,
    /// Instance method
    Method,
    /// Runs when an instance is created
    Constructor,
    /// Runs when an instance is destroyed
    Destructor,
    /// Property getter
    Getter(PropertyId),
    /// Property setter
    Setter(PropertyId),
    /// Anonymous function
    Closure,
}

/// A function, method, accessor or closure
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Declared name
    pub name: Symbol,
    /// Declaration site
    pub location: SourceLocation,
    /// Declared visibility
    pub visibility: Visibility,
    /// Role
    pub kind: FunctionKind,
    /// Class the function is a member of
    pub owner: Option<ClassId>,
    /// Scope holding parameters and generic parameters
    pub scope: ScopeId,
    /// Generic parameters in declaration order
    pub generics: Vec<GenericParamId>,
    /// Parameters in declaration order
    pub params: Vec<VariableId>,
    /// Declared return type, `None` for no value
    pub return_type: Option<TyId>,
    /// Root block; `None` for abstract and interface members
    pub body: Option<BlockId>,
    /// Declared `override`
    pub is_override: bool,
    /// Declared `abstract`, or an interface member
    pub is_abstract: bool,
    /// Implicit `this` of methods, captured like any other variable
    pub this_var: Option<VariableId>,
    /// Class hosting this function's captured variables
    pub surrogate: Option<ClassId>,
    /// Function generic parameter to surrogate generic parameter
    pub surrogate_generics: Vec<(GenericParamId, GenericParamId)>,
}

impl FunctionDef {
    /// Public function without parameters, generics or body
    pub fn new(name: Symbol, location: SourceLocation, kind: FunctionKind, scope: ScopeId) -> Self {
        Self {
            name,
            location,
            visibility: Visibility::Public,
            kind,
            owner: None,
            scope,
            generics: Vec::new(),
            params: Vec::new(),
            return_type: None,
            body: None,
            is_override: false,
            is_abstract: false,
            this_var: None,
            surrogate: None,
            surrogate_generics: Vec::new(),
        }
    }

    /// Whether this is a constructor or destructor
    pub fn is_special(&self) -> bool {
        matches!(self.kind, FunctionKind::Constructor | FunctionKind::Destructor)
    }
}

/// Storage class of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Unit-level variable
    Global,
    /// Instance field
    Field(ClassId),
    /// Block-local variable
    Local(BlockId),
    /// Function parameter
    Parameter {
        /// Position in the parameter list
        index: usize,
        /// Passed by reference
        by_ref: bool,
    },
    /// Implicit receiver of a method
    This,
}

/// A variable of any storage class
#[derive(Debug, Clone)]
pub struct VariableDef {
    /// Declared name
    pub name: Symbol,
    /// Declaration site
    pub location: SourceLocation,
    /// Declared visibility
    pub visibility: Visibility,
    /// Declared or inferred type
    pub ty: TyId,
    /// Storage class
    pub kind: VariableKind,
    /// Function owning a local, parameter or `this`
    pub function: Option<FunctionId>,
    /// Referenced from a closure; lives in the owner's surrogate
    pub captured: bool,
    /// Lowered initializer of globals and fields
    pub initializer: Option<Expr>,
}

/// A property with optional accessors
#[derive(Debug, Clone)]
pub struct PropertyDef {
    /// Declared name
    pub name: Symbol,
    /// Declaration site
    pub location: SourceLocation,
    /// Declared visibility
    pub visibility: Visibility,
    /// Class the property is a member of
    pub owner: Option<ClassId>,
    /// Property type
    pub ty: TyId,
    /// Getter function
    pub getter: Option<FunctionId>,
    /// Setter function
    pub setter: Option<FunctionId>,
    /// Declared `override`
    pub is_override: bool,
}

/// Pending constant initializer
#[derive(Debug, Clone)]
pub struct LazyConstant {
    /// Raw initializer; `None` for enum members without a value
    pub expr: Option<rk_syntax::Expr>,
    /// Previous enum member, for `previous + 1` defaults
    pub previous: Option<ConstantId>,
}

/// Resolution state of a constant
#[derive(Debug, Clone)]
pub enum ConstantState {
    /// Not looked at yet
    Unresolved(LazyConstant),
    /// Being resolved; seeing this again means a cycle
    Resolving,
    /// Folded value
    Resolved(Value),
    /// Reported as an error; uses see the error type
    Failed,
}

/// A named compile-time constant or enum member
#[derive(Debug, Clone)]
pub struct ConstantDef {
    /// Declared name
    pub name: Symbol,
    /// Declaration site
    pub location: SourceLocation,
    /// Declared visibility
    pub visibility: Visibility,
    /// Scope the initializer is resolved in
    pub scope: ScopeId,
    /// Owning class or enum
    pub owner: Option<ClassId>,
    /// Declared type, or the enum type for members
    pub declared_ty: Option<TyId>,
    /// Final type; equals `declared_ty` when one was given
    pub ty: TyId,
    /// Resolution progress
    pub state: ConstantState,
}

impl ConstantDef {
    /// Folded value once resolved
    pub fn value(&self) -> Option<&Value> {
        match &self.state {
            ConstantState::Resolved(value) => Some(value),
            _ => None,
        }
    }
}

/// Owner of a generic parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericOwner {
    /// Parameter of a generic class
    Class(ClassId),
    /// Parameter of a generic function
    Function(FunctionId),
}

/// A generic type parameter
#[derive(Debug, Clone)]
pub struct GenericParamDef {
    /// Declared name
    pub name: Symbol,
    /// Declaration site
    pub location: SourceLocation,
    /// Declaring class or function
    pub owner: GenericOwner,
    /// Position in the owner's parameter list
    pub index: usize,
}
