//! Declarations: compilation units, types, functions, variables

use crate::expr::Expr;
use crate::stmt::Block;
use crate::ty::TypeRef;
use crate::Visibility;
use rk_intern::Symbol;
use rk_span::{FileId, SourceLocation};

/// One parsed compilation unit (the root scope of a source unit)
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    /// Unit name, used for `global(Unit)` qualified references
    pub name: Symbol,
    /// Source file
    pub file: FileId,
    /// Top-level declarations in source order
    pub declarations: Vec<Declaration>,
}

/// A named declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Declared name
    pub name: Symbol,
    /// Visibility modifier
    pub visibility: Visibility,
    /// Source location
    pub location: SourceLocation,
    /// What is declared
    pub kind: DeclarationKind,
}

/// Kinds of declarations
#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationKind {
    /// Class or interface
    Class(ClassDecl),
    /// Enumeration over a primitive type
    Enum(EnumDecl),
    /// Function or method
    Function(FunctionDecl),
    /// Variable, field or constant
    Variable(VariableDecl),
    /// Property with accessors
    Property(PropertyDecl),
}

/// Class or interface declaration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassDecl {
    /// Declared as an interface
    pub is_interface: bool,
    /// Cannot be inherited from
    pub is_sealed: bool,
    /// Cannot be instantiated
    pub is_abstract: bool,
    /// Generic parameters
    pub generics: Vec<GenericParamDecl>,
    /// Base class and implemented interfaces, in source order
    pub bases: Vec<TypeRef>,
    /// Member declarations
    pub members: Vec<Declaration>,
}

/// Generic parameter declaration
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParamDecl {
    /// Parameter name
    pub name: Symbol,
    /// Source location
    pub location: SourceLocation,
}

/// Enumeration declaration
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    /// Underlying primitive type; defaults to `int`
    pub underlying: Option<TypeRef>,
    /// Members in declaration order
    pub members: Vec<EnumMemberDecl>,
}

/// Enumeration member
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberDecl {
    /// Member name
    pub name: Symbol,
    /// Explicit value
    pub value: Option<Expr>,
    /// Source location
    pub location: SourceLocation,
}

/// Function, method, constructor or destructor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionDecl {
    /// Generic parameters
    pub generics: Vec<GenericParamDecl>,
    /// Parameters
    pub params: Vec<ParamDecl>,
    /// Return type
    pub return_type: Option<TypeRef>,
    /// Body; `None` for interface and abstract members
    pub body: Option<Block>,
    /// Marked as overriding a base member
    pub is_override: bool,
    /// Declared abstract
    pub is_abstract: bool,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    /// Parameter name
    pub name: Symbol,
    /// Parameter type
    pub ty: TypeRef,
    /// Passed by reference
    pub by_ref: bool,
    /// Source location
    pub location: SourceLocation,
}

/// Variable, field or constant declaration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableDecl {
    /// Declared type
    pub ty: Option<TypeRef>,
    /// Initializer
    pub initializer: Option<Expr>,
    /// Declared `const`
    pub is_const: bool,
}

/// Property declaration
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    /// Property type
    pub ty: TypeRef,
    /// Getter accessor
    pub getter: Option<AccessorDecl>,
    /// Setter accessor
    pub setter: Option<AccessorDecl>,
    /// Marked as overriding a base member
    pub is_override: bool,
}

/// Property accessor
#[derive(Debug, Clone, PartialEq)]
pub struct AccessorDecl {
    /// Accessor body; `None` in interfaces
    pub body: Option<Block>,
    /// Source location
    pub location: SourceLocation,
}

impl DeclarationKind {
    /// Short description used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Class(class) if class.is_interface => "interface",
            Self::Class(_) => "class",
            Self::Enum(_) => "enum",
            Self::Function(_) => "function",
            Self::Variable(var) if var.is_const => "constant",
            Self::Variable(_) => "variable",
            Self::Property(_) => "property",
        }
    }
}
