//! Type references as written in source

use rk_intern::Symbol;
use rk_span::SourceLocation;

/// A type reference
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    /// Reference shape
    pub kind: TypeRefKind,
    /// Source location
    pub location: SourceLocation,
}

/// Shape of a type reference
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRefKind {
    /// `A#B#C<args>` or `global(Unit)#A<args>`
    Named {
        /// Explicit "global scope of unit X" prefix
        unit: Option<Symbol>,
        /// `#`-separated path, never empty
        path: Vec<Symbol>,
        /// Generic arguments applied to the last segment
        args: Vec<TypeRef>,
    },
    /// `T[]`, `T[,]`, ...
    Array {
        /// Element type
        element: Box<TypeRef>,
        /// Number of dimensions (at least one)
        dimensions: u32,
    },
    /// `function(ref int, string): bool`
    Function {
        /// Parameter types
        params: Vec<FnParamRef>,
        /// Optional return type
        ret: Option<Box<TypeRef>>,
    },
}

/// Parameter of a function type reference
#[derive(Debug, Clone, PartialEq)]
pub struct FnParamRef {
    /// Parameter type
    pub ty: TypeRef,
    /// Passed by reference
    pub by_ref: bool,
}

impl TypeRef {
    /// Single-segment name without generic arguments, if this is one
    pub fn simple_name(&self) -> Option<Symbol> {
        match &self.kind {
            TypeRefKind::Named { unit: None, path, args } if path.len() == 1 && args.is_empty() => {
                path.first().copied()
            }
            _ => None,
        }
    }
}
