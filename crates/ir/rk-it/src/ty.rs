//! Type model
//!
//! Types are hash-consed in a [`TypeTable`]: structurally equal types always
//! receive the same [`TyId`], so type equality is id equality.

use crate::entity::{ClassId, GenericParamId};
use la_arena::{Arena, Idx};
use rustc_hash::FxHashMap;

/// Interned type handle
pub type TyId = Idx<TyKind>;

/// Built-in primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// Default integer: 64 bits, overflow-checked
    Int,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `bool`
    Bool,
    /// `char`
    Char,
    /// `string`
    String,
}

impl PrimitiveKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 14] = [
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::Int,
        Self::Float,
        Self::Double,
        Self::Bool,
        Self::Char,
        Self::String,
    ];

    /// Source spelling
    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::String => "string",
        }
    }

    /// Kind spelled `name`
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether this is a sized or the default integer
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::Int
        )
    }

    /// Whether an integer kind is signed
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::Int
        )
    }

    /// `float` or `double`
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Integer or floating point
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Width in bits of an integer kind
    pub fn bits(self) -> u32 {
        match self {
            Self::I8 | Self::U8 => 8,
            Self::I16 | Self::U16 => 16,
            Self::I32 | Self::U32 | Self::Float | Self::Char => 32,
            Self::I64 | Self::U64 | Self::Int | Self::Double => 64,
            Self::Bool => 1,
            Self::String => 0,
        }
    }

    /// Inclusive value range of an integer kind
    pub fn integer_range(self) -> Option<(i128, i128)> {
        if !self.is_integer() {
            return None;
        }
        let bits = self.bits();
        Some(if self.is_signed() {
            (-(1_i128 << (bits - 1)), (1_i128 << (bits - 1)) - 1)
        } else {
            (0, (1_i128 << bits) - 1)
        })
    }
}

/// Function type parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnParam {
    /// Parameter type
    pub ty: TyId,
    /// Passed by reference
    pub by_ref: bool,
}

/// Structural type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TyKind {
    /// Primitive type
    Primitive(PrimitiveKind),
    /// Array of `dimensions` dimensions
    Array {
        /// Element type
        element: TyId,
        /// Number of dimensions
        dimensions: u32,
    },
    /// Function signature
    Function {
        /// Parameters in order
        params: Vec<FnParam>,
        /// Return type, if any
        ret: Option<TyId>,
    },
    /// Non-generic class, interface or enum
    Class(ClassId),
    /// Generic class applied to arguments
    Instance {
        /// Generic definition
        class: ClassId,
        /// One argument per generic parameter
        args: Vec<TyId>,
    },
    /// Generic parameter placeholder
    Param(GenericParamId),
    /// Type of the `null` literal
    Null,
    /// Result of calling a function without a return type
    Void,
    /// Placeholder after a reported error; compatible with everything
    Error,
}

impl TyKind {
    /// The class behind a class or instance type
    pub fn class(&self) -> Option<ClassId> {
        match self {
            Self::Class(class) | Self::Instance { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// The kind of a primitive type
    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Hash-consed type storage
#[derive(Debug, Default)]
pub struct TypeTable {
    types: Arena<TyKind>,
    interned: FxHashMap<TyKind, TyId>,
}

impl TypeTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a type, returning the existing id for a structurally equal one
    pub fn intern(&mut self, kind: TyKind) -> TyId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = self.types.alloc(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    /// Structure of `id`
    pub fn get(&self, id: TyId) -> &TyKind {
        &self.types[id]
    }

    /// Number of distinct types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing was interned
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
