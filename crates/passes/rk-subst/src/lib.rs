//! Generic type substitution
//!
//! A [`Substitution`] maps generic parameters to types. It is built from a
//! generic class and its instantiation arguments, or from an explicit pair of
//! parameter and argument lists (function generics), and applied structurally
//! through arrays, function signatures and instance arguments.

mod ancestor;
mod infer;

pub use ancestor::{instantiate_ancestor, member_view};
pub use infer::{InferError, infer};

use rk_it::{FnParam, GenericParamId, Program, TyId, TyKind, TypeTable};
use rustc_hash::FxHashMap;

/// Parameter-to-parameter links are followed at most this many times
const MAX_CHAIN: usize = 32;

/// Mapping from generic parameters to types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    map: FxHashMap<GenericParamId, TyId>,
}

impl Substitution {
    /// Empty substitution
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `params` with `args` positionally; extra entries on either side are ignored
    pub fn from_lists(params: &[GenericParamId], args: &[TyId]) -> Self {
        Self {
            map: params.iter().copied().zip(args.iter().copied()).collect(),
        }
    }

    /// Substitution of an instance type's class parameters by its arguments
    pub fn from_instance(program: &Program, ty: TyId) -> Self {
        match program.ty(ty) {
            TyKind::Instance { class, args } => {
                Self::from_lists(&program.classes[*class].generics, args)
            }
            _ => Self::new(),
        }
    }

    /// Map `param` to `ty`, replacing any earlier mapping
    pub fn insert(&mut self, param: GenericParamId, ty: TyId) {
        self.map.insert(param, ty);
    }

    /// Type `param` maps to
    pub fn get(&self, param: GenericParamId) -> Option<TyId> {
        self.map.get(&param).copied()
    }

    /// Whether `param` is mapped
    pub fn contains(&self, param: GenericParamId) -> bool {
        self.map.contains_key(&param)
    }

    /// Number of mapped parameters
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether nothing is mapped
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Add every mapping of `other` that is not already present
    pub fn extend(&mut self, other: &Self) {
        for (&param, &ty) in &other.map {
            self.map.entry(param).or_insert(ty);
        }
    }

    /// Substitute every mapped parameter occurring in `ty`
    ///
    /// A parameter mapped to another parameter is looked up again, so chains
    /// such as `T -> U -> int` resolve fully. Any other mapped type is used
    /// as is: `T -> T[]` applied to `T` gives `T[]`.
    pub fn apply(&self, types: &mut TypeTable, ty: TyId) -> TyId {
        if self.is_empty() {
            return ty;
        }
        self.apply_bounded(types, ty, 0)
    }

    fn apply_bounded(&self, types: &mut TypeTable, ty: TyId, depth: usize) -> TyId {
        match types.get(ty).clone() {
            TyKind::Param(param) => match self.get(param) {
                Some(mapped) if mapped != ty && depth < MAX_CHAIN && matches!(types.get(mapped), TyKind::Param(_)) => {
                    self.apply_bounded(types, mapped, depth + 1)
                }
                Some(mapped) => mapped,
                None => ty,
            },
            TyKind::Array {
                element,
                dimensions,
            } => {
                let element = self.apply_bounded(types, element, depth);
                types.intern(TyKind::Array {
                    element,
                    dimensions,
                })
            }
            TyKind::Function { params, ret } => {
                let params = params
                    .into_iter()
                    .map(|param| FnParam {
                        ty: self.apply_bounded(types, param.ty, depth),
                        by_ref: param.by_ref,
                    })
                    .collect();
                let ret = ret.map(|ret| self.apply_bounded(types, ret, depth));
                types.intern(TyKind::Function { params, ret })
            }
            TyKind::Instance { class, args } => {
                let args = args
                    .into_iter()
                    .map(|arg| self.apply_bounded(types, arg, depth))
                    .collect();
                types.intern(TyKind::Instance { class, args })
            }
            TyKind::Primitive(_) | TyKind::Class(_) | TyKind::Null | TyKind::Void | TyKind::Error => ty,
        }
    }

    /// Apply to a list of types
    pub fn apply_all(&self, types: &mut TypeTable, tys: &[TyId]) -> Vec<TyId> {
        tys.iter().map(|&ty| self.apply(types, ty)).collect()
    }
}

/// Whether `ty` mentions any generic parameter
pub fn mentions_params(types: &TypeTable, ty: TyId) -> bool {
    match types.get(ty) {
        TyKind::Param(_) => true,
        TyKind::Array { element, .. } => mentions_params(types, *element),
        TyKind::Function { params, ret } => {
            params.iter().any(|param| mentions_params(types, param.ty))
                || ret.is_some_and(|ret| mentions_params(types, ret))
        }
        TyKind::Instance { args, .. } => args.iter().any(|&arg| mentions_params(types, arg)),
        TyKind::Primitive(_) | TyKind::Class(_) | TyKind::Null | TyKind::Void | TyKind::Error => false,
    }
}
