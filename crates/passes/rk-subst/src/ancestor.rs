//! Viewing a type as one of its ancestors

use crate::Substitution;
use rk_it::{ClassId, Program, TyId};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// `ty` seen as an instance of `ancestor`
///
/// Walks superclasses and interfaces breadth first, substituting each class's
/// own parameters along the way, so `List<int>` viewed as `Iterator` yields
/// `Iterator<int>` when `List<T>` implements `Iterator<T>`.
pub fn instantiate_ancestor(program: &mut Program, ty: TyId, ancestor: ClassId) -> Option<TyId> {
    let mut pending = VecDeque::from([ty]);
    let mut seen = FxHashSet::default();
    while let Some(current) = pending.pop_front() {
        let class = program.class_of(current)?;
        if class == ancestor {
            return Some(current);
        }
        if !seen.insert(class) {
            continue;
        }
        let subst = Substitution::from_instance(program, current);
        let def = &program.classes[class];
        let bases: Vec<TyId> = def.superclass.into_iter().chain(def.interfaces.iter().copied()).collect();
        for base in bases {
            if program.class_of(base).is_some() {
                pending.push_back(subst.apply(&mut program.types, base));
            }
        }
    }
    None
}

/// Substitution turning types declared in `owner` into types seen through `receiver`
pub fn member_view(program: &mut Program, receiver: TyId, owner: ClassId) -> Substitution {
    instantiate_ancestor(program, receiver, owner)
        .map(|view| Substitution::from_instance(program, view))
        .unwrap_or_default()
}
