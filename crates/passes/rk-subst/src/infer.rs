//! Generic argument inference by structural matching

use crate::{Substitution, instantiate_ancestor};
use rk_it::{GenericParamId, Program, TyId, TyKind};
use thiserror::Error;

/// Inference failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferError {
    /// Two arguments demand different types for one parameter
    #[error("conflicting types inferred for a generic parameter")]
    Conflict {
        /// The parameter
        param: GenericParamId,
        /// Type inferred first
        first: TyId,
        /// Type inferred later
        second: TyId,
    },
}

/// Match `pattern` (mentioning `params`) against `actual`, recording bindings
///
/// Shapes that do not line up are skipped; the caller's type check reports
/// them. `null` and error types never bind a parameter.
///
/// # Errors
///
/// Returns [`InferError::Conflict`] when a parameter is already bound to a
/// different type.
pub fn infer(
    program: &mut Program,
    params: &[GenericParamId],
    pattern: TyId,
    actual: TyId,
    subst: &mut Substitution,
) -> Result<(), InferError> {
    if matches!(program.ty(actual), TyKind::Null | TyKind::Error) {
        return Ok(());
    }
    match program.ty(pattern).clone() {
        TyKind::Param(param) if params.contains(&param) => match subst.get(param) {
            Some(first) if first != actual => Err(InferError::Conflict {
                param,
                first,
                second: actual,
            }),
            Some(_) => Ok(()),
            None => {
                subst.insert(param, actual);
                Ok(())
            }
        },
        TyKind::Array {
            element,
            dimensions,
        } => match program.ty(actual).clone() {
            TyKind::Array {
                element: actual_element,
                dimensions: actual_dimensions,
            } if actual_dimensions == dimensions => {
                infer(program, params, element, actual_element, subst)
            }
            _ => Ok(()),
        },
        TyKind::Function { params: pattern_params, ret } => match program.ty(actual).clone() {
            TyKind::Function {
                params: actual_params,
                ret: actual_ret,
            } if actual_params.len() == pattern_params.len() => {
                for (expected, found) in pattern_params.iter().zip(&actual_params) {
                    infer(program, params, expected.ty, found.ty, subst)?;
                }
                if let (Some(ret), Some(actual_ret)) = (ret, actual_ret) {
                    infer(program, params, ret, actual_ret, subst)?;
                }
                Ok(())
            }
            _ => Ok(()),
        },
        TyKind::Instance { class, args } => {
            let Some(view) = instantiate_ancestor(program, actual, class) else {
                return Ok(());
            };
            let actual_args = program.type_args(view).to_vec();
            for (&expected, &found) in args.iter().zip(&actual_args) {
                infer(program, params, expected, found, subst)?;
            }
            Ok(())
        }
        TyKind::Param(_)
        | TyKind::Primitive(_)
        | TyKind::Class(_)
        | TyKind::Null
        | TyKind::Void
        | TyKind::Error => Ok(()),
    }
}
