//! Binary and unary folding
//!
//! Every function returns `Ok(None)` when it declines to fold (operands of
//! different kinds, operators that make no sense for the kind, `null`), so
//! callers keep the unfolded expression.

use crate::FoldError;
use rk_it::{PrimitiveKind, Value};
use rk_syntax::{BinaryOp, UnaryOp};
use std::cmp::Ordering;
use std::ops::{Add, Div, Mul, Rem, Sub};

/// Fold `left op right`
///
/// # Errors
///
/// Returns [`FoldError::Overflow`] when a default-integer result leaves the
/// 64-bit signed range and [`FoldError::DivisionByZero`] for integer division
/// or remainder by zero.
pub fn fold_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Option<Value>, FoldError> {
    match op {
        BinaryOp::RefEq | BinaryOp::RefNe => return Ok(fold_reference_equality(op, left, right)),
        BinaryOp::Eq | BinaryOp::Ne if matches!((left, right), (Value::Null, Value::Null)) => {
            return Ok(Some(Value::Bool(op == BinaryOp::Eq)));
        }
        _ => {}
    }
    let (Some(kind), Some(right_kind)) = (left.kind(), right.kind()) else {
        return Ok(None);
    };
    if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
        return fold_shift(op, kind, left, right);
    }
    if kind != right_kind {
        return Ok(None);
    }
    match op {
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Ok(fold_comparison(op, left, right))
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => Ok(fold_boolean(op, left, right)),
        BinaryOp::Concat => Ok(match (left, right) {
            (Value::String(lhs), Value::String(rhs)) => Some(Value::String(format!("{lhs}{rhs}"))),
            _ => None,
        }),
        BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Mod
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor => fold_arithmetic(op, kind, left, right),
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::RefEq | BinaryOp::RefNe => Ok(None),
    }
}

/// Fold `op operand`
///
/// # Errors
///
/// Returns [`FoldError::Overflow`] when negating the smallest default integer.
pub fn fold_unary(op: UnaryOp, operand: &Value) -> Result<Option<Value>, FoldError> {
    let Some(kind) = operand.kind() else {
        return Ok(None);
    };
    match op {
        UnaryOp::Not => Ok(operand.as_bool().map(|value| Value::Bool(!value))),
        UnaryOp::Neg => match operand {
            Value::Float(value) => Ok(Some(Value::Float(-value))),
            Value::Double(value) => Ok(Some(Value::Double(-value))),
            Value::Int(value) => value
                .checked_neg()
                .map(|negated| Some(Value::Int(negated)))
                .ok_or(FoldError::Overflow),
            _ => Ok(operand
                .as_i128()
                .and_then(|value| Value::wrapping_from_i128(kind, value.wrapping_neg()))),
        },
        UnaryOp::BitNot => Ok(operand
            .as_i128()
            .and_then(|value| Value::wrapping_from_i128(kind, !value))),
    }
}

fn fold_reference_equality(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    let same = match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, Value::String(_)) | (Value::String(_), Value::Null) => false,
        _ => return None,
    };
    Some(Value::Bool(same == (op == BinaryOp::RefEq)))
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(lhs), Some(rhs)) = (left.as_i128(), right.as_i128()) {
        return Some(lhs.cmp(&rhs));
    }
    if let (Some(lhs), Some(rhs)) = (left.as_f64(), right.as_f64()) {
        return lhs.partial_cmp(&rhs);
    }
    match (left, right) {
        (Value::Char(lhs), Value::Char(rhs)) => Some(lhs.cmp(rhs)),
        (Value::String(lhs), Value::String(rhs)) => Some(lhs.cmp(rhs)),
        (Value::Bool(lhs), Value::Bool(rhs)) => Some(lhs.cmp(rhs)),
        _ => None,
    }
}

fn fold_comparison(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    if matches!(left, Value::Bool(_)) && !matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
        return None;
    }
    let Some(ordering) = compare(left, right) else {
        // NaN compares unequal to everything, including itself
        let nan = left.as_f64().is_some_and(f64::is_nan) || right.as_f64().is_some_and(f64::is_nan);
        return nan.then_some(Value::Bool(op == BinaryOp::Ne));
    };
    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => return None,
    };
    Some(Value::Bool(result))
}

fn fold_boolean(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    let (Some(lhs), Some(rhs)) = (left.as_bool(), right.as_bool()) else {
        return None;
    };
    Some(Value::Bool(match op {
        BinaryOp::And => lhs && rhs,
        BinaryOp::Or => lhs || rhs,
        BinaryOp::Xor => lhs != rhs,
        _ => return None,
    }))
}

fn fold_arithmetic(
    op: BinaryOp,
    kind: PrimitiveKind,
    left: &Value,
    right: &Value,
) -> Result<Option<Value>, FoldError> {
    match (left, right) {
        (Value::Float(lhs), Value::Float(rhs)) => Ok(float_op(op, *lhs, *rhs).map(Value::Float)),
        (Value::Double(lhs), Value::Double(rhs)) => Ok(float_op(op, *lhs, *rhs).map(Value::Double)),
        (Value::Int(lhs), Value::Int(rhs)) => checked_int_op(op, *lhs, *rhs).map(|value| value.map(Value::Int)),
        _ => {
            let (Some(lhs), Some(rhs)) = (left.as_i128(), right.as_i128()) else {
                return Ok(None);
            };
            let result = match op {
                BinaryOp::Add => lhs.wrapping_add(rhs),
                BinaryOp::Sub => lhs.wrapping_sub(rhs),
                BinaryOp::Mul => lhs.wrapping_mul(rhs),
                BinaryOp::Div => lhs.checked_div(rhs).ok_or(FoldError::DivisionByZero)?,
                BinaryOp::Mod => lhs.checked_rem(rhs).ok_or(FoldError::DivisionByZero)?,
                BinaryOp::BitAnd => lhs & rhs,
                BinaryOp::BitOr => lhs | rhs,
                BinaryOp::BitXor => lhs ^ rhs,
                _ => return Ok(None),
            };
            Ok(Value::wrapping_from_i128(kind, result))
        }
    }
}

/// Overflow-checked arithmetic of the default integer
fn checked_int_op(op: BinaryOp, lhs: i64, rhs: i64) -> Result<Option<i64>, FoldError> {
    let checked = match op {
        BinaryOp::Add => lhs.checked_add(rhs),
        BinaryOp::Sub => lhs.checked_sub(rhs),
        BinaryOp::Mul => lhs.checked_mul(rhs),
        BinaryOp::Div | BinaryOp::Mod if rhs == 0 => return Err(FoldError::DivisionByZero),
        BinaryOp::Div => lhs.checked_div(rhs),
        BinaryOp::Mod => lhs.checked_rem(rhs),
        BinaryOp::BitAnd => Some(lhs & rhs),
        BinaryOp::BitOr => Some(lhs | rhs),
        BinaryOp::BitXor => Some(lhs ^ rhs),
        _ => return Ok(None),
    };
    checked.map_or(Err(FoldError::Overflow), |value| Ok(Some(value)))
}

fn float_op<Float>(op: BinaryOp, lhs: Float, rhs: Float) -> Option<Float>
where
    Float: Add<Output = Float> + Sub<Output = Float> + Mul<Output = Float> + Div<Output = Float> + Rem<Output = Float>,
{
    Some(match op {
        BinaryOp::Add => lhs + rhs,
        BinaryOp::Sub => lhs - rhs,
        BinaryOp::Mul => lhs * rhs,
        BinaryOp::Div => lhs / rhs,
        BinaryOp::Mod => lhs % rhs,
        _ => return None,
    })
}

fn fold_shift(
    op: BinaryOp,
    kind: PrimitiveKind,
    left: &Value,
    right: &Value,
) -> Result<Option<Value>, FoldError> {
    let (Some(value), Some(amount)) = (left.as_i128(), right.as_i128()) else {
        return Ok(None);
    };
    let bits = kind.bits();
    if kind == PrimitiveKind::Int {
        let Ok(amount) = u32::try_from(amount) else {
            return Err(FoldError::Overflow);
        };
        if amount >= bits {
            return Err(FoldError::Overflow);
        }
        let value = value as i64;
        let shifted = if op == BinaryOp::Shl {
            value.checked_shl(amount).filter(|shifted| shifted >> amount == value)
        } else {
            Some(value >> amount)
        };
        return shifted.map_or(Err(FoldError::Overflow), |shifted| Ok(Some(Value::Int(shifted))));
    }
    let amount = (amount.rem_euclid(i128::from(bits))) as u32;
    let shifted = if op == BinaryOp::Shl {
        value << amount
    } else {
        value >> amount
    };
    Ok(Value::wrapping_from_i128(kind, shifted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sized_integers_wrap() {
        assert_eq!(
            fold_binary(BinaryOp::Add, &Value::I32(i32::MAX), &Value::I32(1)),
            Ok(Some(Value::I32(i32::MIN)))
        );
        assert_eq!(
            fold_binary(BinaryOp::Mul, &Value::U8(200), &Value::U8(2)),
            Ok(Some(Value::U8(144)))
        );
        assert_eq!(
            fold_binary(BinaryOp::Sub, &Value::U64(0), &Value::U64(1)),
            Ok(Some(Value::U64(u64::MAX)))
        );
        assert_eq!(
            fold_binary(BinaryOp::Mul, &Value::U64(u64::MAX), &Value::U64(u64::MAX)),
            Ok(Some(Value::U64(1)))
        );
    }

    #[test]
    fn test_default_integer_is_checked() {
        assert_eq!(
            fold_binary(BinaryOp::Add, &Value::Int(i64::MAX), &Value::Int(1)),
            Err(FoldError::Overflow)
        );
        assert_eq!(
            fold_binary(BinaryOp::Div, &Value::Int(i64::MIN), &Value::Int(-1)),
            Err(FoldError::Overflow)
        );
        assert_eq!(
            fold_binary(BinaryOp::Mul, &Value::Int(-4), &Value::Int(5)),
            Ok(Some(Value::Int(-20)))
        );
        assert_eq!(fold_unary(UnaryOp::Neg, &Value::Int(i64::MIN)), Err(FoldError::Overflow));
    }

    /// Wraparound for 32-bit and overflow detection for the default integer
    /// agree with direct evaluation over a spread of operands.
    #[test]
    fn test_fold_matches_direct_evaluation() {
        let samples: [i64; 9] = [
            0,
            1,
            -1,
            7,
            -46_341,
            65_536,
            i64::from(i32::MAX),
            i64::from(i32::MIN),
            3_037_000_500,
        ];
        for &lhs in &samples {
            for &rhs in &samples {
                for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul] {
                    let (lhs32, rhs32) = (lhs as i32, rhs as i32);
                    let expected = match op {
                        BinaryOp::Add => lhs32.wrapping_add(rhs32),
                        BinaryOp::Sub => lhs32.wrapping_sub(rhs32),
                        _ => lhs32.wrapping_mul(rhs32),
                    };
                    assert_eq!(
                        fold_binary(op, &Value::I32(lhs32), &Value::I32(rhs32)),
                        Ok(Some(Value::I32(expected)))
                    );

                    let exact = match op {
                        BinaryOp::Add => i128::from(lhs) + i128::from(rhs),
                        BinaryOp::Sub => i128::from(lhs) - i128::from(rhs),
                        _ => i128::from(lhs) * i128::from(rhs),
                    };
                    let folded = fold_binary(op, &Value::Int(lhs), &Value::Int(rhs));
                    match i64::try_from(exact) {
                        Ok(exact) => assert_eq!(folded, Ok(Some(Value::Int(exact)))),
                        Err(_) => assert_eq!(folded, Err(FoldError::Overflow)),
                    }
                }
            }
        }
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            fold_binary(BinaryOp::Div, &Value::Int(1), &Value::Int(0)),
            Err(FoldError::DivisionByZero)
        );
        assert_eq!(
            fold_binary(BinaryOp::Mod, &Value::I16(1), &Value::I16(0)),
            Err(FoldError::DivisionByZero)
        );
        let Ok(Some(Value::Double(result))) =
            fold_binary(BinaryOp::Div, &Value::Double(1.0), &Value::Double(0.0))
        else {
            panic!("floating division folds");
        };
        assert!(result.is_infinite());
    }

    #[test]
    fn test_boolean_or_is_disjunction() {
        assert_eq!(
            fold_binary(BinaryOp::Or, &Value::Bool(true), &Value::Bool(false)),
            Ok(Some(Value::Bool(true)))
        );
        assert_eq!(
            fold_binary(BinaryOp::And, &Value::Bool(true), &Value::Bool(false)),
            Ok(Some(Value::Bool(false)))
        );
        assert_eq!(
            fold_binary(BinaryOp::Xor, &Value::Bool(true), &Value::Bool(true)),
            Ok(Some(Value::Bool(false)))
        );
    }

    #[test]
    fn test_declines_mismatched_kinds() {
        assert_eq!(fold_binary(BinaryOp::Add, &Value::Int(1), &Value::I32(1)), Ok(None));
        assert_eq!(fold_binary(BinaryOp::Add, &Value::Null, &Value::Int(1)), Ok(None));
        assert_eq!(fold_binary(BinaryOp::Lt, &Value::Bool(true), &Value::Bool(false)), Ok(None));
        assert_eq!(fold_unary(UnaryOp::Not, &Value::Int(0)), Ok(None));
    }

    #[test]
    fn test_comparisons_and_concatenation() {
        assert_eq!(
            fold_binary(BinaryOp::Le, &Value::Char('a'), &Value::Char('b')),
            Ok(Some(Value::Bool(true)))
        );
        assert_eq!(
            fold_binary(BinaryOp::Concat, &Value::String("ab".into()), &Value::String("cd".into())),
            Ok(Some(Value::String("abcd".into())))
        );
        assert_eq!(
            fold_binary(BinaryOp::Eq, &Value::Double(f64::NAN), &Value::Double(f64::NAN)),
            Ok(Some(Value::Bool(false)))
        );
        assert_eq!(
            fold_binary(BinaryOp::RefEq, &Value::Null, &Value::Null),
            Ok(Some(Value::Bool(true)))
        );
    }

    #[test]
    fn test_shifts() {
        assert_eq!(
            fold_binary(BinaryOp::Shl, &Value::U8(0x81), &Value::Int(1)),
            Ok(Some(Value::U8(0x02)))
        );
        assert_eq!(
            fold_binary(BinaryOp::Shl, &Value::Int(1), &Value::Int(64)),
            Err(FoldError::Overflow)
        );
        assert_eq!(
            fold_binary(BinaryOp::Shr, &Value::Int(-8), &Value::Int(1)),
            Ok(Some(Value::Int(-4)))
        );
    }

    #[test]
    fn test_unary_bit_not_and_negation() {
        assert_eq!(fold_unary(UnaryOp::BitNot, &Value::U8(0)), Ok(Some(Value::U8(255))));
        assert_eq!(fold_unary(UnaryOp::Neg, &Value::I8(i8::MIN)), Ok(Some(Value::I8(i8::MIN))));
        assert_eq!(fold_unary(UnaryOp::Neg, &Value::Float(2.5)), Ok(Some(Value::Float(-2.5))));
    }
}
