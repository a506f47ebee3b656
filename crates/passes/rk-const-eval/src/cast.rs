//! Primitive-to-primitive conversion of literal values

use crate::FoldError;
use rk_it::{PrimitiveKind, Value};

/// Convert `value` to `target`
///
/// Integer narrowing truncates to the target width. Floating values converted
/// to integers must fit the target range. Conversions from `string` fold only
/// when the text parses; otherwise the cast is left for runtime.
///
/// # Errors
///
/// Returns [`FoldError::Overflow`] for floating values (including NaN) outside
/// the target integer range and for integers that are not valid characters.
pub fn fold_cast(value: &Value, target: PrimitiveKind) -> Result<Option<Value>, FoldError> {
    if value.kind() == Some(target) {
        return Ok(Some(value.clone()));
    }
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(parse(text, target)),
        Value::Bool(flag) => Ok(match target {
            PrimitiveKind::String => Some(Value::String(flag.to_string())),
            _ if target.is_integer() => Value::from_i128(target, i128::from(*flag)),
            _ => None,
        }),
        Value::Char(ch) => Ok(match target {
            PrimitiveKind::String => Some(Value::String(ch.to_string())),
            _ if target.is_integer() => Value::wrapping_from_i128(target, i128::from(u32::from(*ch))),
            _ => None,
        }),
        Value::Float(_) | Value::Double(_) => {
            let Some(number) = value.as_f64() else {
                return Ok(None);
            };
            from_float(number, value, target)
        }
        _ => {
            let Some(number) = value.as_i128() else {
                return Ok(None);
            };
            from_integer(number, value, target)
        }
    }
}

fn from_integer(number: i128, value: &Value, target: PrimitiveKind) -> Result<Option<Value>, FoldError> {
    Ok(match target {
        PrimitiveKind::Float => Some(Value::Float(number as f32)),
        PrimitiveKind::Double => Some(Value::Double(number as f64)),
        PrimitiveKind::Bool => Some(Value::Bool(number != 0)),
        PrimitiveKind::Char => {
            let code = u32::try_from(number).map_err(|_| FoldError::Overflow)?;
            Some(Value::Char(char::from_u32(code).ok_or(FoldError::Overflow)?))
        }
        PrimitiveKind::String => Some(Value::String(value.to_string())),
        _ => Value::wrapping_from_i128(target, number),
    })
}

fn from_float(number: f64, value: &Value, target: PrimitiveKind) -> Result<Option<Value>, FoldError> {
    Ok(match target {
        PrimitiveKind::Float => Some(Value::Float(number as f32)),
        PrimitiveKind::Double => Some(Value::Double(number)),
        PrimitiveKind::String => Some(Value::String(value.to_string())),
        PrimitiveKind::Bool | PrimitiveKind::Char => None,
        _ => {
            if number.is_nan() {
                return Err(FoldError::Overflow);
            }
            let truncated = number.trunc();
            let Some((low, high)) = target.integer_range() else {
                return Ok(None);
            };
            // `high as f64` rounds up to a power of two for 64-bit targets
            if truncated < low as f64 || truncated >= (high + 1) as f64 {
                return Err(FoldError::Overflow);
            }
            Some(Value::from_i128(target, truncated as i128).ok_or(FoldError::Overflow)?)
        }
    })
}

fn parse(text: &str, target: PrimitiveKind) -> Option<Value> {
    let text = text.trim();
    match target {
        PrimitiveKind::Float => text.parse().ok().map(Value::Float),
        PrimitiveKind::Double => text.parse().ok().map(Value::Double),
        PrimitiveKind::Bool => text.parse().ok().map(Value::Bool),
        PrimitiveKind::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Some(Value::Char(ch)),
                _ => None,
            }
        }
        PrimitiveKind::String => Some(Value::String(text.to_string())),
        _ => text
            .parse::<i128>()
            .ok()
            .and_then(|number| Value::from_i128(target, number)),
    }
}
