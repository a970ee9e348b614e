//! Explicit conversions `T(x)` and implicit assignment coercion.

use std::rc::Rc;

use gx_ir::{IntKind, Type};

use super::TypeTable;
use crate::errors::{invalid_operation, ExecResult};
use crate::value::{Complex, IntValue, SliceValue, StructValue, Value};

impl TypeTable {
    /// `ty(value)`.
    pub fn convert(&self, value: &Value, ty: &Type) -> ExecResult<Value> {
        if matches!(value, Value::Nil) {
            return Ok(self.zero_value(ty));
        }
        match ty {
            Type::Named(name) if !self.is_interface(ty) => {
                let underlying = self.resolve(ty);
                let inner = self.convert_to_literal(value.unwrap_named(), underlying)?;
                Ok(match inner {
                    Value::Struct(s) => Value::Struct(StructValue {
                        type_name: Some(*name),
                        ..s.deep_copy()
                    }),
                    other => Value::named(*name, other),
                })
            }
            Type::Interface(_) | Type::Named(_) => Ok(value.clone()),
            literal => self.convert_to_literal(value.unwrap_named(), literal),
        }
    }

    fn convert_to_literal(&self, value: &Value, ty: &Type) -> ExecResult<Value> {
        let converted = match (ty, value) {
            (Type::Int(kind), _) => match to_int(value, *kind) {
                Some(v) => v,
                None => return Err(self.cannot_convert(value, ty)),
            },
            (Type::Float32, _) => match to_float(value) {
                Some(f) => Value::Float32(f as f32),
                None => return Err(self.cannot_convert(value, ty)),
            },
            (Type::Float64, _) => match to_float(value) {
                Some(f) => Value::Float64(f),
                None => return Err(self.cannot_convert(value, ty)),
            },
            (Type::Complex64 | Type::Complex128, _) => {
                let c = match value {
                    Value::Complex64(c) | Value::Complex128(c) => *c,
                    other => match to_float(other) {
                        Some(re) => Complex::new(re, 0.0),
                        None => return Err(self.cannot_convert(value, ty)),
                    },
                };
                if matches!(ty, Type::Complex64) {
                    Value::Complex64(c.narrow())
                } else {
                    Value::Complex128(c)
                }
            }
            (Type::String, Value::Str(_)) => value.clone(),
            (Type::String, Value::Int(i)) => {
                let c = u32::try_from(i.as_i128())
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                Value::Str(Rc::from(c.to_string()))
            }
            (Type::String, Value::Slice(s)) => Value::Str(Rc::from(string_from_elements(&s.to_vec()))),
            (Type::Slice(elem), Value::Str(s)) => match self.resolve(elem) {
                Type::Int(IntKind::Uint8) => Value::Slice(SliceValue::from_vec(
                    s.bytes()
                        .map(|b| Value::int_of(IntKind::Uint8, i128::from(b)))
                        .collect(),
                )),
                Type::Int(IntKind::Int32) => Value::Slice(SliceValue::from_vec(
                    s.chars()
                        .map(|c| Value::int_of(IntKind::Int32, i128::from(u32::from(c))))
                        .collect(),
                )),
                _ => return Err(self.cannot_convert(value, ty)),
            },
            (Type::Bool, Value::Bool(_))
            | (Type::Slice(_), Value::Slice(_))
            | (Type::Array(..), Value::Array(_))
            | (Type::Map(..), Value::Map(_))
            | (Type::Pointer(_), Value::Pointer(_))
            | (Type::Chan(_), Value::Chan(_))
            | (Type::Func(_), Value::Func(_)) => value.clone(),
            (Type::Struct(_), Value::Struct(s)) => Value::Struct(StructValue {
                type_name: None,
                ..s.deep_copy()
            }),
            _ => return Err(self.cannot_convert(value, ty)),
        };
        Ok(converted)
    }

    fn cannot_convert(&self, value: &Value, ty: &Type) -> crate::errors::Unwind {
        invalid_operation(&format!("conversion to {}", self.type_name(ty)), value.kind_name()).into()
    }

    /// Implicit conversion of a value flowing into a slot of type `ty`.
    ///
    /// Untyped nil becomes the slot's zero value and untyped numeric
    /// constants take the slot's kind. Everything else passes through.
    pub fn coerce(&self, value: Value, ty: &Type) -> Value {
        if matches!(value, Value::Nil) {
            return self.zero_value(ty);
        }
        if matches!(value, Value::Named(_) | Value::Struct(_)) {
            return value;
        }
        match ty {
            Type::Named(name) => match self.resolve(ty) {
                Type::Struct(_) | Type::Interface(_) => value,
                underlying if underlying.is_basic() => {
                    if !is_numeric_like(&value) {
                        return value;
                    }
                    Value::named(*name, coerce_basic(value, underlying))
                }
                _ => Value::named(*name, value),
            },
            basic if basic.is_basic() => coerce_basic(value, basic),
            _ => value,
        }
    }
}

fn is_numeric_like(value: &Value) -> bool {
    matches!(
        value,
        Value::Int(_)
            | Value::Float32(_)
            | Value::Float64(_)
            | Value::Complex64(_)
            | Value::Complex128(_)
            | Value::Str(_)
            | Value::Bool(_)
    )
}

fn coerce_basic(value: Value, ty: &Type) -> Value {
    match (ty, &value) {
        (Type::Int(kind), Value::Int(i)) if i.kind() != *kind => Value::Int(i.with_kind(*kind)),
        (Type::Int(kind), Value::Float64(f)) if f.fract() == 0.0 => {
            Value::Int(IntValue::new(*kind, *f as i128))
        }
        (Type::Float32, Value::Int(i)) => Value::Float32(i.as_f64() as f32),
        (Type::Float32, Value::Float64(f)) => Value::Float32(*f as f32),
        (Type::Float64, Value::Int(i)) => Value::Float64(i.as_f64()),
        (Type::Float64, Value::Float32(f)) => Value::Float64(f64::from(*f)),
        (Type::Complex64, _) | (Type::Complex128, _) => {
            let c = match &value {
                Value::Complex64(c) | Value::Complex128(c) => *c,
                other => match to_float(other) {
                    Some(re) => Complex::new(re, 0.0),
                    None => return value,
                },
            };
            if matches!(ty, Type::Complex64) {
                Value::Complex64(c.narrow())
            } else {
                Value::Complex128(c)
            }
        }
        _ => value,
    }
}

fn to_int(value: &Value, kind: IntKind) -> Option<Value> {
    Some(Value::Int(match value {
        Value::Int(i) => i.with_kind(kind),
        Value::Float32(f) => IntValue::new(kind, f.trunc() as i128),
        Value::Float64(f) => IntValue::new(kind, f.trunc() as i128),
        _ => return None,
    }))
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(i.as_f64()),
        Value::Float32(f) => Some(f64::from(*f)),
        Value::Float64(f) => Some(*f),
        _ => None,
    }
}

/// `string(elems)` for byte and rune slices.
fn string_from_elements(elements: &[Value]) -> String {
    let is_bytes = elements
        .first()
        .and_then(Value::as_int)
        .is_some_and(|i| i.kind() == IntKind::Uint8);
    if is_bytes {
        let bytes: Vec<u8> = elements
            .iter()
            .filter_map(Value::as_int)
            .map(|i| i.as_u64() as u8)
            .collect();
        return String::from_utf8_lossy(&bytes).into_owned();
    }
    elements
        .iter()
        .filter_map(Value::as_int)
        .map(|i| {
            u32::try_from(i.as_i128())
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect()
}
