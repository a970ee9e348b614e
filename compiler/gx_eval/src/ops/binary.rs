//! Binary operator family functions and runtime dispatch.

use std::rc::Rc;

use gx_ir::{BinaryOp, IntKind, Name};

use super::{BinaryFn, TypeKey};
use crate::errors::{
    integer_divide_by_zero, invalid_operation, negative_shift_amount, uncomparable, ExecResult,
};
use crate::value::{Complex, IntValue, Value};

// Operand extraction

fn ints(l: &Value, r: &Value, op: &str) -> ExecResult<(IntValue, IntValue)> {
    match (l.unwrap_named(), r.unwrap_named()) {
        (Value::Int(a), Value::Int(b)) => Ok((*a, *b)),
        (a, _) => Err(invalid_operation(op, a.kind_name()).into()),
    }
}

/// Float operands, plus whether the left operand is `float32`.
fn floats(l: &Value, r: &Value, op: &str) -> ExecResult<(f64, f64, bool)> {
    let single = matches!(l.unwrap_named(), Value::Float32(_));
    match (as_float(l.unwrap_named()), as_float(r.unwrap_named())) {
        (Some(a), Some(b)) => Ok((a, b, single)),
        _ => Err(invalid_operation(op, l.kind_name()).into()),
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(f) => Some(f64::from(*f)),
        Value::Float64(f) => Some(*f),
        Value::Int(i) => Some(i.as_f64()),
        _ => None,
    }
}

fn complexes(l: &Value, r: &Value, op: &str) -> ExecResult<(Complex, Complex, bool)> {
    match (l.unwrap_named(), r.unwrap_named()) {
        (Value::Complex64(a), Value::Complex64(b)) => Ok((*a, *b, true)),
        (Value::Complex128(a), Value::Complex128(b)) => Ok((*a, *b, false)),
        (a, _) => Err(invalid_operation(op, a.kind_name()).into()),
    }
}

fn strs<'a>(l: &'a Value, r: &'a Value, op: &str) -> ExecResult<(&'a str, &'a str)> {
    match (l.as_str(), r.as_str()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(invalid_operation(op, l.kind_name()).into()),
    }
}

fn bools(l: &Value, r: &Value, op: &str) -> ExecResult<(bool, bool)> {
    match (l.as_bool(), r.as_bool()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(invalid_operation(op, l.kind_name()).into()),
    }
}

#[inline]
fn float_result(value: f64, single: bool) -> Value {
    if single {
        Value::Float32(value as f32)
    } else {
        Value::Float64(value)
    }
}

// Integer family

fn int_add(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = ints(l, r, "+")?;
    Ok(Value::Int(IntValue::from_bits(a.kind(), a.bits().wrapping_add(b.bits()))))
}

fn int_sub(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = ints(l, r, "-")?;
    Ok(Value::Int(IntValue::from_bits(a.kind(), a.bits().wrapping_sub(b.bits()))))
}

fn int_mul(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = ints(l, r, "*")?;
    Ok(Value::Int(IntValue::from_bits(a.kind(), a.bits().wrapping_mul(b.bits()))))
}

fn int_div(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = ints(l, r, "/")?;
    if b.is_zero() {
        return Err(integer_divide_by_zero());
    }
    // Exact in i128; MinInt / -1 wraps back to MinInt on normalization.
    Ok(Value::Int(IntValue::new(a.kind(), a.as_i128() / b.as_i128())))
}

fn int_rem(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = ints(l, r, "%")?;
    if b.is_zero() {
        return Err(integer_divide_by_zero());
    }
    Ok(Value::Int(IntValue::new(a.kind(), a.as_i128() % b.as_i128())))
}

fn int_and(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = ints(l, r, "&")?;
    Ok(Value::Int(IntValue::from_bits(a.kind(), a.bits() & b.bits())))
}

fn int_or(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = ints(l, r, "|")?;
    Ok(Value::Int(IntValue::from_bits(a.kind(), a.bits() | b.bits())))
}

fn int_xor(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = ints(l, r, "^")?;
    Ok(Value::Int(IntValue::from_bits(a.kind(), a.bits() ^ b.bits())))
}

fn int_and_not(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = ints(l, r, "&^")?;
    Ok(Value::Int(IntValue::from_bits(a.kind(), a.bits() & !b.bits())))
}

fn shift_count(value: &Value, op: &str) -> ExecResult<u64> {
    match value.unwrap_named() {
        Value::Int(n) if n.is_negative() => Err(negative_shift_amount()),
        Value::Int(n) => Ok(n.as_u64()),
        Value::Float64(f) if f.fract() == 0.0 && *f >= 0.0 => Ok(*f as u64),
        other => Err(invalid_operation(op, other.kind_name()).into()),
    }
}

fn shift_operand(value: &Value, op: &str) -> ExecResult<IntValue> {
    value
        .as_int()
        .ok_or_else(|| invalid_operation(op, value.kind_name()).into())
}

fn int_shl(l: &Value, r: &Value) -> ExecResult<Value> {
    let a = shift_operand(l, "<<")?;
    let n = shift_count(r, "<<")?;
    let kind = a.kind();
    if n >= u64::from(kind.bits()) {
        return Ok(Value::Int(IntValue::new(kind, 0)));
    }
    Ok(Value::Int(IntValue::from_bits(kind, a.bits() << n)))
}

fn int_shr(l: &Value, r: &Value) -> ExecResult<Value> {
    let a = shift_operand(l, ">>")?;
    let n = shift_count(r, ">>")?;
    let kind = a.kind();
    if n >= u64::from(kind.bits()) {
        let fill = if a.is_negative() { -1 } else { 0 };
        return Ok(Value::Int(IntValue::new(kind, fill)));
    }
    Ok(Value::Int(if kind.is_signed() {
        IntValue::new(kind, i128::from(a.as_i64() >> n))
    } else {
        IntValue::from_bits(kind, a.as_u64() >> n)
    }))
}

macro_rules! int_compare {
    ($($name:ident => $op:tt),* $(,)?) => {
        $(
            fn $name(l: &Value, r: &Value) -> ExecResult<Value> {
                let (a, b) = ints(l, r, stringify!($op))?;
                Ok(Value::Bool(a.as_i128() $op b.as_i128()))
            }
        )*
    };
}

int_compare! {
    int_eq => ==,
    int_ne => !=,
    int_lt => <,
    int_le => <=,
    int_gt => >,
    int_ge => >=,
}

// Float family

macro_rules! float_arith {
    ($($name:ident => $op:tt),* $(,)?) => {
        $(
            fn $name(l: &Value, r: &Value) -> ExecResult<Value> {
                let (a, b, single) = floats(l, r, stringify!($op))?;
                Ok(float_result(a $op b, single))
            }
        )*
    };
}

float_arith! {
    float_add => +,
    float_sub => -,
    float_mul => *,
    float_div => /,
}

macro_rules! float_compare {
    ($($name:ident => $op:tt),* $(,)?) => {
        $(
            fn $name(l: &Value, r: &Value) -> ExecResult<Value> {
                let (a, b, _) = floats(l, r, stringify!($op))?;
                Ok(Value::Bool(a $op b))
            }
        )*
    };
}

float_compare! {
    float_eq => ==,
    float_ne => !=,
    float_lt => <,
    float_le => <=,
    float_gt => >,
    float_ge => >=,
}

// Complex family

fn complex_result(value: Complex, single: bool) -> Value {
    if single {
        Value::Complex64(value.narrow())
    } else {
        Value::Complex128(value)
    }
}

fn complex_add(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b, single) = complexes(l, r, "+")?;
    Ok(complex_result(a.add(b), single))
}

fn complex_sub(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b, single) = complexes(l, r, "-")?;
    Ok(complex_result(a.sub(b), single))
}

fn complex_mul(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b, single) = complexes(l, r, "*")?;
    Ok(complex_result(a.mul(b), single))
}

fn complex_div(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b, single) = complexes(l, r, "/")?;
    Ok(complex_result(a.div(b), single))
}

fn complex_eq(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b, _) = complexes(l, r, "==")?;
    Ok(Value::Bool(a == b))
}

fn complex_ne(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b, _) = complexes(l, r, "!=")?;
    Ok(Value::Bool(a != b))
}

// String family

fn str_concat(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = strs(l, r, "+")?;
    let mut joined = String::with_capacity(a.len() + b.len());
    joined.push_str(a);
    joined.push_str(b);
    Ok(Value::Str(Rc::from(joined)))
}

macro_rules! str_compare {
    ($($name:ident => $op:tt),* $(,)?) => {
        $(
            fn $name(l: &Value, r: &Value) -> ExecResult<Value> {
                let (a, b) = strs(l, r, stringify!($op))?;
                Ok(Value::Bool(a $op b))
            }
        )*
    };
}

str_compare! {
    str_eq => ==,
    str_ne => !=,
    str_lt => <,
    str_le => <=,
    str_gt => >,
    str_ge => >=,
}

// Bool family

fn bool_eq(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = bools(l, r, "==")?;
    Ok(Value::Bool(a == b))
}

fn bool_ne(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = bools(l, r, "!=")?;
    Ok(Value::Bool(a != b))
}

fn bool_and(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = bools(l, r, "&&")?;
    Ok(Value::Bool(a && b))
}

fn bool_or(l: &Value, r: &Value) -> ExecResult<Value> {
    let (a, b) = bools(l, r, "||")?;
    Ok(Value::Bool(a || b))
}

/// Family function for `op` on operands of category `key`.
pub fn family_fn(key: TypeKey, op: BinaryOp) -> Option<BinaryFn> {
    use BinaryOp as B;
    let func: BinaryFn = match (key, op) {
        (TypeKey::Int(_), B::Add) => int_add,
        (TypeKey::Int(_), B::Sub) => int_sub,
        (TypeKey::Int(_), B::Mul) => int_mul,
        (TypeKey::Int(_), B::Div) => int_div,
        (TypeKey::Int(_), B::Rem) => int_rem,
        (TypeKey::Int(_), B::BitAnd) => int_and,
        (TypeKey::Int(_), B::BitOr) => int_or,
        (TypeKey::Int(_), B::BitXor) => int_xor,
        (TypeKey::Int(_), B::AndNot) => int_and_not,
        (TypeKey::Int(_), B::Shl) => int_shl,
        (TypeKey::Int(_), B::Shr) => int_shr,
        (TypeKey::Int(_), B::Eq) => int_eq,
        (TypeKey::Int(_), B::NotEq) => int_ne,
        (TypeKey::Int(_), B::Lt) => int_lt,
        (TypeKey::Int(_), B::LtEq) => int_le,
        (TypeKey::Int(_), B::Gt) => int_gt,
        (TypeKey::Int(_), B::GtEq) => int_ge,

        (TypeKey::Float32 | TypeKey::Float64, B::Add) => float_add,
        (TypeKey::Float32 | TypeKey::Float64, B::Sub) => float_sub,
        (TypeKey::Float32 | TypeKey::Float64, B::Mul) => float_mul,
        (TypeKey::Float32 | TypeKey::Float64, B::Div) => float_div,
        (TypeKey::Float32 | TypeKey::Float64, B::Eq) => float_eq,
        (TypeKey::Float32 | TypeKey::Float64, B::NotEq) => float_ne,
        (TypeKey::Float32 | TypeKey::Float64, B::Lt) => float_lt,
        (TypeKey::Float32 | TypeKey::Float64, B::LtEq) => float_le,
        (TypeKey::Float32 | TypeKey::Float64, B::Gt) => float_gt,
        (TypeKey::Float32 | TypeKey::Float64, B::GtEq) => float_ge,

        (TypeKey::Complex64 | TypeKey::Complex128, B::Add) => complex_add,
        (TypeKey::Complex64 | TypeKey::Complex128, B::Sub) => complex_sub,
        (TypeKey::Complex64 | TypeKey::Complex128, B::Mul) => complex_mul,
        (TypeKey::Complex64 | TypeKey::Complex128, B::Div) => complex_div,
        (TypeKey::Complex64 | TypeKey::Complex128, B::Eq) => complex_eq,
        (TypeKey::Complex64 | TypeKey::Complex128, B::NotEq) => complex_ne,

        (TypeKey::String, B::Add) => str_concat,
        (TypeKey::String, B::Eq) => str_eq,
        (TypeKey::String, B::NotEq) => str_ne,
        (TypeKey::String, B::Lt) => str_lt,
        (TypeKey::String, B::LtEq) => str_le,
        (TypeKey::String, B::Gt) => str_gt,
        (TypeKey::String, B::GtEq) => str_ge,

        (TypeKey::Bool, B::Eq) => bool_eq,
        (TypeKey::Bool, B::NotEq) => bool_ne,
        (TypeKey::Bool, B::LogicalAnd) => bool_and,
        (TypeKey::Bool, B::LogicalOr) => bool_or,
        _ => return None,
    };
    Some(func)
}

// Runtime dispatch

/// Preference of an integer kind when unifying mixed operands. Untyped
/// constants default to `int` (and rune constants to `int32`), so the other
/// operand's kind is the declared one.
fn int_rank(kind: IntKind) -> u8 {
    match kind {
        IntKind::Int => 0,
        IntKind::Int32 => 1,
        _ => 2,
    }
}

/// Bring two unwrapped numeric operands to a common kind.
fn unify(l: &Value, r: &Value) -> (Value, Value) {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) if a.kind() != b.kind() => {
            let kind = if int_rank(b.kind()) > int_rank(a.kind()) {
                b.kind()
            } else {
                a.kind()
            };
            (Value::Int(a.with_kind(kind)), Value::Int(b.with_kind(kind)))
        }
        (Value::Int(a), Value::Float32(_)) => (Value::Float32(a.as_f64() as f32), r.clone()),
        (Value::Float32(_), Value::Int(b)) => (l.clone(), Value::Float32(b.as_f64() as f32)),
        (Value::Int(a), Value::Float64(_)) => (Value::Float64(a.as_f64()), r.clone()),
        (Value::Float64(_), Value::Int(b)) => (l.clone(), Value::Float64(b.as_f64())),
        (Value::Float64(a), Value::Float32(_)) => (Value::Float32(*a as f32), r.clone()),
        (Value::Float32(_), Value::Float64(b)) => (l.clone(), Value::Float32(*b as f32)),
        (Value::Complex128(a), Value::Complex64(_)) => (Value::Complex64(a.narrow()), r.clone()),
        (Value::Complex64(_), Value::Complex128(b)) => (l.clone(), Value::Complex64(b.narrow())),
        (Value::Complex128(_) | Value::Complex64(_), _) => {
            let single = matches!(l, Value::Complex64(_));
            (l.clone(), to_complex(r, single).unwrap_or_else(|| r.clone()))
        }
        (_, Value::Complex128(_) | Value::Complex64(_)) => {
            let single = matches!(r, Value::Complex64(_));
            (to_complex(l, single).unwrap_or_else(|| l.clone()), r.clone())
        }
        _ => (l.clone(), r.clone()),
    }
}

fn to_complex(value: &Value, single: bool) -> Option<Value> {
    let re = as_float(value)?;
    let c = Complex::new(re, 0.0);
    Some(if single {
        Value::Complex64(c.narrow())
    } else {
        Value::Complex128(c)
    })
}

fn named_type(value: &Value) -> Option<Name> {
    match value {
        Value::Named(named) => Some(named.type_name),
        _ => None,
    }
}

/// `left op right` with operand kinds discovered at run time.
///
/// Mixed integer widths, int/float and float/complex pairs are unified
/// first. A declared (named) operand type carries over to arithmetic
/// results.
pub fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> ExecResult<Value> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(values_equal(left, right)?)),
        BinaryOp::NotEq => return Ok(Value::Bool(!values_equal(left, right)?)),
        BinaryOp::Shl | BinaryOp::Shr => {
            let result = if op == BinaryOp::Shl {
                int_shl(left, right)?
            } else {
                int_shr(left, right)?
            };
            return Ok(match named_type(left) {
                Some(name) => Value::named(name, result),
                None => result,
            });
        }
        _ => {}
    }
    let (l, r) = unify(left.unwrap_named(), right.unwrap_named());
    let func = TypeKey::of_value(&l)
        .and_then(|key| family_fn(key, op))
        .ok_or_else(|| invalid_operation(op.as_symbol(), l.kind_name()))?;
    let result = func(&l, &r)?;
    if op.is_comparison() || op.is_logical() {
        return Ok(result);
    }
    Ok(match named_type(left).or_else(|| named_type(right)) {
        Some(name) => Value::named(name, result),
        None => result,
    })
}

/// Language-level `==`.
///
/// Panics (as a source-level panic) when both operands are non-nil values
/// of an uncomparable kind: slices, maps and functions.
pub fn values_equal(left: &Value, right: &Value) -> ExecResult<bool> {
    match (left, right) {
        (Value::Named(a), Value::Named(b)) => {
            Ok(a.type_name == b.type_name && values_equal(&a.inner, &b.inner)?)
        }
        (Value::Named(a), other) | (other, Value::Named(a)) => values_equal(&a.inner, other),
        (Value::Nil, other) | (other, Value::Nil) => Ok(other.is_nil()),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        (Value::Str(a), Value::Str(b)) => Ok(a == b),
        (
            Value::Int(_) | Value::Float32(_) | Value::Float64(_) | Value::Complex64(_)
            | Value::Complex128(_),
            Value::Int(_) | Value::Float32(_) | Value::Float64(_) | Value::Complex64(_)
            | Value::Complex128(_),
        ) => {
            let (l, r) = unify(left, right);
            match (&l, &r) {
                (Value::Int(a), Value::Int(b)) => Ok(a.as_i128() == b.as_i128()),
                (Value::Complex64(a), Value::Complex64(b))
                | (Value::Complex128(a), Value::Complex128(b)) => Ok(a == b),
                _ => Ok(as_float(&l) == as_float(&r)),
            }
        }
        (Value::Pointer(a), Value::Pointer(b)) => Ok(a == b),
        (Value::Chan(a), Value::Chan(b)) => Ok(match (a, b) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        }),
        (Value::Error(a), Value::Error(b)) => Ok(Rc::ptr_eq(a, b)),
        (Value::Struct(a), Value::Struct(b)) => {
            if a.type_name != b.type_name || a.layout.len() != b.layout.len() {
                return Ok(false);
            }
            let fa = a.fields.borrow().clone();
            let fb = b.fields.borrow().clone();
            for (x, y) in fa.iter().zip(fb.iter()) {
                if !values_equal(x, y)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return Ok(false);
            }
            for (x, y) in a.to_vec().iter().zip(b.to_vec().iter()) {
                if !values_equal(x, y)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Slice(a), Value::Slice(b)) if a.is_nil() || b.is_nil() => {
            Ok(a.is_nil() && b.is_nil())
        }
        (Value::Map(a), Value::Map(b)) if a.is_nil() || b.is_nil() => {
            Ok(a.is_nil() && b.is_nil())
        }
        (Value::Func(a), Value::Func(b)) if a.is_none() || b.is_none() => {
            Ok(a.is_none() && b.is_none())
        }
        (uncomparable_value @ (Value::Slice(_) | Value::Map(_) | Value::Func(_)), _) => {
            Err(uncomparable(uncomparable_value.kind_name()))
        }
        (Value::Package(a), Value::Package(b)) => Ok(Rc::ptr_eq(a, b)),
        _ => Ok(false),
    }
}
