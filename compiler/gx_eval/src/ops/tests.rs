use gx_ir::{BinaryOp, IntKind, Name, Type, UnaryOp};
use pretty_assertions::assert_eq;

use super::*;
use crate::errors::Unwind;
use crate::value::Value;

fn eval(op: BinaryOp, l: Value, r: Value) -> Value {
    match evaluate_binary(op, &l, &r) {
        Ok(value) => value,
        Err(err) => panic!("{op:?} failed: {err:?}"),
    }
}

fn is_runtime_panic(result: ExecResult<Value>) -> bool {
    matches!(result, Err(Unwind::Panic(_)))
}

#[test]
fn mixed_int_kinds_adopt_declared_kind() {
    let result = eval(
        BinaryOp::Add,
        Value::int_of(IntKind::Uint8, 250),
        Value::int(10),
    );
    assert_eq!(result, Value::int_of(IntKind::Uint8, 4));
    let result = eval(
        BinaryOp::Mul,
        Value::int(3),
        Value::int_of(IntKind::Int64, 7),
    );
    assert_eq!(result, Value::int_of(IntKind::Int64, 21));
}

#[test]
fn int_and_float_unify_to_float() {
    assert_eq!(
        eval(BinaryOp::Div, Value::float(1.0), Value::int(4)),
        Value::float(0.25)
    );
    assert_eq!(
        eval(BinaryOp::Lt, Value::int(1), Value::float(1.5)),
        Value::Bool(true)
    );
}

#[test]
fn integer_division_by_zero_panics() {
    let result = evaluate_binary(BinaryOp::Div, &Value::int(1), &Value::int(0));
    assert!(is_runtime_panic(result));
    let result = evaluate_binary(BinaryOp::Rem, &Value::int(1), &Value::int(0));
    assert!(is_runtime_panic(result));
}

#[test]
fn float_division_by_zero_is_infinite() {
    assert_eq!(
        eval(BinaryOp::Div, Value::float(1.0), Value::float(0.0)),
        Value::float(f64::INFINITY)
    );
}

#[test]
fn min_int_divided_by_minus_one_wraps() {
    assert_eq!(
        eval(BinaryOp::Div, Value::int(i64::MIN), Value::int(-1)),
        Value::int(i64::MIN)
    );
    assert_eq!(
        eval(
            BinaryOp::Div,
            Value::int_of(IntKind::Int8, -128),
            Value::int_of(IntKind::Int8, -1)
        ),
        Value::int_of(IntKind::Int8, -128)
    );
}

#[test]
fn shifts_past_width() {
    let one = Value::int_of(IntKind::Uint32, 1);
    assert_eq!(
        eval(BinaryOp::Shl, one.clone(), Value::int(31)),
        Value::int_of(IntKind::Uint32, 1 << 31)
    );
    assert_eq!(
        eval(BinaryOp::Shl, one, Value::int(32)),
        Value::int_of(IntKind::Uint32, 0)
    );
    assert_eq!(
        eval(BinaryOp::Shr, Value::int(-8), Value::int(100)),
        Value::int(-1)
    );
    assert_eq!(
        eval(BinaryOp::Shr, Value::int(8), Value::int(64)),
        Value::int(0)
    );
    assert_eq!(
        eval(BinaryOp::Shr, Value::int(-8), Value::int(1)),
        Value::int(-4)
    );
}

#[test]
fn negative_shift_count_panics() {
    let result = evaluate_binary(BinaryOp::Shl, &Value::int(1), &Value::int(-1));
    assert!(is_runtime_panic(result));
}

#[test]
fn named_operand_type_carries_to_result() {
    let celsius = Name::from_raw(7);
    let result = eval(
        BinaryOp::Add,
        Value::named(celsius, Value::float(20.0)),
        Value::float(1.5),
    );
    assert_eq!(result, Value::named(celsius, Value::float(21.5)));
    let cmp = eval(
        BinaryOp::Gt,
        Value::named(celsius, Value::float(20.0)),
        Value::float(1.5),
    );
    assert_eq!(cmp, Value::Bool(true));
}

#[test]
fn string_concat_and_ordering() {
    assert_eq!(
        eval(BinaryOp::Add, Value::from("ab"), Value::from("cd")),
        Value::from("abcd")
    );
    assert_eq!(
        eval(BinaryOp::Lt, Value::from("abc"), Value::from("abd")),
        Value::Bool(true)
    );
}

#[test]
fn nil_comparisons() {
    use crate::value::{MapValue, SliceValue};
    assert_eq!(values_equal(&Value::Slice(SliceValue::nil()), &Value::Nil).ok(), Some(true));
    assert_eq!(
        values_equal(&Value::slice(vec![Value::int(1)]), &Value::Nil).ok(),
        Some(false)
    );
    assert_eq!(values_equal(&Value::Map(MapValue::new()), &Value::Nil).ok(), Some(false));
    assert_eq!(values_equal(&Value::Pointer(None), &Value::Nil).ok(), Some(true));
    assert_eq!(values_equal(&Value::error("x"), &Value::Nil).ok(), Some(false));
}

#[test]
fn comparing_two_slices_panics() {
    let a = Value::slice(vec![Value::int(1)]);
    let b = Value::slice(vec![Value::int(1)]);
    assert!(matches!(values_equal(&a, &b), Err(Unwind::Panic(_))));
}

#[test]
fn unary_operators() {
    assert_eq!(
        evaluate_unary(UnaryOp::Neg, &Value::int_of(IntKind::Int8, -128)).ok(),
        Some(Value::int_of(IntKind::Int8, -128))
    );
    assert_eq!(
        evaluate_unary(UnaryOp::BitNot, &Value::int_of(IntKind::Uint8, 0)).ok(),
        Some(Value::int_of(IntKind::Uint8, 255))
    );
    assert_eq!(
        evaluate_unary(UnaryOp::Not, &Value::Bool(true)).ok(),
        Some(Value::Bool(false))
    );
    assert!(matches!(
        evaluate_unary(UnaryOp::Not, &Value::int(1)),
        Err(Unwind::Fatal(_))
    ));
}

#[test]
fn table_resolves_only_basic_pairs() {
    let table = OperatorTable::new();
    assert!(table
        .resolve(&Type::INT, BinaryOp::Add, &Type::INT)
        .is_some());
    assert!(table
        .resolve(&Type::String, BinaryOp::Add, &Type::String)
        .is_some());
    assert!(table
        .resolve(&Type::String, BinaryOp::Sub, &Type::String)
        .is_none());
    assert!(table
        .resolve(&Type::Int(IntKind::Uint8), BinaryOp::Shl, &Type::INT)
        .is_some());
    assert!(table
        .resolve(&Type::Named(Name::from_raw(3)), BinaryOp::Add, &Type::INT)
        .is_none());
    assert!(table
        .resolve(&Type::INT, BinaryOp::Add, &Type::Float64)
        .is_none());
}

mod native {
    use gx_ir::{BinaryOp, IntKind};
    use proptest::prelude::*;

    use super::super::{OperatorTable, TypeKey};
    use crate::errors::Unwind;
    use crate::value::Value;

    fn apply(kind: TypeKey, op: BinaryOp, l: Value, r: Value) -> Result<Value, Unwind> {
        let table = OperatorTable::new();
        let Some(func) = table.get(kind, op, kind) else {
            panic!("missing table entry for {kind:?} {op:?}");
        };
        func(&l, &r)
    }

    macro_rules! int_matches_native {
        ($name:ident, $ty:ty, $kind:expr) => {
            mod $name {
                use super::*;

                fn int(v: $ty) -> Value {
                    Value::int_of($kind, i128::from(v))
                }

                fn check(op: BinaryOp, a: $ty, b: $ty, expected: Value) -> Result<(), TestCaseError> {
                    let got = apply(TypeKey::Int($kind), op, int(a), int(b));
                    prop_assert_eq!(got.ok(), Some(expected), "{:?} {} {:?}", a, op.as_symbol(), b);
                    Ok(())
                }

                proptest! {
                    #[test]
                    fn arithmetic(a in any::<$ty>(), b in any::<$ty>()) {
                        check(BinaryOp::Add, a, b, int(a.wrapping_add(b)))?;
                        check(BinaryOp::Sub, a, b, int(a.wrapping_sub(b)))?;
                        check(BinaryOp::Mul, a, b, int(a.wrapping_mul(b)))?;
                        check(BinaryOp::BitAnd, a, b, int(a & b))?;
                        check(BinaryOp::BitOr, a, b, int(a | b))?;
                        check(BinaryOp::BitXor, a, b, int(a ^ b))?;
                        check(BinaryOp::AndNot, a, b, int(a & !b))?;
                        if b == 0 {
                            let got = apply(TypeKey::Int($kind), BinaryOp::Div, int(a), int(b));
                            prop_assert!(matches!(got, Err(Unwind::Panic(_))));
                        } else {
                            check(BinaryOp::Div, a, b, int(a.wrapping_div(b)))?;
                            check(BinaryOp::Rem, a, b, int(a.wrapping_rem(b)))?;
                        }
                    }

                    #[test]
                    fn comparisons(a in any::<$ty>(), b in any::<$ty>()) {
                        check(BinaryOp::Eq, a, b, Value::Bool(a == b))?;
                        check(BinaryOp::NotEq, a, b, Value::Bool(a != b))?;
                        check(BinaryOp::Lt, a, b, Value::Bool(a < b))?;
                        check(BinaryOp::LtEq, a, b, Value::Bool(a <= b))?;
                        check(BinaryOp::Gt, a, b, Value::Bool(a > b))?;
                        check(BinaryOp::GtEq, a, b, Value::Bool(a >= b))?;
                    }

                    #[test]
                    fn shifts(a in any::<$ty>(), n in 0u32..80) {
                        let count = Value::int(i64::from(n));
                        let shl = apply(TypeKey::Int($kind), BinaryOp::Shl, int(a), count.clone());
                        prop_assert_eq!(shl.ok(), Some(int(a.checked_shl(n).unwrap_or(0))));
                        let fill = a >> (<$ty>::BITS - 1) >> 1;
                        let shr = apply(TypeKey::Int($kind), BinaryOp::Shr, int(a), count);
                        prop_assert_eq!(shr.ok(), Some(int(a.checked_shr(n).unwrap_or(fill))));
                    }
                }
            }
        };
    }

    int_matches_native!(int8, i8, IntKind::Int8);
    int_matches_native!(int16, i16, IntKind::Int16);
    int_matches_native!(int32, i32, IntKind::Int32);
    int_matches_native!(int64, i64, IntKind::Int64);
    int_matches_native!(uint8, u8, IntKind::Uint8);
    int_matches_native!(uint16, u16, IntKind::Uint16);
    int_matches_native!(uint32, u32, IntKind::Uint32);
    int_matches_native!(uint64, u64, IntKind::Uint64);

    proptest! {
        #[test]
        fn float32_matches_native(a in -1.0e6f32..1.0e6f32, b in -1.0e6f32..1.0e6f32) {
            let f = |v: f32| Value::Float32(v);
            let key = TypeKey::Float32;
            prop_assert_eq!(apply(key, BinaryOp::Add, f(a), f(b)).ok(), Some(f(a + b)));
            prop_assert_eq!(apply(key, BinaryOp::Sub, f(a), f(b)).ok(), Some(f(a - b)));
            prop_assert_eq!(apply(key, BinaryOp::Mul, f(a), f(b)).ok(), Some(f(a * b)));
            if b != 0.0 {
                prop_assert_eq!(apply(key, BinaryOp::Div, f(a), f(b)).ok(), Some(f(a / b)));
            }
            prop_assert_eq!(apply(key, BinaryOp::Lt, f(a), f(b)).ok(), Some(Value::Bool(a < b)));
            prop_assert_eq!(apply(key, BinaryOp::Eq, f(a), f(b)).ok(), Some(Value::Bool(a == b)));
        }

        #[test]
        fn float64_matches_native(a in -1.0e12f64..1.0e12f64, b in -1.0e12f64..1.0e12f64) {
            let f = Value::Float64;
            let key = TypeKey::Float64;
            prop_assert_eq!(apply(key, BinaryOp::Add, f(a), f(b)).ok(), Some(f(a + b)));
            prop_assert_eq!(apply(key, BinaryOp::Sub, f(a), f(b)).ok(), Some(f(a - b)));
            prop_assert_eq!(apply(key, BinaryOp::Mul, f(a), f(b)).ok(), Some(f(a * b)));
            if b != 0.0 {
                prop_assert_eq!(apply(key, BinaryOp::Div, f(a), f(b)).ok(), Some(f(a / b)));
            }
            prop_assert_eq!(apply(key, BinaryOp::GtEq, f(a), f(b)).ok(), Some(Value::Bool(a >= b)));
        }
    }
}
