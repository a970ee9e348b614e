//! `math`: a float64 subset.

use super::{expect_args, float_arg, HostPackage};
use crate::value::Value;

pub(super) fn package() -> HostPackage {
    HostPackage::new("math")
        .with_const("Pi", Value::Float64(std::f64::consts::PI))
        .with_const("E", Value::Float64(std::f64::consts::E))
        .with_const("MaxInt64", Value::int(i64::MAX))
        .with_const("MinInt64", Value::int(i64::MIN))
        .with_func("Sqrt", |_, args| unary("math.Sqrt", &args, f64::sqrt))
        .with_func("Abs", |_, args| unary("math.Abs", &args, f64::abs))
        .with_func("Floor", |_, args| unary("math.Floor", &args, f64::floor))
        .with_func("Ceil", |_, args| unary("math.Ceil", &args, f64::ceil))
        .with_func("Pow", |_, args| {
            binary("math.Pow", &args, f64::powf)
        })
        .with_func("Max", |_, args| {
            binary("math.Max", &args, |x, y| if x.is_nan() || y.is_nan() { f64::NAN } else { x.max(y) })
        })
        .with_func("Min", |_, args| {
            binary("math.Min", &args, |x, y| if x.is_nan() || y.is_nan() { f64::NAN } else { x.min(y) })
        })
        .with_func("Inf", |_, args| {
            expect_args("math.Inf", &args, 1)?;
            let sign = args[0].as_int().map_or(0, |i| i.as_i64());
            Ok(vec![Value::Float64(if sign >= 0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            })])
        })
        .with_func("IsNaN", |_, args| {
            expect_args("math.IsNaN", &args, 1)?;
            Ok(vec![Value::Bool(float_arg("math.IsNaN", &args, 0)?.is_nan())])
        })
}

fn unary(
    func: &str,
    args: &[Value],
    op: fn(f64) -> f64,
) -> crate::errors::ExecResult<Vec<Value>> {
    expect_args(func, args, 1)?;
    Ok(vec![Value::Float64(op(float_arg(func, args, 0)?))])
}

fn binary(
    func: &str,
    args: &[Value],
    op: impl Fn(f64, f64) -> f64,
) -> crate::errors::ExecResult<Vec<Value>> {
    expect_args(func, args, 2)?;
    let x = float_arg(func, args, 0)?;
    let y = float_arg(func, args, 1)?;
    Ok(vec![Value::Float64(op(x, y))])
}
