//! Unary operators on values. Dereference, address-of and receive are
//! VM steps, not value operators.

use gx_ir::UnaryOp;

use crate::errors::{invalid_operation, ExecResult};
use crate::value::{IntValue, Value};

/// `op operand`. Named operand types carry over to the result.
pub fn evaluate_unary(op: UnaryOp, operand: &Value) -> ExecResult<Value> {
    if let Value::Named(named) = operand {
        let inner = evaluate_unary(op, &named.inner)?;
        return Ok(Value::named(named.type_name, inner));
    }
    let result = match (op, operand) {
        (UnaryOp::Plus, value @ (Value::Int(_)
        | Value::Float32(_)
        | Value::Float64(_)
        | Value::Complex64(_)
        | Value::Complex128(_))) => value.clone(),
        (UnaryOp::Neg, Value::Int(i)) => {
            Value::Int(IntValue::from_bits(i.kind(), i.bits().wrapping_neg()))
        }
        (UnaryOp::Neg, Value::Float32(f)) => Value::Float32(-f),
        (UnaryOp::Neg, Value::Float64(f)) => Value::Float64(-f),
        (UnaryOp::Neg, Value::Complex64(c)) => Value::Complex64(c.neg()),
        (UnaryOp::Neg, Value::Complex128(c)) => Value::Complex128(c.neg()),
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::BitNot, Value::Int(i)) => Value::Int(IntValue::from_bits(i.kind(), !i.bits())),
        (op, value) => return Err(invalid_operation(op.as_symbol(), value.kind_name()).into()),
    };
    Ok(result)
}
