//! Operator evaluation.
//!
//! Every binary operator is implemented by a *family function* operating on
//! one value category (integers of any width, floats, complex numbers,
//! strings, booleans). The builder resolves the family function ahead of
//! time through [`OperatorTable`] when both operand types are statically
//! known basic types; otherwise the VM calls [`evaluate_binary`], which
//! unifies operand kinds at run time and picks the same family function.

mod binary;
mod table;
mod unary;

use gx_ir::{IntKind, Type};

use crate::errors::ExecResult;
use crate::value::Value;

pub use binary::{evaluate_binary, family_fn, values_equal};
pub use table::OperatorTable;
pub use unary::evaluate_unary;

/// Resolved operator implementation.
pub type BinaryFn = fn(&Value, &Value) -> ExecResult<Value>;

/// Key of a basic type in the operator table.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeKey {
    Bool,
    Int(IntKind),
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
}

impl TypeKey {
    /// Key of a static type, for basic types only.
    pub fn of(ty: &Type) -> Option<TypeKey> {
        Some(match ty {
            Type::Bool => TypeKey::Bool,
            Type::Int(kind) => TypeKey::Int(*kind),
            Type::Float32 => TypeKey::Float32,
            Type::Float64 => TypeKey::Float64,
            Type::Complex64 => TypeKey::Complex64,
            Type::Complex128 => TypeKey::Complex128,
            Type::String => TypeKey::String,
            _ => return None,
        })
    }

    /// Key of a runtime value's category.
    pub fn of_value(value: &Value) -> Option<TypeKey> {
        Some(match value {
            Value::Bool(_) => TypeKey::Bool,
            Value::Int(i) => TypeKey::Int(i.kind()),
            Value::Float32(_) => TypeKey::Float32,
            Value::Float64(_) => TypeKey::Float64,
            Value::Complex64(_) => TypeKey::Complex64,
            Value::Complex128(_) => TypeKey::Complex128,
            Value::Str(_) => TypeKey::String,
            _ => return None,
        })
    }

    /// Every key.
    pub fn all() -> impl Iterator<Item = TypeKey> {
        [
            TypeKey::Bool,
            TypeKey::Float32,
            TypeKey::Float64,
            TypeKey::Complex64,
            TypeKey::Complex128,
            TypeKey::String,
        ]
        .into_iter()
        .chain(IntKind::ALL.into_iter().map(TypeKey::Int))
    }
}

#[cfg(test)]
mod tests;
