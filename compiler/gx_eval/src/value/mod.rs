//! Runtime values.
//!
//! `Value` is a closed tagged union. Scalars, strings and reference kinds
//! (slices, maps, pointers, functions, channels) are shared on clone;
//! structs and arrays alias their storage on clone too, and get value
//! semantics from [`Value::copy_value`] at every copy point (declaration,
//! assignment, parameter binding, element store, defer snapshot, send).

mod chan;
mod composite;
pub mod format;
mod func;
mod int;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use gx_ir::{IntKind, Name};

pub use chan::{ChanValue, TryRecv};
pub use composite::{
    ArrayValue, Elements, ErrorValue, MapEntries, MapValue, NamedValue, PackageHandle,
    PackageMembers, SliceValue, StructLayout, StructValue,
};
pub use func::{Closure, FuncValue, HostFn, HostFunc};
pub use int::{Complex, IntValue};

use crate::errors::{unhashable_key, ExecResult};
use crate::heap::HeapRef;
use crate::vm::RangeCursor;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    /// Untyped nil (also the nil interface).
    Nil,
    Bool(bool),
    Int(IntValue),
    Float32(f32),
    Float64(f64),
    Complex64(Complex),
    Complex128(Complex),
    Str(Rc<str>),
    Slice(SliceValue),
    Array(ArrayValue),
    Map(MapValue),
    /// `None` is a nil pointer.
    Pointer(Option<HeapRef>),
    Struct(StructValue),
    /// Value of a declared non-struct type.
    Named(Rc<NamedValue>),
    /// `None` is a nil func.
    Func(Option<FuncValue>),
    /// `None` is a nil channel.
    Chan(Option<ChanValue>),
    Package(Rc<PackageHandle>),
    Error(Rc<ErrorValue>),
    /// Range iteration state; never visible to programs.
    Cursor(Rc<RefCell<RangeCursor>>),
}

impl Value {
    /// An `int`.
    #[inline]
    pub fn int(value: i64) -> Self {
        Value::Int(IntValue::int(value))
    }

    /// An integer of the given kind, wrapped to its width.
    #[inline]
    pub fn int_of(kind: IntKind, value: i128) -> Self {
        Value::Int(IntValue::new(kind, value))
    }

    #[inline]
    pub fn float(value: f64) -> Self {
        Value::Float64(value)
    }

    pub fn string(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }

    pub fn slice(values: Vec<Value>) -> Self {
        Value::Slice(SliceValue::from_vec(values))
    }

    /// An error value with `message`.
    pub fn error(message: &str) -> Self {
        Value::Error(Rc::new(ErrorValue::new(message)))
    }

    /// Wrap `inner` in the declared type `type_name`.
    pub fn named(type_name: Name, inner: Value) -> Self {
        Value::Named(Rc::new(NamedValue { type_name, inner }))
    }

    /// Whether this is nil of any kind.
    pub fn is_nil(&self) -> bool {
        match self {
            Value::Nil | Value::Pointer(None) | Value::Func(None) | Value::Chan(None) => true,
            Value::Slice(s) => s.is_nil(),
            Value::Map(m) => m.is_nil(),
            _ => false,
        }
    }

    /// The value behind a named-type wrapper.
    #[inline]
    pub fn unwrap_named(&self) -> &Value {
        match self {
            Value::Named(named) => named.inner.unwrap_named(),
            other => other,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.unwrap_named() {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<IntValue> {
        match self.unwrap_named() {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.unwrap_named() {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Copy for value semantics: structs and arrays get independent storage.
    #[must_use]
    pub fn copy_value(&self) -> Value {
        match self {
            Value::Struct(s) => Value::Struct(s.deep_copy()),
            Value::Array(a) => Value::Array(a.deep_copy()),
            Value::Named(named) if matches!(named.inner, Value::Array(_) | Value::Named(_)) => {
                Value::named(named.type_name, named.inner.copy_value())
            }
            other => other.clone(),
        }
    }

    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(i) => i.kind().name(),
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Complex64(_) => "complex64",
            Value::Complex128(_) => "complex128",
            Value::Str(_) => "string",
            Value::Slice(_) => "slice",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Pointer(_) => "pointer",
            Value::Struct(_) => "struct",
            Value::Named(named) => named.inner.kind_name(),
            Value::Func(_) => "func",
            Value::Chan(_) => "chan",
            Value::Package(_) => "package",
            Value::Error(_) => "error",
            Value::Cursor(_) => "cursor",
        }
    }
}

/// Store `value` into `slot`.
///
/// A struct (or array) stored over an existing struct (or array) of the same
/// shape overwrites the existing storage element-wise, so every alias of the
/// slot (pointers, field pointers) observes the new contents.
pub fn assign_in_place(slot: &mut Value, value: Value) {
    match (&*slot, &value) {
        (Value::Struct(old), Value::Struct(new))
            if !old.ptr_eq(new) && old.layout.len() == new.layout.len() =>
        {
            let incoming = new.fields.borrow().clone();
            let mut fields = old.fields.borrow_mut();
            for (field, value) in fields.iter_mut().zip(incoming) {
                assign_in_place(field, value);
            }
        }
        (Value::Array(old), Value::Array(new)) if !old.ptr_eq(new) && old.len() == new.len() => {
            let incoming = new.to_vec();
            let mut elements = old.elements().borrow_mut();
            for (element, value) in elements.iter_mut().zip(incoming) {
                assign_in_place(element, value);
            }
        }
        _ => *slot = value,
    }
}

/// Zero value of the same dynamic type as `sample`.
pub fn zero_like(sample: &Value) -> Value {
    match sample {
        Value::Bool(_) => Value::Bool(false),
        Value::Int(i) => Value::Int(IntValue::new(i.kind(), 0)),
        Value::Float32(_) => Value::Float32(0.0),
        Value::Float64(_) => Value::Float64(0.0),
        Value::Complex64(_) => Value::Complex64(Complex::default()),
        Value::Complex128(_) => Value::Complex128(Complex::default()),
        Value::Str(_) => Value::Str(Rc::from("")),
        Value::Slice(_) => Value::Slice(SliceValue::nil()),
        Value::Array(a) => Value::Array(ArrayValue::new(a.to_vec().iter().map(zero_like).collect())),
        Value::Map(_) => Value::Map(MapValue::nil()),
        Value::Pointer(_) => Value::Pointer(None),
        Value::Struct(s) => {
            let fields = s.fields.borrow().iter().map(zero_like).collect();
            Value::Struct(StructValue::new(Rc::clone(&s.layout), fields, s.type_name))
        }
        Value::Named(named) => Value::named(named.type_name, zero_like(&named.inner)),
        Value::Func(_) => Value::Func(None),
        Value::Chan(_) => Value::Chan(None),
        Value::Nil | Value::Package(_) | Value::Error(_) | Value::Cursor(_) => Value::Nil,
    }
}

/// Hashable projection of a comparable value, used as a map key.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum MapKey {
    Nil,
    Bool(bool),
    Int(IntKind, u64),
    Float32(u32),
    Float64(u64),
    Complex(u64, u64),
    Str(Rc<str>),
    Pointer(u64),
    Chan(usize),
    Error(usize),
    Struct(Option<Name>, Vec<MapKey>),
    Array(Vec<MapKey>),
    Named(Name, Box<MapKey>),
}

impl MapKey {
    /// Project a key value; slices, maps and functions panic as unhashable.
    pub fn from_value(value: &Value) -> ExecResult<MapKey> {
        Ok(match value {
            Value::Nil => MapKey::Nil,
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Int(i) => MapKey::Int(i.kind(), i.bits()),
            Value::Float32(f) => MapKey::Float32(if *f == 0.0 { 0 } else { f.to_bits() }),
            Value::Float64(f) => MapKey::Float64(if *f == 0.0 { 0 } else { f.to_bits() }),
            Value::Complex64(c) | Value::Complex128(c) => {
                MapKey::Complex((c.re + 0.0).to_bits(), (c.im + 0.0).to_bits())
            }
            Value::Str(s) => MapKey::Str(Rc::clone(s)),
            Value::Pointer(ptr) => MapKey::Pointer(ptr.as_ref().map_or(0, |ptr| ptr.addr().raw())),
            Value::Chan(None) => MapKey::Chan(0),
            Value::Chan(Some(chan)) => MapKey::Chan(chan.id()),
            Value::Error(err) => MapKey::Error(Rc::as_ptr(err) as usize),
            Value::Struct(s) => {
                let fields = s
                    .fields
                    .borrow()
                    .iter()
                    .map(MapKey::from_value)
                    .collect::<ExecResult<_>>()?;
                MapKey::Struct(s.type_name, fields)
            }
            Value::Array(a) => MapKey::Array(
                a.to_vec()
                    .iter()
                    .map(MapKey::from_value)
                    .collect::<ExecResult<_>>()?,
            ),
            Value::Named(named) => {
                MapKey::Named(named.type_name, Box::new(MapKey::from_value(&named.inner)?))
            }
            other @ (Value::Slice(_)
            | Value::Map(_)
            | Value::Func(_)
            | Value::Package(_)
            | Value::Cursor(_)) => return Err(unhashable_key(other.kind_name())),
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}:{}", i.kind().name()),
            Value::Float32(x) => write!(f, "{x}:float32"),
            Value::Float64(x) => write!(f, "{x}:float64"),
            Value::Complex64(c) | Value::Complex128(c) => write!(f, "({}+{}i)", c.re, c.im),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Slice(s) => write!(f, "{s:?}"),
            Value::Array(a) => write!(f, "{a:?}"),
            Value::Map(m) => write!(f, "{m:?}"),
            Value::Pointer(None) => f.write_str("ptr(nil)"),
            Value::Pointer(Some(addr)) => write!(f, "ptr({addr:?})"),
            Value::Struct(s) => write!(f, "{s:?}"),
            Value::Named(named) => write!(f, "{:?}({:?})", named.type_name, named.inner),
            Value::Func(None) => f.write_str("func(nil)"),
            Value::Func(Some(func)) => write!(f, "{func:?}"),
            Value::Chan(None) => f.write_str("chan(nil)"),
            Value::Chan(Some(chan)) => write!(f, "{chan:?}"),
            Value::Package(pkg) => write!(f, "{pkg:?}"),
            Value::Error(err) => write!(f, "error({:?})", err.message),
            Value::Cursor(_) => f.write_str("<cursor>"),
        }
    }
}

/// Structural equality for embedders and tests. Language-level `==` lives in
/// the operator module and panics on uncomparable operands instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Complex64(a), Value::Complex64(b))
            | (Value::Complex128(a), Value::Complex128(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => {
                a.is_nil() == b.is_nil() && a.to_vec() == b.to_vec()
            }
            (Value::Array(a), Value::Array(b)) => a.to_vec() == b.to_vec(),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b) || a.entries() == b.entries(),
            (Value::Pointer(a), Value::Pointer(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => {
                a.type_name == b.type_name && *a.fields.borrow() == *b.fields.borrow()
            }
            (Value::Named(a), Value::Named(b)) => a.type_name == b.type_name && a.inner == b.inner,
            (Value::Func(None), Value::Func(None)) | (Value::Chan(None), Value::Chan(None)) => {
                true
            }
            (Value::Func(Some(a)), Value::Func(Some(b))) => a.ptr_eq(b),
            (Value::Chan(Some(a)), Value::Chan(Some(b))) => a.ptr_eq(b),
            (Value::Package(a), Value::Package(b)) => Rc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b) || a.message == b.message,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

#[cfg(test)]
mod tests;
