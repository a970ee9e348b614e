//! Field and method selection, dynamic type tests.

use std::rc::Rc;

use gx_ir::{Name, Type};

use super::Vm;
use crate::errors::{nil_dereference, no_field_or_method, unknown_member, ExecResult};
use crate::value::{FuncValue, HostFunc, StructValue, Value};

impl Vm {
    /// `base.name`: package member, field, or bound method.
    pub(crate) fn select(&mut self, base: &Value, name: Name) -> ExecResult<Value> {
        match base {
            Value::Package(package) => {
                return package.member(name).ok_or_else(|| {
                    unknown_member(&package.name, self.interner.lookup(name)).into()
                });
            }
            Value::Error(err) if name == self.names.error_method => {
                let message = Rc::clone(&err.message);
                let method = HostFunc::new("Error", move |_, _| Ok(vec![Value::Str(Rc::clone(&message))]));
                return Ok(Value::Func(Some(FuncValue::Host(method))));
            }
            Value::Nil | Value::Pointer(None) => return Err(nil_dereference()),
            _ => {}
        }

        if let Some((owner, index)) = self.locate_field(base, name)? {
            return Ok(owner.get_index(index).unwrap_or(Value::Nil));
        }
        let method = match base {
            Value::Pointer(addr) => {
                let target = self.heap.deref(addr.as_ref())?;
                // `&p` where `p` already holds a pointer.
                if matches!(target, Value::Pointer(_)) {
                    return self.select(&target, name);
                }
                self.method_value(&target, Some(base.clone()), name)?
            }
            _ => self.method_value(base, None, name)?,
        };
        method.ok_or_else(|| {
            no_field_or_method(self.interner.lookup(name), &self.dynamic_type_name(base)).into()
        })
    }

    /// Method `name` of `value` bound to its receiver, searching promoted
    /// methods of embedded fields. `pointer` addresses `value` when known.
    pub(crate) fn method_value(
        &mut self,
        value: &Value,
        pointer: Option<Value>,
        name: Name,
    ) -> ExecResult<Option<Value>> {
        if let Some(type_name) = declared_name(value) {
            if let Some(entry) = self.types.method(type_name, name).cloned() {
                let recv = if entry.pointer {
                    match pointer {
                        Some(pointer) => pointer,
                        None => Value::Pointer(Some(self.heap.alloc(value.clone()))),
                    }
                } else {
                    value.copy_value()
                };
                return Ok(Some(Value::Func(Some(FuncValue::method(
                    entry.func, entry.env, recv,
                )))));
            }
        }
        let Value::Struct(st) = value else {
            return Ok(None);
        };
        for index in st.layout.embedded().collect::<Vec<_>>() {
            let Some(field) = st.get_index(index) else {
                continue;
            };
            let found = match &field {
                Value::Pointer(Some(addr)) => {
                    let target = self.heap.load(addr)?;
                    self.method_value(&target, Some(field.clone()), name)?
                }
                Value::Pointer(None) => None,
                _ => {
                    let addr = self.heap.addr_of_field(&st.fields, index);
                    self.method_value(&field, Some(Value::Pointer(Some(addr))), name)?
                }
            };
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// The struct holding field `name` of `value` (directly, through
    /// pointers, or promoted from an embedded field) and its index there.
    pub(crate) fn locate_field(
        &self,
        value: &Value,
        name: Name,
    ) -> ExecResult<Option<(StructValue, usize)>> {
        match value {
            Value::Struct(st) => {
                if let Some(index) = st.layout.get_index(name) {
                    return Ok(Some((st.clone(), index)));
                }
                for index in st.layout.embedded() {
                    let Some(field) = st.get_index(index) else {
                        continue;
                    };
                    if matches!(field, Value::Pointer(None)) {
                        continue;
                    }
                    if let Some(found) = self.locate_field(&field, name)? {
                        return Ok(Some(found));
                    }
                }
                Ok(None)
            }
            Value::Pointer(Some(addr)) => {
                let target = self.heap.load(addr)?;
                self.locate_field(&target, name)
            }
            Value::Pointer(None) => Err(nil_dereference()),
            _ => Ok(None),
        }
    }

    /// Whether `value`'s dynamic type is `ty` (or implements it, for
    /// interfaces).
    pub(crate) fn type_matches(&self, value: &Value, ty: &Type) -> ExecResult<bool> {
        if matches!(ty, Type::UntypedNil) {
            return Ok(matches!(value, Value::Nil));
        }
        if let Type::Interface(iface) = self.types.resolve(ty) {
            if matches!(value, Value::Nil) {
                return Ok(false);
            }
            for method in &iface.methods {
                if !self.has_method(value, *method)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        Ok(match (ty, value) {
            (Type::Named(name), _) => declared_name(value) == Some(*name),
            (Type::Pointer(elem), Value::Pointer(Some(addr))) => {
                let target = self.heap.load(addr)?;
                self.type_matches(&target, elem)?
            }
            (Type::Pointer(_), Value::Pointer(None)) => true,
            (Type::Bool, Value::Bool(_))
            | (Type::Float32, Value::Float32(_))
            | (Type::Float64, Value::Float64(_))
            | (Type::Complex64, Value::Complex64(_))
            | (Type::Complex128, Value::Complex128(_))
            | (Type::String, Value::Str(_))
            | (Type::Slice(_), Value::Slice(_))
            | (Type::Map(..), Value::Map(_))
            | (Type::Chan(_), Value::Chan(_))
            | (Type::Func(_), Value::Func(_)) => true,
            (Type::Int(kind), Value::Int(i)) => i.kind() == *kind,
            (Type::Array(len, _), Value::Array(array)) => array.len() as u64 == *len,
            (Type::Struct(_), Value::Struct(st)) => st.type_name.is_none(),
            _ => false,
        })
    }

    /// Whether `value`'s method set contains `name`. Pointers carry both
    /// receiver kinds; other values only value receivers.
    pub(super) fn has_method(&self, value: &Value, name: Name) -> ExecResult<bool> {
        match value {
            Value::Error(_) => Ok(name == self.names.error_method),
            Value::Pointer(Some(addr)) => {
                let target = self.heap.load(addr)?;
                self.method_set_contains(&target, name, true)
            }
            _ => self.method_set_contains(value, name, false),
        }
    }

    fn method_set_contains(&self, value: &Value, name: Name, pointer: bool) -> ExecResult<bool> {
        if let Some(type_name) = declared_name(value) {
            if let Some(entry) = self.types.method(type_name, name) {
                return Ok(pointer || !entry.pointer);
            }
        }
        let Value::Struct(st) = value else {
            return Ok(false);
        };
        for index in st.layout.embedded() {
            match st.get_index(index) {
                Some(Value::Pointer(Some(addr))) => {
                    let target = self.heap.load(&addr)?;
                    if self.method_set_contains(&target, name, true)? {
                        return Ok(true);
                    }
                }
                Some(field) => {
                    if self.method_set_contains(&field, name, pointer)? {
                        return Ok(true);
                    }
                }
                None => {}
            }
        }
        Ok(false)
    }

    /// Source-level name of `value`'s dynamic type.
    pub(crate) fn dynamic_type_name(&self, value: &Value) -> String {
        match value {
            Value::Struct(StructValue {
                type_name: Some(name),
                ..
            }) => self.interner.lookup(*name).to_string(),
            Value::Named(named) => self.interner.lookup(named.type_name).to_string(),
            Value::Pointer(Some(addr)) => match self.heap.load(addr) {
                Ok(target) => format!("*{}", self.dynamic_type_name(&target)),
                Err(_) => "pointer".to_string(),
            },
            other => other.kind_name().to_string(),
        }
    }
}

/// Declared type name carried by a value.
fn declared_name(value: &Value) -> Option<Name> {
    match value {
        Value::Struct(st) => st.type_name,
        Value::Named(named) => Some(named.type_name),
        _ => None,
    }
}
