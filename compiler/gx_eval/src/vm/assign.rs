//! Assignment targets and addresses of composite elements.

use gx_ir::{Name, Type};

use super::exec::checked_index;
use super::Vm;
use crate::env::{self, ScopeRef};
use crate::errors::{
    index_out_of_range, invalid_assign_target, invalid_operation, nil_dereference,
    nil_map_assignment, no_field_or_method, ExecResult,
};
use crate::flow::Target;
use crate::heap::HeapRef;
use crate::value::{MapKey, PackageMembers, Value};

impl Vm {
    /// Store `value` through `target`. `operands` are the target's operands
    /// in evaluation order.
    pub(super) fn store(
        &mut self,
        scope: &ScopeRef,
        target: &Target,
        operands: Vec<Value>,
        value: Value,
    ) -> ExecResult {
        match target {
            Target::Discard => Ok(()),
            Target::Var(name) => {
                if env::assign(scope, *name, value) {
                    Ok(())
                } else {
                    Err(self.undefined(*name))
                }
            }
            Target::Index => {
                let [base, key] = two(operands)?;
                self.store_index(&base, &key, value)
            }
            Target::Field(name) => {
                let [base] = one(operands)?;
                self.store_field(&base, *name, value)
            }
            Target::Deref => {
                let [pointer] = one(operands)?;
                match pointer.unwrap_named() {
                    Value::Pointer(Some(addr)) => self.heap.store(addr, value),
                    Value::Pointer(None) | Value::Nil => Err(nil_dereference()),
                    other => Err(invalid_operation("*", other.kind_name()).into()),
                }
            }
        }
    }

    fn store_index(&mut self, base: &Value, key: &Value, value: Value) -> ExecResult {
        match base.unwrap_named() {
            Value::Slice(slice) => {
                let i = checked_index(key, slice.len())?;
                if slice.set(i, value) {
                    Ok(())
                } else {
                    Err(index_out_of_range(i as i64, slice.len()))
                }
            }
            Value::Array(array) => {
                let i = checked_index(key, array.len())?;
                if array.set(i, value) {
                    Ok(())
                } else {
                    Err(index_out_of_range(i as i64, array.len()))
                }
            }
            Value::Map(map) => {
                if map.is_nil() {
                    return Err(nil_map_assignment());
                }
                map.insert(MapKey::from_value(key)?, key.clone(), value)
            }
            Value::Pointer(addr) => {
                let target = self.heap.deref(addr.as_ref())?;
                self.store_index(&target, key, value)
            }
            Value::Nil => Err(nil_map_assignment()),
            other => Err(invalid_operation("[]=", other.kind_name()).into()),
        }
    }

    fn store_field(&mut self, base: &Value, name: Name, value: Value) -> ExecResult {
        if let Value::Package(package) = base {
            if let PackageMembers::Source(scope) = &package.members {
                if scope.borrow_mut().set_local(name, value) {
                    return Ok(());
                }
            }
            return Err(invalid_assign_target().into());
        }
        match self.locate_field(base, name)? {
            Some((owner, index)) => {
                let value = match owner.layout.field_type(index) {
                    Some(ty) => self.types.coerce(value, ty),
                    None => value,
                };
                owner.set_index(index, value);
                Ok(())
            }
            None => Err(self.missing_field(base, name)),
        }
    }

    /// Current value behind `target`, for compound assignment.
    pub(super) fn load_target(
        &self,
        scope: &ScopeRef,
        target: &Target,
        operands: &[Value],
        ty: Option<&Type>,
    ) -> ExecResult<Value> {
        match (target, operands) {
            (Target::Var(name), _) => scope
                .borrow()
                .lookup(*name)
                .ok_or_else(|| self.undefined(*name)),
            (Target::Index, [base, key]) => Ok(self.index(base, key, ty)?.0),
            (Target::Field(name), [base]) => {
                if let Value::Package(package) = base {
                    return package
                        .member(*name)
                        .ok_or_else(|| invalid_assign_target().into());
                }
                match self.locate_field(base, *name)? {
                    Some((owner, index)) => Ok(owner.get_index(index).unwrap_or(Value::Nil)),
                    None => Err(self.missing_field(base, *name)),
                }
            }
            (Target::Deref, [pointer]) => self.deref(pointer),
            _ => Err(invalid_assign_target().into()),
        }
    }

    /// `&base.field`.
    pub(super) fn address_of_field(&mut self, base: &Value, name: Name) -> ExecResult<HeapRef> {
        match self.locate_field(base, name)? {
            Some((owner, index)) => Ok(self.heap.addr_of_field(&owner.fields, index)),
            None => Err(self.missing_field(base, name)),
        }
    }

    /// `&base[index]`.
    pub(super) fn address_of_elem(&mut self, base: &Value, index: &Value) -> ExecResult<HeapRef> {
        match base.unwrap_named() {
            Value::Slice(slice) => {
                let i = checked_index(index, slice.len())?;
                match slice.backing() {
                    Some((data, offset)) => {
                        let data = std::rc::Rc::clone(data);
                        Ok(self.heap.addr_of_elem(&data, offset + i))
                    }
                    None => Err(index_out_of_range(i as i64, 0)),
                }
            }
            Value::Array(array) => {
                let i = checked_index(index, array.len())?;
                let data = std::rc::Rc::clone(array.elements());
                Ok(self.heap.addr_of_elem(&data, i))
            }
            Value::Pointer(addr) => {
                let target = self.heap.deref(addr.as_ref())?;
                self.address_of_elem(&target, index)
            }
            other => Err(invalid_operation("&[]", other.kind_name()).into()),
        }
    }

    fn missing_field(&self, base: &Value, name: Name) -> crate::errors::Unwind {
        if matches!(base.unwrap_named(), Value::Pointer(None) | Value::Nil) {
            return nil_dereference();
        }
        no_field_or_method(self.interner.lookup(name), &self.dynamic_type_name(base)).into()
    }
}

fn one(operands: Vec<Value>) -> ExecResult<[Value; 1]> {
    <[Value; 1]>::try_from(operands).map_err(|_| invalid_assign_target().into())
}

fn two(operands: Vec<Value>) -> ExecResult<[Value; 2]> {
    <[Value; 2]>::try_from(operands).map_err(|_| invalid_assign_target().into())
}
