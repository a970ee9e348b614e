//! Composite literals, `make` and `new`.

use std::cell::RefCell;
use std::rc::Rc;

use gx_ir::Type;

use super::TypeTable;
use crate::errors::{
    index_out_of_range, invalid_operation, negative_len, runtime_panic, ExecResult, Unwind,
};
use crate::flow::ComposeKeys;
use crate::value::{ArrayValue, ChanValue, MapKey, MapValue, SliceValue, StructValue, Value};

impl TypeTable {
    /// Build a composite literal of type `ty` from its evaluated elements,
    /// in source order.
    pub fn compose(&self, ty: &Type, keys: &ComposeKeys, values: Vec<Value>) -> ExecResult<Value> {
        let resolved = self.resolve(ty);
        let value = match (resolved, keys) {
            (Type::Struct(_), ComposeKeys::Positional(_) | ComposeKeys::Fields(_)) => {
                return self.compose_struct(ty, keys, values);
            }
            (Type::Slice(elem), ComposeKeys::Seq(keyed)) => {
                Value::Slice(SliceValue::from_vec(self.sequence(elem, keyed, values, None)?))
            }
            (Type::Array(len, elem), ComposeKeys::Seq(keyed)) => {
                let len = usize::try_from(*len).unwrap_or(0);
                Value::Array(ArrayValue::new(
                    self.sequence(elem, keyed, values, Some(len))?,
                ))
            }
            (Type::Map(key_ty, value_ty), ComposeKeys::Map(_)) => {
                let map = MapValue::new();
                let mut values = values.into_iter();
                while let (Some(key), Some(value)) = (values.next(), values.next()) {
                    let key = self.coerce(key, key_ty);
                    map.insert(MapKey::from_value(&key)?, key, self.coerce(value.copy_value(), value_ty))?;
                }
                Value::Map(map)
            }
            (other, _) => {
                return Err(invalid_operation("composite literal", &self.type_name(other)).into())
            }
        };
        Ok(match ty {
            Type::Named(name) => Value::named(*name, value),
            _ => value,
        })
    }

    fn compose_struct(&self, ty: &Type, keys: &ComposeKeys, values: Vec<Value>) -> ExecResult<Value> {
        let Some((layout, type_name)) = self.struct_layout(ty) else {
            return Err(invalid_operation("composite literal", &self.type_name(ty)).into());
        };
        let Value::Struct(zero) = self.zero_value(ty) else {
            return Err(invalid_operation("composite literal", &self.type_name(ty)).into());
        };
        let place = |index: usize, value: Value| {
            let value = match layout.field_type(index) {
                Some(field_ty) => self.coerce(value.copy_value(), field_ty),
                None => value.copy_value(),
            };
            zero.set_index(index, value);
        };
        match keys {
            ComposeKeys::Fields(names) => {
                for (name, value) in names.iter().zip(values) {
                    let index = layout.get_index(*name).ok_or_else(|| {
                        invalid_operation(
                            &format!("unknown field {}", self.interner().lookup(*name)),
                            &self.type_name(ty),
                        )
                    })?;
                    place(index, value);
                }
            }
            _ => {
                for (index, value) in values.into_iter().enumerate() {
                    place(index, value);
                }
            }
        }
        Ok(Value::Struct(StructValue { type_name, ..zero }))
    }

    fn sequence(
        &self,
        elem: &Type,
        keyed: &[bool],
        values: Vec<Value>,
        fixed_len: Option<usize>,
    ) -> ExecResult<Vec<Value>> {
        let mut placed: Vec<(usize, Value)> = Vec::with_capacity(keyed.len());
        let mut values = values.into_iter();
        let mut next = 0usize;
        for has_key in keyed {
            if *has_key {
                let key = values.next().and_then(|k| k.as_int());
                next = key
                    .and_then(|k| usize::try_from(k.as_i128()).ok())
                    .ok_or_else(|| {
                        invalid_operation("composite literal index", &self.type_name(elem))
                    })?;
            }
            let Some(value) = values.next() else { break };
            placed.push((next, self.coerce(value.copy_value(), elem)));
            next += 1;
        }
        let len = fixed_len.unwrap_or_else(|| placed.iter().map(|(i, _)| i + 1).max().unwrap_or(0));
        let mut out: Vec<Value> = (0..len).map(|_| self.zero_value(elem)).collect();
        for (index, value) in placed {
            match out.get_mut(index) {
                Some(slot) => *slot = value,
                None => return Err(index_out_of_range(index as i64, len)),
            }
        }
        Ok(out)
    }

    /// `make(ty, args...)`.
    pub fn make(&self, ty: &Type, args: &[Value]) -> ExecResult<Value> {
        let value = match self.resolve(ty) {
            Type::Slice(elem) => {
                let len = size_arg(args.first(), "len")?.unwrap_or(0);
                let cap = size_arg(args.get(1), "cap")?.unwrap_or(len);
                if len > cap {
                    return Err(runtime_panic("makeslice: cap out of range"));
                }
                let backing = (0..cap).map(|_| self.zero_value(elem)).collect();
                Value::Slice(SliceValue::from_backing(
                    Rc::new(RefCell::new(backing)),
                    0,
                    len,
                    cap,
                ))
            }
            Type::Map(..) => Value::Map(MapValue::new()),
            Type::Chan(elem) => {
                let cap = size_arg(args.first(), "buffer")?.unwrap_or(0);
                Value::Chan(Some(ChanValue::new(cap, self.zero_value(elem))))
            }
            other => return Err(invalid_operation("make", &self.type_name(other)).into()),
        };
        Ok(match ty {
            Type::Named(name) => Value::named(*name, value),
            _ => value,
        })
    }
}

fn size_arg(arg: Option<&Value>, what: &str) -> Result<Option<usize>, Unwind> {
    let Some(arg) = arg else {
        return Ok(None);
    };
    let size = match arg.unwrap_named() {
        Value::Int(i) => i.as_i128(),
        Value::Float64(f) if f.fract() == 0.0 => *f as i128,
        other => return Err(invalid_operation(what, other.kind_name()).into()),
    };
    usize::try_from(size).map(Some).map_err(|_| negative_len(what))
}
