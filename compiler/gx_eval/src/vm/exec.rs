//! Step semantics.

use std::cell::RefCell;
use std::rc::Rc;

use gx_ir::{IntKind, Name, UnaryOp};

use super::frame::{FuncInvocation, InvocationTarget};
use super::{Flow, Frame, RangeCursor, Vm};
use crate::env::{self, ScopeRef};
use crate::errors::{
    deadlock, index_out_of_range, invalid_operation, nil_dereference, slice_bounds_out_of_range,
    type_assertion_failed, undefined_variable, EvalError, ExecResult, Unwind,
};
use crate::flow::{AddrKind, CallResults, FlowGraph, Step, StepOp};
use crate::ops::{evaluate_binary, evaluate_unary};
use crate::value::{zero_like, FuncValue, MapKey, SliceValue, Value};

impl Vm {
    pub(super) fn exec_step(
        &mut self,
        frame: &mut Frame,
        graph: &FlowGraph,
        step: &Step,
    ) -> ExecResult<Flow> {
        match &step.op {
            StepOp::Nop => {}
            StepOp::Const(value) => frame.push(value.clone()),
            StepOp::Load(name) => {
                let value = self.load(&frame.scope, *name)?;
                frame.push(value);
            }
            StepOp::Declare { names, ty, arity } => {
                let values = frame.take(*arity)?;
                if values.len() != names.len() {
                    return Err(assignment_mismatch(names.len(), values.len()));
                }
                let mut scope = frame.scope.borrow_mut();
                for (name, value) in names.iter().zip(values) {
                    if *name == self.names.blank {
                        continue;
                    }
                    let value = value.copy_value();
                    let value = match ty {
                        Some(ty) => self.types.coerce(value, ty),
                        None => value,
                    };
                    scope.define(*name, value);
                }
            }
            StepOp::DeclareZero { names, ty } => {
                let mut scope = frame.scope.borrow_mut();
                for name in names {
                    if *name != self.names.blank {
                        scope.define(*name, self.types.zero_value(ty));
                    }
                }
            }
            StepOp::Assign { targets, arity } => {
                let values = frame.take(*arity)?;
                if values.len() != targets.len() {
                    return Err(assignment_mismatch(targets.len(), values.len()));
                }
                let mut operands = Vec::with_capacity(targets.len());
                for target in targets.iter().rev() {
                    operands.push(frame.take_n(target.operands())?);
                }
                operands.reverse();
                for ((target, operands), value) in targets.iter().zip(operands).zip(values) {
                    self.store(&frame.scope, target, operands, value.copy_value())?;
                }
            }
            StepOp::LoadTarget { target, ty } => {
                let operands = frame.peek_n(target.operands())?;
                let value = self.load_target(&frame.scope, target, &operands, ty.as_ref())?;
                frame.push(value);
            }
            StepOp::Binary { op, func } => {
                let right = frame.pop()?;
                let left = frame.pop()?;
                let result = match func {
                    Some(func) => func(&left, &right)?,
                    None => evaluate_binary(*op, &left, &right)?,
                };
                frame.push(result);
            }
            StepOp::Unary(op) => {
                let operand = frame.pop()?;
                let result = match op {
                    UnaryOp::Deref => self.deref(&operand)?,
                    UnaryOp::Recv => self.receive(&operand)?.0,
                    UnaryOp::AddrOf => Value::Pointer(Some(self.heap.alloc(operand))),
                    _ => evaluate_unary(*op, &operand)?,
                };
                frame.push(result);
            }
            StepOp::AddrOf(kind) => {
                let addr = match kind {
                    AddrKind::Var(name) => {
                        let cell = env::owner(&frame.scope, *name)
                            .and_then(|owner| self.heap.addr_of_var(&owner, *name));
                        match cell {
                            Some(cell) => cell,
                            None => return Err(self.undefined(*name)),
                        }
                    }
                    AddrKind::Field(name) => {
                        let base = frame.pop()?;
                        self.address_of_field(&base, *name)?
                    }
                    AddrKind::Index => {
                        let index = frame.pop()?;
                        let base = frame.pop()?;
                        self.address_of_elem(&base, &index)?
                    }
                    AddrKind::Value => {
                        let value = frame.pop()?;
                        self.heap.alloc(value)
                    }
                };
                frame.push(Value::Pointer(Some(addr)));
            }
            StepOp::Deref => {
                let pointer = frame.pop()?;
                let value = self.deref(&pointer)?;
                frame.push(value);
            }
            StepOp::Branch { else_ } => {
                let cond = frame.pop()?;
                return match cond.as_bool() {
                    Some(true) => Ok(Flow::Next),
                    Some(false) => Ok(Flow::Goto(*else_)),
                    None => Err(invalid_operation("if", cond.kind_name()).into()),
                };
            }
            StepOp::ShortCircuit { when, else_ } => {
                let top = frame.peek()?;
                let Some(value) = top.as_bool() else {
                    return Err(invalid_operation("&&", top.kind_name()).into());
                };
                if value == *when {
                    return Ok(Flow::Goto(*else_));
                }
                frame.pop()?;
            }
            StepOp::Jump { depth } => self.unwind_scopes(frame, *depth),
            StepOp::PushScope => {
                let child = self.scopes.child(&frame.scope);
                frame.scope = child;
                frame.depth += 1;
            }
            StepOp::PopScope => {
                let depth = frame.depth.saturating_sub(1);
                self.unwind_scopes(frame, depth);
            }
            StepOp::CarryOut(names) => {
                let scope = frame.scope.borrow();
                if let Some(parent) = scope.parent() {
                    let mut parent = parent.borrow_mut();
                    for name in names {
                        if let Some(value) = scope.get_local(*name) {
                            parent.define(*name, value);
                        }
                    }
                }
            }
            StepOp::Call {
                args,
                spread,
                results,
            } => {
                let callee = frame.pop()?;
                let args = frame.take(*args)?;
                let out = self.call_value_at(&callee, args, *spread, step.span)?;
                push_results(frame, out, *results);
            }
            StepOp::CallBuiltin {
                builtin,
                ty,
                args,
                spread,
                results,
            } => {
                let args = frame.take(*args)?;
                let out = self.call_builtin(*builtin, ty.as_ref(), args, *spread)?;
                push_results(frame, out, *results);
            }
            StepOp::Return(arity) => {
                if *arity != crate::flow::Arity::Fixed(0) {
                    frame.results = Some(frame.take(*arity)?);
                }
                return Ok(Flow::Return);
            }
            StepOp::Defer {
                entry,
                args,
                spread,
                builtin,
            } => {
                self.run(frame, graph, Some(*entry))?;
                let target = match builtin {
                    Some(builtin) => InvocationTarget::Builtin(builtin.clone()),
                    None => InvocationTarget::Func(frame.pop()?),
                };
                let args = frame
                    .take(*args)?
                    .iter()
                    .map(Value::copy_value)
                    .collect();
                frame.defers.push(FuncInvocation {
                    target,
                    args,
                    spread: *spread,
                    span: step.span,
                });
            }
            StepOp::Index { comma_ok, elem } => {
                let index = frame.pop()?;
                let base = frame.pop()?;
                let (value, ok) = self.index(&base, &index, elem.as_ref())?;
                frame.push(value);
                if *comma_ok {
                    frame.push(Value::Bool(ok));
                }
            }
            StepOp::SliceExpr { low, high, max } => {
                let max = if *max { Some(frame.pop()?) } else { None };
                let high = if *high { Some(frame.pop()?) } else { None };
                let low = if *low { Some(frame.pop()?) } else { None };
                let base = frame.pop()?;
                let value = self.slice(&base, low.as_ref(), high.as_ref(), max.as_ref())?;
                frame.push(value);
            }
            StepOp::Select(name) => {
                let base = frame.pop()?;
                let value = self.select(&base, *name)?;
                frame.push(value);
            }
            StepOp::Compose { ty, keys } => {
                let values = frame.take_n(keys.operands())?;
                let value = self.types.compose(ty, keys, values)?;
                frame.push(value);
            }
            StepOp::Closure(func) => {
                env::mark_escaped(&frame.scope);
                frame.push(Value::Func(Some(FuncValue::closure(
                    Rc::clone(func),
                    frame.scope.clone(),
                ))));
            }
            StepOp::TypeAssert { ty, comma_ok } => {
                let value = frame.pop()?;
                let ok = self.type_matches(&value, ty)?;
                if *comma_ok {
                    frame.push(if ok { value } else { self.types.zero_value(ty) });
                    frame.push(Value::Bool(ok));
                } else if ok {
                    frame.push(value);
                } else {
                    let got = self.dynamic_type_name(&value);
                    return Err(type_assertion_failed(&got, &self.types.type_name(ty)));
                }
            }
            StepOp::TypeTest(ty) => {
                let value = frame.pop()?;
                let ok = self.type_matches(&value, ty)?;
                frame.push(Value::Bool(ok));
            }
            StepOp::Convert(ty) => {
                let value = frame.pop()?;
                let converted = self.types.convert(&value, ty)?;
                frame.push(converted);
            }
            StepOp::Send => {
                let value = frame.pop()?;
                let chan = frame.pop()?;
                match chan.unwrap_named() {
                    Value::Chan(Some(chan)) => chan.send(value.copy_value())?,
                    Value::Chan(None) | Value::Nil => return Err(deadlock().into()),
                    other => return Err(invalid_operation("<-", other.kind_name()).into()),
                }
            }
            StepOp::Recv { comma_ok } => {
                let chan = frame.pop()?;
                let (value, ok) = self.receive(&chan)?;
                frame.push(value);
                if *comma_ok {
                    frame.push(Value::Bool(ok));
                }
            }
            StepOp::RangeInit { kind, cursor } => {
                let value = frame.pop()?;
                let state = RangeCursor::new(*kind, &value, &self.heap)?;
                frame
                    .scope
                    .borrow_mut()
                    .define(*cursor, Value::Cursor(Rc::new(RefCell::new(state))));
            }
            StepOp::RangeNext {
                cursor,
                value,
                exit,
            } => {
                let Some(Value::Cursor(state)) = frame.scope.borrow().lookup(*cursor) else {
                    return Err(self.undefined(*cursor));
                };
                let next = state.borrow_mut().advance()?;
                match next {
                    Some((key, item)) => {
                        frame.push(key);
                        if *value {
                            frame.push(item);
                        }
                    }
                    None => return Ok(Flow::Goto(*exit)),
                }
            }
            StepOp::Pop => {
                frame.pop()?;
            }
        }
        Ok(Flow::Next)
    }

    /// Value of `name`, or the init-time `Undeclared` signal.
    fn load(&self, scope: &ScopeRef, name: Name) -> ExecResult<Value> {
        match scope.borrow().lookup(name) {
            Some(value) => Ok(value),
            None => Err(self.undefined(name)),
        }
    }

    pub(crate) fn undefined(&self, name: Name) -> Unwind {
        if self.in_init_mode() {
            Unwind::Undeclared(name)
        } else {
            undefined_variable(self.interner.lookup(name)).into()
        }
    }

    /// `*p`.
    pub(crate) fn deref(&self, pointer: &Value) -> ExecResult<Value> {
        match pointer.unwrap_named() {
            Value::Pointer(addr) => self.heap.deref(addr.as_ref()),
            Value::Nil => Err(nil_dereference()),
            other => Err(invalid_operation("*", other.kind_name()).into()),
        }
    }

    fn receive(&self, chan: &Value) -> ExecResult<(Value, bool)> {
        match chan.unwrap_named() {
            Value::Chan(Some(chan)) => chan.recv(),
            Value::Chan(None) | Value::Nil => Err(deadlock().into()),
            other => Err(invalid_operation("<-", other.kind_name()).into()),
        }
    }

    /// `base[index]`; the flag is the comma-ok result for maps.
    pub(crate) fn index(
        &self,
        base: &Value,
        index: &Value,
        elem: Option<&gx_ir::Type>,
    ) -> ExecResult<(Value, bool)> {
        let value = match base.unwrap_named() {
            Value::Str(s) => {
                let i = checked_index(index, s.len())?;
                let byte = s.as_bytes().get(i).copied().unwrap_or_default();
                Value::int_of(IntKind::Uint8, i128::from(byte))
            }
            Value::Slice(slice) => {
                let i = checked_index(index, slice.len())?;
                slice
                    .get(i)
                    .ok_or_else(|| index_out_of_range(i as i64, slice.len()))?
            }
            Value::Array(array) => {
                let i = checked_index(index, array.len())?;
                array
                    .get(i)
                    .ok_or_else(|| index_out_of_range(i as i64, array.len()))?
            }
            Value::Pointer(addr) => {
                let target = self.heap.deref(addr.as_ref())?;
                return self.index(&target, index, elem);
            }
            Value::Map(map) => {
                let key = MapKey::from_value(index)?;
                return Ok(match map.get(&key) {
                    Some(value) => (value, true),
                    None => (self.missing_entry(map, elem), false),
                });
            }
            Value::Nil => match elem {
                Some(ty) => return Ok((self.types.zero_value(ty), false)),
                None => return Err(nil_dereference()),
            },
            other => return Err(invalid_operation("[]", other.kind_name()).into()),
        };
        Ok((value, true))
    }

    /// Zero value read from a map without the requested key.
    pub(crate) fn missing_entry(
        &self,
        map: &crate::value::MapValue,
        elem: Option<&gx_ir::Type>,
    ) -> Value {
        if let Some(ty) = elem {
            return self.types.zero_value(ty);
        }
        map.entries()
            .first()
            .map_or(Value::Nil, |(_, sample)| zero_like(sample))
    }

    /// `base[low:high:max]`.
    fn slice(
        &self,
        base: &Value,
        low: Option<&Value>,
        high: Option<&Value>,
        max: Option<&Value>,
    ) -> ExecResult<Value> {
        let bounds = SliceBounds {
            low: slice_index(low)?,
            high: slice_index(high)?,
            max: slice_index(max)?,
        };
        self.slice_with(base, bounds)
    }

    fn slice_with(&self, base: &Value, bounds: SliceBounds) -> ExecResult<Value> {
        match base {
            Value::Named(named) => {
                let inner = self.slice_with(&named.inner, bounds)?;
                Ok(match (&named.inner, inner) {
                    (Value::Array(_), inner) => inner,
                    (_, inner) => Value::named(named.type_name, inner),
                })
            }
            Value::Str(s) => {
                let (l, h, _) = bounds.window(s.len(), s.len())?;
                let bytes = s.as_bytes().get(l..h).unwrap_or_default();
                Ok(Value::Str(Rc::from(String::from_utf8_lossy(bytes).as_ref())))
            }
            Value::Slice(slice) => {
                let (l, h, m) = bounds.window(slice.len(), slice.cap())?;
                slice
                    .reslice(l, h, m)
                    .map(Value::Slice)
                    .ok_or_else(|| slice_bounds_out_of_range(l as i64, h as i64, slice.cap()))
            }
            Value::Array(array) => {
                let (l, h, m) = bounds.window(array.len(), array.len())?;
                Ok(Value::Slice(SliceValue::from_backing(
                    Rc::clone(array.elements()),
                    l,
                    h - l,
                    m - l,
                )))
            }
            Value::Pointer(addr) => match self.heap.deref(addr.as_ref())? {
                target @ Value::Array(_) => self.slice_with(&target, bounds),
                other => Err(invalid_operation("[:]", other.kind_name()).into()),
            },
            Value::Nil => Ok(Value::Slice(SliceValue::nil())),
            other => Err(invalid_operation("[:]", other.kind_name()).into()),
        }
    }
}

#[derive(Clone, Copy)]
struct SliceBounds {
    low: Option<i64>,
    high: Option<i64>,
    max: Option<i64>,
}

impl SliceBounds {
    /// Resolved `(low, high, max)` for an operand of length `len`.
    fn window(self, len: usize, cap: usize) -> ExecResult<(usize, usize, usize)> {
        let l = self.low.unwrap_or(0);
        let h = self.high.unwrap_or(len as i64);
        let m = self.max.unwrap_or(cap as i64);
        if l < 0 || h < l || m < h || m > cap as i64 {
            return Err(slice_bounds_out_of_range(l, h, cap));
        }
        Ok((l as usize, h as usize, m as usize))
    }
}

fn slice_index(value: Option<&Value>) -> ExecResult<Option<i64>> {
    match value {
        None => Ok(None),
        Some(value) => value
            .as_int()
            .map(|i| Some(i.as_i64()))
            .ok_or_else(|| invalid_operation("slice index", value.kind_name()).into()),
    }
}

fn push_results(frame: &mut Frame, results: Vec<Value>, layout: CallResults) {
    match layout {
        CallResults::Discard => {}
        CallResults::One => frame.push(results.into_iter().next().unwrap_or(Value::Nil)),
        CallResults::Forward => {
            let count = results.len();
            for value in results.into_iter().rev() {
                frame.push(value);
            }
            frame.push(Value::int(count as i64));
        }
    }
}

/// Index within `0..len`, or an index-out-of-range panic.
pub(crate) fn checked_index(index: &Value, len: usize) -> ExecResult<usize> {
    let Some(i) = index.as_int() else {
        return Err(invalid_operation("index", index.kind_name()).into());
    };
    let i = i.as_i128();
    match usize::try_from(i) {
        Ok(i) if i < len => Ok(i),
        _ => Err(index_out_of_range(i as i64, len)),
    }
}

#[cold]
fn assignment_mismatch(want: usize, got: usize) -> Unwind {
    EvalError::new(format!(
        "assignment mismatch: {want} variables but {got} values"
    ))
    .into()
}
