//! Call protocol: parameter binding, deferred calls and `recover`.

use gx_ir::Span;

use super::frame::{FuncInvocation, InvocationTarget};
use super::{CallRecord, Frame, Vm};
use crate::builtins::expand_spread;
use crate::env::ScopeRef;
use crate::errors::{
    arity_mismatch, nil_dereference, not_callable, stack_overflow, ExecResult, Unwind,
};
use crate::value::{Closure, FuncValue, SliceValue, Value};

impl Vm {
    /// Call a function value with arguments in source order.
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> ExecResult<Vec<Value>> {
        self.call_value_at(callee, args, false, Span::DUMMY)
    }

    pub(crate) fn call_value_at(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        spread: bool,
        span: Span,
    ) -> ExecResult<Vec<Value>> {
        match callee.unwrap_named() {
            Value::Func(Some(FuncValue::Closure(closure))) => {
                let closure = std::rc::Rc::clone(closure);
                self.call_closure(&closure, args, spread, span)
            }
            Value::Func(Some(FuncValue::Host(host))) => {
                let host = host.clone();
                let args = if spread { expand_spread(args)? } else { args };
                tracing::trace!(func = %host.name, args = args.len(), "host call");
                host.call(self, args)
            }
            Value::Func(None) | Value::Nil => Err(nil_dereference()),
            other => Err(not_callable(other.kind_name()).into()),
        }
    }

    fn call_closure(
        &mut self,
        closure: &Closure,
        args: Vec<Value>,
        spread: bool,
        span: Span,
    ) -> ExecResult<Vec<Value>> {
        if self.call_stack.len() >= self.config.max_call_depth {
            return Err(stack_overflow(self.config.max_call_depth).into());
        }
        gx_stack::ensure_sufficient_stack(|| self.invoke(closure, args, spread, span))
    }

    fn invoke(
        &mut self,
        closure: &Closure,
        args: Vec<Value>,
        spread: bool,
        span: Span,
    ) -> ExecResult<Vec<Value>> {
        let deferred_by = self.pending_deferred_by.take();
        let func = &closure.func;
        let scope = self.scopes.child(&closure.env);
        let bound = match &closure.recv {
            Some(recv) => self.bind_receiver(closure, recv, &scope),
            None => Ok(()),
        }
        .and_then(|()| self.bind_params(closure, args, spread, &scope));
        if let Err(err) = bound {
            self.scopes.release(scope);
            return Err(err);
        }
        if func.has_named_results() {
            let mut locals = scope.borrow_mut();
            for result in &func.results {
                if let Some(name) = result.name {
                    locals.define(name, self.types.zero_value(&result.ty));
                }
            }
        }

        let record = self.call_stack.len();
        self.call_stack.push(CallRecord {
            name: func.name,
            span,
            panic: None,
            deferred_by,
        });
        tracing::trace!(
            func = self.interner.lookup(func.name),
            depth = record + 1,
            "call"
        );

        let mut frame = Frame::new(self.take_operands(), scope);
        let mut outcome = self.run(&mut frame, &func.graph, func.graph.entry());
        self.unwind_scopes(&mut frame, 0);
        if func.has_defer() {
            outcome = self.run_defers(&mut frame, record, outcome);
        }
        self.call_stack.truncate(record);

        let results = outcome.map(|()| self.collect_results(closure, &mut frame));
        let (operands, func_scope) = frame.finish();
        self.recycle_operands(operands);
        self.scopes.release(func_scope);
        results
    }

    fn bind_receiver(&mut self, closure: &Closure, recv: &Value, scope: &ScopeRef) -> ExecResult {
        let Some(receiver) = &closure.func.recv else {
            return Ok(());
        };
        let value = if receiver.pointer {
            match recv.unwrap_named() {
                Value::Pointer(_) => recv.clone(),
                _ => Value::Pointer(Some(self.heap.alloc(recv.clone()))),
            }
        } else {
            match recv {
                Value::Pointer(addr) => self.heap.deref(addr.as_ref())?.copy_value(),
                _ => recv.copy_value(),
            }
        };
        if let Some(name) = receiver.name {
            if name != self.names.blank {
                scope.borrow_mut().define(name, value);
            }
        }
        Ok(())
    }

    fn bind_params(
        &mut self,
        closure: &Closure,
        args: Vec<Value>,
        spread: bool,
        scope: &ScopeRef,
    ) -> ExecResult {
        let func = &closure.func;
        let params = &func.params;
        let fixed = if func.is_variadic() {
            params.len().saturating_sub(1)
        } else {
            params.len()
        };
        let arity_ok = if func.is_variadic() && !spread {
            args.len() >= fixed
        } else {
            args.len() == params.len()
        };
        if !arity_ok {
            return Err(arity_mismatch(
                self.interner.lookup(func.name),
                params.len(),
                args.len(),
            )
            .into());
        }

        let mut args = args.into_iter();
        let mut locals = scope.borrow_mut();
        for param in params.iter().take(fixed) {
            let value = args.next().unwrap_or(Value::Nil).copy_value();
            let value = self.types.coerce(value, &param.ty);
            if let Some(name) = param.name {
                if name != self.names.blank {
                    locals.define(name, value);
                }
            }
        }
        if func.is_variadic() {
            let Some(param) = params.last() else {
                return Ok(());
            };
            let rest = if spread {
                args.next().unwrap_or(Value::Slice(SliceValue::nil()))
            } else {
                let items: Vec<Value> = args
                    .map(|arg| self.types.coerce(arg.copy_value(), &param.ty))
                    .collect();
                if items.is_empty() {
                    Value::Slice(SliceValue::nil())
                } else {
                    Value::Slice(SliceValue::from_vec(items))
                }
            };
            if let Some(name) = param.name {
                if name != self.names.blank {
                    locals.define(name, rest);
                }
            }
        }
        Ok(())
    }

    /// Results of a completed call, converted to the declared result types.
    fn collect_results(&self, closure: &Closure, frame: &mut Frame) -> Vec<Value> {
        let func = &closure.func;
        let values: Vec<Value> = if func.has_named_results() {
            let scope = frame.func_scope.borrow();
            func.results
                .iter()
                .map(|result| {
                    result
                        .name
                        .and_then(|name| scope.get_local(name))
                        .unwrap_or_else(|| self.types.zero_value(&result.ty))
                })
                .collect()
        } else if let Some(values) = frame.results.take() {
            values
        } else {
            func.results
                .iter()
                .map(|result| self.types.zero_value(&result.ty))
                .collect()
        };
        values
            .into_iter()
            .zip(&func.results)
            .map(|(value, result)| self.types.coerce(value, &result.ty))
            .collect()
    }

    /// Run deferred calls in reverse registration order.
    ///
    /// A panic in the body is parked on the call record where `recover`
    /// can take it; a panic raised by a deferred call replaces it. Whatever
    /// panic is still parked after the last deferred call propagates.
    fn run_defers(&mut self, frame: &mut Frame, record: usize, outcome: ExecResult) -> ExecResult {
        match outcome {
            Ok(()) => {}
            Err(Unwind::Panic(payload)) => {
                tracing::debug!(payload = ?payload, "running deferred calls after panic");
                self.park_panic(record, payload);
            }
            Err(other) => return Err(other),
        }
        while let Some(invocation) = frame.defers.pop() {
            self.pending_deferred_by = Some(record);
            let result = self.invoke_deferred(invocation);
            self.pending_deferred_by = None;
            match result {
                Ok(_) => {}
                Err(Unwind::Panic(payload)) => self.park_panic(record, payload),
                Err(other) => return Err(other),
            }
        }
        match self.call_stack.get_mut(record).and_then(|r| r.panic.take()) {
            Some(payload) => Err(Unwind::Panic(payload)),
            None => Ok(()),
        }
    }

    fn park_panic(&mut self, record: usize, payload: Value) {
        if let Some(record) = self.call_stack.get_mut(record) {
            record.panic = Some(payload);
        }
    }

    fn invoke_deferred(&mut self, invocation: FuncInvocation) -> ExecResult<Vec<Value>> {
        let FuncInvocation {
            target,
            args,
            spread,
            span,
        } = invocation;
        match target {
            InvocationTarget::Func(callee) => self.call_value_at(&callee, args, spread, span),
            InvocationTarget::Builtin(deferred) => {
                self.call_builtin(deferred.builtin, deferred.ty.as_ref(), args, spread)
            }
        }
    }

    /// `recover()`: take the panic being handled by the call whose deferred
    /// function is running, or nil.
    pub(crate) fn recover_panic(&mut self) -> Value {
        let Some(handler) = self.call_stack.last().and_then(|record| record.deferred_by) else {
            return Value::Nil;
        };
        match self.call_stack.get_mut(handler).and_then(|record| record.panic.take()) {
            Some(payload) => {
                self.panic_trace = None;
                tracing::debug!(payload = ?payload, "recovered");
                payload
            }
            None => Value::Nil,
        }
    }
}
