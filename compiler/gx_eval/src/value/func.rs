//! Function values: compiled closures and host functions.

use std::fmt;
use std::rc::Rc;

use super::Value;
use crate::env::ScopeRef;
use crate::errors::ExecResult;
use crate::flow::CompiledFunc;
use crate::vm::Vm;

/// A callable value.
#[derive(Clone)]
pub enum FuncValue {
    /// Compiled function with its captured scope (and bound receiver for
    /// method values).
    Closure(Rc<Closure>),
    /// Function implemented by the embedder.
    Host(HostFunc),
}

impl FuncValue {
    /// Top-level function or function literal.
    pub fn closure(func: Rc<CompiledFunc>, env: ScopeRef) -> Self {
        FuncValue::Closure(Rc::new(Closure {
            func,
            env,
            recv: None,
        }))
    }

    /// Method value with its receiver bound.
    pub fn method(func: Rc<CompiledFunc>, env: ScopeRef, recv: Value) -> Self {
        FuncValue::Closure(Rc::new(Closure {
            func,
            env,
            recv: Some(recv),
        }))
    }

    pub fn ptr_eq(&self, other: &FuncValue) -> bool {
        match (self, other) {
            (FuncValue::Closure(a), FuncValue::Closure(b)) => Rc::ptr_eq(a, b),
            (FuncValue::Host(a), FuncValue::Host(b)) => Rc::ptr_eq(&a.call, &b.call),
            _ => false,
        }
    }
}

impl fmt::Debug for FuncValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuncValue::Closure(closure) => write!(f, "func {:?}", closure.func.name),
            FuncValue::Host(host) => write!(f, "host func {}", host.name),
        }
    }
}

/// Compiled function bound to the scope it closes over.
pub struct Closure {
    pub func: Rc<CompiledFunc>,
    /// Parent of every invocation scope: the defining scope for literals,
    /// the package scope for declared functions.
    pub env: ScopeRef,
    pub recv: Option<Value>,
}

/// Signature of host function bodies. Results are returned in order.
pub type HostFn = Rc<dyn Fn(&mut Vm, Vec<Value>) -> ExecResult<Vec<Value>>>;

/// Named host function.
#[derive(Clone)]
pub struct HostFunc {
    pub name: Rc<str>,
    call: HostFn,
}

impl HostFunc {
    pub fn new(
        name: &str,
        call: impl Fn(&mut Vm, Vec<Value>) -> ExecResult<Vec<Value>> + 'static,
    ) -> Self {
        HostFunc {
            name: Rc::from(name),
            call: Rc::new(call),
        }
    }

    /// Invoke with arguments in source order.
    pub fn call(&self, vm: &mut Vm, args: Vec<Value>) -> ExecResult<Vec<Value>> {
        (self.call)(vm, args)
    }
}
