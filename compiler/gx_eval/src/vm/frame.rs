//! Call frames.

use gx_ir::Span;

use crate::env::ScopeRef;
use crate::errors::{operand_underflow, ExecResult};
use crate::flow::{Arity, DeferredBuiltin};
use crate::value::Value;

/// What a deferred invocation calls.
pub(crate) enum InvocationTarget {
    Func(Value),
    Builtin(DeferredBuiltin),
}

/// A call captured by `defer`: target and arguments are evaluated when the
/// `defer` statement runs.
pub(crate) struct FuncInvocation {
    pub(crate) target: InvocationTarget,
    pub(crate) args: Vec<Value>,
    pub(crate) spread: bool,
    pub(crate) span: Span,
}

/// State of one active call.
pub(crate) struct Frame {
    operands: Vec<Value>,
    /// Innermost scope.
    pub(crate) scope: ScopeRef,
    /// Scope holding parameters and named results.
    pub(crate) func_scope: ScopeRef,
    /// Scopes pushed above `func_scope`.
    pub(crate) depth: u32,
    pub(crate) defers: Vec<FuncInvocation>,
    /// Values of the executed `return`, if any.
    pub(crate) results: Option<Vec<Value>>,
}

impl Frame {
    pub(crate) fn new(operands: Vec<Value>, scope: ScopeRef) -> Self {
        Frame {
            operands,
            func_scope: scope.clone(),
            scope,
            depth: 0,
            defers: Vec::new(),
            results: None,
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, value: Value) {
        self.operands.push(value);
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> ExecResult<Value> {
        self.operands
            .pop()
            .ok_or_else(|| operand_underflow().into())
    }

    pub(crate) fn peek(&self) -> ExecResult<&Value> {
        self.operands
            .last()
            .ok_or_else(|| operand_underflow().into())
    }

    /// Top `n` values, deepest first, without popping.
    pub(crate) fn peek_n(&self, n: usize) -> ExecResult<Vec<Value>> {
        let start = self
            .operands
            .len()
            .checked_sub(n)
            .ok_or_else(operand_underflow)?;
        Ok(self.operands[start..].to_vec())
    }

    /// Pop `n` values, deepest first.
    pub(crate) fn take_n(&mut self, n: usize) -> ExecResult<Vec<Value>> {
        let start = self
            .operands
            .len()
            .checked_sub(n)
            .ok_or_else(operand_underflow)?;
        Ok(self.operands.split_off(start))
    }

    /// Pop values laid out per `arity`, in source order.
    pub(crate) fn take(&mut self, arity: Arity) -> ExecResult<Vec<Value>> {
        match arity {
            Arity::Fixed(n) => self.take_n(usize::from(n)),
            Arity::Forwarded => {
                let count = self
                    .pop()?
                    .as_int()
                    .and_then(|n| usize::try_from(n.as_i128()).ok())
                    .ok_or_else(operand_underflow)?;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(self.pop()?);
                }
                Ok(values)
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.operands.len()
    }

    /// Operand stack rendered top first.
    pub(crate) fn dump(&self) -> Vec<String> {
        self.operands.iter().rev().map(|v| format!("{v:?}")).collect()
    }

    pub(crate) fn into_operands(self) -> Vec<Value> {
        self.operands
    }

    /// Operand storage and the function scope, dropping every other
    /// reference the frame holds to it.
    pub(crate) fn finish(self) -> (Vec<Value>, ScopeRef) {
        let Frame {
            operands,
            scope,
            func_scope,
            defers,
            results,
            ..
        } = self;
        drop((scope, defers, results));
        (operands, func_scope)
    }
}
