//! The step machine.
//!
//! A [`Vm`] runs [`FlowGraph`]s. Each source-level call gets a [`Frame`]
//! (operand stack, scope chain, deferred calls) and one Rust-level call of
//! [`Vm::run`]; panics travel back up as [`Unwind::Panic`] and are caught
//! by functions that registered deferred calls.
//!
//! - `exec`: per-step semantics
//! - `call`: call protocol, deferred calls, `recover`
//! - `assign`: stores through assignment targets, address-of
//! - `selector`: field and method selection, dynamic type tests
//! - `range`: range cursors
//! - `format`: `%v` rendering and `Printf`

mod assign;
mod call;
mod exec;
mod format;
mod frame;
mod range;
mod selector;

use std::rc::Rc;

use gx_ir::{Name, SharedInterner, Span};

pub use range::RangeCursor;

pub(crate) use frame::Frame;

use crate::config::VmConfig;
use crate::env::{ScopePool, ScopeRef};
use crate::errors::{
    panic_error, undefined_variable, BacktraceFrame, EvalBacktrace, EvalError, ExecResult, Unwind,
};
use crate::flow::{CompiledFunc, FlowGraph, StepId};
use crate::heap::Heap;
use crate::ops::OperatorTable;
use crate::print_handler::SharedPrintHandler;
use crate::types::TypeTable;
use crate::value::Value;

/// Upper bound on pooled operand vectors.
const MAX_POOLED_OPERANDS: usize = 64;

/// Names the VM compares against on hot paths.
#[derive(Clone, Copy)]
pub(crate) struct VmNames {
    pub(crate) blank: Name,
    pub(crate) string_method: Name,
    pub(crate) error_method: Name,
}

impl VmNames {
    fn new(interner: &SharedInterner) -> Self {
        VmNames {
            blank: interner.intern("_"),
            string_method: interner.intern("String"),
            error_method: interner.intern("Error"),
        }
    }
}

/// One active source-level call.
pub(crate) struct CallRecord {
    pub(crate) name: Name,
    pub(crate) span: Span,
    /// Panic being handled by this call's deferred calls.
    pub(crate) panic: Option<Value>,
    /// For a deferred call: the record whose defer list is running it.
    pub(crate) deferred_by: Option<usize>,
}

/// Outcome of one step.
pub(crate) enum Flow {
    Next,
    Goto(Option<StepId>),
    Return,
}

/// The virtual machine.
pub struct Vm {
    pub(crate) interner: SharedInterner,
    pub(crate) types: TypeTable,
    pub(crate) operators: Rc<OperatorTable>,
    pub(crate) heap: Heap,
    pub(crate) scopes: ScopePool,
    pub(crate) call_stack: Vec<CallRecord>,
    pub(crate) config: VmConfig,
    pub(crate) names: VmNames,
    operand_pool: Vec<Vec<Value>>,
    /// Package initialization: unknown names are `Undeclared`, not fatal.
    init_mode: bool,
    /// Set while a deferred call is being started.
    pending_deferred_by: Option<usize>,
    /// Call stack captured where the in-flight panic was raised.
    panic_trace: Option<EvalBacktrace>,
}

impl Vm {
    pub fn new(config: VmConfig, interner: SharedInterner) -> Self {
        Vm {
            names: VmNames::new(&interner),
            types: TypeTable::new(interner.clone()),
            interner,
            operators: Rc::new(OperatorTable::new()),
            heap: Heap::new(),
            scopes: ScopePool::new(),
            call_stack: Vec::new(),
            config,
            operand_pool: Vec::new(),
            init_mode: false,
            pending_deferred_by: None,
            panic_trace: None,
        }
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeTable {
        &mut self.types
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// The configured output sink.
    pub fn print_handler(&self) -> SharedPrintHandler {
        std::sync::Arc::clone(&self.config.print_handler)
    }

    /// Number of active source-level calls.
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Fresh scope with no parent.
    pub fn new_root_scope(&mut self) -> ScopeRef {
        self.scopes.root()
    }

    pub fn set_init_mode(&mut self, enabled: bool) {
        self.init_mode = enabled;
    }

    /// Call a function value and convert an escaping unwind into an error.
    pub fn call_function(&mut self, callee: &Value, args: Vec<Value>) -> Result<Vec<Value>, EvalError> {
        match self.call_value(callee, args) {
            Ok(results) => Ok(results),
            Err(unwind) => Err(self.to_eval_error(unwind)),
        }
    }

    /// Run a compiled unit directly in `scope` (package initializers).
    pub fn exec_unit(&mut self, unit: &CompiledFunc, scope: &ScopeRef) -> ExecResult {
        let mut frame = Frame::new(self.take_operands(), scope.clone());
        let outcome = self.run(&mut frame, &unit.graph, unit.graph.entry());
        self.unwind_scopes(&mut frame, 0);
        self.recycle_operands(frame.into_operands());
        outcome
    }

    /// Error the embedder sees for an unwind that escaped evaluation.
    pub fn to_eval_error(&mut self, unwind: Unwind) -> EvalError {
        match unwind {
            Unwind::Fatal(err) => *err,
            Unwind::Panic(payload) => {
                let message = self
                    .format_value(&payload)
                    .unwrap_or_else(|_| payload.kind_name().to_string());
                let err = panic_error(message);
                match self.panic_trace.take() {
                    Some(trace) => err.with_backtrace(trace),
                    None => err,
                }
            }
            Unwind::Undeclared(name) => undefined_variable(self.interner.lookup(name)),
        }
    }

    /// Execute `graph` from `entry` until a `Return` step or a step with no
    /// successor.
    pub(crate) fn run(
        &mut self,
        frame: &mut Frame,
        graph: &FlowGraph,
        entry: Option<StepId>,
    ) -> ExecResult {
        let mut pc = entry;
        while let Some(id) = pc {
            let Some(step) = graph.step(id) else {
                return Err(EvalError::new(format!("step {id:?} out of range")).into());
            };
            if self.config.trace_steps {
                tracing::trace!(step = ?id, op = ?step.op, operands = frame.len(), "step");
            }
            match self.exec_step(frame, graph, step) {
                Ok(Flow::Next) => pc = step.next,
                Ok(Flow::Goto(target)) => pc = target,
                Ok(Flow::Return) => return Ok(()),
                Err(unwind) => return Err(self.annotate(unwind, frame, step.span)),
            }
        }
        Ok(())
    }

    fn annotate(&mut self, unwind: Unwind, frame: &Frame, span: Span) -> Unwind {
        match unwind {
            Unwind::Fatal(mut err) => {
                *err = err.with_span(span);
                if err.backtrace.is_none() {
                    err.backtrace = Some(self.backtrace());
                }
                if err.operands.is_empty() {
                    err.operands = frame.dump();
                }
                Unwind::Fatal(err)
            }
            Unwind::Panic(payload) => {
                if self.panic_trace.is_none() {
                    self.panic_trace = Some(self.backtrace());
                }
                Unwind::Panic(payload)
            }
            undeclared @ Unwind::Undeclared(_) => undeclared,
        }
    }

    /// Current call stack, innermost first.
    pub(crate) fn backtrace(&self) -> EvalBacktrace {
        EvalBacktrace::new(
            self.call_stack
                .iter()
                .rev()
                .map(|record| BacktraceFrame {
                    name: self.interner.lookup(record.name).to_string(),
                    span: (record.span != Span::DUMMY).then_some(record.span),
                })
                .collect(),
        )
    }

    /// Pop scopes until the frame is `depth` scopes above its function scope.
    pub(crate) fn unwind_scopes(&mut self, frame: &mut Frame, depth: u32) {
        while frame.depth > depth {
            let Some(parent) = frame.scope.borrow().parent().cloned() else {
                break;
            };
            let exited = std::mem::replace(&mut frame.scope, parent);
            self.scopes.release(exited);
            frame.depth -= 1;
        }
    }

    pub(crate) fn take_operands(&mut self) -> Vec<Value> {
        self.operand_pool.pop().unwrap_or_default()
    }

    pub(crate) fn recycle_operands(&mut self, mut operands: Vec<Value>) {
        if self.operand_pool.len() < MAX_POOLED_OPERANDS {
            operands.clear();
            self.operand_pool.push(operands);
        }
    }

    /// Whether unknown globals raise `Undeclared`.
    pub(crate) fn in_init_mode(&self) -> bool {
        self.init_mode
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
