//! Compiled step graphs.
//!
//! A function body compiles to a [`FlowGraph`]: a vector of [`Step`]s, each
//! with an operation and a `next` successor. Branching steps carry a second
//! successor in their payload. The graph is immutable once built and shared
//! by every invocation of the function.
//!
//! Every successor slot is written exactly once; the builder treats a
//! second write as an internal error.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use gx_ir::{BinaryOp, Name, Param, Receiver, Span, Type, UnaryOp};
use smallvec::SmallVec;

use crate::builder::CompileError;
use crate::builtins::Builtin;
use crate::ops::BinaryFn;
use crate::value::Value;

/// Index of a step within its graph.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(u32);

impl StepId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How many values an operation takes from (or leaves on) the stack.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Arity {
    /// Exactly `n` values, first value deepest.
    Fixed(u16),
    /// A count on top, then that many values with the first value on top:
    /// the layout a multi-result call leaves behind.
    Forwarded,
}

/// What a call leaves on the operand stack.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CallResults {
    /// Nothing (expression statements).
    Discard,
    /// The first result, or nil for result-less calls.
    One,
    /// All results in [`Arity::Forwarded`] layout.
    Forward,
}

/// Assignment destination. Operands listed are pushed before the values.
#[derive(Clone, PartialEq, Debug)]
pub enum Target {
    /// Variable (no operands).
    Var(Name),
    /// `_` (no operands).
    Discard,
    /// `base[key]` (operands: base, key).
    Index,
    /// `base.field` (operand: struct or pointer to struct).
    Field(Name),
    /// `*p` (operand: pointer).
    Deref,
}

impl Target {
    /// Operand count consumed from the stack.
    pub fn operands(&self) -> usize {
        match self {
            Target::Var(_) | Target::Discard => 0,
            Target::Field(_) | Target::Deref => 1,
            Target::Index => 2,
        }
    }
}

/// Operand of `&`.
#[derive(Clone, PartialEq, Debug)]
pub enum AddrKind {
    /// `&x`
    Var(Name),
    /// `&base.field` (operand: base)
    Field(Name),
    /// `&base[i]` (operands: base, index)
    Index,
    /// Box a copy of the operand (`&T{...}`).
    Value,
}

/// Range cursor kind, chosen from the static type when known.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RangeKind {
    /// Slice, array, or pointer to array.
    Indexed,
    Str,
    Map,
    Int,
    Chan,
    /// Probe the runtime value.
    Dynamic,
}

/// Element layout of a composite literal.
#[derive(Clone, PartialEq, Debug)]
pub enum ComposeKeys {
    /// Struct fields in declaration order.
    Positional(usize),
    /// Struct fields by name.
    Fields(Vec<Name>),
    /// Array/slice elements; `true` marks an element preceded by its index.
    Seq(Vec<bool>),
    /// Map entries, pushed as key, value pairs.
    Map(usize),
}

impl ComposeKeys {
    /// Number of stack operands the literal consumes.
    pub fn operands(&self) -> usize {
        match self {
            ComposeKeys::Positional(n) => *n,
            ComposeKeys::Fields(names) => names.len(),
            ComposeKeys::Seq(keyed) => keyed.len() + keyed.iter().filter(|k| **k).count(),
            ComposeKeys::Map(n) => n * 2,
        }
    }
}

/// Deferred built-in call.
#[derive(Clone, PartialEq, Debug)]
pub struct DeferredBuiltin {
    pub builtin: Builtin,
    pub ty: Option<Type>,
}

/// Step payload.
#[derive(Clone)]
pub enum StepOp {
    Nop,
    Const(Value),
    Load(Name),
    /// Pop `arity` values and bind them to `names` in the current scope,
    /// converting to `ty` when given.
    Declare {
        names: SmallVec<[Name; 2]>,
        ty: Option<Type>,
        arity: Arity,
    },
    /// Bind zero values of `ty`.
    DeclareZero {
        names: SmallVec<[Name; 2]>,
        ty: Type,
    },
    /// Pop `arity` values, then each target's operands, and store in order.
    Assign {
        targets: SmallVec<[Target; 2]>,
        arity: Arity,
    },
    /// Peek `target`'s operands and push its current value. `ty` supplies
    /// the zero value for a missing map entry.
    LoadTarget {
        target: Target,
        ty: Option<Type>,
    },
    Binary {
        op: BinaryOp,
        func: Option<BinaryFn>,
    },
    Unary(UnaryOp),
    AddrOf(AddrKind),
    Deref,
    /// Pop a bool; `next` on true, `else_` on false.
    Branch {
        else_: Option<StepId>,
    },
    /// `&&` / `||`: if the top bool equals `when`, keep it and go to
    /// `else_`; otherwise pop it and continue with the right operand.
    ShortCircuit {
        when: bool,
        else_: Option<StepId>,
    },
    /// Pop scopes down to `depth`, then go to `next`.
    Jump {
        depth: u32,
    },
    PushScope,
    PopScope,
    /// Copy per-iteration loop variables out to the enclosing loop scope.
    CarryOut(SmallVec<[Name; 2]>),
    /// Pop the callee, then the arguments.
    Call {
        args: Arity,
        spread: bool,
        results: CallResults,
    },
    CallBuiltin {
        builtin: Builtin,
        ty: Option<Type>,
        args: Arity,
        spread: bool,
        results: CallResults,
    },
    Return(Arity),
    /// Run the detached chain at `entry` (which leaves arguments and then
    /// the callee on the stack) and register the invocation.
    Defer {
        entry: StepId,
        args: Arity,
        spread: bool,
        builtin: Option<DeferredBuiltin>,
    },
    /// Pop index and base. `elem` is the map value type when known.
    Index {
        comma_ok: bool,
        elem: Option<Type>,
    },
    /// Operands: base, then the present bounds in order.
    SliceExpr {
        low: bool,
        high: bool,
        max: bool,
    },
    Select(Name),
    Compose {
        ty: Type,
        keys: ComposeKeys,
    },
    Closure(Rc<CompiledFunc>),
    TypeAssert {
        ty: Type,
        comma_ok: bool,
    },
    /// Pop a value, push whether its dynamic type matches.
    TypeTest(Type),
    Convert(Type),
    Send,
    Recv {
        comma_ok: bool,
    },
    /// Pop the range operand and bind a cursor to `cursor`.
    RangeInit {
        kind: RangeKind,
        cursor: Name,
    },
    /// Advance `cursor`; push key (and value) or go to `exit` when done.
    RangeNext {
        cursor: Name,
        value: bool,
        exit: Option<StepId>,
    },
    Pop,
}

impl fmt::Debug for StepOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOp::Nop => f.write_str("Nop"),
            StepOp::Const(v) => write!(f, "Const({v:?})"),
            StepOp::Load(n) => write!(f, "Load({n:?})"),
            StepOp::Declare { names, arity, .. } => write!(f, "Declare({names:?}, {arity:?})"),
            StepOp::DeclareZero { names, .. } => write!(f, "DeclareZero({names:?})"),
            StepOp::Assign { targets, arity } => write!(f, "Assign({targets:?}, {arity:?})"),
            StepOp::LoadTarget { target, .. } => write!(f, "LoadTarget({target:?})"),
            StepOp::Binary { op, func } => {
                write!(f, "Binary({}{})", op.as_symbol(), if func.is_some() { ", resolved" } else { "" })
            }
            StepOp::Unary(op) => write!(f, "Unary({})", op.as_symbol()),
            StepOp::AddrOf(kind) => write!(f, "AddrOf({kind:?})"),
            StepOp::Deref => f.write_str("Deref"),
            StepOp::Branch { else_ } => write!(f, "Branch(else {else_:?})"),
            StepOp::ShortCircuit { when, else_ } => write!(f, "ShortCircuit({when}, {else_:?})"),
            StepOp::Jump { depth } => write!(f, "Jump(depth {depth})"),
            StepOp::PushScope => f.write_str("PushScope"),
            StepOp::PopScope => f.write_str("PopScope"),
            StepOp::CarryOut(names) => write!(f, "CarryOut({names:?})"),
            StepOp::Call { args, results, .. } => write!(f, "Call({args:?}, {results:?})"),
            StepOp::CallBuiltin { builtin, args, .. } => {
                write!(f, "CallBuiltin({}, {args:?})", builtin.name())
            }
            StepOp::Return(arity) => write!(f, "Return({arity:?})"),
            StepOp::Defer { entry, .. } => write!(f, "Defer({entry:?})"),
            StepOp::Index { comma_ok, .. } => write!(f, "Index(comma_ok {comma_ok})"),
            StepOp::SliceExpr { .. } => f.write_str("SliceExpr"),
            StepOp::Select(n) => write!(f, "Select({n:?})"),
            StepOp::Compose { keys, .. } => write!(f, "Compose({keys:?})"),
            StepOp::Closure(func) => write!(f, "Closure({:?})", func.name),
            StepOp::TypeAssert { comma_ok, .. } => write!(f, "TypeAssert(comma_ok {comma_ok})"),
            StepOp::TypeTest(_) => f.write_str("TypeTest"),
            StepOp::Convert(_) => f.write_str("Convert"),
            StepOp::Send => f.write_str("Send"),
            StepOp::Recv { comma_ok } => write!(f, "Recv(comma_ok {comma_ok})"),
            StepOp::RangeInit { kind, .. } => write!(f, "RangeInit({kind:?})"),
            StepOp::RangeNext { exit, .. } => write!(f, "RangeNext(exit {exit:?})"),
            StepOp::Pop => f.write_str("Pop"),
        }
    }
}

/// One executable unit.
#[derive(Clone, Debug)]
pub struct Step {
    pub op: StepOp,
    pub next: Option<StepId>,
    pub span: Span,
}

/// Which successor of a step a dangling edge refers to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Edge {
    Next,
    /// The alternate successor of `Branch`, `ShortCircuit` or `RangeNext`.
    Else,
}

/// A successor slot waiting to be linked.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Slot {
    pub step: StepId,
    pub edge: Edge,
}

/// A function body's steps. Execution starts at the first step.
#[derive(Clone, Debug, Default)]
pub struct FlowGraph {
    steps: Vec<Step>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unlinked step.
    pub fn push(&mut self, op: StepOp, span: Span) -> StepId {
        let id = StepId(u32::try_from(self.steps.len()).unwrap_or(u32::MAX));
        self.steps.push(Step {
            op,
            next: None,
            span,
        });
        id
    }

    pub fn entry(&self) -> Option<StepId> {
        (!self.steps.is_empty()).then_some(StepId(0))
    }

    /// Next id `push` will hand out.
    pub fn next_id(&self) -> StepId {
        StepId(u32::try_from(self.steps.len()).unwrap_or(u32::MAX))
    }

    #[inline]
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.get(id.index())
    }

    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Point `slot` at `target`. Each slot may be linked once.
    pub fn link(&mut self, slot: Slot, target: StepId) -> Result<(), CompileError> {
        let double = || CompileError::DoubleLink {
            step: slot.step.index(),
        };
        let step = self
            .steps
            .get_mut(slot.step.index())
            .ok_or_else(double)?;
        let place = match slot.edge {
            Edge::Next => &mut step.next,
            Edge::Else => match &mut step.op {
                StepOp::Branch { else_ }
                | StepOp::ShortCircuit { else_, .. }
                | StepOp::RangeNext { exit: else_, .. } => else_,
                _ => return Err(double()),
            },
        };
        if place.is_some() {
            return Err(double());
        }
        *place = Some(target);
        Ok(())
    }
}

bitflags! {
    /// Properties of a compiled function fixed at compile time.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct FuncFlags: u8 {
        /// Contains a `defer` statement; calls catch panics and run defers.
        const HAS_DEFER = 1 << 0;
        /// Results are named variables read after defers run.
        const NAMED_RESULTS = 1 << 1;
        /// Last parameter is variadic.
        const VARIADIC = 1 << 2;
        /// Declared with a receiver.
        const METHOD = 1 << 3;
        /// Function literal (closure).
        const LITERAL = 1 << 4;
    }
}

/// A function compiled to a step graph.
#[derive(Debug)]
pub struct CompiledFunc {
    pub name: Name,
    pub graph: FlowGraph,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    pub recv: Option<Receiver>,
    pub flags: FuncFlags,
    pub span: Span,
}

impl CompiledFunc {
    #[inline]
    pub fn has_defer(&self) -> bool {
        self.flags.contains(FuncFlags::HAS_DEFER)
    }

    #[inline]
    pub fn is_variadic(&self) -> bool {
        self.flags.contains(FuncFlags::VARIADIC)
    }

    #[inline]
    pub fn has_named_results(&self) -> bool {
        self.flags.contains(FuncFlags::NAMED_RESULTS)
    }
}

#[cfg(test)]
mod tests;
