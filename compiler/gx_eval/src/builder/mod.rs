//! Syntax tree → step graph lowering.
//!
//! Each function body is walked once. Steps are appended to a
//! [`FlowGraph`] and the builder keeps a list of *dangling* successor slots
//! (the `next` or `else` edge of steps whose continuation is not known
//! yet); emitting a step links every dangling slot to it. Structured
//! control flow therefore needs no basic blocks: a construct leaves its
//! exits dangling and whatever is compiled next picks them up.
//!
//! # Entry points
//!
//! - [`compile_function`] for declared functions and methods.
//! - [`compile_var_unit`] / [`compile_const_unit`] for package-level
//!   initializers, which run directly in the package scope.
//!
//! # Layout
//!
//! - `expr.rs`: expressions, calls, selectors, composite literals
//! - `stmt.rs`: simple statements, `if`, `for`, jumps, `return`, `defer`
//! - `switch.rs`: expression and type switches
//! - `range.rs`: `for ... range`
//! - `decl.rs`: declarations and package-level units

mod decl;
mod expr;
mod range;
mod stmt;
mod switch;

use std::rc::Rc;

use gx_ir::{
    FuncDecl, FuncType, IntKind, Name, Param, Receiver, SharedInterner, Signature, Span, Type,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::flow::{CompiledFunc, Edge, FlowGraph, FuncFlags, Slot, StepId, StepOp};
use crate::ops::OperatorTable;
use crate::types::TypeTable;

pub use decl::{compile_const_unit, compile_var_unit, expand_const_block, ConstEntry};
pub use expr::initializer_type;

// Diagnostics

/// Problem that stops a function from compiling.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("unsupported construct: {what}")]
    UnsupportedConstruct { what: String, span: Span },
    #[error("label {label} not defined")]
    UnknownLabel { label: String, span: Span },
    #[error("label {label} already defined")]
    DuplicateLabel { label: String, span: Span },
    #[error("break is not in a loop, switch, or select")]
    MisplacedBreak { span: Span },
    #[error("continue is not in a loop")]
    MisplacedContinue { span: Span },
    #[error("fallthrough statement out of place")]
    MisplacedFallthrough { span: Span },
    #[error("go statements are not supported")]
    GoStatement { span: Span },
    #[error("internal error: successor of step {step} linked twice")]
    DoubleLink { step: usize },
    #[error("type {name} redeclared")]
    DuplicateType { name: String },
    #[error("cannot assign to expression")]
    InvalidAssignTarget { span: Span },
}

impl CompileError {
    /// Source location, when the error has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::UnsupportedConstruct { span, .. }
            | CompileError::UnknownLabel { span, .. }
            | CompileError::DuplicateLabel { span, .. }
            | CompileError::MisplacedBreak { span }
            | CompileError::MisplacedContinue { span }
            | CompileError::MisplacedFallthrough { span }
            | CompileError::GoStatement { span }
            | CompileError::InvalidAssignTarget { span } => Some(*span),
            CompileError::DoubleLink { .. } | CompileError::DuplicateType { .. } => None,
        }
    }
}

#[cold]
pub(crate) fn unsupported(what: impl Into<String>, span: Span) -> CompileError {
    let what = what.into();
    tracing::warn!(what = %what, "unsupported construct");
    CompileError::UnsupportedConstruct { what, span }
}

// Package context

/// Names the builder treats specially unless shadowed.
struct BuilderNames {
    blank: Name,
    true_: Name,
    false_: Name,
    nil: Name,
    iota: Name,
    init: Name,
    func_lit: Name,
}

impl BuilderNames {
    fn new(interner: &SharedInterner) -> Self {
        BuilderNames {
            blank: interner.intern("_"),
            true_: interner.intern("true"),
            false_: interner.intern("false"),
            nil: interner.intern("nil"),
            iota: interner.intern("iota"),
            init: interner.intern("init"),
            func_lit: interner.intern("func"),
        }
    }
}

/// Package-wide knowledge shared by every function compiled in a package:
/// what is declared at package level, and the static signatures the
/// builder uses to pick literal types and resolve operators early.
pub struct Compiler<'a> {
    interner: &'a SharedInterner,
    types: &'a mut TypeTable,
    operators: &'a OperatorTable,
    globals: FxHashMap<Name, Option<Type>>,
    imports: FxHashSet<Name>,
    funcs: FxHashMap<Name, Rc<FuncType>>,
    methods: FxHashMap<(Name, Name), Rc<FuncType>>,
    /// `(type, method)` pairs declared with a pointer receiver.
    pointer_methods: FxHashSet<(Name, Name)>,
    /// Method names declared with a pointer receiver on any type.
    pointer_method_names: FxHashSet<Name>,
    basic_types: FxHashMap<Name, Type>,
    names: BuilderNames,
}

impl<'a> Compiler<'a> {
    pub fn new(
        interner: &'a SharedInterner,
        types: &'a mut TypeTable,
        operators: &'a OperatorTable,
    ) -> Self {
        let mut basic_types = FxHashMap::default();
        for kind in IntKind::ALL {
            basic_types.insert(interner.intern(kind.name()), Type::Int(kind));
        }
        for (name, ty) in [
            ("byte", Type::Int(IntKind::Uint8)),
            ("rune", Type::Int(IntKind::Int32)),
            ("bool", Type::Bool),
            ("float32", Type::Float32),
            ("float64", Type::Float64),
            ("complex64", Type::Complex64),
            ("complex128", Type::Complex128),
            ("string", Type::String),
        ] {
            basic_types.insert(interner.intern(name), ty);
        }
        Compiler {
            names: BuilderNames::new(interner),
            interner,
            types,
            operators,
            globals: FxHashMap::default(),
            imports: FxHashSet::default(),
            funcs: FxHashMap::default(),
            methods: FxHashMap::default(),
            pointer_methods: FxHashSet::default(),
            pointer_method_names: FxHashSet::default(),
            basic_types,
        }
    }

    /// Package-level variable or constant, with its static type if known.
    pub fn declare_global(&mut self, name: Name, ty: Option<Type>) {
        self.globals.insert(name, ty);
    }

    /// Name an import is bound to.
    pub fn declare_import(&mut self, name: Name) {
        self.imports.insert(name);
    }

    /// Package-level function.
    pub fn declare_func(&mut self, name: Name, sig: &Signature) {
        self.funcs.insert(name, signature_type(sig));
    }

    /// Method of a declared type.
    pub fn declare_method(&mut self, recv: &Receiver, name: Name, sig: &Signature) {
        self.methods
            .insert((recv.type_name, name), signature_type(sig));
        if recv.pointer {
            self.pointer_methods.insert((recv.type_name, name));
            self.pointer_method_names.insert(name);
        }
    }

    pub fn types(&self) -> &TypeTable {
        self.types
    }

    fn is_package_level(&self, name: Name) -> bool {
        self.globals.contains_key(&name)
            || self.funcs.contains_key(&name)
            || self.imports.contains(&name)
    }
}

fn signature_type(sig: &Signature) -> Rc<FuncType> {
    Rc::new(FuncType {
        params: sig.params.iter().map(|p| p.ty.clone()).collect(),
        results: sig.results.iter().map(|p| p.ty.clone()).collect(),
        variadic: sig.variadic,
    })
}

/// Compile a declared function or method.
#[tracing::instrument(level = "debug", skip_all, fields(func = cx.interner.lookup(decl.name)))]
pub fn compile_function(
    cx: &mut Compiler<'_>,
    decl: &FuncDecl,
) -> Result<Rc<CompiledFunc>, CompileError> {
    let mut flags = FuncFlags::empty();
    if decl.recv.is_some() {
        flags |= FuncFlags::METHOD;
    }
    let mut builder = FuncBuilder::new(cx, &decl.sig, flags, Vec::new());
    if let Some(recv) = &decl.recv {
        if let Some(name) = recv.name {
            let named = Type::Named(recv.type_name);
            let ty = if recv.pointer {
                Type::pointer(named)
            } else {
                named
            };
            builder.declare_local(name, Some(ty));
        }
    }
    builder.compile_stmts(&decl.body.stmts)?;
    let func = builder.finish(decl.name, &decl.sig, decl.recv.clone(), decl.span)?;
    tracing::debug!(steps = func.graph.len(), flags = ?func.flags, "compiled");
    Ok(Rc::new(func))
}

// Function builder

/// Static types of the names declared in one lexical scope.
type LocalScope = FxHashMap<Name, Option<Type>>;

#[derive(Copy, Clone)]
struct LabelTarget {
    step: StepId,
    depth: u32,
}

/// `goto` waiting for its label.
struct PendingGoto {
    jump: StepId,
    label: Name,
    span: Span,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ContextKind {
    Loop,
    Switch,
}

/// Enclosing loop or switch, for `break` and `continue`.
struct JumpContext {
    kind: ContextKind,
    label: Option<Name>,
    /// Scope depth at the exit.
    break_depth: u32,
    /// Scope depth at the continue target.
    continue_depth: u32,
    breaks: Vec<Slot>,
    continues: Vec<Slot>,
}

impl JumpContext {
    fn new(kind: ContextKind, label: Option<Name>, depth: u32) -> Self {
        JumpContext {
            kind,
            label,
            break_depth: depth,
            continue_depth: depth,
            breaks: Vec::new(),
            continues: Vec::new(),
        }
    }
}

/// In-progress function.
pub(crate) struct FuncBuilder<'c, 'a> {
    cx: &'c mut Compiler<'a>,
    graph: FlowGraph,
    /// Slots linked to the next emitted step.
    pending: Vec<Slot>,
    /// Scopes pushed above the function scope.
    depth: u32,
    locals: Vec<LocalScope>,
    labels: FxHashMap<Name, LabelTarget>,
    gotos: Vec<PendingGoto>,
    contexts: Vec<JumpContext>,
    flags: FuncFlags,
    results: Vec<Param>,
    temps: u32,
    /// Value of `iota` while compiling a constant spec.
    iota: Option<i128>,
    /// Label of the statement being compiled, for the loop or switch it names.
    pending_label: Option<Name>,
}

impl<'c, 'a> FuncBuilder<'c, 'a> {
    /// Builder for a body with `sig`. `enclosing` holds the local scopes of
    /// the function a literal is nested in.
    fn new(
        cx: &'c mut Compiler<'a>,
        sig: &Signature,
        mut flags: FuncFlags,
        mut enclosing: Vec<LocalScope>,
    ) -> Self {
        if sig.variadic {
            flags |= FuncFlags::VARIADIC;
        }
        if sig.has_named_results() {
            flags |= FuncFlags::NAMED_RESULTS;
        }
        let mut scope = LocalScope::default();
        let last = sig.params.len().saturating_sub(1);
        for (i, param) in sig.params.iter().enumerate() {
            if let Some(name) = param.name {
                let ty = if sig.variadic && i == last {
                    Type::slice(param.ty.clone())
                } else {
                    param.ty.clone()
                };
                scope.insert(name, Some(ty));
            }
        }
        for result in &sig.results {
            if let Some(name) = result.name {
                scope.insert(name, Some(result.ty.clone()));
            }
        }
        enclosing.push(scope);
        FuncBuilder {
            cx,
            graph: FlowGraph::new(),
            pending: Vec::new(),
            depth: 0,
            locals: enclosing,
            labels: FxHashMap::default(),
            gotos: Vec::new(),
            contexts: Vec::new(),
            flags,
            results: sig.results.clone(),
            temps: 0,
            iota: None,
            pending_label: None,
        }
    }

    /// Resolve `goto`s and package the graph.
    fn finish(
        mut self,
        name: Name,
        sig: &Signature,
        recv: Option<Receiver>,
        span: Span,
    ) -> Result<CompiledFunc, CompileError> {
        for goto in std::mem::take(&mut self.gotos) {
            let Some(target) = self.labels.get(&goto.label).copied() else {
                return Err(CompileError::UnknownLabel {
                    label: self.cx.interner.lookup(goto.label).to_string(),
                    span: goto.span,
                });
            };
            if let Some(step) = self.graph.step_mut(goto.jump) {
                step.op = StepOp::Jump {
                    depth: target.depth,
                };
            }
            self.graph.link(
                Slot {
                    step: goto.jump,
                    edge: Edge::Next,
                },
                target.step,
            )?;
        }
        Ok(CompiledFunc {
            name,
            graph: self.graph,
            params: sig.params.clone(),
            results: sig.results.clone(),
            recv,
            flags: self.flags,
            span,
        })
    }

    // ── Emission ───────────────────────────────────────────────

    /// Append a step and link every dangling slot to it. The new step's
    /// `next` becomes the only dangling slot.
    fn emit(&mut self, op: StepOp, span: Span) -> Result<StepId, CompileError> {
        let id = self.graph.push(op, span);
        for slot in std::mem::take(&mut self.pending) {
            self.graph.link(slot, id)?;
        }
        self.pending.push(Slot {
            step: id,
            edge: Edge::Next,
        });
        Ok(id)
    }

    /// Emit a conditional step; returns its `else` slot. The true path
    /// continues as the dangling `next`.
    fn emit_branch(&mut self, op: StepOp, span: Span) -> Result<Slot, CompileError> {
        let step = self.emit(op, span)?;
        Ok(Slot {
            step,
            edge: Edge::Else,
        })
    }

    fn branch(&mut self, span: Span) -> Result<Slot, CompileError> {
        self.emit_branch(StepOp::Branch { else_: None }, span)
    }

    /// Emit a `Jump` to scope depth `depth`; returns its unlinked `next`.
    /// Nothing is dangling afterwards.
    fn jump(&mut self, depth: u32, span: Span) -> Result<Slot, CompileError> {
        let step = self.emit(StepOp::Jump { depth }, span)?;
        self.pending.clear();
        Ok(Slot {
            step,
            edge: Edge::Next,
        })
    }

    fn link_all(&mut self, slots: Vec<Slot>, target: StepId) -> Result<(), CompileError> {
        for slot in slots {
            self.graph.link(slot, target)?;
        }
        Ok(())
    }

    // ── Scopes ─────────────────────────────────────────────────

    fn enter_scope(&mut self, span: Span) -> Result<(), CompileError> {
        self.emit(StepOp::PushScope, span)?;
        self.depth += 1;
        self.locals.push(LocalScope::default());
        Ok(())
    }

    fn leave_scope(&mut self, span: Span) -> Result<(), CompileError> {
        self.emit(StepOp::PopScope, span)?;
        self.depth = self.depth.saturating_sub(1);
        self.locals.pop();
        Ok(())
    }

    fn declare_local(&mut self, name: Name, ty: Option<Type>) {
        if name == self.cx.names.blank {
            return;
        }
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name, ty);
        }
    }

    /// Static type of a local; `None` when `name` is not local.
    fn local(&self, name: Name) -> Option<Option<&Type>> {
        self.locals
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name))
            .map(Option::as_ref)
    }

    /// Whether `name` refers to a declaration rather than a predeclared
    /// identifier.
    fn is_shadowed(&self, name: Name) -> bool {
        self.local(name).is_some() || self.cx.is_package_level(name)
    }

    /// Fresh compiler-internal variable name.
    fn temp(&mut self, prefix: &str) -> Name {
        self.temps += 1;
        self.cx.interner.intern(&format!(".{prefix}{}", self.temps))
    }

    fn name_str(&self, name: Name) -> &'static str {
        self.cx.interner.lookup(name)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
