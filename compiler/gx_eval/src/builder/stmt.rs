//! Statement lowering: simple statements, `if`, `for`, jumps, `return`
//! and `defer`.

use gx_ir::{
    BinaryOp, Block, ConstBlock, Expr, ExprKind, ForStmt, IfStmt, Name, Span, Stmt, StmtKind,
    Type, TypeSpec, UnaryOp, ValueSpec,
};
use smallvec::SmallVec;

use super::decl::expand_const_block;
use super::expr::CallShape;
use super::{unsupported, CompileError, ContextKind, FuncBuilder, JumpContext, LabelTarget, PendingGoto};
use crate::flow::{Arity, CallResults, DeferredBuiltin, FuncFlags, StepOp, Target};
use crate::value::Value;

type Result<T = ()> = std::result::Result<T, CompileError>;

impl FuncBuilder<'_, '_> {
    pub(super) fn compile_stmts(&mut self, stmts: &[Stmt]) -> Result {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    pub(super) fn compile_stmt(&mut self, stmt: &Stmt) -> Result {
        gx_stack::ensure_sufficient_stack(|| self.compile_stmt_inner(stmt))
    }

    fn compile_stmt_inner(&mut self, stmt: &Stmt) -> Result {
        let span = stmt.span;
        let label = self.pending_label.take();
        match &stmt.kind {
            StmtKind::Empty => {}
            StmtKind::Expr(expr) => self.compile_expr_stmt(expr)?,
            StmtKind::Define { names, values } => self.compile_define(names, values, span)?,
            StmtKind::Var(spec) => self.compile_var(spec)?,
            StmtKind::Const(block) => self.compile_const(block)?,
            StmtKind::Type(spec) => self.compile_type(spec)?,
            StmtKind::Assign { targets, values } => self.compile_assign(targets, values, span)?,
            StmtKind::OpAssign { op, target, value } => {
                self.compile_op_assign(*op, target, Some(value), span)?;
            }
            StmtKind::IncDec { target, inc } => {
                let op = if *inc { BinaryOp::Add } else { BinaryOp::Sub };
                self.compile_op_assign(op, target, None, span)?;
            }
            StmtKind::Send { chan, value } => {
                let elem = self
                    .static_type(chan)
                    .and_then(|ty| self.cx.types.resolve(&ty).elem().cloned());
                self.compile_expr(chan, None)?;
                self.compile_expr(value, elem.as_ref())?;
                self.emit(StepOp::Send, span)?;
            }
            StmtKind::Block(block) => self.compile_block(block)?,
            StmtKind::If(stmt) => self.compile_if(stmt, span)?,
            StmtKind::For(stmt) => self.compile_for(stmt, label, span)?,
            StmtKind::Range(stmt) => self.compile_range(stmt, label, span)?,
            StmtKind::Switch(stmt) => self.compile_switch(stmt, label, span)?,
            StmtKind::TypeSwitch(stmt) => self.compile_type_switch(stmt, label, span)?,
            StmtKind::Labeled { label, stmt } => self.compile_labeled(*label, stmt, span)?,
            StmtKind::Return(values) => self.compile_return(values, span)?,
            StmtKind::Break(label) => self.compile_break(*label, span)?,
            StmtKind::Continue(label) => self.compile_continue(*label, span)?,
            StmtKind::Goto(label) => {
                let slot = self.jump(0, span)?;
                self.gotos.push(PendingGoto {
                    jump: slot.step,
                    label: *label,
                    span,
                });
            }
            StmtKind::Fallthrough => return Err(CompileError::MisplacedFallthrough { span }),
            StmtKind::Defer(call) => self.compile_defer(call, span)?,
            StmtKind::Go(_) => return Err(CompileError::GoStatement { span }),
        }
        Ok(())
    }

    fn compile_expr_stmt(&mut self, expr: &Expr) -> Result {
        if let ExprKind::Call { func, args, spread } = &expr.kind {
            return self.compile_call(func, args, *spread, CallResults::Discard, expr.span);
        }
        self.compile_expr(expr, None)?;
        self.emit(StepOp::Pop, expr.span)?;
        Ok(())
    }

    /// A block gets its own scope only when it declares something.
    pub(super) fn compile_block(&mut self, block: &Block) -> Result {
        if !declares(&block.stmts) {
            return self.compile_stmts(&block.stmts);
        }
        self.enter_scope(block.span)?;
        self.compile_stmts(&block.stmts)?;
        self.leave_scope(block.span)
    }

    // ── Declarations ───────────────────────────────────────────

    fn compile_define(&mut self, names: &[Name], values: &[Expr], span: Span) -> Result {
        let arity = self.compile_values(values, names.len(), &[])?;
        self.emit(
            StepOp::Declare {
                names: SmallVec::from_slice(names),
                ty: None,
                arity,
            },
            span,
        )?;
        let types = self.value_types(values, names.len());
        for (name, ty) in names.iter().zip(types) {
            self.declare_local(*name, ty);
        }
        Ok(())
    }

    /// Static types of the `want` values produced by `values`.
    pub(super) fn value_types(&self, values: &[Expr], want: usize) -> Vec<Option<Type>> {
        if let [single] = values {
            if want > 1 {
                return self.multi_types(single, want);
            }
        }
        values.iter().map(|value| self.infer_type(value)).collect()
    }

    fn multi_types(&self, expr: &Expr, want: usize) -> Vec<Option<Type>> {
        let mut types = match &expr.kind {
            ExprKind::Index { .. } | ExprKind::TypeAssert { .. } => {
                vec![self.static_type(expr), Some(Type::Bool)]
            }
            ExprKind::Unary {
                op: UnaryOp::Recv, ..
            } => vec![self.static_type(expr), Some(Type::Bool)],
            ExprKind::Call { func, .. } => match self.callee_results(func) {
                Some(results) => results.into_iter().map(Some).collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        types.resize(want, None);
        types
    }

    fn callee_results(&self, func: &Expr) -> Option<Vec<Type>> {
        if !matches!(self.call_shape(func), CallShape::Call) {
            return None;
        }
        self.callee_type(func).map(|sig| sig.results.clone())
    }

    fn compile_var(&mut self, spec: &ValueSpec) -> Result {
        if spec.values.is_empty() {
            let Some(ty) = &spec.ty else {
                return Err(unsupported("variable without type or value", spec.span));
            };
            self.emit(
                StepOp::DeclareZero {
                    names: SmallVec::from_slice(&spec.names),
                    ty: ty.clone(),
                },
                spec.span,
            )?;
            for name in &spec.names {
                self.declare_local(*name, Some(ty.clone()));
            }
            return Ok(());
        }
        let hints = vec![spec.ty.clone(); spec.names.len()];
        let arity = self.compile_values(&spec.values, spec.names.len(), &hints)?;
        self.emit(
            StepOp::Declare {
                names: SmallVec::from_slice(&spec.names),
                ty: spec.ty.clone(),
                arity,
            },
            spec.span,
        )?;
        let types = match &spec.ty {
            Some(ty) => vec![Some(ty.clone()); spec.names.len()],
            None => self.value_types(&spec.values, spec.names.len()),
        };
        for (name, ty) in spec.names.iter().zip(types) {
            self.declare_local(*name, ty);
        }
        Ok(())
    }

    fn compile_const(&mut self, block: &ConstBlock) -> Result {
        for entry in expand_const_block(block) {
            self.iota = Some(entry.iota);
            let hints = vec![entry.ty.cloned(); entry.names.len()];
            let result = self.compile_values(entry.values, entry.names.len(), &hints);
            let arity = match result {
                Ok(arity) => arity,
                Err(err) => {
                    self.iota = None;
                    return Err(err);
                }
            };
            self.emit(
                StepOp::Declare {
                    names: SmallVec::from_slice(entry.names),
                    ty: entry.ty.cloned(),
                    arity,
                },
                entry.span,
            )?;
            let types = match entry.ty {
                Some(ty) => vec![Some(ty.clone()); entry.names.len()],
                None => self.value_types(entry.values, entry.names.len()),
            };
            self.iota = None;
            for (name, ty) in entry.names.iter().zip(types) {
                self.declare_local(*name, ty);
            }
        }
        Ok(())
    }

    fn compile_type(&mut self, spec: &TypeSpec) -> Result {
        if !self.cx.types.declare(spec.name, spec.ty.clone()) {
            return Err(CompileError::DuplicateType {
                name: self.name_str(spec.name).to_string(),
            });
        }
        Ok(())
    }

    // ── Assignment ─────────────────────────────────────────────

    fn compile_assign(&mut self, targets: &[Expr], values: &[Expr], span: Span) -> Result {
        let mut compiled = SmallVec::with_capacity(targets.len());
        let mut hints = Vec::with_capacity(targets.len());
        for target in targets {
            compiled.push(self.compile_target(target)?);
            hints.push(self.static_type(target));
        }
        let arity = self.compile_values(values, targets.len(), &hints)?;
        self.emit(
            StepOp::Assign {
                targets: compiled,
                arity,
            },
            span,
        )?;
        Ok(())
    }

    /// Push the operands of an assignment destination.
    pub(super) fn compile_target(&mut self, target: &Expr) -> Result<Target> {
        match &target.kind {
            ExprKind::Ident(name) if *name == self.cx.names.blank => Ok(Target::Discard),
            ExprKind::Ident(name) => Ok(Target::Var(*name)),
            ExprKind::Index { base, index } => {
                let key_hint = match self.static_type(base) {
                    Some(ty) => match self.cx.types.resolve(&ty) {
                        Type::Map(key, _) => Some((**key).clone()),
                        _ => Some(Type::INT),
                    },
                    None => None,
                };
                self.compile_expr(base, None)?;
                self.compile_expr(index, key_hint.as_ref())?;
                Ok(Target::Index)
            }
            ExprKind::Selector { base, field } => {
                self.compile_expr(base, None)?;
                Ok(Target::Field(*field))
            }
            ExprKind::Unary {
                op: UnaryOp::Deref,
                operand,
            } => {
                self.compile_expr(operand, None)?;
                Ok(Target::Deref)
            }
            _ => Err(CompileError::InvalidAssignTarget { span: target.span }),
        }
    }

    /// `target op= value`, or `target++` / `target--` when `value` is
    /// absent.
    fn compile_op_assign(
        &mut self,
        op: BinaryOp,
        target: &Expr,
        value: Option<&Expr>,
        span: Span,
    ) -> Result {
        let ty = self.static_type(target);
        let compiled = self.compile_target(target)?;
        self.emit(
            StepOp::LoadTarget {
                target: compiled.clone(),
                ty: ty.clone(),
            },
            span,
        )?;
        match value {
            Some(value) => {
                let hint = if op.is_shift() { None } else { ty.as_ref() };
                self.compile_expr(value, hint)?;
            }
            None => {
                let one = self.constant_one(ty.as_ref());
                self.emit(StepOp::Const(one), span)?;
            }
        }
        let func = match &ty {
            Some(ty) if ty.is_basic() && !op.is_shift() => self.cx.operators.resolve(ty, op, ty),
            _ => None,
        };
        self.emit(StepOp::Binary { op, func }, span)?;
        self.emit(
            StepOp::Assign {
                targets: SmallVec::from_elem(compiled, 1),
                arity: Arity::Fixed(1),
            },
            span,
        )?;
        Ok(())
    }

    fn constant_one(&self, ty: Option<&Type>) -> Value {
        match ty {
            Some(ty) => self.cx.types.coerce(Value::int(1), ty),
            None => Value::int(1),
        }
    }

    // ── Control flow ───────────────────────────────────────────

    fn compile_if(&mut self, stmt: &IfStmt, span: Span) -> Result {
        if let Some(init) = &stmt.init {
            self.enter_scope(span)?;
            self.compile_stmt(init)?;
        }
        self.compile_expr(&stmt.cond, Some(&Type::Bool))?;
        let else_slot = self.branch(span)?;
        self.compile_block(&stmt.then)?;
        let then_exits = std::mem::take(&mut self.pending);
        self.pending.push(else_slot);
        if let Some(els) = &stmt.els {
            self.compile_stmt(els)?;
        }
        self.pending.extend(then_exits);
        if stmt.init.is_some() {
            self.leave_scope(span)?;
        }
        Ok(())
    }

    /// Three-clause loop. Variables declared by the init statement are
    /// copied into a fresh scope each iteration and carried back before the
    /// post statement, so closures capture one instance per iteration.
    fn compile_for(&mut self, stmt: &ForStmt, label: Option<Name>, span: Span) -> Result {
        self.enter_scope(span)?;
        let loop_depth = self.depth;
        if let Some(init) = &stmt.init {
            self.compile_stmt(init)?;
        }
        let head = self.emit(StepOp::Nop, span)?;
        let exit = match &stmt.cond {
            Some(cond) => {
                self.compile_expr(cond, Some(&Type::Bool))?;
                Some(self.branch(span)?)
            }
            None => None,
        };

        let mut context = JumpContext::new(ContextKind::Loop, label, loop_depth);
        context.continue_depth = loop_depth + 1;
        self.contexts.push(context);

        self.enter_scope(span)?;
        let vars = loop_vars(stmt.init.as_ref(), self.cx.names.blank);
        for name in &vars {
            self.emit(StepOp::Load(*name), span)?;
            self.emit(
                StepOp::Declare {
                    names: SmallVec::from_elem(*name, 1),
                    ty: None,
                    arity: Arity::Fixed(1),
                },
                span,
            )?;
            let ty = self.local(*name).flatten().cloned();
            self.declare_local(*name, ty);
        }
        let body = self.compile_block(&stmt.body);
        let context = self.pop_context();
        body?;

        self.pending.extend(context.continues);
        if !vars.is_empty() {
            self.emit(StepOp::CarryOut(vars), span)?;
        }
        self.leave_scope(span)?;
        if let Some(post) = &stmt.post {
            self.compile_stmt(post)?;
        }
        let back = self.jump(loop_depth, span)?;
        self.graph.link(back, head)?;

        self.pending.extend(exit);
        self.pending.extend(context.breaks);
        self.leave_scope(span)
    }

    pub(super) fn pop_context(&mut self) -> JumpContext {
        self.contexts
            .pop()
            .unwrap_or_else(|| JumpContext::new(ContextKind::Loop, None, self.depth))
    }

    fn compile_labeled(&mut self, label: Name, stmt: &Stmt, span: Span) -> Result {
        if self.labels.contains_key(&label) {
            return Err(CompileError::DuplicateLabel {
                label: self.name_str(label).to_string(),
                span,
            });
        }
        let step = self.emit(StepOp::Nop, span)?;
        self.labels.insert(
            label,
            LabelTarget {
                step,
                depth: self.depth,
            },
        );
        if matches!(
            stmt.kind,
            StmtKind::For(_) | StmtKind::Range(_) | StmtKind::Switch(_) | StmtKind::TypeSwitch(_)
        ) {
            self.pending_label = Some(label);
        }
        self.compile_stmt(stmt)
    }

    fn compile_break(&mut self, label: Option<Name>, span: Span) -> Result {
        let index = match label {
            Some(label) => self
                .contexts
                .iter()
                .rposition(|c| c.label == Some(label))
                .ok_or_else(|| CompileError::UnknownLabel {
                    label: self.name_str(label).to_string(),
                    span,
                })?,
            None => self
                .contexts
                .len()
                .checked_sub(1)
                .ok_or(CompileError::MisplacedBreak { span })?,
        };
        let depth = self.contexts[index].break_depth;
        let slot = self.jump(depth, span)?;
        self.contexts[index].breaks.push(slot);
        Ok(())
    }

    fn compile_continue(&mut self, label: Option<Name>, span: Span) -> Result {
        let index = match label {
            Some(label) => {
                let index = self
                    .contexts
                    .iter()
                    .rposition(|c| c.label == Some(label))
                    .ok_or_else(|| CompileError::UnknownLabel {
                        label: self.name_str(label).to_string(),
                        span,
                    })?;
                if self.contexts[index].kind != ContextKind::Loop {
                    return Err(CompileError::MisplacedContinue { span });
                }
                index
            }
            None => self
                .contexts
                .iter()
                .rposition(|c| c.kind == ContextKind::Loop)
                .ok_or(CompileError::MisplacedContinue { span })?,
        };
        let depth = self.contexts[index].continue_depth;
        let slot = self.jump(depth, span)?;
        self.contexts[index].continues.push(slot);
        Ok(())
    }

    fn compile_return(&mut self, values: &[Expr], span: Span) -> Result {
        let results = self.results.clone();
        if self.flags.contains(FuncFlags::NAMED_RESULTS) {
            if !values.is_empty() {
                let targets: SmallVec<[Target; 2]> = results
                    .iter()
                    .map(|result| match result.name {
                        Some(name) if name != self.cx.names.blank => Target::Var(name),
                        _ => Target::Discard,
                    })
                    .collect();
                let hints: Vec<_> = results.iter().map(|r| Some(r.ty.clone())).collect();
                let arity = self.compile_values(values, targets.len(), &hints)?;
                self.emit(StepOp::Assign { targets, arity }, span)?;
            }
            self.emit(StepOp::Return(Arity::Fixed(0)), span)?;
        } else {
            let hints: Vec<_> = results.iter().map(|r| Some(r.ty.clone())).collect();
            let arity = if values.is_empty() {
                Arity::Fixed(0)
            } else {
                self.compile_values(values, results.len(), &hints)?
            };
            self.emit(StepOp::Return(arity), span)?;
        }
        self.pending.clear();
        Ok(())
    }

    /// `defer f(args)`: the callee and arguments are evaluated now by a
    /// detached chain of steps; the call runs when the function returns.
    fn compile_defer(&mut self, call: &Expr, span: Span) -> Result {
        let ExprKind::Call { func, args, spread } = &call.kind else {
            return Err(unsupported("defer of a non-call", span));
        };
        self.flags |= FuncFlags::HAS_DEFER;
        // The chain must not become the function's entry step.
        if self.graph.is_empty() {
            self.emit(StepOp::Nop, span)?;
        }
        let saved = std::mem::take(&mut self.pending);
        let entry = self.graph.next_id();
        let chain = self.compile_deferred_call(func, args, *spread, span);
        let (arity, builtin) = match chain {
            Ok(compiled) => compiled,
            Err(err) => {
                self.pending = saved;
                return Err(err);
            }
        };
        if self.graph.next_id() == entry {
            self.emit(StepOp::Nop, span)?;
        }
        self.pending = saved;
        self.emit(
            StepOp::Defer {
                entry,
                args: arity,
                spread: *spread,
                builtin,
            },
            span,
        )?;
        Ok(())
    }

    fn compile_deferred_call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        spread: bool,
        span: Span,
    ) -> Result<(Arity, Option<DeferredBuiltin>)> {
        match self.call_shape(func) {
            CallShape::Builtin(builtin) => {
                let (ty, args) = self.builtin_operands(builtin, args, span)?;
                let arity = self.compile_args(args, &[], spread)?;
                Ok((arity, Some(DeferredBuiltin { builtin, ty })))
            }
            CallShape::Conversion(_) => Err(unsupported("defer of a conversion", span)),
            CallShape::Call => {
                let arity = self.compile_args(args, &[], spread)?;
                self.compile_expr(func, None)?;
                Ok((arity, None))
            }
        }
    }
}

/// Whether a statement list declares names in its own scope.
pub(super) fn declares(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| {
        matches!(
            stmt.kind,
            StmtKind::Define { .. } | StmtKind::Var(_) | StmtKind::Const(_) | StmtKind::Type(_)
        )
    })
}

/// Names declared by a loop's init statement.
fn loop_vars(init: Option<&Stmt>, blank: Name) -> SmallVec<[Name; 2]> {
    let names: &[Name] = match init.map(|s| &s.kind) {
        Some(StmtKind::Define { names, .. }) => names,
        Some(StmtKind::Var(spec)) => &spec.names,
        _ => &[],
    };
    names.iter().copied().filter(|n| *n != blank).collect()
}

