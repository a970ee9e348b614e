//! Expression and type switches.
//!
//! Clause tests run in source order, each leaving its match path dangling
//! for the clause body. Bodies follow in clause order so `fallthrough`
//! simply carries the previous body's exit into the next one.

use gx_ir::{BinaryOp, CaseClause, Name, Span, Stmt, StmtKind, SwitchStmt, Type, TypeSwitchStmt};
use smallvec::SmallVec;

use super::{CompileError, ContextKind, FuncBuilder, JumpContext};
use crate::flow::{Arity, Slot, StepOp};

type Result<T = ()> = std::result::Result<T, CompileError>;

impl FuncBuilder<'_, '_> {
    pub(super) fn compile_switch(
        &mut self,
        stmt: &SwitchStmt,
        label: Option<Name>,
        span: Span,
    ) -> Result {
        self.enter_scope(span)?;
        if let Some(init) = &stmt.init {
            self.compile_stmt(init)?;
        }
        let tag = match &stmt.tag {
            Some(expr) => {
                let ty = self.infer_type(expr);
                self.compile_expr(expr, None)?;
                let name = self.temp("tag");
                self.declare_temp(name, ty.clone(), span)?;
                Some((name, ty))
            }
            None => None,
        };

        let mut entries: Vec<Vec<Slot>> = Vec::with_capacity(stmt.clauses.len());
        for clause in &stmt.clauses {
            let mut matched = Vec::new();
            for value in &clause.values {
                match &tag {
                    Some((name, ty)) => {
                        let value_ty = self.static_type(value);
                        self.emit(StepOp::Load(*name), value.span)?;
                        self.compile_expr(value, ty.as_ref())?;
                        let func = match (ty, value_ty.as_ref().or(ty.as_ref())) {
                            (Some(l), Some(r)) if l.is_basic() && r.is_basic() => {
                                self.cx.operators.resolve(l, BinaryOp::Eq, r)
                            }
                            _ => None,
                        };
                        self.emit(
                            StepOp::Binary {
                                op: BinaryOp::Eq,
                                func,
                            },
                            value.span,
                        )?;
                    }
                    None => self.compile_expr(value, Some(&Type::Bool))?,
                }
                let miss = self.branch(value.span)?;
                matched.append(&mut self.pending);
                self.pending.push(miss);
            }
            entries.push(matched);
        }
        let unmatched = std::mem::take(&mut self.pending);
        let mut exits = Vec::new();
        match stmt.clauses.iter().position(|c| c.is_default) {
            Some(default) => entries[default].extend(unmatched),
            None => exits.extend(unmatched),
        }

        let bodies: Vec<(&[Stmt], Span)> = stmt
            .clauses
            .iter()
            .map(|c: &CaseClause| (c.body.as_slice(), c.span))
            .collect();
        self.compile_clause_bodies(bodies, entries, exits, label)?;
        self.leave_scope(span)
    }

    pub(super) fn compile_type_switch(
        &mut self,
        stmt: &TypeSwitchStmt,
        label: Option<Name>,
        span: Span,
    ) -> Result {
        self.enter_scope(span)?;
        if let Some(init) = &stmt.init {
            self.compile_stmt(init)?;
        }
        let subject_ty = self.static_type(&stmt.subject);
        self.compile_expr(&stmt.subject, None)?;
        let subject = self.temp("subj");
        self.declare_temp(subject, subject_ty.clone(), span)?;

        let mut entries: Vec<Vec<Slot>> = Vec::with_capacity(stmt.clauses.len());
        for clause in &stmt.clauses {
            let mut matched = Vec::new();
            for ty in &clause.types {
                self.emit(StepOp::Load(subject), clause.span)?;
                self.emit(StepOp::TypeTest(ty.clone()), clause.span)?;
                let miss = self.branch(clause.span)?;
                matched.append(&mut self.pending);
                self.pending.push(miss);
            }
            entries.push(matched);
        }
        let unmatched = std::mem::take(&mut self.pending);
        let mut exits = Vec::new();
        match stmt.clauses.iter().position(|c| c.is_default) {
            Some(default) => entries[default].extend(unmatched),
            None => exits.extend(unmatched),
        }

        self.contexts
            .push(JumpContext::new(ContextKind::Switch, label, self.depth));
        for (clause, entry) in stmt.clauses.iter().zip(entries) {
            self.pending = entry;
            self.enter_scope(clause.span)?;
            if let Some(binding) = stmt.binding {
                let bound = match clause.types.as_slice() {
                    [ty] if !matches!(ty, Type::UntypedNil) => Some(ty.clone()),
                    _ => None,
                };
                self.emit(StepOp::Load(subject), clause.span)?;
                if let Some(ty) = &bound {
                    self.emit(
                        StepOp::TypeAssert {
                            ty: ty.clone(),
                            comma_ok: false,
                        },
                        clause.span,
                    )?;
                }
                self.declare_temp(binding, bound.or_else(|| subject_ty.clone()), clause.span)?;
            }
            let result = self.compile_stmts(&clause.body);
            if let Err(err) = result {
                self.contexts.pop();
                return Err(err);
            }
            self.leave_scope(clause.span)?;
            exits.append(&mut self.pending);
        }
        let context = self.pop_context();
        self.pending = exits;
        self.pending.extend(context.breaks);
        self.leave_scope(span)
    }

    /// Bodies of an expression switch, in clause order. A trailing
    /// `fallthrough` hands the body's exit to the next body.
    fn compile_clause_bodies(
        &mut self,
        bodies: Vec<(&[Stmt], Span)>,
        entries: Vec<Vec<Slot>>,
        mut exits: Vec<Slot>,
        label: Option<Name>,
    ) -> Result {
        self.contexts
            .push(JumpContext::new(ContextKind::Switch, label, self.depth));
        let count = bodies.len();
        let mut carried: Vec<Slot> = Vec::new();
        for (i, ((body, clause_span), entry)) in bodies.into_iter().zip(entries).enumerate() {
            let (stmts, falls) = match body.split_last() {
                Some((last, rest)) if matches!(last.kind, StmtKind::Fallthrough) => {
                    if i + 1 == count {
                        self.contexts.pop();
                        return Err(CompileError::MisplacedFallthrough { span: last.span });
                    }
                    (rest, true)
                }
                _ => (body, false),
            };
            self.pending = entry;
            self.pending.append(&mut carried);
            self.enter_scope(clause_span)?;
            if let Err(err) = self.compile_stmts(stmts) {
                self.contexts.pop();
                return Err(err);
            }
            self.leave_scope(clause_span)?;
            if falls {
                carried.append(&mut self.pending);
            } else {
                exits.append(&mut self.pending);
            }
        }
        let context = self.pop_context();
        self.pending = exits;
        self.pending.extend(context.breaks);
        Ok(())
    }

    /// Bind the value on top of the stack to a scope-local name.
    fn declare_temp(&mut self, name: Name, ty: Option<Type>, span: Span) -> Result {
        self.emit(
            StepOp::Declare {
                names: SmallVec::from_elem(name, 1),
                ty: None,
                arity: Arity::Fixed(1),
            },
            span,
        )?;
        self.declare_local(name, ty);
        Ok(())
    }
}
