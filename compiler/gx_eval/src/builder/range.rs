//! `for key, value := range expr`.
//!
//! ```text
//!   PushScope
//!   <expr>; RangeInit(cursor)
//! head:
//!   RangeNext(cursor) --done--> exit
//!   PushScope; bind key/value; <body>; PopScope
//!   Jump head
//! exit:
//!   PopScope
//! ```
//!
//! Each iteration binds fresh variables, so closures in the body capture
//! that iteration's values.

use gx_ir::{Expr, IntKind, Name, RangeStmt, Span, Type};
use smallvec::SmallVec;

use super::{CompileError, ContextKind, FuncBuilder, JumpContext};
use crate::flow::{Arity, Edge, RangeKind, Slot, StepOp, Target};

type Result<T = ()> = std::result::Result<T, CompileError>;

impl FuncBuilder<'_, '_> {
    pub(super) fn compile_range(
        &mut self,
        stmt: &RangeStmt,
        label: Option<Name>,
        span: Span,
    ) -> Result {
        self.enter_scope(span)?;
        let loop_depth = self.depth;
        let range_ty = self.infer_type(&stmt.expr);
        let (kind, key_ty, value_ty) = self.range_shape(range_ty.as_ref());
        self.compile_expr(&stmt.expr, None)?;
        let cursor = self.temp("range");
        self.emit(StepOp::RangeInit { kind, cursor }, span)?;

        let has_value = stmt.value.is_some();
        let head = self.emit(
            StepOp::RangeNext {
                cursor,
                value: has_value,
                exit: None,
            },
            span,
        )?;
        let exit = Slot {
            step: head,
            edge: Edge::Else,
        };

        self.contexts
            .push(JumpContext::new(ContextKind::Loop, label, loop_depth));
        self.enter_scope(span)?;
        let bound = self.bind_range_vars(stmt, key_ty, value_ty, span);
        let body = bound.and_then(|()| self.compile_block(&stmt.body));
        let context = self.pop_context();
        body?;
        self.leave_scope(span)?;
        let back = self.jump(loop_depth, span)?;
        self.graph.link(back, head)?;
        self.link_all(context.continues, head)?;

        self.pending.push(exit);
        self.pending.extend(context.breaks);
        self.leave_scope(span)
    }

    /// Cursor kind plus static key and value types for a range operand.
    fn range_shape(&self, ty: Option<&Type>) -> (RangeKind, Option<Type>, Option<Type>) {
        let Some(ty) = ty else {
            return (RangeKind::Dynamic, None, None);
        };
        let resolved = self.cx.types.resolve(ty);
        let resolved = match resolved {
            Type::Pointer(inner) => self.cx.types.resolve(inner),
            other => other,
        };
        match resolved {
            Type::Slice(elem) | Type::Array(_, elem) => {
                (RangeKind::Indexed, Some(Type::INT), Some((**elem).clone()))
            }
            Type::String => (
                RangeKind::Str,
                Some(Type::INT),
                Some(Type::Int(IntKind::Int32)),
            ),
            Type::Map(key, value) => (
                RangeKind::Map,
                Some((**key).clone()),
                Some((**value).clone()),
            ),
            Type::Int(_) => (RangeKind::Int, Some(ty.clone()), None),
            Type::Chan(elem) => (RangeKind::Chan, Some((**elem).clone()), None),
            _ => (RangeKind::Dynamic, None, None),
        }
    }

    /// Bind the key (and value) `RangeNext` left on the stack.
    fn bind_range_vars(
        &mut self,
        stmt: &RangeStmt,
        key_ty: Option<Type>,
        value_ty: Option<Type>,
        span: Span,
    ) -> Result {
        let arity = if stmt.value.is_some() { 2 } else { 1 };
        if stmt.key.is_none() && stmt.value.is_none() {
            self.emit(StepOp::Pop, span)?;
            return Ok(());
        }
        if stmt.define {
            let blank = self.cx.names.blank;
            let name_of = |expr: Option<&Expr>| expr.and_then(Expr::as_ident).unwrap_or(blank);
            let mut names: SmallVec<[Name; 2]> = SmallVec::new();
            names.push(name_of(stmt.key.as_ref()));
            if stmt.value.is_some() {
                names.push(name_of(stmt.value.as_ref()));
            }
            self.emit(
                StepOp::Declare {
                    names: names.clone(),
                    ty: None,
                    arity: Arity::Fixed(arity),
                },
                span,
            )?;
            let types = [key_ty, value_ty];
            for (name, ty) in names.into_iter().zip(types) {
                self.declare_local(name, ty);
            }
            return Ok(());
        }

        // `for k, v = range x`: park the pair in temporaries, then assign
        // through ordinary targets.
        let key_temp = self.temp("k");
        let value_temp = self.temp("v");
        let mut temps: SmallVec<[Name; 2]> = SmallVec::new();
        temps.push(key_temp);
        if stmt.value.is_some() {
            temps.push(value_temp);
        }
        self.emit(
            StepOp::Declare {
                names: temps.clone(),
                ty: None,
                arity: Arity::Fixed(arity),
            },
            span,
        )?;
        let mut targets: SmallVec<[Target; 2]> = SmallVec::new();
        for expr in [stmt.key.as_ref(), stmt.value.as_ref()]
            .into_iter()
            .take(temps.len())
        {
            targets.push(match expr {
                Some(expr) => self.compile_target(expr)?,
                None => Target::Discard,
            });
        }
        for temp in &temps {
            self.emit(StepOp::Load(*temp), span)?;
        }
        self.emit(
            StepOp::Assign {
                targets,
                arity: Arity::Fixed(arity),
            },
            span,
        )?;
        Ok(())
    }
}
