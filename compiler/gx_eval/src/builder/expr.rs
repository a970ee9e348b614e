//! Expression lowering.
//!
//! Every expression leaves exactly one value on the operand stack, except
//! where a caller asks for several (`compile_multi`). `hint` is the type
//! the context expects; untyped constants take it at compile time.

use std::rc::Rc;

use gx_ir::{BinaryOp, Element, ElementKey, Expr, ExprKind, IntKind, Literal, Span, Type, UnaryOp};

use super::{unsupported, CompileError, FuncBuilder};
use crate::builtins::Builtin;
use crate::flow::{AddrKind, Arity, CallResults, ComposeKeys, FuncFlags, StepOp};
use crate::value::{Complex, Value};

type Result<T = ()> = std::result::Result<T, CompileError>;

/// What a call expression turns out to be.
pub(super) enum CallShape {
    Builtin(Builtin),
    Conversion(Type),
    Call,
}

impl FuncBuilder<'_, '_> {
    pub(super) fn compile_expr(&mut self, expr: &Expr, hint: Option<&Type>) -> Result {
        gx_stack::ensure_sufficient_stack(|| self.compile_expr_inner(expr, hint))
    }

    fn compile_expr_inner(&mut self, expr: &Expr, hint: Option<&Type>) -> Result {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Lit(lit) => {
                let value = self.constant(literal_value(lit), hint.or(expr.ty.as_ref()));
                self.emit(StepOp::Const(value), span)?;
            }
            ExprKind::Ident(name) => self.compile_ident(*name, hint, span)?,
            ExprKind::Binary { op, left, right } => {
                self.compile_binary(*op, left, right, hint, span)?;
            }
            ExprKind::Unary { op, operand } => self.compile_unary(*op, operand, hint, span)?,
            ExprKind::Call { func, args, spread } => {
                self.compile_call(func, args, *spread, CallResults::One, span)?;
            }
            ExprKind::Index { base, index } => {
                let elem = self.map_value_type(base);
                self.compile_expr(base, None)?;
                let key_hint = self.index_hint(base);
                self.compile_expr(index, key_hint.as_ref())?;
                self.emit(
                    StepOp::Index {
                        comma_ok: false,
                        elem,
                    },
                    span,
                )?;
            }
            ExprKind::Slice {
                base,
                low,
                high,
                max,
            } => {
                self.compile_expr(base, None)?;
                for bound in [low, high, max].into_iter().flatten() {
                    self.compile_expr(bound, Some(&Type::INT))?;
                }
                self.emit(
                    StepOp::SliceExpr {
                        low: low.is_some(),
                        high: high.is_some(),
                        max: max.is_some(),
                    },
                    span,
                )?;
            }
            ExprKind::Selector { base, field } => {
                if self.wants_address(base, *field) {
                    self.compile_address(base, span)?;
                } else {
                    self.compile_expr(base, None)?;
                }
                self.emit(StepOp::Select(*field), span)?;
            }
            ExprKind::Composite { ty, elems } => {
                let Some(ty) = ty.as_ref().or(hint) else {
                    return Err(unsupported("composite literal without a type", span));
                };
                let ty = ty.clone();
                self.compile_composite(&ty, elems, span)?;
            }
            ExprKind::FuncLit(lit) => {
                let name = self.cx.names.func_lit;
                let enclosing = self.locals.clone();
                let mut nested =
                    FuncBuilder::new(&mut *self.cx, &lit.sig, FuncFlags::LITERAL, enclosing);
                nested.compile_stmts(&lit.body.stmts)?;
                let func = nested.finish(name, &lit.sig, None, lit.span)?;
                self.emit(StepOp::Closure(Rc::new(func)), span)?;
            }
            ExprKind::TypeAssert { base, ty } => {
                self.compile_expr(base, None)?;
                self.emit(
                    StepOp::TypeAssert {
                        ty: ty.clone(),
                        comma_ok: false,
                    },
                    span,
                )?;
            }
            ExprKind::Conversion { ty, expr } => {
                self.compile_expr(expr, Some(ty))?;
                self.emit(StepOp::Convert(ty.clone()), span)?;
            }
            ExprKind::TypeExpr(_) => return Err(unsupported("type used as expression", span)),
        }
        Ok(())
    }

    /// Untyped constant `value` given the type the context expects.
    fn constant(&self, value: Value, hint: Option<&Type>) -> Value {
        match hint {
            Some(ty) if !matches!(ty, Type::UntypedNil) => self.cx.types.coerce(value, ty),
            _ => value,
        }
    }

    fn compile_ident(&mut self, name: gx_ir::Name, hint: Option<&Type>, span: Span) -> Result {
        let names = &self.cx.names;
        let predeclared = if self.is_shadowed(name) {
            None
        } else if name == names.true_ {
            Some(Value::Bool(true))
        } else if name == names.false_ {
            Some(Value::Bool(false))
        } else if name == names.nil {
            Some(Value::Nil)
        } else if name == names.iota {
            self.iota.map(|iota| Value::int_of(IntKind::Int, iota))
        } else {
            None
        };
        match predeclared {
            Some(value) => {
                let value = self.constant(value, hint);
                self.emit(StepOp::Const(value), span)?;
            }
            None => {
                self.emit(StepOp::Load(name), span)?;
            }
        }
        Ok(())
    }

    // ── Operators ──────────────────────────────────────────────

    fn compile_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        hint: Option<&Type>,
        span: Span,
    ) -> Result {
        if op.is_logical() {
            self.compile_expr(left, None)?;
            let short = self.emit_branch(
                StepOp::ShortCircuit {
                    when: op == BinaryOp::LogicalOr,
                    else_: None,
                },
                span,
            )?;
            self.compile_expr(right, None)?;
            self.pending.push(short);
            return Ok(());
        }

        let left_ty = self.static_type(left);
        let right_ty = self.static_type(right);
        let (left_hint, right_hint) = if op.is_shift() {
            (left_ty.clone().or_else(|| hint.cloned()), None)
        } else {
            let shared = left_ty.clone().or_else(|| right_ty.clone()).or_else(|| {
                if op.is_comparison() {
                    None
                } else {
                    hint.cloned()
                }
            });
            (shared.clone(), shared)
        };
        self.compile_expr(left, left_hint.as_ref())?;
        self.compile_expr(right, right_hint.as_ref())?;

        // Untyped constants took the hint; anything else must be known.
        let effective = |ty: Option<Type>, expr: &Expr, hint: Option<Type>| {
            ty.or_else(|| match &expr.kind {
                ExprKind::Lit(lit) => hint.or_else(|| Some(literal_type(lit))),
                _ => None,
            })
        };
        let left_eff = effective(left_ty, left, left_hint);
        let right_eff = effective(right_ty, right, right_hint);
        let func = match (&left_eff, &right_eff) {
            (Some(l), Some(r)) if l.is_basic() && r.is_basic() => {
                self.cx.operators.resolve(l, op, r)
            }
            _ => None,
        };
        self.emit(StepOp::Binary { op, func }, span)?;
        Ok(())
    }

    fn compile_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        hint: Option<&Type>,
        span: Span,
    ) -> Result {
        match op {
            UnaryOp::AddrOf => return self.compile_address(operand, span),
            UnaryOp::Deref => {
                self.compile_expr(operand, None)?;
                self.emit(StepOp::Deref, span)?;
                return Ok(());
            }
            UnaryOp::Recv => {
                self.compile_expr(operand, None)?;
                self.emit(StepOp::Recv { comma_ok: false }, span)?;
                return Ok(());
            }
            _ => {}
        }
        // Fold negated literals so `-128` fits an int8 slot.
        if let (UnaryOp::Neg, ExprKind::Lit(lit)) = (op, &operand.kind) {
            let negated = match lit {
                Literal::Int(i) => Some(Value::int_of(IntKind::Int, -i)),
                Literal::Float(f) => Some(Value::Float64(-f)),
                Literal::Imag(f) => Some(Value::Complex128(Complex::new(0.0, -f))),
                _ => None,
            };
            if let Some(value) = negated {
                let value = self.constant(value, hint);
                self.emit(StepOp::Const(value), span)?;
                return Ok(());
            }
        }
        self.compile_expr(operand, hint)?;
        self.emit(StepOp::Unary(op), span)?;
        Ok(())
    }

    /// `&operand`: a pointer to the variable, field or element itself.
    pub(super) fn compile_address(&mut self, operand: &Expr, span: Span) -> Result {
        match &operand.kind {
            ExprKind::Ident(name) => {
                self.emit(StepOp::AddrOf(AddrKind::Var(*name)), span)?;
            }
            ExprKind::Selector { base, field } if !self.is_import(base) => {
                self.compile_expr(base, None)?;
                self.emit(StepOp::AddrOf(AddrKind::Field(*field)), span)?;
            }
            ExprKind::Index { base, index } => {
                self.compile_expr(base, None)?;
                self.compile_expr(index, Some(&Type::INT))?;
                self.emit(StepOp::AddrOf(AddrKind::Index), span)?;
            }
            ExprKind::Unary {
                op: UnaryOp::Deref,
                operand,
            } => self.compile_expr(operand, None)?,
            _ => {
                self.compile_expr(operand, None)?;
                self.emit(StepOp::AddrOf(AddrKind::Value), span)?;
            }
        }
        Ok(())
    }

    // ── Calls ──────────────────────────────────────────────────

    pub(super) fn call_shape(&self, func: &Expr) -> CallShape {
        match &func.kind {
            ExprKind::TypeExpr(ty) => CallShape::Conversion(ty.clone()),
            ExprKind::Ident(name) if !self.is_shadowed(*name) => {
                if let Some(builtin) = Builtin::from_name(self.name_str(*name)) {
                    CallShape::Builtin(builtin)
                } else if let Some(ty) = self.named_type(*name) {
                    CallShape::Conversion(ty)
                } else {
                    CallShape::Call
                }
            }
            _ => CallShape::Call,
        }
    }

    /// A type named by `name`: predeclared basic or declared.
    fn named_type(&self, name: gx_ir::Name) -> Option<Type> {
        if let Some(ty) = self.cx.basic_types.get(&name) {
            return Some(ty.clone());
        }
        self.cx.types.contains(name).then_some(Type::Named(name))
    }

    pub(super) fn compile_call(
        &mut self,
        func: &Expr,
        args: &[Expr],
        spread: bool,
        results: CallResults,
        span: Span,
    ) -> Result {
        match self.call_shape(func) {
            CallShape::Builtin(builtin) => {
                let (ty, args) = self.builtin_operands(builtin, args, span)?;
                let hints = self.builtin_hints(builtin, ty.as_ref(), args.len());
                let arity = self.compile_args(args, &hints, spread)?;
                self.emit(
                    StepOp::CallBuiltin {
                        builtin,
                        ty,
                        args: arity,
                        spread,
                        results,
                    },
                    span,
                )?;
            }
            CallShape::Conversion(ty) => {
                let [arg] = args else {
                    return Err(unsupported("conversion with other than one argument", span));
                };
                self.compile_expr(arg, Some(&ty))?;
                self.emit(StepOp::Convert(ty), span)?;
                match results {
                    CallResults::One => {}
                    CallResults::Discard => {
                        self.emit(StepOp::Pop, span)?;
                    }
                    CallResults::Forward => {
                        self.emit(StepOp::Const(Value::int(1)), span)?;
                    }
                }
            }
            CallShape::Call => {
                let hints = self.param_hints(func, args.len());
                let arity = self.compile_args(args, &hints, spread)?;
                self.compile_expr(func, None)?;
                self.emit(
                    StepOp::Call {
                        args: arity,
                        spread,
                        results,
                    },
                    span,
                )?;
            }
        }
        Ok(())
    }

    /// Type argument and value arguments of a built-in call.
    pub(super) fn builtin_operands<'e>(
        &self,
        builtin: Builtin,
        args: &'e [Expr],
        span: Span,
    ) -> Result<(Option<Type>, &'e [Expr])> {
        if builtin.takes_type() {
            let Some((first, rest)) = args.split_first() else {
                return Err(unsupported(format!("{} without a type", builtin.name()), span));
            };
            let ty = match &first.kind {
                ExprKind::TypeExpr(ty) => ty.clone(),
                ExprKind::Ident(name) => self.named_type(*name).ok_or_else(|| {
                    unsupported(format!("{} of a non-type", builtin.name()), span)
                })?,
                _ => return Err(unsupported(format!("{} of a non-type", builtin.name()), span)),
            };
            return Ok((Some(ty), rest));
        }
        let ty = match builtin {
            Builtin::Append => args.first().and_then(|first| self.static_type(first)),
            _ => None,
        };
        Ok((ty, args))
    }

    fn builtin_hints(&self, builtin: Builtin, ty: Option<&Type>, count: usize) -> Vec<Option<Type>> {
        match builtin {
            Builtin::Make => vec![Some(Type::INT); count],
            Builtin::Append => {
                let elem = ty
                    .map(|ty| self.cx.types.resolve(ty))
                    .and_then(Type::elem)
                    .cloned();
                let mut hints = vec![ty.cloned()];
                hints.extend(std::iter::repeat(elem).take(count.saturating_sub(1)));
                hints
            }
            _ => Vec::new(),
        }
    }

    /// Arguments left to right. A lone call argument forwards all of its
    /// results.
    pub(super) fn compile_args(
        &mut self,
        args: &[Expr],
        hints: &[Option<Type>],
        spread: bool,
    ) -> Result<Arity> {
        if let [single] = args {
            if !spread && matches!(single.kind, ExprKind::Call { .. }) {
                return self.compile_multi(single);
            }
        }
        for (i, arg) in args.iter().enumerate() {
            let hint = hints.get(i).and_then(Option::as_ref);
            self.compile_expr(arg, hint)?;
        }
        Ok(Arity::Fixed(arg_count(args.len(), args.first().map_or(Span::DUMMY, |a| a.span))?))
    }

    /// Declared parameter types of a statically known callee.
    fn param_hints(&self, func: &Expr, count: usize) -> Vec<Option<Type>> {
        let Some(sig) = self.callee_type(func) else {
            return Vec::new();
        };
        let mut hints: Vec<Option<Type>> = sig.params.iter().cloned().map(Some).collect();
        if sig.variadic {
            if let Some(last) = hints.last().cloned() {
                while hints.len() < count {
                    hints.push(last.clone());
                }
            }
        }
        hints
    }

    /// Signature of a call target the builder can see statically.
    pub(super) fn callee_type(&self, func: &Expr) -> Option<Rc<gx_ir::FuncType>> {
        match &func.kind {
            ExprKind::Ident(name) => match self.local(*name) {
                Some(Some(Type::Func(sig))) => Some(Rc::clone(sig)),
                Some(_) => None,
                None => self.cx.funcs.get(name).cloned(),
            },
            ExprKind::Selector { base, field } => {
                let base_ty = self.static_type(base)?;
                let type_name = match base_ty {
                    Type::Named(name) => name,
                    Type::Pointer(inner) => match *inner {
                        Type::Named(name) => name,
                        _ => return None,
                    },
                    _ => return None,
                };
                self.cx.methods.get(&(type_name, *field)).cloned()
            }
            ExprKind::FuncLit(lit) => Some(super::signature_type(&lit.sig)),
            _ => match func.ty.as_ref() {
                Some(Type::Func(sig)) => Some(Rc::clone(sig)),
                _ => None,
            },
        }
    }

    /// Compile `expr` for a context that wants several values. Returns how
    /// they are laid out on the stack.
    pub(super) fn compile_multi(&mut self, expr: &Expr) -> Result<Arity> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Call { func, args, spread } => {
                if let CallShape::Conversion(_) = self.call_shape(func) {
                    self.compile_expr(expr, None)?;
                    return Ok(Arity::Fixed(1));
                }
                self.compile_call(func, args, *spread, CallResults::Forward, span)?;
                Ok(Arity::Forwarded)
            }
            ExprKind::Index { base, index } => {
                let elem = self.map_value_type(base);
                self.compile_expr(base, None)?;
                let key_hint = self.index_hint(base);
                self.compile_expr(index, key_hint.as_ref())?;
                self.emit(
                    StepOp::Index {
                        comma_ok: true,
                        elem,
                    },
                    span,
                )?;
                Ok(Arity::Fixed(2))
            }
            ExprKind::TypeAssert { base, ty } => {
                self.compile_expr(base, None)?;
                self.emit(
                    StepOp::TypeAssert {
                        ty: ty.clone(),
                        comma_ok: true,
                    },
                    span,
                )?;
                Ok(Arity::Fixed(2))
            }
            ExprKind::Unary {
                op: UnaryOp::Recv,
                operand,
            } => {
                self.compile_expr(operand, None)?;
                self.emit(StepOp::Recv { comma_ok: true }, span)?;
                Ok(Arity::Fixed(2))
            }
            _ => {
                self.compile_expr(expr, None)?;
                Ok(Arity::Fixed(1))
            }
        }
    }

    /// Right-hand sides for `want` destinations.
    pub(super) fn compile_values(
        &mut self,
        values: &[Expr],
        want: usize,
        hints: &[Option<Type>],
    ) -> Result<Arity> {
        if let [single] = values {
            if want > 1 {
                return self.compile_multi(single);
            }
        }
        for (i, value) in values.iter().enumerate() {
            let hint = hints.get(i).and_then(Option::as_ref);
            self.compile_expr(value, hint)?;
        }
        Ok(Arity::Fixed(arg_count(
            values.len(),
            values.first().map_or(Span::DUMMY, |v| v.span),
        )?))
    }

    // ── Selectors ──────────────────────────────────────────────

    pub(super) fn is_import(&self, expr: &Expr) -> bool {
        expr.as_ident()
            .is_some_and(|name| self.local(name).is_none() && self.cx.imports.contains(&name))
    }

    /// Whether `base.field` should be evaluated through `&base`, so a
    /// pointer-receiver method sees the caller's variable.
    fn wants_address(&self, base: &Expr, field: gx_ir::Name) -> bool {
        if !self.is_addressable(base) {
            return false;
        }
        match self.static_type(base) {
            Some(Type::Pointer(_)) => false,
            Some(Type::Named(type_name)) => {
                self.cx.pointer_methods.contains(&(type_name, field))
                    || (!self.cx.methods.contains_key(&(type_name, field))
                        && self.cx.pointer_method_names.contains(&field))
            }
            _ => self.cx.pointer_method_names.contains(&field),
        }
    }

    fn is_addressable(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Ident(name) => {
                self.local(*name).is_some() || self.cx.globals.contains_key(name)
            }
            ExprKind::Selector { base, .. } => !self.is_import(base),
            ExprKind::Index { base, .. } => matches!(
                self.static_type(base).as_ref().map(|ty| self.cx.types.resolve(ty)),
                Some(Type::Slice(_) | Type::Array(..))
            ),
            ExprKind::Unary {
                op: UnaryOp::Deref, ..
            } => true,
            _ => false,
        }
    }

    // ── Composite literals ─────────────────────────────────────

    pub(super) fn compile_composite(&mut self, ty: &Type, elems: &[Element], span: Span) -> Result {
        let resolved = self.cx.types.resolve(ty).clone();
        // Elided `&T{...}` element of a `[]*T` literal.
        if let Type::Pointer(inner) = &resolved {
            self.compile_composite(inner, elems, span)?;
            self.emit(StepOp::AddrOf(AddrKind::Value), span)?;
            return Ok(());
        }
        let keys = match &resolved {
            Type::Struct(st) => {
                let keyed = !elems.is_empty()
                    && elems
                        .iter()
                        .all(|e| matches!(e.key, Some(ElementKey::Field(_))));
                if keyed {
                    let mut names = Vec::with_capacity(elems.len());
                    for elem in elems {
                        let Some(ElementKey::Field(name)) = &elem.key else {
                            continue;
                        };
                        let field_ty = st.fields.iter().find(|f| f.name == *name).map(|f| &f.ty);
                        self.compile_expr(&elem.value, field_ty)?;
                        names.push(*name);
                    }
                    ComposeKeys::Fields(names)
                } else {
                    for (elem, field) in elems.iter().zip(st.fields.iter()) {
                        self.compile_expr(&elem.value, Some(&field.ty))?;
                    }
                    ComposeKeys::Positional(elems.len())
                }
            }
            Type::Slice(elem_ty) | Type::Array(_, elem_ty) => {
                let mut keyed = Vec::with_capacity(elems.len());
                for elem in elems {
                    match &elem.key {
                        Some(ElementKey::Expr(index)) => {
                            self.compile_expr(index, Some(&Type::INT))?;
                            keyed.push(true);
                        }
                        Some(ElementKey::Field(_)) => {
                            return Err(unsupported("field key in a sequence literal", span));
                        }
                        None => keyed.push(false),
                    }
                    self.compile_expr(&elem.value, Some(elem_ty))?;
                }
                ComposeKeys::Seq(keyed)
            }
            Type::Map(key_ty, value_ty) => {
                for elem in elems {
                    match &elem.key {
                        Some(ElementKey::Expr(key)) => self.compile_expr(key, Some(key_ty))?,
                        Some(ElementKey::Field(name)) => {
                            self.compile_ident(*name, Some(key_ty), span)?;
                        }
                        None => return Err(unsupported("map literal element without a key", span)),
                    }
                    self.compile_expr(&elem.value, Some(value_ty))?;
                }
                ComposeKeys::Map(elems.len())
            }
            _ => return Err(unsupported("composite literal of a non-composite type", span)),
        };
        self.emit(
            StepOp::Compose {
                ty: ty.clone(),
                keys,
            },
            span,
        )?;
        Ok(())
    }

    // ── Static types ───────────────────────────────────────────

    /// Static type of `expr` as far as the tree and the declarations seen
    /// so far tell. Untyped constants have none.
    pub(super) fn static_type(&self, expr: &Expr) -> Option<Type> {
        if let Some(ty) = &expr.ty {
            return Some(ty.clone());
        }
        match &expr.kind {
            ExprKind::Ident(name) => match self.local(*name) {
                Some(ty) => ty.cloned(),
                None => self.cx.globals.get(name).cloned().flatten(),
            },
            ExprKind::Binary { op, left, right } => {
                if op.is_comparison() || op.is_logical() {
                    Some(Type::Bool)
                } else if op.is_shift() {
                    self.static_type(left)
                } else {
                    self.static_type(left).or_else(|| self.static_type(right))
                }
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::AddrOf => self.static_type(operand).map(Type::pointer),
                UnaryOp::Deref | UnaryOp::Recv => self
                    .static_type(operand)
                    .and_then(|ty| self.cx.types.resolve(&ty).elem().cloned()),
                UnaryOp::Not => Some(Type::Bool),
                _ => self.static_type(operand),
            },
            ExprKind::Call { func, args, .. } => match self.call_shape(func) {
                CallShape::Conversion(ty) => Some(ty),
                CallShape::Builtin(builtin) => match builtin {
                    Builtin::Len | Builtin::Cap | Builtin::Copy => Some(Type::INT),
                    Builtin::Append => args.first().and_then(|a| self.static_type(a)),
                    Builtin::Make => self.builtin_operands(builtin, args, func.span).ok()?.0,
                    Builtin::New => self
                        .builtin_operands(builtin, args, func.span)
                        .ok()?
                        .0
                        .map(Type::pointer),
                    _ => None,
                },
                CallShape::Call => self.callee_type(func)?.results.first().cloned(),
            },
            ExprKind::Index { base, .. } => {
                let base_ty = self.static_type(base)?;
                match self.cx.types.resolve(&base_ty) {
                    Type::String => Some(Type::Int(IntKind::Uint8)),
                    Type::Pointer(inner) => self.cx.types.resolve(inner).elem().cloned(),
                    other => other.elem().cloned(),
                }
            }
            ExprKind::Slice { base, .. } => {
                let base_ty = self.static_type(base)?;
                match self.cx.types.resolve(&base_ty) {
                    Type::Array(_, elem) => Some(Type::Slice(elem.clone())),
                    Type::Pointer(inner) => match self.cx.types.resolve(inner) {
                        Type::Array(_, elem) => Some(Type::Slice(elem.clone())),
                        _ => None,
                    },
                    _ => Some(base_ty.clone()),
                }
            }
            ExprKind::Selector { base, field } => self.field_type(base, *field),
            ExprKind::Composite { ty, .. } => ty.clone(),
            ExprKind::FuncLit(lit) => Some(Type::Func(super::signature_type(&lit.sig))),
            ExprKind::TypeAssert { ty, .. } | ExprKind::Conversion { ty, .. } => Some(ty.clone()),
            ExprKind::Lit(_) | ExprKind::TypeExpr(_) => None,
        }
    }

    /// Static type, falling back to the default type of an untyped
    /// constant.
    pub(super) fn infer_type(&self, expr: &Expr) -> Option<Type> {
        self.static_type(expr).or_else(|| match &expr.kind {
            ExprKind::Lit(lit) => Some(literal_type(lit)),
            _ => None,
        })
    }

    fn field_type(&self, base: &Expr, field: gx_ir::Name) -> Option<Type> {
        let base_ty = self.static_type(base)?;
        let ty = match self.cx.types.resolve(&base_ty) {
            Type::Pointer(inner) => (**inner).clone(),
            _ => base_ty.clone(),
        };
        let (layout, _) = self.cx.types.struct_layout(&ty)?;
        let index = layout.get_index(field)?;
        layout.field_type(index).cloned()
    }

    fn map_value_type(&self, base: &Expr) -> Option<Type> {
        let ty = self.static_type(base)?;
        match self.cx.types.resolve(&ty) {
            Type::Map(_, value) => Some((**value).clone()),
            _ => None,
        }
    }

    fn index_hint(&self, base: &Expr) -> Option<Type> {
        match self.static_type(base) {
            Some(ty) => match self.cx.types.resolve(&ty) {
                Type::Map(key, _) => Some((**key).clone()),
                _ => Some(Type::INT),
            },
            None => None,
        }
    }
}

fn arg_count(len: usize, span: Span) -> Result<u16> {
    u16::try_from(len).map_err(|_| unsupported("too many operands", span))
}

/// Value of a literal at its default type.
pub(super) fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(i) => Value::int_of(IntKind::Int, *i),
        Literal::Float(f) => Value::Float64(*f),
        Literal::Imag(f) => Value::Complex128(Complex::new(0.0, *f)),
        Literal::Rune(c) => Value::int_of(IntKind::Int32, i128::from(u32::from(*c))),
        Literal::Str(s) => Value::Str(Rc::clone(s)),
    }
}

/// Default type of an untyped literal.
pub(super) fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::Int(_) => Type::INT,
        Literal::Float(_) => Type::Float64,
        Literal::Imag(_) => Type::Complex128,
        Literal::Rune(_) => Type::Int(IntKind::Int32),
        Literal::Str(_) => Type::String,
    }
}

/// Static type of a package-level initializer, from the tree alone.
pub fn initializer_type(expr: &Expr) -> Option<Type> {
    if let Some(ty) = &expr.ty {
        return Some(ty.clone());
    }
    match &expr.kind {
        ExprKind::Lit(lit) => Some(literal_type(lit)),
        ExprKind::Composite { ty, .. } => ty.clone(),
        ExprKind::Conversion { ty, .. } | ExprKind::TypeAssert { ty, .. } => Some(ty.clone()),
        _ => None,
    }
}
