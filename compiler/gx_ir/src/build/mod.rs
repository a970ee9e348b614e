//! Terse syntax-tree construction.
//!
//! `AstBuilder` is what front-ends and tests use to assemble typed trees
//! without spelling out every `Box`, `Span` and interned `Name`. All nodes
//! get `Span::DUMMY`; attach static types with [`Expr::with_type`] or the
//! `typed` helper where operator resolution should happen ahead of time.

use std::rc::Rc;

use crate::ast::{
    BinaryOp, Block, CaseClause, ConstBlock, ConstSpec, Decl, Element, ElementKey, Expr, ExprKind,
    ForStmt, FuncDecl, FuncLit, IfStmt, Import, Literal, Package, Param, RangeStmt, Receiver,
    Signature, Stmt, StmtKind, SwitchStmt, TypeClause, TypeSpec, TypeSwitchStmt, UnaryOp,
    ValueSpec,
};
use crate::{FieldDef, Name, SharedInterner, Span, Type};

/// Syntax tree builder bound to an interner.
#[derive(Clone, Default)]
pub struct AstBuilder {
    interner: SharedInterner,
}

impl AstBuilder {
    /// Create a builder with a fresh interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder sharing an existing interner.
    pub fn with_interner(interner: SharedInterner) -> Self {
        AstBuilder { interner }
    }

    /// The interner names are created in.
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Intern a name.
    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    fn names(&self, names: &[&str]) -> Vec<Name> {
        names.iter().map(|n| self.name(n)).collect()
    }

    fn expr(kind: ExprKind) -> Expr {
        Expr::new(kind, Span::DUMMY)
    }

    fn stmt(kind: StmtKind) -> Stmt {
        Stmt::new(kind, Span::DUMMY)
    }

    // Types

    /// A declared type name.
    pub fn named(&self, name: &str) -> Type {
        Type::Named(self.name(name))
    }

    /// A struct type from `(field, type)` pairs.
    pub fn struct_type(&self, fields: &[(&str, Type)]) -> Type {
        Type::structure(
            fields
                .iter()
                .map(|(name, ty)| FieldDef {
                    name: self.name(name),
                    ty: ty.clone(),
                    embedded: false,
                })
                .collect(),
        )
    }

    // Expressions

    /// Untyped integer constant.
    pub fn int(&self, value: i128) -> Expr {
        Self::expr(ExprKind::Lit(Literal::Int(value)))
    }

    /// Untyped float constant.
    pub fn float(&self, value: f64) -> Expr {
        Self::expr(ExprKind::Lit(Literal::Float(value)))
    }

    /// Imaginary constant (`2i`).
    pub fn imag(&self, value: f64) -> Expr {
        Self::expr(ExprKind::Lit(Literal::Imag(value)))
    }

    /// Rune constant.
    pub fn rune(&self, value: char) -> Expr {
        Self::expr(ExprKind::Lit(Literal::Rune(value)))
    }

    /// String constant.
    pub fn string(&self, value: &str) -> Expr {
        Self::expr(ExprKind::Lit(Literal::Str(Rc::from(value)))).with_type(Type::String)
    }

    /// `true` / `false`.
    pub fn boolean(&self, value: bool) -> Expr {
        self.ident(if value { "true" } else { "false" })
            .with_type(Type::Bool)
    }

    /// `nil`.
    pub fn nil(&self) -> Expr {
        self.ident("nil").with_type(Type::UntypedNil)
    }

    /// Identifier reference.
    pub fn ident(&self, name: &str) -> Expr {
        Self::expr(ExprKind::Ident(self.name(name)))
    }

    /// Attach a static type.
    pub fn typed(&self, expr: Expr, ty: Type) -> Expr {
        expr.with_type(ty)
    }

    /// Binary expression. Comparisons are typed `bool`; otherwise the result
    /// takes the static type of whichever operand has one.
    pub fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let ty = if op.is_comparison() || op.is_logical() {
            Some(Type::Bool)
        } else if op.is_shift() {
            left.ty.clone()
        } else {
            left.ty.clone().or_else(|| right.ty.clone())
        };
        let mut expr = Self::expr(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        });
        expr.ty = ty;
        expr
    }

    /// Unary expression.
    pub fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        let ty = match op {
            UnaryOp::Neg | UnaryOp::Plus | UnaryOp::BitNot | UnaryOp::Not => operand.ty.clone(),
            UnaryOp::AddrOf => operand.ty.clone().map(Type::pointer),
            UnaryOp::Deref | UnaryOp::Recv => operand.ty.as_ref().and_then(Type::elem).cloned(),
        };
        let mut expr = Self::expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        });
        expr.ty = ty;
        expr
    }

    /// `&operand`
    pub fn addr(&self, operand: Expr) -> Expr {
        self.unary(UnaryOp::AddrOf, operand)
    }

    /// `*operand`
    pub fn deref(&self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Deref, operand)
    }

    /// `<-chan`
    pub fn recv(&self, chan: Expr) -> Expr {
        self.unary(UnaryOp::Recv, chan)
    }

    /// `func(args...)`
    pub fn call(&self, func: Expr, args: Vec<Expr>) -> Expr {
        Self::expr(ExprKind::Call {
            func: Box::new(func),
            args,
            spread: false,
        })
    }

    /// Call of a named function or built-in.
    pub fn call_named(&self, func: &str, args: Vec<Expr>) -> Expr {
        self.call(self.ident(func), args)
    }

    /// `func(args, last...)`
    pub fn call_spread(&self, func: Expr, args: Vec<Expr>) -> Expr {
        Self::expr(ExprKind::Call {
            func: Box::new(func),
            args,
            spread: true,
        })
    }

    /// `base.method(args...)`
    pub fn method_call(&self, base: Expr, method: &str, args: Vec<Expr>) -> Expr {
        self.call(self.selector(base, method), args)
    }

    /// `base[index]`
    pub fn index(&self, base: Expr, index: Expr) -> Expr {
        let ty = base.ty.as_ref().and_then(|ty| match ty {
            Type::String => Some(Type::Int(crate::IntKind::Uint8)),
            other => other.elem().cloned(),
        });
        let mut expr = Self::expr(ExprKind::Index {
            base: Box::new(base),
            index: Box::new(index),
        });
        expr.ty = ty;
        expr
    }

    /// `base[low:high:max]`
    pub fn slice(
        &self,
        base: Expr,
        low: Option<Expr>,
        high: Option<Expr>,
        max: Option<Expr>,
    ) -> Expr {
        Self::expr(ExprKind::Slice {
            base: Box::new(base),
            low: low.map(Box::new),
            high: high.map(Box::new),
            max: max.map(Box::new),
        })
    }

    /// `base.field`
    pub fn selector(&self, base: Expr, field: &str) -> Expr {
        Self::expr(ExprKind::Selector {
            base: Box::new(base),
            field: self.name(field),
        })
    }

    /// `pkg.Member` for an imported package.
    pub fn qualified(&self, pkg: &str, member: &str) -> Expr {
        self.selector(self.ident(pkg), member)
    }

    /// Typed composite literal.
    pub fn composite(&self, ty: Type, elems: Vec<Element>) -> Expr {
        Self::expr(ExprKind::Composite {
            ty: Some(ty.clone()),
            elems,
        })
        .with_type(ty)
    }

    /// Composite literal whose type is elided (inner literal of a slice or map).
    pub fn elided(&self, elems: Vec<Element>) -> Expr {
        Self::expr(ExprKind::Composite { ty: None, elems })
    }

    /// Positional composite element.
    pub fn elem(&self, value: Expr) -> Element {
        Element { key: None, value }
    }

    /// `field: value` struct element.
    pub fn field(&self, field: &str, value: Expr) -> Element {
        Element {
            key: Some(ElementKey::Field(self.name(field))),
            value,
        }
    }

    /// `key: value` map or array element.
    pub fn keyed(&self, key: Expr, value: Expr) -> Element {
        Element {
            key: Some(ElementKey::Expr(key)),
            value,
        }
    }

    /// Function literal.
    pub fn func_lit(&self, sig: Signature, body: Vec<Stmt>) -> Expr {
        Self::expr(ExprKind::FuncLit(Rc::new(FuncLit {
            sig,
            body: Block::new(body),
            span: Span::DUMMY,
        })))
    }

    /// `base.(T)`
    pub fn type_assert(&self, base: Expr, ty: Type) -> Expr {
        Self::expr(ExprKind::TypeAssert {
            base: Box::new(base),
            ty: ty.clone(),
        })
        .with_type(ty)
    }

    /// `T(expr)`
    pub fn convert(&self, ty: Type, expr: Expr) -> Expr {
        Self::expr(ExprKind::Conversion {
            ty: ty.clone(),
            expr: Box::new(expr),
        })
        .with_type(ty)
    }

    /// A type used as a `make`/`new` argument.
    pub fn type_expr(&self, ty: Type) -> Expr {
        Self::expr(ExprKind::TypeExpr(ty))
    }

    // Signatures

    /// `(name type, ...)` parameter list.
    pub fn params(&self, params: &[(&str, Type)]) -> Vec<Param> {
        params
            .iter()
            .map(|(name, ty)| Param {
                name: Some(self.name(name)),
                ty: ty.clone(),
            })
            .collect()
    }

    /// Signature with unnamed results.
    pub fn sig(&self, params: &[(&str, Type)], results: Vec<Type>) -> Signature {
        Signature {
            params: self.params(params),
            results: results
                .into_iter()
                .map(|ty| Param { name: None, ty })
                .collect(),
            variadic: false,
        }
    }

    /// Signature with named results.
    pub fn sig_named(&self, params: &[(&str, Type)], results: &[(&str, Type)]) -> Signature {
        Signature {
            params: self.params(params),
            results: self.params(results),
            variadic: false,
        }
    }

    /// Variadic signature; the last parameter's type is the element type.
    pub fn sig_variadic(&self, params: &[(&str, Type)], results: Vec<Type>) -> Signature {
        Signature {
            variadic: true,
            ..self.sig(params, results)
        }
    }

    // Statements

    /// Expression statement.
    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        Self::stmt(StmtKind::Expr(expr))
    }

    /// `print(args...)` statement.
    pub fn print(&self, args: Vec<Expr>) -> Stmt {
        self.expr_stmt(self.call_named("print", args))
    }

    /// `println(args...)` statement.
    pub fn println(&self, args: Vec<Expr>) -> Stmt {
        self.expr_stmt(self.call_named("println", args))
    }

    /// `a, b := values...`
    pub fn define(&self, names: &[&str], values: Vec<Expr>) -> Stmt {
        Self::stmt(StmtKind::Define {
            names: self.names(names),
            values,
        })
    }

    /// `name := value`
    pub fn define1(&self, name: &str, value: Expr) -> Stmt {
        self.define(&[name], vec![value])
    }

    /// `var name T = value`
    pub fn var(&self, name: &str, ty: Option<Type>, value: Option<Expr>) -> Stmt {
        Self::stmt(StmtKind::Var(self.value_spec(&[name], ty, value.into_iter().collect())))
    }

    /// `var a, b T = values...` spec.
    pub fn value_spec(&self, names: &[&str], ty: Option<Type>, values: Vec<Expr>) -> ValueSpec {
        ValueSpec {
            names: self.names(names),
            ty,
            values,
            span: Span::DUMMY,
        }
    }

    /// Local `const ( ... )` block.
    pub fn const_stmt(&self, block: ConstBlock) -> Stmt {
        Self::stmt(StmtKind::Const(block))
    }

    /// Local `type Name T`.
    pub fn type_stmt(&self, name: &str, ty: Type) -> Stmt {
        Self::stmt(StmtKind::Type(self.type_spec(name, ty)))
    }

    /// `targets... = values...`
    pub fn assign(&self, targets: Vec<Expr>, values: Vec<Expr>) -> Stmt {
        Self::stmt(StmtKind::Assign { targets, values })
    }

    /// `target = value`
    pub fn assign1(&self, target: Expr, value: Expr) -> Stmt {
        self.assign(vec![target], vec![value])
    }

    /// `target op= value`
    pub fn op_assign(&self, op: BinaryOp, target: Expr, value: Expr) -> Stmt {
        Self::stmt(StmtKind::OpAssign { op, target, value })
    }

    /// `target++`
    pub fn inc(&self, target: Expr) -> Stmt {
        Self::stmt(StmtKind::IncDec { target, inc: true })
    }

    /// `target--`
    pub fn dec(&self, target: Expr) -> Stmt {
        Self::stmt(StmtKind::IncDec { target, inc: false })
    }

    /// `chan <- value`
    pub fn send(&self, chan: Expr, value: Expr) -> Stmt {
        Self::stmt(StmtKind::Send { chan, value })
    }

    /// `{ stmts }`
    pub fn block(&self, stmts: Vec<Stmt>) -> Stmt {
        Self::stmt(StmtKind::Block(Block::new(stmts)))
    }

    /// `if cond { then } else { els }`
    pub fn if_(&self, cond: Expr, then: Vec<Stmt>, els: Option<Vec<Stmt>>) -> Stmt {
        self.if_init(None, cond, then, els.map(|els| self.block(els)))
    }

    /// `if init; cond { then } else els` where `els` is a block or another `if`.
    pub fn if_init(
        &self,
        init: Option<Stmt>,
        cond: Expr,
        then: Vec<Stmt>,
        els: Option<Stmt>,
    ) -> Stmt {
        Self::stmt(StmtKind::If(Box::new(IfStmt {
            init,
            cond,
            then: Block::new(then),
            els,
        })))
    }

    /// `for init; cond; post { body }`
    pub fn for_(
        &self,
        init: Option<Stmt>,
        cond: Option<Expr>,
        post: Option<Stmt>,
        body: Vec<Stmt>,
    ) -> Stmt {
        Self::stmt(StmtKind::For(Box::new(ForStmt {
            init,
            cond,
            post,
            body: Block::new(body),
        })))
    }

    /// `for var := 0; var < limit; var++ { body }`
    pub fn count_loop(&self, var: &str, limit: Expr, body: Vec<Stmt>) -> Stmt {
        self.for_(
            Some(self.define1(var, self.int(0))),
            Some(self.binary(BinaryOp::Lt, self.ident(var), limit)),
            Some(self.inc(self.ident(var))),
            body,
        )
    }

    /// `for key, value := range expr { body }`
    pub fn range(
        &self,
        key: Option<&str>,
        value: Option<&str>,
        expr: Expr,
        body: Vec<Stmt>,
    ) -> Stmt {
        Self::stmt(StmtKind::Range(Box::new(RangeStmt {
            key: key.map(|k| self.ident(k)),
            value: value.map(|v| self.ident(v)),
            define: true,
            expr,
            body: Block::new(body),
        })))
    }

    /// `for key, value = range expr { body }` assigning existing targets.
    pub fn range_assign(
        &self,
        key: Option<Expr>,
        value: Option<Expr>,
        expr: Expr,
        body: Vec<Stmt>,
    ) -> Stmt {
        Self::stmt(StmtKind::Range(Box::new(RangeStmt {
            key,
            value,
            define: false,
            expr,
            body: Block::new(body),
        })))
    }

    /// `switch init; tag { clauses }`
    pub fn switch(&self, init: Option<Stmt>, tag: Option<Expr>, clauses: Vec<CaseClause>) -> Stmt {
        Self::stmt(StmtKind::Switch(Box::new(SwitchStmt { init, tag, clauses })))
    }

    /// `case values...: body`
    pub fn case(&self, values: Vec<Expr>, body: Vec<Stmt>) -> CaseClause {
        CaseClause {
            values,
            is_default: false,
            body,
            span: Span::DUMMY,
        }
    }

    /// `default: body`
    pub fn default_case(&self, body: Vec<Stmt>) -> CaseClause {
        CaseClause {
            values: Vec::new(),
            is_default: true,
            body,
            span: Span::DUMMY,
        }
    }

    /// `switch binding := subject.(type) { clauses }`
    pub fn type_switch(
        &self,
        binding: Option<&str>,
        subject: Expr,
        clauses: Vec<TypeClause>,
    ) -> Stmt {
        Self::stmt(StmtKind::TypeSwitch(Box::new(TypeSwitchStmt {
            init: None,
            binding: binding.map(|b| self.name(b)),
            subject,
            clauses,
        })))
    }

    /// `case T1, T2: body` (use `Type::UntypedNil` for `case nil`).
    pub fn type_case(&self, types: Vec<Type>, body: Vec<Stmt>) -> TypeClause {
        TypeClause {
            types,
            is_default: false,
            body,
            span: Span::DUMMY,
        }
    }

    /// `default: body` in a type switch.
    pub fn type_default(&self, body: Vec<Stmt>) -> TypeClause {
        TypeClause {
            types: Vec::new(),
            is_default: true,
            body,
            span: Span::DUMMY,
        }
    }

    /// `label: stmt`
    pub fn labeled(&self, label: &str, stmt: Stmt) -> Stmt {
        Self::stmt(StmtKind::Labeled {
            label: self.name(label),
            stmt: Box::new(stmt),
        })
    }

    /// `return values...`
    pub fn ret(&self, values: Vec<Expr>) -> Stmt {
        Self::stmt(StmtKind::Return(values))
    }

    /// `break label?`
    pub fn break_(&self, label: Option<&str>) -> Stmt {
        Self::stmt(StmtKind::Break(label.map(|l| self.name(l))))
    }

    /// `continue label?`
    pub fn continue_(&self, label: Option<&str>) -> Stmt {
        Self::stmt(StmtKind::Continue(label.map(|l| self.name(l))))
    }

    /// `goto label`
    pub fn goto(&self, label: &str) -> Stmt {
        Self::stmt(StmtKind::Goto(self.name(label)))
    }

    /// `fallthrough`
    pub fn fallthrough(&self) -> Stmt {
        Self::stmt(StmtKind::Fallthrough)
    }

    /// `defer call`
    pub fn defer(&self, call: Expr) -> Stmt {
        Self::stmt(StmtKind::Defer(call))
    }

    /// `go call`
    pub fn go(&self, call: Expr) -> Stmt {
        Self::stmt(StmtKind::Go(call))
    }

    // Declarations

    /// One const spec line.
    pub fn const_spec(&self, names: &[&str], ty: Option<Type>, values: Vec<Expr>) -> ConstSpec {
        ConstSpec {
            names: self.names(names),
            ty,
            values,
            span: Span::DUMMY,
        }
    }

    /// `type name ty`
    pub fn type_spec(&self, name: &str, ty: Type) -> TypeSpec {
        TypeSpec {
            name: self.name(name),
            ty,
            span: Span::DUMMY,
        }
    }

    /// Top-level function.
    pub fn func(&self, name: &str, sig: Signature, body: Vec<Stmt>) -> Decl {
        Decl::Func(FuncDecl {
            name: self.name(name),
            recv: None,
            sig,
            body: Block::new(body),
            span: Span::DUMMY,
        })
    }

    /// Method on `type_name` (`pointer` selects a `*T` receiver).
    pub fn method(
        &self,
        recv: &str,
        type_name: &str,
        pointer: bool,
        name: &str,
        sig: Signature,
        body: Vec<Stmt>,
    ) -> Decl {
        Decl::Func(FuncDecl {
            name: self.name(name),
            recv: Some(Receiver {
                name: Some(self.name(recv)),
                type_name: self.name(type_name),
                pointer,
            }),
            sig,
            body: Block::new(body),
            span: Span::DUMMY,
        })
    }

    /// `func main() { body }`
    pub fn main(&self, body: Vec<Stmt>) -> Decl {
        self.func("main", Signature::default(), body)
    }

    /// `import "path"`
    pub fn import(&self, path: &str) -> Import {
        Import {
            alias: None,
            path: path.to_string(),
            span: Span::DUMMY,
        }
    }

    /// A package from its declarations.
    pub fn package(&self, name: &str, imports: Vec<Import>, decls: Vec<Decl>) -> Package {
        Package {
            name: self.name(name),
            imports,
            decls,
        }
    }
}

#[cfg(test)]
mod tests;
