//! Statement nodes.

use super::{BinaryOp, ConstBlock, Expr, TypeSpec, ValueSpec};
use crate::{Name, Span, Type};

/// Braced statement list.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    /// Create a block with a dummy span.
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Block {
            stmts,
            span: Span::DUMMY,
        }
    }
}

/// Statement node.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    /// Create a statement.
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

/// Statement kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Empty,
    Expr(Expr),
    /// `a, b := x, y`
    Define {
        names: Vec<Name>,
        values: Vec<Expr>,
    },
    Var(ValueSpec),
    Const(ConstBlock),
    Type(TypeSpec),
    /// `a, b = x, y`
    Assign {
        targets: Vec<Expr>,
        values: Vec<Expr>,
    },
    /// `a op= x`
    OpAssign {
        op: BinaryOp,
        target: Expr,
        value: Expr,
    },
    /// `a++` / `a--`
    IncDec {
        target: Expr,
        inc: bool,
    },
    /// `ch <- v`
    Send {
        chan: Expr,
        value: Expr,
    },
    Block(Block),
    If(Box<IfStmt>),
    For(Box<ForStmt>),
    Range(Box<RangeStmt>),
    Switch(Box<SwitchStmt>),
    TypeSwitch(Box<TypeSwitchStmt>),
    Labeled {
        label: Name,
        stmt: Box<Stmt>,
    },
    Return(Vec<Expr>),
    Break(Option<Name>),
    Continue(Option<Name>),
    Goto(Name),
    Fallthrough,
    /// `defer call`
    Defer(Expr),
    /// `go call` (rejected by the compiler).
    Go(Expr),
}

/// `if init; cond { then } else els`
#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub init: Option<Stmt>,
    pub cond: Expr,
    pub then: Block,
    /// Either another `If` statement or a `Block`.
    pub els: Option<Stmt>,
}

/// `for init; cond; post { body }`
#[derive(Clone, Debug, PartialEq)]
pub struct ForStmt {
    pub init: Option<Stmt>,
    pub cond: Option<Expr>,
    pub post: Option<Stmt>,
    pub body: Block,
}

/// `for key, value := range expr { body }`
#[derive(Clone, Debug, PartialEq)]
pub struct RangeStmt {
    pub key: Option<Expr>,
    pub value: Option<Expr>,
    /// `:=` (fresh variables) rather than `=` (existing targets).
    pub define: bool,
    pub expr: Expr,
    pub body: Block,
}

/// Expression switch.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchStmt {
    pub init: Option<Stmt>,
    /// `None` switches on `true`.
    pub tag: Option<Expr>,
    pub clauses: Vec<CaseClause>,
}

/// `case v1, v2: body` or `default: body`
#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    pub values: Vec<Expr>,
    pub is_default: bool,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `switch binding := subject.(type) { ... }`
#[derive(Clone, Debug, PartialEq)]
pub struct TypeSwitchStmt {
    pub init: Option<Stmt>,
    pub binding: Option<Name>,
    pub subject: Expr,
    pub clauses: Vec<TypeClause>,
}

/// `case T1, T2: body`; `Type::UntypedNil` matches nil.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeClause {
    pub types: Vec<Type>,
    pub is_default: bool,
    pub body: Vec<Stmt>,
    pub span: Span,
}
