//! Expression nodes.

use std::rc::Rc;

use super::{BinaryOp, Block, UnaryOp};
use crate::{Name, Span, Type};

/// Literal constants.
///
/// Integer literals hold the exact source value; conversion to the node's
/// static type (or the default `int`) happens at compile time.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i128),
    Float(f64),
    /// Imaginary literal (`2i`), holding the imaginary part.
    Imag(f64),
    Rune(char),
    Str(Rc<str>),
}

/// Expression node.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    /// Static type from the front-end, when known.
    pub ty: Option<Type>,
    pub span: Span,
}

impl Expr {
    /// Create an untyped expression.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            ty: None,
            span,
        }
    }

    /// Attach a static type.
    #[must_use]
    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    /// The identifier name, if this is a plain identifier.
    pub fn as_ident(&self) -> Option<Name> {
        match self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// Expression kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Lit(Literal),
    Ident(Name),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `func(args...)`; `spread` marks a trailing `xs...` argument.
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        spread: bool,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// `base[low:high:max]`
    Slice {
        base: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
    },
    /// `base.field` (field, method or package member).
    Selector {
        base: Box<Expr>,
        field: Name,
    },
    /// Composite literal; `ty` is `None` for elided inner literals.
    Composite {
        ty: Option<Type>,
        elems: Vec<Element>,
    },
    FuncLit(Rc<FuncLit>),
    /// `base.(T)`
    TypeAssert {
        base: Box<Expr>,
        ty: Type,
    },
    /// `T(x)`
    Conversion {
        ty: Type,
        expr: Box<Expr>,
    },
    /// A type in expression position (`make`/`new` arguments).
    TypeExpr(Type),
}

/// Composite literal element.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub key: Option<ElementKey>,
    pub value: Expr,
}

/// Composite literal element key.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementKey {
    /// Struct field name.
    Field(Name),
    /// Map key or array index.
    Expr(Expr),
}

/// Function parameter or result.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Option<Name>,
    pub ty: Type,
}

/// Function signature.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// Last parameter is `...T` (its `ty` is `T`).
    pub variadic: bool,
}

impl Signature {
    /// Whether the results are named.
    pub fn has_named_results(&self) -> bool {
        self.results.iter().any(|result| result.name.is_some())
    }
}

/// Function literal.
#[derive(Clone, Debug, PartialEq)]
pub struct FuncLit {
    pub sig: Signature,
    pub body: Block,
    pub span: Span,
}
