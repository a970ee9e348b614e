//! Package-level declarations.

use super::{Block, Expr, Signature};
use crate::{Name, Span, Type};

/// A parsed, type-checked package.
#[derive(Clone, Debug, PartialEq)]
pub struct Package {
    pub name: Name,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
}

/// `import alias "path"`
#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub alias: Option<Name>,
    pub path: String,
    pub span: Span,
}

impl Import {
    /// Default binding name: the last path segment.
    pub fn default_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Top-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Const(ConstBlock),
    Var(ValueSpec),
    Type(TypeSpec),
    Func(FuncDecl),
}

/// `const ( ... )` block. `iota` counts specs within the block.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ConstBlock {
    pub specs: Vec<ConstSpec>,
}

/// One line of a const block. Empty `values` repeats the previous spec.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstSpec {
    pub names: Vec<Name>,
    pub ty: Option<Type>,
    pub values: Vec<Expr>,
    pub span: Span,
}

/// `var a, b T = x, y`
#[derive(Clone, Debug, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<Name>,
    pub ty: Option<Type>,
    pub values: Vec<Expr>,
    pub span: Span,
}

/// `type Name T`
#[derive(Clone, Debug, PartialEq)]
pub struct TypeSpec {
    pub name: Name,
    pub ty: Type,
    pub span: Span,
}

/// Method receiver.
#[derive(Clone, Debug, PartialEq)]
pub struct Receiver {
    pub name: Option<Name>,
    pub type_name: Name,
    /// `*T` receiver.
    pub pointer: bool,
}

/// Function or method declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub name: Name,
    pub recv: Option<Receiver>,
    pub sig: Signature,
    pub body: Block,
    pub span: Span,
}
