//! Syntax tree nodes.
//!
//! Every node carries a [`Span`](crate::Span); expressions additionally carry
//! the static type assigned by the front-end, when it assigned one.

mod decl;
mod expr;
mod operators;
mod stmt;

pub use decl::{ConstBlock, ConstSpec, Decl, FuncDecl, Import, Package, Receiver, TypeSpec, ValueSpec};
pub use expr::{Element, ElementKey, Expr, ExprKind, FuncLit, Literal, Param, Signature};
pub use operators::{BinaryOp, UnaryOp};
pub use stmt::{
    Block, CaseClause, ForStmt, IfStmt, RangeStmt, Stmt, StmtKind, SwitchStmt, TypeClause,
    TypeSwitchStmt,
};

#[cfg(test)]
mod tests;
