//! gx IR - the typed syntax tree executed by the gx interpreter.
//!
//! The tree is produced by an external front-end (parser + type checker) and
//! handed to `gx_eval`, which compiles it into a step graph. This crate holds
//! only data: no evaluation happens here.
//!
//! # Contents
//!
//! - [`Name`] / [`StringInterner`] / [`SharedInterner`]: interned identifiers
//! - [`Span`]: byte-offset source locations
//! - [`Type`]: static type descriptors supplied by the front-end's `typeOf`
//! - [`ast`]: declarations, statements, expressions and operators
//! - [`AstBuilder`]: terse tree construction for front-ends and tests

pub mod ast;
mod build;
mod interner;
mod name;
mod span;
pub mod ty;

pub use ast::{
    BinaryOp, Block, CaseClause, ConstBlock, ConstSpec, Decl, Element, ElementKey, Expr, ExprKind,
    ForStmt, FuncDecl, FuncLit, IfStmt, Import, Literal, Package, Param, RangeStmt, Receiver,
    Signature, Stmt, StmtKind, SwitchStmt, TypeClause, TypeSpec, TypeSwitchStmt, UnaryOp,
    ValueSpec,
};
pub use build::AstBuilder;
pub use interner::{SharedInterner, StringInterner};
pub use name::Name;
pub use span::Span;
pub use ty::{FieldDef, FuncType, IntKind, InterfaceType, StructType, Type};
