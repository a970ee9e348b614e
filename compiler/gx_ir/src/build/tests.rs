use pretty_assertions::assert_eq;

use super::AstBuilder;
use crate::{BinaryOp, ExprKind, IntKind, Literal, StmtKind, Type, UnaryOp};

#[test]
fn names_share_the_interner() {
    let b = AstBuilder::new();
    let x = b.name("x");
    assert_eq!(b.interner().lookup(x), "x");
    assert_eq!(b.ident("x").as_ident(), Some(x));
}

#[test]
fn comparison_is_typed_bool() {
    let b = AstBuilder::new();
    let left = b.typed(b.ident("a"), Type::INT);
    let expr = b.binary(BinaryOp::Lt, left, b.int(3));
    assert_eq!(expr.ty, Some(Type::Bool));
}

#[test]
fn arithmetic_takes_operand_type() {
    let b = AstBuilder::new();
    let right = b.typed(b.ident("f"), Type::Float64);
    let expr = b.binary(BinaryOp::Mul, b.int(2), right);
    assert_eq!(expr.ty, Some(Type::Float64));
}

#[test]
fn address_of_wraps_pointer_type() {
    let b = AstBuilder::new();
    let expr = b.addr(b.typed(b.ident("x"), Type::INT));
    assert_eq!(expr.ty, Some(Type::pointer(Type::INT)));
    assert!(matches!(
        expr.kind,
        ExprKind::Unary {
            op: UnaryOp::AddrOf,
            ..
        }
    ));
}

#[test]
fn string_index_is_byte() {
    let b = AstBuilder::new();
    let expr = b.index(b.string("hi"), b.int(0));
    assert_eq!(expr.ty, Some(Type::Int(IntKind::Uint8)));
}

#[test]
fn count_loop_shape() {
    let b = AstBuilder::new();
    let stmt = b.count_loop("i", b.int(3), vec![b.print(vec![b.ident("i")])]);
    let StmtKind::For(for_stmt) = stmt.kind else {
        panic!("expected for statement");
    };
    assert!(for_stmt.init.is_some());
    assert!(for_stmt.post.is_some());
    assert_eq!(for_stmt.body.stmts.len(), 1);
}

#[test]
fn literal_kinds() {
    let b = AstBuilder::new();
    assert_eq!(b.int(7).kind, ExprKind::Lit(Literal::Int(7)));
    assert_eq!(b.rune('x').kind, ExprKind::Lit(Literal::Rune('x')));
    assert_eq!(b.string("s").ty, Some(Type::String));
}
