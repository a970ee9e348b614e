use super::*;
use crate::{Name, Span, Type};

#[test]
fn binary_op_classification() {
    assert!(BinaryOp::LtEq.is_comparison());
    assert!(!BinaryOp::Add.is_comparison());
    assert!(BinaryOp::LogicalOr.is_logical());
    assert!(BinaryOp::Shr.is_shift());
    assert_eq!(BinaryOp::AndNot.as_symbol(), "&^");
    assert_eq!(UnaryOp::Recv.as_symbol(), "<-");
}

#[test]
fn import_default_name_is_last_segment() {
    let import = Import {
        alias: None,
        path: "app/util/strs".to_string(),
        span: Span::DUMMY,
    };
    assert_eq!(import.default_name(), "strs");
}

#[test]
fn expr_ident_and_type() {
    let name = Name::from_raw(3);
    let expr = Expr::new(ExprKind::Ident(name), Span::DUMMY).with_type(Type::INT);
    assert_eq!(expr.as_ident(), Some(name));
    assert_eq!(expr.ty, Some(Type::INT));
}

#[test]
fn named_results_detection() {
    let mut sig = Signature::default();
    sig.results.push(Param {
        name: None,
        ty: Type::INT,
    });
    assert!(!sig.has_named_results());
    sig.results.push(Param {
        name: Some(Name::from_raw(1)),
        ty: Type::Bool,
    });
    assert!(sig.has_named_results());
}
