use super::*;
use pretty_assertions::assert_eq;

#[test]
fn int_kind_widths() {
    assert_eq!(IntKind::Int8.bits(), 8);
    assert_eq!(IntKind::Uint16.bits(), 16);
    assert_eq!(IntKind::Int32.bits(), 32);
    assert_eq!(IntKind::Uintptr.bits(), 64);
    assert!(IntKind::Int.is_signed());
    assert!(!IntKind::Uint8.is_signed());
}

#[test]
fn display_composite_types() {
    let interner = StringInterner::new();
    let point = interner.intern("Point");
    let ty = Type::map(Type::String, Type::slice(Type::pointer(Type::Named(point))));
    assert_eq!(ty.display(&interner).to_string(), "map[string][]*Point");
}

#[test]
fn display_func_type() {
    let interner = StringInterner::new();
    let ty = Type::func(
        vec![Type::INT, Type::String],
        vec![Type::Bool, Type::Float64],
        true,
    );
    assert_eq!(
        ty.display(&interner).to_string(),
        "func(int, ...string) (bool, float64)"
    );
}

#[test]
fn elem_of_containers() {
    assert_eq!(Type::slice(Type::Bool).elem(), Some(&Type::Bool));
    assert_eq!(Type::map(Type::String, Type::INT).elem(), Some(&Type::INT));
    assert_eq!(Type::String.elem(), None);
}

#[test]
fn basic_classification() {
    assert!(Type::Complex64.is_basic());
    assert!(!Type::slice(Type::INT).is_basic());
    assert!(Type::any().is_interface());
}
