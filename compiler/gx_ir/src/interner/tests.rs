use super::*;
use pretty_assertions::assert_eq;

#[test]
fn intern_is_idempotent() {
    let interner = StringInterner::new();
    let a = interner.intern("point");
    let b = interner.intern("point");
    assert_eq!(a, b);
    assert_eq!(interner.lookup(a), "point");
}

#[test]
fn distinct_strings_get_distinct_names() {
    let interner = StringInterner::new();
    let x = interner.intern("x");
    let y = interner.intern("y");
    assert_ne!(x, y);
    assert_eq!(interner.len(), 3);
}

#[test]
fn empty_string_is_pre_interned() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert_eq!(interner.get(""), Some(Name::EMPTY));
}

#[test]
fn get_does_not_intern() {
    let interner = StringInterner::new();
    assert_eq!(interner.get("missing"), None);
    assert_eq!(interner.len(), 1);
}

#[test]
fn shared_handles_agree() {
    let shared = SharedInterner::new();
    let clone = shared.clone();
    let name = shared.intern("main");
    assert_eq!(clone.get("main"), Some(name));
}

#[test]
fn foreign_name_is_unknown() {
    let interner = StringInterner::new();
    assert_eq!(interner.lookup(Name::from_raw(999)), "<unknown>");
}
