use pretty_assertions::assert_eq;

use super::*;
use gx_ir::{FieldDef, StructType, Type};

fn point_layout() -> Rc<StructLayout> {
    let body = StructType {
        fields: vec![
            FieldDef {
                name: Name::from_raw(1),
                ty: Type::INT,
                embedded: false,
            },
            FieldDef {
                name: Name::from_raw(2),
                ty: Type::INT,
                embedded: false,
            },
        ],
    };
    Rc::new(StructLayout::new(&body))
}

fn point(x: i64, y: i64) -> StructValue {
    StructValue::new(point_layout(), vec![Value::int(x), Value::int(y)], None)
}

#[test]
fn copy_value_detaches_structs() {
    let original = Value::Struct(point(1, 2));
    let copy = original.copy_value();
    let Value::Struct(copy_struct) = &copy else {
        panic!("expected struct");
    };
    copy_struct.set_index(0, Value::int(9));
    let Value::Struct(original_struct) = &original else {
        panic!("expected struct");
    };
    assert_eq!(original_struct.get_index(0), Some(Value::int(1)));
    assert_eq!(copy_struct.get_index(0), Some(Value::int(9)));
}

#[test]
fn clone_aliases_struct_storage() {
    let s = point(1, 2);
    let alias = s.clone();
    alias.set_index(1, Value::int(5));
    assert_eq!(s.get_index(1), Some(Value::int(5)));
}

#[test]
fn assign_in_place_updates_aliases() {
    let target = point(1, 2);
    let alias = target.clone();
    let mut slot = Value::Struct(target);
    assign_in_place(&mut slot, Value::Struct(point(7, 8)));
    assert_eq!(alias.get_index(0), Some(Value::int(7)));
    assert_eq!(alias.get_index(1), Some(Value::int(8)));
}

#[test]
fn slice_append_in_place_then_grow() {
    let base = SliceValue::from_vec(vec![Value::int(1)]);
    let grown = base.append(vec![Value::int(2)]);
    assert_eq!(grown.len(), 2);
    assert_eq!(grown.cap(), 2);

    let resliced = grown.reslice(0, 1, 2).map(|s| s.append(vec![Value::int(3)]));
    let Some(resliced) = resliced else {
        panic!("reslice within capacity");
    };
    // Shares the backing vector, so the write is visible through `grown`.
    assert_eq!(grown.get(1), Some(Value::int(3)));
    assert_eq!(resliced.to_vec(), vec![Value::int(1), Value::int(3)]);

    let bigger = grown.append(vec![Value::int(4)]);
    assert_eq!(bigger.cap(), 4);
    bigger.set(0, Value::int(100));
    assert_eq!(grown.get(0), Some(Value::int(1)));
}

#[test]
fn reslice_checks_capacity() {
    let s = SliceValue::from_vec(vec![Value::int(1), Value::int(2)]);
    assert!(s.reslice(0, 3, 3).is_none());
    assert!(s.reslice(2, 1, 2).is_none());
    assert_eq!(s.reslice(1, 2, 2).map(|s| s.len()), Some(1));
}

#[test]
fn map_keys_normalize_zero() {
    let pos = MapKey::from_value(&Value::Float64(0.0));
    let neg = MapKey::from_value(&Value::Float64(-0.0));
    assert_eq!(pos.ok(), neg.ok());
}

#[test]
fn slices_are_unhashable() {
    assert!(MapKey::from_value(&Value::slice(vec![])).is_err());
}

#[test]
fn nil_map_insert_panics() {
    let m = MapValue::nil();
    let key = Value::string("a");
    let result = MapKey::from_value(&key).and_then(|k| m.insert(k, key, Value::int(1)));
    assert!(matches!(result, Err(crate::errors::Unwind::Panic(_))));
}

#[test]
fn zero_like_keeps_kind() {
    let sample = Value::int_of(IntKind::Uint8, 7);
    assert_eq!(zero_like(&sample), Value::int_of(IntKind::Uint8, 0));
}

#[test]
fn nil_kinds() {
    assert!(Value::Nil.is_nil());
    assert!(Value::Slice(SliceValue::nil()).is_nil());
    assert!(Value::Pointer(None).is_nil());
    assert!(!Value::slice(vec![]).is_nil());
}
