use pretty_assertions::assert_eq;

use super::*;
use crate::env::ScopePool;
use crate::errors::Unwind;
use crate::value::SliceValue;

#[test]
fn boxed_cell_round_trip() {
    let mut heap = Heap::new();
    let p = heap.alloc(Value::int(1));
    assert_eq!(heap.load(&p).ok(), Some(Value::int(1)));
    assert!(heap.store(&p, Value::int(2)).is_ok());
    assert_eq!(heap.load(&p).ok(), Some(Value::int(2)));
    assert_ne!(p.addr().raw(), 0);
}

#[test]
fn variable_cell_is_shared_with_the_scope() {
    let mut pool = ScopePool::new();
    let scope = pool.root();
    let x = Name::from_raw(1);
    scope.borrow_mut().define(x, Value::int(10));

    let mut heap = Heap::new();
    let Some(p) = heap.addr_of_var(&scope, x) else {
        panic!("x is bound");
    };
    assert!(scope.borrow().is_promoted(x));
    assert!(!scope.borrow().is_escaped());
    assert_eq!(heap.addr_of_var(&scope, x), Some(p.clone()));
    assert_eq!(heap.len(), 1);

    assert!(heap.store(&p, Value::int(11)).is_ok());
    assert_eq!(scope.borrow().get_local(x), Some(Value::int(11)));

    scope.borrow_mut().set_local(x, Value::int(12));
    assert_eq!(heap.load(&p).ok(), Some(Value::int(12)));
}

#[test]
fn unbound_variable_has_no_address() {
    let mut pool = ScopePool::new();
    let scope = pool.root();
    let mut heap = Heap::new();
    assert!(heap.addr_of_var(&scope, Name::from_raw(3)).is_none());
    assert!(heap.is_empty());
}

#[test]
fn pointer_outlives_its_scope() {
    let mut pool = ScopePool::new();
    let root = pool.root();
    let inner = pool.child(&root);
    let x = Name::from_raw(1);
    inner.borrow_mut().define(x, Value::int(5));

    let mut heap = Heap::new();
    let Some(p) = heap.addr_of_var(&inner, x) else {
        panic!("x is bound");
    };
    pool.release(inner);
    assert_eq!(pool.reuse_count(), 0);
    let _reused = pool.child(&root);
    assert_eq!(pool.reuse_count(), 1);
    assert_eq!(heap.load(&p).ok(), Some(Value::int(5)));
}

#[test]
fn cells_are_freed_with_their_last_pointer() {
    let mut heap = Heap::new();
    let a = heap.alloc(Value::int(1));
    let b = a.clone();
    let c = heap.alloc(Value::int(2));
    assert_eq!(heap.len(), 2);
    drop(a);
    assert_eq!(heap.len(), 2);
    drop(b);
    assert_eq!(heap.len(), 1);
    drop(c);
    assert!(heap.is_empty());
}

#[test]
fn element_cell_aliases_slice() {
    let slice = SliceValue::from_vec(vec![Value::int(1), Value::int(2)]);
    let mut heap = Heap::new();
    let Some((data, offset)) = slice.backing() else {
        panic!("non-nil slice");
    };
    let p = heap.addr_of_elem(data, offset + 1);
    assert_eq!(heap.addr_of_elem(data, offset + 1), p);
    assert!(heap.store(&p, Value::int(20)).is_ok());
    assert_eq!(slice.get(1), Some(Value::int(20)));
}

#[test]
fn dropped_element_cells_are_swept() {
    let slice = SliceValue::from_vec(vec![Value::int(0); 4]);
    let Some((data, _)) = slice.backing() else {
        panic!("non-nil slice");
    };
    let data = Rc::clone(data);
    let mut heap = Heap::new();
    for round in 0..1000 {
        let p = heap.addr_of_elem(&data, round % 4);
        assert!(heap.store(&p, Value::int(1)).is_ok());
    }
    assert!(heap.is_empty());
    assert!(heap.slots.len() <= Heap::MIN_SWEEP);
}

#[test]
fn nil_deref_is_runtime_panic() {
    let heap = Heap::new();
    assert!(matches!(heap.deref(None), Err(Unwind::Panic(_))));
}

#[test]
fn stale_element_cell_is_fatal() {
    let data: Elements = Rc::new(RefCell::new(vec![Value::int(1)]));
    let mut heap = Heap::new();
    let p = heap.addr_of_elem(&data, 0);
    data.borrow_mut().clear();
    assert!(matches!(heap.load(&p), Err(Unwind::Fatal(_))));
}
