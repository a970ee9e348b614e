use pretty_assertions::assert_eq;

use super::*;

fn n(raw: u32) -> Name {
    Name::from_raw(raw)
}

#[test]
fn lookup_walks_parents() {
    let mut pool = ScopePool::new();
    let root = pool.root();
    root.borrow_mut().define(n(1), Value::int(1));
    let child = pool.child(&root);
    assert_eq!(child.borrow().lookup(n(1)), Some(Value::int(1)));
    assert_eq!(child.borrow().lookup(n(2)), None);
}

#[test]
fn define_shadows_and_assign_hits_owner() {
    let mut pool = ScopePool::new();
    let root = pool.root();
    root.borrow_mut().define(n(1), Value::int(1));
    let child = pool.child(&root);
    assert!(assign(&child, n(1), Value::int(2)));
    assert_eq!(root.borrow().get_local(n(1)), Some(Value::int(2)));

    child.borrow_mut().define(n(1), Value::int(3));
    assert!(assign(&child, n(1), Value::int(4)));
    assert_eq!(root.borrow().get_local(n(1)), Some(Value::int(2)));
    assert_eq!(child.borrow().lookup(n(1)), Some(Value::int(4)));
}

#[test]
fn assign_to_unbound_fails() {
    let mut pool = ScopePool::new();
    let root = pool.root();
    assert!(!assign(&root, n(5), Value::Nil));
}

#[test]
fn released_tables_are_reused() {
    let mut pool = ScopePool::new();
    let root = pool.root();
    let child = pool.child(&root);
    child.borrow_mut().define(n(1), Value::int(1));
    pool.release(child);
    let again = pool.child(&root);
    assert_eq!(pool.reuse_count(), 1);
    assert_eq!(again.borrow().lookup(n(1)), None);
}

#[test]
fn escaped_or_shared_scopes_are_not_recycled() {
    let mut pool = ScopePool::new();
    let root = pool.root();

    let escaped = pool.child(&root);
    mark_escaped(&escaped);
    assert!(root.borrow().is_escaped());
    pool.release(escaped);

    let shared = pool.child(&root);
    let _captured = shared.clone();
    pool.release(shared);

    let _fresh = pool.child(&root);
    assert_eq!(pool.reuse_count(), 0);
}

#[test]
fn scope_ids_are_unique() {
    let mut pool = ScopePool::new();
    let root = pool.root();
    let a = pool.child(&root);
    let b = pool.child(&root);
    assert_ne!(a.borrow().id(), b.borrow().id());
}
