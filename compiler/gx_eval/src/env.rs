//! Lexical scopes.
//!
//! Each block and call gets a `Scope` whose parent is the enclosing scope
//! (or, for a call, the closure's captured scope). Scope tables come from a
//! [`ScopePool`] and go back to it when the scope is exited, unless the
//! scope escaped (a closure captured it) or something still holds a
//! reference to it. A variable whose address was taken lives in a shared
//! heap cell instead of the table, so pointers to it never pin the scope.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use gx_ir::Name;
use rustc_hash::FxHashMap;

use crate::heap::HeapRef;
use crate::value::{assign_in_place, Value};

/// Single-threaded shared scope handle.
#[repr(transparent)]
pub struct LocalScope<T>(Rc<RefCell<T>>);

impl<T> LocalScope<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        LocalScope(Rc::new(RefCell::new(value)))
    }

    /// Whether another handle (closure, child) shares this scope.
    #[inline]
    pub fn is_shared(&self) -> bool {
        Rc::strong_count(&self.0) > 1
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Take the inner value if this is the only handle.
    pub fn try_unwrap(self) -> Result<T, Self> {
        Rc::try_unwrap(self.0)
            .map(RefCell::into_inner)
            .map_err(LocalScope)
    }
}

impl<T> Clone for LocalScope<T> {
    #[inline]
    fn clone(&self) -> Self {
        LocalScope(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalScope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalScope").field(&self.0).finish()
    }
}

impl<T> Deref for LocalScope<T> {
    type Target = RefCell<T>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Shared handle to a scope.
pub type ScopeRef = LocalScope<Scope>;

/// One binding: inline, or promoted to a heap cell by `&x`.
enum Slot {
    Plain(Value),
    Shared(HeapRef),
}

impl Slot {
    fn value(&self) -> Option<Value> {
        match self {
            Slot::Plain(value) => Some(value.clone()),
            Slot::Shared(cell) => cell.boxed(),
        }
    }

    fn set(&mut self, value: Value) -> bool {
        match self {
            Slot::Plain(slot) => {
                assign_in_place(slot, value);
                true
            }
            Slot::Shared(cell) => cell.set_boxed(value),
        }
    }
}

/// Name-to-value table of one lexical scope.
pub struct Scope {
    bindings: FxHashMap<Name, Slot>,
    parent: Option<ScopeRef>,
    escaped: bool,
    id: u64,
}

impl Scope {
    /// Root scope with no parent.
    pub fn root(id: u64) -> Self {
        Scope {
            bindings: FxHashMap::default(),
            parent: None,
            escaped: false,
            id,
        }
    }

    /// Numeric identity, stable for the scope's lifetime.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn parent(&self) -> Option<&ScopeRef> {
        self.parent.as_ref()
    }

    #[inline]
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    pub fn mark_escaped(&mut self) {
        self.escaped = true;
    }

    /// Bind in this scope, shadowing outer bindings. Redeclaring a name
    /// already bound here writes the existing variable.
    #[inline]
    pub fn define(&mut self, name: Name, value: Value) {
        match self.bindings.get_mut(&name) {
            Some(Slot::Shared(cell)) => {
                cell.set_boxed(value);
            }
            _ => {
                self.bindings.insert(name, Slot::Plain(value));
            }
        }
    }

    /// Whether `name` is bound directly in this scope.
    #[inline]
    pub fn defines(&self, name: Name) -> bool {
        self.bindings.contains_key(&name)
    }

    /// Binding in this scope only.
    #[inline]
    pub fn get_local(&self, name: Name) -> Option<Value> {
        self.bindings.get(&name).and_then(Slot::value)
    }

    /// Look up along the parent chain.
    pub fn lookup(&self, name: Name) -> Option<Value> {
        if let Some(slot) = self.bindings.get(&name) {
            return slot.value();
        }
        let mut next = self.parent.clone();
        while let Some(scope) = next {
            let scope = scope.borrow();
            if let Some(slot) = scope.bindings.get(&name) {
                return slot.value();
            }
            next = scope.parent.clone();
        }
        None
    }

    /// Store into this scope's own binding; false if not bound here.
    pub fn set_local(&mut self, name: Name, value: Value) -> bool {
        self.bindings
            .get_mut(&name)
            .is_some_and(|slot| slot.set(value))
    }

    /// The cell backing `name`, moving the binding into one built by
    /// `alloc` on first use. `None` if `name` is not bound here.
    pub fn promote(
        &mut self,
        name: Name,
        alloc: impl FnOnce(Value) -> HeapRef,
    ) -> Option<HeapRef> {
        let slot = self.bindings.get_mut(&name)?;
        if let Slot::Plain(value) = slot {
            let value = std::mem::replace(value, Value::Nil);
            *slot = Slot::Shared(alloc(value));
        }
        match slot {
            Slot::Shared(cell) => Some(cell.clone()),
            Slot::Plain(_) => None,
        }
    }

    /// Whether `name` is bound here through a heap cell.
    pub fn is_promoted(&self, name: Name) -> bool {
        matches!(self.bindings.get(&name), Some(Slot::Shared(_)))
    }

    /// Bound names, unordered.
    pub fn names(&self) -> impl Iterator<Item = Name> + '_ {
        self.bindings.keys().copied()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("bindings", &self.bindings.len())
            .field("escaped", &self.escaped)
            .finish_non_exhaustive()
    }
}

/// The scope (starting at `scope`) that binds `name`.
pub fn owner(scope: &ScopeRef, name: Name) -> Option<ScopeRef> {
    let mut current = scope.clone();
    loop {
        let parent = {
            let borrowed = current.borrow();
            if borrowed.defines(name) {
                return Some(current.clone());
            }
            borrowed.parent.clone()
        };
        current = parent?;
    }
}

/// Assign to the nearest binding of `name`; false if unbound.
pub fn assign(scope: &ScopeRef, name: Name, value: Value) -> bool {
    match owner(scope, name) {
        Some(owner) => owner.borrow_mut().set_local(name, value),
        None => false,
    }
}

/// Mark `scope` and its ancestors as escaped.
pub fn mark_escaped(scope: &ScopeRef) {
    let mut current = Some(scope.clone());
    while let Some(scope) = current {
        let mut borrowed = scope.borrow_mut();
        if borrowed.escaped {
            break;
        }
        borrowed.escaped = true;
        current = borrowed.parent.clone();
    }
}

/// Free-list of scope tables.
#[derive(Default)]
pub struct ScopePool {
    free: Vec<FxHashMap<Name, Slot>>,
    next_id: u64,
    reused: u64,
}

impl ScopePool {
    /// Upper bound on retained tables.
    const MAX_FREE: usize = 256;

    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh root scope.
    pub fn root(&mut self) -> ScopeRef {
        let id = self.fresh_id();
        LocalScope::new(Scope::root(id))
    }

    /// Fresh child of `parent`, reusing a pooled table when available.
    pub fn child(&mut self, parent: &ScopeRef) -> ScopeRef {
        let id = self.fresh_id();
        let bindings = match self.free.pop() {
            Some(table) => {
                self.reused += 1;
                table
            }
            None => FxHashMap::default(),
        };
        LocalScope::new(Scope {
            bindings,
            parent: Some(parent.clone()),
            escaped: false,
            id,
        })
    }

    /// Exit `scope`: recycle its table unless it escaped or is still
    /// referenced elsewhere.
    pub fn release(&mut self, scope: ScopeRef) {
        if scope.borrow().escaped {
            return;
        }
        if let Ok(scope) = scope.try_unwrap() {
            if self.free.len() < Self::MAX_FREE {
                let mut table = scope.bindings;
                table.clear();
                self.free.push(table);
            }
        }
    }

    /// Number of tables handed out again from the free-list.
    pub fn reuse_count(&self) -> u64 {
        self.reused
    }

    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[cfg(test)]
mod tests;
