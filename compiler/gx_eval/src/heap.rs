//! Heap cells behind pointers.
//!
//! A pointer value owns a [`HeapRef`] to its cell. A cell either boxes a
//! value (`new(T)`, `&T{...}`, an addressed variable) or aliases a struct
//! field or slice/array element. Reads and writes through pointers go
//! through the cell, so they observe and update the original storage.
//!
//! Taking the address of a variable promotes its scope binding to a boxed
//! cell shared by the scope and the pointer, so the pointer does not keep
//! the scope alive. Taking the address of the same variable, field or
//! element twice yields the same cell. A cell is freed when the last
//! pointer (or scope binding) to it goes away.

use std::cell::{Cell as Counter, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use gx_ir::Name;
use rustc_hash::FxHashMap;

use crate::env::ScopeRef;
use crate::errors::{invalid_heap_address, nil_dereference, ExecResult};
use crate::value::{assign_in_place, Elements, Value};

/// Numeric address of a heap cell. Nonzero and never reused during a run.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapAddr(u64);

impl HeapAddr {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HeapAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

enum Cell {
    Boxed(RefCell<Value>),
    Field { fields: Elements, index: usize },
    Elem { data: Elements, index: usize },
}

struct HeapCell {
    addr: HeapAddr,
    cell: Cell,
    live: Rc<Counter<usize>>,
}

impl Drop for HeapCell {
    fn drop(&mut self) {
        self.live.set(self.live.get().saturating_sub(1));
    }
}

/// Owning handle to a heap cell. Equality is cell identity.
#[derive(Clone)]
pub struct HeapRef(Rc<HeapCell>);

impl HeapRef {
    #[inline]
    pub fn addr(&self) -> HeapAddr {
        self.0.addr
    }

    /// `*p`.
    pub fn load(&self) -> ExecResult<Value> {
        match &self.0.cell {
            Cell::Boxed(value) => Ok(value.borrow().clone()),
            Cell::Field { fields: data, index } | Cell::Elem { data, index } => data
                .borrow()
                .get(*index)
                .cloned()
                .ok_or_else(|| invalid_heap_address(self.0.addr.0).into()),
        }
    }

    /// `*p = value`. Structs are overwritten in place.
    pub fn store(&self, value: Value) -> ExecResult {
        let stored = match &self.0.cell {
            Cell::Boxed(slot) => {
                assign_in_place(&mut slot.borrow_mut(), value);
                true
            }
            Cell::Field { fields: data, index } | Cell::Elem { data, index } => {
                match data.borrow_mut().get_mut(*index) {
                    Some(slot) => {
                        assign_in_place(slot, value);
                        true
                    }
                    None => false,
                }
            }
        };
        if stored {
            Ok(())
        } else {
            Err(invalid_heap_address(self.0.addr.0).into())
        }
    }

    /// Contents of a boxed cell; `None` for field and element cells.
    pub(crate) fn boxed(&self) -> Option<Value> {
        match &self.0.cell {
            Cell::Boxed(value) => Some(value.borrow().clone()),
            _ => None,
        }
    }

    /// Overwrite a boxed cell; false for field and element cells.
    pub(crate) fn set_boxed(&self, value: Value) -> bool {
        match &self.0.cell {
            Cell::Boxed(slot) => {
                assign_in_place(&mut slot.borrow_mut(), value);
                true
            }
            _ => false,
        }
    }

    fn downgrade(&self) -> Weak<HeapCell> {
        Rc::downgrade(&self.0)
    }
}

impl PartialEq for HeapRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for HeapRef {}

impl fmt::Debug for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.addr)
    }
}

/// Cell allocator. Remembers field and element cells weakly so repeated
/// `&s.f` and `&a[i]` share one cell while any pointer to it is live.
pub struct Heap {
    next: u64,
    live: Rc<Counter<usize>>,
    slots: FxHashMap<(usize, usize), Weak<HeapCell>>,
    /// Slot-table size that triggers the next sweep of dead entries.
    sweep_at: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    const MIN_SWEEP: usize = 64;

    pub fn new() -> Self {
        Heap {
            next: 0,
            live: Rc::new(Counter::new(0)),
            slots: FxHashMap::default(),
            sweep_at: Self::MIN_SWEEP,
        }
    }

    /// Live cell count.
    pub fn len(&self) -> usize {
        self.live.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, cell: Cell) -> HeapRef {
        self.next += 1;
        self.live.set(self.live.get() + 1);
        HeapRef(Rc::new(HeapCell {
            addr: HeapAddr(self.next),
            cell,
            live: Rc::clone(&self.live),
        }))
    }

    /// Box a value in a fresh cell.
    pub fn alloc(&mut self, value: Value) -> HeapRef {
        self.push(Cell::Boxed(RefCell::new(value)))
    }

    /// Address of variable `name` bound in `scope`. `None` if `scope` does
    /// not bind it.
    pub fn addr_of_var(&mut self, scope: &ScopeRef, name: Name) -> Option<HeapRef> {
        scope
            .borrow_mut()
            .promote(name, |value| self.alloc(value))
    }

    /// Address of struct field `index`.
    pub fn addr_of_field(&mut self, fields: &Elements, index: usize) -> HeapRef {
        self.slot(fields, index, |fields| Cell::Field { fields, index })
    }

    /// Address of element `index` of a backing vector.
    pub fn addr_of_elem(&mut self, data: &Elements, index: usize) -> HeapRef {
        self.slot(data, index, |data| Cell::Elem { data, index })
    }

    fn slot(
        &mut self,
        data: &Elements,
        index: usize,
        make: impl FnOnce(Elements) -> Cell,
    ) -> HeapRef {
        let key = (Rc::as_ptr(data) as usize, index);
        if let Some(cell) = self.slots.get(&key).and_then(Weak::upgrade) {
            return HeapRef(cell);
        }
        let cell = self.push(make(Rc::clone(data)));
        self.slots.insert(key, cell.downgrade());
        if self.slots.len() >= self.sweep_at {
            self.slots.retain(|_, cell| cell.strong_count() > 0);
            self.sweep_at = (self.slots.len() * 2).max(Self::MIN_SWEEP);
        }
        cell
    }

    /// `*p`.
    pub fn load(&self, ptr: &HeapRef) -> ExecResult<Value> {
        ptr.load()
    }

    /// Load through a possibly-nil pointer.
    pub fn deref(&self, ptr: Option<&HeapRef>) -> ExecResult<Value> {
        match ptr {
            Some(ptr) => ptr.load(),
            None => Err(nil_dereference()),
        }
    }

    /// `*p = value`.
    pub fn store(&self, ptr: &HeapRef, value: Value) -> ExecResult {
        ptr.store(value)
    }
}

#[cfg(test)]
mod tests;
