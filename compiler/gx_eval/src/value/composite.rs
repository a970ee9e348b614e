//! Composite values: slices, arrays, maps, structs and named wrappers.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use gx_ir::{Name, StructType, Type};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

use super::{assign_in_place, zero_like, MapKey, Value};
use crate::env::ScopeRef;
use crate::errors::{nil_map_assignment, ExecResult};

/// Backing storage shared by slices, arrays and element pointers.
pub type Elements = Rc<RefCell<Vec<Value>>>;

// Slices

/// A window onto a shared backing vector.
///
/// Invariant: `data.len() >= offset + cap` and `len <= cap`. Elements past
/// `len` are real values (zeros or stale), so re-slicing up to `cap` and
/// in-place `append` both stay within the backing vector.
#[derive(Clone, Default)]
pub struct SliceValue {
    data: Option<Elements>,
    offset: usize,
    len: usize,
    cap: usize,
}

impl SliceValue {
    /// The nil slice.
    pub fn nil() -> Self {
        Self::default()
    }

    /// A slice owning `values`, with `len == cap`.
    pub fn from_vec(values: Vec<Value>) -> Self {
        let len = values.len();
        SliceValue {
            data: Some(Rc::new(RefCell::new(values))),
            offset: 0,
            len,
            cap: len,
        }
    }

    /// A slice over `backing[offset..offset + cap]` showing `len` elements.
    pub fn from_backing(data: Elements, offset: usize, len: usize, cap: usize) -> Self {
        SliceValue {
            data: Some(data),
            offset,
            len,
            cap,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.data.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Backing vector and this slice's offset into it.
    pub fn backing(&self) -> Option<(&Elements, usize)> {
        self.data.as_ref().map(|data| (data, self.offset))
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        if index >= self.len {
            return None;
        }
        let data = self.data.as_ref()?;
        let value = data.borrow().get(self.offset + index).cloned();
        value
    }

    /// Store into element `index`; false if out of range.
    pub fn set(&self, index: usize, value: Value) -> bool {
        let Some(data) = self.data.as_ref().filter(|_| index < self.len) else {
            return false;
        };
        let mut data = data.borrow_mut();
        match data.get_mut(self.offset + index) {
            Some(slot) => {
                assign_in_place(slot, value);
                true
            }
            None => false,
        }
    }

    /// The visible elements.
    pub fn to_vec(&self) -> Vec<Value> {
        match &self.data {
            Some(data) => data.borrow()[self.offset..self.offset + self.len].to_vec(),
            None => Vec::new(),
        }
    }

    /// `s[low:high:max]` with bounds already defaulted. `None` when out of
    /// range.
    pub fn reslice(&self, low: usize, high: usize, max: usize) -> Option<SliceValue> {
        if low > high || high > max || max > self.cap {
            return None;
        }
        match &self.data {
            Some(data) => Some(SliceValue {
                data: Some(Rc::clone(data)),
                offset: self.offset + low,
                len: high - low,
                cap: max - low,
            }),
            None => Some(SliceValue::nil()),
        }
    }

    /// `append(s, values...)`.
    ///
    /// Writes in place while capacity allows; otherwise copies into a new
    /// backing vector whose capacity at least doubles.
    #[must_use]
    pub fn append(&self, values: Vec<Value>) -> SliceValue {
        if values.is_empty() {
            return self.clone();
        }
        let needed = self.len + values.len();
        if let Some(data) = &self.data {
            if needed <= self.cap {
                let mut backing = data.borrow_mut();
                for (i, value) in values.into_iter().enumerate() {
                    backing[self.offset + self.len + i] = value;
                }
                return SliceValue {
                    data: Some(Rc::clone(data)),
                    offset: self.offset,
                    len: needed,
                    cap: self.cap,
                };
            }
        }

        let mut new_cap = self.cap.max(1);
        while new_cap < needed {
            new_cap *= 2;
        }
        let filler = zero_like(&values[0]);
        let mut backing = Vec::with_capacity(new_cap);
        backing.extend(self.to_vec());
        backing.extend(values);
        backing.resize(new_cap, filler);
        SliceValue {
            data: Some(Rc::new(RefCell::new(backing))),
            offset: 0,
            len: needed,
            cap: new_cap,
        }
    }

    /// Same backing vector and window.
    pub fn ptr_eq(&self, other: &SliceValue) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => {
                Rc::ptr_eq(a, b) && self.offset == other.offset && self.len == other.len
            }
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for SliceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return f.write_str("[]nil");
        }
        f.debug_list().entries(self.to_vec()).finish()
    }
}

// Arrays

/// Fixed-length array. Copied element-wise on assignment.
#[derive(Clone)]
pub struct ArrayValue(Elements);

impl ArrayValue {
    pub fn new(values: Vec<Value>) -> Self {
        ArrayValue(Rc::new(RefCell::new(values)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.0.borrow_mut().get_mut(index) {
            Some(slot) => {
                assign_in_place(slot, value);
                true
            }
            None => false,
        }
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// Shared element storage (for `a[i:j]` and `&a[i]`).
    pub fn elements(&self) -> &Elements {
        &self.0
    }

    /// Independent copy, recursively copying struct and array elements.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        ArrayValue::new(self.0.borrow().iter().map(Value::copy_value).collect())
    }

    pub fn ptr_eq(&self, other: &ArrayValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.borrow().iter()).finish()
    }
}

// Maps

/// Ordered entries keyed by the hashable projection of the key value.
pub type MapEntries = IndexMap<MapKey, (Value, Value), FxBuildHasher>;

/// Reference-semantics map; `None` is the nil map.
#[derive(Clone, Default)]
pub struct MapValue(Option<Rc<RefCell<MapEntries>>>);

impl MapValue {
    /// The nil map.
    pub fn nil() -> Self {
        MapValue(None)
    }

    /// An empty, writable map.
    pub fn new() -> Self {
        MapValue(Some(Rc::new(RefCell::new(MapEntries::default()))))
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_none()
    }

    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, |m| m.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &MapKey) -> Option<Value> {
        let entries = self.0.as_ref()?.borrow();
        entries.get(key).map(|(_, value)| value.clone())
    }

    /// Key and value stored under `key`.
    pub fn entry(&self, key: &MapKey) -> Option<(Value, Value)> {
        let entries = self.0.as_ref()?.borrow();
        entries.get(key).cloned()
    }

    /// Insert or overwrite; panics (source-level) on a nil map.
    pub fn insert(&self, key: MapKey, key_value: Value, value: Value) -> ExecResult {
        let Some(entries) = &self.0 else {
            return Err(nil_map_assignment());
        };
        entries.borrow_mut().insert(key, (key_value, value));
        Ok(())
    }

    /// Delete; a no-op on nil maps and missing keys.
    pub fn remove(&self, key: &MapKey) {
        if let Some(entries) = &self.0 {
            entries.borrow_mut().shift_remove(key);
        }
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.0 {
            entries.borrow_mut().clear();
        }
    }

    /// Keys in insertion order, detached from the live map.
    pub fn keys(&self) -> Vec<MapKey> {
        self.0
            .as_ref()
            .map(|m| m.borrow().keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Key/value pairs in insertion order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .as_ref()
            .map(|m| m.borrow().values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn ptr_eq(&self, other: &MapValue) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for MapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return f.write_str("map[]nil");
        }
        f.debug_map().entries(self.entries()).finish()
    }
}

// Structs

/// Field layout for O(1) field access.
#[derive(Debug)]
pub struct StructLayout {
    names: Vec<Name>,
    types: Vec<Type>,
    embedded: Vec<bool>,
    index: FxHashMap<Name, usize>,
}

impl StructLayout {
    /// Layout of a struct type body, in declaration order.
    pub fn new(body: &StructType) -> Self {
        let names: Vec<Name> = body.fields.iter().map(|f| f.name).collect();
        let index = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        StructLayout {
            index,
            types: body.fields.iter().map(|f| f.ty.clone()).collect(),
            embedded: body.fields.iter().map(|f| f.embedded).collect(),
            names,
        }
    }

    /// Index of a direct field.
    #[inline]
    pub fn get_index(&self, field: Name) -> Option<usize> {
        self.index.get(&field).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[Name] {
        &self.names
    }

    pub fn field_type(&self, index: usize) -> Option<&Type> {
        self.types.get(index)
    }

    /// Indices of embedded fields, in declaration order.
    pub fn embedded(&self) -> impl Iterator<Item = usize> + '_ {
        self.embedded
            .iter()
            .enumerate()
            .filter_map(|(i, embedded)| embedded.then_some(i))
    }
}

/// Struct instance.
///
/// `fields` is shared: cloning a `StructValue` aliases it. Value semantics
/// come from [`Value::copy_value`] at every copy point.
#[derive(Clone)]
pub struct StructValue {
    pub layout: Rc<StructLayout>,
    pub fields: Elements,
    /// Declared type name; `None` for anonymous struct types.
    pub type_name: Option<Name>,
}

impl StructValue {
    pub fn new(layout: Rc<StructLayout>, fields: Vec<Value>, type_name: Option<Name>) -> Self {
        StructValue {
            layout,
            fields: Rc::new(RefCell::new(fields)),
            type_name,
        }
    }

    /// Direct field by name.
    pub fn get(&self, field: Name) -> Option<Value> {
        let index = self.layout.get_index(field)?;
        self.get_index(index)
    }

    pub fn get_index(&self, index: usize) -> Option<Value> {
        self.fields.borrow().get(index).cloned()
    }

    /// Store into a field, overwriting nested structs in place.
    pub fn set_index(&self, index: usize, value: Value) -> bool {
        match self.fields.borrow_mut().get_mut(index) {
            Some(slot) => {
                assign_in_place(slot, value);
                true
            }
            None => false,
        }
    }

    /// Independent copy.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        let fields = self.fields.borrow().iter().map(Value::copy_value).collect();
        StructValue::new(Rc::clone(&self.layout), fields, self.type_name)
    }

    pub fn ptr_eq(&self, other: &StructValue) -> bool {
        Rc::ptr_eq(&self.fields, &other.fields)
    }
}

impl fmt::Debug for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Struct");
        for (name, value) in self.layout.names().iter().zip(self.fields.borrow().iter()) {
            s.field(&format!("{name:?}"), value);
        }
        s.finish()
    }
}

/// Value of a declared non-struct type (`type Celsius float64`).
#[derive(Clone, Debug)]
pub struct NamedValue {
    pub type_name: Name,
    pub inner: Value,
}

/// Error value produced by host packages and runtime faults.
#[derive(Clone, Debug)]
pub struct ErrorValue {
    pub message: Rc<str>,
    /// A runtime fault (`runtime error: ...`) rather than a program error.
    pub runtime: bool,
}

impl ErrorValue {
    pub fn new(message: impl Into<Rc<str>>) -> Self {
        ErrorValue {
            message: message.into(),
            runtime: false,
        }
    }

    pub fn runtime(message: String) -> Self {
        ErrorValue {
            message: message.into(),
            runtime: true,
        }
    }
}

/// Members of an imported package.
pub enum PackageMembers {
    /// Host package from the symbol registry.
    Host(FxHashMap<Name, Value>),
    /// Source package: its package-level scope.
    Source(ScopeRef),
}

/// Imported package bound to a name in the importing package.
pub struct PackageHandle {
    pub name: Rc<str>,
    pub members: PackageMembers,
}

impl PackageHandle {
    /// Look up an exported member.
    pub fn member(&self, name: Name) -> Option<Value> {
        match &self.members {
            PackageMembers::Host(members) => members.get(&name).cloned(),
            PackageMembers::Source(scope) => scope.borrow().lookup(name),
        }
    }
}

impl fmt::Debug for PackageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "package {}", self.name)
    }
}
