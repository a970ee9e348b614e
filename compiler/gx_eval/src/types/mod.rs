//! Declared types at run time.
//!
//! The [`TypeTable`] maps declared type names to their underlying types,
//! struct layouts and method sets. It answers the questions the VM asks
//! about static types: zero values, conversions, composite construction
//! and `make`.
//!
//! One table serves every package a VM loads, so declared type names share
//! a single namespace.

mod construct;
mod convert;

use std::rc::Rc;

use gx_ir::{InterfaceType, IntKind, Name, SharedInterner, StructType, Type};
use rustc_hash::FxHashMap;

use crate::env::ScopeRef;
use crate::flow::CompiledFunc;
use crate::value::{
    ArrayValue, Complex, MapValue, SliceValue, StructLayout, StructValue, Value,
};

/// A method attached to a declared type.
#[derive(Clone)]
pub struct MethodEntry {
    pub func: Rc<CompiledFunc>,
    /// Scope the method body closes over (its package scope).
    pub env: ScopeRef,
    /// Declared with a pointer receiver.
    pub pointer: bool,
}

/// One declared type.
pub struct TypeInfo {
    pub name: Name,
    pub underlying: Type,
    pub methods: FxHashMap<Name, MethodEntry>,
    layout: Option<Rc<StructLayout>>,
}

impl TypeInfo {
    pub fn layout(&self) -> Option<&Rc<StructLayout>> {
        self.layout.as_ref()
    }
}

/// Declared types by name.
pub struct TypeTable {
    types: FxHashMap<Name, TypeInfo>,
    interner: SharedInterner,
    error_name: Name,
    error_method: Name,
}

impl TypeTable {
    /// Table holding the predeclared `error` interface.
    pub fn new(interner: SharedInterner) -> Self {
        let error_name = interner.intern("error");
        let error_method = interner.intern("Error");
        let mut table = TypeTable {
            types: FxHashMap::default(),
            interner,
            error_name,
            error_method,
        };
        let error = Type::Interface(Rc::new(InterfaceType {
            methods: vec![error_method],
        }));
        table.declare(error_name, error);
        table
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Name of the predeclared `error` type.
    pub fn error_name(&self) -> Name {
        self.error_name
    }

    /// Name of the `Error` method.
    pub fn error_method(&self) -> Name {
        self.error_method
    }

    /// Register `name`; false if already declared.
    pub fn declare(&mut self, name: Name, underlying: Type) -> bool {
        if self.types.contains_key(&name) {
            return false;
        }
        self.types.insert(
            name,
            TypeInfo {
                name,
                underlying,
                methods: FxHashMap::default(),
                layout: None,
            },
        );
        self.refresh_layouts();
        true
    }

    /// Attach a method to a declared type; false if the type is unknown.
    pub fn add_method(&mut self, type_name: Name, method: Name, entry: MethodEntry) -> bool {
        match self.types.get_mut(&type_name) {
            Some(info) => {
                info.methods.insert(method, entry);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: Name) -> Option<&TypeInfo> {
        self.types.get(&name)
    }

    pub fn contains(&self, name: Name) -> bool {
        self.types.contains_key(&name)
    }

    /// Method declared directly on `type_name`.
    pub fn method(&self, type_name: Name, method: Name) -> Option<&MethodEntry> {
        self.types.get(&type_name)?.methods.get(&method)
    }

    /// Layout of a struct-typed declared type.
    pub fn layout(&self, type_name: Name) -> Option<Rc<StructLayout>> {
        self.types.get(&type_name)?.layout.clone()
    }

    /// Follow declared names down to a type literal.
    pub fn resolve<'a>(&'a self, ty: &'a Type) -> &'a Type {
        let mut current = ty;
        // Bounded to tolerate `type A B; type B A` from a broken front-end.
        for _ in 0..64 {
            match current {
                Type::Named(name) => match self.types.get(name) {
                    Some(info) => current = &info.underlying,
                    None => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// Whether `ty` is an interface (including `error`).
    pub fn is_interface(&self, ty: &Type) -> bool {
        matches!(self.resolve(ty), Type::Interface(_))
    }

    fn refresh_layouts(&mut self) {
        let pending: Vec<(Name, Rc<StructType>)> = self
            .types
            .values()
            .filter(|info| info.layout.is_none())
            .filter_map(|info| match self.resolve(&info.underlying) {
                Type::Struct(body) => Some((info.name, Rc::clone(body))),
                _ => None,
            })
            .collect();
        for (name, body) in pending {
            if let Some(info) = self.types.get_mut(&name) {
                info.layout = Some(Rc::new(StructLayout::new(&body)));
            }
        }
    }

    /// Zero value of `ty`.
    pub fn zero_value(&self, ty: &Type) -> Value {
        match ty {
            Type::Bool => Value::Bool(false),
            Type::Int(kind) => Value::int_of(*kind, 0),
            Type::Float32 => Value::Float32(0.0),
            Type::Float64 => Value::Float64(0.0),
            Type::Complex64 => Value::Complex64(Complex::default()),
            Type::Complex128 => Value::Complex128(Complex::default()),
            Type::String => Value::string(""),
            Type::Slice(_) => Value::Slice(SliceValue::nil()),
            Type::Array(len, elem) => {
                let len = usize::try_from(*len).unwrap_or(0);
                Value::Array(ArrayValue::new(
                    (0..len).map(|_| self.zero_value(elem)).collect(),
                ))
            }
            Type::Map(..) => Value::Map(MapValue::nil()),
            Type::Pointer(_) => Value::Pointer(None),
            Type::Chan(_) => Value::Chan(None),
            Type::Func(_) => Value::Func(None),
            Type::Interface(_) | Type::UntypedNil => Value::Nil,
            Type::Struct(body) => {
                let layout = Rc::new(StructLayout::new(body));
                self.zero_struct(layout, None)
            }
            Type::Named(name) => self.zero_named(*name),
        }
    }

    fn zero_named(&self, name: Name) -> Value {
        let Some(info) = self.types.get(&name) else {
            return Value::Nil;
        };
        if let Some(layout) = &info.layout {
            return self.zero_struct(Rc::clone(layout), Some(name));
        }
        match self.resolve(&info.underlying) {
            Type::Interface(_) => Value::Nil,
            underlying => Value::named(name, self.zero_value(underlying)),
        }
    }

    fn zero_struct(&self, layout: Rc<StructLayout>, type_name: Option<Name>) -> Value {
        let fields = (0..layout.len())
            .map(|i| layout.field_type(i).map_or(Value::Nil, |ty| self.zero_value(ty)))
            .collect();
        Value::Struct(StructValue::new(layout, fields, type_name))
    }

    /// Struct layout for a (possibly anonymous) struct type.
    pub fn struct_layout(&self, ty: &Type) -> Option<(Rc<StructLayout>, Option<Name>)> {
        match ty {
            Type::Named(name) => self.layout(*name).map(|layout| (layout, Some(*name))),
            Type::Struct(body) => Some((Rc::new(StructLayout::new(body)), None)),
            _ => None,
        }
    }

    /// Source-level name of a static type.
    pub fn type_name(&self, ty: &Type) -> String {
        ty.display(&self.interner).to_string()
    }

    /// Integer kind of a type whose underlying type is an integer.
    pub fn int_kind(&self, ty: &Type) -> Option<IntKind> {
        match self.resolve(ty) {
            Type::Int(kind) => Some(*kind),
            _ => None,
        }
    }
}
