//! Static type descriptors.
//!
//! These are the answers of the front-end's `typeOf(expr)` facility. The
//! graph builder uses them to pick operator implementations, range cursor
//! kinds, zero values and composite-literal layouts ahead of time. A node
//! whose type the front-end left unset is handled by runtime dispatch.

use std::fmt;
use std::rc::Rc;

use crate::{Name, StringInterner};

/// Fixed-width integer kinds.
///
/// `int`, `uint` and `uintptr` are 64-bit. `byte` and `rune` are aliases the
/// front-end resolves to `Uint8` and `Int32`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
}

impl IntKind {
    /// Every kind, signed first.
    pub const ALL: [IntKind; 11] = [
        IntKind::Int,
        IntKind::Int8,
        IntKind::Int16,
        IntKind::Int32,
        IntKind::Int64,
        IntKind::Uint,
        IntKind::Uint8,
        IntKind::Uint16,
        IntKind::Uint32,
        IntKind::Uint64,
        IntKind::Uintptr,
    ];

    /// Width in bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            IntKind::Int8 | IntKind::Uint8 => 8,
            IntKind::Int16 | IntKind::Uint16 => 16,
            IntKind::Int32 | IntKind::Uint32 => 32,
            IntKind::Int
            | IntKind::Int64
            | IntKind::Uint
            | IntKind::Uint64
            | IntKind::Uintptr => 64,
        }
    }

    /// Whether values of this kind are two's complement signed.
    #[inline]
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            IntKind::Int | IntKind::Int8 | IntKind::Int16 | IntKind::Int32 | IntKind::Int64
        )
    }

    /// Source-level type name.
    pub const fn name(self) -> &'static str {
        match self {
            IntKind::Int => "int",
            IntKind::Int8 => "int8",
            IntKind::Int16 => "int16",
            IntKind::Int32 => "int32",
            IntKind::Int64 => "int64",
            IntKind::Uint => "uint",
            IntKind::Uint8 => "uint8",
            IntKind::Uint16 => "uint16",
            IntKind::Uint32 => "uint32",
            IntKind::Uint64 => "uint64",
            IntKind::Uintptr => "uintptr",
        }
    }
}

/// A struct field declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: Name,
    pub ty: Type,
    /// Embedded fields promote their fields and methods.
    pub embedded: bool,
}

/// Struct type body.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct StructType {
    pub fields: Vec<FieldDef>,
}

/// Function signature type.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FuncType {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    /// The last parameter is `...T`; `params` holds `T`.
    pub variadic: bool,
}

/// Interface type: a method set. Empty means `any`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct InterfaceType {
    pub methods: Vec<Name>,
}

/// Static type of a node.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Bool,
    Int(IntKind),
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    Slice(Box<Type>),
    Array(u64, Box<Type>),
    Map(Box<Type>, Box<Type>),
    Pointer(Box<Type>),
    Chan(Box<Type>),
    Func(Rc<FuncType>),
    Struct(Rc<StructType>),
    Interface(Rc<InterfaceType>),
    /// A declared type, resolved through the package type table.
    Named(Name),
    /// The type of the untyped `nil` literal.
    UntypedNil,
}

impl Type {
    /// `int`.
    pub const INT: Type = Type::Int(IntKind::Int);

    /// `any` (the empty interface).
    pub fn any() -> Type {
        Type::Interface(Rc::new(InterfaceType::default()))
    }

    /// `[]elem`.
    pub fn slice(elem: Type) -> Type {
        Type::Slice(Box::new(elem))
    }

    /// `[len]elem`.
    pub fn array(len: u64, elem: Type) -> Type {
        Type::Array(len, Box::new(elem))
    }

    /// `map[key]value`.
    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    /// `*elem`.
    pub fn pointer(elem: Type) -> Type {
        Type::Pointer(Box::new(elem))
    }

    /// `chan elem`.
    pub fn chan(elem: Type) -> Type {
        Type::Chan(Box::new(elem))
    }

    /// Anonymous struct type.
    pub fn structure(fields: Vec<FieldDef>) -> Type {
        Type::Struct(Rc::new(StructType { fields }))
    }

    /// Function type.
    pub fn func(params: Vec<Type>, results: Vec<Type>, variadic: bool) -> Type {
        Type::Func(Rc::new(FuncType {
            params,
            results,
            variadic,
        }))
    }

    /// Whether this is a predeclared boolean, numeric or string type.
    pub fn is_basic(&self) -> bool {
        matches!(
            self,
            Type::Bool
                | Type::Int(_)
                | Type::Float32
                | Type::Float64
                | Type::Complex64
                | Type::Complex128
                | Type::String
        )
    }

    /// Whether this is an interface type.
    pub fn is_interface(&self) -> bool {
        matches!(self, Type::Interface(_))
    }

    /// Element type of slices, arrays, pointers and channels.
    pub fn elem(&self) -> Option<&Type> {
        match self {
            Type::Slice(elem) | Type::Array(_, elem) | Type::Pointer(elem) | Type::Chan(elem) => {
                Some(elem)
            }
            Type::Map(_, value) => Some(value),
            _ => None,
        }
    }

    /// Render with names resolved.
    pub fn display<'a>(&'a self, interner: &'a StringInterner) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, interner }
    }
}

/// `Display` adapter for [`Type`].
pub struct TypeDisplay<'a> {
    ty: &'a Type,
    interner: &'a StringInterner,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = self.interner;
        match self.ty {
            Type::Bool => f.write_str("bool"),
            Type::Int(kind) => f.write_str(kind.name()),
            Type::Float32 => f.write_str("float32"),
            Type::Float64 => f.write_str("float64"),
            Type::Complex64 => f.write_str("complex64"),
            Type::Complex128 => f.write_str("complex128"),
            Type::String => f.write_str("string"),
            Type::Slice(elem) => write!(f, "[]{}", elem.display(interner)),
            Type::Array(len, elem) => write!(f, "[{len}]{}", elem.display(interner)),
            Type::Map(key, value) => write!(
                f,
                "map[{}]{}",
                key.display(interner),
                value.display(interner)
            ),
            Type::Pointer(elem) => write!(f, "*{}", elem.display(interner)),
            Type::Chan(elem) => write!(f, "chan {}", elem.display(interner)),
            Type::Func(sig) => {
                f.write_str("func(")?;
                for (i, param) in sig.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if sig.variadic && i + 1 == sig.params.len() {
                        f.write_str("...")?;
                    }
                    write!(f, "{}", param.display(interner))?;
                }
                f.write_str(")")?;
                match sig.results.as_slice() {
                    [] => Ok(()),
                    [single] => write!(f, " {}", single.display(interner)),
                    many => {
                        f.write_str(" (")?;
                        for (i, result) in many.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{}", result.display(interner))?;
                        }
                        f.write_str(")")
                    }
                }
            }
            Type::Struct(body) => {
                f.write_str("struct {")?;
                for (i, field) in body.fields.iter().enumerate() {
                    f.write_str(if i == 0 { " " } else { "; " })?;
                    write!(
                        f,
                        "{} {}",
                        interner.lookup(field.name),
                        field.ty.display(interner)
                    )?;
                }
                if body.fields.is_empty() {
                    f.write_str("}")
                } else {
                    f.write_str(" }")
                }
            }
            Type::Interface(iface) if iface.methods.is_empty() => f.write_str("interface {}"),
            Type::Interface(iface) => {
                f.write_str("interface {")?;
                for method in &iface.methods {
                    write!(f, " {}()", interner.lookup(*method))?;
                }
                f.write_str(" }")
            }
            Type::Named(name) => f.write_str(interner.lookup(*name)),
            Type::UntypedNil => f.write_str("nil"),
        }
    }
}

#[cfg(test)]
mod tests;
