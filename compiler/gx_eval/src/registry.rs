//! Host packages.
//!
//! A [`SymbolRegistry`] maps import paths to [`HostPackage`]s: functions
//! implemented in Rust plus constants. Imports are resolved against the
//! registry before the import root is searched. The registry is an
//! explicit object handed to each VM through its configuration; nothing
//! is registered globally.

mod errors;
mod fmt;
mod math;
mod strings;

use std::rc::Rc;

use gx_ir::StringInterner;
use rustc_hash::FxHashMap;

use crate::errors::{arity_mismatch, invalid_operation, ExecResult};
use crate::value::{FuncValue, HostFunc, PackageHandle, PackageMembers, Value};
use crate::vm::Vm;

/// A package implemented by the embedder.
#[derive(Clone)]
pub struct HostPackage {
    name: String,
    members: Vec<(String, Value)>,
}

impl HostPackage {
    /// Empty package; `name` is the identifier importers bind it to.
    pub fn new(name: &str) -> Self {
        HostPackage {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    /// Add a function.
    #[must_use]
    pub fn with_func(
        mut self,
        name: &str,
        func: impl Fn(&mut Vm, Vec<Value>) -> ExecResult<Vec<Value>> + 'static,
    ) -> Self {
        let qualified = format!("{}.{name}", self.name);
        let value = Value::Func(Some(FuncValue::Host(HostFunc::new(&qualified, func))));
        self.members.push((name.to_string(), value));
        self
    }

    /// Add a constant (or any other value).
    #[must_use]
    pub fn with_const(mut self, name: &str, value: Value) -> Self {
        self.members.push((name.to_string(), value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member names in registration order.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(name, _)| name.as_str())
    }

    /// Handle with members keyed by interned name.
    pub(crate) fn handle(&self, interner: &StringInterner) -> PackageHandle {
        let members = self
            .members
            .iter()
            .map(|(name, value)| (interner.intern(name), value.clone()))
            .collect();
        PackageHandle {
            name: Rc::from(self.name.as_str()),
            members: PackageMembers::Host(members),
        }
    }
}

/// Host packages by import path.
#[derive(Clone, Default)]
pub struct SymbolRegistry {
    packages: FxHashMap<String, HostPackage>,
}

impl SymbolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `fmt`, `strings`, `math` and `errors`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("fmt", fmt::package());
        registry.register("strings", strings::package());
        registry.register("math", math::package());
        registry.register("errors", errors::package());
        registry
    }

    /// Register `package` under `path`, replacing any previous one.
    pub fn register(&mut self, path: &str, package: HostPackage) {
        self.packages.insert(path.to_string(), package);
    }

    pub fn get(&self, path: &str) -> Option<&HostPackage> {
        self.packages.get(path)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

// Argument helpers shared by the default packages.

fn expect_args(func: &str, args: &[Value], count: usize) -> ExecResult {
    if args.len() == count {
        Ok(())
    } else {
        Err(arity_mismatch(func, count, args.len()).into())
    }
}

fn str_arg<'a>(func: &str, args: &'a [Value], index: usize) -> ExecResult<&'a str> {
    let arg = args
        .get(index)
        .ok_or_else(|| arity_mismatch(func, index + 1, args.len()))?;
    arg.as_str()
        .ok_or_else(|| invalid_operation(func, arg.kind_name()).into())
}

fn float_arg(func: &str, args: &[Value], index: usize) -> ExecResult<f64> {
    let arg = args
        .get(index)
        .ok_or_else(|| arity_mismatch(func, index + 1, args.len()))?;
    match arg.unwrap_named() {
        Value::Float64(f) => Ok(*f),
        Value::Float32(f) => Ok(f64::from(*f)),
        Value::Int(i) => Ok(i.as_f64()),
        other => Err(invalid_operation(func, other.kind_name()).into()),
    }
}

fn int_arg(func: &str, args: &[Value], index: usize) -> ExecResult<i64> {
    let arg = args
        .get(index)
        .ok_or_else(|| arity_mismatch(func, index + 1, args.len()))?;
    arg.as_int()
        .map(|i| i.as_i64())
        .ok_or_else(|| invalid_operation(func, arg.kind_name()).into())
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
