//! Linking: import resolution, declaration, compilation and package
//! initialization.
//!
//! Imported source packages are linked recursively into the same VM, so
//! every package shares one type table and one heap.

use std::rc::Rc;

use gx_ir::{Decl, Expr, FuncDecl, Name, Package, Receiver, Type};
use indexmap::IndexMap;

use super::{load, BuildError, ExecutablePackage, FrontEnd};
use crate::builder::{
    compile_const_unit, compile_function, compile_var_unit, expand_const_block, initializer_type,
    unsupported, CompileError, Compiler,
};
use crate::config::BuildOptions;
use crate::env::ScopeRef;
use crate::errors::Unwind;
use crate::flow::CompiledFunc;
use crate::types::MethodEntry;
use crate::value::{FuncValue, PackageHandle, PackageMembers, Value};
use crate::vm::Vm;

/// Compiled declarations of one package, before anything runs.
#[derive(Default)]
struct Compiled {
    funcs: Vec<(Name, Rc<CompiledFunc>)>,
    methods: Vec<(Receiver, Name, Rc<CompiledFunc>)>,
    inits: Vec<Rc<CompiledFunc>>,
    /// Package-level `var` specs and `const` lines, in source order.
    units: Vec<Rc<CompiledFunc>>,
}

pub(super) struct Linker<'f> {
    vm: Vm,
    options: BuildOptions,
    front_end: Option<&'f dyn FrontEnd>,
    /// Resolved imports by path.
    loaded: IndexMap<String, Rc<PackageHandle>>,
    /// Source imports currently being linked, outermost first.
    linking: Vec<String>,
}

impl<'f> Linker<'f> {
    pub(super) fn new(options: BuildOptions, front_end: Option<&'f dyn FrontEnd>) -> Self {
        let vm = Vm::new(options.vm.clone(), options.interner.clone());
        Linker {
            vm,
            options,
            front_end,
            loaded: IndexMap::new(),
            linking: Vec::new(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(package = self.options.interner.lookup(package.name)))]
    pub(super) fn finish(mut self, package: &Package) -> Result<ExecutablePackage, BuildError> {
        let scope = self.link(package)?;
        tracing::debug!(imports = self.loaded.len(), "package ready");
        Ok(ExecutablePackage {
            vm: self.vm,
            scope,
            name: self.options.interner.lookup(package.name).to_string(),
        })
    }

    /// Link one package and return its initialized package scope.
    fn link(&mut self, package: &Package) -> Result<ScopeRef, BuildError> {
        let scope = self.vm.new_root_scope();
        let mut import_names = Vec::with_capacity(package.imports.len());
        for import in &package.imports {
            let handle = self.resolve_import(&import.path)?;
            let name = match import.alias {
                Some(alias) => alias,
                None => self.options.interner.intern(import.default_name()),
            };
            if self.options.interner.lookup(name) == "_" {
                continue;
            }
            scope.borrow_mut().define(name, Value::Package(handle));
            import_names.push(name);
        }

        for decl in &package.decls {
            if let Decl::Type(spec) = decl {
                if !self.vm.types_mut().declare(spec.name, spec.ty.clone()) {
                    return Err(CompileError::DuplicateType {
                        name: self.options.interner.lookup(spec.name).to_string(),
                    }
                    .into());
                }
            }
        }

        let compiled = self.compile(package, &import_names)?;
        self.declare_funcs(&scope, &compiled)?;
        self.initialize(&scope, &compiled.units)?;
        for init in &compiled.inits {
            let callee = Value::Func(Some(FuncValue::closure(Rc::clone(init), scope.clone())));
            self.vm
                .call_function(&callee, Vec::new())
                .map_err(BuildError::Init)?;
        }
        Ok(scope)
    }

    fn resolve_import(&mut self, path: &str) -> Result<Rc<PackageHandle>, BuildError> {
        if let Some(handle) = self.loaded.get(path) {
            return Ok(Rc::clone(handle));
        }
        if self.linking.iter().any(|p| p == path) {
            return Err(BuildError::ImportCycle {
                path: path.to_string(),
            });
        }
        let host = self
            .vm
            .config()
            .registry
            .get(path)
            .map(|host| host.handle(&self.options.interner));
        let handle = match host {
            Some(handle) => Rc::new(handle),
            None => self.link_source_import(path)?,
        };
        tracing::debug!(path, "resolved import");
        self.loaded.insert(path.to_string(), Rc::clone(&handle));
        Ok(handle)
    }

    fn link_source_import(&mut self, path: &str) -> Result<Rc<PackageHandle>, BuildError> {
        let unknown = || BuildError::UnknownImport {
            path: path.to_string(),
        };
        let (Some(root), Some(front_end)) = (&self.options.import_root, self.front_end) else {
            return Err(unknown());
        };
        let dir = root.join(path);
        if !dir.is_dir() {
            return Err(unknown());
        }
        let raw = load(&dir, &self.options.loader)?;
        let package = front_end.parse(&raw.files, &self.options.interner)?;

        self.linking.push(path.to_string());
        let linked = self.link(&package);
        self.linking.pop();
        Ok(Rc::new(PackageHandle {
            name: Rc::from(self.options.interner.lookup(package.name)),
            members: PackageMembers::Source(linked?),
        }))
    }

    /// Compile every function, method and initializer of `package`.
    fn compile(&mut self, package: &Package, import_names: &[Name]) -> Result<Compiled, BuildError> {
        let interner = self.options.interner.clone();
        let operators = Rc::clone(&self.vm.operators);
        let init = interner.intern("init");
        let mut cx = Compiler::new(&interner, self.vm.types_mut(), &operators);

        for &name in import_names {
            cx.declare_import(name);
        }
        let func_decls: Vec<&FuncDecl> = package
            .decls
            .iter()
            .filter_map(|decl| match decl {
                Decl::Func(func) => Some(func),
                _ => None,
            })
            .collect();
        for func in &func_decls {
            match &func.recv {
                Some(recv) => cx.declare_method(recv, func.name, &func.sig),
                None if func.name == init => {}
                None => cx.declare_func(func.name, &func.sig),
            }
        }
        for decl in &package.decls {
            match decl {
                Decl::Var(spec) => declare_globals(&mut cx, &spec.names, spec.ty.as_ref(), &spec.values),
                Decl::Const(block) => {
                    for entry in expand_const_block(block) {
                        declare_globals(&mut cx, entry.names, entry.ty, entry.values);
                    }
                }
                Decl::Type(_) | Decl::Func(_) => {}
            }
        }

        let mut compiled = Compiled::default();
        for func in func_decls {
            let body = compile_function(&mut cx, func)?;
            match &func.recv {
                Some(recv) => compiled.methods.push((recv.clone(), func.name, body)),
                None if func.name == init => compiled.inits.push(body),
                None => compiled.funcs.push((func.name, body)),
            }
        }
        for decl in &package.decls {
            match decl {
                Decl::Var(spec) => compiled.units.push(compile_var_unit(&mut cx, spec)?),
                Decl::Const(block) => {
                    for entry in expand_const_block(block) {
                        compiled.units.push(compile_const_unit(&mut cx, &entry)?);
                    }
                }
                Decl::Type(_) | Decl::Func(_) => {}
            }
        }
        Ok(compiled)
    }

    fn declare_funcs(&mut self, scope: &ScopeRef, compiled: &Compiled) -> Result<(), BuildError> {
        for (name, func) in &compiled.funcs {
            let value = Value::Func(Some(FuncValue::closure(Rc::clone(func), scope.clone())));
            scope.borrow_mut().define(*name, value);
        }
        for (recv, name, func) in &compiled.methods {
            let entry = MethodEntry {
                func: Rc::clone(func),
                env: scope.clone(),
                pointer: recv.pointer,
            };
            if !self.vm.types_mut().add_method(recv.type_name, *name, entry) {
                let type_name = self.options.interner.lookup(recv.type_name);
                return Err(unsupported(format!("method on undeclared type {type_name}"), func.span).into());
            }
        }
        Ok(())
    }

    /// Run package-level initializers until every one has run or none can
    /// make progress.
    fn initialize(&mut self, scope: &ScopeRef, units: &[Rc<CompiledFunc>]) -> Result<(), BuildError> {
        self.vm.set_init_mode(true);
        let outcome = self.run_units(scope, units);
        self.vm.set_init_mode(false);
        outcome
    }

    fn run_units(&mut self, scope: &ScopeRef, units: &[Rc<CompiledFunc>]) -> Result<(), BuildError> {
        let mut pending: Vec<&Rc<CompiledFunc>> = units.iter().collect();
        let mut pass = 0_usize;
        while !pending.is_empty() {
            pass += 1;
            let before = pending.len();
            let mut blocked = Vec::new();
            let mut missing: Vec<Name> = Vec::new();
            for unit in pending {
                match self.vm.exec_unit(unit, scope) {
                    Ok(()) => {}
                    Err(Unwind::Undeclared(name)) => {
                        blocked.push(unit);
                        if !missing.contains(&name) {
                            missing.push(name);
                        }
                    }
                    Err(unwind) => return Err(BuildError::Init(self.vm.to_eval_error(unwind))),
                }
            }
            tracing::debug!(pass, ran = before - blocked.len(), blocked = blocked.len(), "init pass");
            if blocked.len() == before {
                return Err(self.undefined(&missing));
            }
            pending = blocked;
        }
        Ok(())
    }

    fn undefined(&self, missing: &[Name]) -> BuildError {
        let names = missing
            .iter()
            .map(|name| self.options.interner.lookup(*name).to_string())
            .collect();
        BuildError::Undefined { names }
    }
}

/// Record the static types of package-level names for the builder.
fn declare_globals(
    cx: &mut Compiler<'_>,
    names: &[Name],
    ty: Option<&Type>,
    values: &[Expr],
) {
    let paired = values.len() == names.len();
    for (i, &name) in names.iter().enumerate() {
        let static_ty = match ty {
            Some(ty) => Some(ty.clone()),
            None if paired => values.get(i).and_then(initializer_type),
            None => None,
        };
        cx.declare_global(name, static_ty);
    }
}
