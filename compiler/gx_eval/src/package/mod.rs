//! Packages: the front-end seam, source loading, import resolution and
//! initialization.
//!
//! Parsing and type checking happen outside this crate, behind the
//! [`FrontEnd`] trait. A build takes a [`RawPackage`] (or an already parsed
//! tree), links its imports, compiles every declaration and runs package
//! initialization, yielding an [`ExecutablePackage`] whose functions the
//! embedder can call.

mod link;
mod loader;

use std::path::PathBuf;

use gx_ir::{Package, SharedInterner, Span};

use crate::builder::CompileError;
use crate::config::BuildOptions;
use crate::env::ScopeRef;
use crate::errors::{undefined_function, EvalError};
use crate::value::Value;
use crate::vm::Vm;

pub use loader::{load, LoadError};

/// One source file of a package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

/// Source files of one package directory, not yet parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawPackage {
    pub dir: PathBuf,
    /// Sorted by path.
    pub files: Vec<SourceFile>,
}

/// Parse or type error reported by a front-end.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FrontEndError {
    pub message: String,
    pub span: Option<Span>,
    pub file: Option<PathBuf>,
}

impl FrontEndError {
    pub fn new(message: impl Into<String>) -> Self {
        FrontEndError {
            message: message.into(),
            span: None,
            file: None,
        }
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    #[must_use]
    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Parser and type checker producing typed trees.
pub trait FrontEnd {
    /// Parse and check the files of one package. Names are interned in
    /// `interner`.
    fn parse(
        &self,
        files: &[SourceFile],
        interner: &SharedInterner,
    ) -> Result<Package, FrontEndError>;
}

/// Failure to turn a package into an executable one.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("front-end: {0}")]
    FrontEnd(#[from] FrontEndError),
    #[error("compile: {0}")]
    Compile(#[from] CompileError),
    #[error("cannot find package {path:?}")]
    UnknownImport { path: String },
    #[error("import cycle through {path:?}")]
    ImportCycle { path: String },
    #[error("undefined: {}", names.join(", "))]
    Undefined { names: Vec<String> },
    #[error("package initialization failed: {0}")]
    Init(EvalError),
}

/// A linked, initialized package ready to run.
pub struct ExecutablePackage {
    vm: Vm,
    scope: ScopeRef,
    name: String,
}

impl ExecutablePackage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }

    /// Current value of a package-level name.
    pub fn global(&self, name: &str) -> Option<Value> {
        let name = self.vm.interner().get(name)?;
        self.scope.borrow().get_local(name)
    }

    /// Call the package-level function `name`.
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Vec<Value>, EvalError> {
        let callee = self
            .global(name)
            .ok_or_else(|| undefined_function(name))?;
        tracing::debug!(package = %self.name, func = name, "call");
        self.vm.call_function(&callee, args)
    }

    /// Run `main`.
    pub fn run_main(&mut self) -> Result<(), EvalError> {
        self.call_function("main", Vec::new()).map(drop)
    }

    /// Everything printed so far, for buffering print handlers.
    pub fn output(&self) -> String {
        self.vm.print_handler().output()
    }
}

impl std::fmt::Debug for ExecutablePackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutablePackage")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Parse, link, compile and initialize a loaded package.
pub fn build(
    raw: &RawPackage,
    front_end: &dyn FrontEnd,
    options: BuildOptions,
) -> Result<ExecutablePackage, BuildError> {
    let package = front_end
        .parse(&raw.files, &options.interner)
        .map_err(|err| match err.file {
            Some(_) => err,
            None => match raw.files.first() {
                Some(file) if raw.files.len() == 1 => err.in_file(file.path.clone()),
                _ => err,
            },
        })?;
    link::Linker::new(options, Some(front_end)).finish(&package)
}

/// Link, compile and initialize an already parsed tree. Source imports
/// need a front-end and are reported as unknown.
pub fn build_ast(package: &Package, options: BuildOptions) -> Result<ExecutablePackage, BuildError> {
    link::Linker::new(options, None).finish(package)
}

/// Build a single in-memory source file.
pub fn parse_source(
    text: &str,
    front_end: &dyn FrontEnd,
    options: BuildOptions,
) -> Result<ExecutablePackage, BuildError> {
    let raw = RawPackage {
        dir: PathBuf::from("."),
        files: vec![SourceFile {
            path: PathBuf::from("main.gx"),
            text: text.to_string(),
        }],
    };
    build(&raw, front_end, options)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
