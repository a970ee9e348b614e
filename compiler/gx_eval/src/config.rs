//! VM, build and loader configuration.

use std::path::PathBuf;
use std::rc::Rc;

use gx_ir::SharedInterner;

use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::registry::SymbolRegistry;

/// Default bound on nested source-level calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Settings for one [`Vm`](crate::Vm).
#[derive(Clone)]
pub struct VmConfig {
    /// Destination of `print`, `println` and the `fmt` printers.
    pub print_handler: SharedPrintHandler,
    /// Host packages importable by name.
    pub registry: Rc<SymbolRegistry>,
    /// Deeper calls fail with a stack-overflow error.
    pub max_call_depth: usize,
    /// Emit a `trace` event for every executed step.
    pub trace_steps: bool,
}

impl VmConfig {
    pub fn builder() -> VmBuilder {
        VmBuilder::new()
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        VmBuilder::new().build()
    }
}

/// Builder for [`VmConfig`].
#[derive(Default)]
pub struct VmBuilder {
    print_handler: Option<SharedPrintHandler>,
    registry: Option<Rc<SymbolRegistry>>,
    max_call_depth: Option<usize>,
    trace_steps: bool,
}

impl VmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the print handler. Defaults to stdout.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// Set the host package registry. Defaults to
    /// [`SymbolRegistry::with_defaults`].
    #[must_use]
    pub fn registry(mut self, registry: SymbolRegistry) -> Self {
        self.registry = Some(Rc::new(registry));
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn trace_steps(mut self, enabled: bool) -> Self {
        self.trace_steps = enabled;
        self
    }

    pub fn build(self) -> VmConfig {
        VmConfig {
            print_handler: self.print_handler.unwrap_or_else(stdout_handler),
            registry: self
                .registry
                .unwrap_or_else(|| Rc::new(SymbolRegistry::with_defaults())),
            max_call_depth: self.max_call_depth.unwrap_or(DEFAULT_MAX_CALL_DEPTH),
            trace_steps: self.trace_steps,
        }
    }
}

/// Options for turning a syntax tree into an executable package.
#[derive(Clone)]
pub struct BuildOptions {
    pub vm: VmConfig,
    /// Directory whose subdirectories satisfy source imports.
    pub import_root: Option<PathBuf>,
    /// Interner the syntax tree's names were created in.
    pub interner: SharedInterner,
    pub loader: LoaderConfig,
}

impl BuildOptions {
    pub fn new(interner: SharedInterner) -> Self {
        BuildOptions {
            vm: VmConfig::default(),
            import_root: None,
            interner,
            loader: LoaderConfig::default(),
        }
    }

    #[must_use]
    pub fn with_vm(mut self, vm: VmConfig) -> Self {
        self.vm = vm;
        self
    }

    #[must_use]
    pub fn with_import_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.import_root = Some(root.into());
        self
    }
}

/// Source file discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Extension (without the dot) of source files.
    pub extension: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            extension: "gx".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print_handler::buffer_handler;

    #[test]
    fn builder_defaults() {
        let config = VmConfig::default();
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert!(!config.trace_steps);
        assert!(config.registry.get("fmt").is_some());
    }

    #[test]
    fn builder_overrides() {
        let handler = buffer_handler();
        let config = VmConfig::builder()
            .print_handler(handler.clone())
            .registry(SymbolRegistry::new())
            .max_call_depth(8)
            .trace_steps(true)
            .build();
        assert_eq!(config.max_call_depth, 8);
        assert!(config.trace_steps);
        assert!(config.registry.get("fmt").is_none());
        config.print_handler.write("x");
        assert_eq!(handler.output(), "x");
    }

    #[test]
    fn loader_extension_defaults_to_gx() {
        assert_eq!(LoaderConfig::default().extension, "gx");
    }
}
