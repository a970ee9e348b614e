//! gx Eval - step-graph compiler and virtual machine.
//!
//! Executes typed syntax trees from `gx_ir` without generating native code.
//!
//! # Architecture
//!
//! - `builder`: walks each function body once and emits a linear,
//!   re-entrant [`FlowGraph`] of [`Step`]s. Structured control flow
//!   (`if`, `for`, `range`, `switch`, labels, `defer`) lowers to a handful of
//!   primitive steps.
//! - `vm`: runs flow graphs on a shared operand stack. One Rust call per
//!   source-level call; panics travel as [`Unwind::Panic`] through the Rust
//!   call chain and are caught by functions that registered deferred calls.
//! - `env` / `heap`: lexical scopes with pooled tables, and the address
//!   table behind `&x`, `new(T)` and pointer receivers.
//! - `ops`: operator families with a compile-time dispatch table and a
//!   runtime type-switch fallback.
//! - `types`: zero values, conversions, composite literals, `make`.
//! - `package`: front-end seam, loading, import resolution and package
//!   initialization.

mod builder;
mod builtins;
mod config;
mod env;
pub mod errors;
mod flow;
mod heap;
mod ops;
mod package;
mod print_handler;
mod registry;
pub mod types;
pub mod value;
mod vm;

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

use std::sync::Once;

pub use builder::{compile_function, CompileError};
pub use builtins::Builtin;
pub use config::{BuildOptions, LoaderConfig, VmBuilder, VmConfig, DEFAULT_MAX_CALL_DEPTH};
pub use env::{LocalScope, Scope, ScopePool, ScopeRef};
pub use errors::{
    EvalBacktrace, EvalError, EvalErrorKind, ExecResult, Unwind, BacktraceFrame,
};
pub use flow::{Arity, CompiledFunc, FlowGraph, FuncFlags, Step, StepId, StepOp};
pub use heap::{Heap, HeapAddr, HeapRef};
pub use ops::{evaluate_binary, evaluate_unary, OperatorTable, TypeKey};
pub use package::{
    build, build_ast, load, parse_source, BuildError, ExecutablePackage, FrontEnd, FrontEndError,
    LoadError, RawPackage, SourceFile,
};
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, BufferPrintHandler, PrintHandlerImpl,
    SharedPrintHandler, StdoutPrintHandler,
};
pub use registry::{HostPackage, SymbolRegistry};
pub use types::TypeTable;
pub use value::{FuncValue, HostFunc, IntValue, MapKey, StructLayout, StructValue, Value};
pub use vm::{RangeCursor, Vm};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enabled by `GX_LOG` (falling back to
/// `RUST_LOG`), e.g. `GX_LOG=gx_eval=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let directives = std::env::var("GX_LOG").or_else(|_| std::env::var("RUST_LOG"));
        if let Ok(directives) = directives {
            let filter = EnvFilter::new(directives);
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
