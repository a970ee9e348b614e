//! End-to-end programs: build a package from a tree, run `main`, compare
//! what it printed.

mod control_flow;
mod panics;

use std::sync::Arc;

use gx_ir::{AstBuilder, Decl, Import, Stmt};

use crate::config::{BuildOptions, VmConfig};
use crate::errors::EvalError;
use crate::package::build_ast;
use crate::print_handler::buffer_handler;

/// Build and run a `main` package. Returns the output printed before `main`
/// finished or failed.
fn run_package(b: &AstBuilder, imports: Vec<Import>, decls: Vec<Decl>) -> (String, Result<(), EvalError>) {
    let out = buffer_handler();
    let vm = VmConfig::builder().print_handler(Arc::clone(&out)).build();
    let options = BuildOptions::new(b.interner().clone()).with_vm(vm);
    let package = b.package("main", imports, decls);
    let mut pkg = build_ast(&package, options).unwrap();
    let result = pkg.run_main();
    (out.output(), result)
}

/// Output of a program that must not fail.
fn run(b: &AstBuilder, decls: Vec<Decl>) -> String {
    let (output, result) = run_package(b, Vec::new(), decls);
    result.unwrap();
    output
}

/// Output of `func main() { body }`.
fn run_main(b: &AstBuilder, body: Vec<Stmt>) -> String {
    run(b, vec![b.main(body)])
}
