use std::fs;
use std::path::Path;
use std::sync::Arc;

use gx_ir::{AstBuilder, BinaryOp, Decl, Import, Package, SharedInterner, Type};
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

use super::{build_ast, load, parse_source, BuildError, FrontEnd, FrontEndError, LoadError, SourceFile};
use crate::config::{BuildOptions, LoaderConfig, VmConfig};
use crate::errors::EvalErrorKind;
use crate::print_handler::{buffer_handler, SharedPrintHandler};
use crate::value::Value;

/// Front-end that maps a file's text to a canned tree.
#[derive(Default)]
struct ScriptedFrontEnd {
    scripts: FxHashMap<&'static str, fn(&AstBuilder) -> Package>,
}

impl ScriptedFrontEnd {
    fn with(mut self, key: &'static str, script: fn(&AstBuilder) -> Package) -> Self {
        self.scripts.insert(key, script);
        self
    }
}

impl FrontEnd for ScriptedFrontEnd {
    fn parse(&self, files: &[SourceFile], interner: &SharedInterner) -> Result<Package, FrontEndError> {
        let key = files.first().map(|f| f.text.trim()).unwrap_or_default();
        let script = self
            .scripts
            .get(key)
            .ok_or_else(|| FrontEndError::new(format!("unexpected source {key:?}")))?;
        Ok(script(&AstBuilder::with_interner(interner.clone())))
    }
}

fn options(interner: &SharedInterner, out: &SharedPrintHandler) -> BuildOptions {
    let vm = VmConfig::builder().print_handler(Arc::clone(out)).build();
    BuildOptions::new(interner.clone()).with_vm(vm)
}

fn write_package(root: &Path, path: &str, text: &str) {
    let dir = root.join(path);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{path}.gx")), text).unwrap();
}

fn var(b: &AstBuilder, name: &str, value: gx_ir::Expr) -> Decl {
    Decl::Var(b.value_spec(&[name], None, vec![value]))
}

// Loader

#[test]
fn load_reads_matching_files_sorted() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.gx"), "second").unwrap();
    fs::write(dir.path().join("a.gx"), "first").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    fs::create_dir(dir.path().join("nested.gx")).unwrap();

    let raw = load(dir.path(), &LoaderConfig::default()).unwrap();
    let texts: Vec<&str> = raw.files.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
    assert_eq!(raw.dir, dir.path());
}

#[test]
fn load_honors_configured_extension() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.gx"), "skipped").unwrap();
    fs::write(dir.path().join("main.src"), "kept").unwrap();
    let config = LoaderConfig {
        extension: "src".to_string(),
    };
    let raw = load(dir.path(), &config).unwrap();
    assert_eq!(raw.files.len(), 1);
    assert_eq!(raw.files[0].text, "kept");
}

#[test]
fn load_without_sources_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("README"), "nothing here").unwrap();
    let err = load(dir.path(), &LoaderConfig::default()).unwrap_err();
    assert!(matches!(err, LoadError::NoSources { .. }));
}

#[test]
fn load_missing_directory_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(&dir.path().join("absent"), &LoaderConfig::default()).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

// Initialization

#[test]
fn globals_initialize_in_dependency_order() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let package = b.package(
        "main",
        vec![],
        vec![
            var(&b, "a", b.binary(BinaryOp::Add, b.ident("b"), b.int(1))),
            var(&b, "b", b.binary(BinaryOp::Mul, b.ident("c"), b.int(2))),
            var(&b, "c", b.int(2)),
        ],
    );
    let pkg = build_ast(&package, options(b.interner(), &out)).unwrap();
    assert_eq!(pkg.global("a"), Some(Value::int(5)));
    assert_eq!(pkg.global("b"), Some(Value::int(4)));
}

#[test]
fn unresolvable_globals_are_undefined() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let package = b.package(
        "main",
        vec![],
        vec![var(&b, "a", b.binary(BinaryOp::Add, b.ident("missing"), b.int(1)))],
    );
    let err = build_ast(&package, options(b.interner(), &out)).unwrap_err();
    match err {
        BuildError::Undefined { names } => assert_eq!(names, vec!["missing".to_string()]),
        other => panic!("expected undefined, got {other}"),
    }
}

#[test]
fn init_functions_run_after_globals_in_order() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let package = b.package(
        "main",
        vec![],
        vec![
            b.func("init", b.sig(&[], vec![]), vec![b.println(vec![b.ident("x")])]),
            b.func(
                "value",
                b.sig(&[], vec![Type::INT]),
                vec![b.println(vec![b.string("v")]), b.ret(vec![b.int(7)])],
            ),
            var(&b, "x", b.call_named("value", vec![])),
            b.func("init", b.sig(&[], vec![]), vec![b.println(vec![b.int(2)])]),
        ],
    );
    let pkg = build_ast(&package, options(b.interner(), &out)).unwrap();
    assert_eq!(pkg.output(), "v\n7\n2\n");
    assert_eq!(pkg.global("init"), None);
}

#[test]
fn panicking_initializer_fails_the_build() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let package = b.package(
        "main",
        vec![],
        vec![
            b.func(
                "boom",
                b.sig(&[], vec![Type::INT]),
                vec![b.expr_stmt(b.call_named("panic", vec![b.string("boom")]))],
            ),
            var(&b, "x", b.call_named("boom", vec![])),
        ],
    );
    let err = build_ast(&package, options(b.interner(), &out)).unwrap_err();
    match err {
        BuildError::Init(err) => assert!(err.is_panic()),
        other => panic!("expected init failure, got {other}"),
    }
}

#[test]
fn duplicate_types_are_rejected() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let package = b.package(
        "main",
        vec![],
        vec![
            Decl::Type(b.type_spec("T", Type::INT)),
            Decl::Type(b.type_spec("T", Type::String)),
        ],
    );
    let err = build_ast(&package, options(b.interner(), &out)).unwrap_err();
    assert!(matches!(err, BuildError::Compile(crate::CompileError::DuplicateType { .. })));
}

#[test]
fn calling_an_unknown_function_fails() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let package = b.package("main", vec![], vec![b.main(vec![])]);
    let mut pkg = build_ast(&package, options(b.interner(), &out)).unwrap();
    let err = pkg.call_function("missing", Vec::new()).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::UndefinedFunction { ref name } if name == "missing"));
    assert_eq!(pkg.name(), "main");
}

// Imports

#[test]
fn host_packages_resolve_through_the_registry() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let package = b.package(
        "main",
        vec![b.import("fmt")],
        vec![b.main(vec![b.expr_stmt(b.call(
            b.qualified("fmt", "Println"),
            vec![b.string("hi"), b.int(3)],
        ))])],
    );
    let mut pkg = build_ast(&package, options(b.interner(), &out)).unwrap();
    pkg.run_main().unwrap();
    assert_eq!(pkg.output(), "hi 3\n");
}

#[test]
fn blank_import_is_resolved_but_not_bound() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let import = Import {
        alias: Some(b.name("_")),
        ..b.import("strings")
    };
    let package = b.package("main", vec![import], vec![b.main(vec![])]);
    let pkg = build_ast(&package, options(b.interner(), &out)).unwrap();
    assert_eq!(pkg.global("strings"), None);
}

#[test]
fn source_imports_need_a_front_end() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let package = b.package("main", vec![b.import("lib")], vec![b.main(vec![])]);
    let err = build_ast(&package, options(b.interner(), &out)).unwrap_err();
    assert!(matches!(err, BuildError::UnknownImport { ref path } if path == "lib"));
}

fn lib_package(b: &AstBuilder) -> Package {
    b.package(
        "lib",
        vec![],
        vec![
            b.func("init", b.sig(&[], vec![]), vec![b.println(vec![b.string("lib init")])]),
            b.func(
                "Double",
                b.sig(&[("n", Type::INT)], vec![Type::INT]),
                vec![b.ret(vec![b.binary(BinaryOp::Mul, b.ident("n"), b.int(2))])],
            ),
        ],
    )
}

#[test]
fn source_imports_load_from_the_import_root() {
    let root = tempfile::tempdir().unwrap();
    write_package(root.path(), "lib", "lib");
    let front_end = ScriptedFrontEnd::default()
        .with("lib", lib_package)
        .with("main", |b| {
            b.package(
                "main",
                vec![b.import("lib")],
                vec![b.main(vec![b.println(vec![b.call(
                    b.qualified("lib", "Double"),
                    vec![b.int(21)],
                )])])],
            )
        });
    let interner = SharedInterner::new();
    let out = buffer_handler();
    let opts = options(&interner, &out).with_import_root(root.path());
    let mut pkg = parse_source("main", &front_end, opts).unwrap();
    pkg.run_main().unwrap();
    assert_eq!(pkg.output(), "lib init\n42\n");
}

#[test]
fn shared_imports_initialize_once() {
    let root = tempfile::tempdir().unwrap();
    write_package(root.path(), "lib", "lib");
    write_package(root.path(), "other", "other");
    let front_end = ScriptedFrontEnd::default()
        .with("lib", lib_package)
        .with("other", |b| {
            b.package("other", vec![b.import("lib")], vec![b.func("Nothing", b.sig(&[], vec![]), vec![])])
        })
        .with("main", |b| {
            b.package("main", vec![b.import("lib"), b.import("other")], vec![b.main(vec![])])
        });
    let interner = SharedInterner::new();
    let out = buffer_handler();
    let opts = options(&interner, &out).with_import_root(root.path());
    let pkg = parse_source("main", &front_end, opts).unwrap();
    assert_eq!(pkg.output(), "lib init\n");
}

#[test]
fn import_cycles_are_reported() {
    let root = tempfile::tempdir().unwrap();
    write_package(root.path(), "a", "a");
    write_package(root.path(), "b", "b");
    let front_end = ScriptedFrontEnd::default()
        .with("a", |b| b.package("a", vec![b.import("b")], vec![]))
        .with("b", |b| b.package("b", vec![b.import("a")], vec![]))
        .with("main", |b| b.package("main", vec![b.import("a")], vec![b.main(vec![])]));
    let interner = SharedInterner::new();
    let out = buffer_handler();
    let opts = options(&interner, &out).with_import_root(root.path());
    let err = parse_source("main", &front_end, opts).err().unwrap();
    assert!(matches!(err, BuildError::ImportCycle { ref path } if path == "a"));
}

#[test]
fn front_end_errors_carry_the_file() {
    let front_end = ScriptedFrontEnd::default();
    let interner = SharedInterner::new();
    let out = buffer_handler();
    let err = parse_source("nonsense", &front_end, options(&interner, &out))
        .err()
        .unwrap();
    match err {
        BuildError::FrontEnd(err) => {
            assert_eq!(err.file.as_deref(), Some(Path::new("main.gx")));
        }
        other => panic!("expected front-end error, got {other}"),
    }
}
