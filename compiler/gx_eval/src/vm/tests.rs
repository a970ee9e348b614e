use std::rc::Rc;
use std::sync::Arc;

use gx_ir::{AstBuilder, BinaryOp, Decl, Type};
use pretty_assertions::assert_eq;

use super::Vm;
use crate::builder::{compile_function, Compiler};
use crate::config::VmConfig;
use crate::env::ScopeRef;
use crate::errors::EvalErrorKind;
use crate::print_handler::{buffer_handler, SharedPrintHandler};
use crate::value::{FuncValue, HostFunc, Value};

fn new_vm(b: &AstBuilder, out: &SharedPrintHandler, max_depth: usize) -> Vm {
    let config = VmConfig::builder()
        .print_handler(Arc::clone(out))
        .max_call_depth(max_depth)
        .build();
    Vm::new(config, b.interner().clone())
}

/// Compile `decl` and bind it by name in `scope`.
fn define(vm: &mut Vm, b: &AstBuilder, scope: &ScopeRef, decl: Decl) -> Value {
    let Decl::Func(decl) = decl else {
        panic!("expected a function declaration");
    };
    let operators = Rc::clone(&vm.operators);
    let interner = b.interner().clone();
    let func = {
        let mut cx = Compiler::new(&interner, vm.types_mut(), &operators);
        compile_function(&mut cx, &decl).unwrap()
    };
    let value = Value::Func(Some(FuncValue::closure(func, scope.clone())));
    scope.borrow_mut().define(decl.name, value.clone());
    value
}

#[test]
fn host_functions_receive_arguments_in_order() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let mut vm = new_vm(&b, &out, 100);
    let join = HostFunc::new("join", |vm, args| {
        let text = vm.sprint(&args)?;
        Ok(vec![Value::string(&text)])
    });
    let callee = Value::Func(Some(FuncValue::Host(join)));
    let results = vm
        .call_function(&callee, vec![Value::string("a"), Value::int(1), Value::int(2)])
        .unwrap();
    assert_eq!(results, vec![Value::string("a1 2")]);
}

#[test]
fn calling_a_non_function_is_an_error() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let mut vm = new_vm(&b, &out, 100);
    let err = vm.call_function(&Value::int(3), Vec::new()).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::NotCallable { .. }));
}

#[test]
fn calling_a_nil_function_panics() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let mut vm = new_vm(&b, &out, 100);
    let err = vm.call_function(&Value::Func(None), Vec::new()).unwrap_err();
    assert!(err.is_panic());
}

#[test]
fn unbounded_recursion_hits_the_call_limit() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let mut vm = new_vm(&b, &out, 40);
    let scope = vm.new_root_scope();
    let recurse = define(
        &mut vm,
        &b,
        &scope,
        b.func(
            "down",
            b.sig(&[("n", Type::INT)], vec![Type::INT]),
            vec![b.ret(vec![b.call_named(
                "down",
                vec![b.binary(BinaryOp::Add, b.ident("n"), b.int(1))],
            )])],
        ),
    );
    let err = vm.call_function(&recurse, vec![Value::int(0)]).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::StackOverflow { depth: 40 }));
    assert_eq!(vm.call_depth(), 0);
}

#[test]
fn recovered_panic_returns_named_results() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let mut vm = new_vm(&b, &out, 100);
    let scope = vm.new_root_scope();
    let handler = b.func_lit(
        b.sig(&[], vec![]),
        vec![
            b.expr_stmt(b.call_named("recover", vec![])),
            b.assign1(b.ident("r"), b.int(9)),
        ],
    );
    let guarded = define(
        &mut vm,
        &b,
        &scope,
        b.func(
            "guarded",
            b.sig_named(&[], &[("r", Type::INT)]),
            vec![
                b.defer(b.call(handler, vec![])),
                b.expr_stmt(b.call_named("panic", vec![b.string("boom")])),
            ],
        ),
    );
    let results = vm.call_function(&guarded, Vec::new()).unwrap();
    assert_eq!(results, vec![Value::int(9)]);
}

#[test]
fn unrecovered_panic_reports_its_payload() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let mut vm = new_vm(&b, &out, 100);
    let scope = vm.new_root_scope();
    let fail = define(
        &mut vm,
        &b,
        &scope,
        b.func(
            "fail",
            b.sig(&[], vec![]),
            vec![
                b.defer(b.call_named("println", vec![b.string("deferred")])),
                b.expr_stmt(b.call_named("panic", vec![b.string("bad state")])),
            ],
        ),
    );
    let err = vm.call_function(&fail, Vec::new()).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::Panic { ref message } if message == "bad state"));
    assert_eq!(out.output(), "deferred\n");
}

#[test]
fn println_goes_to_the_print_handler() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let mut vm = new_vm(&b, &out, 100);
    let scope = vm.new_root_scope();
    let hello = define(
        &mut vm,
        &b,
        &scope,
        b.func(
            "hello",
            b.sig(&[], vec![]),
            vec![b.println(vec![b.string("x ="), b.int(1), b.boolean(true)])],
        ),
    );
    vm.call_function(&hello, Vec::new()).unwrap();
    assert_eq!(vm.print_handler().take_output(), "x = 1 true\n");
    assert_eq!(out.output(), "");
}

#[test]
fn sequences_format_like_print() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let mut vm = new_vm(&b, &out, 100);
    let nested = Value::slice(vec![
        Value::slice(vec![Value::int(1), Value::int(2)]),
        Value::slice(Vec::new()),
    ]);
    assert_eq!(vm.format_value(&nested).unwrap(), "[[1 2] []]");
    assert_eq!(vm.format_value(&Value::Nil).unwrap(), "<nil>");
}

#[test]
fn sprintf_reports_missing_and_extra_operands() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let mut vm = new_vm(&b, &out, 100);
    let text = vm.sprintf("%d and %d", &[Value::int(4)]).unwrap();
    assert_eq!(text, "4 and %!d(MISSING)");
    let text = vm.sprintf("%s", &[Value::string("a"), Value::int(2)]).unwrap();
    assert_eq!(text, "a%!(EXTRA int=2)");
}

#[test]
fn failed_argument_binding_returns_the_call_scope() {
    let b = AstBuilder::new();
    let out = buffer_handler();
    let mut vm = new_vm(&b, &out, 100);
    let scope = vm.new_root_scope();
    let double = define(
        &mut vm,
        &b,
        &scope,
        b.func(
            "double",
            b.sig(&[("n", Type::INT)], vec![Type::INT]),
            vec![b.ret(vec![b.binary(BinaryOp::Mul, b.ident("n"), b.int(2))])],
        ),
    );
    let err = vm.call_function(&double, Vec::new()).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::ArityMismatch { .. }));
    assert_eq!(vm.call_depth(), 0);

    let _next = vm.scopes.child(&scope);
    assert_eq!(vm.scopes.reuse_count(), 1);
    assert_eq!(vm.call_function(&double, vec![Value::int(4)]).unwrap(), vec![Value::int(8)]);
}
