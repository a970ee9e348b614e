use gx_ir::{AstBuilder, BinaryOp, Type};
use pretty_assertions::assert_eq;

use super::{run, run_package};
use crate::errors::EvalErrorKind;

fn panic_message(kind: &EvalErrorKind) -> &str {
    match kind {
        EvalErrorKind::Panic { message } => message,
        other => panic!("expected a panic, got {other}"),
    }
}

#[test]
fn recover_in_deferred_closure_returns_named_results() {
    let b = AstBuilder::new();
    let handler = b.func_lit(
        b.sig(&[], vec![]),
        vec![b.if_init(
            Some(b.define1("r", b.call_named("recover", vec![]))),
            b.binary(BinaryOp::NotEq, b.ident("r"), b.nil()),
            vec![b.assign1(b.ident("failed"), b.int(1))],
            None,
        )],
    );
    let divide = b.func(
        "divide",
        b.sig_named(
            &[("a", Type::INT), ("b", Type::INT)],
            &[("q", Type::INT), ("failed", Type::INT)],
        ),
        vec![
            b.defer(b.call(handler, vec![])),
            b.assign1(b.ident("q"), b.binary(BinaryOp::Div, b.ident("a"), b.ident("b"))),
            b.ret(vec![]),
        ],
    );
    let main = b.main(vec![
        b.define(&["q", "f"], vec![b.call_named("divide", vec![b.int(6), b.int(3)])]),
        b.println(vec![b.ident("q"), b.ident("f")]),
        b.assign(
            vec![b.ident("q"), b.ident("f")],
            vec![b.call_named("divide", vec![b.int(1), b.int(0)])],
        ),
        b.println(vec![b.ident("q"), b.ident("f")]),
    ]);
    assert_eq!(run(&b, vec![divide, main]), "2 0\n0 1\n");
}

#[test]
fn unrecovered_panic_surfaces_its_message() {
    let b = AstBuilder::new();
    let main = b.main(vec![
        b.defer(b.call_named("print", vec![b.int(1)])),
        b.defer(b.call_named("print", vec![b.int(2)])),
        b.expr_stmt(b.call_named("panic", vec![b.string("fatal thing")])),
        b.print(vec![b.string("unreachable")]),
    ]);
    let (out, result) = run_package(&b, Vec::new(), vec![main]);
    let err = result.unwrap_err();
    assert_eq!(panic_message(&err.kind), "fatal thing");
    assert_eq!(out, "21");
}

#[test]
fn runtime_faults_are_panics() {
    let b = AstBuilder::new();
    let main = b.main(vec![
        b.define1("s", b.composite(Type::slice(Type::INT), vec![b.elem(b.int(1))])),
        b.print(vec![b.index(b.ident("s"), b.int(5))]),
    ]);
    let (_, result) = run_package(&b, Vec::new(), vec![main]);
    let err = result.unwrap_err();
    let message = panic_message(&err.kind);
    assert!(message.starts_with("runtime error:"), "{message}");
    assert!(message.contains("index out of range"), "{message}");
}

#[test]
fn nil_map_writes_panic() {
    let b = AstBuilder::new();
    let map_ty = Type::Map(Box::new(Type::String), Box::new(Type::INT));
    let main = b.main(vec![
        b.var("m", Some(map_ty), None),
        b.assign1(b.index(b.ident("m"), b.string("k")), b.int(1)),
    ]);
    let (_, result) = run_package(&b, Vec::new(), vec![main]);
    let err = result.unwrap_err();
    assert!(panic_message(&err.kind).contains("nil map"));
}

#[test]
fn newer_panic_replaces_the_one_in_flight() {
    let b = AstBuilder::new();
    let report = b.func_lit(
        b.sig(&[], vec![]),
        vec![b.print(vec![b.call_named("recover", vec![])])],
    );
    let repanic = b.func_lit(
        b.sig(&[], vec![]),
        vec![b.expr_stmt(b.call_named("panic", vec![b.string("second")]))],
    );
    let main = b.main(vec![
        b.defer(b.call(report, vec![])),
        b.defer(b.call(repanic, vec![])),
        b.expr_stmt(b.call_named("panic", vec![b.string("first")])),
    ]);
    assert_eq!(run(&b, vec![main]), "second");
}

#[test]
fn recover_outside_a_panic_returns_nil() {
    let b = AstBuilder::new();
    let main = b.main(vec![b.print(vec![b.call_named("recover", vec![])])]);
    assert_eq!(run(&b, vec![main]), "<nil>");
}

#[test]
fn send_without_receiver_is_a_deadlock() {
    let b = AstBuilder::new();
    let chan_ty = Type::Chan(Box::new(Type::INT));
    let main = b.main(vec![
        b.define1("ch", b.call_named("make", vec![b.type_expr(chan_ty)])),
        b.send(b.ident("ch"), b.int(1)),
    ]);
    let (_, result) = run_package(&b, Vec::new(), vec![main]);
    let err = result.unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::Deadlock));
}

#[test]
fn panic_with_error_value_reports_its_text() {
    let b = AstBuilder::new();
    let main = b.main(vec![b.expr_stmt(b.call_named(
        "panic",
        vec![b.call(b.qualified("errors", "New"), vec![b.string("broken")])],
    ))]);
    let (_, result) = run_package(&b, vec![b.import("errors")], vec![main]);
    let err = result.unwrap_err();
    assert_eq!(panic_message(&err.kind), "broken");
}
