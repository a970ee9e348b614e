use gx_ir::{AstBuilder, BinaryOp, IntKind, Type};
use pretty_assertions::assert_eq;

use super::{run, run_main};

#[test]
fn count_loop_prints_each_index() {
    let b = AstBuilder::new();
    let out = run_main(&b, vec![b.count_loop("i", b.int(3), vec![b.print(vec![b.ident("i")])])]);
    assert_eq!(out, "012");
}

#[test]
fn compound_assignment_updates_in_place() {
    let b = AstBuilder::new();
    let out = run_main(
        &b,
        vec![
            b.define1("a", b.int(1)),
            b.op_assign(BinaryOp::Add, b.ident("a"), b.int(2)),
            b.print(vec![b.ident("a")]),
        ],
    );
    assert_eq!(out, "3");
}

#[test]
fn deferred_calls_run_in_reverse_with_snapshotted_arguments() {
    let b = AstBuilder::new();
    let out = run_main(
        &b,
        vec![b.for_(
            Some(b.define1("i", b.int(0))),
            Some(b.binary(BinaryOp::LtEq, b.ident("i"), b.int(3))),
            Some(b.inc(b.ident("i"))),
            vec![b.defer(b.call_named("print", vec![b.ident("i")]))],
        )],
    );
    assert_eq!(out, "3210");
}

#[test]
fn fallthrough_enters_the_next_body() {
    let b = AstBuilder::new();
    let out = run_main(
        &b,
        vec![b.switch(
            None,
            Some(b.int(1)),
            vec![
                b.case(
                    vec![b.int(1)],
                    vec![b.print(vec![b.string("a")]), b.fallthrough()],
                ),
                b.case(vec![b.int(2)], vec![b.print(vec![b.string("b")])]),
                b.case(vec![b.int(3)], vec![b.print(vec![b.string("c")])]),
            ],
        )],
    );
    assert_eq!(out, "ab");
}

#[test]
fn default_clause_runs_when_nothing_matches() {
    let b = AstBuilder::new();
    let out = run_main(
        &b,
        vec![b.switch(
            Some(b.define1("x", b.int(7))),
            Some(b.ident("x")),
            vec![
                b.default_case(vec![b.print(vec![b.string("other")])]),
                b.case(vec![b.int(1), b.int(2)], vec![b.print(vec![b.string("small")])]),
            ],
        )],
    );
    assert_eq!(out, "other");
}

#[test]
fn break_leaves_only_the_innermost_switch() {
    let b = AstBuilder::new();
    let out = run_main(
        &b,
        vec![b.count_loop(
            "i",
            b.int(2),
            vec![
                b.switch(
                    None,
                    None,
                    vec![b.case(
                        vec![b.boolean(true)],
                        vec![b.break_(None), b.print(vec![b.string("unreachable")])],
                    )],
                ),
                b.print(vec![b.ident("i")]),
            ],
        )],
    );
    assert_eq!(out, "01");
}

#[test]
fn goto_jumps_backward_and_forward() {
    let b = AstBuilder::new();
    let out = run_main(
        &b,
        vec![
            b.define1("i", b.int(0)),
            b.labeled(
                "again",
                b.if_(
                    b.binary(BinaryOp::Lt, b.ident("i"), b.int(3)),
                    vec![
                        b.print(vec![b.ident("i")]),
                        b.inc(b.ident("i")),
                        b.goto("again"),
                    ],
                    None,
                ),
            ),
            b.goto("done"),
            b.print(vec![b.string("skipped")]),
            b.labeled("done", b.print(vec![b.string("!")])),
        ],
    );
    assert_eq!(out, "012!");
}

#[test]
fn labeled_break_and_continue_target_the_outer_loop() {
    let b = AstBuilder::new();
    let inner = b.count_loop(
        "j",
        b.int(3),
        vec![
            b.if_(
                b.binary(BinaryOp::Eq, b.ident("j"), b.int(1)),
                vec![b.continue_(Some("outer"))],
                None,
            ),
            b.if_(
                b.binary(BinaryOp::Eq, b.ident("i"), b.int(2)),
                vec![b.break_(Some("outer"))],
                None,
            ),
            b.print(vec![b.ident("i")]),
            b.print(vec![b.ident("j")]),
        ],
    );
    let out = run_main(
        &b,
        vec![
            b.labeled("outer", b.count_loop("i", b.int(3), vec![inner])),
            b.print(vec![b.string(".")]),
        ],
    );
    assert_eq!(out, "0010.");
}

#[test]
fn type_switch_binds_the_asserted_value() {
    let b = AstBuilder::new();
    let describe = b.func(
        "describe",
        b.sig(&[("v", Type::any())], vec![]),
        vec![b.type_switch(
            Some("x"),
            b.ident("v"),
            vec![
                b.type_case(
                    vec![Type::INT],
                    vec![b.print(vec![b.binary(BinaryOp::Add, b.ident("x"), b.int(1))])],
                ),
                b.type_case(
                    vec![Type::String],
                    vec![b.print(vec![b.binary(BinaryOp::Add, b.ident("x"), b.string("!"))])],
                ),
                b.type_case(vec![Type::UntypedNil], vec![b.print(vec![b.string("nil")])]),
                b.type_default(vec![b.print(vec![b.string("?")])]),
            ],
        )],
    );
    let main = b.main(vec![
        b.expr_stmt(b.call_named("describe", vec![b.int(1)])),
        b.expr_stmt(b.call_named("describe", vec![b.string("s")])),
        b.expr_stmt(b.call_named("describe", vec![b.nil()])),
        b.expr_stmt(b.call_named("describe", vec![b.float(2.5)])),
    ]);
    assert_eq!(run(&b, vec![describe, main]), "2s!nil?");
}

#[test]
fn string_range_yields_byte_offsets_and_runes() {
    let b = AstBuilder::new();
    let out = run_main(
        &b,
        vec![b.range(
            Some("i"),
            Some("r"),
            b.string("aé!"),
            vec![
                b.print(vec![b.ident("i")]),
                b.print(vec![b.convert(Type::String, b.ident("r"))]),
            ],
        )],
    );
    assert_eq!(out, "0a1é3!");
}

#[test]
fn map_range_visits_each_pair_once() {
    let b = AstBuilder::new();
    let map_ty = Type::Map(Box::new(Type::String), Box::new(Type::INT));
    let out = run_main(
        &b,
        vec![
            b.define1(
                "m",
                b.composite(
                    map_ty,
                    vec![
                        b.keyed(b.string("a"), b.int(1)),
                        b.keyed(b.string("b"), b.int(2)),
                    ],
                ),
            ),
            b.define(&["n", "total"], vec![b.int(0), b.int(0)]),
            b.define1("keys", b.int(0)),
            b.range(
                Some("k"),
                Some("v"),
                b.ident("m"),
                vec![
                    b.inc(b.ident("n")),
                    b.op_assign(BinaryOp::Add, b.ident("total"), b.ident("v")),
                    b.if_(
                        b.binary(BinaryOp::Eq, b.ident("k"), b.string("a")),
                        vec![b.op_assign(BinaryOp::Add, b.ident("keys"), b.int(10))],
                        Some(vec![b.op_assign(BinaryOp::Add, b.ident("keys"), b.int(1))]),
                    ),
                ],
            ),
            b.println(vec![b.ident("n"), b.ident("total"), b.ident("keys")]),
        ],
    );
    assert_eq!(out, "2 3 11\n");
}

#[test]
fn buffered_channels_queue_until_closed() {
    let b = AstBuilder::new();
    let chan_ty = Type::Chan(Box::new(Type::INT));
    let out = run_main(
        &b,
        vec![
            b.define1(
                "ch",
                b.call_named("make", vec![b.type_expr(chan_ty), b.int(2)]),
            ),
            b.send(b.ident("ch"), b.int(1)),
            b.send(b.ident("ch"), b.int(2)),
            b.print(vec![b.recv(b.ident("ch"))]),
            b.send(b.ident("ch"), b.int(3)),
            b.expr_stmt(b.call_named("close", vec![b.ident("ch")])),
            b.range(Some("v"), None, b.ident("ch"), vec![b.print(vec![b.ident("v")])]),
        ],
    );
    assert_eq!(out, "123");
}

#[test]
fn closures_share_captured_variables() {
    let b = AstBuilder::new();
    let counter_ty = Type::Func(std::rc::Rc::new(gx_ir::FuncType {
        params: vec![],
        results: vec![Type::INT],
        variadic: false,
    }));
    let make_counter = b.func(
        "makeCounter",
        b.sig(&[], vec![counter_ty]),
        vec![
            b.define1("n", b.int(0)),
            b.ret(vec![b.func_lit(
                b.sig(&[], vec![Type::INT]),
                vec![b.inc(b.ident("n")), b.ret(vec![b.ident("n")])],
            )]),
        ],
    );
    let main = b.main(vec![
        b.define1("total", b.int(0)),
        b.define1(
            "add",
            b.func_lit(
                b.sig(&[("d", Type::INT)], vec![]),
                vec![b.op_assign(BinaryOp::Add, b.ident("total"), b.ident("d"))],
            ),
        ),
        b.expr_stmt(b.call_named("add", vec![b.int(4)])),
        b.expr_stmt(b.call_named("add", vec![b.int(5)])),
        b.print(vec![b.ident("total")]),
        b.define1("next", b.call_named("makeCounter", vec![])),
        b.expr_stmt(b.call_named("next", vec![])),
        b.print(vec![b.call_named("next", vec![])]),
        b.print(vec![b.call(b.call_named("makeCounter", vec![]), vec![])]),
    ]);
    assert_eq!(run(&b, vec![make_counter, main]), "921");
}

#[test]
fn loop_closures_capture_each_iteration() {
    let b = AstBuilder::new();
    let thunk = Type::Func(std::rc::Rc::new(gx_ir::FuncType::default()));
    let out = run_main(
        &b,
        vec![
            b.var("fs", Some(Type::slice(thunk)), None),
            b.count_loop(
                "i",
                b.int(3),
                vec![b.assign1(
                    b.ident("fs"),
                    b.call_named(
                        "append",
                        vec![
                            b.ident("fs"),
                            b.func_lit(b.sig(&[], vec![]), vec![b.print(vec![b.ident("i")])]),
                        ],
                    ),
                )],
            ),
            b.range(
                None,
                Some("f"),
                b.ident("fs"),
                vec![b.expr_stmt(b.call_named("f", vec![]))],
            ),
        ],
    );
    assert_eq!(out, "012");
}

#[test]
fn integer_conversion_wraps() {
    let b = AstBuilder::new();
    let out = run_main(
        &b,
        vec![
            b.define1("x", b.int(300)),
            b.print(vec![b.convert(Type::Int(IntKind::Uint8), b.ident("x"))]),
        ],
    );
    assert_eq!(out, "44");
}
