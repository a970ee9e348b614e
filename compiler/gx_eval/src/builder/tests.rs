use std::rc::Rc;

use gx_ir::{AstBuilder, BinaryOp, Decl, Stmt, Type};
use pretty_assertions::assert_eq;

use super::{compile_function, CompileError, Compiler};
use crate::flow::{CompiledFunc, FuncFlags, StepOp};
use crate::ops::OperatorTable;
use crate::types::TypeTable;

fn compile_decl(b: &AstBuilder, decl: Decl) -> Result<Rc<CompiledFunc>, CompileError> {
    let mut types = TypeTable::new(b.interner().clone());
    let operators = OperatorTable::new();
    let mut cx = Compiler::new(b.interner(), &mut types, &operators);
    let Decl::Func(decl) = decl else {
        panic!("expected a function declaration");
    };
    compile_function(&mut cx, &decl)
}

fn compile_main(b: &AstBuilder, body: Vec<Stmt>) -> Result<Rc<CompiledFunc>, CompileError> {
    compile_decl(b, b.main(body))
}

#[test]
fn break_outside_loop_is_rejected() {
    let b = AstBuilder::new();
    let err = compile_main(&b, vec![b.break_(None)]).unwrap_err();
    assert!(matches!(err, CompileError::MisplacedBreak { .. }));
}

#[test]
fn continue_in_switch_without_loop_is_rejected() {
    let b = AstBuilder::new();
    let body = vec![b.switch(
        None,
        Some(b.int(1)),
        vec![b.case(vec![b.int(1)], vec![b.continue_(None)])],
    )];
    let err = compile_main(&b, body).unwrap_err();
    assert!(matches!(err, CompileError::MisplacedContinue { .. }));
}

#[test]
fn goto_needs_a_label() {
    let b = AstBuilder::new();
    let err = compile_main(&b, vec![b.goto("nowhere")]).unwrap_err();
    assert!(matches!(err, CompileError::UnknownLabel { ref label, .. } if label == "nowhere"));
}

#[test]
fn labels_are_unique_per_function() {
    let b = AstBuilder::new();
    let body = vec![
        b.labeled("L", b.block(vec![])),
        b.labeled("L", b.block(vec![])),
    ];
    let err = compile_main(&b, body).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateLabel { ref label, .. } if label == "L"));
}

#[test]
fn go_statements_are_rejected() {
    let b = AstBuilder::new();
    let call = b.call(b.func_lit(b.sig(&[], vec![]), vec![]), vec![]);
    let err = compile_main(&b, vec![b.go(call)]).unwrap_err();
    assert!(matches!(err, CompileError::GoStatement { .. }));
}

#[test]
fn fallthrough_in_last_clause_is_rejected() {
    let b = AstBuilder::new();
    let body = vec![b.switch(
        None,
        Some(b.int(1)),
        vec![b.case(vec![b.int(1)], vec![b.fallthrough()])],
    )];
    let err = compile_main(&b, body).unwrap_err();
    assert!(matches!(err, CompileError::MisplacedFallthrough { .. }));
}

#[test]
fn fallthrough_outside_switch_is_rejected() {
    let b = AstBuilder::new();
    let err = compile_main(&b, vec![b.fallthrough()]).unwrap_err();
    assert!(matches!(err, CompileError::MisplacedFallthrough { .. }));
}

#[test]
fn literal_is_not_assignable() {
    let b = AstBuilder::new();
    let err = compile_main(&b, vec![b.assign1(b.int(1), b.int(2))]).unwrap_err();
    assert!(matches!(err, CompileError::InvalidAssignTarget { .. }));
}

#[test]
fn type_in_expression_position_is_unsupported() {
    let b = AstBuilder::new();
    let err = compile_main(&b, vec![b.expr_stmt(b.type_expr(Type::INT))]).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedConstruct { .. }));
}

#[test]
fn statically_typed_operands_resolve_at_compile_time() {
    let b = AstBuilder::new();
    let body = vec![
        b.define1("x", b.int(1)),
        b.define1("y", b.binary(BinaryOp::Add, b.ident("x"), b.int(2))),
        b.println(vec![b.ident("y")]),
    ];
    let func = compile_main(&b, body).unwrap();
    let resolved = func
        .graph
        .steps()
        .iter()
        .any(|step| matches!(step.op, StepOp::Binary { op: BinaryOp::Add, func: Some(_) }));
    assert!(resolved);
}

#[test]
fn unknown_operand_types_fall_back_to_runtime_dispatch() {
    let b = AstBuilder::new();
    let sig = b.sig(&[], vec![]);
    let body = vec![b.println(vec![b.binary(
        BinaryOp::Add,
        b.ident("a"),
        b.ident("b"),
    )])];
    let func = compile_decl(&b, b.func("f", sig, body)).unwrap();
    let binary = func
        .graph
        .steps()
        .iter()
        .find_map(|step| match &step.op {
            StepOp::Binary { func, .. } => Some(func.is_some()),
            _ => None,
        });
    assert_eq!(binary, Some(false));
}

#[test]
fn every_branch_is_linked() {
    let b = AstBuilder::new();
    let body = vec![b.count_loop(
        "i",
        b.int(3),
        vec![b.if_(
            b.binary(BinaryOp::Eq, b.ident("i"), b.int(1)),
            vec![b.continue_(None)],
            Some(vec![b.println(vec![b.ident("i")])]),
        )],
    )];
    let func = compile_main(&b, body).unwrap();
    for step in func.graph.steps() {
        if let StepOp::Branch { else_ } = step.op {
            assert!(else_.is_some(), "unlinked branch in {:?}", func.graph);
        }
    }
}

#[test]
fn deferred_chain_is_never_the_entry() {
    let b = AstBuilder::new();
    let body = vec![b.defer(b.call_named("println", vec![b.int(1)]))];
    let func = compile_main(&b, body).unwrap();
    assert!(func.flags.contains(FuncFlags::HAS_DEFER));
    let entry = func.graph.entry().unwrap();
    let first = func.graph.step(entry).unwrap();
    assert!(matches!(first.op, StepOp::Nop));
    assert!(func
        .graph
        .steps()
        .iter()
        .any(|step| matches!(step.op, StepOp::Defer { builtin: Some(_), .. })));
}

#[test]
fn named_results_set_the_flag() {
    let b = AstBuilder::new();
    let sig = b.sig_named(&[], &[("n", Type::INT)]);
    let body = vec![b.assign1(b.ident("n"), b.int(4)), b.ret(vec![])];
    let func = compile_decl(&b, b.func("f", sig, body)).unwrap();
    assert!(func.has_named_results());
    assert!(func
        .graph
        .steps()
        .iter()
        .any(|step| matches!(step.op, StepOp::Return(crate::flow::Arity::Fixed(0)))));
}

#[test]
fn loop_variables_are_carried_out_of_each_iteration() {
    let b = AstBuilder::new();
    let body = vec![b.count_loop("i", b.int(2), vec![b.println(vec![b.ident("i")])])];
    let func = compile_main(&b, body).unwrap();
    let carried = func.graph.steps().iter().any(|step| {
        matches!(&step.op, StepOp::CarryOut(names) if names.as_slice() == [b.name("i")])
    });
    assert!(carried);
}
