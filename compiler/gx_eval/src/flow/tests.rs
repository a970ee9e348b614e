use pretty_assertions::assert_eq;

use super::*;

#[test]
fn link_sets_each_slot_once() {
    let mut graph = FlowGraph::new();
    let a = graph.push(StepOp::Nop, Span::DUMMY);
    let b = graph.push(StepOp::Nop, Span::DUMMY);
    let slot = Slot {
        step: a,
        edge: Edge::Next,
    };
    assert!(graph.link(slot, b).is_ok());
    assert_eq!(graph.step(a).and_then(|s| s.next), Some(b));
    assert!(matches!(
        graph.link(slot, b),
        Err(CompileError::DoubleLink { step: 0 })
    ));
}

#[test]
fn else_edge_targets_branch_payload() {
    let mut graph = FlowGraph::new();
    let branch = graph.push(StepOp::Branch { else_: None }, Span::DUMMY);
    let target = graph.push(StepOp::Nop, Span::DUMMY);
    let slot = Slot {
        step: branch,
        edge: Edge::Else,
    };
    assert!(graph.link(slot, target).is_ok());
    let Some(StepOp::Branch { else_ }) = graph.step(branch).map(|s| &s.op) else {
        panic!("expected branch");
    };
    assert_eq!(*else_, Some(target));
}

#[test]
fn else_edge_on_plain_step_is_rejected() {
    let mut graph = FlowGraph::new();
    let nop = graph.push(StepOp::Nop, Span::DUMMY);
    let slot = Slot {
        step: nop,
        edge: Edge::Else,
    };
    assert!(graph.link(slot, nop).is_err());
}

#[test]
fn entry_is_first_step() {
    let mut graph = FlowGraph::new();
    assert_eq!(graph.entry(), None);
    graph.push(StepOp::Nop, Span::DUMMY);
    assert_eq!(graph.entry().map(StepId::index), Some(0));
    assert_eq!(graph.next_id().index(), 1);
}

#[test]
fn target_operand_counts() {
    assert_eq!(Target::Var(Name::from_raw(1)).operands(), 0);
    assert_eq!(Target::Index.operands(), 2);
    assert_eq!(Target::Deref.operands(), 1);
}

#[test]
fn compose_operand_counts() {
    assert_eq!(ComposeKeys::Positional(3).operands(), 3);
    assert_eq!(ComposeKeys::Seq(vec![false, true, false]).operands(), 4);
    assert_eq!(ComposeKeys::Map(2).operands(), 4);
}
