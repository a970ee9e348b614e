use pretty_assertions::assert_eq;

use super::*;

#[test]
fn factory_message_matches_kind() {
    let err = arity_mismatch("f", 1, 2);
    assert_eq!(err.message, "f expects 1 argument, got 2");
    assert_eq!(err.message, err.kind.to_string());
}

#[test]
fn with_span_keeps_first_span() {
    let err = undefined_variable("x")
        .with_span(Span::new(3, 4))
        .with_span(Span::new(9, 10));
    assert_eq!(err.span, Some(Span::new(3, 4)));
}

#[test]
fn backtrace_display_lists_frames() {
    let bt = EvalBacktrace::new(vec![
        BacktraceFrame {
            name: "inner".to_string(),
            span: Some(Span::new(1, 2)),
        },
        BacktraceFrame {
            name: "main".to_string(),
            span: None,
        },
    ]);
    assert_eq!(
        bt.to_string(),
        "stack backtrace:\n  0: inner at 1..2\n  1: main\n"
    );
}

#[test]
fn runtime_panic_payload_is_error_value() {
    let Unwind::Panic(Value::Error(err)) = integer_divide_by_zero() else {
        panic!("expected runtime error payload");
    };
    assert_eq!(&*err.message, "runtime error: integer divide by zero");
    assert!(err.runtime);
}

#[test]
fn fatal_conversion_boxes_error() {
    let unwind: Unwind = stack_overflow(8).into();
    assert!(matches!(unwind, Unwind::Fatal(err) if err.kind == EvalErrorKind::StackOverflow { depth: 8 }));
}
