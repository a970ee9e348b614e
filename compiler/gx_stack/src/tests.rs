use super::*;

#[test]
fn nested_calls_return_value() {
    fn fib(n: u32) -> u64 {
        ensure_sufficient_stack(|| if n < 2 { u64::from(n) } else { fib(n - 1) + fib(n - 2) })
    }

    assert_eq!(fib(20), 6765);
}

#[test]
fn deep_chain_does_not_overflow() {
    fn countdown(n: u64, acc: &mut Vec<u8>) -> u64 {
        ensure_sufficient_stack(|| {
            if n == 0 {
                acc.len() as u64
            } else {
                acc.push(0);
                countdown(n - 1, acc)
            }
        })
    }

    let mut acc = Vec::new();
    assert_eq!(countdown(200_000, &mut acc), 200_000);
}

#[test]
fn propagates_errors() {
    let result: Result<(), String> = ensure_sufficient_stack(|| Err("fatal".to_string()));
    assert_eq!(result, Err("fatal".to_string()));
}
