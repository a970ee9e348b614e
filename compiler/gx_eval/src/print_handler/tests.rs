use pretty_assertions::assert_eq;

use super::*;

#[test]
fn buffer_collects_writes_in_order() {
    let handler = buffer_handler();
    handler.write("a");
    handler.write_line("b");
    handler.write("c");
    assert_eq!(handler.output(), "ab\nc");
}

#[test]
fn take_output_drains() {
    let handler = buffer_handler();
    handler.write_line("x");
    assert_eq!(handler.take_output(), "x\n");
    assert_eq!(handler.output(), "");
}

#[test]
fn clear_empties_buffer() {
    let handler = BufferPrintHandler::new();
    handler.write("hello");
    handler.clear();
    assert!(handler.output().is_empty());
}

#[test]
fn silent_and_stdout_capture_nothing() {
    let silent = silent_handler();
    silent.write_line("gone");
    assert_eq!(silent.output(), "");
    assert_eq!(stdout_handler().take_output(), "");
}

#[test]
fn shared_buffer_sees_writes_from_other_threads() {
    let handler = buffer_handler();
    let other = Arc::clone(&handler);
    let worker = std::thread::spawn(move || {
        for _ in 0..50 {
            other.write_line("a");
        }
    });
    for _ in 0..50 {
        handler.write_line("b");
    }
    assert!(worker.join().is_ok());
    assert_eq!(handler.output().lines().count(), 100);
}
