//! Evaluation errors and unwinding signals.
//!
//! Three things travel up the Rust call chain while a program runs:
//!
//! - [`Unwind::Panic`]: a source-level panic. Deferred calls may `recover()`
//!   it. Runtime faults (nil dereference, index out of range, ...) are
//!   panics too, carrying a runtime error value.
//! - [`Unwind::Fatal`]: a broken invariant. Aborts evaluation; never
//!   recoverable.
//! - [`Unwind::Undeclared`]: a package-level initializer touched a global
//!   that is not declared yet. Only produced during package initialization,
//!   where the declaration is retried on the next pass.
//!
//! `EvalError` is what the embedder sees. Factory functions populate both
//! `kind` and `message`.

use std::fmt;
use std::rc::Rc;

use gx_ir::{Name, Span};

use crate::value::{ErrorValue, Value};

/// Result of executing a step, call or built-in.
pub type ExecResult<T = ()> = Result<T, Unwind>;

/// Non-local exit from evaluation.
#[derive(Clone, Debug)]
pub enum Unwind {
    /// Source-level panic with its payload.
    Panic(Value),
    /// Unrecoverable VM error.
    Fatal(Box<EvalError>),
    /// Reference to a global that package initialization has not reached.
    Undeclared(Name),
}

impl From<EvalError> for Unwind {
    #[cold]
    fn from(err: EvalError) -> Self {
        Unwind::Fatal(Box::new(err))
    }
}

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// An unrecovered source-level panic.
    Panic { message: String },
    StackOverflow { depth: usize },
    UndefinedVariable { name: String },
    UndefinedFunction { name: String },
    NotCallable { type_name: String },
    NoFieldOrMethod { name: String, type_name: String },
    UnknownMember { package: String, member: String },
    ArityMismatch { name: String, expected: usize, got: usize },
    InvalidHeapAddress { addr: u64 },
    OperandUnderflow,
    InvalidOperation { op: String, type_name: String },
    InvalidAssignTarget,
    Deadlock,
    Custom { message: String },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panic { message } => write!(f, "panic: {message}"),
            Self::StackOverflow { depth } => {
                write!(f, "maximum call depth exceeded (limit: {depth})")
            }
            Self::UndefinedVariable { name } => write!(f, "undefined: {name}"),
            Self::UndefinedFunction { name } => write!(f, "undefined function: {name}"),
            Self::NotCallable { type_name } => write!(f, "cannot call non-function {type_name}"),
            Self::NoFieldOrMethod { name, type_name } => {
                write!(f, "{type_name} has no field or method {name}")
            }
            Self::UnknownMember { package, member } => {
                write!(f, "undefined: {package}.{member}")
            }
            Self::ArityMismatch {
                name,
                expected,
                got,
            } => {
                let word = if *expected == 1 {
                    "argument"
                } else {
                    "arguments"
                };
                write!(f, "{name} expects {expected} {word}, got {got}")
            }
            Self::InvalidHeapAddress { addr } => write!(f, "invalid heap address {addr:#x}"),
            Self::OperandUnderflow => write!(f, "operand stack underflow"),
            Self::InvalidOperation { op, type_name } => {
                write!(f, "invalid operation: operator {op} not defined on {type_name}")
            }
            Self::InvalidAssignTarget => write!(f, "invalid assignment target"),
            Self::Deadlock => write!(f, "all goroutines are asleep - deadlock!"),
            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

/// A single frame in an evaluation backtrace.
#[derive(Clone, Debug)]
pub struct BacktraceFrame {
    /// Function or method name.
    pub name: String,
    /// Call site.
    pub span: Option<Span>,
}

/// Snapshot of the call stack at an error site.
#[derive(Clone, Debug, Default)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    /// Create a backtrace from frames, innermost first.
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    /// The frames, innermost first.
    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "stack backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            write!(f, "  {i}: {}", frame.name)?;
            if let Some(span) = frame.span {
                write!(f, " at {span}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Evaluation error surfaced to the embedder.
#[derive(Clone, Debug)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Human-readable message; equals `kind.to_string()` for factory errors.
    pub message: String,
    /// Location of the failing step.
    pub span: Option<Span>,
    /// Call stack at the error site.
    pub backtrace: Option<EvalBacktrace>,
    /// Operand stack of the failing frame, rendered top first.
    pub operands: Vec<String>,
}

impl EvalError {
    /// Create an error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_kind(EvalErrorKind::Custom { message })
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            span: None,
            backtrace: None,
            operands: Vec::new(),
        }
    }

    /// Attach a source span unless one is already set.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() && span != Span::DUMMY {
            self.span = Some(span);
        }
        self
    }

    /// Attach a backtrace.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    /// Attach an operand stack dump.
    #[must_use]
    pub fn with_operands(mut self, operands: Vec<String>) -> Self {
        self.operands = operands;
        self
    }

    /// Whether this error is an unrecovered source-level panic.
    pub fn is_panic(&self) -> bool {
        matches!(self.kind, EvalErrorKind::Panic { .. })
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(span) = self.span {
            write!(f, " at {span}")?;
        }
        if let Some(backtrace) = &self.backtrace {
            if !backtrace.is_empty() {
                write!(f, "\n{backtrace}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

// Fatal error factories

#[cold]
pub fn panic_error(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Panic {
        message: message.into(),
    })
}

#[cold]
pub fn stack_overflow(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth })
}

#[cold]
pub fn undefined_variable(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedVariable {
        name: name.to_string(),
    })
}

#[cold]
pub fn undefined_function(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedFunction {
        name: name.to_string(),
    })
}

#[cold]
pub fn not_callable(type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable {
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn no_field_or_method(name: &str, type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoFieldOrMethod {
        name: name.to_string(),
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn unknown_member(package: &str, member: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownMember {
        package: package.to_string(),
        member: member.to_string(),
    })
}

#[cold]
pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    })
}

#[cold]
pub fn invalid_heap_address(addr: u64) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidHeapAddress { addr })
}

#[cold]
pub fn operand_underflow() -> EvalError {
    EvalError::from_kind(EvalErrorKind::OperandUnderflow)
}

#[cold]
pub fn invalid_operation(op: &str, type_name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidOperation {
        op: op.to_string(),
        type_name: type_name.to_string(),
    })
}

#[cold]
pub fn invalid_assign_target() -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidAssignTarget)
}

#[cold]
pub fn deadlock() -> EvalError {
    EvalError::from_kind(EvalErrorKind::Deadlock)
}

// Runtime panics
//
// These are recoverable: the payload is a runtime error value whose
// message starts with "runtime error: ".

#[cold]
pub fn runtime_panic(message: impl fmt::Display) -> Unwind {
    Unwind::Panic(Value::Error(Rc::new(ErrorValue::runtime(format!(
        "runtime error: {message}"
    )))))
}

#[cold]
pub fn nil_dereference() -> Unwind {
    runtime_panic("invalid memory address or nil pointer dereference")
}

#[cold]
pub fn index_out_of_range(index: i64, len: usize) -> Unwind {
    runtime_panic(format_args!("index out of range [{index}] with length {len}"))
}

#[cold]
pub fn slice_bounds_out_of_range(low: i64, high: i64, cap: usize) -> Unwind {
    runtime_panic(format_args!("slice bounds out of range [{low}:{high}] with capacity {cap}"))
}

#[cold]
pub fn integer_divide_by_zero() -> Unwind {
    runtime_panic("integer divide by zero")
}

#[cold]
pub fn negative_shift_amount() -> Unwind {
    runtime_panic("negative shift amount")
}

#[cold]
pub fn nil_map_assignment() -> Unwind {
    runtime_panic("assignment to entry in nil map")
}

#[cold]
pub fn unhashable_key(type_name: &str) -> Unwind {
    runtime_panic(format_args!("hash of unhashable type {type_name}"))
}

#[cold]
pub fn uncomparable(type_name: &str) -> Unwind {
    runtime_panic(format_args!("comparing uncomparable type {type_name}"))
}

#[cold]
pub fn type_assertion_failed(got: &str, want: &str) -> Unwind {
    runtime_panic(format_args!("interface conversion: interface {{}} is {got}, not {want}"))
}

#[cold]
pub fn send_on_closed_channel() -> Unwind {
    Unwind::Panic(Value::Error(Rc::new(ErrorValue::runtime(
        "send on closed channel".to_string(),
    ))))
}

#[cold]
pub fn close_of_closed_channel() -> Unwind {
    Unwind::Panic(Value::Error(Rc::new(ErrorValue::runtime(
        "close of closed channel".to_string(),
    ))))
}

#[cold]
pub fn close_of_nil_channel() -> Unwind {
    Unwind::Panic(Value::Error(Rc::new(ErrorValue::runtime(
        "close of nil channel".to_string(),
    ))))
}

#[cold]
pub fn negative_len(what: &str) -> Unwind {
    runtime_panic(format_args!("makeslice: {what} out of range"))
}

#[cfg(test)]
mod tests;
