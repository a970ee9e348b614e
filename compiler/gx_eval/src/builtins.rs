//! Predeclared functions.
//!
//! The builder recognizes a built-in by name when no local or package-level
//! binding shadows it and emits a `CallBuiltin` step. Type arguments
//! (`make`, `new`) and the static type of `append`'s slice travel in the
//! step payload rather than on the operand stack.

use std::rc::Rc;

use gx_ir::{BinaryOp, IntKind, Type};

use crate::errors::{
    close_of_nil_channel, invalid_operation, runtime_panic, ExecResult, Unwind,
};
use crate::ops::evaluate_binary;
use crate::value::{zero_like, Complex, ErrorValue, MapKey, SliceValue, Value};
use crate::vm::Vm;

/// A predeclared function.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Builtin {
    Append,
    Cap,
    Clear,
    Close,
    Complex,
    Copy,
    Delete,
    Imag,
    Len,
    Make,
    Max,
    Min,
    New,
    Panic,
    Print,
    Println,
    Real,
    Recover,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        Some(match name {
            "append" => Builtin::Append,
            "cap" => Builtin::Cap,
            "clear" => Builtin::Clear,
            "close" => Builtin::Close,
            "complex" => Builtin::Complex,
            "copy" => Builtin::Copy,
            "delete" => Builtin::Delete,
            "imag" => Builtin::Imag,
            "len" => Builtin::Len,
            "make" => Builtin::Make,
            "max" => Builtin::Max,
            "min" => Builtin::Min,
            "new" => Builtin::New,
            "panic" => Builtin::Panic,
            "print" => Builtin::Print,
            "println" => Builtin::Println,
            "real" => Builtin::Real,
            "recover" => Builtin::Recover,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Append => "append",
            Builtin::Cap => "cap",
            Builtin::Clear => "clear",
            Builtin::Close => "close",
            Builtin::Complex => "complex",
            Builtin::Copy => "copy",
            Builtin::Delete => "delete",
            Builtin::Imag => "imag",
            Builtin::Len => "len",
            Builtin::Make => "make",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::New => "new",
            Builtin::Panic => "panic",
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Real => "real",
            Builtin::Recover => "recover",
        }
    }

    /// Whether the first source argument is a type rather than a value.
    pub fn takes_type(self) -> bool {
        matches!(self, Builtin::Make | Builtin::New)
    }

    /// Whether a call produces a value.
    pub fn has_result(self) -> bool {
        !matches!(
            self,
            Builtin::Clear
                | Builtin::Close
                | Builtin::Delete
                | Builtin::Panic
                | Builtin::Print
                | Builtin::Println
        )
    }
}

impl Vm {
    /// Run a built-in. `args` are in source order; with `spread` the last
    /// argument is expanded.
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        ty: Option<&Type>,
        mut args: Vec<Value>,
        spread: bool,
    ) -> ExecResult<Vec<Value>> {
        let result = match builtin {
            Builtin::Append => self.builtin_append(ty, args, spread)?,
            Builtin::Len => Value::int(length(first(&args)?, builtin)? as i64),
            Builtin::Cap => Value::int(capacity(first(&args)?)? as i64),
            Builtin::Copy => {
                let (dst, src) = pair(&args)?;
                Value::int(copy_elements(dst, src)? as i64)
            }
            Builtin::Delete => {
                let (map, key) = pair(&args)?;
                match map.unwrap_named() {
                    Value::Map(map) => map.remove(&MapKey::from_value(key)?),
                    other => return Err(invalid_operation("delete", other.kind_name()).into()),
                }
                return Ok(Vec::new());
            }
            Builtin::Clear => {
                match first(&args)?.unwrap_named() {
                    Value::Map(map) => map.clear(),
                    Value::Slice(slice) => {
                        for (i, value) in slice.to_vec().iter().enumerate() {
                            slice.set(i, zero_like(value));
                        }
                    }
                    other => return Err(invalid_operation("clear", other.kind_name()).into()),
                }
                return Ok(Vec::new());
            }
            Builtin::Close => {
                match first(&args)?.unwrap_named() {
                    Value::Chan(Some(chan)) => chan.close()?,
                    Value::Chan(None) | Value::Nil => return Err(close_of_nil_channel()),
                    other => return Err(invalid_operation("close", other.kind_name()).into()),
                }
                return Ok(Vec::new());
            }
            Builtin::Complex => {
                let (re, im) = pair(&args)?;
                make_complex(re, im)?
            }
            Builtin::Real | Builtin::Imag => {
                let want_real = builtin == Builtin::Real;
                match first(&args)?.unwrap_named() {
                    Value::Complex64(c) => {
                        Value::Float32((if want_real { c.re } else { c.im }) as f32)
                    }
                    Value::Complex128(c) => Value::Float64(if want_real { c.re } else { c.im }),
                    Value::Int(i) => Value::Float64(if want_real { i.as_f64() } else { 0.0 }),
                    Value::Float64(f) => Value::Float64(if want_real { *f } else { 0.0 }),
                    other => {
                        return Err(invalid_operation(builtin.name(), other.kind_name()).into())
                    }
                }
            }
            Builtin::Make => {
                let ty = type_arg(ty, builtin)?;
                self.types.make(ty, &args)?
            }
            Builtin::New => {
                let ty = type_arg(ty, builtin)?;
                let zero = self.types.zero_value(ty);
                Value::Pointer(Some(self.heap.alloc(zero)))
            }
            Builtin::Max | Builtin::Min => {
                if spread {
                    args = expand_spread(args)?;
                }
                extremum(args, builtin == Builtin::Max)?
            }
            Builtin::Panic => {
                let payload = args.pop().unwrap_or(Value::Nil);
                let payload = if payload.is_nil() {
                    Value::Error(Rc::new(ErrorValue::runtime(
                        "panic called with nil argument".to_string(),
                    )))
                } else {
                    payload
                };
                tracing::debug!(payload = ?payload, "panic");
                return Err(Unwind::Panic(payload));
            }
            Builtin::Print | Builtin::Println => {
                let newline = builtin == Builtin::Println;
                let text = self.format_operands(&args, newline)?;
                let handler = self.print_handler();
                if newline {
                    handler.write_line(&text);
                } else {
                    handler.write(&text);
                }
                return Ok(Vec::new());
            }
            Builtin::Recover => self.recover_panic(),
        };
        Ok(vec![result])
    }

    fn builtin_append(
        &mut self,
        ty: Option<&Type>,
        args: Vec<Value>,
        spread: bool,
    ) -> ExecResult<Value> {
        let mut args = args.into_iter();
        let Some(base) = args.next() else {
            return Err(invalid_operation("append", "no arguments").into());
        };
        let (type_name, slice) = match &base {
            Value::Named(named) => match &named.inner {
                Value::Slice(slice) => (Some(named.type_name), slice.clone()),
                Value::Nil => (Some(named.type_name), SliceValue::nil()),
                other => return Err(invalid_operation("append", other.kind_name()).into()),
            },
            Value::Slice(slice) => (None, slice.clone()),
            Value::Nil => (None, SliceValue::nil()),
            other => return Err(invalid_operation("append", other.kind_name()).into()),
        };
        let rest: Vec<Value> = args.collect();
        let items = if spread {
            expand_spread(rest)?
        } else {
            rest
        };
        let elem = ty.map(|ty| self.types.resolve(ty).clone());
        let items = items
            .into_iter()
            .map(|item| {
                let item = item.copy_value();
                match elem.as_ref().and_then(Type::elem) {
                    Some(elem) => self.types.coerce(item, elem),
                    None => item,
                }
            })
            .collect();
        let grown = Value::Slice(slice.append(items));
        Ok(match type_name {
            Some(name) => Value::named(name, grown),
            None => grown,
        })
    }
}

fn first(args: &[Value]) -> ExecResult<&Value> {
    args.first()
        .ok_or_else(|| invalid_operation("built-in call", "missing argument").into())
}

fn pair(args: &[Value]) -> ExecResult<(&Value, &Value)> {
    match args {
        [a, b, ..] => Ok((a, b)),
        _ => Err(invalid_operation("built-in call", "missing argument").into()),
    }
}

fn type_arg(ty: Option<&Type>, builtin: Builtin) -> ExecResult<&Type> {
    ty.ok_or_else(|| invalid_operation(builtin.name(), "missing type argument").into())
}

fn length(value: &Value, builtin: Builtin) -> ExecResult<usize> {
    Ok(match value.unwrap_named() {
        Value::Str(s) => s.len(),
        Value::Slice(s) => s.len(),
        Value::Array(a) => a.len(),
        Value::Map(m) => m.len(),
        Value::Chan(Some(c)) => c.len(),
        Value::Chan(None) | Value::Nil => 0,
        other => return Err(invalid_operation(builtin.name(), other.kind_name()).into()),
    })
}

fn capacity(value: &Value) -> ExecResult<usize> {
    Ok(match value.unwrap_named() {
        Value::Slice(s) => s.cap(),
        Value::Array(a) => a.len(),
        Value::Chan(Some(c)) => c.cap(),
        Value::Chan(None) | Value::Nil => 0,
        other => return Err(invalid_operation("cap", other.kind_name()).into()),
    })
}

/// Elements of a spread argument: a slice, or the bytes of a string.
pub(crate) fn expand_spread(mut args: Vec<Value>) -> ExecResult<Vec<Value>> {
    let Some(last) = args.pop() else {
        return Ok(args);
    };
    match last.unwrap_named() {
        Value::Slice(slice) => args.extend(slice.to_vec()),
        Value::Str(s) => args.extend(s.bytes().map(|b| Value::int_of(IntKind::Uint8, b.into()))),
        Value::Nil => {}
        other => return Err(invalid_operation("...", other.kind_name()).into()),
    }
    Ok(args)
}

fn copy_elements(dst: &Value, src: &Value) -> ExecResult<usize> {
    let Value::Slice(dst) = dst.unwrap_named() else {
        return Err(invalid_operation("copy", dst.kind_name()).into());
    };
    let items = match src.unwrap_named() {
        Value::Slice(src) => src.to_vec(),
        Value::Str(s) => s
            .bytes()
            .map(|b| Value::int_of(IntKind::Uint8, b.into()))
            .collect(),
        Value::Nil => Vec::new(),
        other => return Err(invalid_operation("copy", other.kind_name()).into()),
    };
    let count = items.len().min(dst.len());
    for (i, item) in items.into_iter().take(count).enumerate() {
        dst.set(i, item.copy_value());
    }
    Ok(count)
}

fn make_complex(re: &Value, im: &Value) -> ExecResult<Value> {
    let part = |v: &Value| -> ExecResult<(f64, bool)> {
        match v.unwrap_named() {
            Value::Float32(f) => Ok((f64::from(*f), true)),
            Value::Float64(f) => Ok((*f, false)),
            Value::Int(i) => Ok((i.as_f64(), false)),
            other => Err(invalid_operation("complex", other.kind_name()).into()),
        }
    };
    let (re, re_single) = part(re)?;
    let (im, im_single) = part(im)?;
    let value = Complex::new(re, im);
    Ok(if re_single || im_single {
        Value::Complex64(value.narrow())
    } else {
        Value::Complex128(value)
    })
}

/// `max`/`min`. A NaN operand makes the result NaN.
fn extremum(args: Vec<Value>, want_max: bool) -> ExecResult<Value> {
    let mut args = args.into_iter();
    let Some(mut best) = args.next() else {
        return Err(runtime_panic("max/min of no values"));
    };
    for candidate in args {
        if is_nan(&best) {
            break;
        }
        if is_nan(&candidate) {
            best = candidate;
            continue;
        }
        let op = if want_max { BinaryOp::Gt } else { BinaryOp::Lt };
        if evaluate_binary(op, &candidate, &best)?.as_bool() == Some(true) {
            best = candidate;
        }
    }
    Ok(best)
}

fn is_nan(value: &Value) -> bool {
    match value.unwrap_named() {
        Value::Float32(f) => f.is_nan(),
        Value::Float64(f) => f.is_nan(),
        _ => false,
    }
}
