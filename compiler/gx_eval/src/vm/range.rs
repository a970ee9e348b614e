//! Range cursors.

use std::rc::Rc;

use gx_ir::IntKind;

use crate::errors::{deadlock, invalid_operation, nil_dereference, ExecResult};
use crate::flow::RangeKind;
use crate::heap::Heap;
use crate::value::{ArrayValue, ChanValue, MapKey, MapValue, SliceValue, TryRecv, Value};

/// Iteration state of one `for ... range` loop.
///
/// The ranged expression is evaluated once; slices keep the length they had
/// when the loop started, arrays are iterated over a copy, and maps over a
/// snapshot of their keys (entries deleted during iteration are skipped).
#[derive(Debug)]
pub enum RangeCursor {
    Slice {
        source: SliceValue,
        next: usize,
    },
    Array {
        source: ArrayValue,
        next: usize,
    },
    Str {
        text: Rc<str>,
        offset: usize,
    },
    Map {
        map: MapValue,
        keys: Vec<MapKey>,
        next: usize,
    },
    Int {
        kind: IntKind,
        next: i128,
        end: i128,
    },
    Chan(ChanValue),
    Empty,
}

impl RangeCursor {
    pub fn new(kind: RangeKind, value: &Value, heap: &Heap) -> ExecResult<Self> {
        let value = value.unwrap_named();
        Ok(match (kind, value) {
            (_, Value::Slice(slice)) => RangeCursor::Slice {
                source: slice.clone(),
                next: 0,
            },
            (_, Value::Array(array)) => RangeCursor::Array {
                source: array.deep_copy(),
                next: 0,
            },
            (_, Value::Pointer(Some(addr))) => match heap.load(addr)? {
                Value::Array(array) => RangeCursor::Array {
                    source: array,
                    next: 0,
                },
                other => return Err(invalid_operation("range", other.kind_name()).into()),
            },
            (_, Value::Pointer(None)) => return Err(nil_dereference()),
            (_, Value::Str(text)) => RangeCursor::Str {
                text: Rc::clone(text),
                offset: 0,
            },
            (_, Value::Map(map)) => RangeCursor::Map {
                map: map.clone(),
                keys: map.keys(),
                next: 0,
            },
            (_, Value::Int(end)) => RangeCursor::Int {
                kind: end.kind(),
                next: 0,
                end: end.as_i128(),
            },
            (RangeKind::Int, Value::Float64(end)) if end.fract() == 0.0 => RangeCursor::Int {
                kind: IntKind::Int,
                next: 0,
                end: *end as i128,
            },
            (_, Value::Chan(Some(chan))) => RangeCursor::Chan(chan.clone()),
            (_, Value::Chan(None)) => return Err(deadlock().into()),
            (_, Value::Nil) => RangeCursor::Empty,
            (_, other) => return Err(invalid_operation("range", other.kind_name()).into()),
        })
    }

    /// Next `(key, value)` pair, or `None` when exhausted.
    pub fn advance(&mut self) -> ExecResult<Option<(Value, Value)>> {
        Ok(match self {
            RangeCursor::Slice { source, next } => {
                if *next >= source.len() {
                    return Ok(None);
                }
                let index = *next;
                *next += 1;
                source
                    .get(index)
                    .map(|item| (Value::int(index as i64), item))
            }
            RangeCursor::Array { source, next } => {
                if *next >= source.len() {
                    return Ok(None);
                }
                let index = *next;
                *next += 1;
                source
                    .get(index)
                    .map(|item| (Value::int(index as i64), item))
            }
            RangeCursor::Str { text, offset } => {
                let Some(rest) = text.get(*offset..) else {
                    return Ok(None);
                };
                let Some(ch) = rest.chars().next() else {
                    return Ok(None);
                };
                let start = *offset;
                *offset += ch.len_utf8();
                Some((
                    Value::int(start as i64),
                    Value::int_of(IntKind::Int32, i128::from(u32::from(ch))),
                ))
            }
            RangeCursor::Map { map, keys, next } => loop {
                let Some(key) = keys.get(*next) else {
                    return Ok(None);
                };
                *next += 1;
                if let Some(entry) = map.entry(key) {
                    break Some(entry);
                }
            },
            RangeCursor::Int { kind, next, end } => {
                if *next >= *end {
                    return Ok(None);
                }
                let value = Value::int_of(*kind, *next);
                *next += 1;
                Some((value, Value::Nil))
            }
            RangeCursor::Chan(chan) => match chan.try_recv() {
                TryRecv::Value(value) => Some((value, Value::Nil)),
                TryRecv::Closed => None,
                TryRecv::Empty => return Err(deadlock().into()),
            },
            RangeCursor::Empty => None,
        })
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
