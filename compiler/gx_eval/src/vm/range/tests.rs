use pretty_assertions::assert_eq;

use super::*;
use crate::value::ArrayValue;

fn drain(cursor: &mut RangeCursor) -> Vec<(Value, Value)> {
    let mut out = Vec::new();
    while let Ok(Some(pair)) = cursor.advance() {
        out.push(pair);
    }
    out
}

#[test]
fn string_yields_byte_offsets_and_runes() {
    let heap = Heap::new();
    let mut cursor = RangeCursor::new(RangeKind::Str, &Value::string("aé!"), &heap).unwrap();
    let pairs = drain(&mut cursor);
    let offsets: Vec<i64> = pairs
        .iter()
        .map(|(k, _)| k.as_int().unwrap().as_i64())
        .collect();
    assert_eq!(offsets, vec![0, 1, 3]);
    assert_eq!(pairs[1].1.as_int().unwrap().as_i64(), 0xe9);
}

#[test]
fn slice_length_is_fixed_at_start() {
    let heap = Heap::new();
    let slice = SliceValue::from_vec(vec![Value::int(1), Value::int(2)]);
    let mut cursor =
        RangeCursor::new(RangeKind::Indexed, &Value::Slice(slice.clone()), &heap).unwrap();
    let _grown = slice.append(vec![Value::int(3)]);
    assert_eq!(drain(&mut cursor).len(), 2);
}

#[test]
fn map_skips_deleted_keys() {
    let heap = Heap::new();
    let map = MapValue::new();
    for i in 0..3 {
        let key = Value::int(i);
        map.insert(MapKey::from_value(&key).unwrap(), key, Value::int(i * 10))
            .unwrap();
    }
    let mut cursor = RangeCursor::new(RangeKind::Map, &Value::Map(map.clone()), &heap).unwrap();
    let first = cursor.advance().unwrap().unwrap();
    let remaining: Vec<MapKey> = map
        .keys()
        .into_iter()
        .filter(|k| *k != MapKey::from_value(&first.0).unwrap())
        .collect();
    map.remove(&remaining[0]);
    assert_eq!(drain(&mut cursor).len(), 1);
}

#[test]
fn int_range_counts_up() {
    let heap = Heap::new();
    let mut cursor = RangeCursor::new(RangeKind::Int, &Value::int(3), &heap).unwrap();
    let keys: Vec<i64> = drain(&mut cursor)
        .iter()
        .map(|(k, _)| k.as_int().unwrap().as_i64())
        .collect();
    assert_eq!(keys, vec![0, 1, 2]);
}

#[test]
fn closed_channel_drains_then_stops() {
    let heap = Heap::new();
    let chan = ChanValue::new(2, Value::int(0));
    chan.send(Value::int(7)).unwrap();
    chan.close().unwrap();
    let mut cursor = RangeCursor::new(RangeKind::Chan, &Value::Chan(Some(chan)), &heap).unwrap();
    assert_eq!(drain(&mut cursor).len(), 1);
}

#[test]
fn open_empty_channel_is_deadlock() {
    let heap = Heap::new();
    let chan = ChanValue::new(1, Value::int(0));
    let mut cursor = RangeCursor::new(RangeKind::Chan, &Value::Chan(Some(chan)), &heap).unwrap();
    assert!(cursor.advance().is_err());
}

#[test]
fn array_pointer_ranges_over_the_live_array() {
    let mut heap = Heap::new();
    let p = heap.alloc(Value::Array(ArrayValue::new(vec![Value::int(1), Value::int(2)])));
    let mut cursor =
        RangeCursor::new(RangeKind::Indexed, &Value::Pointer(Some(p.clone())), &heap).unwrap();
    let Value::Array(array) = p.load().unwrap() else {
        panic!("array cell");
    };
    assert!(array.set(1, Value::int(5)));
    let values: Vec<Value> = drain(&mut cursor).into_iter().map(|(_, v)| v).collect();
    assert_eq!(values, vec![Value::int(1), Value::int(5)]);
}
