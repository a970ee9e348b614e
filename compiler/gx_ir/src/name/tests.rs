use super::*;

#[test]
fn raw_round_trip() {
    let name = Name::from_raw(42);
    assert_eq!(name.raw(), 42);
    assert_eq!(name.index(), 42);
}

#[test]
fn empty_is_default() {
    assert_eq!(Name::default(), Name::EMPTY);
}

#[test]
fn debug_shows_index() {
    assert_eq!(format!("{:?}", Name::from_raw(7)), "Name(7)");
}
