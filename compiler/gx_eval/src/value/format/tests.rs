use pretty_assertions::assert_eq;

use super::*;

#[test]
fn float_v_uses_exponent_outside_range() {
    assert_eq!(format_float(1_000_000.0, false), "1e+06");
    assert_eq!(format_float(123_456.0, false), "123456");
    assert_eq!(format_float(0.0001, false), "0.0001");
    assert_eq!(format_float(0.000_015, false), "1.5e-05");
    assert_eq!(format_float(3.0, false), "3");
    assert_eq!(format_float(2.5, false), "2.5");
}

#[test]
fn float_specials() {
    assert_eq!(format_float(f64::INFINITY, false), "+Inf");
    assert_eq!(format_float(f64::NAN, false), "NaN");
}

#[test]
fn float32_shortest_digits() {
    assert_eq!(format_float(f64::from(0.1f32), true), "0.1");
}

#[test]
fn float_verbs() {
    assert_eq!(format_float_verb(3.14159, 'f', Some(2), false), "3.14");
    assert_eq!(format_float_verb(1234.5678, 'e', Some(3), false), "1.235e+03");
    assert_eq!(format_float_verb(2.0, 'f', None, false), "2.000000");
}

#[test]
fn complex_rendering() {
    assert_eq!(format_complex(Complex::new(1.0, 2.0), false), "(1+2i)");
    assert_eq!(format_complex(Complex::new(1.5, -0.5), false), "(1.5-0.5i)");
}

#[test]
fn quoting() {
    assert_eq!(quote_str("a\"b\n"), "\"a\\\"b\\n\"");
    assert_eq!(quote_rune('x'), "'x'");
}

#[test]
fn parse_format_directives() {
    let pieces = parse_format("x=%-5d|%.2f%%");
    assert_eq!(
        pieces,
        vec![
            Piece::Literal("x=".to_string()),
            Piece::Verb(Directive {
                minus: true,
                width: Some(5),
                verb: 'd',
                ..Directive::default()
            }),
            Piece::Literal("|".to_string()),
            Piece::Verb(Directive {
                prec: Some(2),
                verb: 'f',
                ..Directive::default()
            }),
            Piece::Literal("%".to_string()),
        ]
    );
}

#[test]
fn padding() {
    let mut d = Directive::plain('d');
    d.width = Some(4);
    d.zero = true;
    assert_eq!(d.pad("-7".to_string()), "-007");
    d.zero = false;
    d.minus = true;
    assert_eq!(d.pad("ab".to_string()), "ab  ");
}
