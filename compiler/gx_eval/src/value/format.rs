//! Text rendering helpers shared by `print`, `println` and the `fmt` host
//! package: float and complex formatting, quoting, and `Printf` directive
//! parsing. Walking values (which may call `String()`/`Error()` methods)
//! happens in the VM.

use std::fmt::Write as _;

use super::Complex;

/// Shortest `%v` rendering of a float.
///
/// Uses exponent form when the decimal exponent is below -4 or at least 6
/// (`1e+06`, `1.5e-07`), plain decimal otherwise (`123456`, `0.001`).
pub fn format_float(value: f64, single: bool) -> String {
    if let Some(special) = special_float(value) {
        return special.to_string();
    }
    let sci = if single {
        format!("{:e}", value as f32)
    } else {
        format!("{value:e}")
    };
    let (mantissa, exp) = split_exponent(&sci);
    if !(-4..6).contains(&exp) {
        return format!("{mantissa}e{}", exponent_suffix(exp));
    }
    if single {
        format!("{}", value as f32)
    } else {
        format!("{value}")
    }
}

/// `%e`, `%E`, `%f`, `%F`, `%g`, `%G` with an optional precision.
pub fn format_float_verb(value: f64, verb: char, prec: Option<usize>, single: bool) -> String {
    if let Some(special) = special_float(value) {
        return special.to_string();
    }
    match verb {
        'e' | 'E' => {
            let prec = prec.unwrap_or(6);
            let sci = format!("{value:.prec$e}");
            let (mantissa, exp) = split_exponent(&sci);
            let out = format!("{mantissa}e{}", exponent_suffix(exp));
            if verb == 'E' {
                out.to_uppercase()
            } else {
                out
            }
        }
        'f' | 'F' => {
            let prec = prec.unwrap_or(6);
            format!("{value:.prec$}")
        }
        'G' => format_float_verb(value, 'g', prec, single).to_uppercase(),
        _ => match prec {
            None => format_float(value, single),
            Some(prec) => {
                let prec = prec.max(1);
                let sci = format!("{value:.*e}", prec - 1);
                let (_, exp) = split_exponent(&sci);
                if exp < -4 || exp >= prec as i32 {
                    let (mantissa, _) = split_exponent(&sci);
                    let mantissa = trim_fraction(mantissa);
                    format!("{mantissa}e{}", exponent_suffix(exp))
                } else {
                    let decimals = (prec as i32 - 1 - exp).max(0) as usize;
                    trim_fraction(&format!("{value:.decimals$}")).to_string()
                }
            }
        },
    }
}

/// `(re+imi)`.
pub fn format_complex(value: Complex, single: bool) -> String {
    let re = format_float(value.re, single);
    let im = format_float(value.im, single);
    let sign = if im.starts_with('-') || im.starts_with('+') {
        ""
    } else {
        "+"
    };
    format!("({re}{sign}{im}i)")
}

fn special_float(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value == f64::INFINITY {
        Some("+Inf")
    } else if value == f64::NEG_INFINITY {
        Some("-Inf")
    } else {
        None
    }
}

fn split_exponent(sci: &str) -> (&str, i32) {
    match sci.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse().unwrap_or(0)),
        None => (sci, 0),
    }
}

fn exponent_suffix(exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{sign}{:02}", exp.unsigned_abs())
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Double-quoted string literal with escapes (`%q`).
pub fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        push_escaped(&mut out, c, '"');
    }
    out.push('"');
    out
}

/// Single-quoted rune literal (`%q` on integers).
pub fn quote_rune(c: char) -> String {
    let mut out = String::with_capacity(4);
    out.push('\'');
    push_escaped(&mut out, c, '\'');
    out.push('\'');
    out
}

fn push_escaped(out: &mut String, c: char, quote: char) {
    match c {
        '\x07' => out.push_str("\\a"),
        '\x08' => out.push_str("\\b"),
        '\x0c' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\x0b' => out.push_str("\\v"),
        '\\' => out.push_str("\\\\"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c if c.is_control() => {
            let code = c as u32;
            if code < 0x80 {
                let _ = write!(out, "\\x{code:02x}");
            } else {
                let _ = write!(out, "\\u{code:04x}");
            }
        }
        c => out.push(c),
    }
}

/// One `%` directive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Directive {
    pub minus: bool,
    pub plus: bool,
    pub sharp: bool,
    pub space: bool,
    pub zero: bool,
    pub width: Option<usize>,
    pub prec: Option<usize>,
    pub verb: char,
}

impl Directive {
    /// A bare `%v`.
    pub fn plain(verb: char) -> Self {
        Directive {
            verb,
            ..Directive::default()
        }
    }

    /// Apply width padding.
    pub fn pad(&self, text: String) -> String {
        let Some(width) = self.width else {
            return text;
        };
        let len = text.chars().count();
        if len >= width {
            return text;
        }
        let fill = width - len;
        if self.minus {
            return text + &" ".repeat(fill);
        }
        if self.zero && !matches!(self.verb, 's' | 'q' | 'v' | 'c' | 't') {
            let (sign, digits) = match text.strip_prefix('-') {
                Some(rest) => ("-", rest.to_string()),
                None => match text.strip_prefix('+') {
                    Some(rest) => ("+", rest.to_string()),
                    None => ("", text),
                },
            };
            return format!("{sign}{}{digits}", "0".repeat(fill));
        }
        " ".repeat(fill) + &text
    }
}

/// A piece of a `Printf` format string.
#[derive(Clone, Debug, PartialEq)]
pub enum Piece {
    Literal(String),
    Verb(Directive),
}

/// Split a format string into literals and directives. `%%` becomes a
/// literal percent; a trailing lone `%` is kept as text.
pub fn parse_format(format: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            literal.push('%');
            continue;
        }
        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.minus = true,
                '+' => directive.plus = true,
                '#' => directive.sharp = true,
                ' ' => directive.space = true,
                '0' => directive.zero = true,
                _ => break,
            }
            chars.next();
        }
        directive.width = take_number(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            directive.prec = Some(take_number(&mut chars).unwrap_or(0));
        }
        match chars.next() {
            Some(verb) => {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                directive.verb = verb;
                pieces.push(Piece::Verb(directive));
            }
            None => literal.push('%'),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0) * 10 + digit as usize);
        chars.next();
    }
    value
}

#[cfg(test)]
mod tests;
