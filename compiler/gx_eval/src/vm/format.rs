//! Value rendering for `print`, `println` and the `fmt` printers.

use std::cmp::Ordering;
use std::fmt::Write as _;

use super::Vm;
use crate::errors::ExecResult;
use crate::value::format::{
    format_complex, format_float, format_float_verb, parse_format, quote_rune, quote_str,
    Directive, Piece,
};
use crate::value::Value;

impl Vm {
    /// `%v` rendering of one value.
    pub fn format_value(&mut self, value: &Value) -> ExecResult<String> {
        let mut out = String::new();
        self.write_value(&mut out, value, false, true)?;
        Ok(out)
    }

    /// Operands of `print` (concatenated) or `println` (space separated).
    pub(crate) fn format_operands(&mut self, args: &[Value], spaced: bool) -> ExecResult<String> {
        let mut out = String::new();
        for (i, arg) in args.iter().enumerate() {
            if spaced && i > 0 {
                out.push(' ');
            }
            self.write_value(&mut out, arg, false, true)?;
        }
        Ok(out)
    }

    /// `Sprint`: a space separates operands when neither side is a string.
    pub fn sprint(&mut self, args: &[Value]) -> ExecResult<String> {
        let mut out = String::new();
        for (i, arg) in args.iter().enumerate() {
            if i > 0 && !is_string(&args[i - 1]) && !is_string(arg) {
                out.push(' ');
            }
            self.write_value(&mut out, arg, false, true)?;
        }
        Ok(out)
    }

    /// `Sprintln`: operands separated by spaces, newline appended.
    pub fn sprintln(&mut self, args: &[Value]) -> ExecResult<String> {
        let mut out = self.format_operands(args, true)?;
        out.push('\n');
        Ok(out)
    }

    /// `Sprintf`.
    pub fn sprintf(&mut self, format: &str, args: &[Value]) -> ExecResult<String> {
        let mut out = String::new();
        let mut next = 0;
        for piece in parse_format(format) {
            match piece {
                Piece::Literal(text) => out.push_str(&text),
                Piece::Verb(directive) => {
                    let Some(arg) = args.get(next) else {
                        let _ = write!(out, "%!{}(MISSING)", directive.verb);
                        continue;
                    };
                    next += 1;
                    let text = self.format_verb(&directive, arg)?;
                    out.push_str(&directive.pad(text));
                }
            }
        }
        if next < args.len() {
            out.push_str("%!(EXTRA ");
            for (i, arg) in args[next..].iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let rendered = self.format_value(arg)?;
                let _ = write!(out, "{}={rendered}", self.dynamic_type_name(arg));
            }
            out.push(')');
        }
        Ok(out)
    }

    fn format_verb(&mut self, directive: &Directive, arg: &Value) -> ExecResult<String> {
        let verb = directive.verb;
        let text = match (verb, arg.unwrap_named()) {
            ('v' | 'w', _) => {
                let mut out = String::new();
                self.write_value(&mut out, arg, directive.plus, true)?;
                out
            }
            ('T', _) => self.dynamic_type_name(arg),
            ('s', Value::Str(s)) => truncate(s, directive.prec),
            ('s', Value::Int(_) | Value::Float32(_) | Value::Float64(_) | Value::Bool(_)) => {
                self.bad_verb(verb, arg)?
            }
            ('s', _) => {
                let text = self.format_value(arg)?;
                truncate(&text, directive.prec)
            }
            ('q', Value::Str(s)) => quote_str(s),
            ('q', Value::Int(i)) => quote_rune(rune(i.as_i128())),
            ('c', Value::Int(i)) => rune(i.as_i128()).to_string(),
            ('t', Value::Bool(b)) => b.to_string(),
            ('d', Value::Int(i)) => signed(directive, i.to_string()),
            ('b', Value::Int(i)) => radix(i.as_i128(), 2, false, directive),
            ('o', Value::Int(i)) => radix(i.as_i128(), 8, false, directive),
            ('x', Value::Int(i)) => radix(i.as_i128(), 16, false, directive),
            ('X', Value::Int(i)) => radix(i.as_i128(), 16, true, directive),
            ('x' | 'X', Value::Str(s)) => {
                let mut out = String::with_capacity(s.len() * 2);
                for byte in s.bytes() {
                    if verb == 'x' {
                        let _ = write!(out, "{byte:02x}");
                    } else {
                        let _ = write!(out, "{byte:02X}");
                    }
                }
                out
            }
            ('e' | 'E' | 'f' | 'F' | 'g' | 'G', Value::Float64(f)) => {
                signed(directive, format_float_verb(*f, verb, directive.prec, false))
            }
            ('e' | 'E' | 'f' | 'F' | 'g' | 'G', Value::Float32(f)) => signed(
                directive,
                format_float_verb(f64::from(*f), verb, directive.prec, true),
            ),
            ('p', Value::Pointer(Some(addr))) => format!("0x{:x}", addr.addr().raw()),
            ('p', Value::Func(Some(_)) | Value::Chan(Some(_)) | Value::Map(_) | Value::Slice(_)) => {
                self.format_value(arg)?
            }
            _ => self.bad_verb(verb, arg)?,
        };
        Ok(text)
    }

    fn bad_verb(&mut self, verb: char, arg: &Value) -> ExecResult<String> {
        let rendered = self.format_value(arg)?;
        Ok(format!(
            "%!{verb}({}={rendered})",
            self.dynamic_type_name(arg)
        ))
    }

    fn write_value(
        &mut self,
        out: &mut String,
        value: &Value,
        plus: bool,
        top: bool,
    ) -> ExecResult {
        if let Some(text) = self.stringer(value)? {
            out.push_str(&text);
            return Ok(());
        }
        match value {
            Value::Nil | Value::Pointer(None) | Value::Func(None) | Value::Chan(None) => {
                out.push_str("<nil>");
            }
            Value::Bool(b) => {
                let _ = write!(out, "{b}");
            }
            Value::Int(i) => {
                let _ = write!(out, "{i}");
            }
            Value::Float32(f) => out.push_str(&format_float(f64::from(*f), true)),
            Value::Float64(f) => out.push_str(&format_float(*f, false)),
            Value::Complex64(c) => out.push_str(&format_complex(*c, true)),
            Value::Complex128(c) => out.push_str(&format_complex(*c, false)),
            Value::Str(s) => out.push_str(s),
            Value::Slice(slice) => self.write_seq(out, &slice.to_vec(), plus)?,
            Value::Array(array) => self.write_seq(out, &array.to_vec(), plus)?,
            Value::Map(map) => {
                let mut entries = map.entries();
                entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
                out.push_str("map[");
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    self.write_value(out, key, plus, false)?;
                    out.push(':');
                    self.write_value(out, item, plus, false)?;
                }
                out.push(']');
            }
            Value::Struct(st) => {
                let fields = st.fields.borrow().clone();
                out.push('{');
                for (i, (name, field)) in st.layout.names().iter().zip(&fields).enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    if plus {
                        out.push_str(self.interner.lookup(*name));
                        out.push(':');
                    }
                    self.write_value(out, field, plus, false)?;
                }
                out.push('}');
            }
            Value::Pointer(Some(addr)) => {
                let target = self.heap.load(addr)?;
                if top
                    && matches!(
                        target.unwrap_named(),
                        Value::Struct(_) | Value::Array(_) | Value::Slice(_) | Value::Map(_)
                    )
                {
                    out.push('&');
                    self.write_value(out, &target, plus, false)?;
                } else {
                    let _ = write!(out, "0x{:x}", addr.addr().raw());
                }
            }
            Value::Named(named) => self.write_value(out, &named.inner, plus, top)?,
            Value::Func(Some(func)) => {
                let _ = write!(out, "{func:?}");
            }
            Value::Chan(Some(chan)) => {
                let _ = write!(out, "0x{:x}", chan.id());
            }
            Value::Package(package) => {
                let _ = write!(out, "package {}", package.name);
            }
            Value::Error(err) => out.push_str(&err.message),
            Value::Cursor(_) => out.push_str("range"),
        }
        Ok(())
    }

    fn write_seq(&mut self, out: &mut String, items: &[Value], plus: bool) -> ExecResult {
        out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write_value(out, item, plus, false)?;
        }
        out.push(']');
        Ok(())
    }

    /// Result of an `Error()` or `String()` method in `value`'s method set.
    fn stringer(&mut self, value: &Value) -> ExecResult<Option<String>> {
        if matches!(value, Value::Error(_)) {
            return Ok(None);
        }
        let has_declared = match value {
            Value::Struct(st) => st.type_name.is_some(),
            Value::Named(_) => true,
            Value::Pointer(Some(_)) => true,
            _ => false,
        };
        if !has_declared {
            return Ok(None);
        }
        for method in [self.names.error_method, self.names.string_method] {
            if !self.has_method(value, method)? {
                continue;
            }
            let bound = match value {
                Value::Pointer(addr) => {
                    let target = self.heap.deref(addr.as_ref())?;
                    self.method_value(&target, Some(value.clone()), method)?
                }
                _ => self.method_value(value, None, method)?,
            };
            let Some(bound) = bound else {
                continue;
            };
            let results = self.call_value(&bound, Vec::new())?;
            if let Some(Value::Str(text)) = results.first().map(Value::unwrap_named) {
                return Ok(Some(text.to_string()));
            }
        }
        Ok(None)
    }
}

fn is_string(value: &Value) -> bool {
    matches!(value.unwrap_named(), Value::Str(_))
}

fn truncate(text: &str, prec: Option<usize>) -> String {
    match prec {
        Some(prec) => text.chars().take(prec).collect(),
        None => text.to_string(),
    }
}

fn rune(code: i128) -> char {
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn signed(directive: &Directive, text: String) -> String {
    if text.starts_with('-') {
        return text;
    }
    if directive.plus {
        format!("+{text}")
    } else if directive.space {
        format!(" {text}")
    } else {
        text
    }
}

fn radix(value: i128, base: u32, upper: bool, directive: &Directive) -> String {
    let magnitude = value.unsigned_abs();
    let digits = match (base, upper) {
        (2, _) => format!("{magnitude:b}"),
        (8, _) => format!("{magnitude:o}"),
        (16, false) => format!("{magnitude:x}"),
        _ => format!("{magnitude:X}"),
    };
    let prefix = match (directive.sharp, base, upper) {
        (false, ..) => "",
        (true, 2, _) => "0b",
        (true, 8, _) => "0",
        (true, 16, false) => "0x",
        (true, ..) => "0X",
    };
    let sign = if value < 0 { "-" } else { "" };
    signed(directive, format!("{sign}{prefix}{digits}"))
}

/// Order map keys for printing: numbers numerically, strings lexically,
/// anything else by kind.
fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a.unwrap_named(), b.unwrap_named()) {
        (Value::Int(x), Value::Int(y)) => x.as_i128().cmp(&y.as_i128()),
        (Value::Float64(x), Value::Float64(y)) => x.total_cmp(y),
        (Value::Float32(x), Value::Float32(y)) => x.total_cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => x.kind_name().cmp(y.kind_name()),
    }
}
