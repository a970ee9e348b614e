//! `strings`.

use super::{expect_args, int_arg, str_arg, HostPackage};
use crate::errors::{invalid_operation, Unwind};
use crate::value::{SliceValue, Value};

pub(super) fn package() -> HostPackage {
    HostPackage::new("strings")
        .with_func("Contains", |_, args| {
            expect_args("strings.Contains", &args, 2)?;
            let (s, sub) = (str_arg("strings.Contains", &args, 0)?, str_arg("strings.Contains", &args, 1)?);
            Ok(vec![Value::Bool(s.contains(sub))])
        })
        .with_func("HasPrefix", |_, args| {
            expect_args("strings.HasPrefix", &args, 2)?;
            let (s, prefix) = (str_arg("strings.HasPrefix", &args, 0)?, str_arg("strings.HasPrefix", &args, 1)?);
            Ok(vec![Value::Bool(s.starts_with(prefix))])
        })
        .with_func("HasSuffix", |_, args| {
            expect_args("strings.HasSuffix", &args, 2)?;
            let (s, suffix) = (str_arg("strings.HasSuffix", &args, 0)?, str_arg("strings.HasSuffix", &args, 1)?);
            Ok(vec![Value::Bool(s.ends_with(suffix))])
        })
        .with_func("Index", |_, args| {
            expect_args("strings.Index", &args, 2)?;
            let (s, sub) = (str_arg("strings.Index", &args, 0)?, str_arg("strings.Index", &args, 1)?);
            let index = s.find(sub).map_or(-1, |i| i as i64);
            Ok(vec![Value::int(index)])
        })
        .with_func("Join", |_, args| {
            expect_args("strings.Join", &args, 2)?;
            let sep = str_arg("strings.Join", &args, 1)?;
            let parts = match args[0].unwrap_named() {
                Value::Slice(slice) => slice.to_vec(),
                Value::Nil => Vec::new(),
                other => return Err(invalid_operation("strings.Join", other.kind_name()).into()),
            };
            let mut out = String::new();
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push_str(sep);
                }
                let Some(part) = part.as_str() else {
                    return Err(invalid_operation("strings.Join", part.kind_name()).into());
                };
                out.push_str(part);
            }
            Ok(vec![Value::string(&out)])
        })
        .with_func("Repeat", |_, args| {
            expect_args("strings.Repeat", &args, 2)?;
            let s = str_arg("strings.Repeat", &args, 0)?;
            let count = int_arg("strings.Repeat", &args, 1)?;
            let Ok(count) = usize::try_from(count) else {
                return Err(Unwind::Panic(Value::string("strings: negative Repeat count")));
            };
            Ok(vec![Value::string(&s.repeat(count))])
        })
        .with_func("Split", |_, args| {
            expect_args("strings.Split", &args, 2)?;
            let s = str_arg("strings.Split", &args, 0)?;
            let sep = str_arg("strings.Split", &args, 1)?;
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::string(c.encode_utf8(&mut [0; 4]))).collect()
            } else {
                s.split(sep).map(Value::string).collect()
            };
            Ok(vec![Value::Slice(SliceValue::from_vec(parts))])
        })
        .with_func("ToLower", |_, args| {
            expect_args("strings.ToLower", &args, 1)?;
            Ok(vec![Value::string(&str_arg("strings.ToLower", &args, 0)?.to_lowercase())])
        })
        .with_func("ToUpper", |_, args| {
            expect_args("strings.ToUpper", &args, 1)?;
            Ok(vec![Value::string(&str_arg("strings.ToUpper", &args, 0)?.to_uppercase())])
        })
        .with_func("TrimSpace", |_, args| {
            expect_args("strings.TrimSpace", &args, 1)?;
            Ok(vec![Value::string(str_arg("strings.TrimSpace", &args, 0)?.trim())])
        })
        .with_func("Fields", |_, args| {
            expect_args("strings.Fields", &args, 1)?;
            let fields = str_arg("strings.Fields", &args, 0)?
                .split_whitespace()
                .map(Value::string)
                .collect();
            Ok(vec![Value::Slice(SliceValue::from_vec(fields))])
        })
        .with_func("Replace", |_, args| {
            expect_args("strings.Replace", &args, 4)?;
            let s = str_arg("strings.Replace", &args, 0)?;
            let old = str_arg("strings.Replace", &args, 1)?;
            let new = str_arg("strings.Replace", &args, 2)?;
            let count = int_arg("strings.Replace", &args, 3)?;
            let out = match usize::try_from(count) {
                Ok(count) => s.replacen(old, new, count),
                Err(_) => s.replace(old, new),
            };
            Ok(vec![Value::string(&out)])
        })
        .with_func("ReplaceAll", |_, args| {
            expect_args("strings.ReplaceAll", &args, 3)?;
            let s = str_arg("strings.ReplaceAll", &args, 0)?;
            let old = str_arg("strings.ReplaceAll", &args, 1)?;
            let new = str_arg("strings.ReplaceAll", &args, 2)?;
            Ok(vec![Value::string(&s.replace(old, new))])
        })
}
