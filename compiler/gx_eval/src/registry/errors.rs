//! `errors`.

use super::{expect_args, str_arg, HostPackage};
use crate::value::Value;

pub(super) fn package() -> HostPackage {
    HostPackage::new("errors").with_func("New", |_, args| {
        expect_args("errors.New", &args, 1)?;
        Ok(vec![Value::error(str_arg("errors.New", &args, 0)?)])
    })
}
