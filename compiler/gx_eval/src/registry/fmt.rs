//! `fmt`: printing and formatting.

use super::{str_arg, HostPackage};
use crate::value::Value;

pub(super) fn package() -> HostPackage {
    HostPackage::new("fmt")
        .with_func("Print", |vm, args| {
            let text = vm.sprint(&args)?;
            vm.print_handler().write(&text);
            Ok(Vec::new())
        })
        .with_func("Println", |vm, args| {
            let text = vm.format_operands(&args, true)?;
            vm.print_handler().write_line(&text);
            Ok(Vec::new())
        })
        .with_func("Printf", |vm, args| {
            let format = str_arg("fmt.Printf", &args, 0)?.to_string();
            let text = vm.sprintf(&format, &args[1..])?;
            vm.print_handler().write(&text);
            Ok(Vec::new())
        })
        .with_func("Sprint", |vm, args| {
            Ok(vec![Value::string(&vm.sprint(&args)?)])
        })
        .with_func("Sprintln", |vm, args| {
            Ok(vec![Value::string(&vm.sprintln(&args)?)])
        })
        .with_func("Sprintf", |vm, args| {
            let format = str_arg("fmt.Sprintf", &args, 0)?.to_string();
            Ok(vec![Value::string(&vm.sprintf(&format, &args[1..])?)])
        })
        .with_func("Errorf", |vm, args| {
            let format = str_arg("fmt.Errorf", &args, 0)?.to_string();
            Ok(vec![Value::error(&vm.sprintf(&format, &args[1..])?)])
        })
}
