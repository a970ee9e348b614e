use gx_ir::SharedInterner;
use pretty_assertions::assert_eq;

use super::*;
use crate::config::VmConfig;
use crate::errors::Unwind;
use crate::print_handler::{buffer_handler, SharedPrintHandler};

struct Host {
    vm: Vm,
    output: SharedPrintHandler,
    registry: SymbolRegistry,
}

impl Host {
    fn new() -> Self {
        let output = buffer_handler();
        let config = VmConfig::builder().print_handler(output.clone()).build();
        Host {
            vm: Vm::new(config, SharedInterner::new()),
            output,
            registry: SymbolRegistry::with_defaults(),
        }
    }

    fn member(&self, path: &str, name: &str) -> Value {
        let interner = self.vm.interner().clone();
        self.registry
            .get(path)
            .unwrap()
            .handle(&interner)
            .member(interner.intern(name))
            .unwrap()
    }

    fn call(&mut self, path: &str, name: &str, args: Vec<Value>) -> ExecResult<Vec<Value>> {
        let func = self.member(path, name);
        self.vm.call_value(&func, args)
    }

    fn call_str(&mut self, path: &str, name: &str, args: Vec<Value>) -> String {
        let results = self.call(path, name, args).unwrap();
        results[0].as_str().unwrap().to_string()
    }
}

fn strs(values: &[&str]) -> Value {
    Value::slice(values.iter().map(|s| Value::string(s)).collect())
}

fn as_strs(value: &Value) -> Vec<String> {
    let Value::Slice(slice) = value else {
        panic!("expected slice, got {value:?}");
    };
    slice
        .to_vec()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn defaults_register_four_packages() {
    let registry = SymbolRegistry::with_defaults();
    assert_eq!(registry.len(), 4);
    for path in ["fmt", "strings", "math", "errors"] {
        assert!(registry.get(path).is_some(), "{path} missing");
    }
    assert!(SymbolRegistry::new().is_empty());
}

#[test]
fn custom_package_is_callable() {
    let mut host = Host::new();
    host.registry.register(
        "counter",
        HostPackage::new("counter").with_func("Double", |_, args| {
            let n = args[0].as_int().unwrap().as_i64();
            Ok(vec![Value::int(n * 2)])
        }),
    );
    let results = host.call("counter", "Double", vec![Value::int(21)]).unwrap();
    assert_eq!(results[0].as_int().unwrap().as_i64(), 42);
    let names: Vec<&str> = host.registry.get("counter").unwrap().member_names().collect();
    assert_eq!(names, vec!["Double"]);
}

#[test]
fn fmt_println_writes_line() {
    let mut host = Host::new();
    host.call("fmt", "Println", vec![Value::string("a"), Value::int(1)])
        .unwrap();
    assert_eq!(host.output.output(), "a 1\n");
}

#[test]
fn fmt_sprint_spaces_only_between_non_strings() {
    let mut host = Host::new();
    let text = host.call_str(
        "fmt",
        "Sprint",
        vec![Value::int(1), Value::int(2), Value::string("x"), Value::int(3)],
    );
    assert_eq!(text, "1 2x3");
}

#[test]
fn fmt_sprintf_verbs() {
    let mut host = Host::new();
    let text = host.call_str(
        "fmt",
        "Sprintf",
        vec![
            Value::string("%d|%5s|%-4d|%x|%q|%.2f|%t"),
            Value::int(7),
            Value::string("ab"),
            Value::int(3),
            Value::int(255),
            Value::string("hi"),
            Value::float(3.14159),
            Value::Bool(true),
        ],
    );
    assert_eq!(text, "7|   ab|3   |ff|\"hi\"|3.14|true");
}

#[test]
fn fmt_sprintf_reports_missing_and_extra() {
    let mut host = Host::new();
    let missing = host.call_str("fmt", "Sprintf", vec![Value::string("%d %d"), Value::int(1)]);
    assert_eq!(missing, "1 %!d(MISSING)");
    let extra = host.call_str(
        "fmt",
        "Sprintf",
        vec![Value::string("%d"), Value::int(1), Value::int(2)],
    );
    assert_eq!(extra, "1%!(EXTRA int=2)");
}

#[test]
fn fmt_errorf_builds_error() {
    let mut host = Host::new();
    let results = host
        .call("fmt", "Errorf", vec![Value::string("bad %s"), Value::string("input")])
        .unwrap();
    let Value::Error(err) = &results[0] else {
        panic!("expected error value");
    };
    assert_eq!(&*err.message, "bad input");
}

#[test]
fn strings_split_and_join() {
    let mut host = Host::new();
    let parts = host
        .call("strings", "Split", vec![Value::string("a,b,c"), Value::string(",")])
        .unwrap();
    assert_eq!(as_strs(&parts[0]), vec!["a", "b", "c"]);

    let empty = host
        .call("strings", "Split", vec![Value::string(""), Value::string(",")])
        .unwrap();
    assert_eq!(as_strs(&empty[0]), vec![""]);

    let chars = host
        .call("strings", "Split", vec![Value::string("héy"), Value::string("")])
        .unwrap();
    assert_eq!(as_strs(&chars[0]), vec!["h", "é", "y"]);

    let joined = host.call_str("strings", "Join", vec![strs(&["x", "y"]), Value::string("-")]);
    assert_eq!(joined, "x-y");
}

#[test]
fn strings_predicates_and_case() {
    let mut host = Host::new();
    let yes = host
        .call("strings", "HasPrefix", vec![Value::string("golang"), Value::string("go")])
        .unwrap();
    assert_eq!(yes[0].as_bool(), Some(true));
    let index = host
        .call("strings", "Index", vec![Value::string("chicken"), Value::string("dmr")])
        .unwrap();
    assert_eq!(index[0].as_int().unwrap().as_i64(), -1);
    assert_eq!(host.call_str("strings", "ToUpper", vec![Value::string("abc")]), "ABC");
    assert_eq!(host.call_str("strings", "TrimSpace", vec![Value::string("  x \n")]), "x");
}

#[test]
fn strings_repeat_negative_count_panics() {
    let mut host = Host::new();
    let err = host
        .call("strings", "Repeat", vec![Value::string("a"), Value::int(-1)])
        .unwrap_err();
    assert!(matches!(err, Unwind::Panic(_)));
    assert_eq!(
        host.call_str("strings", "Repeat", vec![Value::string("ab"), Value::int(3)]),
        "ababab"
    );
}

#[test]
fn math_functions_and_constants() {
    let mut host = Host::new();
    let root = host.call("math", "Sqrt", vec![Value::float(16.0)]).unwrap();
    assert!(matches!(root[0], Value::Float64(f) if f == 4.0));
    let max = host
        .call("math", "Max", vec![Value::float(f64::NAN), Value::float(1.0)])
        .unwrap();
    assert!(matches!(max[0], Value::Float64(f) if f.is_nan()));
    assert!(matches!(host.member("math", "Pi"), Value::Float64(f) if (f - std::f64::consts::PI).abs() < 1e-15));
}

#[test]
fn errors_new_requires_one_argument() {
    let mut host = Host::new();
    assert!(host.call("errors", "New", Vec::new()).is_err());
    let made = host.call("errors", "New", vec![Value::string("boom")]).unwrap();
    assert!(matches!(&made[0], Value::Error(err) if &*err.message == "boom"));
}
