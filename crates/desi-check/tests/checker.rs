use desi_check::{check_file, CheckError, Kind, Warning};
use desi_parse::parse_str;

fn check(src: &str) -> (Vec<CheckError>, Vec<Warning>) {
    let file = parse_str("<mem>", src).expect("parse ok");
    let (_info, errors, warnings) = check_file(&file);
    (errors, warnings)
}

fn check_clean(src: &str) -> Vec<Warning> {
    let (errors, warnings) = check(src);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    warnings
}

#[test]
fn immutable_assignment_is_rejected() {
    let (errors, _) = check("def f() -> int:\n  let x = 1\n  x := 2\n  return x\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "cannot assign to immutable variable \"x\""
    );
}

#[test]
fn let_arity_mismatch_is_reported() {
    let (errors, _) = check("def g() -> int:\n  let a, b = 1\n  return a\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "DTE0002: arity mismatch in grouped binding in let: names=2, values=1"
    );
}

#[test]
fn assignment_arity_mismatch_is_reported() {
    let (errors, _) = check("def g() -> int:\n  let mut a, b = 1, 2\n  a, b := 3\n  return a + b\n");
    assert!(errors
        .iter()
        .any(|e| matches!(e, CheckError::ArityMismatch { context: "assignment", names: 2, values: 1 })));
}

#[test]
fn duplicate_function_keeps_first_signature() {
    let src = "def f() -> int:\n  return 1\n\ndef f() -> str:\n  return \"x\"\n";
    let (errors, _) = check(src);
    // one duplicate error, plus the second body checking against the first
    // (int) signature and failing on its str return
    assert!(errors
        .iter()
        .any(|e| matches!(e, CheckError::DuplicateFunction { .. })));
    assert!(errors
        .iter()
        .any(|e| matches!(e, CheckError::ReturnKindMismatch { expected: Kind::Int, got: Kind::Str })));
}

#[test]
fn duplicate_local_in_same_scope() {
    let (errors, _) = check("def f() -> int:\n  let x = 1\n  let x = 2\n  return x\n");
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "redeclaration of \"x\""));
}

#[test]
fn shadowing_in_child_scope_is_allowed() {
    let warnings = check_clean(
        "def f(a: int) -> int:\n  let x = 1\n  if a:\n    let x = 2\n    io.println(x)\n  return x\n",
    );
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}

#[test]
fn undeclared_identifier_is_reported() {
    let (errors, _) = check("def f() -> int:\n  return y\n");
    assert_eq!(errors[0].to_string(), "use of undeclared identifier \"y\"");
}

#[test]
fn defer_must_be_top_level() {
    let (errors, _) = check(
        "def f(a: int) -> int:\n  if a:\n    defer io.println(a)\n  return 0\n",
    );
    assert!(errors.iter().any(|e| matches!(e, CheckError::DeferPlacement)));
}

#[test]
fn defer_requires_a_call() {
    let (errors, _) = check("def f() -> int:\n  let x = 1\n  defer x\n  return x\n");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], CheckError::DeferNotCall));
}

#[test]
fn top_level_defer_is_fine() {
    let warnings =
        check_clean("def f() -> int:\n  let s = \"x\" + \"y\"\n  defer mem.free(s)\n  return 0\n");
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}

#[test]
fn unreachable_code_warns_w0004() {
    let warnings = check_clean("def f() -> int:\n  return 1\n  io.println(2)\n");
    assert!(warnings.iter().any(|w| w.code == "W0004"));
}

#[test]
fn fallthrough_warns_w0006() {
    let warnings = check_clean("def f(a: int) -> int:\n  if a:\n    return 1\n");
    assert!(warnings.iter().any(|w| w.code == "W0006"));
}

#[test]
fn explicit_return_has_no_w0006() {
    let warnings = check_clean("def f() -> int:\n  return 0\n");
    assert!(!warnings.iter().any(|w| w.code == "W0006"));
}

#[test]
fn unused_bindings_warn_unless_underscored() {
    let warnings = check_clean("def f(a: int, _b: int) -> int:\n  let c = 2\n  return 1\n");
    let unused: Vec<&str> = warnings
        .iter()
        .filter(|w| w.code == "W0001")
        .map(|w| w.msg.as_str())
        .collect();
    assert_eq!(
        unused,
        vec![
            "unused variable or parameter \"a\"",
            "unused variable or parameter \"c\"",
        ]
    );
}

#[test]
fn println_rejects_void_arguments() {
    let src = "def v() -> void:\n  return\n\ndef f() -> int:\n  io.println(v())\n  return 0\n";
    let (errors, _) = check(src);
    assert_eq!(errors[0].to_string(), "io.println arg 1 is void (no value)");
}

#[test]
fn shim_contracts_are_enforced() {
    let (errors, _) = check("def f() -> int:\n  let s = fs.read_all(7)\n  mem.free(s)\n  return 0\n");
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "fs.read_all: path must be str, got int"));

    let (errors, _) = check("def f() -> int:\n  return str.at(\"abc\")\n");
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "str.at: want 2 args (str, int), got 1"));

    let (errors, _) = check("def f() -> int:\n  return str.len(3)\n");
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "str.len: arg must be str, got int"));
}

#[test]
fn write_all_returns_int_and_checks_kinds() {
    let warnings = check_clean(
        "def f() -> int:\n  let rc = fs.write_all(\"out.txt\", \"data\")\n  return rc\n",
    );
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let (errors, _) = check("def f() -> int:\n  return fs.write_all(\"p\", 3)\n");
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "fs.write_all: data must be str, got int"));
}

#[test]
fn user_call_arity_and_kinds() {
    let src = "def add(a: int, b: int) -> int:\n  return a + b\n\ndef main() -> int:\n  return add(1)\n";
    let (errors, _) = check(src);
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "call to add: want 2 args, got 1"));

    let src = "def add(a: int, b: int) -> int:\n  return a + b\n\ndef main() -> int:\n  return add(1, \"x\")\n";
    let (errors, _) = check(src);
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "call to add: arg 2 kind mismatch (want int, got str)"));
}

#[test]
fn unknown_function_is_reported() {
    let (errors, _) = check("def main() -> int:\n  return missing(1)\n");
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "call to unknown function \"missing\""));
}

#[test]
fn assignment_refines_unknown_kinds() {
    // `h` returns an unmapped annotation, so `u` starts unknown; the first
    // assignment refines it to int and the second then clashes.
    let src = "def h() -> widget:\n  return 0\n\ndef main() -> int:\n  let mut u = h()\n  u := 1\n  u := \"s\"\n  return 0\n";
    let (errors, _) = check(src);
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "type mismatch: \"u\" is int but assigned str"));
}

#[test]
fn conditions_must_be_bool_or_int() {
    let (errors, _) = check("def f() -> int:\n  let s = \"x\"\n  while s:\n    io.println(s)\n  return 0\n");
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "while-condition must be bool/int, got str"));
}

#[test]
fn return_kind_mismatch_is_reported() {
    let (errors, _) = check("def f() -> int:\n  return \"x\"\n");
    assert_eq!(
        errors[0].to_string(),
        "return kind mismatch: have int, got str"
    );
}

#[test]
fn bool_returns_satisfy_int_functions() {
    let warnings = check_clean("def f() -> int:\n  return true\n");
    assert!(warnings.is_empty());
}

#[test]
fn void_function_rules() {
    let (errors, _) = check("def f() -> void:\n  return 1\n");
    assert_eq!(errors[0].to_string(), "return value in function returning void");

    let (errors, _) = check("def f() -> int:\n  return\n");
    assert_eq!(
        errors[0].to_string(),
        "missing return value; function returns int"
    );
}

#[test]
fn string_concat_types_as_str() {
    let warnings = check_clean(
        "def f() -> str:\n  let s = \"a\" + \"b\"\n  return s\n",
    );
    assert!(warnings.is_empty());

    let (errors, _) = check("def f() -> int:\n  let s = \"a\" + \"b\"\n  return s\n");
    assert!(errors
        .iter()
        .any(|e| e.to_string() == "return kind mismatch: have int, got str"));
}
