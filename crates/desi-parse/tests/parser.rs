use desi_ast::ast::{BinOp, Decl, Expr, Stmt, UnOp};
use desi_ast::dump;
use desi_parse::parse_str;

fn parse_main_body(body: &str) -> Vec<Stmt> {
    let mut src = String::from("def main() -> int:\n");
    for line in body.lines() {
        src.push_str("  ");
        src.push_str(line);
        src.push('\n');
    }
    let file = parse_str("<mem>", &src).expect("parse ok");
    let Decl::Func(fun) = &file.decls[0];
    fun.body.clone()
}

fn first_expr(body: &str) -> Expr {
    match parse_main_body(body).into_iter().next().expect("statement") {
        Stmt::Expr { expr } => expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

#[test]
fn exprs_in_function() {
    let src = "def f(a: i32) -> i32:\n  let mut x = 1 + 2 * 3\n  x := (x + 1) * 2\n  return x\n";
    let file = parse_str("<mem>", src).expect("parse ok");
    assert_eq!(file.decls.len(), 1);
    let Decl::Func(fun) = &file.decls[0];
    assert_eq!(fun.name, "f");
    assert_eq!(fun.params.len(), 1);
    assert_eq!(fun.params[0].ty, "i32");
    assert_eq!(fun.ret, "i32");
    assert_eq!(fun.body.len(), 3);

    // let mut x = 1 + 2 * 3 — multiplication binds tighter
    let Stmt::Let {
        mutable,
        binds,
        values,
        ..
    } = &fun.body[0]
    else {
        panic!("stmt0 not let");
    };
    assert!(*mutable);
    assert_eq!(binds.len(), 1);
    assert_eq!(binds[0].name, "x");
    let Expr::Binary { op: BinOp::Add, rhs, .. } = &values[0] else {
        panic!("let value not +");
    };
    assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));

    // x := (x + 1) * 2
    let Stmt::Assign { names, values } = &fun.body[1] else {
        panic!("stmt1 not assign");
    };
    assert_eq!(names, &["x".to_string()]);
    assert!(matches!(&values[0], Expr::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn parallel_let_and_assign() {
    let src = "def g() -> void:\n  let a, b:int, c = 1, 2, 3\n  a, b := b, a\n  return\n";
    let file = parse_str("<mem>", src).expect("parse ok");
    let Decl::Func(fun) = &file.decls[0];
    assert_eq!(fun.body.len(), 3);

    let Stmt::Let { binds, values, .. } = &fun.body[0] else {
        panic!("stmt0 not let");
    };
    assert_eq!(binds.len(), 3);
    assert_eq!(binds[1].ty.as_deref(), Some("int"));
    assert_eq!(values.len(), 3);

    let Stmt::Assign { names, values } = &fun.body[1] else {
        panic!("stmt1 not assign");
    };
    assert_eq!(names, &["a".to_string(), "b".to_string()]);
    assert_eq!(values.len(), 2);

    assert!(matches!(&fun.body[2], Stmt::Return { value: None }));
}

#[test]
fn multivar_let_forms_parse() {
    for body in [
        "let a, b, c = 1, 2, 3",
        "let mut a, b, c = 1, 2, 3",
        "let (a:int, b, c:str) = 1, \"x\", \"y\"",
        "let (a, b): pair = 1, 2",
        "let a = 1, ",
    ] {
        let src = format!("def main() -> int:\n  {body}\n  return 0\n");
        parse_str("<mem>", &src).unwrap_or_else(|e| panic!("parse failed for {body:?}: {e}"));
    }
}

#[test]
fn short_assign_multi_parses() {
    let body = parse_main_body("a, b := 4, 5\nreturn 0");
    let Stmt::Assign { names, values } = &body[0] else {
        panic!("not assign");
    };
    assert_eq!(names.len(), 2);
    assert_eq!(values.len(), 2);
}

#[test]
fn pipe_binds_loosest() {
    let e = first_expr("1 |> f + 2\nreturn 0");
    let Expr::Binary { op: BinOp::Pipe, rhs, .. } = e else {
        panic!("expected |> at root");
    };
    assert!(matches!(*rhs, Expr::Binary { op: BinOp::Add, .. }));
}

#[test]
fn comparison_and_logic_precedence() {
    // (a < b) and (c == d) — `and` is looser than comparisons
    let e = first_expr("a < b and c == d\nreturn 0");
    let Expr::Binary { op: BinOp::And, lhs, rhs } = e else {
        panic!("expected and at root");
    };
    assert!(matches!(*lhs, Expr::Binary { op: BinOp::Lt, .. }));
    assert!(matches!(*rhs, Expr::Binary { op: BinOp::Eq, .. }));
}

#[test]
fn binary_ops_are_left_associative() {
    let e = first_expr("1 - 2 - 3\nreturn 0");
    let Expr::Binary { op: BinOp::Sub, lhs, .. } = e else {
        panic!("expected - at root");
    };
    assert!(matches!(*lhs, Expr::Binary { op: BinOp::Sub, .. }));
}

#[test]
fn unary_chains_parse() {
    let e = first_expr("not !-x\nreturn 0");
    let Expr::Unary { op: UnOp::Not, expr } = e else {
        panic!("expected not at root");
    };
    let Expr::Unary { op: UnOp::Bang, expr } = *expr else {
        panic!("expected ! under not");
    };
    assert!(matches!(*expr, Expr::Unary { op: UnOp::Neg, .. }));
}

#[test]
fn postfix_chain_parses() {
    let e = first_expr("foo.bar(1, 2)[0]\nreturn 0");
    let Expr::Index { seq, .. } = e else {
        panic!("expected index at root");
    };
    let Expr::Call { callee, args } = *seq else {
        panic!("expected call under index");
    };
    assert_eq!(args.len(), 2);
    assert!(matches!(*callee, Expr::Field { .. }));
}

#[test]
fn call_accepts_trailing_comma() {
    let e = first_expr("f(1, 2,)\nreturn 0");
    let Expr::Call { args, .. } = e else {
        panic!("expected call");
    };
    assert_eq!(args.len(), 2);
}

#[test]
fn if_elif_else_structure() {
    let body =
        parse_main_body("if a:\n  x := 1\nelif b:\n  x := 2\nelif c:\n  x := 3\nelse:\n  x := 4\nreturn 0");
    let Stmt::If {
        then_,
        elifs,
        else_,
        ..
    } = &body[0]
    else {
        panic!("not if");
    };
    assert_eq!(then_.len(), 1);
    assert_eq!(elifs.len(), 2);
    assert_eq!(else_.as_ref().map(|b| b.len()), Some(1));
}

#[test]
fn while_and_defer_parse() {
    let body = parse_main_body("defer mem.free(s)\nwhile i < 3:\n  i := i + 1\nreturn 0");
    assert!(matches!(&body[0], Stmt::Defer { call: Expr::Call { .. } }));
    let Stmt::While { body: wbody, .. } = &body[1] else {
        panic!("not while");
    };
    assert_eq!(wbody.len(), 1);
}

#[test]
fn package_and_imports_parse() {
    let src = "package compiler.desi\nimport std.io\nimport util.strings\n\ndef main() -> int:\n  return 0\n";
    let file = parse_str("<mem>", src).expect("parse ok");
    assert_eq!(file.package.as_ref().map(|p| p.name.as_str()), Some("compiler.desi"));
    let paths: Vec<&str> = file.imports.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(paths, vec!["std.io", "util.strings"]);
    assert_eq!(file.decls.len(), 1);
}

#[test]
fn unexpected_top_level_tokens_are_skipped() {
    let src = "+ + what is this\ndef main() -> int:\n  return 0\n";
    let file = parse_str("<mem>", src).expect("parse ok");
    assert_eq!(file.decls.len(), 1);
}

#[test]
fn empty_input_parses_to_empty_file() {
    let file = parse_str("<mem>", "").expect("parse ok");
    assert!(file.package.is_none());
    assert!(file.decls.is_empty());
}

#[test]
fn unterminated_string_surfaces_lexer_code() {
    let src = "def main() -> int:\n  let s = \"abc\n  return 0\n";
    let err = parse_str("demo.desi", src).unwrap_err();
    assert_eq!(err.code.as_deref(), Some("DLE0001"));
    assert_eq!(err.to_string(), "demo.desi:2:11: unterminated string literal");
}

#[test]
fn missing_arrow_reports_expected_token() {
    let src = "def main():\n  return 0\n";
    let err = parse_str("<mem>", src).unwrap_err();
    assert_eq!(err.code.as_deref(), Some("DPE0002"));
    assert!(err.title.contains("expected ->"));
}

#[test]
fn parse_is_deterministic() {
    let src = "def add(a: int, b: int) -> int:\n  let s = a + b\n  return s\n\ndef main() -> int:\n  return add(1, 2)\n";
    let one = dump::outline(&parse_str("<mem>", src).expect("parse ok"));
    let two = dump::outline(&parse_str("<mem>", src).expect("parse ok"));
    assert_eq!(one, two);
    assert!(one.contains("def add(a: int, b: int) -> int"));
}

#[test]
fn group_type_annotation_is_captured() {
    let body = parse_main_body("let (a, b): int = 1, 2\nreturn 0");
    let Stmt::Let { group_ty, .. } = &body[0] else {
        panic!("not let");
    };
    assert_eq!(group_ty.as_deref(), Some("int"));
}
