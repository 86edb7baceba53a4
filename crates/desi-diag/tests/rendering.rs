use desi_ast::span::{Pos, Span};
use desi_diag::{Diag, Domain, Level};

const UNTERMINATED: &str = "def main() -> int:\n  let s = \"abc\n  return 0\n";

#[test]
fn unterminated_string_full_render() {
    let diag = Diag::from_catalog(
        Level::Error,
        Domain::Lexer,
        "unterminated_string",
        "DLE0001",
        "unterminated string literal",
    )
    .in_file("demo.desi")
    .at(Pos::new(2, 11));

    let text = diag.render(Some(UNTERMINATED));
    assert!(text.starts_with("error[DLE0001]: unterminated string literal\n"));
    assert!(text.contains("--> demo.desi:2:11"));
    assert!(text.contains("2 |   let s = \"abc\n"));

    // caret at the opening quote, underline extended to end of line:
    // gutter "  | " is 4 columns, the quote sits at source column 11.
    let caret_line = text.lines().find(|l| l.contains('^')).expect("caret line");
    assert_eq!(caret_line.find('^'), Some(4 + 10));
    assert_eq!(caret_line.matches('^').count(), 4);

    assert!(text.contains("help(machine-applicable): insert a closing quote"));
    // patched preview shows the closing quote appended at end of line
    assert!(text.contains("2 |   let s = \"abc\"\n"));
    let plus_line = text.lines().find(|l| l.contains('+')).expect("plus line");
    assert_eq!(plus_line.find('+'), Some(4 + 14));
}

#[test]
fn display_is_one_line_with_position() {
    let diag = Diag::error("unexpected token")
        .in_file("demo.desi")
        .at(Pos::new(3, 1));
    assert_eq!(diag.to_string(), "demo.desi:3:1: unexpected token");
}

#[test]
fn display_without_span_is_bare_title() {
    let diag = Diag::error("import cycle detected involving a.desi");
    assert_eq!(diag.to_string(), "import cycle detected involving a.desi");
}

#[test]
fn tabs_expand_to_four_columns() {
    let src = "\tlet x = 1\n";
    let diag = Diag::error("demo").in_file("t.desi").at(Pos::new(1, 2));
    let text = diag.render(Some(src));
    // the tab expands to four spaces in the preview line
    assert!(text.contains("1 |     let x = 1\n"));
    // `let` starts at display column 5, so the caret lands there
    let caret_line = text.lines().find(|l| l.contains('^')).expect("caret line");
    assert_eq!(caret_line.find('^'), Some(4 + 4));
}

#[test]
fn secondary_label_on_other_line_gets_mini_block() {
    let src = "def f() -> int:\n  return 1\ndef f() -> int:\n  return 2\n";
    let diag = Diag::error("duplicate function definition")
        .with_code("DTE0005")
        .in_file("dup.desi")
        .at(Pos::new(3, 5))
        .label(Span::at(Pos::new(1, 5)), "first definition here");

    let text = diag.render(Some(src));
    assert!(text.contains("3 | def f() -> int:"));
    assert!(text.contains("1 | def f() -> int:"));
    assert!(text.contains("- first definition here"));
}

#[test]
fn warning_renders_without_source() {
    let diag = Diag::warning("unused variable or parameter \"x\"").with_code("W0001");
    let text = diag.render_short();
    assert!(text.starts_with("warning[W0001]: unused variable"));
}

#[test]
fn help_from_catalog_is_included() {
    let diag = Diag::from_catalog(
        Level::Error,
        Domain::Type,
        "immutable_assign",
        "DTE0004",
        "cannot assign to immutable variable",
    )
    .in_file("m.desi")
    .at(Pos::new(1, 1));
    let text = diag.render(Some("x := 2\n"));
    assert!(text.contains("= help: declare the variable with `let mut`"));
}
