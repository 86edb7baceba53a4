use desi_ast::ast::{Decl, Stmt};
use desi_parse::{map_kind, parse_ndjson, parse_source, ReplaySource, TokKind, Token, TokenSource};

fn row(kind: &str, text: &str, line: u32, col: u32) -> String {
    format!(
        "{{\"kind\":{},\"text\":{},\"line\":{},\"col\":{}}}",
        serde_json::to_string(kind).unwrap(),
        serde_json::to_string(text).unwrap(),
        line,
        col
    )
}

#[test]
fn keyword_rows_map_through_text() {
    assert_eq!(map_kind("KW", "def"), Some(TokKind::Def));
    assert_eq!(map_kind("KW", "defer"), Some(TokKind::Defer));
    assert_eq!(map_kind("KW", "nope"), None);
    assert_eq!(map_kind("ARROW", ""), Some(TokKind::Arrow));
    assert_eq!(map_kind("MYSTERY", ""), None);
}

#[test]
fn malformed_lines_are_counted_not_fatal() {
    let input = format!("{}\nnot json at all\n\n{}\n", row("KW", "def", 1, 1), row("EOF", "", 1, 4));
    let (rows, bad) = parse_ndjson(&input);
    assert_eq!(rows.len(), 2);
    assert_eq!(bad, 1);
}

#[test]
fn replayed_stream_parses_like_the_builtin_lexer() {
    // def main() -> int:
    //   return 0
    // ...with the block's final NEWLINE missing, as external streams do.
    let lines = vec![
        row("KW", "def", 1, 1),
        row("IDENT", "main", 1, 5),
        row("LPAREN", "", 1, 9),
        row("RPAREN", "", 1, 10),
        row("ARROW", "", 1, 12),
        row("IDENT", "int", 1, 15),
        row("COLON", "", 1, 18),
        row("NEWLINE", "", 1, 19),
        row("INDENT", "", 2, 3),
        row("KW", "return", 2, 3),
        row("INT", "0", 2, 10),
        row("DEDENT", "", 3, 1),
        row("EOF", "", 3, 1),
    ];
    let src = ReplaySource::from_ndjson(&lines.join("\n")).expect("replay source");
    let file = parse_source("<replay>", src).expect("parse ok");
    assert_eq!(file.decls.len(), 1);
    let Decl::Func(fun) = &file.decls[0];
    assert_eq!(fun.name, "main");
    assert!(matches!(fun.body[0], Stmt::Return { value: Some(_) }));
}

#[test]
fn newline_is_injected_before_dedent() {
    let lines = vec![
        row("INT", "1", 1, 1),
        row("DEDENT", "", 2, 1),
        row("EOF", "", 2, 1),
    ];
    let mut src = ReplaySource::from_ndjson(&lines.join("\n")).expect("replay source");
    let kinds = [
        src.next().kind,
        src.next().kind,
        src.next().kind,
        src.next().kind,
    ];
    assert_eq!(
        kinds,
        [TokKind::Int, TokKind::Newline, TokKind::Dedent, TokKind::Eof]
    );
}

#[test]
fn missing_eof_is_appended() {
    let lines = vec![row("INT", "7", 1, 1), row("NEWLINE", "", 1, 2)];
    let mut src = ReplaySource::from_ndjson(&lines.join("\n")).expect("replay source");
    let mut last = src.next();
    let mut steps = 0;
    while last.kind != TokKind::Eof && steps < 10 {
        last = src.next();
        steps += 1;
    }
    assert_eq!(last.kind, TokKind::Eof);
}

#[test]
fn err_row_aborts_replay() {
    let lines = vec![row("ERR", "unterminated string literal", 4, 9)];
    let err = ReplaySource::from_ndjson(&lines.join("\n")).unwrap_err();
    assert_eq!(err.to_string(), "4:9: unterminated string literal");
}

#[test]
fn unmapped_kind_aborts_replay() {
    let lines = vec![row("WEIRD", "", 1, 1)];
    let err = ReplaySource::from_ndjson(&lines.join("\n")).unwrap_err();
    assert!(err.to_string().contains("unmapped token kind"));
}

#[test]
fn drained_source_yields_eof_forever() {
    let mut src = ReplaySource::new(vec![Token::new(TokKind::Eof, 1, 1)]);
    assert_eq!(src.next().kind, TokKind::Eof);
    assert_eq!(src.next().kind, TokKind::Eof);
    assert_eq!(src.next().kind, TokKind::Eof);
}
