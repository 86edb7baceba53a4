//! Replay adapter for externally produced token streams.
//!
//! An external lexer emits one NDJSON row per token:
//! `{"kind":"IDENT","text":"main","line":1,"col":5}`. Keywords arrive as
//! kind `KW` with the word in `text`; punctuation uses named kinds. This
//! module maps rows onto the built-in [`TokKind`] set and replays them
//! through the [`TokenSource`] seam, so the parser never knows the
//! difference.

use serde::Deserialize;

use desi_ast::span::Pos;
use desi_diag::Diag;

use crate::source::TokenSource;
use crate::token::{TokKind, Token};

#[derive(Debug, Clone, Deserialize)]
pub struct RawToken {
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub col: u32,
}

/// Parse NDJSON rows. Malformed lines are skipped; the count of skipped
/// lines is returned alongside the rows so callers can report it.
pub fn parse_ndjson(input: &str) -> (Vec<RawToken>, usize) {
    let mut rows = Vec::new();
    let mut bad = 0usize;
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawToken>(line) {
            Ok(row) => rows.push(row),
            Err(_) => bad += 1,
        }
    }
    (rows, bad)
}

/// Map an external (kind, text) pair onto a built-in token kind.
pub fn map_kind(kind: &str, text: &str) -> Option<TokKind> {
    if kind == "KW" {
        return TokKind::keyword(text);
    }
    Some(match kind {
        "IDENT" => TokKind::Ident,
        "INT" => TokKind::Int,
        "FLOAT" => TokKind::Float,
        "STR" => TokKind::Str,
        "NEWLINE" => TokKind::Newline,
        "INDENT" => TokKind::Indent,
        "DEDENT" => TokKind::Dedent,
        "EOF" => TokKind::Eof,
        "DOT" => TokKind::Dot,
        "LPAREN" => TokKind::LParen,
        "RPAREN" => TokKind::RParen,
        "LBRACK" => TokKind::LBrack,
        "RBRACK" => TokKind::RBrack,
        "COLON" => TokKind::Colon,
        "COMMA" => TokKind::Comma,
        "EQ" => TokKind::Eq,
        "ASSIGN" => TokKind::Assign,
        "ARROW" => TokKind::Arrow,
        "PLUS" => TokKind::Plus,
        "MINUS" => TokKind::Minus,
        "STAR" => TokKind::Star,
        "SLASH" => TokKind::Slash,
        "PERCENT" => TokKind::Percent,
        "PIPE" => TokKind::Pipe,
        "BANG" => TokKind::Bang,
        "LT" => TokKind::Lt,
        "LE" => TokKind::Le,
        "GT" => TokKind::Gt,
        "GE" => TokKind::Ge,
        "EQEQ" => TokKind::EqEq,
        "NE" => TokKind::Ne,
        _ => return None,
    })
}

/// Convert raw rows into parser tokens.
///
/// `ERR` rows and unmapped kinds abort with a diagnostic. A NEWLINE is
/// injected before any DEDENT whose predecessor is not already a NEWLINE
/// (blocks whose last line has no trailing newline), and a terminal EOF is
/// appended when the stream lacks one.
pub fn to_tokens(rows: &[RawToken]) -> Result<Vec<Token>, Diag> {
    let mut out: Vec<Token> = Vec::with_capacity(rows.len() + 2);
    for row in rows {
        if row.kind == "ERR" {
            return Err(Diag::error(row.text.clone()).at(Pos::new(row.line, row.col)));
        }
        let Some(kind) = map_kind(&row.kind, &row.text) else {
            return Err(Diag::error(format!(
                "unmapped token kind {:?} (text {:?}) at {}:{}",
                row.kind, row.text, row.line, row.col
            )));
        };
        if kind == TokKind::Dedent {
            if let Some(prev) = out.last() {
                if prev.kind != TokKind::Newline {
                    out.push(Token::new(TokKind::Newline, row.line, row.col));
                }
            }
        }
        let text = match kind {
            TokKind::Ident | TokKind::Int | TokKind::Float | TokKind::Str => row.text.clone(),
            _ => String::new(),
        };
        out.push(Token {
            kind,
            text,
            line: row.line,
            col: row.col,
        });
    }
    if out.last().map(|t| t.kind) != Some(TokKind::Eof) {
        let (line, col) = out.last().map(|t| (t.line, t.col)).unwrap_or((1, 1));
        out.push(Token::new(TokKind::Eof, line, col));
    }
    Ok(out)
}

/// Replays a pre-mapped token slice; once drained it yields EOF forever.
#[derive(Debug)]
pub struct ReplaySource {
    toks: Vec<Token>,
    i: usize,
}

impl ReplaySource {
    pub fn new(toks: Vec<Token>) -> Self {
        ReplaySource { toks, i: 0 }
    }

    /// Build a replay source straight from NDJSON text. Malformed lines are
    /// tolerated (the external stream may interleave logging).
    pub fn from_ndjson(input: &str) -> Result<Self, Diag> {
        let (rows, _bad) = parse_ndjson(input);
        Ok(ReplaySource::new(to_tokens(&rows)?))
    }
}

impl TokenSource for ReplaySource {
    fn next(&mut self) -> Token {
        if self.i >= self.toks.len() {
            let (line, col) = self.toks.last().map(|t| (t.line, t.col)).unwrap_or((1, 1));
            return Token::new(TokKind::Eof, line, col);
        }
        let t = self.toks[self.i].clone();
        self.i += 1;
        t
    }
}
