#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

mod lexer;
mod parser;
mod replay;
mod source;
mod token;

pub use lexer::Lexer;
pub use parser::{parse_source, parse_str, Parser};
pub use replay::{map_kind, parse_ndjson, to_tokens, RawToken, ReplaySource};
pub use source::TokenSource;
pub use token::{Token, TokKind};
