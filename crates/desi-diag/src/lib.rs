#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

mod catalog;
mod render;

pub use catalog::{lookup, lookup_or, CodeEntry, Domain, SuggestionSpec, WhereSpec};
pub use render::{Applicability, Diag, Level, Suggestion};
