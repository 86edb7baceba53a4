#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

mod checker;
mod kind;
mod scope;

pub use checker::{check_file, CheckError, FuncSig, Info, Warning};
pub use kind::{map_text_type, unify, Kind};
pub use scope::VarInfo;
