//! Embedded diagnostic-code catalog.
//!
//! The registry is a JSON document compiled into the binary and parsed once
//! on first use. A malformed document degrades to an empty catalog so code
//! lookup can never abort a compilation.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Deserialize;

const CODES_JSON: &str = include_str!("codes.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Lexer,
    Parser,
    Type,
}

/// Where a span end or suggestion sits relative to the primary span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WhereSpec {
    /// Just past the last visible column of the primary line.
    Eol,
    /// Offset in columns from the primary start.
    PrimaryOffset { delta: i32 },
    /// An explicit position.
    Pos { line: u32, col: u32 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionSpec {
    #[serde(rename = "where")]
    pub place: WhereSpec,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub applicability: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub primary_end: Option<WhereSpec>,
    #[serde(default)]
    pub suggestions: Vec<SuggestionSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct Registry {
    #[serde(default)]
    lexer: HashMap<String, CodeEntry>,
    #[serde(default)]
    parser: HashMap<String, CodeEntry>,
    #[serde(default, rename = "type")]
    type_: HashMap<String, CodeEntry>,
}

fn registry() -> &'static Registry {
    static REG: OnceLock<Registry> = OnceLock::new();
    REG.get_or_init(|| serde_json::from_str(CODES_JSON).unwrap_or_default())
}

/// Look up a catalog entry by domain and key.
pub fn lookup(domain: Domain, key: &str) -> Option<&'static CodeEntry> {
    let reg = registry();
    let table = match domain {
        Domain::Lexer => &reg.lexer,
        Domain::Parser => &reg.parser,
        Domain::Type => &reg.type_,
    };
    table.get(key)
}

/// Look up an entry, falling back to a caller-supplied id and title when the
/// key is absent or the catalog failed to load.
pub fn lookup_or(domain: Domain, key: &str, fallback_id: &str, fallback_title: &str) -> CodeEntry {
    match lookup(domain, key) {
        Some(entry) => entry.clone(),
        None => CodeEntry {
            id: fallback_id.to_string(),
            title: fallback_title.to_string(),
            help: None,
            primary_end: None,
            suggestions: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_lexer_key_resolves() {
        let entry = lookup(Domain::Lexer, "unterminated_string").expect("catalog entry");
        assert_eq!(entry.id, "DLE0001");
        assert_eq!(entry.primary_end, Some(WhereSpec::Eol));
        assert_eq!(entry.suggestions.len(), 1);
        assert_eq!(entry.suggestions[0].replacement.as_deref(), Some("\""));
    }

    #[test]
    fn unknown_key_falls_back() {
        let entry = lookup_or(Domain::Parser, "no_such_key", "DPE9999", "mystery");
        assert_eq!(entry.id, "DPE9999");
        assert_eq!(entry.title, "mystery");
        assert!(entry.suggestions.is_empty());
    }

    #[test]
    fn where_spec_shapes_parse() {
        let eol: WhereSpec = serde_json::from_str(r#"{"kind":"eol"}"#).unwrap();
        assert_eq!(eol, WhereSpec::Eol);
        let off: WhereSpec =
            serde_json::from_str(r#"{"kind":"primary_offset","delta":3}"#).unwrap();
        assert_eq!(off, WhereSpec::PrimaryOffset { delta: 3 });
        let pos: WhereSpec = serde_json::from_str(r#"{"kind":"pos","line":2,"col":7}"#).unwrap();
        assert_eq!(pos, WhereSpec::Pos { line: 2, col: 7 });
    }
}
