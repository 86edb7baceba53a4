//! Diagnostic values and Rust-style terminal rendering.

use desi_ast::span::{Pos, Span};

use crate::catalog::{self, Domain, SuggestionSpec, WhereSpec};

const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    MachineApplicable,
    MaybeIncorrect,
    HasPlaceholders,
}

impl Applicability {
    pub fn as_str(self) -> &'static str {
        match self {
            Applicability::MachineApplicable => "machine-applicable",
            Applicability::MaybeIncorrect => "maybe-incorrect",
            Applicability::HasPlaceholders => "has-placeholders",
        }
    }

    fn from_catalog(s: Option<&str>) -> Self {
        match s {
            Some("machine-applicable") => Applicability::MachineApplicable,
            Some("has-placeholders") => Applicability::HasPlaceholders,
            _ => Applicability::MaybeIncorrect,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Suggestion {
    pub place: WhereSpec,
    pub label: Option<String>,
    pub message: Option<String>,
    pub replacement: Option<String>,
    pub applicability: Applicability,
}

impl From<&SuggestionSpec> for Suggestion {
    fn from(spec: &SuggestionSpec) -> Self {
        Suggestion {
            place: spec.place,
            label: spec.label.clone(),
            message: spec.message.clone(),
            replacement: spec.replacement.clone(),
            applicability: Applicability::from_catalog(spec.applicability.as_deref()),
        }
    }
}

/// A single compiler message: code, title, spans, and fix-it data.
#[derive(Debug, Clone)]
pub struct Diag {
    pub level: Level,
    pub code: Option<String>,
    pub title: String,
    pub file: Option<String>,
    pub primary: Option<Span>,
    /// Catalog-driven shaping of the primary span's end column.
    pub primary_end: Option<WhereSpec>,
    /// Secondary spans with their underline labels.
    pub labels: Vec<(Span, String)>,
    pub notes: Vec<String>,
    pub help: Option<String>,
    pub suggestions: Vec<Suggestion>,
}

impl Diag {
    pub fn new(level: Level, title: impl Into<String>) -> Self {
        Diag {
            level,
            code: None,
            title: title.into(),
            file: None,
            primary: None,
            primary_end: None,
            labels: Vec::new(),
            notes: Vec::new(),
            help: None,
            suggestions: Vec::new(),
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Diag::new(Level::Error, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Diag::new(Level::Warning, title)
    }

    /// Build a diagnostic from a catalog entry, degrading to the fallback id
    /// and title when the catalog has no such key.
    pub fn from_catalog(
        level: Level,
        domain: Domain,
        key: &str,
        fallback_id: &str,
        fallback_title: &str,
    ) -> Self {
        let entry = catalog::lookup_or(domain, key, fallback_id, fallback_title);
        let mut diag = Diag::new(level, entry.title);
        diag.code = Some(entry.id);
        diag.help = entry.help;
        diag.primary_end = entry.primary_end;
        diag.suggestions = entry.suggestions.iter().map(Suggestion::from).collect();
        diag
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at(mut self, pos: Pos) -> Self {
        self.primary = Some(Span::at(pos));
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.primary = Some(span);
        self
    }

    pub fn label(mut self, span: Span, text: impl Into<String>) -> Self {
        self.labels.push((span, text.into()));
        self
    }

    pub fn note(mut self, text: impl Into<String>) -> Self {
        self.notes.push(text.into());
        self
    }

    pub fn with_help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    /// Render without source context: header plus location, notes and help.
    pub fn render_short(&self) -> String {
        self.render(None)
    }

    /// Full Rust-style rendering. When `source` is given and a primary span
    /// is set, a source-line preview with underlines is included.
    pub fn render(&self, source: Option<&str>) -> String {
        let mut out = String::new();
        match &self.code {
            Some(code) => out.push_str(&format!("{}[{}]: {}\n", self.level.as_str(), code, self.title)),
            None => out.push_str(&format!("{}: {}\n", self.level.as_str(), self.title)),
        }

        let Some(primary) = self.primary else {
            self.push_trailers(&mut out, 0);
            return out;
        };

        let file = self.file.as_deref().unwrap_or("<input>");
        let gutter = self.gutter_width();
        out.push_str(&format!(
            "{:gutter$}--> {}:{}:{}\n",
            "",
            file,
            primary.start.line,
            primary.start.col,
            gutter = gutter
        ));

        if let Some(src) = source {
            self.push_snippet(&mut out, src, primary, gutter);
            self.push_trailers(&mut out, gutter);
            self.push_suggestions(&mut out, src, primary, gutter);
        } else {
            self.push_trailers(&mut out, gutter);
        }
        out
    }

    fn gutter_width(&self) -> usize {
        let mut max_line = self.primary.map(|s| s.start.line).unwrap_or(0);
        for (span, _) in &self.labels {
            max_line = max_line.max(span.start.line);
        }
        max_line.to_string().len()
    }

    fn push_snippet(&self, out: &mut String, src: &str, primary: Span, gutter: usize) {
        let lines: Vec<&str> = src.lines().collect();
        let Some(line_text) = line_at(&lines, primary.start.line) else {
            return;
        };

        let blank = format!("{:gutter$} |\n", "", gutter = gutter);
        out.push_str(&blank);
        out.push_str(&format!(
            "{:>gutter$} | {}\n",
            primary.start.line,
            expand_tabs(line_text),
            gutter = gutter
        ));

        // primary caret underline
        let start_disp = display_col(line_text, primary.start.col);
        let end_disp = self.primary_end_display(primary, line_text);
        let width = end_disp.saturating_sub(start_disp).max(1);
        out.push_str(&format!(
            "{:gutter$} | {}{}\n",
            "",
            " ".repeat(start_disp - 1),
            "^".repeat(width),
            gutter = gutter
        ));

        // secondary underlines on the primary line, then mini-blocks for the rest
        for (span, text) in &self.labels {
            if span.start.line == primary.start.line {
                let s = display_col(line_text, span.start.col);
                let e = if span.end.line == span.start.line && span.end.col > span.start.col {
                    display_col(line_text, span.end.col)
                } else {
                    s + 1
                };
                out.push_str(&format!(
                    "{:gutter$} | {}{} {}\n",
                    "",
                    " ".repeat(s - 1),
                    "-".repeat((e - s).max(1)),
                    text,
                    gutter = gutter
                ));
            }
        }
        for (span, text) in &self.labels {
            if span.start.line != primary.start.line {
                if let Some(other) = line_at(&lines, span.start.line) {
                    out.push_str(&blank);
                    out.push_str(&format!(
                        "{:>gutter$} | {}\n",
                        span.start.line,
                        expand_tabs(other),
                        gutter = gutter
                    ));
                    let s = display_col(other, span.start.col);
                    let e = if span.end.line == span.start.line && span.end.col > span.start.col {
                        display_col(other, span.end.col)
                    } else {
                        s + 1
                    };
                    out.push_str(&format!(
                        "{:gutter$} | {}{} {}\n",
                        "",
                        " ".repeat(s - 1),
                        "-".repeat((e - s).max(1)),
                        text,
                        gutter = gutter
                    ));
                }
            }
        }
        out.push_str(&blank);
    }

    /// Display column one past the end of the primary underline.
    fn primary_end_display(&self, primary: Span, line_text: &str) -> usize {
        match self.primary_end {
            Some(WhereSpec::Eol) => display_width(line_text) + 1,
            Some(WhereSpec::PrimaryOffset { delta }) => {
                let col = primary.start.col as i64 + delta as i64;
                display_col(line_text, col.max(primary.start.col as i64 + 1) as u32)
            }
            Some(WhereSpec::Pos { col, .. }) => display_col(line_text, col),
            None => {
                if primary.end.line == primary.start.line && primary.end.col > primary.start.col {
                    display_col(line_text, primary.end.col)
                } else {
                    display_col(line_text, primary.start.col) + 1
                }
            }
        }
    }

    fn push_trailers(&self, out: &mut String, gutter: usize) {
        for note in &self.notes {
            out.push_str(&format!("{:gutter$} = note: {}\n", "", note, gutter = gutter));
        }
        if let Some(help) = &self.help {
            out.push_str(&format!("{:gutter$} = help: {}\n", "", help, gutter = gutter));
        }
    }

    fn push_suggestions(&self, out: &mut String, src: &str, primary: Span, gutter: usize) {
        let lines: Vec<&str> = src.lines().collect();
        for sug in &self.suggestions {
            let pos = resolve_where(sug.place, primary, &lines);
            let message = sug
                .message
                .as_deref()
                .or(sug.label.as_deref())
                .unwrap_or("apply the suggested change");
            out.push_str(&format!(
                "help({}): {}\n",
                sug.applicability.as_str(),
                message
            ));
            let (Some(replacement), Some(line_text)) =
                (sug.replacement.as_deref(), line_at(&lines, pos.line))
            else {
                continue;
            };
            let patched = splice(line_text, pos.col, replacement);
            out.push_str(&format!("{:gutter$} |\n", "", gutter = gutter));
            out.push_str(&format!(
                "{:>gutter$} | {}\n",
                pos.line,
                expand_tabs(&patched),
                gutter = gutter
            ));
            let disp = display_col(&patched, pos.col);
            out.push_str(&format!(
                "{:gutter$} | {}{}\n",
                "",
                " ".repeat(disp - 1),
                "+".repeat(replacement.chars().count().max(1)),
                gutter = gutter
            ));
        }
    }
}

impl std::fmt::Display for Diag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(span) = self.primary {
            if let Some(file) = &self.file {
                write!(f, "{}:{}:{}: ", file, span.start.line, span.start.col)?;
            } else {
                write!(f, "{}:{}: ", span.start.line, span.start.col)?;
            }
        }
        f.write_str(&self.title)
    }
}

impl std::error::Error for Diag {}

/* ---------- layout helpers ---------- */

fn line_at<'a>(lines: &[&'a str], line: u32) -> Option<&'a str> {
    if line == 0 {
        return None;
    }
    lines.get(line as usize - 1).copied()
}

/// Expand tabs to the next 4-column stop for display.
fn expand_tabs(line: &str) -> String {
    let mut out = String::new();
    let mut col = 0usize;
    for ch in line.chars() {
        if ch == '\t' {
            let next = (col / TAB_WIDTH + 1) * TAB_WIDTH;
            while col < next {
                out.push(' ');
                col += 1;
            }
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}

/// Map a 1-based character column onto a 1-based display column after tab
/// expansion.
fn display_col(line: &str, col: u32) -> usize {
    let mut disp = 0usize;
    for (i, ch) in line.chars().enumerate() {
        if i as u32 + 1 >= col {
            break;
        }
        if ch == '\t' {
            disp = (disp / TAB_WIDTH + 1) * TAB_WIDTH;
        } else {
            disp += 1;
        }
    }
    disp + 1
}

fn display_width(line: &str) -> usize {
    expand_tabs(line).chars().count()
}

fn resolve_where(place: WhereSpec, primary: Span, lines: &[&str]) -> Pos {
    match place {
        WhereSpec::Eol => {
            let line = primary.start.line;
            let len = line_at(lines, line).map(|l| l.chars().count()).unwrap_or(0);
            Pos::new(line, len as u32 + 1)
        }
        WhereSpec::PrimaryOffset { delta } => {
            let col = (primary.start.col as i64 + delta as i64).max(1) as u32;
            Pos::new(primary.start.line, col)
        }
        WhereSpec::Pos { line, col } => Pos::new(line, col),
    }
}

/// Insert `text` before the 1-based character column `col`.
fn splice(line: &str, col: u32, text: &str) -> String {
    let mut out = String::new();
    let mut inserted = false;
    for (i, ch) in line.chars().enumerate() {
        if i as u32 + 1 == col {
            out.push_str(text);
            inserted = true;
        }
        out.push(ch);
    }
    if !inserted {
        out.push_str(text);
    }
    out
}
