//! Import resolver.
//!
//! Starting from an absolute entry file, loads every transitively imported
//! module and merges their declarations into one `File`: entry declarations
//! first, then dependencies in DFS post-order. Import paths like `foo.bar`
//! resolve to `<entry-dir>/foo/bar.desi`; `std.*` imports are satisfied by
//! the runtime and skipped. Cycles are reported, duplicates loaded once
//! (keyed by canonicalized path so symlinked spellings coincide).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use desi_ast::ast::File;
use desi_diag::Diag;
use desi_parse::{parse_source, TokenSource};

/// Produces a token source for an absolute file path. The default reads the
/// file and lexes it; the bridge variant replays an external lexer.
pub type SourceFactory<'a> = dyn Fn(&Path) -> Result<Box<dyn TokenSource>> + 'a;

pub fn resolve_and_parse(entry: &Path, factory: &SourceFactory) -> Result<File, Vec<Diag>> {
    let entry_abs = match entry.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            return Err(vec![Diag::error(format!(
                "read {}: {e}",
                entry.display()
            ))])
        }
    };
    let root = entry_abs
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut loader = Loader {
        root,
        factory,
        seen: HashSet::new(),
        stack: Vec::new(),
        units: Vec::new(),
        errs: Vec::new(),
    };
    loader.load(&entry_abs);

    if !loader.errs.is_empty() {
        return Err(loader.errs);
    }

    // entry declarations first, then dependencies in load (DFS post) order
    let mut merged = File::default();
    let mut deps = Vec::new();
    for (path, file) in loader.units {
        if path == entry_abs {
            merged.decls.extend(file.decls);
        } else {
            deps.push(file);
        }
    }
    for file in deps {
        merged.decls.extend(file.decls);
    }
    Ok(merged)
}

struct Loader<'a> {
    root: PathBuf,
    factory: &'a SourceFactory<'a>,
    seen: HashSet<PathBuf>,
    stack: Vec<PathBuf>,
    units: Vec<(PathBuf, File)>,
    errs: Vec<Diag>,
}

impl<'a> Loader<'a> {
    fn load(&mut self, abs: &Path) {
        let canon = canonical(abs);
        if self.seen.contains(&canon) {
            return;
        }
        if self.stack.contains(&canon) {
            self.errs.push(Diag::error(format!(
                "import cycle detected involving {}",
                self.rel(abs)
            )));
            return;
        }
        self.stack.push(canon.clone());

        let file = match (self.factory)(abs) {
            Err(e) => {
                self.errs
                    .push(Diag::error(format!("load {}: {e:#}", self.rel(abs))));
                self.stack.pop();
                return;
            }
            Ok(src) => match parse_source(&abs.display().to_string(), src) {
                Err(diag) => {
                    self.errs.push(diag);
                    self.stack.pop();
                    return;
                }
                Ok(file) => file,
            },
        };

        for imp in &file.imports {
            if imp.path.starts_with("std.") {
                continue;
            }
            let mut rel = PathBuf::new();
            for part in imp.path.split('.') {
                rel.push(part);
            }
            rel.set_extension("desi");
            let target = self.root.join(rel);
            if !target.exists() {
                self.errs.push(Diag::error(format!(
                    "import {:?} -> {} not found (from {})",
                    imp.path,
                    self.rel(&target),
                    self.rel(abs)
                )));
                continue;
            }
            self.load(&target);
        }

        self.units.push((canon.clone(), file));
        self.seen.insert(canon);
        self.stack.pop();
    }

    fn rel(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
