//! External-lexer bridge.
//!
//! `--use-desi-lexer` swaps the resolver's token-source factory for one
//! that runs an externally compiled lexer program on each source file. The
//! program receives the file path as its only argument and must print one
//! NDJSON token row per line on stdout; the rows are replayed through the
//! same `TokenSource` seam the built-in lexer uses.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use desi_parse::{parse_ndjson, to_tokens, ReplaySource, TokenSource};

pub struct BridgeOpts {
    /// Externally compiled lexer binary.
    pub lexer_cmd: PathBuf,
    /// Retain the scratch directory for inspection.
    pub keep_tmp: bool,
    pub verbose: bool,
}

/// Run the external lexer over `file` and replay its token stream.
pub fn token_source(opts: &BridgeOpts, file: &Path) -> Result<Box<dyn TokenSource>> {
    let file_abs = file
        .canonicalize()
        .with_context(|| format!("read {}", file.display()))?;

    // scratch space for whatever the external program writes; released on
    // every exit path unless --keep-tmp asked otherwise
    let scratch = tempfile::Builder::new()
        .prefix("desi-lexbridge-")
        .tempdir()
        .context("create bridge scratch dir")?;

    let output = Command::new(&opts.lexer_cmd)
        .arg(&file_abs)
        .current_dir(scratch.path())
        .output()
        .with_context(|| format!("run external lexer {}", opts.lexer_cmd.display()))?;

    if opts.verbose {
        let _ = std::io::stderr().write_all(&output.stderr);
    }
    if !output.status.success() {
        if opts.verbose {
            bail!("external lexer failed ({})", output.status);
        }
        bail!("external lexer failed; re-run with --verbose for its stderr");
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let (rows, bad) = parse_ndjson(&text);
    if bad > 0 && opts.verbose {
        eprintln!("lexbridge: ignored {bad} malformed NDJSON line(s)");
    }

    if opts.keep_tmp {
        let kept = scratch.into_path();
        if opts.verbose {
            eprintln!("lexbridge: kept scratch dir {}", kept.display());
        }
    }

    let toks = to_tokens(&rows).map_err(|diag| anyhow!("{diag}"))?;
    Ok(Box::new(ReplaySource::new(toks)))
}
