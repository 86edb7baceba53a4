//! Host C-toolchain invocation for the final link step.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

pub struct Options {
    /// Path to the generated C file (e.g. `gen/out/demo.c`).
    pub c_source: PathBuf,
    /// Output executable; derived from `c_source` when absent.
    pub out: Option<PathBuf>,
    /// Directory containing `desi_std.h` / `desi_std.c`; auto-detected when
    /// absent.
    pub runtime_dir: Option<PathBuf>,
    /// Explicit compiler binary; wins over `DESI_CC` and probing.
    pub cc_bin: Option<String>,
    pub extra_args: Vec<String>,
    /// Validate inputs and pick a compiler, but run nothing.
    pub dry_run: bool,
}

/// Compile the generated C file together with the runtime library. Returns
/// the output executable path.
pub fn compile(opts: &Options) -> Result<PathBuf> {
    let src = opts
        .c_source
        .canonicalize()
        .with_context(|| format!("cc: source does not exist: {}", opts.c_source.display()))?;

    let mut out = opts
        .out
        .clone()
        .unwrap_or_else(|| src.with_extension(""));
    if cfg!(windows) && out.extension().map(|e| e != "exe").unwrap_or(true) {
        out.set_extension("exe");
    }
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cc: create out dir {}", parent.display()))?;
    }

    let rt = match &opts.runtime_dir {
        Some(dir) => dir.clone(),
        None => find_runtime_dir(&src)?,
    };
    for file in ["desi_std.h", "desi_std.c"] {
        if !rt.join(file).exists() {
            bail!("cc: missing {file} in runtime dir: {}", rt.display());
        }
    }

    let cc = pick_compiler(opts.cc_bin.as_deref())?;
    let args = construct_args(&cc, &src, &out, &rt, &opts.extra_args);
    if opts.dry_run {
        return Ok(out);
    }

    let status = Command::new(&cc)
        .args(&args)
        .status()
        .with_context(|| format!("cc: failed to run {cc}"))?;
    if !status.success() {
        bail!("cc: compilation failed ({status})");
    }
    Ok(out)
}

/// Locate `runtime/c` near the generated source: repo-root relative to
/// `gen/out/<name>.c`, then the working directory, then walking up from the
/// source (max 6 levels).
fn find_runtime_dir(c_source: &Path) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(start) = c_source.parent().and_then(Path::parent).and_then(Path::parent) {
        candidates.push(start.join("runtime").join("c"));
    }
    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join("runtime").join("c"));
    }
    let mut dir = c_source.parent().map(Path::to_path_buf);
    for _ in 0..6 {
        let Some(d) = dir else { break };
        candidates.push(d.join("runtime").join("c"));
        dir = d.parent().map(Path::to_path_buf);
    }
    for cand in candidates {
        if cand.join("desi_std.h").exists() {
            return Ok(cand);
        }
    }
    bail!(
        "cc: could not locate runtime/c (desi_std.h) starting from {}",
        c_source.display()
    )
}

fn pick_compiler(explicit: Option<&str>) -> Result<String> {
    if let Some(cc) = explicit {
        return Ok(cc.to_string());
    }
    if let Ok(cc) = env::var("DESI_CC") {
        if !cc.is_empty() && has_cmd(&cc) {
            return Ok(cc);
        }
    }
    let candidates: &[&str] = if cfg!(windows) {
        &["clang", "cl", "gcc"]
    } else {
        &["clang", "gcc", "cc"]
    };
    for cand in candidates {
        if has_cmd(cand) {
            return Ok(cand.to_string());
        }
    }
    bail!("cc: no C compiler found (set DESI_CC or pass --cc)")
}

fn has_cmd(name: &str) -> bool {
    // spawning at all proves the binary resolves; exit status is irrelevant
    Command::new(name).arg("--version").output().is_ok()
}

fn construct_args(
    cc: &str,
    src: &Path,
    out: &Path,
    rt: &Path,
    extra: &[String],
) -> Vec<String> {
    let runtime_c = rt.join("desi_std.c").display().to_string();
    let mut args = if cc.eq_ignore_ascii_case("cl") {
        vec![
            "/nologo".to_string(),
            src.display().to_string(),
            runtime_c,
            "/I".to_string(),
            rt.display().to_string(),
            format!("/Fe:{}", out.display()),
        ]
    } else {
        vec![
            src.display().to_string(),
            runtime_c,
            "-I".to_string(),
            rt.display().to_string(),
            "-o".to_string(),
            out.display().to_string(),
        ]
    };
    args.extend(extra.iter().cloned());
    args
}
