//! `desic` — the Desi compiler driver.
//!
//! Pipeline: lex -> parse -> resolve imports -> check -> emit C -> link
//! against the C runtime. Exit codes: 0 success, 1 compile/check failure,
//! 2 usage error (clap's default).

mod bridge;
mod cc;
mod loader;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use bridge::BridgeOpts;
use desi_ast::dump;
use desi_check::check_file;
use desi_diag::Diag;
use desi_emit::emit_file;
use desi_parse::{parse_source, parse_str, Lexer, TokKind, TokenSource};

#[derive(Parser, Debug)]
#[command(name = "desic")]
#[command(version, about = "desic — Desi compiler (Stage-1)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lex a .desi file and print its token stream
    Lex {
        /// Path to the .desi source file
        file: PathBuf,
    },

    /// Parse a .desi file and print an AST outline
    Parse {
        /// Path to the .desi source file
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,

        /// Lex with an externally compiled lexer instead of the built-in one
        #[arg(long, requires = "lexer_cmd")]
        use_desi_lexer: bool,

        /// External lexer binary (emits NDJSON tokens on stdout)
        #[arg(long)]
        lexer_cmd: Option<PathBuf>,

        /// Keep bridge scratch directories for inspection
        #[arg(long)]
        keep_tmp: bool,

        #[arg(long)]
        verbose: bool,
    },

    /// Build an entry file: emit C under gen/out and link with the runtime
    Build {
        /// Entry .desi file; imports resolve relative to its directory
        entry: PathBuf,

        /// Write the C file but skip the C compiler
        #[arg(long)]
        no_cc: bool,

        /// C compiler binary (overrides DESI_CC and auto-detection)
        #[arg(long)]
        cc: Option<String>,

        /// Extra flag for the C compiler (repeatable)
        #[arg(long = "cc-arg")]
        cc_args: Vec<String>,

        /// Directory containing desi_std.h / desi_std.c
        #[arg(long)]
        runtime_dir: Option<PathBuf>,

        /// Output executable name (defaults to the entry basename)
        #[arg(long)]
        out: Option<String>,

        /// Treat warnings as errors
        #[arg(long = "Werror")]
        werror: bool,

        /// Lex with an externally compiled lexer instead of the built-in one
        #[arg(long, requires = "lexer_cmd")]
        use_desi_lexer: bool,

        /// External lexer binary (emits NDJSON tokens on stdout)
        #[arg(long)]
        lexer_cmd: Option<PathBuf>,

        /// Keep bridge scratch directories for inspection
        #[arg(long)]
        keep_tmp: bool,

        #[arg(long)]
        verbose: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Pretty,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Lex { file } => cmd_lex(&file),
        Commands::Parse {
            file,
            format,
            use_desi_lexer,
            lexer_cmd,
            keep_tmp,
            verbose,
        } => {
            let bridge = bridge_opts(use_desi_lexer, lexer_cmd, keep_tmp, verbose);
            cmd_parse(&file, format, bridge.as_ref())
        }
        Commands::Build {
            entry,
            no_cc,
            cc,
            cc_args,
            runtime_dir,
            out,
            werror,
            use_desi_lexer,
            lexer_cmd,
            keep_tmp,
            verbose,
        } => cmd_build(BuildArgs {
            entry,
            no_cc,
            cc,
            cc_args,
            runtime_dir,
            out,
            werror,
            bridge: bridge_opts(use_desi_lexer, lexer_cmd, keep_tmp, verbose),
        }),
    };
    ExitCode::from(code)
}

fn bridge_opts(
    use_desi_lexer: bool,
    lexer_cmd: Option<PathBuf>,
    keep_tmp: bool,
    verbose: bool,
) -> Option<BridgeOpts> {
    if !use_desi_lexer {
        return None;
    }
    lexer_cmd.map(|cmd| BridgeOpts {
        lexer_cmd: cmd,
        keep_tmp,
        verbose,
    })
}

/* ---------- lex ---------- */

fn cmd_lex(file: &Path) -> u8 {
    let data = match fs::read_to_string(file) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("read {}: {e}", file.display());
            return 1;
        }
    };
    let mut lx = Lexer::new(&data);
    loop {
        let t = lx.next();
        if t.kind == TokKind::Eof {
            println!("{}:{}  {}", t.line, t.col, t.kind.name());
            break;
        }
        let mut lex = t.text.clone();
        if lex.chars().count() > 40 {
            lex = lex.chars().take(37).collect::<String>() + "...";
        }
        if lex.is_empty() {
            println!("{}:{}  {:<8}", t.line, t.col, t.kind.name());
        } else {
            println!("{}:{}  {:<8}  {lex:?}", t.line, t.col, t.kind.name());
        }
    }
    0
}

/* ---------- parse ---------- */

fn cmd_parse(file: &Path, format: Format, bridge: Option<&BridgeOpts>) -> u8 {
    let src_text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("read {}: {e}", file.display());
            return 1;
        }
    };

    let parsed = if let Some(opts) = bridge {
        match bridge::token_source(opts, file) {
            Ok(src) => parse_source(&file.display().to_string(), src),
            Err(e) => {
                eprintln!("desi-lexer bridge: {e:#}");
                return 1;
            }
        }
    } else {
        parse_str(&file.display().to_string(), &src_text)
    };

    match parsed {
        Err(diag) => {
            eprint!("{}", diag.render(Some(&src_text)));
            1
        }
        Ok(ast) => match format {
            Format::Pretty => {
                print!("{}", dump::outline(&ast));
                0
            }
            Format::Json => match serde_json::to_string_pretty(&ast) {
                Ok(json) => {
                    println!("{json}");
                    0
                }
                Err(e) => {
                    eprintln!("json: {e}");
                    1
                }
            },
        },
    }
}

/* ---------- build ---------- */

struct BuildArgs {
    entry: PathBuf,
    no_cc: bool,
    cc: Option<String>,
    cc_args: Vec<String>,
    runtime_dir: Option<PathBuf>,
    out: Option<String>,
    werror: bool,
    bridge: Option<BridgeOpts>,
}

fn cmd_build(args: BuildArgs) -> u8 {
    let factory: Box<dyn Fn(&Path) -> Result<Box<dyn TokenSource>> + '_> = match &args.bridge {
        Some(opts) => Box::new(move |path: &Path| bridge::token_source(opts, path)),
        None => Box::new(|path: &Path| {
            let data = fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Box::new(Lexer::new(&data)) as Box<dyn TokenSource>)
        }),
    };

    let merged = match loader::resolve_and_parse(&args.entry, &*factory) {
        Ok(file) => file,
        Err(diags) => {
            for diag in &diags {
                print_diag(diag);
            }
            eprintln!("summary: {} error(s), 0 warning(s)", diags.len());
            return 1;
        }
    };

    // typecheck: errors always block emission, warnings only with --Werror
    let (info, errors, warnings) = check_file(&merged);
    for w in &warnings {
        eprintln!("warning: {w}");
    }
    for e in &errors {
        eprintln!("error: {e}");
    }
    if !errors.is_empty() || (args.werror && !warnings.is_empty()) {
        eprintln!(
            "summary: {} error(s), {} warning(s)",
            errors.len(),
            warnings.len()
        );
        return 1;
    }

    let base = args
        .entry
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let out_dir = Path::new("gen").join("out");
    if let Err(e) = fs::create_dir_all(&out_dir) {
        eprintln!("mkdir {}: {e}", out_dir.display());
        return 1;
    }
    let cpath = out_dir.join(format!("{base}.c"));
    let csrc = emit_file(&merged, &info);
    if let Err(e) = fs::write(&cpath, &csrc) {
        eprintln!("write {}: {e}", cpath.display());
        return 1;
    }
    eprintln!("wrote {}", cpath.display());

    if !args.no_cc {
        let opts = cc::Options {
            c_source: cpath.clone(),
            out: args.out.as_ref().map(|name| out_dir.join(name)),
            runtime_dir: args.runtime_dir.clone(),
            cc_bin: args.cc.clone(),
            extra_args: args.cc_args.clone(),
            dry_run: false,
        };
        match cc::compile(&opts) {
            Ok(bin) => eprintln!("built {}", bin.display()),
            Err(e) => {
                eprintln!("cc failed: {e:#}");
                return 1;
            }
        }
    }

    eprintln!("summary: 0 error(s), {} warning(s)", warnings.len());
    0
}

/// Full source-annotated rendering when the diagnostic knows its file and
/// position, one-line fallback otherwise.
fn print_diag(diag: &Diag) {
    let source = diag
        .file
        .as_ref()
        .and_then(|file| fs::read_to_string(file).ok());
    if diag.primary.is_some() && source.is_some() {
        eprint!("{}", diag.render(source.as_deref()));
    } else {
        eprintln!("error: {diag}");
    }
}
