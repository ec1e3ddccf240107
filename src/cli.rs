// ============================================================================
// RasterFE CLI: run command scripts, or read commands from stdin
// ============================================================================
//
// Usage examples:
//   rasterfe --script edit.txt
//   rasterfe -s "batches/*.txt" --dir images/ --seed 7
//   rasterfe                                   (interactive text mode)
//
// Every script runs in a fresh session, so layers never leak between files.

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::ops::scripting::{COMMAND_SUMMARY, ScriptReport, ScriptSession};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// RasterFE layered raster editor.
///
/// Applies filters, color transformations, downscaling and mosaic effects to
/// layered PPM/PNG/JPEG images through a line-based command language.
#[derive(Parser, Debug)]
#[command(
    name = "rasterfe",
    about = "RasterFE layered raster image editor",
    long_about = "Run command scripts against a stack of image layers.\n\
                  With no --script, commands are read from standard input.\n\n\
                  Example:\n  \
                  rasterfe --script edit.txt\n  \
                  rasterfe -s \"jobs/*.txt\" --dir images/ --seed 42"
)]
pub struct CliArgs {
    /// Command script(s) to run. Glob patterns accepted (e.g. "jobs/*.txt").
    #[arg(short, long, value_name = "SCRIPT", num_args = 1..)]
    pub script: Vec<String>,

    /// Directory that relative image and project paths resolve against.
    /// Defaults to the current directory.
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Seed for the mosaic RNG. Random when omitted.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Write the session log here instead of the platform data directory.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Print per-script timing and log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all scripts (or interactive mode) and return an OS exit code.
/// `0` = no command failed, `1` otherwise.
pub fn run(args: CliArgs) -> ExitCode {
    let workdir = args.dir.clone().unwrap_or_else(|| PathBuf::from("."));
    if !workdir.is_dir() {
        eprintln!("error: '{}' is not a directory.", workdir.display());
        return ExitCode::FAILURE;
    }

    if args.script.is_empty() {
        return run_interactive(&workdir, args.seed);
    }

    let scripts = resolve_inputs(&args.script);
    if scripts.is_empty() {
        eprintln!("error: no script files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    let total = scripts.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, script) in scripts.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, script.display());
        }
        let start = Instant::now();

        match run_one(script, &workdir, args.seed) {
            Ok(report) => {
                if !report.is_success() {
                    any_failure = true;
                }
                if args.verbose || multi {
                    println!(
                        "  {} commands, {} failed ({:.0}ms)",
                        report.commands_run,
                        report.errors.len(),
                        start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log::error!("script {} aborted: {}", script.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-script processing
// ============================================================================

fn run_one(script: &Path, workdir: &Path, seed: Option<u64>) -> crate::EditorResult<ScriptReport> {
    let file = std::fs::File::open(script)?;
    log::info!("running script {}", script.display());
    let mut session = ScriptSession::new(workdir, seed);
    session.run(BufReader::new(file), io::stderr())
}

fn run_interactive(workdir: &Path, seed: Option<u64>) -> ExitCode {
    println!("{}", COMMAND_SUMMARY);
    log::info!("interactive session in {}", workdir.display());

    let mut session = ScriptSession::new(workdir, seed);
    match session.run(io::stdin().lock(), io::stdout()) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}
