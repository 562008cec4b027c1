/// Shredder - Securely overwrite and remove files and directories
///
/// Every target is overwritten in place, verified against what was written,
/// renamed to a random name and deleted:
/// 1. Random single-pattern or multi-pattern (secure) overwrite passes
/// 2. Post-pass verification (SHA-256 or byte comparison)
/// 3. Obfuscated deletion with metadata scrubbing
///
/// Exit status: 0 on success, 1 if any target failed, 2 for help/version.

// Module declarations
mod config;
mod error;
mod logging;
mod overwrite;
mod security;
mod shred;
mod utils;
mod verification;

use chrono::Local;
use clap::Parser;
use clap::error::ErrorKind;
use std::path::PathBuf;
use std::process::exit;
use std::time::Instant;

use config::{ShredConfig, load_config};
use error::Result;
use shred::Shredder;

#[derive(Parser, Debug)]
#[command(
    name = "shredder",
    version,
    about = "Securely overwrite and remove files",
    long_about = "Overwrites the given files with random data and removes them so the data is \
                  unrecoverable. Secure mode adds multiple fixed bit patterns and DoD-style \
                  trailing passes."
)]
struct Cli {
    /// Number of overwrite passes (default: 3)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    passes: Option<u32>,

    /// Shred directories and their contents
    #[arg(short, long)]
    recursive: bool,

    /// Overwrite but do not remove files
    #[arg(short = 'k', long = "keep")]
    keep_files: bool,

    #[arg(short, long)]
    verbose: bool,

    /// Follow symlinks and shred their targets
    #[arg(short = 'f', long = "follow-symlinks")]
    follow_symlinks: bool,

    /// Multi-pattern overwrite with per-block randomization (slower)
    #[arg(short = 's', long = "secure")]
    secure_mode: bool,

    /// Show what would be shredded without touching anything
    #[arg(short = 'd', long = "dry-run")]
    dry_run: bool,

    /// Skip post-pass verification (faster)
    #[arg(short = 'c', long = "no-verify")]
    no_verify: bool,

    /// Try to acquire write access on files that deny it
    #[arg(short = 'F', long)]
    force: bool,

    /// JSON configuration file; command line flags take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Files and directories to shred
    #[arg(required = true, value_name = "PATHS")]
    paths: Vec<PathBuf>,
}

/// Exit code for a command line that did not lead to a run
fn parse_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 2,
        _ => 1,
    }
}

/// Merge the optional config file with the command line flags
fn build_config(cli: &Cli) -> Result<ShredConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ShredConfig::default(),
    };

    if let Some(passes) = cli.passes {
        config.passes = passes;
    }
    config.recursive |= cli.recursive;
    config.keep_files |= cli.keep_files;
    config.verbose |= cli.verbose;
    config.follow_symlinks |= cli.follow_symlinks;
    config.secure_mode |= cli.secure_mode;
    config.dry_run |= cli.dry_run;
    config.force |= cli.force;
    if cli.no_verify {
        config.verify = false;
    }

    config.validate()?;
    Ok(config)
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            exit(parse_exit_code(e.kind()));
        }
    };

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            exit(1);
        }
    };

    if let Err(e) = logging::init(config.verbose) {
        eprintln!("⚠️  {}", e);
    }

    tracing::info!(
        passes = config.passes,
        recursive = config.recursive,
        keep_files = config.keep_files,
        follow_symlinks = config.follow_symlinks,
        secure_mode = config.secure_mode,
        dry_run = config.dry_run,
        verify = config.verify,
        force = config.force,
        "Parameters"
    );

    println!("Beginning shred at {}", Local::now().format("%H:%M:%S"));
    let started = Instant::now();

    let mut shredder = Shredder::new(config);
    let summary = shredder.run(&cli.paths);
    summary.log();
    let failed = summary.has_failures();

    println!("Shred completed at {}", Local::now().format("%H:%M:%S"));
    tracing::info!("Elapsed: {:.2}s", started.elapsed().as_secs_f64());

    exit(if failed { 1 } else { 0 });
}
