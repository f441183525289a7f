//! Spillshuf CLI - shuffle large record files under a memory ceiling.
//!
//! Wraps the shuffle engine for use in training pipelines, and adds two
//! inspection commands for checking inputs and outputs.

mod commands;
mod output;
mod progress;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Spillshuf record shuffler.
///
/// Randomly permutes a file of fixed-size co-occurrence records using a
/// bounded amount of memory and temporary files.
#[derive(Parser)]
#[command(name = "spillshuf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Suppress progress and info messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Output format options.
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table format (default for TTY)
    #[default]
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Shuffle a record file
    Shuffle(ShuffleArgs),

    /// Display record counts and the segment estimate for a file
    Info {
        /// Path to the record file
        path: PathBuf,

        /// Memory limit used for the segment estimate, in gigabytes
        #[arg(long, default_value_t = 2.0)]
        memory_gb: f64,
    },

    /// Check that two files hold the same records in any order
    Verify {
        /// Original record file
        expected: PathBuf,

        /// Shuffled record file
        actual: PathBuf,
    },
}

/// Arguments of the shuffle command.
#[derive(clap::Args)]
struct ShuffleArgs {
    /// Input record file
    input: PathBuf,

    /// Output file for the shuffled records
    #[arg(short, long)]
    output: PathBuf,

    /// Prefix for temporary segment files (default: shuf.tmp next to the output)
    #[arg(long)]
    temp_prefix: Option<PathBuf>,

    /// Memory limit, in gigabytes
    #[arg(long, default_value_t = 2.0)]
    memory_gb: f64,

    /// Fixed buffer capacity in records, skipping the memory probe
    #[arg(long)]
    capacity: Option<usize>,

    /// Seed for a reproducible shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Append diagnostics to this file instead of standard error
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Merge segments left by an interrupted run instead of starting over
    #[arg(long)]
    resume: bool,
}

fn main() {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Shuffle(args) => args.log_file.clone(),
        _ => None,
    };
    if let Err(e) = init_logging(cli.verbose, cli.quiet, log_file) {
        fail(&e);
    }

    let result = match cli.command {
        Commands::Shuffle(args) => commands::shuffle::run(args, cli.format, cli.quiet),
        Commands::Info { path, memory_gb } => {
            commands::info::run(&path, memory_gb, cli.format, cli.quiet)
        }
        Commands::Verify { expected, actual } => {
            commands::verify::run(&expected, &actual, cli.format, cli.quiet)
        }
    };

    if let Err(e) = result {
        fail(&e);
    }
}

/// Print the error and exit with the code of its kind.
fn fail(e: &anyhow::Error) -> ! {
    output::error(&format!("{e:#}"));
    let code = e
        .downcast_ref::<spillshuf_common::Error>()
        .map_or(1, spillshuf_common::Error::exit_code);
    std::process::exit(code);
}

/// Set up logging based on verbosity.
fn init_logging(verbose: bool, quiet: bool, log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else if quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| spillshuf_common::Error::LogOpen { path, source })?;
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
