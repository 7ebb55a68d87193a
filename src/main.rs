mod aggregate;
mod compare;
mod decompress;
mod distributor;
mod error;
mod matcher;
mod models;
mod progress;
mod report;
mod utils;
mod worker;


use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

use crate::compare::{DiffConfig, run_diff};
use crate::matcher::PathFilter;
use crate::models::{AggregateStatus, OutputFormat, ProgressGlyphs};
use crate::worker::{Comparator, DEFAULT_PROGRAM};

#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Multi-threaded recursive diff with support for compressed files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, help_template = "{before-help}{name} {version}\n{about-with-newline}\n{usage-heading} {usage} \n\n {all-args} {after-help}")]
struct Cli {
    /// First directory containing files and directories to compare
    dir1: PathBuf,
    /// Second directory containing files and directories to compare against
    dir2: PathBuf,

    /// Additional options passed to each individual diff command
    #[arg(last = true, value_name = "DIFF_ARGS")]
    diff_args: Vec<String>,

    /// Turn on debugging (disables the progress bar)
    #[arg(short = 'D', long)]
    debug: bool,

    /// Decompress files with a .gz suffix before comparing them
    #[arg(short = 'd', long)]
    decompress: bool,

    /// Don't show a progress bar
    #[arg(short = 'G', long)]
    no_progress: bool,

    /// Use Unicode block glyphs in the progress bar
    #[arg(short = 'g', long)]
    unicode: bool,

    /// Regex matching relative paths to include (repeatable)
    #[arg(short = 'i', long = "include", value_name = "RE")]
    include: Vec<String>,

    /// Regex matching relative paths to exclude (repeatable, wins over --include)
    #[arg(short = 'x', long = "exclude", value_name = "RE")]
    exclude: Vec<String>,

    /// Glob matching relative paths to exclude (repeatable)
    #[arg(long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,

    /// Send output to the given file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum number of workers (default: number of CPU cores)
    #[arg(short = 'p', long, value_name = "N", value_parser = parse_workers)]
    workers: Option<usize>,

    /// Program used to compare each pair of files
    #[arg(long, value_name = "PROG", default_value = DEFAULT_PROGRAM)]
    diff_program: String,

    /// Skip the diff program for files with identical content
    #[arg(long)]
    quick: bool,

    /// Treat "Only in" entries as differences in the exit status
    #[arg(long)]
    only_in_differs: bool,

    /// Format of the report
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Txt)]
    output_format: OutputFormat,

    /// Print a summary to stderr when done
    #[arg(long)]
    summary: bool,
}

fn parse_workers(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    fn into_config(self) -> Result<DiffConfig> {
        let filter = PathFilter::new(&self.include, &self.exclude, &self.ignore)?;
        Ok(DiffConfig {
            dir1: self.dir1,
            dir2: self.dir2,
            filter,
            comparator: Comparator {
                program: self.diff_program,
                args: self.diff_args,
                decompress: self.decompress,
                quick: self.quick,
            },
            workers: self.workers,
            output: self.output,
            output_format: self.output_format,
            progress: !self.no_progress && !self.debug,
            glyphs: if self.unicode {
                ProgressGlyphs::Unicode
            } else {
                ProgressGlyphs::Ascii
            },
            only_in_differs: self.only_in_differs,
            summary: self.summary,
        })
    }
}

fn main() -> ExitCode {
    #[cfg(windows)]
    let _ = colored::control::set_virtual_terminal(true);

    let cli = Cli::parse();
    setup_logging(cli.debug);

    match run(cli) {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            tracing::debug!("{:?}", e);
            eprintln!("pardiff: {:#}", e);
            ExitCode::from(AggregateStatus::ToolFailure.code())
        }
    }
}

fn run(cli: Cli) -> Result<AggregateStatus> {
    let config = cli.into_config()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    Ok(run_diff(&config, shutdown)?.status)
}

fn setup_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("pardiff=debug,warn")
        } else {
            EnvFilter::new("pardiff=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(debug)
        .init();
}
