use anyhow::{Context, Result};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

use crate::aggregate::Aggregate;
use crate::distributor::{dispatch, effective_workers};
use crate::error::DiffError;
use crate::matcher::{PathFilter, match_trees};
use crate::models::{AggregateStatus, OutputFormat, ProgressGlyphs};
use crate::progress::ProgressDisplay;
use crate::report::{
    SummaryData, generate_json_report, generate_summary_text, generate_text_report,
    ReportSink, print_error_entry,
};
use crate::utils::check_root_dir;
use crate::worker::{Comparator, WorkerContext};

pub struct DiffConfig {
    pub dir1: PathBuf,
    pub dir2: PathBuf,
    pub filter: PathFilter,
    pub comparator: Comparator,
    pub workers: Option<usize>,
    pub output: Option<PathBuf>,
    pub output_format: OutputFormat,
    pub progress: bool,
    pub glyphs: ProgressGlyphs,
    /// Count "Only in" and type-mismatch notices as differences.
    pub only_in_differs: bool,
    pub summary: bool,
}

impl DiffConfig {
    pub fn new(dir1: impl Into<PathBuf>, dir2: impl Into<PathBuf>) -> Self {
        DiffConfig {
            dir1: dir1.into(),
            dir2: dir2.into(),
            filter: PathFilter::default(),
            comparator: Comparator::default(),
            workers: None,
            output: None,
            output_format: OutputFormat::Txt,
            progress: false,
            glyphs: ProgressGlyphs::Ascii,
            only_in_differs: false,
            summary: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: AggregateStatus,
    pub pairs: usize,
    pub processed: usize,
    pub workers: usize,
}

pub fn run_diff(config: &DiffConfig, shutdown: Arc<AtomicBool>) -> Result<RunOutcome> {
    let start_time = Instant::now();

    check_root_dir(&config.dir1)?;
    check_root_dir(&config.dir2)?;
    let sink = ReportSink::open(config.output.as_ref())?;

    let tree = match_trees(&config.dir1, &config.dir2, &config.filter);
    for e in &tree.walk_errors {
        print_error_entry(e);
    }

    let workers = effective_workers(config.workers, tree.pairs.len());
    let ctx = WorkerContext::new(config.comparator.clone(), shutdown.clone());

    if !tree.walk_errors.is_empty() {
        ctx.status.raise(AggregateStatus::ToolFailure);
    }
    if config.only_in_differs && !tree.notices.is_empty() {
        ctx.status.raise(AggregateStatus::DifferencesFound);
    }

    let mut display = if config.progress && !tree.pairs.is_empty() && io::stderr().is_terminal() {
        ProgressDisplay::new(tree.pairs.len(), config.glyphs)?
    } else {
        ProgressDisplay::hidden(tree.pairs.len())
    };

    let chunks = dispatch(&tree.pairs, workers, &ctx, &mut display)?;
    display.finish();

    if shutdown.load(Ordering::SeqCst) {
        ctx.status.raise(AggregateStatus::Interrupted);
    }

    let agg = Aggregate::from_chunks(chunks);
    let status = agg.status.combine(ctx.status.get());
    let processed = ctx.progress.get();
    debug!(
        "{} of {} pair(s) processed, status {:?}",
        processed,
        tree.pairs.len(),
        status
    );
    if status == AggregateStatus::Interrupted {
        warn!("interrupted by Ctrl+C, {} pair(s) left unprocessed", tree.pairs.len() - processed);
    }

    let summary = SummaryData::new(
        &tree.notices,
        tree.walk_errors.len(),
        &agg,
        tree.pairs.len(),
        workers,
        status,
        start_time.elapsed(),
    );

    let output = match config.output_format {
        OutputFormat::Txt => generate_text_report(&tree.notices, &agg),
        OutputFormat::Json => generate_json_report(&tree.notices, &tree.walk_errors, &agg, &summary)?,
    };
    sink.write_report(&output).context("failed to write report")?;

    if config.summary {
        for line in generate_summary_text(&summary) {
            eprintln!("{}", line);
        }
    }

    if let Some((chunk, message)) = agg.faults.into_iter().next() {
        return Err(DiffError::WorkerFault { chunk, message }.into());
    }

    Ok(RunOutcome {
        status,
        pairs: tree.pairs.len(),
        processed,
        workers,
    })
}
