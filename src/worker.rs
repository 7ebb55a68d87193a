use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::aggregate::SharedStatus;
use crate::decompress::materialize;
use crate::models::{AggregateStatus, ChunkResult, FilePair, Outcome, PairReport};
use crate::progress::ProgressCounter;
use crate::utils::same_content;

pub const DEFAULT_PROGRAM: &str = "diff";

/// Test builds crash the worker on a pair with this relative path.
#[cfg(test)]
pub const CRASH_ON: &str = "crash.me";

/// How to compare one pair: the external program, the arguments forwarded
/// to it, and the pre-processing applied to its inputs.
#[derive(Debug, Clone)]
pub struct Comparator {
    pub program: String,
    pub args: Vec<String>,
    pub decompress: bool,
    pub quick: bool,
}

impl Default for Comparator {
    fn default() -> Self {
        Comparator {
            program: DEFAULT_PROGRAM.to_string(),
            args: Vec::new(),
            decompress: false,
            quick: false,
        }
    }
}

impl Comparator {
    pub fn compare(&self, pair: &FilePair) -> Outcome {
        #[cfg(test)]
        if pair.rel_path == Path::new(CRASH_ON) {
            panic!("comparator crashed on {}", pair.rel_path.display());
        }

        // Temporary copies live until the end of this function, whatever the outcome.
        let file_a = match materialize(&pair.path_a, self.decompress) {
            Ok(m) => m,
            Err(e) => return decompress_failure(&pair.path_a, e),
        };
        let file_b = match materialize(&pair.path_b, self.decompress) {
            Ok(m) => m,
            Err(e) => return decompress_failure(&pair.path_b, e),
        };

        if self.quick {
            match same_content(file_a.path(), file_b.path()) {
                Ok(true) => return Outcome::Identical(None),
                Ok(false) => {}
                Err(e) => debug!("digest of {} failed: {}", pair.rel_path.display(), e),
            }
        }

        self.run(pair, file_a.path(), file_b.path())
    }

    fn run(&self, pair: &FilePair, path_a: &Path, path_b: &Path) -> Outcome {
        let command_line = self.command_line(path_a, path_b);
        debug!("executing: {}", command_line);

        let output = match Command::new(&self.program)
            .args(&self.args)
            .arg(path_a)
            .arg(path_b)
            .stdin(Stdio::null())
            .output()
        {
            Ok(o) => o,
            Err(e) => {
                let message = format!("'{}' could not be started: {}", command_line, e);
                debug!("{}", message);
                return Outcome::ToolError(message);
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        match output.status.code() {
            Some(0) if text.is_empty() => Outcome::Identical(None),
            Some(0) => Outcome::Identical(Some(format!("{}{}", pair.header(), text))),
            Some(1) => Outcome::Different(format!("{}{}", pair.header(), text)),
            code => {
                let status = code.map_or_else(|| "no status (signal)".to_string(), |c| c.to_string());
                let message = format!(
                    "'{}' returned status {}: {}",
                    command_line,
                    status,
                    text.trim_end()
                );
                debug!("{}", message);
                Outcome::ToolError(message)
            }
        }
    }

    fn command_line(&self, path_a: &Path, path_b: &Path) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(path_a.display().to_string());
        parts.push(path_b.display().to_string());
        parts.join(" ")
    }
}

fn decompress_failure(path: &Path, err: std::io::Error) -> Outcome {
    let message = format!("cannot decompress {}: {}", path.display(), err);
    debug!("{}", message);
    Outcome::ToolError(message)
}

/// State a worker shares with the coordinator for the duration of one run.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub comparator: Arc<Comparator>,
    pub progress: ProgressCounter,
    pub status: SharedStatus,
    pub shutdown: Arc<AtomicBool>,
}

impl WorkerContext {
    pub fn new(comparator: Comparator, shutdown: Arc<AtomicBool>) -> Self {
        WorkerContext {
            comparator: Arc::new(comparator),
            progress: ProgressCounter::new(),
            status: SharedStatus::new(),
            shutdown,
        }
    }

    fn cancelled(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Compares every pair of `chunk` in order. Stops early, keeping what it
/// has, once shutdown is requested.
pub fn diff_chunk(index: usize, chunk: &[FilePair], ctx: &WorkerContext) -> ChunkResult {
    debug!(
        "worker for chunk {} started with {} file(s) to diff",
        index,
        chunk.len()
    );

    let mut result = ChunkResult::default();
    for pair in chunk {
        if ctx.cancelled() {
            result.interrupted = true;
            break;
        }

        let outcome = ctx.comparator.compare(pair);

        // A comparator killed by the same interrupt did not finish this file.
        if matches!(outcome, Outcome::ToolError(_)) && ctx.cancelled() {
            result.interrupted = true;
            break;
        }

        ctx.status.raise(outcome.status());
        result.reports.push(PairReport {
            pair: pair.clone(),
            outcome,
        });
        ctx.progress.increment();
    }

    if result.interrupted {
        debug!("worker for chunk {} interrupted", index);
        ctx.status.raise(AggregateStatus::Interrupted);
    }
    result
}
