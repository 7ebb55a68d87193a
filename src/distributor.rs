use rayon::ThreadPoolBuilder;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, RecvTimeoutError};
use tracing::{debug, warn};

use crate::error::DiffError;
use crate::models::{AggregateStatus, ChunkResult, FilePair};
use crate::progress::{POLL_INTERVAL, ProgressDisplay};
use crate::worker::{WorkerContext, diff_chunk};

pub type ChunkOutput = Result<ChunkResult, String>;

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Pool size actually used: the request (or host parallelism), never more
/// than there are pairs and never less than one.
pub fn effective_workers(requested: Option<usize>, pairs: usize) -> usize {
    requested
        .unwrap_or_else(default_workers)
        .clamp(1, pairs.max(1))
}

pub fn chunk_size(total: usize, workers: usize) -> usize {
    total.div_ceil(workers.max(1)).max(1)
}

/// Contiguous slices of `ceil(len / workers)` items; only the last may be
/// shorter. Concatenated in order they give back `items`.
pub fn partition<T>(items: &[T], workers: usize) -> Vec<&[T]> {
    if items.is_empty() {
        return Vec::new();
    }
    items.chunks(chunk_size(items.len(), workers)).collect()
}

/// Runs every chunk on a dedicated pool of `workers` threads while this
/// thread keeps the progress display current. Results come back indexed by
/// chunk, regardless of completion order.
pub fn dispatch(
    pairs: &[FilePair],
    workers: usize,
    ctx: &WorkerContext,
    display: &mut ProgressDisplay,
) -> Result<Vec<ChunkOutput>, DiffError> {
    if pairs.is_empty() {
        return Ok(Vec::new());
    }

    let workers = workers.clamp(1, pairs.len());
    let chunks: Vec<Vec<FilePair>> = partition(pairs, workers)
        .into_iter()
        .map(<[FilePair]>::to_vec)
        .collect();
    let expected = chunks.len();

    debug!(
        "starting {} worker(s) to diff {} file(s) in {} chunk(s)",
        workers,
        pairs.len(),
        expected
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("pardiff-worker-{}", i))
        .build()?;

    let (tx, rx) = mpsc::channel();
    for (index, chunk) in chunks.into_iter().enumerate() {
        let tx = tx.clone();
        let ctx = ctx.clone();
        pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| diff_chunk(index, &chunk, &ctx)))
                .map_err(panic_message);
            let _ = tx.send((index, result));
        });
    }
    drop(tx);

    let mut slots: Vec<Option<ChunkOutput>> = (0..expected).map(|_| None).collect();
    let mut received = 0;
    let mut interrupt_seen = false;

    while received < expected {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok((index, result)) => {
                slots[index] = Some(result);
                received += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        display.observe(ctx.progress.get());

        if !interrupt_seen && ctx.shutdown.load(Ordering::SeqCst) {
            interrupt_seen = true;
            ctx.status.raise(AggregateStatus::Interrupted);
            warn!("interrupted, waiting for workers to finish their current file");
        }
    }
    display.observe(ctx.progress.get());

    Ok(slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Err("worker exited without returning its results".to_string())))
        .collect())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
