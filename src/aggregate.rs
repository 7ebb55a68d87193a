use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::models::{AggregateStatus, ChunkResult, Outcome, PairReport};

/// Run status shared between the coordinator and the workers. Only ever
/// raised, never lowered.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus(Arc<AtomicU8>);

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, status: AggregateStatus) {
        self.0.fetch_max(status.code(), Ordering::AcqRel);
    }

    pub fn get(&self) -> AggregateStatus {
        AggregateStatus::from_code(self.0.load(Ordering::Acquire))
    }
}

pub fn fold_status<'a, I>(outcomes: I) -> AggregateStatus
where
    I: IntoIterator<Item = &'a Outcome>,
{
    outcomes
        .into_iter()
        .fold(AggregateStatus::NoDifferences, |acc, o| acc.combine(o.status()))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub identical: usize,
    pub different: usize,
    pub errors: usize,
}

/// Collected results of every chunk, in chunk order.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub reports: Vec<PairReport>,
    pub status: AggregateStatus,
    pub interrupted: bool,
    pub faults: Vec<(usize, String)>,
}

impl Aggregate {
    /// `chunks` must be indexed by dispatch order; an `Err` marks a chunk
    /// whose worker died without returning a result.
    pub fn from_chunks(chunks: Vec<Result<ChunkResult, String>>) -> Self {
        let mut agg = Aggregate::default();
        for (index, chunk) in chunks.into_iter().enumerate() {
            match chunk {
                Ok(result) => {
                    agg.interrupted |= result.interrupted;
                    agg.reports.extend(result.reports);
                }
                Err(message) => agg.faults.push((index, message)),
            }
        }
        agg.status = fold_status(agg.reports.iter().map(|r| &r.outcome));
        if agg.interrupted {
            agg.status = agg.status.combine(AggregateStatus::Interrupted);
        }
        agg
    }

    /// Concatenated report text of every pair, in original pair order.
    pub fn diff_text(&self) -> String {
        self.reports
            .iter()
            .filter_map(|r| r.outcome.report_text())
            .collect()
    }

    pub fn counts(&self) -> OutcomeCounts {
        self.reports
            .iter()
            .fold(OutcomeCounts::default(), |mut c, r| {
                match r.outcome {
                    Outcome::Identical(_) => c.identical += 1,
                    Outcome::Different(_) => c.different += 1,
                    Outcome::ToolError(_) => c.errors += 1,
                }
                c
            })
    }
}
