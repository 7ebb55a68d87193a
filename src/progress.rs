use anyhow::Result;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::ProgressGlyphs;

/// How often the coordinator samples the counter.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Count of fully processed pairs, shared by every worker of one run.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter(Arc<AtomicUsize>);

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

/// Progress bar driven by sampled counter values rather than by the workers.
pub struct ProgressDisplay {
    bar: Option<ProgressBar>,
    total: u64,
    shown: u64,
}

impl ProgressDisplay {
    pub fn new(total: usize, glyphs: ProgressGlyphs) -> Result<Self> {
        let pb = ProgressBar::new(total as u64);
        let chars = match glyphs {
            ProgressGlyphs::Ascii => "#>-",
            ProgressGlyphs::Unicode => "█▉▊▋▌▍▎▏ ",
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [Elap>{elapsed_precise}] [ {bar:40.cyan/blue} ] {pos}/{len} files (Rema>{eta})")?
                .progress_chars(chars),
        );
        pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));

        Ok(ProgressDisplay {
            bar: Some(pb),
            total: total as u64,
            shown: 0,
        })
    }

    pub fn hidden(total: usize) -> Self {
        ProgressDisplay {
            bar: None,
            total: total as u64,
            shown: 0,
        }
    }

    /// Advances by the delta since the last observation. Never moves
    /// backwards and never past the total.
    pub fn observe(&mut self, count: usize) -> u64 {
        let target = (count as u64).min(self.total);
        if target > self.shown {
            if let Some(ref pb) = self.bar {
                pb.inc(target - self.shown);
            }
            self.shown = target;
        }
        self.shown
    }

    pub fn finish(&self) {
        if let Some(ref pb) = self.bar {
            pb.finish_and_clear();
        }
    }
}
