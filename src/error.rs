use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions. Anything per-file is an `Outcome`, not one of these.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("directory not found: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("no permission to access directory: {}", .0.display())]
    Inaccessible(PathBuf),

    #[error("invalid {kind} pattern: {source}")]
    InvalidPattern {
        kind: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("invalid ignore glob: {0}")]
    InvalidGlob(#[from] globset::Error),

    #[error("worker for chunk {chunk} failed: {message}")]
    WorkerFault { chunk: usize, message: String },

    #[error("worker pool could not be started: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
