use thiserror::Error;

use crate::retry::FetchError;

/// Job-level failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum JobError {
    /// The metadata probe failed after all attempts.
    #[error("probe failed: {0}")]
    Probe(#[source] FetchError),
    /// The destination could not be opened, written, or removed.
    #[error("filesystem error: {0:#}")]
    Filesystem(anyhow::Error),
    /// Worker threads could not be spawned.
    #[error("failed to spawn workers: {0}")]
    Spawn(#[source] std::io::Error),
    /// `start()` after `stop()`.
    #[error("job has been stopped and closed")]
    Closed,
}
