//! Worker pool, work queue, and throughput metering for one download job.
//!
//! `JobContext` bundles what workers share: the part table, the queue, the
//! destination file (whose mutex is the write lock), the job state, and the
//! transport. Workers report part outcomes through the queue; the only job
//! state change they make is the drain-triggered completion (or a fatal
//! filesystem failure).

mod progress;
mod queue;
mod speed;
mod worker;

pub use progress::ProgressStats;
pub use queue::{Claim, WorkQueue};
pub use speed::{SpeedMeter, Throughput};

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::control::{JobState, StateCell};
use crate::segmenter::PartTable;
use crate::storage::DestinationFile;
use crate::transport::{Headers, Transport};

pub(crate) struct JobContext {
    pub url: String,
    pub headers: Headers,
    pub transport: Arc<dyn Transport>,
    pub table: PartTable,
    pub queue: WorkQueue,
    pub file: DestinationFile,
    pub state: Arc<StateCell>,
    /// False when the server cannot serve ranges: a retried part restarts at its first byte.
    pub ranges_supported: bool,
    pub part_backoff: Duration,
    pub failure: Mutex<Option<String>>,
}

impl JobContext {
    /// Called by the one worker that observed the queue drained.
    fn complete(&self) {
        if !self.state.transition(JobState::Downloading, JobState::Completed) {
            return;
        }
        if let Err(e) = self.file.close() {
            tracing::error!(error = %format!("{:#}", e), "closing completed download failed");
        }
        tracing::info!(
            path = %self.file.path().display(),
            bytes = self.table.downloaded(),
            "download completed"
        );
    }

    /// A filesystem failure ends the job.
    fn fail(&self, message: String) {
        tracing::error!(error = %message, "download failed");
        self.failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_or_insert(message);
        self.state.transition(JobState::Downloading, JobState::Error);
    }
}

/// Spawn `count` workers on OS threads.
pub(crate) fn spawn_workers(ctx: &Arc<JobContext>, count: usize) -> std::io::Result<Vec<JoinHandle<()>>> {
    (0..count)
        .map(|id| {
            let ctx = Arc::clone(ctx);
            std::thread::Builder::new()
                .name(format!("segdl-worker-{}", id))
                .spawn(move || worker::run_worker(&ctx, id))
        })
        .collect()
}
