//! Download job: probe, plan or resume, run the worker pool, stop and persist.
//!
//! `open` does everything that needs the network or the filesystem before any
//! worker runs; `start` only spawns threads; `stop` joins them and writes the
//! resume trailer.

mod error;
mod options;

pub use error::JobError;
pub use options::JobOptions;

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::control::{JobState, StateCell};
use crate::resume;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::scheduler::{self, JobContext, ProgressStats, SpeedMeter, WorkQueue};
use crate::segmenter::{plan_parts, Part, PartStatus, PartTable};
use crate::storage::DestinationFile;
use crate::transport::{CurlTransport, Headers, ProbeResult, Transport};
use crate::url_model::{merge_headers, resolve_filename, split_inline_headers, FilenameHints};

/// Threads owned by a started job.
#[derive(Default)]
struct Runtime {
    workers: Vec<JoinHandle<()>>,
    meter: Option<JoinHandle<()>>,
    started: bool,
    closed: bool,
}

/// One segmented download.
///
/// Constructed with [`DownloadJob::open`], driven with [`start`](Self::start)
/// and [`stop`](Self::stop), observed through the read-only accessors.
pub struct DownloadJob {
    url: String,
    filename: String,
    full_path: PathBuf,
    size: Option<u64>,
    max_connections: usize,
    /// Ranges work, so a stopped job can be persisted and resumed.
    resumable: bool,
    /// Bytes already on disk when the job was opened.
    start_downloaded: u64,
    speed_interval: Duration,
    state: Arc<StateCell>,
    /// `None` when the probe failed.
    ctx: Option<Arc<JobContext>>,
    probe_failure: Option<String>,
    meter: Arc<SpeedMeter>,
    runtime: Mutex<Runtime>,
}

impl DownloadJob {
    /// Open a job using the curl transport.
    pub fn open_default(options: JobOptions) -> Result<Self, JobError> {
        Self::open(options, Arc::new(CurlTransport::default()))
    }

    /// Probe the server, open the destination file, and build the part table,
    /// either recovered from the file's trailer or freshly planned.
    ///
    /// A failed probe yields a job in [`JobState::Error`]; only filesystem
    /// failures are returned as errors.
    pub fn open(options: JobOptions, transport: Arc<dyn Transport>) -> Result<Self, JobError> {
        let (url, inline) = split_inline_headers(&options.url);
        let mut headers = Headers::new();
        headers.insert("User-Agent".to_string(), options.user_agent.clone());
        merge_headers(&mut headers, options.headers.clone());
        merge_headers(&mut headers, inline);

        let state = Arc::new(StateCell::new(JobState::Connecting));
        tracing::info!(url = %url, "probing");
        let policy = RetryPolicy::probe(options.probe_attempts);
        let probe = match run_with_retry(&policy, || transport.probe(&url, &headers)) {
            Ok(probe) => probe,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "probe failed");
                state.set(JobState::Error);
                let filename =
                    resolve_filename(options.filename.as_deref(), &url, FilenameHints::default());
                let full_path = options.dest_dir.join(&filename);
                return Ok(Self {
                    url,
                    filename,
                    full_path,
                    size: None,
                    max_connections: options.max_connections.max(1),
                    resumable: false,
                    start_downloaded: 0,
                    speed_interval: options.speed_interval,
                    state,
                    ctx: None,
                    probe_failure: Some(JobError::Probe(e).to_string()),
                    meter: Arc::new(SpeedMeter::new()),
                    runtime: Mutex::new(Runtime::default()),
                });
            }
        };

        let segmentable = probe.segmentable_size().is_some();
        let (max_connections, part_size, resume_enabled, start_from) = if segmentable {
            (
                options.max_connections.max(1),
                options.part_size,
                options.resume,
                options.start_from,
            )
        } else {
            tracing::warn!(
                url = %url,
                size = ?probe.total_size,
                accept_ranges = probe.accept_ranges,
                "server cannot serve ranges: one connection, resume disabled"
            );
            (1, 0, false, None)
        };

        let filename = resolve_filename(options.filename.as_deref(), &url, hints(&probe));
        std::fs::create_dir_all(&options.dest_dir)
            .with_context(|| format!("failed to create {}", options.dest_dir.display()))
            .map_err(JobError::Filesystem)?;
        let full_path = options.dest_dir.join(&filename);
        let file = DestinationFile::open(&full_path).map_err(JobError::Filesystem)?;
        let size = probe.total_size;

        let recovered = if resume_enabled {
            match resume::recover(&file, &url, size) {
                Ok(snapshot) => Some(snapshot.parts),
                Err(e) => {
                    tracing::info!(path = %full_path.display(), reason = %e, "no usable resume state, starting fresh");
                    None
                }
            }
        } else {
            None
        };
        let parts = match recovered {
            Some(mut parts) => {
                options.schedule.order_resumed(&mut parts, start_from);
                parts
            }
            None => {
                file.truncate(0)
                    .with_context(|| format!("failed to truncate {}", full_path.display()))
                    .map_err(JobError::Filesystem)?;
                let mut parts = plan_parts(size, part_size);
                options.schedule.order_fresh(&mut parts, start_from);
                parts
            }
        };

        let table = PartTable::new(url.clone(), size, &parts);
        let start_downloaded = table.downloaded();
        let queue = WorkQueue::new(table.unfinished_indices());
        tracing::info!(
            path = %full_path.display(),
            size = ?size,
            parts = table.len(),
            downloaded = start_downloaded,
            connections = max_connections,
            "job opened"
        );

        let ctx = Arc::new(JobContext {
            url: url.clone(),
            headers,
            transport,
            table,
            queue,
            file,
            state: Arc::clone(&state),
            ranges_supported: segmentable,
            part_backoff: options.part_backoff,
            failure: Mutex::new(None),
        });
        state.set(JobState::Stopped);

        Ok(Self {
            url,
            filename,
            full_path,
            size,
            max_connections,
            resumable: segmentable,
            start_downloaded,
            speed_interval: options.speed_interval,
            state,
            ctx: Some(ctx),
            probe_failure: None,
            meter: Arc::new(SpeedMeter::new()),
            runtime: Mutex::new(Runtime::default()),
        })
    }

    fn runtime(&self) -> MutexGuard<'_, Runtime> {
        self.runtime.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Spawn the workers and the speed meter.
    ///
    /// No-op for a job in `Error` or `Completed`, or one already started.
    /// Fails with [`JobError::Closed`] after [`stop`](Self::stop).
    pub fn start(&self) -> Result<(), JobError> {
        let Some(ctx) = &self.ctx else {
            return Ok(());
        };
        let mut rt = self.runtime();
        if rt.closed {
            return Err(JobError::Closed);
        }
        if rt.started || !self.state.transition(JobState::Stopped, JobState::Downloading) {
            return Ok(());
        }
        rt.started = true;
        let started = Instant::now();

        let workers = match scheduler::spawn_workers(ctx, self.max_connections) {
            Ok(workers) => workers,
            Err(e) => {
                self.state.transition(JobState::Downloading, JobState::Error);
                return Err(JobError::Spawn(e));
            }
        };
        rt.workers = workers;

        let meter = Arc::clone(&self.meter);
        let meter_ctx = Arc::clone(ctx);
        let interval = self.speed_interval;
        let baseline = self.start_downloaded;
        match std::thread::Builder::new()
            .name("segdl-speed".to_string())
            .spawn(move || meter.run(&meter_ctx, interval, baseline, started))
        {
            Ok(handle) => rt.meter = Some(handle),
            Err(e) => tracing::warn!(error = %e, "speed meter not started"),
        }
        tracing::info!(url = %self.url, workers = rt.workers.len(), "download started");
        Ok(())
    }

    /// Stop the workers, persist resume state, and close the file.
    ///
    /// With `erase`, the destination file is deleted instead of persisted.
    /// Calling it again is a no-op.
    pub fn stop(&self, erase: bool) -> Result<(), JobError> {
        let mut rt = self.runtime();
        if rt.closed {
            return Ok(());
        }
        rt.closed = true;
        self.state.transition(JobState::Downloading, JobState::Stopped);
        for handle in rt.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker panicked");
            }
        }
        if let Some(handle) = rt.meter.take() {
            if handle.join().is_err() {
                tracing::error!("speed meter panicked");
            }
        }
        drop(rt);

        let Some(ctx) = &self.ctx else {
            return Ok(());
        };
        let mut result = Ok(());
        let persist = self.resumable
            && !erase
            && self.state.get() != JobState::Completed
            && ctx.file.is_open();
        if persist {
            match resume::persist(&ctx.file, &ctx.table) {
                Ok(offset) => tracing::info!(
                    path = %self.full_path.display(),
                    offset,
                    downloaded = ctx.table.downloaded(),
                    "resume state saved"
                ),
                Err(e) => {
                    result = Err(JobError::Filesystem(
                        anyhow::Error::new(e).context("failed to save resume state"),
                    ))
                }
            }
        }
        if let Err(e) = ctx.file.close() {
            result = result.and(Err(JobError::Filesystem(e)));
        }
        if erase {
            match std::fs::remove_file(&self.full_path) {
                Ok(()) => tracing::info!(path = %self.full_path.display(), "destination erased"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    let e = anyhow::Error::new(e)
                        .context(format!("failed to remove {}", self.full_path.display()));
                    result = result.and(Err(JobError::Filesystem(e)));
                }
            }
        }
        tracing::info!(url = %self.url, state = %self.state.get(), "download stopped");
        result
    }

    pub fn state(&self) -> JobState {
        self.state.get()
    }

    /// Block until the job leaves `Downloading` or `timeout` passes.
    /// Returns true if it is still downloading.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.state.wait_while_downloading(timeout)
    }

    /// Why the job is in `Error`, if it is.
    pub fn failure(&self) -> Option<String> {
        if let Some(msg) = &self.probe_failure {
            return Some(msg.clone());
        }
        let ctx = self.ctx.as_ref()?;
        let failure = ctx.failure.lock().unwrap_or_else(|e| e.into_inner());
        failure.clone()
    }

    /// `(active, max)`: parts holding a connection and the worker count.
    pub fn connections(&self) -> (usize, usize) {
        let active = self.ctx.as_ref().map_or(0, |ctx| ctx.table.active_count());
        (active, self.max_connections)
    }

    /// Sum of downloaded bytes over all parts.
    pub fn downloaded(&self) -> u64 {
        self.ctx.as_ref().map_or(0, |ctx| ctx.table.downloaded())
    }

    /// Bytes already on disk when the job was opened.
    pub fn start_downloaded(&self) -> u64 {
        self.start_downloaded
    }

    /// Bytes per second over the last meter interval.
    pub fn speed(&self) -> f64 {
        self.meter.latest().current
    }

    /// Bytes per second since `start`, excluding recovered bytes.
    pub fn average_speed(&self) -> f64 {
        self.meter.latest().average
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Whether parts are fetched with range requests and the job can resume.
    pub fn is_resumable(&self) -> bool {
        self.resumable
    }

    /// Percentage in `[0, 100]`. A completed job reports 100 even when the
    /// size is unknown.
    pub fn progress(&self) -> f64 {
        if self.state() == JobState::Completed {
            return 100.0;
        }
        self.progress_stats()
            .fraction()
            .map_or(0.0, |fraction| fraction * 100.0)
    }

    pub fn remaining_time(&self) -> Option<Duration> {
        self.progress_stats().eta()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// URL without inline headers.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Per-part records in schedule order.
    pub fn parts(&self) -> Vec<Part> {
        self.ctx
            .as_ref()
            .map_or_else(Vec::new, |ctx| ctx.table.snapshot())
    }

    pub fn progress_stats(&self) -> ProgressStats {
        let throughput = self.meter.latest();
        let Some(ctx) = &self.ctx else {
            return ProgressStats {
                total_bytes: self.size,
                max_connections: self.max_connections,
                ..ProgressStats::default()
            };
        };
        ProgressStats {
            bytes_done: ctx.table.downloaded(),
            total_bytes: self.size,
            bytes_per_sec: throughput.current,
            average_bytes_per_sec: throughput.average,
            active_connections: ctx.table.active_count(),
            max_connections: self.max_connections,
            parts_done: ctx
                .table
                .iter()
                .filter(|slot| slot.status() == PartStatus::Completed)
                .count(),
            part_count: ctx.table.len(),
        }
    }
}

impl Drop for DownloadJob {
    fn drop(&mut self) {
        if let Err(e) = self.stop(false) {
            tracing::warn!(error = %e, "stop on drop failed");
        }
    }
}

fn hints(probe: &ProbeResult) -> FilenameHints<'_> {
    FilenameHints {
        content_disposition: probe.content_disposition.as_deref(),
        content_type: probe.content_type.as_deref(),
    }
}

#[cfg(test)]
mod tests;
