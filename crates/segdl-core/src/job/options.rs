//! Per-job configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::SegdlConfig;
use crate::segmenter::SchedulePolicy;
use crate::transport::Headers;

/// Immutable settings for one download. Built from [`SegdlConfig`] and
/// adjusted with the builder-style setters before [`DownloadJob::open`].
///
/// [`DownloadJob::open`]: super::DownloadJob::open
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// May carry inline headers: `url|Name=value&Other=value`.
    pub url: String,
    pub dest_dir: PathBuf,
    pub filename: Option<String>,
    /// Merged over the default `User-Agent`.
    pub headers: Headers,
    pub resume: bool,
    pub max_connections: usize,
    pub part_size: u64,
    /// Seek bias as a percentage (0-100) of the parts after the reserved prefix.
    pub start_from: Option<f64>,
    pub schedule: SchedulePolicy,
    pub part_backoff: Duration,
    pub speed_interval: Duration,
    pub probe_attempts: u32,
    pub user_agent: String,
}

impl JobOptions {
    /// Options for `url` saved into `dest_dir`, with defaults from `cfg`.
    pub fn from_config(cfg: &SegdlConfig, url: impl Into<String>, dest_dir: impl AsRef<Path>) -> Self {
        Self {
            url: url.into(),
            dest_dir: dest_dir.as_ref().to_path_buf(),
            filename: None,
            headers: Headers::new(),
            resume: cfg.resume,
            max_connections: cfg.max_connections,
            part_size: cfg.part_size,
            start_from: None,
            schedule: cfg.schedule,
            part_backoff: Duration::from_millis(cfg.retry.part_backoff_ms),
            speed_interval: Duration::from_millis(cfg.retry.speed_interval_ms),
            probe_attempts: cfg.retry.probe_attempts,
            user_agent: cfg.user_agent.clone(),
        }
    }

    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    pub fn part_size(mut self, bytes: u64) -> Self {
        self.part_size = bytes;
        self
    }

    pub fn start_from(mut self, pct: f64) -> Self {
        self.start_from = Some(pct);
        self
    }

    pub fn schedule(mut self, policy: SchedulePolicy) -> Self {
        self.schedule = policy;
        self
    }

    pub fn part_backoff(mut self, backoff: Duration) -> Self {
        self.part_backoff = backoff;
        self
    }

    pub fn speed_interval(mut self, interval: Duration) -> Self {
        self.speed_interval = interval;
        self
    }

    pub fn probe_attempts(mut self, attempts: u32) -> Self {
        self.probe_attempts = attempts;
        self
    }
}
