//! Progress snapshot for monitors (bytes done, ETA, rate).

use std::time::Duration;

/// Snapshot of download progress for one job (CLI-friendly).
#[derive(Debug, Clone, Default)]
pub struct ProgressStats {
    /// Bytes written so far.
    pub bytes_done: u64,
    /// Total file size in bytes, if known.
    pub total_bytes: Option<u64>,
    /// Throughput over the last meter interval (bytes/s).
    pub bytes_per_sec: f64,
    /// Throughput since start (bytes/s).
    pub average_bytes_per_sec: f64,
    /// Parts connecting or downloading.
    pub active_connections: usize,
    pub max_connections: usize,
    pub parts_done: usize,
    pub part_count: usize,
}

impl ProgressStats {
    /// Estimated time remaining at the current rate (None if rate is 0 or size unknown).
    pub fn eta(&self) -> Option<Duration> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(Duration::ZERO);
        }
        if self.bytes_per_sec <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / self.bytes_per_sec))
    }

    /// Fraction complete in [0.0, 1.0] (None if size unknown).
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_done as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}
