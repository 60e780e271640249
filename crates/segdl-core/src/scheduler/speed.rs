//! Periodic throughput meter. Observability only; scheduling never reads it.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::JobContext;

/// Throughput in bytes per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Throughput {
    /// Over the last meter interval.
    pub current: f64,
    /// Since the job started, excluding bytes recovered from a previous run.
    pub average: f64,
}

#[derive(Debug, Default)]
pub struct SpeedMeter {
    latest: Mutex<Throughput>,
}

fn rate(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        0.0
    } else {
        bytes as f64 / secs
    }
}

impl SpeedMeter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Throughput> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn latest(&self) -> Throughput {
        *self.lock()
    }

    /// Fold in a sample: `downloaded` bytes total, `baseline` bytes at start.
    fn record(&self, sample: Sample, prev: Sample, baseline: u64, started: Instant) {
        let current = rate(
            sample.bytes.saturating_sub(prev.bytes),
            sample.at.saturating_duration_since(prev.at),
        );
        let average = rate(
            sample.bytes.saturating_sub(baseline),
            sample.at.saturating_duration_since(started),
        );
        *self.lock() = Throughput { current, average };
    }

    /// Tick every `interval` while the job is downloading.
    pub(crate) fn run(&self, ctx: &JobContext, interval: Duration, baseline: u64, started: Instant) {
        let mut prev = Sample {
            bytes: ctx.table.downloaded(),
            at: Instant::now(),
        };
        while ctx.state.wait_while_downloading(interval) {
            let sample = Sample {
                bytes: ctx.table.downloaded(),
                at: Instant::now(),
            };
            self.record(sample, prev, baseline, started);
            prev = sample;
        }
        self.lock().current = 0.0;
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    bytes: u64,
    at: Instant,
}
