//! Job lifecycle state and the condition variable workers wait on.
//!
//! `DownloadJob` is the only writer of the state, with one exception: the
//! worker that drains the last part moves `Downloading -> Completed`. Workers
//! read the state at loop boundaries; sleeps (part backoff, speed meter tick)
//! wait on the condition variable so a stop wakes them immediately.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Lifecycle of a download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Stopped,
    Connecting,
    Downloading,
    Completed,
    Error,
}

impl JobState {
    /// Completed and Error never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Error)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Stopped => "stopped",
            JobState::Connecting => "connecting",
            JobState::Downloading => "downloading",
            JobState::Completed => "completed",
            JobState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Shared job state plus a condvar signalled on every transition.
#[derive(Debug)]
pub struct StateCell {
    state: Mutex<JobState>,
    changed: Condvar,
}

impl StateCell {
    pub fn new(initial: JobState) -> Self {
        Self {
            state: Mutex::new(initial),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self) -> JobState {
        *self.lock()
    }

    pub fn is_downloading(&self) -> bool {
        self.get() == JobState::Downloading
    }

    /// Moves to `to` only if the current state is `from`. Returns whether it moved.
    pub fn transition(&self, from: JobState, to: JobState) -> bool {
        let mut state = self.lock();
        if *state != from {
            return false;
        }
        *state = to;
        drop(state);
        self.changed.notify_all();
        tracing::debug!(%from, %to, "job state transition");
        true
    }

    /// Unconditionally sets the state (used before workers exist).
    pub(crate) fn set(&self, to: JobState) {
        *self.lock() = to;
        self.changed.notify_all();
    }

    /// Sleeps up to `timeout` while the job is downloading.
    /// Returns true if the job is still downloading afterwards.
    pub fn wait_while_downloading(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |s| *s == JobState::Downloading)
            .unwrap_or_else(|e| e.into_inner());
        *guard == JobState::Downloading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn transition_requires_expected_state() {
        let cell = StateCell::new(JobState::Stopped);
        assert!(!cell.transition(JobState::Downloading, JobState::Completed));
        assert!(cell.transition(JobState::Stopped, JobState::Downloading));
        assert!(cell.transition(JobState::Downloading, JobState::Completed));
        assert!(cell.get().is_terminal());
    }

    #[test]
    fn wait_wakes_on_stop() {
        let cell = Arc::new(StateCell::new(JobState::Downloading));
        let waiter = Arc::clone(&cell);
        let started = Instant::now();
        let handle = std::thread::spawn(move || waiter.wait_while_downloading(Duration::from_secs(30)));
        std::thread::sleep(Duration::from_millis(50));
        cell.transition(JobState::Downloading, JobState::Stopped);
        assert!(!handle.join().unwrap());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn wait_times_out_while_downloading() {
        let cell = StateCell::new(JobState::Downloading);
        assert!(cell.wait_while_downloading(Duration::from_millis(20)));
    }
}
