//! Pending-work queue shared by the worker pool.
//!
//! Holds schedule positions (indices into the part table) that are not yet
//! claimed, plus the number of claimed parts still in flight. Both live under
//! one lock so "nothing pending and nothing in flight" is observed atomically,
//! and only one worker ever sees the queue drained.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

/// Result of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Work on this part.
    Part(usize),
    /// Nothing pending, but other parts are still in flight.
    Idle,
    /// Nothing pending or in flight. Returned to exactly one caller.
    Drained,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: BTreeSet<usize>,
    in_flight: usize,
    drained: bool,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    inner: Mutex<QueueState>,
}

impl WorkQueue {
    pub fn new(pending: impl IntoIterator<Item = usize>) -> Self {
        Self {
            inner: Mutex::new(QueueState {
                pending: pending.into_iter().collect(),
                ..QueueState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take the lowest pending index (the front of the schedule).
    pub fn claim(&self) -> Claim {
        let mut q = self.lock();
        if let Some(index) = q.pending.pop_first() {
            q.in_flight += 1;
            return Claim::Part(index);
        }
        if q.in_flight == 0 && !q.drained {
            q.drained = true;
            return Claim::Drained;
        }
        Claim::Idle
    }

    /// Give a failed part back for retry.
    pub fn release(&self, index: usize) {
        let mut q = self.lock();
        q.pending.insert(index);
        q.in_flight = q.in_flight.saturating_sub(1);
    }

    /// A claimed part is done with (completed, or abandoned because the job stopped).
    pub fn finish(&self, _index: usize) {
        let mut q = self.lock();
        q.in_flight = q.in_flight.saturating_sub(1);
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}
