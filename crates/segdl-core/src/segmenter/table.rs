//! Shared part table: an arena of part slots indexed by schedule position.
//!
//! A worker only touches the slot it claimed from the work queue, so slots
//! carry atomics instead of locks. `current` only moves forward while the job
//! is downloading (the single exception is rewinding a part on a server
//! without range support).

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use super::part::{Part, PartStatus};

/// Live state of one part.
#[derive(Debug)]
pub struct PartSlot {
    start: u64,
    end: Option<u64>,
    current: AtomicU64,
    status: AtomicU8,
}

impl PartSlot {
    fn from_part(part: &Part) -> Self {
        Self {
            start: part.start,
            end: part.end,
            current: AtomicU64::new(part.current),
            status: AtomicU8::new(part.status as u8),
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> Option<u64> {
        self.end
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    pub fn status(&self) -> PartStatus {
        PartStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: PartStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    /// Record `n` more bytes written at `current`.
    pub fn advance(&self, n: u64) {
        self.current.fetch_add(n, Ordering::AcqRel);
    }

    /// Restart the part from its first byte.
    pub(crate) fn rewind(&self) {
        self.current.store(self.start, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.snapshot().is_complete()
    }

    pub fn downloaded(&self) -> u64 {
        self.current().saturating_sub(self.start)
    }

    pub fn snapshot(&self) -> Part {
        Part {
            start: self.start,
            end: self.end,
            current: self.current(),
            status: self.status(),
        }
    }
}

/// Ordered part sequence plus the resource identity it belongs to.
#[derive(Debug)]
pub struct PartTable {
    url: String,
    size: Option<u64>,
    slots: Vec<PartSlot>,
}

impl PartTable {
    pub fn new(url: impl Into<String>, size: Option<u64>, parts: &[Part]) -> Self {
        Self {
            url: url.into(),
            size,
            slots: parts.iter().map(PartSlot::from_part).collect(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Expected total bytes, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> &PartSlot {
        &self.slots[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartSlot> {
        self.slots.iter()
    }

    /// Sum of `current - start` over all parts.
    pub fn downloaded(&self) -> u64 {
        self.slots.iter().map(PartSlot::downloaded).sum()
    }

    /// Parts currently connecting or downloading.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.status().is_active()).count()
    }

    /// Schedule positions of parts that still need work, in claim order.
    pub fn unfinished_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status() != PartStatus::Completed)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Part> {
        self.slots.iter().map(PartSlot::snapshot).collect()
    }
}
