//! Part record and status.

use serde::{Deserialize, Serialize};

/// Status of one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PartStatus {
    Pending = 0,
    Connecting = 1,
    Downloading = 2,
    Completed = 3,
    Error = 4,
}

impl PartStatus {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => PartStatus::Connecting,
            2 => PartStatus::Downloading,
            3 => PartStatus::Completed,
            4 => PartStatus::Error,
            _ => PartStatus::Pending,
        }
    }

    /// Connecting or downloading: the part holds a connection.
    pub fn is_active(self) -> bool {
        matches!(self, PartStatus::Connecting | PartStatus::Downloading)
    }
}

/// A contiguous byte range of the resource: `[start, end]` inclusive.
///
/// `end` is `None` only when the server gave no usable length; such a part
/// completes when its stream ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub start: u64,
    pub end: Option<u64>,
    /// Next byte offset to write.
    pub current: u64,
    pub status: PartStatus,
}

impl Part {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self {
            start,
            end,
            current: start,
            status: PartStatus::Pending,
        }
    }

    /// All bytes of a bounded part are written.
    pub fn is_complete(&self) -> bool {
        matches!(self.end, Some(end) if self.current > end)
    }

    /// Bytes written so far.
    pub fn downloaded(&self) -> u64 {
        self.current.saturating_sub(self.start)
    }

    /// Length in bytes, if bounded. Saturates on corrupt bounds.
    pub fn len(&self) -> Option<u64> {
        self.end
            .map(|end| end.saturating_add(1).saturating_sub(self.start))
    }
}
