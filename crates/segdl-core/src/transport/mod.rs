//! HTTP transport: metadata probe and range requests.
//!
//! `Transport` is the seam between the scheduler and the network. The curl
//! implementation streams each range body from a helper thread through a
//! bounded channel so workers can pull chunks and check the job state between
//! them.

mod curl;
#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod parse;

pub use self::curl::CurlTransport;

use crate::retry::FetchError;
use std::collections::HashMap;

/// Request headers, name -> value.
pub type Headers = HashMap<String, String>;

/// Metadata learned from the initial probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub total_size: Option<u64>,
    /// True if server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `Content-Type` value if present (extension hint).
    pub content_type: Option<String>,
    /// `Content-Disposition` value if present (filename hint).
    pub content_disposition: Option<String>,
}

impl ProbeResult {
    /// Size that can be split into parts: ranges advertised and a non-zero length.
    pub fn segmentable_size(&self) -> Option<u64> {
        match self.total_size {
            Some(n) if n > 0 && self.accept_ranges => Some(n),
            _ => None,
        }
    }
}

/// Status line and range start of a range response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u32,
    /// Start offset from `Content-Range`, `None` when the header is absent.
    pub content_range_start: Option<u64>,
}

/// Body of an open range request.
pub trait RangeStream: Send {
    /// Start offset reported by the server (`Content-Range`), if any.
    fn content_range_start(&self) -> Option<u64>;

    /// Next chunk of the body; `Ok(None)` once the stream is exhausted.
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, FetchError>;
}

/// Network collaborator used by `DownloadJob`.
pub trait Transport: Send + Sync {
    /// Single metadata request; retries are the caller's concern.
    fn probe(&self, url: &str, headers: &Headers) -> Result<ProbeResult, FetchError>;

    /// GET with `Range: bytes=start-end` (`end` inclusive, open-ended when `None`).
    /// Fails with `FetchError::Http` on a non-2xx status.
    fn open_range(
        &self,
        url: &str,
        headers: &Headers,
        start: u64,
        end: Option<u64>,
    ) -> Result<Box<dyn RangeStream>, FetchError>;
}

/// Inclusive byte range in `Range` syntax without the unit: `start-end` or `start-`.
pub(crate) fn range_spec(start: u64, end: Option<u64>) -> String {
    match end {
        Some(end) => format!("{}-{}", start, end),
        None => format!("{}-", start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_spec_bounded_and_open() {
        assert_eq!(range_spec(0, Some(99)), "0-99");
        assert_eq!(range_spec(42, Some(42)), "42-42");
        assert_eq!(range_spec(1024, None), "1024-");
    }

    #[test]
    fn segmentable_size_requires_ranges_and_length() {
        let mut probe = ProbeResult {
            total_size: Some(100),
            accept_ranges: true,
            ..Default::default()
        };
        assert_eq!(probe.segmentable_size(), Some(100));
        probe.accept_ranges = false;
        assert_eq!(probe.segmentable_size(), None);
        probe.accept_ranges = true;
        probe.total_size = Some(0);
        assert_eq!(probe.segmentable_size(), None);
        probe.total_size = None;
        assert_eq!(probe.segmentable_size(), None);
    }
}
