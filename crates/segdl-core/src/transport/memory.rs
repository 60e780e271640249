//! In-memory transport double for scheduler and job tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Headers, ProbeResult, RangeStream, Transport};
use crate::retry::FetchError;

pub(crate) struct MemoryTransport {
    body: Arc<Vec<u8>>,
    pub accept_ranges: bool,
    pub chunk_size: usize,
    pub chunk_delay: Duration,
    pub fail_probe: bool,
    /// Next N metadata requests fail with a TLS handshake error.
    pub tls_failures: AtomicUsize,
    /// Next N range responses report a start offset one past the request.
    pub mismatches: AtomicUsize,
    /// Next N range requests fail to connect.
    pub connect_failures: AtomicUsize,
    /// Next N range streams fail with a receive error after their first chunk.
    pub read_failures: AtomicUsize,
    /// Next N range streams end cleanly after their first chunk.
    pub early_ends: AtomicUsize,
    pub requests: Mutex<Vec<(u64, Option<u64>)>>,
    pub probes: AtomicUsize,
}

impl MemoryTransport {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body: Arc::new(body),
            accept_ranges: true,
            chunk_size: 1024,
            chunk_delay: Duration::ZERO,
            fail_probe: false,
            tls_failures: AtomicUsize::new(0),
            mismatches: AtomicUsize::new(0),
            connect_failures: AtomicUsize::new(0),
            read_failures: AtomicUsize::new(0),
            early_ends: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> Vec<(u64, Option<u64>)> {
        self.requests.lock().unwrap().clone()
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl Transport for MemoryTransport {
    fn probe(&self, _url: &str, _headers: &Headers) -> Result<ProbeResult, FetchError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.fail_probe {
            return Err(FetchError::Closed);
        }
        if take_one(&self.tls_failures) {
            // CURLE_SSL_CONNECT_ERROR
            return Err(FetchError::Curl(curl::Error::new(35)));
        }
        Ok(ProbeResult {
            total_size: Some(self.body.len() as u64),
            accept_ranges: self.accept_ranges,
            content_type: Some("application/octet-stream".to_string()),
            content_disposition: None,
        })
    }

    fn open_range(
        &self,
        _url: &str,
        _headers: &Headers,
        start: u64,
        end: Option<u64>,
    ) -> Result<Box<dyn RangeStream>, FetchError> {
        self.requests.lock().unwrap().push((start, end));
        if take_one(&self.connect_failures) {
            return Err(FetchError::Closed);
        }
        let total = self.body.len() as u64;
        let (from, to, reported) = if self.accept_ranges {
            let to = end.map(|e| e + 1).unwrap_or(total).min(total);
            let reported = if take_one(&self.mismatches) {
                start + 1
            } else {
                start
            };
            (start.min(to), to, Some(reported))
        } else {
            (0, total, None)
        };
        let chunks: VecDeque<Vec<u8>> = self.body[from as usize..to as usize]
            .chunks(self.chunk_size.max(1))
            .map(|c| c.to_vec())
            .collect();
        let cut = if chunks.len() < 2 {
            None
        } else if take_one(&self.read_failures) {
            Some(Cut::Fail)
        } else if take_one(&self.early_ends) {
            Some(Cut::End)
        } else {
            None
        };
        Ok(Box::new(MemoryStream {
            reported,
            chunks,
            delay: self.chunk_delay,
            cut,
            served: 0,
        }))
    }
}

#[derive(Clone, Copy)]
enum Cut {
    Fail,
    End,
}

struct MemoryStream {
    reported: Option<u64>,
    chunks: VecDeque<Vec<u8>>,
    delay: Duration,
    /// Applied once the first chunk has been served.
    cut: Option<Cut>,
    served: usize,
}

impl RangeStream for MemoryStream {
    fn content_range_start(&self) -> Option<u64> {
        self.reported
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, FetchError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match self.cut {
            Some(Cut::Fail) if self.served > 0 => {
                // CURLE_RECV_ERROR
                return Err(FetchError::Curl(curl::Error::new(56)));
            }
            Some(Cut::End) if self.served > 0 => return Ok(None),
            _ => {}
        }
        self.served += 1;
        Ok(self.chunks.pop_front())
    }
}
