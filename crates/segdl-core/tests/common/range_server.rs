//! Minimal HTTP/1.1 server that supports Range GET for integration tests.
//!
//! Serves a single static body. Responds to GET with Range with 206 Partial
//! Content, and records every range it was asked for.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` header even if ranges work.
    pub advertise_ranges: bool,
    /// The first N range responses report a Content-Range start one past the request.
    pub misreport_first: usize,
    /// Body is written in chunks of this size...
    pub chunk_size: usize,
    /// ...with this pause after each chunk.
    pub chunk_delay: Duration,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            advertise_ranges: true,
            misreport_first: 0,
            chunk_size: 64 * 1024,
            chunk_delay: Duration::ZERO,
        }
    }
}

/// `(start, end_inclusive)` of a `Range: bytes=start-end` header.
pub type RequestedRange = (u64, Option<u64>);

pub struct RangeServer {
    base: String,
    requests: Arc<Mutex<Vec<RequestedRange>>>,
}

impl RangeServer {
    /// URL of `path` on this server (any path serves the same body).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    /// Ranges requested so far, in arrival order.
    pub fn requests(&self) -> Vec<RequestedRange> {
        self.requests.lock().unwrap().clone()
    }
}

struct Shared {
    body: Vec<u8>,
    opts: RangeServerOptions,
    misreports_left: AtomicUsize,
    requests: Arc<Mutex<Vec<RequestedRange>>>,
}

/// Starts a server in a background thread serving `body`. The server runs
/// until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

/// Like `start` but allows customizing server behavior (ranges missing, slow body, etc.).
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let shared = Arc::new(Shared {
        body,
        opts,
        misreports_left: AtomicUsize::new(opts.misreport_first),
        requests: Arc::clone(&requests),
    });
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let shared = Arc::clone(&shared);
            thread::spawn(move || handle(stream, &shared));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

fn handle(mut stream: TcpStream, shared: &Shared) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(10)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }

    let opts = shared.opts;
    let body = shared.body.as_slice();
    let total = body.len() as u64;
    let accept_ranges = if opts.advertise_ranges && opts.support_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };

    let (status, content_range, slice) = match range.filter(|_| opts.support_ranges) {
        Some((start, end)) => {
            shared.requests.lock().unwrap().push((start, end));
            let end_incl = end.unwrap_or(u64::MAX).min(total.saturating_sub(1));
            if start > end_incl || start >= total {
                (
                    "416 Range Not Satisfiable",
                    Some(format!("bytes */{}", total)),
                    &body[0..0],
                )
            } else {
                let reported = if take_one(&shared.misreports_left) {
                    start + 1
                } else {
                    start
                };
                (
                    "206 Partial Content",
                    Some(format!("bytes {}-{}/{}", reported, end_incl, total)),
                    &body[start as usize..=end_incl as usize],
                )
            }
        }
        None => {
            if let Some((start, end)) = range {
                shared.requests.lock().unwrap().push((start, end));
            }
            ("200 OK", None, body)
        }
    };

    let content_range = content_range
        .map(|v| format!("Content-Range: {}\r\n", v))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\n{}{}Connection: close\r\n\r\n",
        status,
        slice.len(),
        content_range,
        accept_ranges
    );
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    for chunk in slice.chunks(opts.chunk_size.max(1)) {
        if stream.write_all(chunk).is_err() {
            return;
        }
        if !opts.chunk_delay.is_zero() {
            thread::sleep(opts.chunk_delay);
        }
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<RequestedRange>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    let part = value[6..].trim();
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim().parse::<u64>().ok();
                        range = Some((start, end));
                    }
                }
            }
        }
    }
    (method, range)
}
