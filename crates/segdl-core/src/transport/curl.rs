//! libcurl transport (via the `curl` crate).

use std::cell::{Cell, RefCell};
use std::str;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::time::Duration;

use curl::easy::{Easy, List};

use super::parse::{is_status_line, parse_probe_headers, parse_response_head};
use super::{range_spec, Headers, ProbeResult, RangeStream, ResponseHead, Transport};
use crate::retry::FetchError;

/// Chunks buffered between the curl thread and the worker.
const CHANNEL_DEPTH: usize = 8;

/// Curl-backed transport. Timeouts are per request; there is no job deadline.
#[derive(Debug, Clone, Copy)]
pub struct CurlTransport {
    pub connect_timeout: Duration,
    /// Hard limit for the probe request.
    pub probe_timeout: Duration,
    /// Abort a range transfer slower than this many bytes/s ...
    pub low_speed_limit: u32,
    /// ... for this long.
    pub low_speed_time: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
        }
    }
}

enum Frame {
    Head(ResponseHead),
    Data(Vec<u8>),
    End,
    Failed(curl::Error),
}

fn header_list(headers: &Headers) -> Result<List, curl::Error> {
    let mut list = List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    Ok(list)
}

fn collect_header_line(lines: &RefCell<Vec<String>>, data: &[u8]) {
    if let Ok(s) = str::from_utf8(data) {
        let line = s.trim_end();
        let mut lines = lines.borrow_mut();
        if is_status_line(line) {
            lines.clear();
        }
        lines.push(line.to_string());
    }
}

impl CurlTransport {
    fn base_handle(&self, url: &str, headers: &Headers) -> Result<Easy, curl::Error> {
        let mut easy = Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        if !headers.is_empty() {
            easy.http_headers(header_list(headers)?)?;
        }
        Ok(easy)
    }
}

impl Transport for CurlTransport {
    fn probe(&self, url: &str, headers: &Headers) -> Result<ProbeResult, FetchError> {
        let lines = RefCell::new(Vec::new());
        let mut easy = self.base_handle(url, headers)?;
        easy.timeout(self.probe_timeout)?;

        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                collect_header_line(&lines, data);
                true
            })?;
            // Only the headers matter; abort at the first body byte.
            transfer.write_function(|_| Ok(0))?;
            transfer.perform()
        };
        match performed {
            Ok(()) => {}
            Err(e) if e.is_write_error() => {}
            Err(e) => return Err(FetchError::Curl(e)),
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        Ok(parse_probe_headers(&lines.into_inner()))
    }

    fn open_range(
        &self,
        url: &str,
        headers: &Headers,
        start: u64,
        end: Option<u64>,
    ) -> Result<Box<dyn RangeStream>, FetchError> {
        let mut easy = self.base_handle(url, headers)?;
        easy.range(&range_spec(start, end))?;
        easy.low_speed_limit(self.low_speed_limit)?;
        easy.low_speed_time(self.low_speed_time)?;

        let (tx, rx) = mpsc::sync_channel(CHANNEL_DEPTH);
        std::thread::Builder::new()
            .name("segdl-range".to_string())
            .spawn(move || perform_range(easy, tx))
            .map_err(|_| FetchError::Closed)?;

        Ok(Box::new(CurlRangeStream::await_head(rx)?))
    }
}

/// Runs one range transfer, forwarding the response head and body chunks.
fn perform_range(mut easy: Easy, tx: SyncSender<Frame>) {
    let lines = RefCell::new(Vec::new());
    let head_sent = Cell::new(false);
    let send_head = || {
        head_sent.set(true);
        tx.send(Frame::Head(parse_response_head(&lines.borrow())))
    };

    match stream_body(&mut easy, &lines, &head_sent, &send_head, &tx) {
        Ok(()) => {
            if !head_sent.get() {
                let _ = send_head();
            }
            let _ = tx.send(Frame::End);
        }
        // Reader went away.
        Err(e) if e.is_write_error() => {}
        Err(e) => {
            let _ = tx.send(Frame::Failed(e));
        }
    }
}

/// A dropped receiver makes the write callback return 0, which aborts the transfer.
fn stream_body<F>(
    easy: &mut Easy,
    lines: &RefCell<Vec<String>>,
    head_sent: &Cell<bool>,
    send_head: &F,
    tx: &SyncSender<Frame>,
) -> Result<(), curl::Error>
where
    F: Fn() -> Result<(), mpsc::SendError<Frame>>,
{
    let mut transfer = easy.transfer();
    transfer.header_function(|data| {
        collect_header_line(lines, data);
        true
    })?;
    transfer.write_function(|data| {
        if data.is_empty() {
            return Ok(0);
        }
        if !head_sent.get() && send_head().is_err() {
            return Ok(0);
        }
        match tx.send(Frame::Data(data.to_vec())) {
            Ok(()) => Ok(data.len()),
            Err(_) => Ok(0),
        }
    })?;
    transfer.perform()
}

struct CurlRangeStream {
    head: ResponseHead,
    rx: Receiver<Frame>,
    finished: bool,
}

impl CurlRangeStream {
    fn await_head(rx: Receiver<Frame>) -> Result<Self, FetchError> {
        match rx.recv() {
            Ok(Frame::Head(head)) if (200..300).contains(&head.status) => Ok(Self {
                head,
                rx,
                finished: false,
            }),
            Ok(Frame::Head(head)) => Err(FetchError::Http(head.status)),
            Ok(Frame::Failed(e)) => Err(FetchError::Curl(e)),
            Ok(Frame::Data(_)) | Ok(Frame::End) | Err(_) => Err(FetchError::Closed),
        }
    }
}

impl RangeStream for CurlRangeStream {
    fn content_range_start(&self) -> Option<u64> {
        self.head.content_range_start
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, FetchError> {
        if self.finished {
            return Ok(None);
        }
        loop {
            match self.rx.recv() {
                Ok(Frame::Data(chunk)) => return Ok(Some(chunk)),
                Ok(Frame::End) => {
                    self.finished = true;
                    return Ok(None);
                }
                Ok(Frame::Head(_)) => continue,
                Ok(Frame::Failed(e)) => return Err(FetchError::Curl(e)),
                Err(_) => return Err(FetchError::Closed),
            }
        }
    }
}
