//! Parse HTTP response header lines into probe and range metadata.

use super::{ProbeResult, ResponseHead};

/// True for a status line (`HTTP/1.1 206 Partial Content`, `HTTP/2 200`).
/// Curl reports one header block per redirect hop; a status line starts a new block.
pub(crate) fn is_status_line(line: &str) -> bool {
    line.len() >= 5 && line[..5].eq_ignore_ascii_case("HTTP/")
}

/// Status code from a status line.
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    if !is_status_line(line) {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Start offset of a `Content-Range: bytes start-end/total` value.
pub(crate) fn parse_content_range_start(value: &str) -> Option<u64> {
    let value = value.trim();
    let rest = value
        .strip_prefix("bytes")
        .or_else(|| value.strip_prefix("Bytes"))?
        .trim_start_matches([' ', '=']);
    let (start, _) = rest.split_once('-')?;
    start.trim().parse().ok()
}

fn header_pairs(lines: &[String]) -> impl Iterator<Item = (&str, &str)> {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !is_status_line(l))
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim(), v.trim()))
}

/// Parse the last header block into the probe result.
pub(crate) fn parse_probe_headers(lines: &[String]) -> ProbeResult {
    let mut result = ProbeResult::default();
    for (name, value) in header_pairs(lines) {
        if name.eq_ignore_ascii_case("content-length") {
            result.total_size = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            result.accept_ranges = value.eq_ignore_ascii_case("bytes");
        } else if name.eq_ignore_ascii_case("content-type") {
            result.content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-disposition") {
            result.content_disposition = Some(value.to_string());
        }
    }
    result
}

/// Parse status and `Content-Range` start from a range response.
pub(crate) fn parse_response_head(lines: &[String]) -> ResponseHead {
    let status = lines
        .iter()
        .rev()
        .find_map(|l| parse_status_line(l.trim()))
        .unwrap_or(0);
    let content_range_start = header_pairs(lines)
        .filter(|(name, _)| name.eq_ignore_ascii_case("content-range"))
        .find_map(|(_, value)| parse_content_range_start(value));
    ResponseHead {
        status,
        content_range_start,
    }
}
