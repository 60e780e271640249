//! Content-Disposition filename extraction.

use super::decode::percent_decode;

/// Filename from a `Content-Disposition` value (`attachment` or `inline`).
///
/// `filename*=UTF-8''...` (RFC 5987) wins over `filename=`; quoted values
/// have `\"` and `\\` unescaped and are `+`/percent decoded.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let mut params = header_value.split(';').map(str::trim);
    let disposition = params.next()?;
    if !disposition.eq_ignore_ascii_case("attachment") && !disposition.eq_ignore_ascii_case("inline")
    {
        return None;
    }

    let mut plain = None;
    let mut extended = None;
    for param in params {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("filename*") {
            extended = decode_extended(value);
        } else if name.eq_ignore_ascii_case("filename") {
            plain = Some(percent_decode(&unquote(value), true));
        }
    }
    extended.or(plain).filter(|s| !s.is_empty())
}

/// `charset'lang'percent-encoded`; only UTF-8 (and its ASCII subset) is accepted.
fn decode_extended(value: &str) -> Option<String> {
    let mut pieces = value.splitn(3, '\'');
    let charset = pieces.next()?;
    let _lang = pieces.next()?;
    let encoded = pieces.next()?;
    if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("us-ascii") {
        return None;
    }
    Some(percent_decode(encoded, false))
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped || c != '\\' {
            out.push(c);
            escaped = false;
        } else {
            escaped = true;
        }
    }
    out
}
