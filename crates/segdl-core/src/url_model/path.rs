//! Filename hint from the URL path.

use super::decode::percent_decode;

/// Last non-empty path segment of `url`, percent-decoded.
/// `None` for unparseable URLs, the root path, and `.`/`..`.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode(segment, true);
    match decoded.as_str() {
        "" | "." | ".." => None,
        _ => Some(decoded),
    }
}
