//! Extension hints for common `Content-Type` values.

const TABLE: &[(&str, &str)] = &[
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/x-matroska", "mkv"),
    ("video/x-flv", "flv"),
    ("video/mp2t", "ts"),
    ("audio/mpeg", "mp3"),
    ("audio/mp4", "m4a"),
    ("audio/ogg", "ogg"),
    ("application/zip", "zip"),
    ("application/pdf", "pdf"),
    ("application/x-bittorrent", "torrent"),
    ("application/vnd.apple.mpegurl", "m3u8"),
    ("application/x-mpegurl", "m3u8"),
    ("application/json", "json"),
    ("application/gzip", "gz"),
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
];

/// Extension for `content_type`, ignoring parameters after `;`.
/// `application/octet-stream` and unknown types give `None`.
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim();
    TABLE
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}
