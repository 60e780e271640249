//! URL handling and filename derivation.
//!
//! Splits inline headers off the URL and picks a safe local filename from
//! an override, `Content-Disposition`, `Content-Type` and the URL path.

mod content_disposition;
mod decode;
mod inline_headers;
mod mime;
mod path;
mod sanitize;

pub use content_disposition::parse_content_disposition_filename;
pub use inline_headers::{merge_headers, split_inline_headers};
pub use mime::extension_for_mime;
pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename_for_linux;

/// Used when nothing else yields a usable name.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Server-side hints for [`resolve_filename`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameHints<'a> {
    pub content_disposition: Option<&'a str>,
    pub content_type: Option<&'a str>,
}

/// Pick the local filename for `url`.
///
/// The name comes from `override_name`, else the Content-Disposition
/// filename, else the last URL path segment. When it has no extension one
/// is appended from the Content-Disposition name, the MIME type, or the URL
/// path, in that order. The result is sanitized and falls back to
/// [`DEFAULT_FILENAME`].
pub fn resolve_filename(override_name: Option<&str>, url: &str, hints: FilenameHints<'_>) -> String {
    let cd_name = hints
        .content_disposition
        .and_then(parse_content_disposition_filename);
    let url_name = filename_from_url_path(url);

    let chosen = override_name
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| cd_name.clone())
        .or_else(|| url_name.clone());
    let Some(mut name) = chosen else {
        return DEFAULT_FILENAME.to_string();
    };

    if extension(&name).is_none() {
        let ext = cd_name
            .as_deref()
            .and_then(extension)
            .or_else(|| hints.content_type.and_then(extension_for_mime))
            .or_else(|| url_name.as_deref().and_then(extension));
        if let Some(ext) = ext {
            name.push('.');
            name.push_str(ext);
        }
    }

    let sanitized = sanitize_filename_for_linux(&name);
    if sanitized.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Extension after the last `.`, ignoring dotfiles and names ending in `.`.
fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains(['/', ' ']) {
        return None;
    }
    Some(ext)
}
