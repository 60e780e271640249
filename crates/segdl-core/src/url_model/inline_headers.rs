//! `url|Name=value&Other=value` inline header syntax.

use crate::transport::Headers;

/// Split `input` at the first `|` into the bare URL and its inline headers.
/// Values are form-decoded (`+` and percent escapes). Pairs with an empty
/// name are dropped.
pub fn split_inline_headers(input: &str) -> (String, Headers) {
    let Some((url, query)) = input.split_once('|') else {
        return (input.trim().to_string(), Headers::new());
    };
    let headers = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, value)| (name.trim().to_string(), value.into_owned()))
        .collect();
    (url.trim().to_string(), headers)
}

/// Insert `overrides` into `base`, replacing entries whose names match
/// case-insensitively.
pub fn merge_headers(base: &mut Headers, overrides: Headers) {
    for (name, value) in overrides {
        base.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        base.insert(name, value);
    }
}
