//! Linux-safe filename sanitization.

/// Linux NAME_MAX in bytes.
const NAME_MAX: usize = 255;

/// Replace path separators, NUL and control characters with `_` (collapsing
/// runs), trim leading/trailing dots, spaces and underscores, and cap the
/// length at 255 bytes on a char boundary.
pub fn sanitize_filename_for_linux(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let unsafe_char = matches!(c, '/' | '\\' | '\0') || c.is_control();
        if unsafe_char {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c: char| c == '.' || c == '_' || c.is_whitespace());
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
