//! Checks a decoded snapshot against the probed resource before reuse.

use super::error::ResumeError;
use super::snapshot::Snapshot;

/// Returns Ok(()) if `snapshot` describes the resource at `url` with `size`
/// bytes and its parts are internally consistent.
pub fn validate_snapshot(
    snapshot: &Snapshot,
    url: &str,
    size: Option<u64>,
) -> Result<(), ResumeError> {
    if snapshot.size != size {
        return Err(ResumeError::SizeMismatch {
            stored: snapshot.size,
            current: size,
        });
    }
    if snapshot.url != url {
        return Err(ResumeError::UrlMismatch);
    }
    if snapshot.parts.is_empty() {
        return Err(ResumeError::Inconsistent);
    }

    // (start, one past end) per part; `None` for an open-ended part.
    let mut ranges = Vec::with_capacity(snapshot.parts.len());
    for p in &snapshot.parts {
        if p.current < p.start {
            return Err(ResumeError::Inconsistent);
        }
        let stop = match p.end {
            Some(end) => {
                let stop = end.checked_add(1).ok_or(ResumeError::Inconsistent)?;
                if end < p.start || p.current > stop {
                    return Err(ResumeError::Inconsistent);
                }
                Some(stop)
            }
            None => None,
        };
        ranges.push((p.start, stop));
    }

    // Parts must tile [0, size) without gaps or overlaps.
    ranges.sort_by_key(|&(start, _)| start);
    let mut expected = 0u64;
    for (i, &(start, stop)) in ranges.iter().enumerate() {
        if start != expected {
            return Err(ResumeError::Inconsistent);
        }
        match stop {
            Some(stop) => expected = stop,
            None if size.is_none() && i + 1 == ranges.len() => return Ok(()),
            None => return Err(ResumeError::Inconsistent),
        }
    }
    if Some(expected) != size {
        return Err(ResumeError::Inconsistent);
    }
    Ok(())
}
