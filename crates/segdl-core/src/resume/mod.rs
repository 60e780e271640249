//! Resume state stored at the tail of the destination file.
//!
//! Layout of a stopped download:
//!
//! ```text
//! [0, E)            downloaded bytes (E = file length at stop time)
//! [E, E + K)        snapshot: versioned JSON {version, url, size, parts}
//! [E + K, E + K + 16)  trailer: E as 16 zero-padded ASCII digits
//! ```
//!
//! The trailer is the only resume anchor. Recovering a snapshot truncates the
//! file back to `E` so workers resume writing at the recorded offsets.

mod error;
mod snapshot;
mod validate;

pub use error::ResumeError;
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use validate::validate_snapshot;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::segmenter::PartTable;
use crate::storage::DestinationFile;

/// Width of the decimal offset trailer.
pub const TRAILER_LEN: u64 = 16;

/// Snapshots larger than this are treated as a corrupt trailer.
const MAX_SNAPSHOT_LEN: u64 = 64 * 1024 * 1024;

fn encode_trailer(offset: u64) -> String {
    format!("{:0width$}", offset, width = TRAILER_LEN as usize)
}

fn decode_trailer(raw: &[u8]) -> Result<u64, ResumeError> {
    if raw.len() != TRAILER_LEN as usize || !raw.iter().all(u8::is_ascii_digit) {
        return Err(ResumeError::BadTrailer);
    }
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(ResumeError::BadTrailer)
}

/// Append a snapshot of `table` and the offset trailer at the end of the file.
/// Returns the snapshot offset.
pub fn persist(file: &DestinationFile, table: &PartTable) -> Result<u64, ResumeError> {
    let snapshot = Snapshot::capture(table);
    let encoded = snapshot.encode()?;
    let offset = file.with_file(|f| {
        let mut offset = f.seek(SeekFrom::End(0))?;
        // Content occupies [0, size) even if the last bytes are not written yet.
        if let Some(size) = table.size().filter(|&size| offset < size) {
            f.set_len(size)?;
            offset = f.seek(SeekFrom::End(0))?;
        }
        f.write_all(&encoded)?;
        f.write_all(encode_trailer(offset).as_bytes())?;
        f.flush()?;
        Ok(offset)
    })?;
    tracing::info!(
        offset,
        parts = snapshot.parts.len(),
        downloaded = snapshot.downloaded(),
        "resume state persisted"
    );
    Ok(offset)
}

/// Locate and decode the snapshot of an open file without modifying it.
/// Returns the snapshot and its offset.
fn locate(f: &mut File) -> Result<(Snapshot, u64), ResumeError> {
    let len = f.metadata()?.len();
    if len < TRAILER_LEN {
        return Err(ResumeError::NoTrailer);
    }
    let trailer_at = len - TRAILER_LEN;
    f.seek(SeekFrom::Start(trailer_at))?;
    let mut raw = [0u8; TRAILER_LEN as usize];
    f.read_exact(&mut raw)?;
    let offset = decode_trailer(&raw)?;
    if offset > trailer_at || trailer_at - offset > MAX_SNAPSHOT_LEN {
        return Err(ResumeError::BadTrailer);
    }

    f.seek(SeekFrom::Start(offset))?;
    let mut encoded = Vec::with_capacity((trailer_at - offset) as usize);
    f.take(trailer_at - offset).read_to_end(&mut encoded)?;
    Ok((Snapshot::decode(&encoded)?, offset))
}

/// Recover a snapshot for `url`/`size` and truncate the trailer away.
///
/// On any error the file is left untouched; the caller discards it and starts fresh.
pub fn recover(
    file: &DestinationFile,
    url: &str,
    size: Option<u64>,
) -> Result<Snapshot, ResumeError> {
    let (mut snapshot, offset) = file.with_file(|f| Ok(locate(f)))??;
    validate_snapshot(&snapshot, url, size)?;
    file.truncate(offset)?;
    snapshot.reset_unfinished();
    tracing::info!(
        offset,
        downloaded = snapshot.downloaded(),
        "recovered resume state"
    );
    Ok(snapshot)
}

/// Read the snapshot of a stopped download at `path` (read-only).
pub fn read_snapshot(path: &Path) -> Result<Snapshot, ResumeError> {
    let mut f = File::open(path)?;
    locate(&mut f).map(|(snapshot, _)| snapshot)
}
