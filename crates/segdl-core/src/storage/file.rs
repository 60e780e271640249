//! Shared destination file guarded by the write lock.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Destination file shared by all workers. The mutex is the write lock; the
/// inner `Option` is `None` once the file has been closed.
#[derive(Debug)]
pub struct DestinationFile {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "destination file is closed")
}

impl DestinationFile {
    /// Open `path` for read+write, creating it if missing. Existing bytes are kept
    /// so a stopped download can be resumed from its trailer.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open destination file: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` on the open file while holding the write lock.
    pub fn with_file<R>(&self, f: impl FnOnce(&mut File) -> io::Result<R>) -> io::Result<R> {
        let mut guard = self.lock();
        let file = guard.as_mut().ok_or_else(closed)?;
        f(file)
    }

    /// Seek to `offset` and write all of `data`.
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.with_file(|f| {
            f.seek(SeekFrom::Start(offset))?;
            f.write_all(data)
        })
    }

    /// Current file length.
    #[cfg(test)]
    pub fn len(&self) -> io::Result<u64> {
        self.with_file(|f| Ok(f.metadata()?.len()))
    }

    pub fn truncate(&self, len: u64) -> io::Result<()> {
        self.with_file(|f| f.set_len(len))
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Flush to disk and release the handle. Closing an already closed file is a no-op.
    pub fn close(&self) -> Result<()> {
        if let Some(file) = self.lock().take() {
            file.sync_all()
                .with_context(|| format!("failed to sync {}", self.path.display()))?;
        }
        Ok(())
    }
}
