//! Destination file lifecycle.
//!
//! A single file holds the downloaded bytes and, while a download is stopped,
//! the resume snapshot at its tail. All writes go through one lock (seek then
//! write), so workers fetch concurrently but write one at a time.

mod file;

pub use file::DestinationFile;
