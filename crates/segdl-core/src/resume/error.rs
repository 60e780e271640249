use thiserror::Error;

/// Why a stored snapshot could not be used. Never fatal: the caller discards
/// the file contents and plans a fresh download.
#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("no resume trailer")]
    NoTrailer,
    #[error("resume trailer is not a valid offset")]
    BadTrailer,
    #[error("resume snapshot could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unsupported resume snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("resume snapshot parts are inconsistent")]
    Inconsistent,
    #[error("remote size changed (stored {stored:?}, now {current:?})")]
    SizeMismatch {
        stored: Option<u64>,
        current: Option<u64>,
    },
    #[error("resume snapshot belongs to a different URL")]
    UrlMismatch,
    #[error("I/O error while reading resume state: {0}")]
    Io(#[from] std::io::Error),
}
