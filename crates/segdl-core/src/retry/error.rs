//! Fetch error type shared by the probe and range requests.

use thiserror::Error;

/// Error returned by a probe or a range request.
/// Used so we can classify and decide retries before converting to anyhow.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Server answered a range request starting somewhere else.
    #[error("range mismatch: requested offset {requested}, server sent {received}")]
    RangeMismatch { requested: u64, received: u64 },
    /// The transfer ended before a response head arrived.
    #[error("connection closed before response")]
    Closed,
}
