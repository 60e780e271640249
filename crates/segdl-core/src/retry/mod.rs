//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures) and backoff decisions. The probe uses a bounded
//! exponential policy; part-level failures retry indefinitely with a fixed
//! backoff while the job is downloading (see `scheduler::worker`).

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
