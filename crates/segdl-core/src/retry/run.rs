//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs a closure until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, error = %e, delay_ms = d.as_millis() as u64, "retrying");
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
