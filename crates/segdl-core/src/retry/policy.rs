use std::time::Duration;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// Any other error (not retried by the probe).
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with caps, used for the metadata probe.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::probe(3)
    }
}

impl RetryPolicy {
    /// Policy for the initial probe: `attempts` tries, short backoff.
    pub fn probe(attempts: u32) -> Self {
        Self {
            max_attempts: attempts.max(1),
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }

    /// Compute the next backoff delay for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_) => {
                let exp = 1u32 << attempt.saturating_sub(1).min(8);
                let delay = self.base_delay.saturating_mul(exp).min(self.max_delay);
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}
