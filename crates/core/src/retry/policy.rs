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
    /// Any other error — not retried (protocol violations, 4xx, etc.).
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

/// Fixed linear backoff: every retryable attempt waits the same `backoff`
/// before the next try, up to `max_attempts` total attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: Duration,
    /// Base per-attempt request timeout; the actual timeout used for attempt
    /// `n` (1-based) is `base_timeout * n`, see [`RetryPolicy::attempt_timeout`].
    pub base_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(1),
            base_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_timeout: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Duration::from_secs(1),
            base_timeout,
        }
    }

    /// The per-attempt request timeout: grows linearly with the attempt
    /// index (1-based), so attempt 1 gets `base_timeout`, attempt 2 gets
    /// `2 * base_timeout`, and so on.
    pub fn attempt_timeout(&self, attempt: u32) -> Duration {
        self.base_timeout.saturating_mul(attempt.max(1))
    }

    /// Decides whether to retry after a failure on the given (1-based)
    /// attempt. Transient kinds are retried with the fixed backoff up to
    /// `max_attempts`; `Other` (protocol violations, non-retryable HTTP
    /// statuses) never retries.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout | ErrorKind::Connection | ErrorKind::Throttled | ErrorKind::Http5xx(_) => {
                RetryDecision::RetryAfter(self.backoff)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_retry_for_other() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn backoff_is_fixed_not_exponential() {
        let mut p = RetryPolicy::default();
        p.max_attempts = 10;
        let d1 = match p.decide(1, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        let d2 = match p.decide(5, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        assert_eq!(d1, Duration::from_secs(1));
        assert_eq!(d1, d2);
    }

    #[test]
    fn respects_max_attempts() {
        let mut p = RetryPolicy::default();
        p.max_attempts = 3;
        assert!(matches!(
            p.decide(1, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(2, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(p.decide(3, ErrorKind::Throttled), RetryDecision::NoRetry);
    }

    #[test]
    fn attempt_timeout_grows_linearly() {
        let p = RetryPolicy::new(5, Duration::from_secs(30));
        assert_eq!(p.attempt_timeout(1), Duration::from_secs(30));
        assert_eq!(p.attempt_timeout(2), Duration::from_secs(60));
        assert_eq!(p.attempt_timeout(3), Duration::from_secs(90));
    }
}
