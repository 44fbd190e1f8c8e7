//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::error::SegmentError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::cancel::CancelFlag;

/// Runs a closure until it succeeds or the retry policy says to stop,
/// checking `cancel` before each attempt and between the backoff sleep and
/// returning `Ok(())` early (treated by the caller as "stop, don't mark
/// done, don't report an error") when raised.
pub fn run_with_retry_cancellable<F>(
    policy: &RetryPolicy,
    cancel: &CancelFlag,
    mut f: F,
) -> Result<(), SegmentError>
where
    F: FnMut(u32) -> Result<(), SegmentError>,
{
    let mut attempt = 1u32;
    loop {
        if cancel.is_set() {
            return Ok(());
        }
        match f(attempt) {
            Ok(()) => return Ok(()),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, backoff_ms = d.as_millis() as u64, %e, "retrying after backoff");
                        if cancel.is_set() {
                            return Ok(());
                        }
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
