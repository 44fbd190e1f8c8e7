//! Segmented fetcher: a bounded worker pool of OS threads, each
//! pulling the next not-yet-done range off a shared queue, issuing a ranged
//! GET, writing the body at the range's file offset, and flipping the
//! range's `done` flag under the plan's lock before saving it back to disk.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cancel::CancelFlag;
use crate::progress::ProgressState;
use crate::retry::{run_with_retry_cancellable, RetryPolicy, SegmentError};
use crate::segmenter::{Plan, Segment};
use crate::storage::StorageWriter;

/// Outcome of running a segmented fetch to completion or exhaustion.
#[derive(Debug, Default)]
pub struct SegmentedOutcome {
    /// One entry per range that never completed, in range-index order.
    pub errors: Vec<(usize, String)>,
    pub cancelled: bool,
}

impl SegmentedOutcome {
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.errors.is_empty()
    }
}

/// Runs every not-yet-`done` range in `plan` through up to `workers`
/// concurrent threads, persisting `plan` to `plan_path` (via the shared
/// lock) as each range completes. Returns once the queue is drained, a
/// fatal error stops all workers, or `cancel` is raised.
#[allow(clippy::too_many_arguments)]
pub fn download_segmented(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    plan: Plan,
    plan_path: std::path::PathBuf,
    storage: &StorageWriter,
    workers: usize,
    policy: &RetryPolicy,
    cancel: &CancelFlag,
    progress: Option<&ProgressState>,
) -> SegmentedOutcome {
    let pending: VecDeque<usize> = plan
        .ranges
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.done)
        .map(|(i, _)| i)
        .collect();

    if pending.is_empty() {
        return SegmentedOutcome::default();
    }

    let worker_count = workers.max(1).min(pending.len());
    let queue = Arc::new(Mutex::new(pending));
    let bytes_total = Arc::new(AtomicU64::new(plan.completed_bytes()));
    if let Some(p) = progress {
        p.set_bytes_done(bytes_total.load(Ordering::Relaxed));
    }
    let plan = Arc::new(Mutex::new(plan));
    let errors: Arc<Mutex<Vec<(usize, String)>>> = Arc::new(Mutex::new(Vec::new()));

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let queue = Arc::clone(&queue);
            let plan = Arc::clone(&plan);
            let errors = Arc::clone(&errors);
            let bytes_total = Arc::clone(&bytes_total);
            let storage = storage.clone();
            let cancel = cancel.clone();
            handles.push(scope.spawn(move || {
                worker_loop(
                    url, headers, user_agent, &queue, &plan, &plan_path, &storage, policy, &cancel, &errors,
                    &bytes_total, progress,
                );
            }));
        }
        for h in handles {
            let _ = h.join();
        }
    });

    let errors = Arc::try_unwrap(errors).unwrap().into_inner().unwrap();
    SegmentedOutcome {
        cancelled: cancel.is_set() && errors.is_empty(),
        errors,
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    queue: &Mutex<VecDeque<usize>>,
    plan: &Mutex<Plan>,
    plan_path: &std::path::Path,
    storage: &StorageWriter,
    policy: &RetryPolicy,
    cancel: &CancelFlag,
    errors: &Mutex<Vec<(usize, String)>>,
    bytes_total: &AtomicU64,
    progress: Option<&ProgressState>,
) {
    loop {
        if cancel.is_set() {
            return;
        }
        let Some(index) = queue.lock().unwrap().pop_front() else {
            return;
        };
        let segment = plan.lock().unwrap().ranges[index];

        let result = run_with_retry_cancellable(policy, cancel, |attempt| {
            fetch_range(
                url,
                headers,
                user_agent,
                &segment,
                storage,
                policy.attempt_timeout(attempt),
                cancel,
            )
        });

        match result {
            Ok(()) => {
                if cancel.is_set() {
                    // The transfer was cut short by cancellation rather than
                    // genuinely finishing; leave the range `done=false` so a
                    // later run refetches it from the start.
                    return;
                }
                let mut guard = plan.lock().unwrap();
                guard.ranges[index].done = true;
                let _ = guard.save(plan_path);
                drop(guard);
                let done = bytes_total.fetch_add(segment.len(), Ordering::Relaxed) + segment.len();
                if let Some(p) = progress {
                    p.set_bytes_done(done);
                }
                tracing::debug!(segment = index, "segment complete");
            }
            Err(e) => {
                tracing::warn!(segment = index, %e, "segment failed, giving up after retries");
                errors.lock().unwrap().push((index, e.to_string()));
                return;
            }
        }
    }
}

fn fetch_range(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    segment: &Segment,
    storage: &StorageWriter,
    timeout: Duration,
    cancel: &CancelFlag,
) -> Result<(), SegmentError> {
    fetch_range_interruptible(
        url,
        headers,
        user_agent,
        segment,
        storage,
        timeout,
        Some(cancel.as_atomic()),
    )
    .map(|_interrupted| ())
}

/// Like [`fetch_range`] but checks `interrupt` (when given) between chunks
/// and aborts the transfer the moment it's set, without treating the abort
/// as an error. Used by the adaptive controller to cut a measurement window
/// short; the segment stays un-done and its bytes are simply re-fetched
/// from the start the next time it's picked up. Returns `Ok(true)` if the
/// transfer was interrupted, `Ok(false)` if it completed normally.
pub(crate) fn fetch_range_interruptible(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    segment: &Segment,
    storage: &StorageWriter,
    timeout: Duration,
    interrupt: Option<&std::sync::atomic::AtomicBool>,
) -> Result<bool, SegmentError> {
    let mut easy = super::transport::base_handle(url, headers, user_agent, timeout)?;
    easy.range(&segment.range_header_value()[6..])
        .map_err(SegmentError::Curl)?;

    let bytes_written = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let bytes_written_cb = Arc::clone(&bytes_written);
    let storage_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));
    let storage_error_cb = Arc::clone(&storage_error);
    let interrupted = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let interrupted_cb = Arc::clone(&interrupted);
    let segment_start = segment.start;
    let storage = storage.clone();

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(move |data| {
                if let Some(flag) = interrupt {
                    if flag.load(std::sync::atomic::Ordering::Relaxed) {
                        interrupted_cb.store(true, std::sync::atomic::Ordering::Relaxed);
                        return Ok(0);
                    }
                }
                let off =
                    bytes_written_cb.fetch_add(data.len() as u64, std::sync::atomic::Ordering::Relaxed);
                match storage.write_at(segment_start + off, data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        let io_err = e
                            .downcast::<std::io::Error>()
                            .unwrap_or_else(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
                        *storage_error_cb.lock().unwrap() = Some(io_err);
                        Ok(0)
                    }
                }
            })
            .map_err(SegmentError::Curl)?;
        if let Err(e) = transfer.perform() {
            if interrupted.load(std::sync::atomic::Ordering::Relaxed) {
                return Ok(true);
            }
            if let Some(io_err) = storage_error.lock().unwrap().take() {
                return Err(SegmentError::Storage(io_err));
            }
            return Err(SegmentError::Curl(e));
        }
    }

    let code = super::transport::response_code(&easy)?;
    // A server that ignores the Range request and answers 200 for a
    // non-zero-start range would otherwise silently corrupt the segment
    // (the full body landing at `segment_start` instead of byte 0).
    if code == 200 && segment.start != 0 {
        return Err(SegmentError::Http(code));
    }
    if !(200..300).contains(&code) {
        return Err(SegmentError::Http(code));
    }

    let received = bytes_written.load(std::sync::atomic::Ordering::Relaxed);
    let expected = segment.len();
    if received != expected {
        return Err(SegmentError::PartialTransfer { expected, received });
    }

    Ok(false)
}
