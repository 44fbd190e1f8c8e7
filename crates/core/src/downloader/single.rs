//! Single-stream fetcher: one connection, optional `Range: bytes=N-`,
//! streams to a file. Used when the server doesn't support ranges, or for
//! any download where segmentation was never attempted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::cancel::CancelFlag;
use crate::progress::ProgressState;
use crate::retry::{run_with_retry_cancellable, RetryPolicy, SegmentError};
use crate::storage::StorageWriter;

/// Downloads `url` to `storage` with a single stream, resuming from
/// `resume_from` (0 means start fresh / truncate). Observes `cancel`
/// between chunks and between retries.
///
/// Returns `Ok(true)` on success, `Ok(false)` on cancellation or
/// unrecoverable failure after exhausting retries — in both cases the
/// partial file is left in place for a later `-c` run.
#[allow(clippy::too_many_arguments)]
pub fn download_single(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    storage: &StorageWriter,
    resume_from: u64,
    expected_len: Option<u64>,
    cancel: &CancelFlag,
    policy: &RetryPolicy,
    progress: Option<&ProgressState>,
) -> Result<bool, SegmentError> {
    if resume_from == 0 {
        storage.set_len(0).map_err(to_storage_error)?;
    }

    if let Some(p) = progress {
        p.set_bytes_done(resume_from);
    }

    let written = Arc::new(AtomicU64::new(resume_from));
    let result = run_with_retry_cancellable(policy, cancel, |attempt| {
        attempt_once(
            url,
            headers,
            user_agent,
            storage,
            &written,
            cancel,
            policy.attempt_timeout(attempt),
            progress,
        )
    });

    match result {
        Ok(()) => {
            let total_written = written.load(Ordering::Relaxed);
            if let Some(expected) = expected_len {
                if total_written != expected {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

#[allow(clippy::too_many_arguments)]
fn attempt_once(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    storage: &StorageWriter,
    written: &Arc<AtomicU64>,
    cancel: &CancelFlag,
    timeout: std::time::Duration,
    progress: Option<&ProgressState>,
) -> Result<(), SegmentError> {
    let resume_from = written.load(Ordering::Relaxed);
    let mut easy = super::transport::base_handle(url, headers, user_agent, timeout)?;
    if resume_from > 0 {
        easy.range(&format!("{resume_from}-")).map_err(SegmentError::Curl)?;
    }

    let responded_full = Arc::new(AtomicBool::new(false));
    let reset_done = Arc::new(AtomicBool::new(false));
    let storage_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));

    let responded_full_hdr = Arc::clone(&responded_full);
    let responded_full_body = Arc::clone(&responded_full);
    let reset_done_body = Arc::clone(&reset_done);
    let storage_error_cb = Arc::clone(&storage_error);
    let written_cb = Arc::clone(written);
    let storage_cb = storage.clone();
    let cancel_cb = cancel.clone();
    let requested_resume = resume_from;

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(move |data| {
                if let Ok(line) = std::str::from_utf8(data) {
                    if line.starts_with("HTTP/") && line.contains(" 200 ") && requested_resume > 0 {
                        responded_full_hdr.store(true, Ordering::Relaxed);
                    }
                }
                true
            })
            .map_err(SegmentError::Curl)?;
        transfer
            .write_function(move |data| {
                if cancel_cb.is_set() {
                    return Ok(0);
                }
                if responded_full_body.load(Ordering::Relaxed)
                    && !reset_done_body.swap(true, Ordering::Relaxed)
                {
                    if let Err(e) = storage_cb.set_len(0) {
                        *storage_error_cb.lock().unwrap() = Some(io_error(e));
                        return Ok(0);
                    }
                    written_cb.store(0, Ordering::Relaxed);
                }
                let offset = written_cb.fetch_add(data.len() as u64, Ordering::Relaxed);
                match storage_cb.write_at(offset, data) {
                    Ok(()) => {
                        if let Some(p) = progress {
                            p.set_bytes_done(offset + data.len() as u64);
                        }
                        Ok(data.len())
                    }
                    Err(e) => {
                        *storage_error_cb.lock().unwrap() = Some(io_error(e));
                        Ok(0)
                    }
                }
            })
            .map_err(SegmentError::Curl)?;
        let perform_result = transfer.perform();
        if let Err(e) = perform_result {
            if let Some(io_err) = storage_error.lock().unwrap().take() {
                return Err(SegmentError::Storage(io_err));
            }
            if cancel.is_set() {
                return Ok(());
            }
            return Err(SegmentError::Curl(e));
        }
    }

    let code = super::transport::response_code(&easy)?;
    if !(200..300).contains(&code) {
        return Err(SegmentError::Http(code));
    }
    Ok(())
}

fn io_error(e: anyhow::Error) -> std::io::Error {
    e.downcast::<std::io::Error>()
        .unwrap_or_else(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

fn to_storage_error(e: anyhow::Error) -> SegmentError {
    SegmentError::Storage(io_error(e))
}
