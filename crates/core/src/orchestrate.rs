//! Per-URL orchestration: probe, decide single-stream vs segmented, fetch,
//! finalize. This is the one machinery both a flat CLI invocation and the
//! recursive driver call into — reused rather than duplicated.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::adaptive::{self, AdaptiveStats};
use crate::cancel::CancelFlag;
use crate::downloader;
use crate::fetch_head::{self, HeadResult};
use crate::options::Options;
use crate::progress::ProgressState;
use crate::segmenter::Plan;
use crate::storage::{self, StorageWriter, StorageWriterBuilder};

#[derive(Debug)]
pub enum OrchestrateError {
    Probe(fetch_head::ProbeError),
    Plan(crate::segmenter::PlanError),
    Io(std::io::Error),
    PlanUrlMismatch { path: PathBuf, expected: String },
    PartialStateConflict(PathBuf),
    Incomplete { errors: Vec<String> },
}

impl fmt::Display for OrchestrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrateError::Probe(e) => write!(f, "{e}"),
            OrchestrateError::Plan(e) => write!(f, "{e}"),
            OrchestrateError::Io(e) => write!(f, "{e}"),
            OrchestrateError::PlanUrlMismatch { path, expected } => write!(
                f,
                "existing plan at {} does not match URL {expected}; rerun with --overwrite",
                path.display()
            ),
            OrchestrateError::PartialStateConflict(path) => write!(
                f,
                "partial download state already exists at {}; rerun with -c to resume or --overwrite to discard",
                path.display()
            ),
            OrchestrateError::Incomplete { errors } => {
                write!(f, "{} segment(s) failed: {}", errors.len(), errors.join("; "))
            }
        }
    }
}

impl std::error::Error for OrchestrateError {}

impl From<fetch_head::ProbeError> for OrchestrateError {
    fn from(e: fetch_head::ProbeError) -> Self {
        OrchestrateError::Probe(e)
    }
}

impl From<crate::segmenter::PlanError> for OrchestrateError {
    fn from(e: crate::segmenter::PlanError) -> Self {
        OrchestrateError::Plan(e)
    }
}

impl From<std::io::Error> for OrchestrateError {
    fn from(e: std::io::Error) -> Self {
        OrchestrateError::Io(e)
    }
}

/// Outcome of fetching one URL, returned on success; errors use
/// [`OrchestrateError`].
#[derive(Debug)]
pub struct FetchedResource {
    pub final_url: String,
    pub output_path: PathBuf,
    pub content_type: Option<String>,
    /// Body of the resource if it looks like HTML and was small enough to
    /// keep in memory for the recursive driver's link extraction; `None`
    /// for anything the driver wouldn't scan for links anyway.
    pub html_body: Option<String>,
    /// Set when this call was an idempotence no-op: `output_path` already
    /// existed and nothing was fetched.
    pub already_complete: bool,
}

/// Runs the full single-URL pipeline: probe, plan-or-single decision,
/// fetch, finalize, and (if a server mtime was learned and `-N`/mtime
/// application is enabled by the caller) mtime application.
pub fn fetch_one(
    url: &str,
    output_path: PathBuf,
    options: &Options,
    cancel: &CancelFlag,
    progress: Option<&ProgressState>,
    want_html_body: bool,
) -> Result<FetchedResource, OrchestrateError> {
    // Idempotence (§8): a finished download sitting at `output_path` already
    // satisfies this command. Skip the probe and report success without
    // touching the network, unless `--overwrite` asked for a clean redo or
    // `-N` needs a probe to compare mtimes before deciding.
    if !options.overwrite && !options.conditional_mtime && output_path.exists() {
        tracing::info!(url, path = %output_path.display(), "already complete, skipping");
        let html_body = if want_html_body && crate::recursive::looks_like_html(None, url) {
            std::fs::read_to_string(&output_path).ok()
        } else {
            None
        };
        return Ok(FetchedResource {
            final_url: url.to_string(),
            output_path,
            content_type: None,
            html_body,
            already_complete: true,
        });
    }

    let policy = options.retry_policy();
    let head = fetch_head::probe(url, &options.headers, &options.user_agent, &policy)?;

    if options.conditional_mtime {
        if let (Ok(meta), Some(server_epoch)) = (std::fs::metadata(&output_path), head.last_modified_epoch)
        {
            let local_epoch = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            if local_epoch >= server_epoch {
                return Ok(FetchedResource {
                    final_url: head.final_url,
                    output_path,
                    content_type: head.content_type,
                    html_body: None,
                    already_complete: true,
                });
            }
        }
    }

    let temp_path = storage::temp_path(&output_path);
    let plan_path = storage::plan_path(&temp_path);

    if options.overwrite {
        let _ = std::fs::remove_file(&temp_path);
        let _ = std::fs::remove_file(&plan_path);
        let _ = std::fs::remove_file(&output_path);
    } else if !options.resume && (temp_path.exists() || plan_path.exists()) {
        return Err(OrchestrateError::PartialStateConflict(temp_path));
    }

    let segmented_eligible = head.range_support && matches!(head.content_length, Some(n) if n > 0);

    if segmented_eligible {
        tracing::info!(url, total_size = head.content_length, "segmented download starting");
        run_segmented(url, &head, &output_path, &temp_path, &plan_path, options, cancel, progress)?;
    } else {
        tracing::info!(url, "single-stream download starting");
        run_single(url, &head, &output_path, &temp_path, options, cancel, progress)?;
    }
    tracing::info!(url, path = %output_path.display(), "download complete");

    let html_body = if want_html_body
        && crate::recursive::looks_like_html(head.content_type.as_deref(), &head.final_url)
    {
        std::fs::read_to_string(&output_path).ok()
    } else {
        None
    };

    Ok(FetchedResource {
        final_url: head.final_url,
        output_path,
        content_type: head.content_type,
        html_body,
        already_complete: false,
    })
}

#[allow(clippy::too_many_arguments)]
fn run_segmented(
    url: &str,
    head: &HeadResult,
    output_path: &Path,
    temp_path: &Path,
    plan_path: &Path,
    options: &Options,
    cancel: &CancelFlag,
    progress: Option<&ProgressState>,
) -> Result<(), OrchestrateError> {
    let total_size = head.content_length.unwrap_or(0);

    let plan = if options.resume && plan_path.exists() {
        let loaded = Plan::load(plan_path)?;
        if loaded.url != url {
            return Err(OrchestrateError::PlanUrlMismatch {
                path: plan_path.to_path_buf(),
                expected: url.to_string(),
            });
        }
        if loaded.total_size != total_size {
            tracing::warn!(
                path = %plan_path.display(),
                plan_total = loaded.total_size,
                server_total = total_size,
                "plan total_size disagrees with server; discarding plan and restarting",
            );
            Plan::new(url, total_size, options.segment_size)
        } else {
            loaded
        }
    } else {
        Plan::new(url, total_size, options.segment_size)
    };

    let storage = if temp_path.exists() && options.resume {
        let writer = StorageWriter::open_existing(temp_path)?;
        writer.set_len(total_size)?;
        writer
    } else {
        let mut builder = StorageWriterBuilder::create(temp_path)?;
        builder.preallocate(total_size)?;
        builder.build()
    };

    if let Some(p) = progress {
        p.set_threads(options.threads);
    }

    let outcome = if options.auto_threads {
        let stats = std::sync::Mutex::new(AdaptiveStats::default());
        let out = adaptive::download_adaptive(
            url,
            &options.headers,
            &options.user_agent,
            plan,
            plan_path.to_path_buf(),
            &storage,
            options.threads,
            options.adaptive,
            &options.retry_policy(),
            cancel,
            &stats,
            progress,
        );
        downloader::SegmentedOutcome {
            errors: out.errors,
            cancelled: out.cancelled,
        }
    } else {
        downloader::download_segmented(
            url,
            &options.headers,
            &options.user_agent,
            plan,
            plan_path.to_path_buf(),
            &storage,
            options.threads,
            &options.retry_policy(),
            cancel,
            progress,
        )
    };

    if outcome.cancelled {
        return Ok(());
    }
    if !outcome.errors.is_empty() {
        return Err(OrchestrateError::Incomplete {
            errors: outcome.errors.into_iter().map(|(i, e)| format!("segment {i}: {e}")).collect(),
        });
    }

    storage.sync()?;
    storage.finalize(output_path)?;
    let _ = std::fs::remove_file(plan_path);
    apply_mtime(output_path, head.last_modified_epoch);
    Ok(())
}

fn run_single(
    url: &str,
    head: &HeadResult,
    output_path: &Path,
    temp_path: &Path,
    options: &Options,
    cancel: &CancelFlag,
    progress: Option<&ProgressState>,
) -> Result<(), OrchestrateError> {
    let resume_from = if options.resume && temp_path.exists() {
        std::fs::metadata(temp_path).map(|m| m.len()).unwrap_or(0)
    } else {
        0
    };

    let storage = if resume_from > 0 {
        StorageWriter::open_existing(temp_path)?
    } else {
        StorageWriterBuilder::create(temp_path)?.build()
    };

    if let Some(p) = progress {
        p.set_threads(1);
    }

    let policy = options.retry_policy();
    let ok = downloader::download_single(
        url,
        &options.headers,
        &options.user_agent,
        &storage,
        resume_from,
        head.content_length,
        cancel,
        &policy,
        progress,
    )
    .map_err(|e| OrchestrateError::Incomplete { errors: vec![e.to_string()] })?;

    if let Some(p) = progress {
        if let Ok(len) = storage.len() {
            p.set_bytes_done(len);
        }
    }

    if cancel.is_set() {
        return Ok(());
    }
    if !ok {
        return Err(OrchestrateError::Incomplete {
            errors: vec!["single-stream fetch did not complete".to_string()],
        });
    }

    storage.sync()?;
    storage.finalize(output_path)?;
    apply_mtime(output_path, head.last_modified_epoch);
    Ok(())
}

/// Applies the server's `Last-Modified` time to the finished file, a
/// best-effort touch — failure here never fails the download.
fn apply_mtime(path: &Path, epoch_seconds: Option<f64>) {
    let Some(epoch) = epoch_seconds else { return };
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        let Ok(c_path) = std::ffi::CString::new(path.as_os_str().as_bytes()) else {
            return;
        };
        let secs = epoch as libc::time_t;
        let times = [
            libc::timeval { tv_sec: secs, tv_usec: 0 },
            libc::timeval { tv_sec: secs, tv_usec: 0 },
        ];
        unsafe {
            libc::utimes(c_path.as_ptr(), times.as_ptr());
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (path, epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orchestrate_error_messages_are_actionable() {
        let e = OrchestrateError::PartialStateConflict(PathBuf::from("/tmp/x.par"));
        assert!(e.to_string().contains("-c"));
        let e = OrchestrateError::Incomplete { errors: vec!["boom".into()] };
        assert!(e.to_string().contains("boom"));
    }
}
