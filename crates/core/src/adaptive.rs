//! Adaptive worker-count controller: runs fixed-duration measurement
//! windows at a constant thread count, then nudges the count up or down
//! based on observed throughput, without any prior knowledge of bandwidth
//! or server-side connection limits.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cancel::CancelFlag;
use crate::downloader::fetch_range_interruptible;
use crate::progress::ProgressState;
use crate::retry::{run_with_retry_cancellable, RetryPolicy};
use crate::segmenter::{Plan, Segment};
use crate::storage::StorageWriter;

/// Tunables for the controller, CLI-facing.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveConfig {
    pub min_threads: usize,
    pub max_threads: usize,
    pub window: Duration,
    pub min_gain: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            min_threads: 1,
            max_threads: 16,
            window: Duration::from_secs_f64(2.0),
            min_gain: 0.1,
        }
    }
}

/// Snapshot published after each measurement window, consumed by the
/// progress reporter.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveStats {
    pub current_threads: usize,
    pub bytes_downloaded: u64,
}

#[derive(Debug, Default)]
pub struct AdaptiveOutcome {
    pub errors: Vec<(usize, String)>,
    pub cancelled: bool,
}

impl AdaptiveOutcome {
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.errors.is_empty()
    }
}

/// Drains every not-yet-`done` range in `plan`, adjusting worker count
/// window by window, persisting `plan` to `plan_path` as ranges
/// complete. `stats` is updated after every window so a progress reporter
/// running on another thread can read it without blocking this loop.
#[allow(clippy::too_many_arguments)]
pub fn download_adaptive(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    plan: Plan,
    plan_path: std::path::PathBuf,
    storage: &StorageWriter,
    initial_threads: usize,
    config: AdaptiveConfig,
    policy: &RetryPolicy,
    cancel: &CancelFlag,
    stats: &Mutex<AdaptiveStats>,
    progress: Option<&ProgressState>,
) -> AdaptiveOutcome {
    let pending: VecDeque<usize> = plan
        .ranges
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.done)
        .map(|(i, _)| i)
        .collect();

    if pending.is_empty() {
        return AdaptiveOutcome::default();
    }

    let initial_bytes = plan.completed_bytes();
    let queue = Arc::new(Mutex::new(pending));
    let plan = Arc::new(Mutex::new(plan));
    let errors: Arc<Mutex<Vec<(usize, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let attempts: Arc<Mutex<HashMap<usize, u32>>> = Arc::new(Mutex::new(HashMap::new()));
    let bytes_total = Arc::new(AtomicU64::new(initial_bytes));
    let errors_total = Arc::new(AtomicU32::new(0));
    if let Some(p) = progress {
        p.set_bytes_done(initial_bytes);
        p.set_threads(initial_threads);
    }

    let mut current_threads = initial_threads.clamp(config.min_threads, config.max_threads);
    let mut baseline_threads = current_threads;
    let mut baseline_rate: Option<f64> = None;
    let mut probing_up = true;

    loop {
        if cancel.is_set() {
            return AdaptiveOutcome {
                cancelled: true,
                errors: Arc::try_unwrap(errors).unwrap().into_inner().unwrap(),
            };
        }
        let queue_len = queue.lock().unwrap().len();
        if queue_len == 0 {
            break;
        }

        let window_workers = current_threads.min(queue_len);
        let bytes_before = bytes_total.load(Ordering::Relaxed);
        let errors_before = errors_total.load(Ordering::Relaxed);
        let window_start = Instant::now();
        let window_active = Arc::new(AtomicBool::new(true));

        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(window_workers);
            for _ in 0..window_workers {
                let queue = Arc::clone(&queue);
                let plan = Arc::clone(&plan);
                let errors = Arc::clone(&errors);
                let attempts = Arc::clone(&attempts);
                let bytes_total = Arc::clone(&bytes_total);
                let errors_total = Arc::clone(&errors_total);
                let window_active = Arc::clone(&window_active);
                let storage = storage.clone();
                let cancel = cancel.clone();
                let plan_path = plan_path.clone();
                handles.push(scope.spawn(move || {
                    window_worker(
                        url, headers, user_agent, &queue, &plan, &plan_path, &storage, policy, &cancel,
                        &errors, &attempts, &bytes_total, &errors_total, &window_active,
                    );
                }));
            }

            let deadline = window_start + config.window;
            loop {
                if Instant::now() >= deadline || cancel.is_set() || queue.lock().unwrap().is_empty() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(200));
            }
            window_active.store(false, Ordering::Relaxed);
            for h in handles {
                let _ = h.join();
            }
        });

        let elapsed = window_start.elapsed().as_secs_f64().max(0.001);
        let delta_bytes = bytes_total.load(Ordering::Relaxed) - bytes_before;
        let delta_errors = errors_total.load(Ordering::Relaxed) - errors_before;
        let rate = delta_bytes as f64 / elapsed;

        {
            let mut s = stats.lock().unwrap();
            s.current_threads = current_threads;
            s.bytes_downloaded = bytes_total.load(Ordering::Relaxed);
        }
        if let Some(p) = progress {
            p.set_threads(window_workers);
            p.set_bytes_done(bytes_total.load(Ordering::Relaxed));
        }

        if cancel.is_set() {
            return AdaptiveOutcome {
                cancelled: true,
                errors: Arc::try_unwrap(errors).unwrap().into_inner().unwrap(),
            };
        }

        if delta_errors > 0 {
            baseline_threads = baseline_threads.saturating_sub(1).max(config.min_threads);
            current_threads = baseline_threads;
        } else if baseline_rate.is_none() {
            baseline_threads = current_threads;
            baseline_rate = Some(rate);
            if baseline_threads < config.max_threads {
                current_threads = baseline_threads + 1;
                probing_up = true;
            }
        } else if current_threads == baseline_threads {
            if baseline_threads < config.max_threads {
                current_threads = baseline_threads + 1;
                probing_up = true;
            } else {
                current_threads = baseline_threads.saturating_sub(1).max(config.min_threads);
                probing_up = false;
            }
        } else {
            let accepted = match baseline_rate {
                Some(b) if b > 0.0 => rate >= b * (1.0 + config.min_gain),
                _ => rate > 0.0,
            };
            if accepted {
                baseline_threads = current_threads;
                baseline_rate = Some(rate);
                if probing_up && baseline_threads < config.max_threads {
                    current_threads = baseline_threads + 1;
                } else if !probing_up && baseline_threads > config.min_threads {
                    current_threads = baseline_threads.saturating_sub(1);
                } else {
                    current_threads = baseline_threads;
                }
            } else if probing_up {
                current_threads = baseline_threads.saturating_sub(1).max(config.min_threads);
            } else {
                current_threads = baseline_threads;
            }
        }

        current_threads = current_threads.clamp(config.min_threads, config.max_threads);
        tracing::debug!(
            window_threads = window_workers,
            rate_bytes_per_sec = rate as u64,
            delta_errors,
            baseline_threads,
            next_threads = current_threads,
            "adaptive controller window decision",
        );
    }

    let errors = Arc::try_unwrap(errors).unwrap().into_inner().unwrap();
    AdaptiveOutcome {
        cancelled: false,
        errors,
    }
}

#[allow(clippy::too_many_arguments)]
fn window_worker(
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
    attempts: &Mutex<HashMap<usize, u32>>,
    bytes_total: &AtomicU64,
    errors_total: &AtomicU32,
    window_active: &AtomicBool,
) {
    loop {
        if cancel.is_set() || !window_active.load(Ordering::Relaxed) {
            return;
        }
        let Some(index) = queue.lock().unwrap().pop_front() else {
            return;
        };
        let segment: Segment = plan.lock().unwrap().ranges[index];
        let timeout = policy.attempt_timeout(1);

        // No per-segment retry here: a window is already a short, bounded
        // slice of time, and a transient failure simply leaves the range
        // pending for a later window's worker to retry fresh.
        match fetch_range_interruptible(
            url,
            headers,
            user_agent,
            &segment,
            storage,
            timeout,
            Some(window_active),
        ) {
            Ok(true) => {
                // Window boundary hit mid-transfer: not an error, not done.
                queue.lock().unwrap().push_back(index);
                return;
            }
            Ok(false) => {
                bytes_total.fetch_add(segment.len(), Ordering::Relaxed);
                let mut guard = plan.lock().unwrap();
                guard.ranges[index].done = true;
                let _ = guard.save(plan_path);
            }
            Err(e) => {
                errors_total.fetch_add(1, Ordering::Relaxed);
                let mut attempts_guard = attempts.lock().unwrap();
                let count = attempts_guard.entry(index).or_insert(0);
                *count += 1;
                if *count < policy.max_attempts {
                    queue.lock().unwrap().push_back(index);
                } else {
                    errors.lock().unwrap().push((index, e.to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = AdaptiveConfig::default();
        assert_eq!(cfg.min_threads, 1);
        assert_eq!(cfg.max_threads, 16);
        assert_eq!(cfg.window, Duration::from_secs_f64(2.0));
        assert_eq!(cfg.min_gain, 0.1);
    }
}
