//! Progress reporter: a background thread prints one
//! carriage-returned status line to stderr every 0.5 seconds.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(500);

/// Shared counters the reporter reads from; downloaders write to these as
/// they make progress.
#[derive(Clone)]
pub struct ProgressState {
    bytes_done: Arc<AtomicU64>,
    total_size: Arc<AtomicU64>,
    threads: Arc<AtomicUsize>,
}

const UNKNOWN_TOTAL: u64 = u64::MAX;

impl ProgressState {
    pub fn new(total_size: Option<u64>) -> Self {
        Self {
            bytes_done: Arc::new(AtomicU64::new(0)),
            total_size: Arc::new(AtomicU64::new(total_size.unwrap_or(UNKNOWN_TOTAL))),
            threads: Arc::new(AtomicUsize::new(1)),
        }
    }

    pub fn set_bytes_done(&self, bytes: u64) {
        self.bytes_done.store(bytes, Ordering::Relaxed);
    }

    pub fn set_threads(&self, n: usize) {
        self.threads.store(n, Ordering::Relaxed);
    }

    fn snapshot(&self) -> (u64, Option<u64>, usize) {
        let total = self.total_size.load(Ordering::Relaxed);
        let total = if total == UNKNOWN_TOTAL { None } else { Some(total) };
        (
            self.bytes_done.load(Ordering::Relaxed),
            total,
            self.threads.load(Ordering::Relaxed),
        )
    }
}

/// Owns the reporter's background thread; dropping or calling [`Reporter::stop`]
/// joins it after a final line is printed.
pub struct Reporter {
    stop_flag: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Reporter {
    /// Spawns the reporter. When `quiet` is true, no thread is spawned and
    /// `stop` is a no-op — matching `-q`'s "no progress output" contract.
    pub fn start(state: ProgressState, quiet: bool) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        if quiet {
            return Self { stop_flag, handle: None };
        }

        let thread_stop = Arc::clone(&stop_flag);
        let started = Instant::now();
        let handle = std::thread::spawn(move || {
            while !thread_stop.load(Ordering::Relaxed) {
                print_line(&state, started, false);
                std::thread::sleep(TICK);
            }
            print_line(&state, started, true);
        });

        Self {
            stop_flag,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn print_line(state: &ProgressState, started: Instant, final_line: bool) {
    let (done, total, threads) = state.snapshot();
    let elapsed = started.elapsed().as_secs_f64().max(0.001);
    let rate = done as f64 / elapsed;

    let line = match total {
        Some(total) if total > 0 => {
            let pct = (done as f64 / total as f64 * 100.0).min(100.0);
            let remaining = total.saturating_sub(done);
            let eta = if rate > 0.0 {
                format_duration(remaining as f64 / rate)
            } else {
                "--:--:--".to_string()
            };
            format!(
                "{pct:5.1}%  T{threads}  {done}/{total}  {rate}/s  ETA {eta}",
                rate = format_rate(rate)
            )
        }
        _ => format!("T{threads}  {done} done  {rate}/s", rate = format_rate(rate)),
    };

    let mut stderr = std::io::stderr();
    if final_line {
        let _ = writeln!(stderr, "\r{line}");
    } else {
        let _ = write!(stderr, "\r{line}\x1b[K");
    }
    let _ = stderr.flush();
}

fn format_rate(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes_per_sec;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_state_tracks_bytes_and_threads() {
        let state = ProgressState::new(Some(1000));
        state.set_bytes_done(250);
        state.set_threads(4);
        let (done, total, threads) = state.snapshot();
        assert_eq!(done, 250);
        assert_eq!(total, Some(1000));
        assert_eq!(threads, 4);
    }

    #[test]
    fn unknown_total_reported_as_none() {
        let state = ProgressState::new(None);
        assert_eq!(state.snapshot().1, None);
    }

    #[test]
    fn format_duration_pads_to_hhmmss() {
        assert_eq!(format_duration(3661.0), "01:01:01");
        assert_eq!(format_duration(0.0), "00:00:00");
    }

    #[test]
    fn format_rate_picks_units() {
        assert_eq!(format_rate(512.0), "512.0 B");
        assert!(format_rate(2048.0).ends_with("KiB"));
        assert!(format_rate(5_000_000.0).ends_with("MiB"));
    }
}
