//! Per-run options: the tunables a CLI invocation derives once and then
//! threads through probe, fetch, and (if requested) the recursive driver.
//! Replaces a persisted configuration file — there isn't one; every run is
//! fully described by its command line.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::adaptive::AdaptiveConfig;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Options {
    pub output_path: Option<PathBuf>,
    pub output_dir: PathBuf,

    pub threads: usize,
    pub auto_threads: bool,
    pub adaptive: AdaptiveConfig,

    pub resume: bool,
    pub overwrite: bool,
    pub conditional_mtime: bool,

    pub recursive: bool,
    pub max_depth: u32,
    pub no_parent: bool,

    pub segment_size: u64,
    pub headers: HashMap<String, String>,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_tries: u32,

    pub status_only: bool,
    pub quiet: bool,
}

impl Options {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_tries, self.timeout)
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output_path: None,
            output_dir: PathBuf::from("."),
            threads: 4,
            auto_threads: false,
            adaptive: AdaptiveConfig::default(),
            resume: false,
            overwrite: false,
            conditional_mtime: false,
            recursive: false,
            max_depth: 5,
            no_parent: false,
            segment_size: 8 * 1024 * 1024,
            headers: HashMap::new(),
            user_agent: concat!("grab/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            max_tries: 5,
            status_only: false,
            quiet: false,
        }
    }
}
