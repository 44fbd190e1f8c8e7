//! Command-line surface: a single positional-URL command with the
//! concurrency, recursion, and conditional-fetch flags described in this
//! tool's design. Argument misuse (bad value, conflicting flags) exits 2,
//! matching `clap`'s own default exit code for parse failures.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use grab_core::adaptive::AdaptiveConfig;
use grab_core::options::Options;
use grab_core::parse::parse_size;

#[derive(Debug, Parser)]
#[command(
    name = "grab",
    version,
    about = "Resumable, segmented HTTP(S) downloader with adaptive parallelism and site mirroring"
)]
pub struct Cli {
    /// One or more URLs to fetch.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Explicit output file path. Only valid with a single, non-recursive URL.
    #[arg(short = 'O', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Destination directory for downloaded files (default: current directory).
    #[arg(short = 'P', long = "directory", value_name = "DIR", default_value = ".")]
    pub directory: PathBuf,

    /// Fixed worker thread count (ignored when --auto-threads is set).
    #[arg(short = 't', long = "threads", value_name = "N", default_value_t = 4)]
    pub threads: usize,

    /// Let the adaptive controller discover a good thread count at runtime.
    #[arg(long = "auto-threads")]
    pub auto_threads: bool,

    /// Lower bound for the adaptive controller.
    #[arg(long = "min-threads", value_name = "N", default_value_t = 1)]
    pub min_threads: usize,

    /// Upper bound for the adaptive controller.
    #[arg(long = "max-threads", value_name = "N", default_value_t = 16)]
    pub max_threads: usize,

    /// Measurement window length, in seconds, for the adaptive controller.
    #[arg(long = "auto-window", value_name = "SECONDS", default_value_t = 2.0)]
    pub auto_window: f64,

    /// Minimum fractional throughput gain required to accept a probe step up.
    #[arg(long = "auto-min-gain", value_name = "FRACTION", default_value_t = 0.1)]
    pub auto_min_gain: f64,

    /// Resume using any existing plan/temp/final state for this URL.
    #[arg(short = 'c', long = "continue")]
    pub resume: bool,

    /// Recursively mirror links reachable from the given URL(s).
    #[arg(short = 'r', long = "recursive")]
    pub recursive: bool,

    /// Maximum recursion depth.
    #[arg(long = "max-depth", value_name = "N", default_value_t = 5)]
    pub max_depth: u32,

    /// Do not ascend to the parent directory when recursing.
    #[arg(long = "no-parent", visible_alias = "np")]
    pub no_parent: bool,

    /// Skip the download if the local file's mtime is already >= the server's.
    #[arg(short = 'N', long = "timestamping")]
    pub conditional_mtime: bool,

    /// Discard any existing plan/temp/final state for this URL before fetching.
    #[arg(long = "overwrite")]
    pub overwrite: bool,

    /// Report existing plan state for the given URL(s) and exit without fetching.
    #[arg(long = "status")]
    pub status: bool,

    /// Segment size, e.g. `1M`, `512K`, `1.5GB`, or a bare byte count.
    #[arg(long = "segment-size", value_name = "SIZE", default_value = "8M", value_parser = parse_segment_size)]
    pub segment_size: u64,

    /// Extra request header as `Name: Value` (repeatable).
    #[arg(long = "header", value_name = "K:V", value_parser = parse_header)]
    pub header: Vec<(String, String)>,

    /// User-Agent header sent with every request.
    #[arg(long = "user-agent", value_name = "STRING", default_value_t = default_user_agent())]
    pub user_agent: String,

    /// Per-attempt request timeout, in seconds.
    #[arg(long = "timeout", value_name = "SECONDS", default_value_t = 30)]
    pub timeout: u64,

    /// Maximum attempts per request (probe, segment, or single-stream) before giving up.
    #[arg(long = "max-tries", value_name = "N", default_value_t = 5)]
    pub max_tries: u32,

    /// Suppress the progress line (errors and the final summary still print).
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

fn default_user_agent() -> String {
    concat!("grab/", env!("CARGO_PKG_VERSION")).to_string()
}

fn parse_segment_size(s: &str) -> Result<u64, String> {
    parse_size(s).ok_or_else(|| format!("invalid segment size: {s:?}"))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("header must be `Name: Value`, got {s:?}"))?;
    let name = name.trim();
    let value = value.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in {s:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Argument-shaped constraints `clap` can't express declaratively. Prints a
/// usage error and returns `false` (caller exits 2) on violation.
pub fn validate(cli: &Cli) -> Result<(), String> {
    if cli.output.is_some() {
        if cli.recursive {
            return Err("-O cannot be combined with -r/--recursive".to_string());
        }
        if cli.urls.len() != 1 {
            return Err("-O requires exactly one URL".to_string());
        }
    }
    if cli.min_threads == 0 {
        return Err("--min-threads must be at least 1".to_string());
    }
    if cli.max_threads < cli.min_threads {
        return Err("--max-threads must be >= --min-threads".to_string());
    }
    if cli.threads == 0 {
        return Err("-t/--threads must be at least 1".to_string());
    }
    Ok(())
}

impl Cli {
    /// Builds the per-run [`Options`] this command line describes. Does not
    /// carry the URL list — callers iterate `self.urls` separately.
    pub fn to_options(&self) -> Options {
        let mut headers = HashMap::with_capacity(self.header.len());
        for (k, v) in &self.header {
            headers.insert(k.clone(), v.clone());
        }

        Options {
            output_path: self.output.clone(),
            output_dir: self.directory.clone(),
            threads: self.threads.clamp(self.min_threads, self.max_threads),
            auto_threads: self.auto_threads,
            adaptive: AdaptiveConfig {
                min_threads: self.min_threads,
                max_threads: self.max_threads,
                window: Duration::from_secs_f64(self.auto_window.max(0.1)),
                min_gain: self.auto_min_gain,
            },
            resume: self.resume,
            overwrite: self.overwrite,
            conditional_mtime: self.conditional_mtime,
            recursive: self.recursive,
            max_depth: self.max_depth,
            no_parent: self.no_parent,
            segment_size: self.segment_size,
            headers,
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout),
            max_tries: self.max_tries,
            status_only: self.status,
            quiet: self.quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parses_single_url_with_defaults() {
        let cli = parse(&["grab", "https://example.com/file.iso"]);
        assert_eq!(cli.urls, vec!["https://example.com/file.iso".to_string()]);
        assert_eq!(cli.threads, 4);
        assert_eq!(cli.segment_size, 8 * 1024 * 1024);
        assert!(!cli.auto_threads);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn parses_segment_size_suffixes() {
        assert_eq!(parse(&["grab", "-P", ".", "--segment-size", "512K", "u"]).segment_size, 524_288);
        assert_eq!(parse(&["grab", "--segment-size", "1.5M", "u"]).segment_size, 1_572_864);
        assert_eq!(parse(&["grab", "--segment-size", "1GB", "u"]).segment_size, 1_073_741_824);
    }

    #[test]
    fn rejects_garbage_segment_size() {
        assert!(Cli::try_parse_from(["grab", "--segment-size", "abc", "u"]).is_err());
    }

    #[test]
    fn parses_repeated_headers() {
        let cli = parse(&["grab", "--header", "X-A: 1", "--header", "X-B: 2", "u"]);
        assert_eq!(
            cli.header,
            vec![("X-A".to_string(), "1".to_string()), ("X-B".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(Cli::try_parse_from(["grab", "--header", "no-colon", "u"]).is_err());
    }

    #[test]
    fn no_parent_alias_np() {
        let cli = parse(&["grab", "--np", "u"]);
        assert!(cli.no_parent);
    }

    #[test]
    fn validate_rejects_output_with_recursive() {
        let cli = parse(&["grab", "-O", "out.bin", "-r", "u"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn validate_rejects_output_with_multiple_urls() {
        let cli = parse(&["grab", "-O", "out.bin", "u1", "u2"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn validate_rejects_max_below_min_threads() {
        let cli = parse(&["grab", "--min-threads", "8", "--max-threads", "2", "u"]);
        assert!(validate(&cli).is_err());
    }
}
