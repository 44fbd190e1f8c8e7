//! Logging init: structured output to stderr, level controlled by `RUST_LOG`
//! or a caller-supplied default filter.

use tracing_subscriber::EnvFilter;

/// Initializes `tracing` with an `EnvFilter`-driven stderr subscriber.
/// `default_filter` is used when `RUST_LOG` is unset or invalid (e.g.
/// `"info"` normally, `"warn"` under `-q`).
pub fn init_logging(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
