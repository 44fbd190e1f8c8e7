use anyhow::Context;
use clap::Parser;

use grab_core::cancel::CancelFlag;
use grab_core::logging;

mod args;
mod run;

use args::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(msg) = args::validate(&cli) {
        eprintln!("grab: {msg}");
        std::process::exit(2);
    }

    logging::init_logging(if cli.quiet { "warn" } else { "info" });

    let cancel = CancelFlag::new();
    if let Err(e) = install_signal_handler(cancel.clone()) {
        eprintln!("grab: {e:#}");
        std::process::exit(1);
    }

    let options = cli.to_options();
    let code = run::run(&cli.urls, &options, &cancel);
    std::process::exit(code);
}

/// Installs a SIGINT handler that raises `cancel`. The library only exposes
/// the flag and a setter — the binary owns the process-wide signal wiring.
fn install_signal_handler(cancel: CancelFlag) -> anyhow::Result<()> {
    ctrlc::set_handler(move || cancel.set()).context("failed to install SIGINT handler")
}
