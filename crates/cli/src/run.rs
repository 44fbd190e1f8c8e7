//! Dispatches each positional URL to a flat fetch, a `--status` report, or a
//! recursive crawl, and folds the per-URL outcomes into one process exit
//! code.

use std::path::PathBuf;

use grab_core::cancel::CancelFlag;
use grab_core::fetch_head::{self, HeadResult};
use grab_core::options::Options;
use grab_core::orchestrate;
use grab_core::progress::{ProgressState, Reporter};
use grab_core::recursive::CrawlContext;
use grab_core::segmenter::{Plan, PlanStatus};
use grab_core::storage;
use grab_core::url_model;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Runs every URL in `urls` under `options`, returning the process exit code.
pub fn run(urls: &[String], options: &Options, cancel: &CancelFlag) -> i32 {
    let mut any_failed = false;

    for url in urls {
        if cancel.is_set() {
            break;
        }
        let ok = if options.status_only {
            report_status(url, options)
        } else if options.recursive {
            run_recursive(url, options, cancel)
        } else {
            run_flat(url, options, cancel)
        };
        if !ok {
            any_failed = true;
        }
    }

    if cancel.is_set() {
        EXIT_INTERRUPTED
    } else if any_failed {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}

/// Output path for a flat (non-recursive) download: `-O` wins outright;
/// otherwise the destination directory plus a filename derived from
/// `Content-Disposition` (when a probe supplied one) or the URL path.
fn flat_output_path(url: &str, options: &Options, head: Option<&HeadResult>) -> PathBuf {
    if let Some(explicit) = &options.output_path {
        return explicit.clone();
    }
    let suggested = head.and_then(|h| h.content_disposition.as_deref());
    options.output_dir.join(url_model::derive_filename(url, suggested))
}

fn run_flat(url: &str, options: &Options, cancel: &CancelFlag) -> bool {
    let head = match fetch_head::probe(url, &options.headers, &options.user_agent, &options.retry_policy()) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("grab: {url}: {e}");
            return false;
        }
    };

    let output_path = flat_output_path(url, options, Some(&head));
    let progress = ProgressState::new(head.content_length);
    let reporter = Reporter::start(progress.clone(), options.quiet);

    let result = orchestrate::fetch_one(url, output_path, options, cancel, Some(&progress), false);
    reporter.stop();

    match result {
        Ok(resource) => {
            if !options.quiet {
                if resource.already_complete {
                    println!("{} -> {} (already complete)", url, resource.output_path.display());
                } else {
                    println!("{} -> {}", url, resource.output_path.display());
                }
            }
            true
        }
        Err(e) => {
            eprintln!("grab: {url}: {e}");
            false
        }
    }
}

fn run_recursive(start_url: &str, options: &Options, cancel: &CancelFlag) -> bool {
    let mut ctx = CrawlContext::new(start_url, options.no_parent, options.max_depth);
    ctx.mark_seen(start_url);
    let mut ok = true;

    while let Some(item) = ctx.pop() {
        if cancel.is_set() {
            break;
        }
        if item.depth > 0 && !ctx.passes_filters(&item.url) {
            continue;
        }

        let head = match fetch_head::probe(&item.url, &options.headers, &options.user_agent, &options.retry_policy())
        {
            Ok(h) => h,
            Err(e) => {
                eprintln!("grab: {}: {e}", item.url);
                ok = false;
                continue;
            }
        };

        if item.depth == 0 {
            ctx.anchor(&head.final_url);
        }

        let suggested = head
            .content_disposition
            .as_deref()
            .map(|cd| url_model::derive_filename(&item.url, Some(cd)));
        let output_path = url_model::recursive_output_path(&head.final_url, &options.output_dir, suggested.as_deref())
            .unwrap_or_else(|| options.output_dir.join(url_model::derive_filename(&item.url, None)));

        let progress = ProgressState::new(head.content_length);
        let reporter = Reporter::start(progress.clone(), options.quiet);
        let result = orchestrate::fetch_one(&item.url, output_path, options, cancel, Some(&progress), true);
        reporter.stop();

        match result {
            Ok(resource) => {
                if !options.quiet {
                    if resource.already_complete {
                        println!("{} -> {} (already complete)", item.url, resource.output_path.display());
                    } else {
                        println!("{} -> {}", item.url, resource.output_path.display());
                    }
                }
                if let Some(html) = &resource.html_body {
                    ctx.discover(html, &resource.final_url, item.depth);
                }
            }
            Err(e) => {
                eprintln!("grab: {}: {e}", item.url);
                ok = false;
            }
        }
    }

    ok
}

/// `--status`: a pure local read, no network I/O.
fn report_status(url: &str, options: &Options) -> bool {
    let output_path = flat_output_path(url, options, None);
    if output_path.exists() {
        println!("{url}: complete -> {}", output_path.display());
        return true;
    }

    let temp_path = storage::temp_path(&output_path);
    let plan_path = storage::plan_path(&temp_path);
    match Plan::load(&plan_path) {
        Ok(plan) => {
            let status = PlanStatus::from(&plan);
            println!(
                "{url}: {:.1}%  {}/{} bytes  {}/{} segments  segment-size {}  temp={}  plan={}",
                status.percent,
                status.completed_bytes,
                status.total_size,
                status.segments_done,
                status.segments_total,
                status.segment_size,
                temp_path.display(),
                plan_path.display(),
            );
            true
        }
        Err(_) => {
            println!("{url}: no local state");
            false
        }
    }
}
