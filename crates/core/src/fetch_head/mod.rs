//! HTTP probe: discover size, range support, type, mtime, and suggested
//! filename for a URL before deciding how to fetch it.

mod parse;

use std::collections::HashMap;
use std::fmt;
use std::str;
use std::time::Duration;

use crate::parse::parse_content_range;
use crate::retry::{ErrorKind, RetryDecision, RetryPolicy};

/// Everything the probe was able to learn about a resource.
#[derive(Debug, Clone)]
pub struct HeadResult {
    /// URL after following redirects.
    pub final_url: String,
    pub content_length: Option<u64>,
    pub range_support: bool,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub last_modified_epoch: Option<f64>,
    pub content_disposition: Option<String>,
}

#[derive(Debug)]
pub enum ProbeError {
    Transport(String),
    Http(u32),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Transport(msg) => write!(f, "probe transport error: {msg}"),
            ProbeError::Http(code) => write!(f, "probe received HTTP {code}"),
        }
    }
}

impl std::error::Error for ProbeError {}

fn classify_probe_error(e: &ProbeError) -> ErrorKind {
    match e {
        ProbeError::Transport(_) => ErrorKind::Connection,
        ProbeError::Http(code) => crate::retry::classify_http_status(*code),
    }
}

/// Probes `url`: issues a `HEAD`, following redirects, then falls back to a
/// ranged `GET` (`Range: bytes=0-0`) when any of the five tracked fields
/// (size, range support, type, mtime, disposition) came back unset. Retries
/// the whole probe up to `policy.max_attempts` with linear backoff and a
/// per-attempt timeout that grows with the attempt index.
pub fn probe(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    policy: &RetryPolicy,
) -> Result<HeadResult, ProbeError> {
    let mut attempt = 1u32;
    loop {
        tracing::debug!(url, attempt, "probing");
        match probe_once(url, headers, user_agent, policy.attempt_timeout(attempt)) {
            Ok(result) => return Ok(result),
            Err(e) => {
                let kind = classify_probe_error(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        tracing::warn!(url, attempt, %e, "probe failed, giving up");
                        return Err(e);
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(url, attempt, backoff_ms = d.as_millis() as u64, %e, "probe failed, retrying");
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}

fn probe_once(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    timeout: Duration,
) -> Result<HeadResult, ProbeError> {
    let (final_url, raw) = head_request(url, headers, user_agent, timeout)?;

    let needs_fallback = raw.content_length.is_none()
        || raw.accept_ranges.is_none()
        || raw.content_type.is_none()
        || raw.last_modified.is_none()
        || raw.content_disposition.is_none();

    let mut content_length = raw.content_length;
    let mut range_support = raw.accept_ranges.unwrap_or(false);

    if needs_fallback {
        if let Ok((status, content_range)) = ranged_get_probe(&final_url, headers, user_agent, timeout) {
            if status == 206 || content_range.is_some() {
                range_support = true;
                if let Some(Some(total)) = content_range {
                    content_length = Some(total);
                }
            } else if raw.accept_ranges.is_none() {
                range_support = false;
            }
        }
    }

    let last_modified_epoch = parse::last_modified_epoch(raw.last_modified.as_deref());

    Ok(HeadResult {
        final_url,
        content_length,
        range_support,
        content_type: raw.content_type,
        last_modified: raw.last_modified,
        last_modified_epoch,
        content_disposition: raw.content_disposition,
    })
}

fn build_header_list(headers: &HashMap<String, String>, user_agent: &str) -> Result<curl::easy::List, ProbeError> {
    let mut list = curl::easy::List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(|e| ProbeError::Transport(e.to_string()))?;
    }
    list.append(&format!("User-Agent: {user_agent}"))
        .map_err(|e| ProbeError::Transport(e.to_string()))?;
    Ok(list)
}

fn head_request(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    timeout: Duration,
) -> Result<(String, parse::RawHeaders), ProbeError> {
    let mut collected = Vec::new();
    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(|e| ProbeError::Transport(e.to_string()))?;
    easy.nobody(true).map_err(|e| ProbeError::Transport(e.to_string()))?;
    easy.follow_location(true)
        .map_err(|e| ProbeError::Transport(e.to_string()))?;
    easy.timeout(timeout).map_err(|e| ProbeError::Transport(e.to_string()))?;
    easy.http_headers(build_header_list(headers, user_agent)?)
        .map_err(|e| ProbeError::Transport(e.to_string()))?;

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    collected.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(|e| ProbeError::Transport(e.to_string()))?;
        transfer.perform().map_err(|e| ProbeError::Transport(e.to_string()))?;
    }

    let code = easy
        .response_code()
        .map_err(|e| ProbeError::Transport(e.to_string()))?;
    if !(200..300).contains(&code) {
        return Err(ProbeError::Http(code));
    }

    let final_url = easy
        .effective_url()
        .ok()
        .flatten()
        .map(str::to_string)
        .unwrap_or_else(|| url.to_string());

    Ok((final_url, parse::parse_headers(&collected)))
}

/// Fallback probe: `Range: bytes=0-0`. Returns (status, parsed Content-Range
/// total, if any).
fn ranged_get_probe(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    timeout: Duration,
) -> Result<(u32, Option<Option<u64>>), ProbeError> {
    let mut content_range_value: Option<String> = None;
    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(|e| ProbeError::Transport(e.to_string()))?;
    easy.follow_location(true)
        .map_err(|e| ProbeError::Transport(e.to_string()))?;
    easy.timeout(timeout).map_err(|e| ProbeError::Transport(e.to_string()))?;
    easy.range("0-0").map_err(|e| ProbeError::Transport(e.to_string()))?;
    easy.http_headers(build_header_list(headers, user_agent)?)
        .map_err(|e| ProbeError::Transport(e.to_string()))?;

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let s = s.trim();
                    if let Some((name, value)) = s.split_once(':') {
                        if name.trim().eq_ignore_ascii_case("content-range") {
                            content_range_value = Some(value.trim().to_string());
                        }
                    }
                }
                true
            })
            .map_err(|e| ProbeError::Transport(e.to_string()))?;
        transfer
            .write_function(|data| Ok(data.len()))
            .map_err(|e| ProbeError::Transport(e.to_string()))?;
        transfer.perform().map_err(|e| ProbeError::Transport(e.to_string()))?;
    }

    let code = easy
        .response_code()
        .map_err(|e| ProbeError::Transport(e.to_string()))?;
    let content_range = content_range_value.and_then(|v| parse_content_range(&v));
    Ok((code, content_range))
}
