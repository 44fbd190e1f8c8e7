//! Shared curl `Easy` handle setup for the single-stream and segmented
//! fetchers.

use std::collections::HashMap;
use std::time::Duration;

use crate::retry::SegmentError;

/// Size of the read buffer libcurl delivers to the write callback. Not a
/// hard contract with the server — just the chunk granularity at which this
/// crate observes cancellation and accounts progress.
pub const CHUNK_SIZE: usize = 256 * 1024;

pub fn base_handle(
    url: &str,
    headers: &HashMap<String, String>,
    user_agent: &str,
    timeout: Duration,
) -> Result<curl::easy::Easy, SegmentError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(SegmentError::Curl)?;
    easy.follow_location(true).map_err(SegmentError::Curl)?;
    easy.buffer_size(CHUNK_SIZE).map_err(SegmentError::Curl)?;
    easy.timeout(timeout).map_err(SegmentError::Curl)?;
    // Abort if throughput drops below 1 KiB/s for 60s, rather than only
    // relying on the hard per-attempt timeout above.
    easy.low_speed_limit(1024).map_err(SegmentError::Curl)?;
    easy.low_speed_time(Duration::from_secs(60)).map_err(SegmentError::Curl)?;

    let mut list = curl::easy::List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(SegmentError::Curl)?;
    }
    list.append(&format!("User-Agent: {user_agent}"))
        .map_err(SegmentError::Curl)?;
    easy.http_headers(list).map_err(SegmentError::Curl)?;
    Ok(easy)
}

pub fn response_code(easy: &curl::easy::Easy) -> Result<u32, SegmentError> {
    easy.response_code().map_err(SegmentError::Curl)
}
