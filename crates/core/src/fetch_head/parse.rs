//! Parse raw HTTP response header lines into structured fields.

use crate::parse::{parse_content_length, parse_http_date};

/// Headers relevant to the probe, parsed from raw `Name: value` lines.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawHeaders {
    pub content_length: Option<u64>,
    /// `None` if the header was absent; `Some(true)`/`Some(false)` records
    /// whether it said `bytes`. Distinguishing "absent" from "present but
    /// not bytes" drives the probe's ranged-GET fallback decision.
    pub accept_ranges: Option<bool>,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub content_disposition: Option<String>,
}

pub(crate) fn parse_headers(lines: &[String]) -> RawHeaders {
    let mut out = RawHeaders::default();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            out.content_length = parse_content_length(value);
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            out.accept_ranges = Some(value.eq_ignore_ascii_case("bytes"));
        } else if name.eq_ignore_ascii_case("content-type") {
            out.content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("last-modified") {
            out.last_modified = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("content-disposition") {
            out.content_disposition = Some(value.to_string());
        }
    }
    out
}

/// Parses a raw `Last-Modified` value into epoch seconds, if present and
/// well-formed.
pub(crate) fn last_modified_epoch(raw: Option<&str>) -> Option<f64> {
    raw.and_then(parse_http_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_headers_content_length_and_ranges() {
        let lines = [
            "HTTP/1.1 200 OK".to_string(),
            "Content-Length: 12345".to_string(),
            "Accept-Ranges: bytes".to_string(),
        ];
        let r = parse_headers(&lines);
        assert_eq!(r.content_length, Some(12345));
        assert_eq!(r.accept_ranges, Some(true));
    }

    #[test]
    fn parse_headers_no_ranges_header() {
        let lines = ["Content-Length: 999".to_string()];
        let r = parse_headers(&lines);
        assert_eq!(r.content_length, Some(999));
        assert_eq!(r.accept_ranges, None);
    }

    #[test]
    fn parse_headers_ranges_present_but_not_bytes() {
        let lines = ["Accept-Ranges: none".to_string()];
        let r = parse_headers(&lines);
        assert_eq!(r.accept_ranges, Some(false));
    }

    #[test]
    fn parse_headers_content_disposition() {
        let lines = ["Content-Disposition: attachment; filename=\"report.pdf\"".to_string()];
        let r = parse_headers(&lines);
        assert!(r.content_disposition.unwrap().contains("report.pdf"));
    }

    #[test]
    fn last_modified_epoch_parses_rfc1123() {
        assert_eq!(
            last_modified_epoch(Some("Sun, 06 Nov 1994 08:49:37 GMT")),
            Some(784_111_777.0)
        );
        assert_eq!(last_modified_epoch(None), None);
        assert_eq!(last_modified_epoch(Some("garbage")), None);
    }
}
