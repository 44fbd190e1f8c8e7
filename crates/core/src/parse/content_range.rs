//! `Content-Length` and `Content-Range` header value parsing.

/// Parses a `Content-Length` value into a byte count, or `None` if it is not
/// a plain digit string.
pub fn parse_content_length(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Parses a `Content-Range: bytes A-B/T` value, returning the total size `T`
/// (or `None` if the server declined to report it with `T=*`, or the header
/// is malformed).
pub fn parse_content_range(value: &str) -> Option<Option<u64>> {
    let value = value.trim();
    let rest = value.strip_prefix("bytes ")?;
    let (_range, total) = rest.split_once('/')?;
    let total = total.trim();
    if total == "*" {
        return Some(None);
    }
    total.parse::<u64>().ok().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_length_digits() {
        assert_eq!(parse_content_length("10485760"), Some(10_485_760));
        assert_eq!(parse_content_length(" 42 "), Some(42));
    }

    #[test]
    fn content_length_rejects_non_digits() {
        assert_eq!(parse_content_length("abc"), None);
        assert_eq!(parse_content_length(""), None);
        assert_eq!(parse_content_length("-5"), None);
    }

    #[test]
    fn content_range_known_total() {
        assert_eq!(
            parse_content_range("bytes 0-0/10485760"),
            Some(Some(10_485_760))
        );
    }

    #[test]
    fn content_range_unknown_total() {
        assert_eq!(parse_content_range("bytes 0-0/*"), Some(None));
    }

    #[test]
    fn content_range_malformed() {
        assert_eq!(parse_content_range("garbage"), None);
    }
}
