//! Filename extraction from URL path.

/// Extracts the last path segment from a URL for use as a filename hint.
///
/// The segment is percent-decoded. Returns `None` if the URL cannot be
/// parsed or the path is empty/root/`.`/`..`.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let path = parsed.path();
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(percent_decode_lossy(segment))
}

/// Lossy percent-decoding shared by URL path and Content-Disposition parsing.
pub(super) fn percent_decode_lossy(input: &str) -> String {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.as_bytes().iter().copied();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let h = bytes.next().and_then(hex_digit);
            let l = bytes.next().and_then(hex_digit);
            match (h, l) {
                (Some(high), Some(low)) => out.push(high << 4 | low),
                _ => {
                    out.push(b'%');
                    if let Some(x) = h {
                        out.push(x);
                    }
                    if let Some(x) = l {
                        out.push(x);
                    }
                }
            }
        } else {
            out.push(b);
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal() {
        assert_eq!(
            filename_from_url_path("https://example.com/a/b/file.deb").as_deref(),
            Some("file.deb")
        );
        assert_eq!(
            filename_from_url_path("https://example.com/single").as_deref(),
            Some("single")
        );
    }

    #[test]
    fn root_or_empty() {
        assert_eq!(filename_from_url_path("https://example.com/"), None);
        assert_eq!(filename_from_url_path("https://example.com"), None);
    }

    #[test]
    fn with_query() {
        assert_eq!(
            filename_from_url_path("https://example.com/file.zip?token=abc").as_deref(),
            Some("file.zip")
        );
    }

    #[test]
    fn percent_decoded() {
        assert_eq!(
            filename_from_url_path("https://example.com/caf%C3%A9.txt").as_deref(),
            Some("café.txt")
        );
    }

    #[test]
    fn dot_segments_rejected() {
        assert_eq!(filename_from_url_path("https://example.com/a/."), None);
        assert_eq!(filename_from_url_path("https://example.com/a/.."), None);
    }
}
